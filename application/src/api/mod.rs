//! REST API definitions.

mod lenient;
pub mod listing;
pub mod location;
pub mod search;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use service::read::listing::list;

use crate::{define_error, Error};

/// Builds the [`Router`] of the REST API.
///
/// Handlers expect the [`Service`] to be provided as an [`Extension`].
///
/// [`Extension`]: axum::Extension
/// [`Service`]: crate::Service
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/listings", get(search::list).post(listing::create))
        .route("/listings/filter", post(search::filter))
        .route("/listings/statistics", get(search::statistics))
        .route("/listings/layouts", get(listing::layouts))
        .route("/listings/property-types", get(listing::property_types))
        .route("/listings/search/locations", get(location::suggestions))
        .route("/listings/search/popular-locations", get(location::popular))
        .route("/listings/search/suggestions/:type", get(location::by_field))
        .route("/listings/search/by-location", post(search::by_location))
        .route(
            "/listings/:id",
            get(listing::get).put(listing::update).delete(listing::delete),
        )
        .route("/listings/:id/exists", get(listing::exists))
        .route("/listings/:id/similar", get(listing::similar))
}

/// Success envelope of a single value.
#[derive(Clone, Debug, Serialize)]
pub struct Data<T> {
    /// Always `true`.
    pub success: bool,

    /// Returned value.
    pub data: T,
}

impl<T> Data<T> {
    /// Wraps the provided `data` into a [`Data`] envelope.
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Success envelope of a list of items.
#[derive(Clone, Debug, Serialize)]
pub struct Items<T> {
    /// Always `true`.
    pub success: bool,

    /// Returned items.
    pub data: Vec<T>,

    /// Number of the returned items.
    pub count: usize,
}

impl<T> Items<T> {
    /// Collects the provided `items` into an [`Items`] envelope.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let data = items.into_iter().collect::<Vec<_>>();
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// Converts the provided [`list::CriteriaError`] into an [`Error`] carrying
/// its description.
pub(crate) fn invalid_criteria(err: &list::CriteriaError) -> Error {
    Error {
        message: err.to_string(),
        ..CriteriaError::Invalid.into()
    }
}

define_error! {
    enum ListingError {
        #[code = "LISTING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Listing` does not exist"]
        NotExists,
    }
}

define_error! {
    enum CriteriaError {
        #[code = "INVALID_CRITERIA"]
        #[status = BAD_REQUEST]
        #[message = "Invalid search criteria"]
        Invalid,

        #[code = "INVALID_CRITERIA"]
        #[status = BAD_REQUEST]
        #[message = "Unknown price range, expected one of: budget, mid-range, luxury"]
        UnknownPriceRange,
    }
}

define_error! {
    enum ValidationError {
        #[code = "VALIDATION_FAILED"]
        #[status = BAD_REQUEST]
        #[message = "Validation failed"]
        Failed,
    }
}

define_error! {
    enum LocationError {
        #[code = "LOCATION_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "Location type and value are required"]
        Required,

        #[code = "INVALID_LOCATION_TYPE"]
        #[status = BAD_REQUEST]
        #[message = "Unknown location type, expected one of: zipcode, city, area, address"]
        UnknownKind,

        #[code = "INVALID_SUGGESTION_TYPE"]
        #[status = BAD_REQUEST]
        #[message = "Unknown suggestion type, expected one of: cities, areas, zipcodes"]
        UnknownField,
    }
}
