//! [`Listing`]s search REST API definitions.

use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    Extension, Json,
};
use common::Handler as _;
use serde::{Deserialize, Serialize};
#[cfg(doc)]
use service::domain::Listing;
use service::{
    domain::{
        listing::{Area, MarketCategory, Price},
        location::{self, Location},
    },
    query,
    read::listing::{list, statistics},
};

use crate::{
    api::{self, lenient, listing::View, CriteriaError, Data, LocationError},
    AsError, Error, ListError, Service,
};

/// Default number of [`Listing`]s returned by a location search.
pub const BY_LOCATION_DEFAULT_LIMIT: i64 = 50;

/// Search criteria of [`Listing`]s.
///
/// Accepted both as query parameters and as a JSON body.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Criteria {
    /// Part of the title.
    #[serde(deserialize_with = "lenient::text")]
    pub title: Option<String>,

    /// Part of the address.
    #[serde(deserialize_with = "lenient::text")]
    pub address: Option<String>,

    /// Inclusive lower price bound.
    #[serde(deserialize_with = "lenient::int")]
    pub min_price: Option<Price>,

    /// Inclusive upper price bound.
    #[serde(deserialize_with = "lenient::int")]
    pub max_price: Option<Price>,

    /// Inclusive lower area bound.
    #[serde(deserialize_with = "lenient::float")]
    pub min_area: Option<Area>,

    /// Inclusive upper area bound.
    #[serde(deserialize_with = "lenient::float")]
    pub max_area: Option<Area>,

    /// Exact property type.
    #[serde(deserialize_with = "lenient::text")]
    pub property_type: Option<String>,

    /// Exact layout.
    #[serde(deserialize_with = "lenient::text")]
    pub layout: Option<String>,

    /// Pet policy.
    #[serde(deserialize_with = "lenient::boolean")]
    pub pets: Option<bool>,

    /// Part of the transportation description.
    #[serde(deserialize_with = "lenient::text")]
    pub transportation: Option<String>,

    /// Part of the year built description.
    #[serde(deserialize_with = "lenient::text")]
    pub year_built: Option<String>,

    /// [`MarketCategory`] preset of the price bounds.
    #[serde(deserialize_with = "lenient::text")]
    pub price_range: Option<String>,

    /// Page size.
    #[serde(deserialize_with = "lenient::int")]
    pub limit: Option<i64>,

    /// Number of skipped [`Listing`]s.
    #[serde(deserialize_with = "lenient::int")]
    pub offset: Option<i64>,

    /// Sorting column.
    #[serde(deserialize_with = "lenient::text")]
    pub sort_by: Option<String>,

    /// Sorting order, `ASC` or `DESC`.
    #[serde(deserialize_with = "lenient::text")]
    pub sort_order: Option<String>,
}

impl Criteria {
    /// Converts these [`Criteria`] into a [`list::Filter`].
    ///
    /// # Errors
    ///
    /// If the [`Criteria::price_range`] is not a known [`MarketCategory`].
    pub fn filter(&self) -> Result<list::Filter, Error> {
        let filter = list::Filter {
            title: self.title.clone(),
            address: self.address.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            min_area: self.min_area,
            max_area: self.max_area,
            property_type: self.property_type.clone(),
            layout: self.layout.clone(),
            pets: self.pets,
            transportation: self.transportation.clone(),
            year_built: self.year_built.clone(),
            location: None,
            excluded: None,
        };
        Ok(match self.price_range.as_deref() {
            None => filter,
            Some(range) => filter.with_price_band(
                range
                    .parse::<MarketCategory>()
                    .map_err(|_| CriteriaError::UnknownPriceRange)?,
            ),
        })
    }

    /// Converts these [`Criteria`] into a [`query::listings::List`].
    ///
    /// # Errors
    ///
    /// If the [`Criteria::price_range`] is not a known [`MarketCategory`].
    pub fn into_query(self) -> Result<query::listings::List, Error> {
        Ok(query::listings::List {
            filter: self.filter()?,
            limit: self.limit,
            offset: self.offset,
            sort: list::Column::sort(
                self.sort_by.as_deref(),
                self.sort_order.as_deref(),
            ),
        })
    }
}

/// Pagination details of a [`Listed`] page.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total number of matching [`Listing`]s.
    pub total: usize,

    /// Number of [`Listing`]s on the page.
    pub count: usize,

    /// Indicator whether more [`Listing`]s follow the page.
    pub has_more: bool,

    /// Number of skipped [`Listing`]s.
    pub offset: usize,

    /// Page size.
    pub limit: usize,

    /// 1-based page number.
    pub page: usize,

    /// Total number of pages.
    pub total_pages: usize,
}

/// Page of [`Listing`]s.
#[derive(Clone, Debug, Serialize)]
pub struct Listed {
    /// Always `true`.
    pub success: bool,

    /// Enriched [`Listing`]s of the page.
    pub data: Vec<View>,

    /// [`Pagination`] details.
    pub pagination: Pagination,

    /// [`StatisticsView`] of the page.
    pub summary: StatisticsView,
}

impl From<list::Page> for Listed {
    fn from(page: list::Page) -> Self {
        let samples = page
            .items
            .iter()
            .map(statistics::Sample::from)
            .collect::<Vec<_>>();
        let pagination = Pagination {
            total: page.total,
            count: page.count(),
            has_more: page.has_more(),
            offset: page.arguments.offset(),
            limit: page.arguments.limit(),
            page: page.number(),
            total_pages: page.total_pages(),
        };
        Self {
            success: true,
            data: page.items.into_iter().map(View::from).collect(),
            pagination,
            summary: statistics::Statistics::of(&samples).into(),
        }
    }
}

/// Inclusive range of values.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Range<T> {
    /// Minimum value.
    pub min: T,

    /// Maximum value.
    pub max: T,
}

impl<T> From<statistics::Range<T>> for Range<T> {
    fn from(range: statistics::Range<T>) -> Self {
        Self {
            min: range.min,
            max: range.max,
        }
    }
}

/// Distribution of [`Listing`]s over [`MarketCategory`]s.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCategories {
    /// Number of [`MarketCategory::Budget`] [`Listing`]s.
    pub budget: usize,

    /// Number of [`MarketCategory::MidRange`] [`Listing`]s.
    pub mid_range: usize,

    /// Number of [`MarketCategory::Luxury`] [`Listing`]s.
    pub luxury: usize,
}

/// Aggregated statistics of [`Listing`]s.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsView {
    /// Number of aggregated [`Listing`]s.
    pub count: usize,

    /// Average positive price.
    pub average_price: Price,

    /// Average positive area.
    pub average_area: Area,

    /// Range of positive prices.
    pub price_range: Range<Price>,

    /// Range of positive areas.
    pub area_range: Range<Area>,

    /// Average price per square meter.
    pub average_price_per_square_meter: Price,

    /// Distribution over property types.
    pub property_types: BTreeMap<String, usize>,

    /// Distribution over [`MarketCategory`]s.
    pub market_categories: MarketCategories,
}

impl From<statistics::Statistics> for StatisticsView {
    fn from(stats: statistics::Statistics) -> Self {
        let statistics::MarketCategories {
            budget,
            mid_range,
            luxury,
        } = stats.market_categories;
        Self {
            count: stats.count,
            average_price: stats.average_price,
            average_area: stats.average_area,
            price_range: stats.price_range.into(),
            area_range: stats.area_range.into(),
            average_price_per_square_meter: stats
                .average_price_per_square_meter,
            property_types: stats.property_types,
            market_categories: MarketCategories {
                budget,
                mid_range,
                luxury,
            },
        }
    }
}

/// Lists a page of [`Listing`]s matching the provided [`Criteria`].
async fn search(
    service: &Service,
    criteria: Criteria,
) -> Result<Json<Listed>, ListError> {
    let page = service
        .execute(criteria.into_query()?)
        .await
        .map_err(AsError::into_error)?;
    Ok(Json(page.into()))
}

/// `GET /listings`
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_CRITERIA` - the [`Criteria`] are contradictory.
#[tracing::instrument(skip_all)]
pub async fn list(
    Extension(service): Extension<Service>,
    criteria: Result<Query<Criteria>, QueryRejection>,
) -> Result<Json<Listed>, ListError> {
    let Query(criteria) = criteria.map_err(AsError::into_error)?;
    search(&service, criteria).await
}

/// `POST /listings/filter`
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_CRITERIA` - the [`Criteria`] are contradictory.
#[tracing::instrument(skip_all)]
pub async fn filter(
    Extension(service): Extension<Service>,
    criteria: Result<Json<Criteria>, JsonRejection>,
) -> Result<Json<Listed>, ListError> {
    let Json(criteria) = criteria.map_err(AsError::into_error)?;
    search(&service, criteria).await
}

/// `GET /listings/statistics`
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_CRITERIA` - the [`Criteria`] are contradictory.
#[tracing::instrument(skip_all)]
pub async fn statistics(
    Extension(service): Extension<Service>,
    criteria: Result<Query<Criteria>, QueryRejection>,
) -> Result<Json<Data<StatisticsView>>, Error> {
    let Query(criteria) = criteria.map_err(AsError::into_error)?;

    let stats = service
        .execute(query::listings::Statistics {
            filter: criteria.filter()?,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Data::new(stats.into())))
}

/// [`Location`] selected by a user.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationInput {
    /// [`location::Kind`] of the [`Location`].
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: Option<String>,

    /// Value of the [`Location`].
    #[serde(deserialize_with = "lenient::text")]
    pub value: Option<String>,

    /// Human-readable text of the [`Location`].
    #[serde(deserialize_with = "lenient::text")]
    pub display_text: Option<String>,
}

/// Body of `POST /listings/search/by-location`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ByLocation {
    /// Selected [`Location`].
    pub location: Option<LocationInput>,

    /// Additional [`Criteria`].
    pub filters: Criteria,
}

/// Echo of the [`Location`] searched by.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationView {
    /// [`location::Kind`] of the [`Location`].
    #[serde(rename = "type")]
    pub kind: String,

    /// Human-readable text of the [`Location`].
    pub display_text: String,

    /// Value of the [`Location`].
    pub value: String,
}

/// Response of `POST /listings/search/by-location`.
#[derive(Clone, Debug, Serialize)]
pub struct LocatedListings {
    /// Always `true`.
    pub success: bool,

    /// Enriched [`Listing`]s at the [`Location`].
    pub data: Vec<View>,

    /// Number of the returned [`Listing`]s.
    pub count: usize,

    /// [`Location`] searched by.
    pub location: LocationView,
}

/// `POST /listings/search/by-location`
///
/// # Errors
///
/// Possible error codes:
/// - `LOCATION_REQUIRED` - the [`Location`] type or value is missing;
/// - `INVALID_LOCATION_TYPE` - the [`Location`] type is unknown;
/// - `INVALID_CRITERIA` - the filters are contradictory.
#[tracing::instrument(skip_all)]
pub async fn by_location(
    Extension(service): Extension<Service>,
    body: Result<Json<ByLocation>, JsonRejection>,
) -> Result<Json<LocatedListings>, ListError> {
    let Json(ByLocation { location, filters }) =
        body.map_err(AsError::into_error)?;

    let LocationInput {
        kind: Some(kind),
        value: Some(value),
        display_text,
    } = location.unwrap_or_default()
    else {
        return Err(Error::from(LocationError::Required).into());
    };
    let kind = kind
        .parse::<location::Kind>()
        .map_err(|_| Error::from(LocationError::UnknownKind))?;

    let mut query = Criteria {
        limit: filters.limit.or(Some(BY_LOCATION_DEFAULT_LIMIT)),
        ..filters
    }
    .into_query()?;
    query.filter.location = Some(Location::new(kind, value.clone()));

    let page = service
        .execute(query)
        .await
        .map_err(AsError::into_error)?;

    let data = page.items.into_iter().map(View::from).collect::<Vec<_>>();
    Ok(Json(LocatedListings {
        success: true,
        count: data.len(),
        data,
        location: LocationView {
            kind: kind.to_string(),
            display_text: display_text.unwrap_or_else(|| value.clone()),
            value,
        },
    }))
}

impl AsError for query::listings::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidCriteria(e) => Some(api::invalid_criteria(e)),
        }
    }
}

#[cfg(test)]
mod spec {
    use axum::extract::Query;
    use serde_json::json;
    use service::read::listing::list::Column;

    use super::{ByLocation, Criteria};

    #[test]
    fn parses_query_criteria() {
        let uri = "/listings?minPrice=1000&maxArea=80.5&pets=true&title=\
                   &sortBy=PRICE&sortOrder=asc&limit=10"
            .parse()
            .unwrap();
        let Query(criteria) = Query::<Criteria>::try_from_uri(&uri).unwrap();
        assert_eq!(criteria.min_price, Some(1_000));
        assert_eq!(criteria.max_area, Some(80.5));
        assert_eq!(criteria.pets, Some(true));
        assert_eq!(criteria.title, None);

        let query = criteria.into_query().unwrap();
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.sort.column, Column::Price);
    }

    #[test]
    fn expands_price_range_preset() {
        let criteria: Criteria =
            serde_json::from_value(json!({"priceRange": "mid-range"}))
                .unwrap();
        let filter = criteria.filter().unwrap();
        assert_eq!(filter.min_price, Some(500_000));
        assert_eq!(filter.max_price, Some(1_499_999));
    }

    #[test]
    fn rejects_unknown_price_range() {
        let criteria: Criteria =
            serde_json::from_value(json!({"priceRange": "cheap"})).unwrap();
        let err = criteria.filter().unwrap_err();
        assert_eq!(err.code, "INVALID_CRITERIA");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn by_location_body_tolerates_missing_parts() {
        let body: ByLocation = serde_json::from_value(json!({
            "location": {"type": "city", "value": ""},
        }))
        .unwrap();
        let location = body.location.unwrap();
        assert_eq!(location.kind.as_deref(), Some("city"));
        assert_eq!(location.value, None);

        let body: ByLocation = serde_json::from_value(json!({})).unwrap();
        assert!(body.location.is_none());
        assert!(body.filters.limit.is_none());
    }
}
