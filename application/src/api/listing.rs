//! [`Listing`]-related REST API definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    Extension, Json,
};
#[cfg(doc)]
use common::DateTime;
use common::Handler as _;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{
        listing::{
            self, Amenities, Area, Coordinates, Details, Draft, Fee, Fees,
            Price,
        },
        location::Hierarchy,
        Listing,
    },
    query,
    read::listing::distinct,
};

use crate::{
    api::{self, lenient, Data, Items, ListingError, ValidationError},
    AsError, Error, ListError, Service,
};

/// JSON representation of an enriched [`Listing`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    /// ID of the [`Listing`].
    pub id: listing::Id,

    /// Unique human-readable number of the [`Listing`].
    pub property_number: String,

    /// Title of the [`Listing`].
    pub title: String,

    /// Price of the [`Listing`].
    pub price: Price,

    /// Floor area of the [`Listing`], in square meters.
    pub area: Area,

    /// Property type.
    pub property_type: Option<String>,

    /// Room layout.
    pub layout: Option<String>,

    /// Building structure.
    pub structure: Option<String>,

    /// Street address.
    pub address: String,

    /// Nearby transportation description.
    pub transportation: Option<String>,

    /// Administrative [`Hierarchy`].
    #[serde(flatten)]
    pub hierarchy: Hierarchy,

    /// Latitude.
    pub lat: Option<f64>,

    /// Longitude.
    pub lng: Option<f64>,

    /// Monthly management fee.
    pub management_fee: Option<Fee>,

    /// Monthly repair reserve fund.
    pub repair_reserve_fund: Option<Fee>,

    /// Monthly land lease fee.
    pub land_lease_fee: Option<Fee>,

    /// Right fee.
    pub right_fee: Option<Fee>,

    /// Deposit guarantee.
    pub deposit_guarantee: Option<Fee>,

    /// Monthly maintenance fees.
    pub maintenance_fees: Option<Fee>,

    /// Other monthly fees.
    pub other_fees: Option<Fee>,

    /// Balcony area, in square meters.
    pub balcony_area: Option<Area>,

    /// Number of units in the building.
    pub total_units: Option<i32>,

    /// Year built description.
    pub year_built: Option<String>,

    /// Pet policy.
    pub pets: Option<bool>,

    /// Parking description.
    pub parking: Option<String>,

    /// Kitchen description.
    pub kitchen: Option<String>,

    /// Bath and toilet description.
    pub bath_toilet: Option<String>,

    /// Transaction mode.
    pub transaction_mode: Option<String>,

    /// Image references.
    pub images: Vec<String>,

    /// [`DateTime`] when the [`Listing`] was created.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: listing::CreationDateTime,

    /// [`DateTime`] when the [`Listing`] was last modified.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub updated_at: listing::ModificationDateTime,

    /// Rounded price per square meter.
    pub price_per_square_meter: Option<Price>,

    /// Market category by price band.
    pub market_category: String,

    /// Value assessment by unit price.
    pub value_assessment: Option<String>,

    /// Amenities score.
    pub features_score: u8,

    /// Sum of recurring monthly fees.
    pub total_monthly_costs: Fee,

    /// Age of the building, in years.
    pub property_age: Option<i32>,
}

impl From<Listing> for View {
    fn from(listing: Listing) -> Self {
        let derived = listing.derived();
        let Listing {
            id,
            property_number,
            details,
            created_at,
            updated_at,
        } = listing;
        let Details {
            title,
            price,
            area,
            property_type,
            layout,
            structure,
            address,
            transportation,
            hierarchy,
            coordinates,
            fees,
            balcony_area,
            total_units,
            year_built,
            amenities,
            transaction_mode,
            images,
        } = details;

        Self {
            id,
            property_number: property_number.to_string(),
            title,
            price,
            area,
            property_type,
            layout,
            structure,
            address,
            transportation,
            hierarchy,
            lat: coordinates.as_ref().map(|c| c.lat),
            lng: coordinates.as_ref().map(|c| c.lng),
            management_fee: fees.management_fee,
            repair_reserve_fund: fees.repair_reserve_fund,
            land_lease_fee: fees.land_lease_fee,
            right_fee: fees.right_fee,
            deposit_guarantee: fees.deposit_guarantee,
            maintenance_fees: fees.maintenance_fees,
            other_fees: fees.other_fees,
            balcony_area,
            total_units,
            year_built,
            pets: amenities.pets,
            parking: amenities.parking,
            kitchen: amenities.kitchen,
            bath_toilet: amenities.bath_toilet,
            transaction_mode,
            images,
            created_at,
            updated_at,
            price_per_square_meter: derived.price_per_square_meter,
            market_category: derived.market_category.to_string(),
            value_assessment: derived
                .value_assessment
                .map(|v| v.to_string()),
            features_score: derived.features_score,
            total_monthly_costs: derived.total_monthly_costs,
            property_age: derived.property_age,
        }
    }
}

/// JSON input of a created or updated [`Listing`].
///
/// Blank strings are treated as absent values, so an empty fee never turns
/// into zero.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Input {
    /// Unique human-readable number, generated if absent on creation.
    #[serde(deserialize_with = "lenient::text")]
    pub property_number: Option<String>,

    /// Title.
    #[serde(deserialize_with = "lenient::text")]
    pub title: Option<String>,

    /// Price.
    #[serde(deserialize_with = "lenient::int")]
    pub price: Option<Price>,

    /// Floor area, in square meters.
    #[serde(deserialize_with = "lenient::float")]
    pub area: Option<Area>,

    /// Property type.
    #[serde(deserialize_with = "lenient::text")]
    pub property_type: Option<String>,

    /// Room layout.
    #[serde(deserialize_with = "lenient::text")]
    pub layout: Option<String>,

    /// Building structure.
    #[serde(deserialize_with = "lenient::text")]
    pub structure: Option<String>,

    /// Street address.
    #[serde(deserialize_with = "lenient::text")]
    pub address: Option<String>,

    /// Nearby transportation description.
    #[serde(deserialize_with = "lenient::text")]
    pub transportation: Option<String>,

    /// First (least specific) level of the [`Hierarchy`].
    #[serde(deserialize_with = "lenient::text")]
    pub area_level_1: Option<String>,

    /// Second level (prefecture) of the [`Hierarchy`].
    #[serde(deserialize_with = "lenient::text")]
    pub area_level_2: Option<String>,

    /// Third level (district) of the [`Hierarchy`].
    #[serde(deserialize_with = "lenient::text")]
    pub area_level_3: Option<String>,

    /// Fourth level (city) of the [`Hierarchy`].
    #[serde(deserialize_with = "lenient::text")]
    pub area_level_4: Option<String>,

    /// Postal code.
    #[serde(deserialize_with = "lenient::text")]
    pub zipcode: Option<String>,

    /// Latitude.
    #[serde(deserialize_with = "lenient::float")]
    pub lat: Option<f64>,

    /// Longitude.
    #[serde(deserialize_with = "lenient::float")]
    pub lng: Option<f64>,

    /// Monthly management fee.
    #[serde(deserialize_with = "lenient::int")]
    pub management_fee: Option<Fee>,

    /// Monthly repair reserve fund.
    #[serde(deserialize_with = "lenient::int")]
    pub repair_reserve_fund: Option<Fee>,

    /// Monthly land lease fee.
    #[serde(deserialize_with = "lenient::int")]
    pub land_lease_fee: Option<Fee>,

    /// Right fee.
    #[serde(deserialize_with = "lenient::int")]
    pub right_fee: Option<Fee>,

    /// Deposit guarantee.
    #[serde(deserialize_with = "lenient::int")]
    pub deposit_guarantee: Option<Fee>,

    /// Monthly maintenance fees.
    #[serde(deserialize_with = "lenient::int")]
    pub maintenance_fees: Option<Fee>,

    /// Other monthly fees.
    #[serde(deserialize_with = "lenient::int")]
    pub other_fees: Option<Fee>,

    /// Balcony area, in square meters.
    #[serde(deserialize_with = "lenient::float")]
    pub balcony_area: Option<Area>,

    /// Number of units in the building.
    #[serde(deserialize_with = "lenient::int32")]
    pub total_units: Option<i32>,

    /// Year built description.
    #[serde(deserialize_with = "lenient::text")]
    pub year_built: Option<String>,

    /// Pet policy.
    #[serde(deserialize_with = "lenient::boolean")]
    pub pets: Option<bool>,

    /// Parking description.
    #[serde(deserialize_with = "lenient::text")]
    pub parking: Option<String>,

    /// Kitchen description.
    #[serde(deserialize_with = "lenient::text")]
    pub kitchen: Option<String>,

    /// Bath and toilet description.
    #[serde(deserialize_with = "lenient::text")]
    pub bath_toilet: Option<String>,

    /// Transaction mode.
    #[serde(deserialize_with = "lenient::text")]
    pub transaction_mode: Option<String>,

    /// Image references.
    pub images: Vec<String>,
}

impl From<Input> for Draft {
    fn from(input: Input) -> Self {
        let coordinates = match (input.lat, input.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        };
        Self {
            property_number: input.property_number,
            details: Details {
                title: input.title.unwrap_or_default(),
                price: input.price.unwrap_or_default(),
                area: input.area.unwrap_or_default(),
                property_type: input.property_type,
                layout: input.layout,
                structure: input.structure,
                address: input.address.unwrap_or_default(),
                transportation: input.transportation,
                hierarchy: Hierarchy {
                    area_level_1: input.area_level_1,
                    area_level_2: input.area_level_2,
                    area_level_3: input.area_level_3,
                    area_level_4: input.area_level_4,
                    zipcode: input.zipcode,
                },
                coordinates,
                fees: Fees {
                    management_fee: input.management_fee,
                    repair_reserve_fund: input.repair_reserve_fund,
                    land_lease_fee: input.land_lease_fee,
                    right_fee: input.right_fee,
                    deposit_guarantee: input.deposit_guarantee,
                    maintenance_fees: input.maintenance_fees,
                    other_fees: input.other_fees,
                },
                balcony_area: input.balcony_area,
                total_units: input.total_units,
                year_built: input.year_built,
                amenities: Amenities {
                    pets: input.pets,
                    parking: input.parking,
                    kitchen: input.kitchen,
                    bath_toilet: input.bath_toilet,
                },
                transaction_mode: input.transaction_mode,
                images: input.images,
            },
        }
    }
}

/// Response of a written [`Listing`].
#[derive(Debug, Serialize)]
pub struct Written {
    /// Always `true`.
    pub success: bool,

    /// Written [`Listing`].
    pub data: View,

    /// Human-readable outcome.
    pub message: &'static str,

    /// Non-fatal validation warnings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Written {
    /// Creates a new [`Written`] response out of the provided
    /// [`command::Written`] result.
    fn new(written: command::Written, message: &'static str) -> Self {
        Self {
            success: true,
            data: written.listing.into(),
            message,
            warnings: written.warnings,
        }
    }
}

/// Parses the provided raw [`listing::Id`].
///
/// A malformed ID cannot identify any [`Listing`].
pub(crate) fn parse_id(raw: &str) -> Result<listing::Id, Error> {
    raw.trim()
        .parse()
        .map_err(|_| ListingError::NotExists.into())
}

/// `GET /listings/:id`
///
/// # Errors
///
/// Possible error codes:
/// - `LISTING_NOT_EXISTS` - the [`Listing`] doesn't exist.
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get(
    Extension(service): Extension<Service>,
    Path(id): Path<String>,
) -> Result<Json<Data<View>>, Error> {
    let id = parse_id(&id)?;
    service
        .execute(query::listing::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| ListingError::NotExists.into())
        .map(|l| Json(Data::new(View::from(l))))
}

/// Response of `GET /listings/:id/exists`.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Exists {
    /// Always `true`.
    pub success: bool,

    /// Indicator whether the [`Listing`] exists.
    pub exists: bool,
}

/// `GET /listings/:id/exists`
///
/// # Errors
///
/// If the store fails.
#[tracing::instrument(skip_all, fields(%id))]
pub async fn exists(
    Extension(service): Extension<Service>,
    Path(id): Path<String>,
) -> Result<Json<Exists>, Error> {
    let Ok(id) = parse_id(&id) else {
        return Ok(Json(Exists {
            success: true,
            exists: false,
        }));
    };
    let listing = service
        .execute(query::listing::ById::by(id))
        .await
        .map_err(AsError::into_error)?;
    Ok(Json(Exists {
        success: true,
        exists: listing.is_some(),
    }))
}

/// `POST /listings`
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - the [`Input`] violates business rules.
#[tracing::instrument(skip_all)]
pub async fn create(
    Extension(service): Extension<Service>,
    input: Result<Json<Input>, JsonRejection>,
) -> Result<(StatusCode, Json<Written>), Error> {
    let Json(input) = input.map_err(AsError::into_error)?;

    let written = service
        .execute(command::CreateListing {
            draft: input.into(),
        })
        .await
        .map_err(AsError::into_error)?;

    tracing::info!(
        id = %written.listing.id,
        number = %written.listing.property_number,
        "`Listing` created",
    );
    Ok((
        StatusCode::CREATED,
        Json(Written::new(written, "Listing created successfully")),
    ))
}

/// `PUT /listings/:id`
///
/// # Errors
///
/// Possible error codes:
/// - `LISTING_NOT_EXISTS` - the [`Listing`] doesn't exist;
/// - `VALIDATION_FAILED` - the [`Input`] violates business rules.
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update(
    Extension(service): Extension<Service>,
    Path(id): Path<String>,
    input: Result<Json<Input>, JsonRejection>,
) -> Result<Json<Written>, Error> {
    let id = parse_id(&id)?;
    let Json(input) = input.map_err(AsError::into_error)?;

    let written = service
        .execute(command::UpdateListing {
            id,
            draft: input.into(),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Written::new(written, "Listing updated successfully")))
}

/// Response of `DELETE /listings/:id`.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Deleted {
    /// Always `true`.
    pub success: bool,

    /// Human-readable outcome.
    pub message: &'static str,
}

/// `DELETE /listings/:id`
///
/// # Errors
///
/// Possible error codes:
/// - `LISTING_NOT_EXISTS` - the [`Listing`] doesn't exist.
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete(
    Extension(service): Extension<Service>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, Error> {
    let id = parse_id(&id)?;
    service
        .execute(command::DeleteListing { id })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Deleted {
        success: true,
        message: "Listing deleted successfully",
    }))
}

/// Query parameters of `GET /listings/:id/similar`.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimilarParams {
    /// Number of similar [`Listing`]s to return.
    #[serde(deserialize_with = "lenient::int")]
    pub limit: Option<i64>,
}

/// `GET /listings/:id/similar`
///
/// # Errors
///
/// Possible error codes:
/// - `LISTING_NOT_EXISTS` - the [`Listing`] doesn't exist;
/// - `INVALID_CRITERIA` - the `limit` is not positive.
#[tracing::instrument(skip_all, fields(%id))]
pub async fn similar(
    Extension(service): Extension<Service>,
    Path(id): Path<String>,
    params: Result<Query<SimilarParams>, QueryRejection>,
) -> Result<Json<Items<View>>, ListError> {
    let id = parse_id(&id)?;
    let Query(SimilarParams { limit }) =
        params.map_err(AsError::into_error)?;

    let similar = service
        .execute(query::listing::Similar { id, limit })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Items::new(similar.into_iter().map(View::from))))
}

/// `GET /listings/layouts`
///
/// # Errors
///
/// If the store fails.
#[tracing::instrument(skip_all)]
pub async fn layouts(
    Extension(service): Extension<Service>,
) -> Result<Json<Items<String>>, ListError> {
    distinct(&service, distinct::Field::Layout).await
}

/// `GET /listings/property-types`
///
/// # Errors
///
/// If the store fails.
#[tracing::instrument(skip_all)]
pub async fn property_types(
    Extension(service): Extension<Service>,
) -> Result<Json<Items<String>>, ListError> {
    distinct(&service, distinct::Field::PropertyType).await
}

/// Selects sorted distinct values of the provided [`distinct::Field`].
async fn distinct(
    service: &Service,
    field: distinct::Field,
) -> Result<Json<Items<String>>, ListError> {
    let values = service
        .execute(query::listings::Distinct::by(field))
        .await
        .map_err(AsError::into_error)?;
    Ok(Json(Items::new(values)))
}

impl AsError for query::listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidCriteria(e) => Some(api::invalid_criteria(e)),
            Self::NotExists(_) => Some(ListingError::NotExists.into()),
        }
    }
}

impl AsError for command::create_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Invalid(report) => Some(
                Error::from(ValidationError::Failed)
                    .with_items(report.errors.clone(), report.warnings.clone()),
            ),
        }
    }
}

impl AsError for command::update_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Invalid(report) => Some(
                Error::from(ValidationError::Failed)
                    .with_items(report.errors.clone(), report.warnings.clone()),
            ),
            Self::NotExists(_) => Some(ListingError::NotExists.into()),
        }
    }
}

impl AsError for command::delete_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotExists(_) => Some(ListingError::NotExists.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use serde_json::json;
    use service::domain::listing::{Draft, PropertyNumber};

    use super::{Input, View};

    #[test]
    fn blank_fees_become_null() {
        let input: Input = serde_json::from_value(json!({
            "title": "Quiet studio",
            "price": "2500000",
            "area": 25,
            "address": "3-4 Nakano, Nakano",
            "managementFee": "",
            "repairReserveFund": null,
            "otherFees": "3000",
            "areaLevel4": "Nakano",
        }))
        .unwrap();
        let draft = Draft::from(input);

        assert_eq!(draft.details.price, 2_500_000);
        assert_eq!(draft.details.fees.management_fee, None);
        assert_eq!(draft.details.fees.repair_reserve_fund, None);
        assert_eq!(draft.details.fees.other_fees, Some(3_000));
        assert_eq!(
            draft.details.hierarchy.area_level_4.as_deref(),
            Some("Nakano"),
        );
    }

    #[test]
    fn coordinates_require_both_parts() {
        let input: Input =
            serde_json::from_value(json!({"lat": 35.6})).unwrap();
        assert_eq!(Draft::from(input).details.coordinates, None);
    }

    #[test]
    fn view_is_camel_case_and_enriched() {
        let listing = Draft::from(
            serde_json::from_value::<Input>(json!({
                "title": "Family house",
                "price": 1_000_000,
                "area": 50,
                "address": "1-1 Sakura, Setagaya",
                "pets": true,
                "areaLevel2": "Tokyo",
            }))
            .unwrap(),
        )
        .into_new(PropertyNumber::generate(None), DateTime::now());

        let json = serde_json::to_value(View::from(listing)).unwrap();
        assert_eq!(json["pricePerSquareMeter"], json!(20_000));
        assert_eq!(json["marketCategory"], json!("mid-range"));
        assert_eq!(json["featuresScore"], json!(10));
        assert_eq!(json["areaLevel2"], json!("Tokyo"));
        assert_eq!(json["managementFee"], json!(null));
        assert!(json["createdAt"].is_string());
    }
}
