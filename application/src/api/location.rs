//! [`Location`]-related REST API definitions.

use std::collections::HashSet;

use axum::{
    extract::{rejection::QueryRejection, Path, Query},
    Extension, Json,
};
use common::Handler as _;
use serde::{Deserialize, Serialize};
#[cfg(doc)]
use service::domain::{Listing, Location};
use service::{
    domain::location::{Hierarchy, Kind, Suggestion},
    query::locations::{self, PopularLocation, POPULAR_SAMPLE_FACTOR},
    read::location::Sample,
};

use crate::{
    api::{lenient, Items, LocationError},
    AsError, Error, ListError, Service,
};

/// Default number of popular [`Location`]s.
pub const POPULAR_DEFAULT_LIMIT: usize = 20;

/// Default number of single-field suggestions.
pub const FIELD_DEFAULT_LIMIT: usize = 50;

/// Maximum number of popular [`Location`]s or single-field suggestions.
pub const MAX_LIMIT: usize = 100;

/// JSON representation of a [`Suggestion`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionView {
    /// [`Kind`] of the suggested [`Location`].
    #[serde(rename = "type")]
    pub kind: String,

    /// Raw value of the suggested [`Location`].
    pub value: String,

    /// Human-readable text of the suggested [`Location`].
    pub display_text: String,

    /// Known part of the [`Hierarchy`].
    #[serde(flatten)]
    pub hierarchy: Hierarchy,

    /// Number of [`Listing`]s at the [`Location`], if counted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl From<Suggestion> for SuggestionView {
    fn from(suggestion: Suggestion) -> Self {
        Self {
            kind: suggestion.kind().to_string(),
            value: suggestion.value().to_owned(),
            display_text: suggestion.display_text(),
            hierarchy: suggestion.hierarchy,
            count: None,
        }
    }
}

impl From<PopularLocation> for SuggestionView {
    fn from(popular: PopularLocation) -> Self {
        Self {
            count: Some(popular.count),
            ..popular.suggestion.into()
        }
    }
}

/// Query parameters of location suggestion endpoints.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Free-text query.
    #[serde(deserialize_with = "lenient::text")]
    pub q: Option<String>,

    /// Requested number of suggestions.
    #[serde(deserialize_with = "lenient::int")]
    pub limit: Option<i64>,
}

impl Params {
    /// Returns the requested positive limit, if any.
    fn limit(&self) -> Option<usize> {
        self.limit
            .and_then(|l| usize::try_from(l).ok())
            .filter(|l| *l > 0)
    }
}

/// `GET /listings/search/locations`
///
/// Never fails: failed lookups are treated as having no matches.
#[tracing::instrument(skip_all)]
pub async fn suggestions(
    Extension(service): Extension<Service>,
    params: Result<Query<Params>, QueryRejection>,
) -> Json<Items<SuggestionView>> {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let limit = params.limit();

    let suggestions = service
        .execute(locations::Suggestions {
            query: params.q.unwrap_or_default(),
            limit,
        })
        .await
        .unwrap_or_else(|e| match e {});

    Json(Items::new(suggestions.into_iter().map(SuggestionView::from)))
}

/// `GET /listings/search/popular-locations`
///
/// # Errors
///
/// If the store fails.
#[tracing::instrument(skip_all)]
pub async fn popular(
    Extension(service): Extension<Service>,
    params: Result<Query<Params>, QueryRejection>,
) -> Result<Json<Items<SuggestionView>>, ListError> {
    let Query(params) = params.map_err(AsError::into_error)?;
    let limit = params
        .limit()
        .unwrap_or(POPULAR_DEFAULT_LIMIT)
        .min(MAX_LIMIT);

    let popular = service
        .execute(locations::Popular { limit })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Items::new(popular.into_iter().map(SuggestionView::from))))
}

/// Response of `GET /listings/search/suggestions/:type`.
#[derive(Clone, Debug, Serialize)]
pub struct FieldSuggestions {
    /// Always `true`.
    pub success: bool,

    /// Suggested values.
    pub data: Vec<SuggestionView>,

    /// Number of the suggested values.
    pub count: usize,

    /// Requested suggestion type.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Parses the plural suggestion type of `GET /listings/search/suggestions`.
fn field_kind(raw: &str) -> Option<Kind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "cities" => Some(Kind::City),
        "areas" => Some(Kind::Area),
        "zipcodes" => Some(Kind::Zipcode),
        _ => None,
    }
}

/// Collects distinct single-field [`Suggestion`]s of the provided [`Kind`]
/// out of the sampled [`Hierarchy`] rows.
fn field_suggestions(
    kind: Kind,
    sample: impl IntoIterator<Item = Hierarchy>,
    limit: usize,
) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    sample
        .into_iter()
        .filter_map(|h| Suggestion::from_match(kind, h, None, ""))
        .filter(|s| seen.insert(s.key()))
        .take(limit)
        .collect()
}

/// `GET /listings/search/suggestions/:type`
///
/// The `q` parameter is ignored, the most recently listed values are
/// suggested.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_SUGGESTION_TYPE` - the type is not one of `cities`, `areas` or
///   `zipcodes`.
#[tracing::instrument(skip_all, fields(%ty))]
pub async fn by_field(
    Extension(service): Extension<Service>,
    Path(ty): Path<String>,
    params: Result<Query<Params>, QueryRejection>,
) -> Result<Json<FieldSuggestions>, ListError> {
    let kind =
        field_kind(&ty).ok_or_else(|| Error::from(LocationError::UnknownField))?;
    let Query(params) = params.map_err(AsError::into_error)?;
    let limit = params.limit().unwrap_or(FIELD_DEFAULT_LIMIT).min(MAX_LIMIT);

    let sample = service
        .execute(locations::ByField::by(Sample {
            kind,
            limit: limit.saturating_mul(POPULAR_SAMPLE_FACTOR),
        }))
        .await
        .map_err(AsError::into_error)?;

    let data = field_suggestions(kind, sample, limit)
        .into_iter()
        .map(SuggestionView::from)
        .collect::<Vec<_>>();
    Ok(Json(FieldSuggestions {
        success: true,
        count: data.len(),
        data,
        kind: ty,
    }))
}

#[cfg(test)]
mod spec {
    use serde_json::json;
    use service::domain::location::{Hierarchy, Kind, Suggestion};

    use super::{field_kind, field_suggestions, SuggestionView};

    fn hierarchy(city: &str, zip: &str) -> Hierarchy {
        Hierarchy {
            area_level_1: Some("Japan".into()),
            area_level_2: Some("Tokyo".into()),
            area_level_3: Some("Minato".into()),
            area_level_4: Some(city.into()),
            zipcode: Some(zip.into()),
        }
    }

    #[test]
    fn parses_field_kinds() {
        assert_eq!(field_kind("cities"), Some(Kind::City));
        assert_eq!(field_kind("Areas"), Some(Kind::Area));
        assert_eq!(field_kind("zipcodes"), Some(Kind::Zipcode));
        assert_eq!(field_kind("addresses"), None);
    }

    #[test]
    fn field_suggestions_are_distinct() {
        let sample = vec![
            hierarchy("Shibuya", "150-0001"),
            hierarchy("Shibuya", "150-0002"),
            hierarchy("Meguro", "153-0001"),
        ];
        let cities = field_suggestions(Kind::City, sample.clone(), 10);
        assert_eq!(
            cities.iter().map(Suggestion::value).collect::<Vec<_>>(),
            ["Shibuya", "Meguro"],
        );

        let zipcodes = field_suggestions(Kind::Zipcode, sample, 2);
        assert_eq!(
            zipcodes.iter().map(Suggestion::value).collect::<Vec<_>>(),
            ["150-0001", "150-0002"],
        );
    }

    #[test]
    fn view_flattens_hierarchy() {
        let suggestion = Suggestion::from_match(
            Kind::City,
            hierarchy("Shibuya", "150-0001"),
            None,
            "shib",
        )
        .unwrap();

        let json = serde_json::to_value(SuggestionView::from(suggestion))
            .unwrap();
        assert_eq!(json["type"], json!("city"));
        assert_eq!(json["value"], json!("Shibuya"));
        assert_eq!(json["areaLevel2"], json!("Tokyo"));
        assert_eq!(json["zipcode"], json!(null));
        assert!(json.get("count").is_none());
    }
}
