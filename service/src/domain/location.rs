//! [`Location`] definitions.

use common::define_kind;
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::domain::Listing;

/// Position of a [`Listing`] in the administrative hierarchy.
///
/// Levels go from the least specific (`area_level_1`) to the most specific
/// (`area_level_4`) one. City-level names live in `area_level_4`, districts
/// in `area_level_3` and prefectures in `area_level_2`.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hierarchy {
    /// First (least specific) level.
    pub area_level_1: Option<String>,

    /// Second level (prefecture).
    pub area_level_2: Option<String>,

    /// Third level (district).
    pub area_level_3: Option<String>,

    /// Fourth (most specific) level (city).
    pub area_level_4: Option<String>,

    /// Postal code.
    pub zipcode: Option<String>,
}

define_kind! {
    #[doc = "Kind of a [`Location`], ordered by its suggestion priority."]
    #[case = "lowercase"]
    enum Kind {
        #[doc = "Postal code."]
        Zipcode = 1,

        #[doc = "City."]
        City = 2,

        #[doc = "District."]
        Area = 3,

        #[doc = "Street address."]
        Address = 4,
    }
}

/// Location selected by a user to narrow down [`Listing`]s.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Location {
    /// Exact postal code.
    Zipcode(String),

    /// Exact city name.
    City(String),

    /// Exact district name.
    Area(String),

    /// Part of a street address.
    Address(String),
}

impl Location {
    /// Creates a new [`Location`] of the provided [`Kind`].
    #[must_use]
    pub fn new(kind: Kind, value: impl Into<String>) -> Self {
        let value = value.into();
        match kind {
            Kind::Zipcode => Self::Zipcode(value),
            Kind::City => Self::City(value),
            Kind::Area => Self::Area(value),
            Kind::Address => Self::Address(value),
        }
    }

    /// Returns [`Kind`] of this [`Location`].
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Zipcode(_) => Kind::Zipcode,
            Self::City(_) => Kind::City,
            Self::Area(_) => Kind::Area,
            Self::Address(_) => Kind::Address,
        }
    }

    /// Returns the raw value of this [`Location`].
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Zipcode(v)
            | Self::City(v)
            | Self::Area(v)
            | Self::Address(v) => v,
        }
    }
}

/// Candidate [`Location`] matching a search query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Suggestion {
    /// Suggested [`Location`].
    pub location: Location,

    /// Known part of the [`Hierarchy`] at the [`Location`] granularity.
    pub hierarchy: Hierarchy,

    /// Query term produced this [`Suggestion`].
    pub term: String,
}

impl Suggestion {
    /// Builds a [`Suggestion`] of the provided [`Kind`] out of a matched
    /// [`Hierarchy`] and `address`.
    ///
    /// [`None`] is returned if the matched row has no value for the [`Kind`].
    #[must_use]
    pub fn from_match(
        kind: Kind,
        hierarchy: Hierarchy,
        address: Option<String>,
        term: impl Into<String>,
    ) -> Option<Self> {
        let value = match kind {
            Kind::Zipcode => hierarchy.zipcode.clone(),
            Kind::City => hierarchy.area_level_4.clone(),
            Kind::Area => hierarchy.area_level_3.clone(),
            Kind::Address => address,
        }
        .filter(|v| !v.trim().is_empty())?;

        let hierarchy = match kind {
            Kind::Area => Hierarchy {
                area_level_4: None,
                zipcode: None,
                ..hierarchy
            },
            Kind::City => Hierarchy {
                zipcode: None,
                ..hierarchy
            },
            Kind::Zipcode | Kind::Address => hierarchy,
        };

        Some(Self {
            location: Location::new(kind, value),
            hierarchy,
            term: term.into(),
        })
    }

    /// Returns [`Kind`] of this [`Suggestion`].
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.location.kind()
    }

    /// Returns the raw value of this [`Suggestion`].
    #[must_use]
    pub fn value(&self) -> &str {
        self.location.value()
    }

    /// Returns human-readable text of this [`Suggestion`].
    #[must_use]
    pub fn display_text(&self) -> String {
        let prefecture = self.hierarchy.area_level_2.as_deref();
        let city = self.hierarchy.area_level_4.as_deref();
        let value = self.value();
        match self.kind() {
            Kind::Zipcode => {
                let place = join([city, prefecture]);
                if place.is_empty() {
                    value.to_owned()
                } else {
                    format!("{value} - {place}")
                }
            }
            Kind::City | Kind::Area => join([Some(value), prefecture]),
            Kind::Address => value.to_owned(),
        }
    }

    /// Returns the deduplication key of this [`Suggestion`].
    ///
    /// Two [`Suggestion`]s with equal keys denote the same place.
    #[must_use]
    pub fn key(&self) -> String {
        let kind = self.kind();
        let value = self.value();
        match kind {
            Kind::City | Kind::Area => format!(
                "{kind}-{value}-{}",
                self.hierarchy.area_level_2.as_deref().unwrap_or_default(),
            ),
            Kind::Zipcode | Kind::Address => format!("{kind}-{value}"),
        }
    }

    /// Indicates whether this [`Suggestion`] contains the provided lowercased
    /// `query` in its value or display text.
    #[must_use]
    pub fn contains(&self, query: &str) -> bool {
        self.value().to_lowercase().contains(query)
            || self.display_text().to_lowercase().contains(query)
    }
}

/// Joins the present non-empty parts with a comma.
fn join<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod spec {
    use super::{Hierarchy, Kind, Location, Suggestion};

    fn shibuya() -> Hierarchy {
        Hierarchy {
            area_level_1: Some("Japan".into()),
            area_level_2: Some("Tokyo".into()),
            area_level_3: Some("Dogenzaka".into()),
            area_level_4: Some("Shibuya".into()),
            zipcode: Some("150-0043".into()),
        }
    }

    #[test]
    fn builds_suggestions_of_each_kind() {
        let address = Some("1-2-3 Dogenzaka, Shibuya".to_owned());

        let zip =
            Suggestion::from_match(Kind::Zipcode, shibuya(), None, "150")
                .unwrap();
        assert_eq!(zip.location, Location::Zipcode("150-0043".into()));
        assert_eq!(zip.display_text(), "150-0043 - Shibuya, Tokyo");
        assert_eq!(zip.key(), "zipcode-150-0043");

        let city =
            Suggestion::from_match(Kind::City, shibuya(), None, "Shib")
                .unwrap();
        assert_eq!(city.display_text(), "Shibuya, Tokyo");
        assert_eq!(city.key(), "city-Shibuya-Tokyo");
        assert_eq!(city.hierarchy.zipcode, None);

        let area =
            Suggestion::from_match(Kind::Area, shibuya(), None, "Dogen")
                .unwrap();
        assert_eq!(area.display_text(), "Dogenzaka, Tokyo");
        assert_eq!(area.key(), "area-Dogenzaka-Tokyo");
        assert_eq!(area.hierarchy.area_level_4, None);

        let addr =
            Suggestion::from_match(Kind::Address, shibuya(), address, "1-2")
                .unwrap();
        assert_eq!(addr.display_text(), "1-2-3 Dogenzaka, Shibuya");
        assert_eq!(addr.term, "1-2");
    }

    #[test]
    fn skips_missing_values() {
        let hierarchy = Hierarchy {
            zipcode: None,
            ..shibuya()
        };
        assert!(
            Suggestion::from_match(Kind::Zipcode, hierarchy, None, "x")
                .is_none()
        );
        assert!(
            Suggestion::from_match(Kind::Address, shibuya(), None, "x")
                .is_none()
        );
    }

    #[test]
    fn kind_priority_order() {
        assert!(Kind::Zipcode < Kind::City);
        assert!(Kind::City < Kind::Area);
        assert!(Kind::Area < Kind::Address);
        assert_eq!(Kind::Zipcode.to_string(), "zipcode");
        assert_eq!("CITY".parse::<Kind>().unwrap(), Kind::City);
    }

    #[test]
    fn contains_query() {
        let city =
            Suggestion::from_match(Kind::City, shibuya(), None, "Shib")
                .unwrap();
        assert!(city.contains("shibuya, tokyo"));
        assert!(city.contains("shib"));
        assert!(!city.contains("tokyo, shibuya"));
    }
}
