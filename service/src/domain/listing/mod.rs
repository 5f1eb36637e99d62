//! [`Listing`] definitions.

pub mod enrichment;
pub mod validation;

use std::sync::LazyLock;

use common::{unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::location;

pub use self::{
    enrichment::{Derived, MarketCategory, ValueAssessment},
    validation::Report,
};

/// Real-estate listing in the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct Listing {
    /// ID of this [`Listing`].
    pub id: Id,

    /// [`PropertyNumber`] of this [`Listing`].
    ///
    /// Never changes once assigned on creation.
    pub property_number: PropertyNumber,

    /// Editable [`Details`] of this [`Listing`].
    pub details: Details,

    /// [`DateTime`] when this [`Listing`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Listing`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Listing {
    /// Computes [`Derived`] fields of this [`Listing`] as of the current
    /// year.
    #[must_use]
    pub fn derived(&self) -> Derived {
        Derived::of(&self.details, DateTime::now().year())
    }
}

/// Editable details of a [`Listing`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Details {
    /// Title of a [`Listing`].
    pub title: String,

    /// Price of a [`Listing`].
    pub price: Price,

    /// Floor area of a [`Listing`], in square meters.
    pub area: Area,

    /// Type of the property, like `apartment` or `house`.
    pub property_type: Option<String>,

    /// Room layout, like `2LDK`.
    pub layout: Option<String>,

    /// Building structure, like `RC`.
    pub structure: Option<String>,

    /// Full street address.
    pub address: String,

    /// Free-text description of nearby transportation.
    pub transportation: Option<String>,

    /// Position of a [`Listing`] in the [`location::Hierarchy`].
    pub hierarchy: location::Hierarchy,

    /// [`Coordinates`] of a [`Listing`], if geocoded.
    pub coordinates: Option<Coordinates>,

    /// Recurring and one-time [`Fees`].
    pub fees: Fees,

    /// Balcony area, in square meters.
    pub balcony_area: Option<Area>,

    /// Total number of units in the building.
    pub total_units: Option<i32>,

    /// Free-text year (and possibly month) the building was built in.
    pub year_built: Option<String>,

    /// [`Amenities`] of a [`Listing`].
    pub amenities: Amenities,

    /// Transaction mode, like `sale`.
    pub transaction_mode: Option<String>,

    /// Ordered references to images.
    pub images: Vec<String>,
}

impl Details {
    /// Extracts the calendar year out of the [`Details::year_built`] text.
    ///
    /// The first four consecutive digits are considered as a year.
    #[must_use]
    pub fn built_year(&self) -> Option<i32> {
        static REGEX: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\d{4}").expect("valid regex"));

        REGEX
            .find(self.year_built.as_deref()?)
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Candidate data for creating or updating a [`Listing`].
#[derive(Clone, Debug, Default)]
pub struct Draft {
    /// Caller-supplied [`PropertyNumber`], if any.
    pub property_number: Option<String>,

    /// [`Details`] of the [`Listing`].
    pub details: Details,
}

impl Draft {
    /// Turns this [`Draft`] into a new [`Listing`] created at the provided
    /// [`DateTime`].
    #[must_use]
    pub fn into_new(
        self,
        property_number: PropertyNumber,
        at: DateTime,
    ) -> Listing {
        Listing {
            id: Id::new(),
            property_number,
            details: self.details,
            created_at: at.coerce(),
            updated_at: at.coerce(),
        }
    }

    /// Applies this [`Draft`] onto the `existing` [`Listing`] at the provided
    /// [`DateTime`].
    ///
    /// [`PropertyNumber`] and creation [`DateTime`] of the `existing`
    /// [`Listing`] are always preserved.
    #[must_use]
    pub fn into_updated(self, existing: &Listing, at: DateTime) -> Listing {
        Listing {
            id: existing.id,
            property_number: existing.property_number.clone(),
            details: self.details,
            created_at: existing.created_at,
            updated_at: at.coerce(),
        }
    }
}

/// ID of a [`Listing`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Human-readable unique number of a [`Listing`].
#[derive(
    AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct PropertyNumber(String);

impl PropertyNumber {
    /// Maximum length of a [`PropertyNumber`].
    pub const MAX_LEN: usize = 50;

    /// Prefix used when no property type is known.
    const DEFAULT_PREFIX: &'static str = "PRO";

    /// Creates a new [`PropertyNumber`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`PropertyNumber`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Generates a new random [`PropertyNumber`] for a [`Listing`] of the
    /// provided `property_type`.
    ///
    /// Uniqueness is not guaranteed, and must be enforced by the store.
    #[must_use]
    pub fn generate(property_type: Option<&str>) -> Self {
        Self::generate_with(
            property_type,
            DateTime::now(),
            Uuid::new_v4().as_u128(),
        )
    }

    /// Generates a new [`PropertyNumber`] in the
    /// `{PREFIX}-{timestamp}-{suffix}` format, where:
    /// - `PREFIX` is the first 3 alphanumeric characters of the
    ///   `property_type`, uppercased;
    /// - `timestamp` is the last 6 digits of the milliseconds timestamp;
    /// - `suffix` is 3 base-36 characters derived from the `entropy`.
    #[must_use]
    pub fn generate_with<Of: ?Sized>(
        property_type: Option<&str>,
        at: DateTimeOf<Of>,
        entropy: u128,
    ) -> Self {
        const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

        let mut prefix = property_type
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(3)
            .collect::<String>()
            .to_ascii_uppercase();
        if prefix.is_empty() {
            prefix = Self::DEFAULT_PREFIX.to_owned();
        }

        let timestamp = at.unix_timestamp_millis().rem_euclid(1_000_000);

        let mut entropy = entropy;
        let suffix = (0..3)
            .map(|_| {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "always less than 36"
                )]
                let idx = (entropy % 36) as usize;
                entropy /= 36;
                char::from(ALPHABET[idx])
            })
            .collect::<String>();

        Self(format!("{prefix}-{timestamp:06}-{suffix}"))
    }

    /// Checks whether the given `number` is a valid [`PropertyNumber`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`PropertyNumber`] invariants:
        /// - Must not be empty;
        /// - Must contain only ASCII letters, digits, whitespace or hyphens.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[A-Za-z0-9\s\-]+$").expect("valid regex")
        });

        let number = number.as_ref();
        number.len() <= Self::MAX_LEN && REGEX.is_match(number)
    }
}

impl FromStr for PropertyNumber {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `PropertyNumber`")
    }
}

/// Price of a [`Listing`], in the smallest currency unit.
pub type Price = i64;

/// Area, in square meters.
pub type Area = f64;

/// Fee amount, in the smallest currency unit.
pub type Fee = i64;

/// Geographic coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    /// Latitude, in degrees.
    pub lat: f64,

    /// Longitude, in degrees.
    pub lng: f64,
}

/// Fees of a [`Listing`].
///
/// Every fee is either a known non-negative amount or unknown.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Fees {
    /// Monthly management fee.
    pub management_fee: Option<Fee>,

    /// Monthly repair reserve fund.
    pub repair_reserve_fund: Option<Fee>,

    /// Monthly land lease fee.
    pub land_lease_fee: Option<Fee>,

    /// One-time right fee.
    pub right_fee: Option<Fee>,

    /// One-time deposit or guarantee.
    pub deposit_guarantee: Option<Fee>,

    /// Monthly maintenance fees.
    pub maintenance_fees: Option<Fee>,

    /// Other monthly fees.
    pub other_fees: Option<Fee>,
}

impl Fees {
    /// Iterates over all the fees along with their names.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<Fee>)> {
        [
            ("managementFee", self.management_fee),
            ("repairReserveFund", self.repair_reserve_fund),
            ("landLeaseFee", self.land_lease_fee),
            ("rightFee", self.right_fee),
            ("depositGuarantee", self.deposit_guarantee),
            ("maintenanceFees", self.maintenance_fees),
            ("otherFees", self.other_fees),
        ]
        .into_iter()
    }

    /// Sums the recurring monthly fees, treating unknown ones as zero.
    #[must_use]
    pub fn total_monthly(&self) -> Fee {
        [
            self.management_fee,
            self.maintenance_fees,
            self.land_lease_fee,
            self.other_fees,
        ]
        .into_iter()
        .flatten()
        .sum()
    }
}

/// Amenities of a [`Listing`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Amenities {
    /// Whether pets are allowed, if known.
    pub pets: Option<bool>,

    /// Parking description, `none` if there is no parking.
    pub parking: Option<String>,

    /// Kitchen description.
    pub kitchen: Option<String>,

    /// Bath and toilet description.
    pub bath_toilet: Option<String>,
}

/// [`DateTime`] when a [`Listing`] was created.
pub type CreationDateTime = DateTimeOf<(Listing, unit::Creation)>;

/// [`DateTime`] when a [`Listing`] was modified.
pub type ModificationDateTime = DateTimeOf<(Listing, unit::Modification)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{Details, Fees, PropertyNumber};

    #[test]
    fn generates_property_number() {
        let at = DateTime::from_rfc3339("2024-03-15T10:20:30.123Z").unwrap();

        let number =
            PropertyNumber::generate_with(Some("apartment"), at, 36 * 36 + 11);
        assert_eq!(AsRef::<str>::as_ref(&number), "APA-030123-B01");

        let number = PropertyNumber::generate_with(None, at, 0);
        assert_eq!(AsRef::<str>::as_ref(&number), "PRO-030123-000");

        let number = PropertyNumber::generate_with(Some("マンション"), at, 0);
        assert_eq!(AsRef::<str>::as_ref(&number), "PRO-030123-000");
    }

    #[test]
    fn generated_property_number_is_valid() {
        let number = PropertyNumber::generate(Some("house"));
        assert!(PropertyNumber::new(number.to_string()).is_some());
    }

    #[test]
    fn checks_property_number() {
        assert!(PropertyNumber::new("ABC-123 X").is_some());
        assert!(PropertyNumber::new("").is_none());
        assert!(PropertyNumber::new("ABC_123").is_none());
        assert!(PropertyNumber::new("A".repeat(51)).is_none());
    }

    #[test]
    fn extracts_built_year() {
        let mut details = Details {
            year_built: Some("2015年3月".into()),
            ..Details::default()
        };
        assert_eq!(details.built_year(), Some(2015));

        details.year_built = Some("unknown".into());
        assert_eq!(details.built_year(), None);

        details.year_built = None;
        assert_eq!(details.built_year(), None);
    }

    #[test]
    fn sums_monthly_fees() {
        let fees = Fees {
            management_fee: Some(10_000),
            repair_reserve_fund: Some(8_000),
            maintenance_fees: Some(2_000),
            other_fees: None,
            land_lease_fee: Some(500),
            ..Fees::default()
        };
        assert_eq!(fees.total_monthly(), 12_500);
        assert_eq!(Fees::default().total_monthly(), 0);
    }
}
