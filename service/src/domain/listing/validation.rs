//! Business-rule validation of [`Listing`] candidates.

use std::sync::LazyLock;

use derive_more::{Display, Error};
use regex::Regex;

#[cfg(doc)]
use super::Listing;
use super::{enrichment, Draft, Listing as Existing, Price, PropertyNumber};

/// Minimum number of characters in a title.
pub const MIN_TITLE_LEN: usize = 3;

/// Minimum number of characters in an address.
pub const MIN_ADDRESS_LEN: usize = 5;

/// Earliest acceptable building year.
pub const MIN_BUILT_YEAR: i32 = 1800;

/// Number of years into the future a building year may point to.
pub const MAX_BUILT_YEAR_SKEW: i32 = 2;

/// Unit price below which a listing is suspiciously cheap.
pub const MIN_PLAUSIBLE_UNIT_PRICE: Price = 1_000;

/// Unit price above which a listing is suspiciously expensive.
pub const MAX_PLAUSIBLE_UNIT_PRICE: Price = 100_000;

/// Annualized management fee to price ratio above which a listing is
/// suspicious.
pub const MAX_MANAGEMENT_FEE_RATIO: f64 = 0.1;

/// Maximum number of images.
pub const MAX_IMAGES: usize = 20;

/// Property types considered standard.
pub const STANDARD_PROPERTY_TYPES: &[&str] = &[
    "apartment",
    "house",
    "condo",
    "townhouse",
    "studio",
    "penthouse",
    "duplex",
    "commercial",
    "land",
    "other",
];

/// Result of validating a [`Listing`] candidate.
#[derive(Clone, Debug, Default, Display, Eq, Error, PartialEq)]
#[display("{}", errors.join("; "))]
pub struct Report {
    /// Hard errors blocking the write.
    pub errors: Vec<String>,

    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl Report {
    /// Indicates whether this [`Report`] has no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a hard error.
    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Records a warning.
    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Validates a [`Draft`] of a new [`Listing`] as of the `current_year`.
#[must_use]
pub fn for_create(candidate: &Draft, current_year: i32) -> Report {
    let mut report = Report::default();

    if let Some(number) = &candidate.property_number {
        if PropertyNumber::new(number.clone()).is_none() {
            report.error(format!(
                "Property number must contain only letters, digits, spaces \
                 or hyphens, and be at most {} characters",
                PropertyNumber::MAX_LEN,
            ));
        }
    }
    check_details(candidate, current_year, &mut report);

    report
}

/// Validates a [`Draft`] updating the `existing` [`Listing`] as of the
/// `current_year`.
///
/// A caller-supplied property number conflicting with the stored one is
/// reported as a warning, because it is always discarded on update.
#[must_use]
pub fn for_update(
    candidate: &Draft,
    existing: &Existing,
    current_year: i32,
) -> Report {
    let mut report = Report::default();

    if let Some(number) = &candidate.property_number {
        if number != AsRef::<str>::as_ref(&existing.property_number) {
            report.warn(format!(
                "Property number cannot be changed, keeping `{}`",
                existing.property_number,
            ));
        }
    }
    check_details(candidate, current_year, &mut report);

    report
}

/// Checks the [`Details`] of the provided [`Draft`].
///
/// [`Details`]: super::Details
fn check_details(candidate: &Draft, current_year: i32, report: &mut Report) {
    let details = &candidate.details;

    if details.title.trim().chars().count() < MIN_TITLE_LEN {
        report.error(format!(
            "Title must be at least {MIN_TITLE_LEN} characters long",
        ));
    }
    if details.price <= 0 {
        report.error("Price must be greater than 0");
    }
    if details.address.trim().chars().count() < MIN_ADDRESS_LEN {
        report.error(format!(
            "Address must be at least {MIN_ADDRESS_LEN} characters long",
        ));
    }
    if details.area.is_nan() || details.area <= 0.0 {
        report.error("Area must be greater than 0");
    }
    if details.balcony_area.is_some_and(|a| a.is_nan() || a < 0.0) {
        report.error("Balcony area cannot be negative");
    }
    if details.total_units.is_some_and(|u| u < 1) {
        report.error("Total units must be at least 1");
    }

    if details.year_built.as_deref().is_some_and(|y| !y.trim().is_empty()) {
        let latest = current_year + MAX_BUILT_YEAR_SKEW;
        match details.built_year() {
            Some(year) if year > latest => report.error(format!(
                "Year built cannot be later than {latest}",
            )),
            Some(year) if year < MIN_BUILT_YEAR => report.error(format!(
                "Year built cannot be earlier than {MIN_BUILT_YEAR}",
            )),
            Some(_) => {}
            None => report.error("Year built must contain a 4-digit year"),
        }
    }

    if let Some(c) = details.coordinates {
        if !(-90.0..=90.0).contains(&c.lat) {
            report.error("Latitude must be between -90 and 90");
        }
        if !(-180.0..=180.0).contains(&c.lng) {
            report.error("Longitude must be between -180 and 180");
        }
    }

    for (name, fee) in details.fees.iter() {
        if fee.is_some_and(|f| f < 0) {
            report.error(format!("`{name}` cannot be negative"));
        }
    }

    if let Some(zipcode) = &details.hierarchy.zipcode {
        if !is_zipcode(zipcode) {
            report.error("Zipcode must be in `NNN-NNNN` format");
        }
    }

    if details.images.len() > MAX_IMAGES {
        report.error(format!("Maximum {MAX_IMAGES} images allowed"));
    }
    for (i, image) in details.images.iter().enumerate() {
        if !is_image(image) {
            report.error(format!("Image {} must be a valid image file", i + 1));
        }
    }

    if let Some(ty) = &details.property_type {
        if !STANDARD_PROPERTY_TYPES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(ty.trim()))
        {
            report.warn(format!("Non-standard property type `{ty}`"));
        }
    }

    if let Some(unit_price) =
        enrichment::price_per_square_meter(details.price, details.area)
    {
        if unit_price < MIN_PLAUSIBLE_UNIT_PRICE {
            report.warn(format!(
                "Price per square meter ({unit_price}) seems unusually low",
            ));
        } else if unit_price > MAX_PLAUSIBLE_UNIT_PRICE {
            report.warn(format!(
                "Price per square meter ({unit_price}) seems unusually high",
            ));
        }
    }

    if let Some(fee) = details.fees.management_fee {
        if details.price > 0 {
            #[expect(
                clippy::cast_precision_loss,
                reason = "prices are far below `f64` mantissa limits"
            )]
            let ratio =
                fee.saturating_mul(12) as f64 / details.price as f64;
            if ratio > MAX_MANAGEMENT_FEE_RATIO {
                report.warn("Annual management fee exceeds 10% of the price");
            }
        }
    }
}

/// Checks whether the provided `zipcode` is in `NNN-NNNN` format.
fn is_zipcode(zipcode: &str) -> bool {
    static REGEX: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\d{3}-\d{4}$").expect("valid regex"));

    REGEX.is_match(zipcode)
}

/// Checks whether the provided `image` reference points to an image file.
fn is_image(image: &str) -> bool {
    static REGEX: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp)$").expect("valid regex")
    });

    REGEX.is_match(image)
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{for_create, for_update, MAX_BUILT_YEAR_SKEW};
    use crate::domain::listing::{
        Coordinates, Details, Draft, Fees, PropertyNumber,
    };

    const YEAR: i32 = 2024;

    fn valid() -> Draft {
        Draft {
            property_number: None,
            details: Details {
                title: "Sunny 2LDK near station".into(),
                price: 3_000_000,
                area: 60.0,
                property_type: Some("apartment".into()),
                address: "1-2-3 Dogenzaka, Shibuya".into(),
                year_built: Some("2015年3月".into()),
                ..Details::default()
            },
        }
    }

    #[test]
    fn accepts_valid_candidate() {
        let report = for_create(&valid(), YEAR);
        assert!(report.is_valid(), "{report:?}");
        assert!(report.warnings.is_empty(), "{report:?}");
    }

    #[test]
    fn rejects_basic_violations() {
        let mut draft = valid();
        draft.details.title = "ab".into();
        draft.details.price = 0;
        draft.details.area = 0.0;
        draft.details.address = "abc".into();
        draft.details.total_units = Some(0);
        draft.details.balcony_area = Some(-1.0);

        let report = for_create(&draft, YEAR);
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 6, "{report:?}");
    }

    #[test]
    fn rejects_far_future_built_year() {
        let mut draft = valid();
        draft.details.year_built = Some((YEAR + 5).to_string());
        let report = for_create(&draft, YEAR);
        assert!(!report.is_valid());
        assert!(report.warnings.is_empty());

        draft.details.year_built =
            Some((YEAR + MAX_BUILT_YEAR_SKEW).to_string());
        assert!(for_create(&draft, YEAR).is_valid());

        draft.details.year_built = Some("1700".into());
        assert!(!for_create(&draft, YEAR).is_valid());
    }

    #[test]
    fn rejects_negative_fees_and_bad_formats() {
        let mut draft = valid();
        draft.details.fees = Fees {
            management_fee: Some(-1),
            ..Fees::default()
        };
        draft.details.hierarchy.zipcode = Some("1500043".into());
        draft.details.images = vec!["a.png".into(), "b.txt".into()];
        draft.details.coordinates = Some(Coordinates {
            lat: 91.0,
            lng: 10.0,
        });
        draft.property_number = Some("BAD_NUMBER".into());

        let report = for_create(&draft, YEAR);
        assert_eq!(report.errors.len(), 5, "{report:?}");
    }

    #[test]
    fn warns_on_implausible_values() {
        let mut draft = valid();
        draft.details.price = 30_000;
        draft.details.property_type = Some("castle".into());
        draft.details.fees.management_fee = Some(1_000);

        let report = for_create(&draft, YEAR);
        assert!(report.is_valid(), "{report:?}");
        assert_eq!(report.warnings.len(), 3, "{report:?}");

        draft.details.price = 6_000_000_000;
        draft.details.property_type = None;
        draft.details.fees.management_fee = None;
        let report = for_create(&draft, YEAR);
        assert_eq!(report.warnings.len(), 1, "{report:?}");
    }

    #[test]
    fn update_keeps_property_number() {
        let existing = valid().into_new(
            PropertyNumber::new("APA-000001-ABC").unwrap(),
            DateTime::now(),
        );

        let mut draft = valid();
        draft.property_number = Some("OTHER-1".into());
        let report = for_update(&draft, &existing, YEAR);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);

        let updated = draft.into_updated(&existing, DateTime::now());
        assert_eq!(updated.property_number, existing.property_number);
        assert_eq!(updated.created_at, existing.created_at);
        assert_eq!(updated.id, existing.id);

        let mut draft = valid();
        draft.property_number = Some("APA-000001-ABC".into());
        assert!(for_update(&draft, &existing, YEAR).warnings.is_empty());
    }
}
