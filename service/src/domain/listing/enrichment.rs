//! [`Derived`] fields of a [`Listing`].

use common::define_kind;

#[cfg(doc)]
use super::Listing;
use super::{Area, Details, Fee, Price};

define_kind! {
    #[doc = "Market category of a [`Listing`] by its price band."]
    #[case = "kebab-case"]
    enum MarketCategory {
        #[doc = "Lowest price band."]
        Budget = 1,

        #[doc = "Middle price band."]
        MidRange = 2,

        #[doc = "Highest price band."]
        Luxury = 3,
    }
}

/// Upper (exclusive) price bounds of [`MarketCategory`]s in ascending order.
///
/// Prices above the last bound belong to [`MarketCategory::Luxury`].
pub const MARKET_CATEGORY_BOUNDS: &[(MarketCategory, Price)] = &[
    (MarketCategory::Budget, 500_000),
    (MarketCategory::MidRange, 1_500_000),
];

impl MarketCategory {
    /// Categorizes the provided `price`.
    #[must_use]
    pub fn of(price: Price) -> Self {
        MARKET_CATEGORY_BOUNDS
            .iter()
            .find(|(_, upper)| price < *upper)
            .map_or(Self::Luxury, |(category, _)| *category)
    }

    /// Returns the price band of this [`MarketCategory`] as
    /// `(inclusive minimum, exclusive maximum)`.
    #[must_use]
    pub fn price_bounds(self) -> (Price, Option<Price>) {
        let mut min = 0;
        for &(category, upper) in MARKET_CATEGORY_BOUNDS {
            if category == self {
                return (min, Some(upper));
            }
            min = upper;
        }
        (min, None)
    }
}

define_kind! {
    #[doc = "Qualitative value assessment of a [`Listing`] by its unit price."]
    #[case = "snake_case"]
    enum ValueAssessment {
        #[doc = "Unit price well below the market."]
        ExcellentValue = 1,

        #[doc = "Unit price below the market."]
        GoodValue = 2,

        #[doc = "Unit price around the market."]
        FairValue = 3,

        #[doc = "Unit price above the market."]
        PremiumPricing = 4,
    }
}

/// Upper (exclusive) unit price bounds of [`ValueAssessment`]s in ascending
/// order.
///
/// Unit prices above the last bound are [`ValueAssessment::PremiumPricing`].
pub const VALUE_ASSESSMENT_BOUNDS: &[(ValueAssessment, Price)] = &[
    (ValueAssessment::ExcellentValue, 3_000),
    (ValueAssessment::GoodValue, 6_000),
    (ValueAssessment::FairValue, 10_000),
];

impl ValueAssessment {
    /// Assesses the provided `unit_price`.
    #[must_use]
    pub fn of(unit_price: Price) -> Self {
        VALUE_ASSESSMENT_BOUNDS
            .iter()
            .find(|(_, upper)| unit_price < *upper)
            .map_or(Self::PremiumPricing, |(assessment, _)| *assessment)
    }
}

/// Points added to the features score for allowed pets.
pub const PETS_SCORE: u8 = 10;

/// Points added to the features score for available parking.
pub const PARKING_SCORE: u8 = 15;

/// Points added to the features score for a balcony.
pub const BALCONY_SCORE: u8 = 5;

/// Points added to the features score for a modern kitchen.
pub const MODERN_KITCHEN_SCORE: u8 = 10;

/// Points added to the features score for a separate bath and toilet.
pub const SEPARATE_BATH_SCORE: u8 = 5;

/// Maximum features score.
pub const MAX_FEATURES_SCORE: u8 = 100;

/// Fields of a [`Listing`] computed out of its stored [`Details`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Derived {
    /// Price per square meter, if area is known.
    pub price_per_square_meter: Option<Price>,

    /// [`MarketCategory`] by price.
    pub market_category: MarketCategory,

    /// [`ValueAssessment`] by unit price, if area is known.
    pub value_assessment: Option<ValueAssessment>,

    /// Additive amenities score in `0..=100` range.
    pub features_score: u8,

    /// Sum of recurring monthly fees.
    pub total_monthly_costs: Fee,

    /// Age of the building in years, if its year is known.
    pub property_age: Option<i32>,
}

impl Derived {
    /// Computes [`Derived`] fields of the provided [`Details`] as of the
    /// `current_year`.
    #[must_use]
    pub fn of(details: &Details, current_year: i32) -> Self {
        let price_per_square_meter =
            price_per_square_meter(details.price, details.area);
        Self {
            price_per_square_meter,
            market_category: MarketCategory::of(details.price),
            value_assessment: price_per_square_meter.map(ValueAssessment::of),
            features_score: features_score(details),
            total_monthly_costs: details.fees.total_monthly(),
            property_age: details.built_year().map(|y| current_year - y),
        }
    }
}

/// Computes the rounded price per square meter.
///
/// [`None`] is returned if `area` is not positive.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "prices are far below `f64` mantissa limits"
)]
#[must_use]
pub fn price_per_square_meter(price: Price, area: Area) -> Option<Price> {
    (area > 0.0).then(|| (price as f64 / area).round() as Price)
}

/// Computes the additive amenities score capped at [`MAX_FEATURES_SCORE`].
#[must_use]
pub fn features_score(details: &Details) -> u8 {
    let amenities = &details.amenities;
    let contains = |text: &Option<String>, needle: &str| {
        text.as_deref()
            .is_some_and(|t| t.to_lowercase().contains(needle))
    };

    let mut score = 0_u8;
    if amenities.pets == Some(true) {
        score += PETS_SCORE;
    }
    if amenities.parking.as_deref().is_some_and(|p| {
        let p = p.trim();
        !p.is_empty() && !p.eq_ignore_ascii_case("none")
    }) {
        score += PARKING_SCORE;
    }
    if details.balcony_area.is_some_and(|a| a > 0.0) {
        score += BALCONY_SCORE;
    }
    if contains(&amenities.kitchen, "modern") {
        score += MODERN_KITCHEN_SCORE;
    }
    if contains(&amenities.bath_toilet, "separate") {
        score += SEPARATE_BATH_SCORE;
    }
    score.min(MAX_FEATURES_SCORE)
}

#[cfg(test)]
mod spec {
    use super::{
        features_score, price_per_square_meter, Derived, MarketCategory,
        ValueAssessment,
    };
    use crate::domain::listing::{Amenities, Details, Fees};

    #[test]
    fn categorizes_market() {
        assert_eq!(MarketCategory::of(0), MarketCategory::Budget);
        assert_eq!(MarketCategory::of(499_999), MarketCategory::Budget);
        assert_eq!(MarketCategory::of(500_000), MarketCategory::MidRange);
        assert_eq!(MarketCategory::of(1_499_999), MarketCategory::MidRange);
        assert_eq!(MarketCategory::of(1_500_000), MarketCategory::Luxury);
        assert_eq!(MarketCategory::MidRange.to_string(), "mid-range");
    }

    #[test]
    fn market_price_bounds() {
        assert_eq!(
            MarketCategory::Budget.price_bounds(),
            (0, Some(500_000)),
        );
        assert_eq!(
            MarketCategory::MidRange.price_bounds(),
            (500_000, Some(1_500_000)),
        );
        assert_eq!(MarketCategory::Luxury.price_bounds(), (1_500_000, None));
    }

    #[test]
    fn assesses_value() {
        assert_eq!(ValueAssessment::of(2_999), ValueAssessment::ExcellentValue);
        assert_eq!(ValueAssessment::of(3_000), ValueAssessment::GoodValue);
        assert_eq!(ValueAssessment::of(9_999), ValueAssessment::FairValue);
        assert_eq!(
            ValueAssessment::of(10_000),
            ValueAssessment::PremiumPricing,
        );
        assert_eq!(
            ValueAssessment::ExcellentValue.to_string(),
            "excellent_value",
        );
    }

    #[test]
    fn unit_price_rounds_and_guards_zero_area() {
        assert_eq!(price_per_square_meter(1_000_000, 3.0), Some(333_333));
        assert_eq!(price_per_square_meter(1_000_000, 6.0), Some(166_667));
        assert_eq!(price_per_square_meter(1_000_000, 0.0), None);
        assert_eq!(price_per_square_meter(1_000_000, -1.0), None);
    }

    #[test]
    fn scores_features() {
        let mut details = Details {
            balcony_area: Some(4.5),
            amenities: Amenities {
                pets: Some(true),
                parking: Some("Available".into()),
                kitchen: Some("Modern system kitchen".into()),
                bath_toilet: Some("Separate bath and toilet".into()),
            },
            ..Details::default()
        };
        assert_eq!(features_score(&details), 45);

        details.amenities.parking = Some("none".into());
        details.amenities.pets = Some(false);
        assert_eq!(features_score(&details), 20);

        assert_eq!(features_score(&Details::default()), 0);
    }

    #[test]
    fn derives_all_fields() {
        let details = Details {
            price: 30_000_000,
            area: 60.0,
            year_built: Some("2010年4月".into()),
            fees: Fees {
                management_fee: Some(12_000),
                other_fees: Some(1_000),
                ..Fees::default()
            },
            ..Details::default()
        };
        let derived = Derived::of(&details, 2024);

        assert_eq!(derived.price_per_square_meter, Some(500_000));
        assert_eq!(derived.market_category, MarketCategory::Luxury);
        assert_eq!(
            derived.value_assessment,
            Some(ValueAssessment::PremiumPricing),
        );
        assert_eq!(derived.total_monthly_costs, 13_000);
        assert_eq!(derived.property_age, Some(14));
    }

    #[test]
    fn degrades_on_missing_data() {
        let derived = Derived::of(&Details::default(), 2024);

        assert_eq!(derived.price_per_square_meter, None);
        assert_eq!(derived.value_assessment, None);
        assert_eq!(derived.market_category, MarketCategory::Budget);
        assert_eq!(derived.features_score, 0);
        assert_eq!(derived.property_age, None);
    }
}
