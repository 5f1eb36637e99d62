//! [`Listing`]-related read definitions.

#[cfg(doc)]
use crate::domain::Listing;

pub mod list {
    //! [`Listing`] list definitions.

    use common::{
        define_pagination,
        pagination::{ArgumentsError, Order},
    };
    use derive_more::{Display, Error, From};
    use strum::{Display as StrumDisplay, EnumString};

    use crate::domain::{
        listing::{self, Area, MarketCategory, Price},
        Listing, Location,
    };

    define_pagination!(Listing, Filter, Column);

    /// Default number of [`Listing`]s on a [`Page`].
    pub const DEFAULT_LIMIT: usize = 20;

    /// Maximum number of [`Listing`]s on a [`Page`].
    pub const MAX_LIMIT: usize = 100;

    /// Filter for [`Selector`].
    ///
    /// Every present field adds exactly one predicate, and all the predicates
    /// are combined with logical `AND`.
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Filter {
        /// Substring of a [`Listing`] title.
        pub title: Option<String>,

        /// Substring of a [`Listing`] address.
        pub address: Option<String>,

        /// Minimal (inclusive) [`Price`].
        pub min_price: Option<Price>,

        /// Maximal (inclusive) [`Price`].
        pub max_price: Option<Price>,

        /// Minimal (inclusive) [`Area`].
        pub min_area: Option<Area>,

        /// Maximal (inclusive) [`Area`].
        pub max_area: Option<Area>,

        /// Exact property type.
        pub property_type: Option<String>,

        /// Exact room layout.
        pub layout: Option<String>,

        /// Pet policy.
        pub pets: Option<bool>,

        /// Substring of a transportation description.
        pub transportation: Option<String>,

        /// Substring of a year built description.
        pub year_built: Option<String>,

        /// Selected [`Location`].
        pub location: Option<Location>,

        /// [`listing::Id`] to exclude from the result.
        pub excluded: Option<listing::Id>,
    }

    impl Filter {
        /// Checks this [`Filter`] to be satisfiable.
        ///
        /// # Errors
        ///
        /// If any bound is negative, or any minimal bound is greater than its
        /// maximal counterpart.
        pub fn check(&self) -> Result<(), CriteriaError> {
            use CriteriaError as E;

            if let Some(p) = [self.min_price, self.max_price]
                .into_iter()
                .flatten()
                .find(|p| *p < 0)
            {
                return Err(E::NegativePrice(p));
            }
            if let Some(a) = [self.min_area, self.max_area]
                .into_iter()
                .flatten()
                .find(|a| a.is_nan() || *a < 0.0)
            {
                return Err(E::NegativeArea(a));
            }
            if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
                if min > max {
                    return Err(E::PriceRange { min, max });
                }
            }
            if let (Some(min), Some(max)) = (self.min_area, self.max_area) {
                if min > max {
                    return Err(E::AreaRange { min, max });
                }
            }
            Ok(())
        }

        /// Narrows this [`Filter`] down to the price band of the provided
        /// [`MarketCategory`], unless explicit price bounds are present.
        #[must_use]
        pub fn with_price_band(mut self, category: MarketCategory) -> Self {
            if self.min_price.is_none() && self.max_price.is_none() {
                let (min, max) = category.price_bounds();
                self.min_price = Some(min);
                self.max_price = max.map(|upper| upper - 1);
            }
            self
        }
    }

    /// Column to sort [`Listing`]s by.
    #[derive(
        Clone,
        Copy,
        Debug,
        Default,
        EnumString,
        Eq,
        Hash,
        PartialEq,
        StrumDisplay,
    )]
    #[strum(serialize_all = "camelCase", ascii_case_insensitive)]
    pub enum Column {
        /// Creation time.
        #[default]
        CreatedAt,

        /// Last modification time.
        UpdatedAt,

        /// [`Price`].
        Price,

        /// [`Area`].
        Area,

        /// Title.
        Title,

        /// Year built.
        YearBuilt,
    }

    impl Column {
        /// Builds a [`Sort`] out of the requested column and order.
        ///
        /// Columns outside the allowed set fall back to the default
        /// [`Column::CreatedAt`], and unknown orders fall back to
        /// [`Order::Descending`].
        #[must_use]
        pub fn sort(column: Option<&str>, order: Option<&str>) -> Sort {
            Sort {
                column: column
                    .and_then(|c| c.trim().parse().ok())
                    .unwrap_or_default(),
                order: order.and_then(Order::parse).unwrap_or_default(),
            }
        }

        #[cfg(feature = "postgres")]
        /// Returns SQL column name of this [`Column`].
        #[must_use]
        pub const fn sql(self) -> &'static str {
            match self {
                Self::CreatedAt => "created_at",
                Self::UpdatedAt => "updated_at",
                Self::Price => "price",
                Self::Area => "area",
                Self::Title => "title",
                Self::YearBuilt => "year_built",
            }
        }
    }

    /// Error of unsatisfiable listing criteria.
    #[derive(Clone, Copy, Debug, Display, Error, From, PartialEq)]
    pub enum CriteriaError {
        /// Invalid pagination [`Arguments`].
        #[display("Invalid pagination: {_0}")]
        Arguments(ArgumentsError),

        /// Minimal price is greater than the maximal one.
        #[display("`minPrice` ({min}) cannot be greater than `maxPrice` ({max})")]
        #[from(ignore)]
        PriceRange {
            /// Minimal price.
            min: Price,

            /// Maximal price.
            max: Price,
        },

        /// Minimal area is greater than the maximal one.
        #[display("`minArea` ({min}) cannot be greater than `maxArea` ({max})")]
        #[from(ignore)]
        AreaRange {
            /// Minimal area.
            min: Area,

            /// Maximal area.
            max: Area,
        },

        /// Price bound is negative.
        #[display("Price bounds cannot be negative, but got {_0}")]
        #[from(ignore)]
        NegativePrice(#[error(not(source))] Price),

        /// Area bound is negative.
        #[display("Area bounds cannot be negative, but got {_0}")]
        #[from(ignore)]
        NegativeArea(#[error(not(source))] Area),
    }

    #[cfg(test)]
    mod spec {
        use common::pagination::Order;

        use super::{Column, CriteriaError, Filter};
        use crate::domain::listing::MarketCategory;

        #[test]
        fn rejects_inverted_ranges() {
            let filter = Filter {
                min_price: Some(1_000),
                max_price: Some(500),
                ..Filter::default()
            };
            assert_eq!(
                filter.check(),
                Err(CriteriaError::PriceRange {
                    min: 1_000,
                    max: 500,
                }),
            );

            let filter = Filter {
                min_area: Some(80.0),
                max_area: Some(40.0),
                ..Filter::default()
            };
            assert!(matches!(
                filter.check(),
                Err(CriteriaError::AreaRange { .. }),
            ));

            let filter = Filter {
                min_price: Some(-1),
                ..Filter::default()
            };
            assert_eq!(filter.check(), Err(CriteriaError::NegativePrice(-1)));
        }

        #[test]
        fn accepts_partial_and_equal_bounds() {
            assert_eq!(Filter::default().check(), Ok(()));

            let filter = Filter {
                min_price: Some(500),
                max_price: Some(500),
                min_area: Some(30.0),
                ..Filter::default()
            };
            assert_eq!(filter.check(), Ok(()));
        }

        #[test]
        fn expands_price_band() {
            let filter =
                Filter::default().with_price_band(MarketCategory::MidRange);
            assert_eq!(filter.min_price, Some(500_000));
            assert_eq!(filter.max_price, Some(1_499_999));

            let filter =
                Filter::default().with_price_band(MarketCategory::Luxury);
            assert_eq!(filter.min_price, Some(1_500_000));
            assert_eq!(filter.max_price, None);

            let filter = Filter {
                max_price: Some(100),
                ..Filter::default()
            }
            .with_price_band(MarketCategory::Luxury);
            assert_eq!(filter.min_price, None);
            assert_eq!(filter.max_price, Some(100));
        }

        #[test]
        fn sort_falls_back_to_defaults() {
            let sort = Column::sort(Some("PRICE"), Some("asc"));
            assert_eq!(sort.column, Column::Price);
            assert_eq!(sort.order, Order::Ascending);

            let sort = Column::sort(Some("yearbuilt"), None);
            assert_eq!(sort.column, Column::YearBuilt);
            assert_eq!(sort.order, Order::Descending);

            let sort = Column::sort(Some("password; DROP"), Some("sideways"));
            assert_eq!(sort.column, Column::CreatedAt);
            assert_eq!(sort.order, Order::Descending);
        }
    }
}

pub mod similar {
    //! Similar [`Listing`]s definitions.

    use crate::domain::listing::{Area, Price};
    #[cfg(doc)]
    use crate::domain::Listing;

    use super::list;

    /// Relative deviation of price and area of similar [`Listing`]s.
    pub const DEVIATION: f64 = 0.2;

    /// Default number of similar [`Listing`]s.
    pub const DEFAULT_LIMIT: usize = 5;

    /// Builds a [`list::Filter`] matching [`Listing`]s similar to the one of
    /// the provided property type, [`Price`] and [`Area`].
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        reason = "prices are far below `f64` mantissa limits"
    )]
    #[must_use]
    pub fn filter(
        property_type: Option<String>,
        price: Price,
        area: Area,
    ) -> list::Filter {
        let price = price as f64;
        list::Filter {
            property_type,
            min_price: Some((price * (1.0 - DEVIATION)).round() as Price),
            max_price: Some((price * (1.0 + DEVIATION)).round() as Price),
            min_area: Some(area * (1.0 - DEVIATION)),
            max_area: Some(area * (1.0 + DEVIATION)),
            ..list::Filter::default()
        }
    }

    #[cfg(test)]
    mod spec {
        use super::filter;

        #[test]
        fn bounds_price_and_area() {
            let f = filter(Some("house".into()), 1_000_000, 50.0);
            assert_eq!(f.property_type.as_deref(), Some("house"));
            assert_eq!(f.min_price, Some(800_000));
            assert_eq!(f.max_price, Some(1_200_000));
            assert!((f.min_area.unwrap() - 40.0).abs() < 1e-9);
            assert!((f.max_area.unwrap() - 60.0).abs() < 1e-9);
            assert_eq!(f.check(), Ok(()));
        }
    }
}

pub mod distinct {
    //! Distinct [`Listing`] values definitions.

    #[cfg(doc)]
    use crate::domain::Listing;

    /// Categorical [`Listing`] field to select distinct values of.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub enum Field {
        /// Room layout.
        Layout,

        /// Property type.
        PropertyType,
    }

    impl Field {
        #[cfg(feature = "postgres")]
        /// Returns SQL column name of this [`Field`].
        #[must_use]
        pub const fn sql(self) -> &'static str {
            match self {
                Self::Layout => "layout",
                Self::PropertyType => "property_type",
            }
        }
    }
}

pub mod statistics {
    //! [`Listing`]s statistics definitions.

    use std::collections::BTreeMap;

    use crate::domain::{
        listing::{
            enrichment::price_per_square_meter, Area, MarketCategory, Price,
        },
        Listing,
    };

    /// Projection of a [`Listing`] needed for [`Statistics`].
    #[derive(Clone, Debug, PartialEq)]
    pub struct Sample {
        /// [`Price`] of a [`Listing`].
        pub price: Price,

        /// [`Area`] of a [`Listing`].
        pub area: Area,

        /// Property type of a [`Listing`].
        pub property_type: Option<String>,
    }

    impl From<&Listing> for Sample {
        fn from(listing: &Listing) -> Self {
            Self {
                price: listing.details.price,
                area: listing.details.area,
                property_type: listing.details.property_type.clone(),
            }
        }
    }

    /// Inclusive range of values.
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Range<T> {
        /// Minimal value.
        pub min: T,

        /// Maximal value.
        pub max: T,
    }

    /// Number of [`Listing`]s per [`MarketCategory`].
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct MarketCategories {
        /// [`MarketCategory::Budget`] count.
        pub budget: usize,

        /// [`MarketCategory::MidRange`] count.
        pub mid_range: usize,

        /// [`MarketCategory::Luxury`] count.
        pub luxury: usize,
    }

    /// Summary of a set of [`Listing`]s.
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Statistics {
        /// Number of [`Listing`]s.
        pub count: usize,

        /// Average of positive [`Price`]s, rounded.
        pub average_price: Price,

        /// Average of positive [`Area`]s, rounded to 2 decimals.
        pub average_area: Area,

        /// [`Range`] of positive [`Price`]s.
        pub price_range: Range<Price>,

        /// [`Range`] of positive [`Area`]s.
        pub area_range: Range<Area>,

        /// Average price per square meter, rounded.
        pub average_price_per_square_meter: Price,

        /// Number of [`Listing`]s per property type.
        pub property_types: BTreeMap<String, usize>,

        /// Number of [`Listing`]s per [`MarketCategory`].
        pub market_categories: MarketCategories,
    }

    impl Statistics {
        /// Reduces the provided [`Sample`]s into [`Statistics`].
        ///
        /// Only positive prices and areas are considered for averages and
        /// ranges, and empty input results in zeroed [`Statistics`].
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_precision_loss,
            reason = "prices are far below `f64` mantissa limits"
        )]
        #[must_use]
        pub fn of<'s>(samples: impl IntoIterator<Item = &'s Sample>) -> Self {
            let mut stats = Self::default();
            let mut prices = Vec::new();
            let mut areas = Vec::new();
            let mut unit_prices = Vec::new();

            for s in samples {
                stats.count += 1;

                if s.price > 0 {
                    prices.push(s.price);
                    match MarketCategory::of(s.price) {
                        MarketCategory::Budget => {
                            stats.market_categories.budget += 1;
                        }
                        MarketCategory::MidRange => {
                            stats.market_categories.mid_range += 1;
                        }
                        MarketCategory::Luxury => {
                            stats.market_categories.luxury += 1;
                        }
                    }
                }
                if s.area > 0.0 {
                    areas.push(s.area);
                }
                if let Some(unit) = (s.price > 0)
                    .then(|| price_per_square_meter(s.price, s.area))
                    .flatten()
                {
                    unit_prices.push(unit);
                }
                if let Some(ty) = s.property_type.as_deref() {
                    *stats.property_types.entry(ty.to_owned()).or_default() +=
                        1;
                }
            }

            if !prices.is_empty() {
                let sum = prices.iter().map(|p| *p as f64).sum::<f64>();
                stats.average_price = (sum / prices.len() as f64).round() as Price;
                stats.price_range = Range {
                    min: prices.iter().copied().min().unwrap_or_default(),
                    max: prices.iter().copied().max().unwrap_or_default(),
                };
            }
            if !areas.is_empty() {
                let avg = areas.iter().sum::<f64>() / areas.len() as f64;
                stats.average_area = (avg * 100.0).round() / 100.0;
                stats.area_range = Range {
                    min: areas.iter().copied().fold(f64::INFINITY, f64::min),
                    max: areas.iter().copied().fold(0.0, f64::max),
                };
            }
            if !unit_prices.is_empty() {
                let sum = unit_prices.iter().map(|p| *p as f64).sum::<f64>();
                stats.average_price_per_square_meter =
                    (sum / unit_prices.len() as f64).round() as Price;
            }

            stats
        }
    }

    #[cfg(test)]
    mod spec {
        use super::{Range, Sample, Statistics};

        fn sample(price: i64, area: f64, ty: Option<&str>) -> Sample {
            Sample {
                price,
                area,
                property_type: ty.map(Into::into),
            }
        }

        #[test]
        fn zeroed_on_empty() {
            let stats = Statistics::of(&[]);
            assert_eq!(stats.count, 0);
            assert_eq!(stats.average_price, 0);
            assert!(stats.average_area.abs() < f64::EPSILON);
            assert_eq!(stats.price_range, Range { min: 0, max: 0 });
            assert_eq!(stats.area_range, Range { min: 0.0, max: 0.0 });
            assert_eq!(stats.average_price_per_square_meter, 0);
        }

        #[test]
        fn reduces_positive_values() {
            let samples = [
                sample(400_000, 20.0, Some("studio")),
                sample(1_000_000, 50.5, Some("apartment")),
                sample(2_000_000, 0.0, Some("apartment")),
                sample(0, 30.0, None),
            ];
            let stats = Statistics::of(&samples);

            assert_eq!(stats.count, 4);
            assert_eq!(stats.average_price, 1_133_333);
            assert!((stats.average_area - 33.5).abs() < 1e-9);
            assert_eq!(
                stats.price_range,
                Range {
                    min: 400_000,
                    max: 2_000_000,
                },
            );
            assert_eq!(stats.area_range, Range { min: 20.0, max: 50.5 });
            assert_eq!(stats.average_price_per_square_meter, 19_901);
            assert_eq!(stats.property_types.get("apartment"), Some(&2));
            assert_eq!(stats.property_types.get("studio"), Some(&1));
            assert_eq!(stats.market_categories.budget, 1);
            assert_eq!(stats.market_categories.mid_range, 1);
            assert_eq!(stats.market_categories.luxury, 1);
        }
    }
}
