//! Abstractions for pagination.

use derive_more::{Display, Error};

/// A page of items selected with [`Arguments`].
#[derive(Clone, Debug)]
pub struct Page<I> {
    /// Items on this [`Page`].
    pub items: Vec<I>,

    /// Total number of items matching the same selection.
    pub total: usize,

    /// [`Arguments`] this [`Page`] was selected with.
    pub arguments: Arguments,
}

impl<I> Page<I> {
    /// Creates a new [`Page`] out of the provided `items`.
    #[must_use]
    pub fn new(
        arguments: Arguments,
        items: impl IntoIterator<Item = impl Into<I>>,
        total: usize,
    ) -> Self {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            total,
            arguments,
        }
    }

    /// Returns number of items on this [`Page`].
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Indicates whether there are more items after this [`Page`].
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.arguments.offset() + self.count() < self.total
    }

    /// Returns 1-based number of this [`Page`].
    #[must_use]
    pub fn number(&self) -> usize {
        self.arguments.offset() / self.arguments.limit() + 1
    }

    /// Returns total number of pages of [`Arguments::limit()`] size.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.arguments.limit())
    }

    /// Maps items of this [`Page`] with the provided function.
    #[must_use]
    pub fn map<T>(self, f: impl FnMut(I) -> T) -> Page<T> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            arguments: self.arguments,
        }
    }
}

/// Offset pagination arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Arguments {
    /// Maximum number of items to return.
    limit: usize,

    /// Number of items to skip.
    offset: usize,
}

impl Arguments {
    /// Creates new [`Arguments`].
    ///
    /// Missing `limit` falls back to the `default` one, and any `limit` above
    /// the `max` one is capped to it.
    ///
    /// # Errors
    ///
    /// If `limit` is not positive or `offset` is negative.
    pub fn new<Num>(
        limit: Option<Num>,
        offset: Option<Num>,
        default: usize,
        max: usize,
    ) -> Result<Self, ArgumentsError>
    where
        Num: Into<i64>,
    {
        let limit = match limit.map(Into::into) {
            None => default,
            Some(l) if l < 1 => return Err(ArgumentsError::Limit(l)),
            Some(l) => usize::try_from(l).map_or(max, |l| l.min(max)),
        };
        let offset = match offset.map(Into::into) {
            None => 0,
            Some(o) => usize::try_from(o)
                .map_err(|_| ArgumentsError::Offset(o))?,
        };
        Ok(Self {
            limit: limit.max(1),
            offset,
        })
    }

    /// Returns the maximum number of items requested by these [`Arguments`].
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of items skipped by these [`Arguments`].
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Error of creating [`Arguments`].
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum ArgumentsError {
    /// Requested limit is not positive.
    #[display("`limit` must be positive, but is {_0}")]
    Limit(#[error(not(source))] i64),

    /// Requested offset is negative.
    #[display("`offset` must not be negative, but is {_0}")]
    Offset(#[error(not(source))] i64),
}

/// Pagination selector.
#[derive(Clone, Debug)]
pub struct Selector<F, C> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments,

    /// Additional filter being applied to the result.
    pub filter: F,

    /// [`Sort`] of the result.
    pub sort: Sort<C>,
}

/// Sorting of a result by a column `C`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sort<C> {
    /// Column to sort by.
    pub column: C,

    /// [`Order`] of sorting.
    pub order: Order,
}

/// Order of sorting.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Order {
    /// Ascending order.
    Ascending,

    /// Descending order.
    #[default]
    Descending,
}

impl Order {
    /// Parses an [`Order`] out of `ASC` or `DESC` (case-insensitive).
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        if input.eq_ignore_ascii_case("asc") {
            Some(Self::Ascending)
        } else if input.eq_ignore_ascii_case("desc") {
            Some(Self::Descending)
        } else {
            None
        }
    }

    #[cfg(feature = "postgres")]
    /// Returns SQL keyword representing this [`Order`].
    #[must_use]
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($node:ty, $filter:ty, $column:ty) => {
        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$filter, $column>;

        #[doc = "Sorting of a [`Page`]."]
        pub type Sort = $crate::pagination::Sort<$column>;
    };
}

#[cfg(test)]
mod spec {
    use super::{Arguments, ArgumentsError, Order, Page};

    #[test]
    fn arguments_defaults_and_caps() {
        let args = Arguments::new::<i64>(None, None, 20, 100).unwrap();
        assert_eq!((args.limit(), args.offset()), (20, 0));

        let args = Arguments::new(Some(500), Some(40), 20, 100).unwrap();
        assert_eq!((args.limit(), args.offset()), (100, 40));
    }

    #[test]
    fn arguments_rejects_invalid() {
        assert_eq!(
            Arguments::new(Some(0), None, 20, 100),
            Err(ArgumentsError::Limit(0)),
        );
        assert_eq!(
            Arguments::new(Some(10), Some(-1), 20, 100),
            Err(ArgumentsError::Offset(-1)),
        );
    }

    #[test]
    fn page_has_more() {
        let args = Arguments::new(Some(5), Some(0), 20, 100).unwrap();
        let page = Page::<u8>::new(args, [1, 2, 3, 4, 5], 12);
        assert_eq!(page.count(), 5);
        assert!(page.has_more());
        assert_eq!(page.number(), 1);
        assert_eq!(page.total_pages(), 3);

        let args = Arguments::new(Some(5), Some(10), 20, 100).unwrap();
        let page = Page::<u8>::new(args, [1, 2], 12);
        assert!(!page.has_more());
        assert_eq!(page.number(), 3);
    }

    #[test]
    fn order_parse() {
        assert_eq!(Order::parse("asc"), Some(Order::Ascending));
        assert_eq!(Order::parse("DESC"), Some(Order::Descending));
        assert_eq!(Order::parse("up"), None);
    }
}
