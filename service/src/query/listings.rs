//! [`Query`] collection related to the multiple [`Listing`]s.

use common::{
    operations::{By, Select},
    pagination::Arguments,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Listing;
use crate::{
    infra::{database, Database},
    read::listing::{
        distinct,
        list::{self, CriteriaError},
        statistics,
    },
    Query, Service,
};

use super::DatabaseQuery;

/// [`Query`] of a [`list::Page`] of [`Listing`]s matching a [`list::Filter`].
#[derive(Clone, Debug)]
pub struct List {
    /// [`list::Filter`] to match [`Listing`]s with.
    pub filter: list::Filter,

    /// Requested number of [`Listing`]s, if any.
    pub limit: Option<i64>,

    /// Requested number of [`Listing`]s to skip, if any.
    pub offset: Option<i64>,

    /// [`list::Sort`] of [`Listing`]s.
    pub sort: list::Sort,
}

impl List {
    /// Checks this [`List`] criteria and turns them into a [`list::Selector`].
    ///
    /// # Errors
    ///
    /// If the [`list::Filter`] or the pagination [`Arguments`] are invalid.
    pub fn into_selector(self) -> Result<list::Selector, CriteriaError> {
        let Self {
            filter,
            limit,
            offset,
            sort,
        } = self;

        filter.check()?;
        let arguments =
            Arguments::new(limit, offset, list::DEFAULT_LIMIT, list::MAX_LIMIT)?;

        Ok(list::Selector {
            arguments,
            filter,
            sort,
        })
    }
}

impl<Db> Query<List> for Service<Db>
where
    Db: Database<
        Select<By<list::Page, list::Selector>>,
        Ok = list::Page,
        Err = Traced<database::Error>,
    >,
{
    type Ok = list::Page;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, query: List) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let selector = query
            .into_selector()
            .map_err(E::InvalidCriteria)
            .map_err(tracerr::wrap!())?;

        self.database()
            .execute(Select(By::new(selector)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// [`Query`] of [`statistics::Statistics`] of [`Listing`]s matching a
/// [`list::Filter`].
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    /// [`list::Filter`] scoping the [`Listing`]s.
    pub filter: list::Filter,
}

impl<Db> Query<Statistics> for Service<Db>
where
    Db: Database<
        Select<By<Vec<statistics::Sample>, list::Filter>>,
        Ok = Vec<statistics::Sample>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = statistics::Statistics;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Statistics { filter }: Statistics,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        filter
            .check()
            .map_err(E::InvalidCriteria)
            .map_err(tracerr::wrap!())?;

        let samples = self
            .database()
            .execute(Select(By::new(filter)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(statistics::Statistics::of(&samples))
    }
}

/// Queries sorted distinct non-empty values of a [`distinct::Field`].
pub type Distinct = DatabaseQuery<By<Vec<String>, distinct::Field>>;

/// Error of [`List`] or [`Statistics`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Listing criteria are invalid.
    #[display("Invalid criteria: {_0}")]
    InvalidCriteria(CriteriaError),
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Handler as _};

    use super::{ExecutionError, List, Statistics};
    use crate::{
        domain::{
            listing::{Details, Draft, PropertyNumber},
            Listing,
        },
        infra::database::mock::Mock,
        read::listing::list::{self, Column, CriteriaError},
        Config, Service,
    };

    fn listings(n: usize) -> Vec<Listing> {
        (0..n)
            .map(|i| {
                Draft {
                    property_number: None,
                    details: Details {
                        title: format!("Listing {i}"),
                        price: 1_000_000,
                        area: 50.0,
                        ..Details::default()
                    },
                }
                .into_new(PropertyNumber::generate(None), DateTime::now())
            })
            .collect()
    }

    fn list(limit: Option<i64>, offset: Option<i64>) -> List {
        List {
            filter: list::Filter::default(),
            limit,
            offset,
            sort: Column::sort(None, None),
        }
    }

    #[tokio::test]
    async fn paginates() {
        let svc = Service::new(Config::default(), Mock::with(listings(12)));

        let page = svc.execute(list(Some(5), Some(0))).await.unwrap();
        assert_eq!(page.count(), 5);
        assert_eq!(page.total, 12);
        assert!(page.has_more());

        let page = svc.execute(list(Some(5), Some(10))).await.unwrap();
        assert_eq!(page.count(), 2);
        assert!(!page.has_more());
        assert!(page.arguments.offset() + page.count() <= page.total);

        let page = svc.execute(list(None, None)).await.unwrap();
        assert_eq!(page.arguments.limit(), list::DEFAULT_LIMIT);
        assert_eq!(page.count(), 12);

        let page = svc.execute(list(Some(1_000), None)).await.unwrap();
        assert_eq!(page.arguments.limit(), list::MAX_LIMIT);
    }

    #[tokio::test]
    async fn rejects_invalid_criteria_before_store() {
        let svc = Service::new(Config::default(), Mock::default());

        let mut query = list(None, None);
        query.filter.min_price = Some(1_000);
        query.filter.max_price = Some(500);
        let err = svc.execute(query).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidCriteria(CriteriaError::PriceRange { .. }),
        ));

        let err = svc.execute(list(Some(0), None)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidCriteria(CriteriaError::Arguments(_)),
        ));

        let err = svc
            .execute(Statistics {
                filter: list::Filter {
                    min_price: Some(1_000),
                    max_price: Some(500),
                    ..list::Filter::default()
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidCriteria(_)));
    }

    #[tokio::test]
    async fn statistics_of_empty_store_are_zeroed() {
        let svc = Service::new(Config::default(), Mock::default());

        let stats = svc.execute(Statistics::default()).await.unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average_price, 0);
        assert_eq!(stats.price_range.min, 0);
        assert_eq!(stats.price_range.max, 0);
    }

    #[tokio::test]
    async fn statistics_reduce_store() {
        let svc = Service::new(Config::default(), Mock::with(listings(3)));

        let stats = svc.execute(Statistics::default()).await.unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.average_price, 1_000_000);
        assert_eq!(stats.average_price_per_square_meter, 20_000);
    }
}
