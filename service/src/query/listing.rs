//! [`Query`] collection related to a single [`Listing`].

use common::{
    operations::{By, Select},
    pagination::Arguments,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{listing, Listing},
    infra::{database, Database},
    read::listing::{list, similar},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Listing`] by its [`listing::Id`].
pub type ById = DatabaseQuery<By<Option<Listing>, listing::Id>>;

/// [`Query`] of [`Listing`]s similar to the given one.
///
/// Similar [`Listing`]s are of the same property type, with price and area
/// within [`similar::DEVIATION`] of the given [`Listing`].
#[derive(Clone, Copy, Debug)]
pub struct Similar {
    /// ID of the [`Listing`] to find similar ones for.
    pub id: listing::Id,

    /// Requested number of similar [`Listing`]s, if any.
    pub limit: Option<i64>,
}

impl<Db> Query<Similar> for Service<Db>
where
    Db: Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<list::Page, list::Selector>>,
            Ok = list::Page,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<Listing>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Similar { id, limit }: Similar,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let arguments =
            Arguments::new(limit, None, similar::DEFAULT_LIMIT, list::MAX_LIMIT)
                .map_err(list::CriteriaError::from)
                .map_err(E::InvalidCriteria)
                .map_err(tracerr::wrap!())?;

        let listing = self
            .database()
            .execute(Select(By::<Option<Listing>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotExists(id))
            .map_err(tracerr::wrap!())?;

        let details = listing.details;
        let filter = list::Filter {
            excluded: Some(id),
            ..similar::filter(details.property_type, details.price, details.area)
        };

        self.database()
            .execute(Select(By::<list::Page, _>::new(list::Selector {
                arguments,
                filter,
                sort: list::Column::sort(None, None),
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(|page| page.items)
    }
}

/// Error of [`Similar`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Requested number of [`Listing`]s is invalid.
    #[display("Invalid criteria: {_0}")]
    InvalidCriteria(list::CriteriaError),

    /// [`Listing`] doesn't exist.
    #[display("`Listing(id: {_0})` does not exist")]
    #[from(ignore)]
    NotExists(#[error(not(source))] listing::Id),
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Handler as _};

    use super::{ExecutionError, Similar};
    use crate::{
        domain::{
            listing::{self, Details, Draft, PropertyNumber},
            Listing,
        },
        infra::database::mock::Mock,
        Config, Service,
    };

    fn listing(ty: &str) -> Listing {
        Draft {
            property_number: None,
            details: Details {
                title: "Similar".into(),
                price: 1_000_000,
                area: 50.0,
                property_type: Some(ty.into()),
                ..Details::default()
            },
        }
        .into_new(PropertyNumber::generate(Some(ty)), DateTime::now())
    }

    #[tokio::test]
    async fn excludes_itself_and_other_types() {
        let target = listing("house");
        let same = listing("house");
        let other = listing("condo");
        let svc = Service::new(
            Config::default(),
            Mock::with([target.clone(), same.clone(), other]),
        );

        let similar = svc
            .execute(Similar {
                id: target.id,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(similar, vec![same]);
    }

    #[tokio::test]
    async fn fails_on_missing_listing() {
        let svc = Service::new(Config::default(), Mock::default());

        let err = svc
            .execute(Similar {
                id: listing::Id::new(),
                limit: Some(3),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotExists(_)));
    }
}
