//! In-memory [`Database`] double.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use common::operations::{
    By, Commit, Delete, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{
        listing,
        location::{Hierarchy, Kind},
        Listing,
    },
    infra::{
        database::{self, postgres},
        Database,
    },
    read,
};

/// In-memory [`Database`] keeping [`Listing`]s in insertion order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Mock {
    /// Stored [`Listing`]s.
    pub(crate) listings: Arc<Mutex<Vec<Listing>>>,

    /// [`Kind`]s of lookups failing with an error.
    pub(crate) failing: Vec<Kind>,

    /// [`Kind`]s of lookups never completing in time.
    pub(crate) stalling: Vec<Kind>,

    /// Number of performed lookups.
    pub(crate) lookups: Arc<AtomicUsize>,

    /// Number of performed commits.
    pub(crate) commits: Arc<AtomicUsize>,
}

impl Mock {
    /// Creates a new [`Mock`] holding the provided [`Listing`]s.
    pub(crate) fn with(listings: impl IntoIterator<Item = Listing>) -> Self {
        Self {
            listings: Arc::new(Mutex::new(listings.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Returns a snapshot of the stored [`Listing`]s.
    pub(crate) fn snapshot(&self) -> Vec<Listing> {
        self.listings.lock().unwrap().clone()
    }

    /// Returns a non-unique-violation [`database::Error`].
    pub(crate) fn error() -> Traced<database::Error> {
        tracerr::new!(database::Error::from(postgres::Error::from(
            postgres::connection::PoolError::Closed,
        )))
    }
}

/// Returns the value of the provided [`Kind`] field of a [`Listing`].
fn field(listing: &Listing, kind: Kind) -> Option<&str> {
    let h = &listing.details.hierarchy;
    match kind {
        Kind::Zipcode => h.zipcode.as_deref(),
        Kind::City => h.area_level_4.as_deref(),
        Kind::Area => h.area_level_3.as_deref(),
        Kind::Address => Some(listing.details.address.as_str()),
    }
}

impl Database<Transact> for Mock {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        _ = self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Database<Lock<By<Listing, listing::Id>>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Listing, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Select<By<Option<Listing>, listing::Id>>> for Mock {
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.snapshot().into_iter().find(|l| l.id == id))
    }
}

impl Database<Insert<Listing>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(listing): Insert<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.listings.lock().unwrap().push(listing);
        Ok(())
    }
}

impl Database<Update<Listing>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(listing): Update<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut listings = self.listings.lock().unwrap();
        if let Some(l) = listings.iter_mut().find(|l| l.id == listing.id) {
            *l = listing;
        }
        Ok(())
    }
}

impl Database<Delete<By<Listing, listing::Id>>> for Mock {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Listing, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let mut listings = self.listings.lock().unwrap();
        let before = listings.len();
        listings.retain(|l| l.id != id);
        Ok(listings.len() < before)
    }
}

impl
    Database<
        Select<By<read::listing::list::Page, read::listing::list::Selector>>,
    > for Mock
{
    type Ok = read::listing::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::listing::list::Page, read::listing::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::listing::list::Selector {
            arguments, filter, ..
        } = by.into_inner();

        let matching = self
            .snapshot()
            .into_iter()
            .filter(|l| Some(l.id) != filter.excluded)
            .filter(|l| {
                filter
                    .property_type
                    .as_ref()
                    .map_or(true, |t| l.details.property_type.as_ref() == Some(t))
            })
            .collect::<Vec<_>>();
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(arguments.offset())
            .take(arguments.limit())
            .collect::<Vec<_>>();

        Ok(read::listing::list::Page::new(arguments, items, total))
    }
}

impl
    Database<
        Select<
            By<Vec<read::listing::statistics::Sample>, read::listing::list::Filter>,
        >,
    > for Mock
{
    type Ok = Vec<read::listing::statistics::Sample>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<
            By<Vec<read::listing::statistics::Sample>, read::listing::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .snapshot()
            .iter()
            .map(read::listing::statistics::Sample::from)
            .collect())
    }
}

impl Database<Select<By<Vec<read::location::Match>, read::location::Lookup>>>
    for Mock
{
    type Ok = Vec<read::location::Match>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::location::Match>, read::location::Lookup>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::location::Lookup { kind, term, limit } = by.into_inner();

        _ = self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&kind) {
            return Err(Self::error());
        }
        if self.stalling.contains(&kind) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }

        let term = term.to_lowercase();
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|l| {
                field(l, kind).is_some_and(|v| v.to_lowercase().contains(&term))
            })
            .take(limit)
            .map(|l| read::location::Match {
                hierarchy: l.details.hierarchy,
                address: l.details.address,
            })
            .collect())
    }
}

impl Database<Select<By<Vec<Hierarchy>, read::location::Sample>>> for Mock {
    type Ok = Vec<Hierarchy>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Hierarchy>, read::location::Sample>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::location::Sample { kind, limit } = by.into_inner();
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|l| field(l, kind).is_some())
            .take(limit)
            .map(|l| l.details.hierarchy)
            .collect())
    }
}
