//! [`Location`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tokio_postgres::Row;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Listing, Location};
use crate::{
    domain::location::{Hierarchy, Kind},
    infra::{
        database::{
            self,
            postgres::{Connection, LikePattern},
            Postgres,
        },
        Database,
    },
    read::location::{Lookup, Match, Sample},
};

/// Maps the [`Hierarchy`] columns of a [`Row`].
pub(super) fn hierarchy(row: &Row) -> Hierarchy {
    Hierarchy {
        area_level_1: row.get("area_level_1"),
        area_level_2: row.get("area_level_2"),
        area_level_3: row.get("area_level_3"),
        area_level_4: row.get("area_level_4"),
        zipcode: row.get("zipcode"),
    }
}

/// Returns the SQL column holding values of the provided [`Kind`].
const fn column(kind: Kind) -> &'static str {
    match kind {
        Kind::Zipcode => "zipcode",
        Kind::City => "area_level_4",
        Kind::Area => "area_level_3",
        Kind::Address => "address",
    }
}

impl<C> Database<Select<By<Vec<Match>, Lookup>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Match>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Match>, Lookup>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Lookup { kind, term, limit } = by.into_inner();

        let pattern = LikePattern::new(&term);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let sql = format!(
            "SELECT area_level_1, area_level_2, area_level_3, area_level_4, \
                    zipcode, address \
             FROM listings \
             WHERE {column} ILIKE $1::VARCHAR \
             ORDER BY created_at DESC, \
                      id DESC \
             LIMIT $2::INT8",
            column = column(kind),
        );
        Ok(self
            .query(&sql, &[&pattern, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Match {
                hierarchy: hierarchy(&row),
                address: row.get("address"),
            })
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Hierarchy>, Sample>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Hierarchy>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Hierarchy>, Sample>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Sample { kind, limit } = by.into_inner();

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let sql = format!(
            "SELECT area_level_1, area_level_2, area_level_3, area_level_4, \
                    zipcode \
             FROM listings \
             WHERE {column} IS NOT NULL \
             ORDER BY created_at DESC, \
                      id DESC \
             LIMIT $1::INT8",
            column = column(kind),
        );
        Ok(self
            .query(&sql, &[&limit])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(hierarchy)
            .collect())
    }
}
