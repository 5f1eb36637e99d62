//! [`Listing`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        listing::{self, Amenities, Coordinates, Details, Fees},
        Listing, Location,
    },
    infra::{
        database::{
            self,
            postgres::{Connection, LikePattern},
            Postgres,
        },
        Database,
    },
    read::listing::{distinct, list, statistics},
};

use super::location::hierarchy;

/// Columns of a whole [`Listing`] row.
const COLUMNS: &str = "\
    id, property_number, title, price, area, \
    property_type, layout, structure, address, transportation, \
    area_level_1, area_level_2, area_level_3, area_level_4, zipcode, \
    lat, lng, \
    management_fee, repair_reserve_fund, land_lease_fee, right_fee, \
    deposit_guarantee, maintenance_fees, other_fees, \
    balcony_area, total_units, year_built, \
    pets, parking, kitchen, bath_toilet, \
    transaction_mode, images, \
    created_at, updated_at";

/// Maps a [`Row`] selected with [`COLUMNS`] into a [`Listing`].
fn from_row(row: &Row) -> Listing {
    let coordinates = match (
        row.get::<_, Option<f64>>("lat"),
        row.get::<_, Option<f64>>("lng"),
    ) {
        (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
        _ => None,
    };
    Listing {
        id: row.get("id"),
        property_number: row.get("property_number"),
        details: Details {
            title: row.get("title"),
            price: row.get("price"),
            area: row.get("area"),
            property_type: row.get("property_type"),
            layout: row.get("layout"),
            structure: row.get("structure"),
            address: row.get("address"),
            transportation: row.get("transportation"),
            hierarchy: hierarchy(row),
            coordinates,
            fees: Fees {
                management_fee: row.get("management_fee"),
                repair_reserve_fund: row.get("repair_reserve_fund"),
                land_lease_fee: row.get("land_lease_fee"),
                right_fee: row.get("right_fee"),
                deposit_guarantee: row.get("deposit_guarantee"),
                maintenance_fees: row.get("maintenance_fees"),
                other_fees: row.get("other_fees"),
            },
            balcony_area: row.get("balcony_area"),
            total_units: row.get("total_units"),
            year_built: row.get("year_built"),
            amenities: Amenities {
                pets: row.get("pets"),
                parking: row.get("parking"),
                kitchen: row.get("kitchen"),
                bath_toilet: row.get("bath_toilet"),
            },
            transaction_mode: row.get("transaction_mode"),
            images: row.get("images"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Owned `ILIKE` patterns of a [`list::Filter`].
#[derive(Debug, Default)]
struct Patterns {
    /// Pattern of [`list::Filter::title`].
    title: Option<LikePattern>,

    /// Pattern of [`list::Filter::address`].
    address: Option<LikePattern>,

    /// Pattern of [`list::Filter::transportation`].
    transportation: Option<LikePattern>,

    /// Pattern of [`list::Filter::year_built`].
    year_built: Option<LikePattern>,

    /// Pattern of a [`Location::Address`].
    location: Option<LikePattern>,
}

impl Patterns {
    /// Builds [`Patterns`] of the provided [`list::Filter`].
    fn of(filter: &list::Filter) -> Self {
        let like = |s: &Option<String>| s.as_deref().map(LikePattern::new);
        Self {
            title: like(&filter.title),
            address: like(&filter.address),
            transportation: like(&filter.transportation),
            year_built: like(&filter.year_built),
            location: match &filter.location {
                Some(Location::Address(a)) => Some(LikePattern::new(a)),
                _ => None,
            },
        }
    }
}

/// `WHERE` clause of a [`list::Filter`] along with its parameters.
#[derive(Debug, Default)]
struct Predicates<'a> {
    /// SQL of the `WHERE` clause.
    sql: String,

    /// Parameters referenced by the `WHERE` clause, in order.
    params: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Predicates<'a> {
    /// Builds [`Predicates`] out of the provided [`list::Filter`] and its
    /// [`Patterns`].
    ///
    /// Every present [`list::Filter`] field adds exactly one predicate.
    fn of(filter: &'a list::Filter, patterns: &'a Patterns) -> Self {
        let mut p = Self {
            sql: "WHERE true".to_owned(),
            params: Vec::new(),
        };

        if let Some(v) = &patterns.title {
            p.and("title ILIKE", v, "VARCHAR");
        }
        if let Some(v) = &patterns.address {
            p.and("address ILIKE", v, "VARCHAR");
        }
        if let Some(v) = &filter.min_price {
            p.and("price >=", v, "INT8");
        }
        if let Some(v) = &filter.max_price {
            p.and("price <=", v, "INT8");
        }
        if let Some(v) = &filter.min_area {
            p.and("area >=", v, "FLOAT8");
        }
        if let Some(v) = &filter.max_area {
            p.and("area <=", v, "FLOAT8");
        }
        if let Some(v) = &filter.property_type {
            p.and("property_type =", v, "VARCHAR");
        }
        if let Some(v) = &filter.layout {
            p.and("layout =", v, "VARCHAR");
        }
        if let Some(v) = &filter.pets {
            p.and("pets =", v, "BOOL");
        }
        if let Some(v) = &patterns.transportation {
            p.and("transportation ILIKE", v, "VARCHAR");
        }
        if let Some(v) = &patterns.year_built {
            p.and("year_built ILIKE", v, "VARCHAR");
        }
        match &filter.location {
            Some(Location::Zipcode(v)) => p.and("zipcode =", v, "VARCHAR"),
            Some(Location::City(v)) => p.and("area_level_4 =", v, "VARCHAR"),
            Some(Location::Area(v)) => p.and("area_level_3 =", v, "VARCHAR"),
            Some(Location::Address(_)) => {
                if let Some(v) = &patterns.location {
                    p.and("address ILIKE", v, "VARCHAR");
                }
            }
            None => {}
        }
        if let Some(v) = &filter.excluded {
            p.and("id <>", v, "UUID");
        }

        p
    }

    /// Adds a `{lhs} ${idx}::{ty}` predicate with the provided parameter.
    fn and(&mut self, lhs: &str, param: &'a (dyn ToSql + Sync), ty: &str) {
        self.params.push(param);
        let idx = self.params.len();
        self.sql.push_str(&format!(" AND {lhs} ${idx}::{ty}"));
    }
}

impl<C> Database<Select<By<Option<Listing>, listing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: listing::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM listings \
             WHERE id = $1::UUID \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<Listing>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(listing): Insert<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        let Listing {
            id,
            property_number,
            details,
            created_at,
            updated_at,
        } = &listing;
        let (lat, lng) = details
            .coordinates
            .as_ref()
            .map(|c| (c.lat, c.lng))
            .unzip();

        const SQL: &str = "\
            INSERT INTO listings (\
                id, property_number, title, price, area, \
                property_type, layout, structure, address, transportation, \
                area_level_1, area_level_2, area_level_3, area_level_4, \
                zipcode, \
                lat, lng, \
                management_fee, repair_reserve_fund, land_lease_fee, \
                right_fee, deposit_guarantee, maintenance_fees, other_fees, \
                balcony_area, total_units, year_built, \
                pets, parking, kitchen, bath_toilet, \
                transaction_mode, images, \
                created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::INT8, $5::FLOAT8, \
                $6::VARCHAR, $7::VARCHAR, $8::VARCHAR, $9::VARCHAR, \
                $10::VARCHAR, \
                $11::VARCHAR, $12::VARCHAR, $13::VARCHAR, $14::VARCHAR, \
                $15::VARCHAR, \
                $16::FLOAT8, $17::FLOAT8, \
                $18::INT8, $19::INT8, $20::INT8, \
                $21::INT8, $22::INT8, $23::INT8, $24::INT8, \
                $25::FLOAT8, $26::INT4, $27::VARCHAR, \
                $28::BOOL, $29::VARCHAR, $30::VARCHAR, $31::VARCHAR, \
                $32::VARCHAR, $33::VARCHAR[], \
                $34::TIMESTAMPTZ, $35::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                id,
                property_number,
                &details.title,
                &details.price,
                &details.area,
                &details.property_type,
                &details.layout,
                &details.structure,
                &details.address,
                &details.transportation,
                &details.hierarchy.area_level_1,
                &details.hierarchy.area_level_2,
                &details.hierarchy.area_level_3,
                &details.hierarchy.area_level_4,
                &details.hierarchy.zipcode,
                &lat,
                &lng,
                &details.fees.management_fee,
                &details.fees.repair_reserve_fund,
                &details.fees.land_lease_fee,
                &details.fees.right_fee,
                &details.fees.deposit_guarantee,
                &details.fees.maintenance_fees,
                &details.fees.other_fees,
                &details.balcony_area,
                &details.total_units,
                &details.year_built,
                &details.amenities.pets,
                &details.amenities.parking,
                &details.amenities.kitchen,
                &details.amenities.bath_toilet,
                &details.transaction_mode,
                &details.images,
                created_at,
                updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Listing>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(listing): Update<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        let Listing {
            id,
            details,
            updated_at,
            ..
        } = &listing;
        let (lat, lng) = details
            .coordinates
            .as_ref()
            .map(|c| (c.lat, c.lng))
            .unzip();

        // `property_number` and `created_at` are immutable.
        const SQL: &str = "\
            UPDATE listings \
            SET title = $2::VARCHAR, \
                price = $3::INT8, \
                area = $4::FLOAT8, \
                property_type = $5::VARCHAR, \
                layout = $6::VARCHAR, \
                structure = $7::VARCHAR, \
                address = $8::VARCHAR, \
                transportation = $9::VARCHAR, \
                area_level_1 = $10::VARCHAR, \
                area_level_2 = $11::VARCHAR, \
                area_level_3 = $12::VARCHAR, \
                area_level_4 = $13::VARCHAR, \
                zipcode = $14::VARCHAR, \
                lat = $15::FLOAT8, \
                lng = $16::FLOAT8, \
                management_fee = $17::INT8, \
                repair_reserve_fund = $18::INT8, \
                land_lease_fee = $19::INT8, \
                right_fee = $20::INT8, \
                deposit_guarantee = $21::INT8, \
                maintenance_fees = $22::INT8, \
                other_fees = $23::INT8, \
                balcony_area = $24::FLOAT8, \
                total_units = $25::INT4, \
                year_built = $26::VARCHAR, \
                pets = $27::BOOL, \
                parking = $28::VARCHAR, \
                kitchen = $29::VARCHAR, \
                bath_toilet = $30::VARCHAR, \
                transaction_mode = $31::VARCHAR, \
                images = $32::VARCHAR[], \
                updated_at = $33::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                id,
                &details.title,
                &details.price,
                &details.area,
                &details.property_type,
                &details.layout,
                &details.structure,
                &details.address,
                &details.transportation,
                &details.hierarchy.area_level_1,
                &details.hierarchy.area_level_2,
                &details.hierarchy.area_level_3,
                &details.hierarchy.area_level_4,
                &details.hierarchy.zipcode,
                &lat,
                &lng,
                &details.fees.management_fee,
                &details.fees.repair_reserve_fund,
                &details.fees.land_lease_fee,
                &details.fees.right_fee,
                &details.fees.deposit_guarantee,
                &details.fees.maintenance_fees,
                &details.fees.other_fees,
                &details.balcony_area,
                &details.total_units,
                &details.year_built,
                &details.amenities.pets,
                &details.amenities.parking,
                &details.amenities.kitchen,
                &details.amenities.bath_toilet,
                &details.transaction_mode,
                &details.images,
                updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Listing, listing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Listing, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: listing::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM listings \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Listing, listing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Listing, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: listing::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM listings \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|deleted| deleted > 0)
    }
}

impl<C> Database<Select<By<list::Page, list::Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<list::Page, list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let list::Selector {
            arguments,
            filter,
            sort,
        } = by.into_inner();

        let limit = i64::try_from(arguments.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);

        let patterns = Patterns::of(&filter);
        let Predicates {
            sql: predicates,
            params: mut ps,
        } = Predicates::of(&filter, &patterns);
        let filtered = ps.len();

        ps.push(&limit);
        let limit_idx = ps.len();
        ps.push(&offset);
        let offset_idx = ps.len();

        let order = sort.order.sql();
        let sql = format!(
            "SELECT {COLUMNS}, COUNT(*) OVER () AS total \
             FROM listings \
             {predicates} \
             ORDER BY {column} {order} NULLS LAST, \
                      id {order} \
             LIMIT ${limit_idx}::INT8 \
             OFFSET ${offset_idx}::INT8",
            column = sort.column.sql(),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let total = if let Some(row) = rows.first() {
            row.get::<_, i64>("total")
        } else if arguments.offset() == 0 {
            0
        } else {
            // Window function yields nothing past the last row.
            let sql = format!(
                "SELECT COUNT(*) \
                 FROM listings \
                 {predicates}",
            );
            self.query_opt(&sql, &ps[..filtered])
                .await
                .map_err(tracerr::wrap!())?
                .map_or(0, |row| row.get::<_, i64>(0))
        };

        Ok(list::Page::new(
            arguments,
            rows.iter().map(from_row).collect::<Vec<Listing>>(),
            usize::try_from(total).unwrap_or_default(),
        ))
    }
}

impl<C> Database<Select<By<Vec<statistics::Sample>, list::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<statistics::Sample>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<statistics::Sample>, list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();

        let patterns = Patterns::of(&filter);
        let Predicates {
            sql: predicates,
            params: ps,
        } = Predicates::of(&filter, &patterns);

        let sql = format!(
            "SELECT price, area, property_type \
             FROM listings \
             {predicates}",
        );
        Ok(self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| statistics::Sample {
                price: row.get("price"),
                area: row.get("area"),
                property_type: row.get("property_type"),
            })
            .collect())
    }
}

impl<C> Database<Select<By<Vec<String>, distinct::Field>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<String>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<String>, distinct::Field>>,
    ) -> Result<Self::Ok, Self::Err> {
        let column = by.into_inner().sql();

        let sql = format!(
            "SELECT DISTINCT {column} AS value \
             FROM listings \
             WHERE {column} IS NOT NULL \
               AND {column} <> '' \
             ORDER BY value",
        );
        Ok(self
            .query(&sql, &[])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get("value"))
            .collect())
    }
}
