//! [`Command`] for creating a new [`Listing`].

use common::{
    operations::{Commit, Insert, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        listing::{validation, Draft, PropertyNumber, Report},
        Listing,
    },
    infra::{database, Database},
    Service,
};

use super::{Command, Written};

/// Transaction mode of a new [`Listing`] if none is provided.
pub const DEFAULT_TRANSACTION_MODE: &str = "sale";

/// Name of the store constraint enforcing [`PropertyNumber`] uniqueness.
pub const PROPERTY_NUMBER_CONSTRAINT: &str = "listings_property_number_key";

/// Number of retries with a freshly generated [`PropertyNumber`] once the
/// previous one collides with an existing [`Listing`].
pub const GENERATION_RETRIES: usize = 1;

/// [`Command`] for creating a new [`Listing`].
#[derive(Clone, Debug, From)]
pub struct CreateListing {
    /// [`Draft`] of a new [`Listing`].
    pub draft: Draft,
}

impl<Db> Command<CreateListing> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Insert<Listing>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Written;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateListing,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateListing { mut draft } = cmd;
        let now = DateTime::now();

        let report = validation::for_create(&draft, now.year());
        if !report.is_valid() {
            return Err(tracerr::new!(E::Invalid(report)));
        }

        let supplied =
            draft.property_number.clone().and_then(PropertyNumber::new);
        if draft.details.transaction_mode.is_none() {
            draft.details.transaction_mode =
                Some(DEFAULT_TRANSACTION_MODE.to_owned());
        }

        let mut retries = 0;
        loop {
            let number = supplied.clone().unwrap_or_else(|| {
                PropertyNumber::generate(
                    draft.details.property_type.as_deref(),
                )
            });
            let listing = draft.clone().into_new(number, now);

            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            match tx.execute(Insert(listing.clone())).await {
                Ok(()) => {}
                Err(e)
                    if supplied.is_none()
                        && retries < GENERATION_RETRIES
                        && e.as_ref().is_unique_violation(Some(
                            PROPERTY_NUMBER_CONSTRAINT,
                        )) =>
                {
                    retries += 1;
                    tracing::warn!(
                        "generated `PropertyNumber` `{}` is occupied, retrying",
                        listing.property_number,
                    );
                    continue;
                }
                Err(e) => {
                    return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
                }
            }

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            return Ok(Written {
                listing,
                warnings: report.warnings,
            });
        }
    }
}

/// Error of [`CreateListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Draft`] failed validation.
    #[display("`Listing` validation failed: {_0}")]
    Invalid(Report),
}

#[cfg(test)]
mod spec {
    use std::sync::atomic::Ordering;

    use common::{DateTime, Handler as _};

    use super::{CreateListing, ExecutionError, DEFAULT_TRANSACTION_MODE};
    use crate::{
        domain::listing::{Details, Draft},
        infra::database::mock::Mock,
        Config, Service,
    };

    fn draft() -> Draft {
        Draft {
            property_number: None,
            details: Details {
                title: "Bright 1LDK".into(),
                price: 2_500_000,
                area: 35.0,
                property_type: Some("apartment".into()),
                address: "2-1 Ebisu, Shibuya".into(),
                ..Details::default()
            },
        }
    }

    #[tokio::test]
    async fn creates_with_generated_number() {
        let db = Mock::default();
        let svc = Service::new(Config::default(), db.clone());

        let written = svc.execute(CreateListing { draft: draft() }).await.unwrap();
        let listing = written.listing;

        assert!(AsRef::<str>::as_ref(&listing.property_number).starts_with("APA-"));
        assert_eq!(listing.created_at.coerce::<()>(), listing.updated_at.coerce());
        assert_eq!(
            listing.details.transaction_mode.as_deref(),
            Some(DEFAULT_TRANSACTION_MODE),
        );
        assert_eq!(db.snapshot(), vec![listing]);
        assert_eq!(db.commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keeps_supplied_number() {
        let svc = Service::new(Config::default(), Mock::default());

        let mut draft = draft();
        draft.property_number = Some("TKY-0001".into());
        let written = svc.execute(CreateListing { draft }).await.unwrap();

        assert_eq!(AsRef::<str>::as_ref(&written.listing.property_number), "TKY-0001");
    }

    #[tokio::test]
    async fn rejects_future_built_year() {
        let db = Mock::default();
        let svc = Service::new(Config::default(), db.clone());

        let mut draft = draft();
        draft.details.year_built =
            Some((DateTime::now().year() + 5).to_string());
        let err = svc.execute(CreateListing { draft }).await.unwrap_err();

        let ExecutionError::Invalid(report) = err.as_ref() else {
            panic!("expected validation error, got: {err}");
        };
        assert!(!report.errors.is_empty());
        assert!(db.snapshot().is_empty());
    }

    #[tokio::test]
    async fn returns_warnings() {
        let svc = Service::new(Config::default(), Mock::default());

        let mut draft = draft();
        draft.details.property_type = Some("castle".into());
        let written = svc.execute(CreateListing { draft }).await.unwrap();

        assert_eq!(written.warnings.len(), 1);
        assert!(AsRef::<str>::as_ref(&written.listing.property_number).starts_with("CAS-"));
    }
}
