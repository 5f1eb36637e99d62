//! [`Command`] for updating an existing [`Listing`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        listing::{self, validation, Draft, Report},
        Listing,
    },
    infra::{database, Database},
    Service,
};

use super::{Command, Written};

/// [`Command`] for updating an existing [`Listing`].
///
/// [`listing::PropertyNumber`] and creation date of the [`Listing`] are never
/// changed.
#[derive(Clone, Debug)]
pub struct UpdateListing {
    /// ID of the [`Listing`] to update.
    pub id: listing::Id,

    /// [`Draft`] replacing the current [`Listing`] details.
    pub draft: Draft,
}

impl<Db> Command<UpdateListing> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Listing, listing::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Listing>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Written;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateListing,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateListing { id, draft } = cmd;
        let now = DateTime::now();

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent updates of the same `Listing`.
        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let existing = tx
            .execute(Select(By::<Option<Listing>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotExists(id))
            .map_err(tracerr::wrap!())?;

        let report = validation::for_update(&draft, &existing, now.year());
        if !report.is_valid() {
            return Err(tracerr::new!(E::Invalid(report)));
        }

        let listing = draft.into_updated(&existing, now);
        tx.execute(Update(listing.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(Written {
            listing,
            warnings: report.warnings,
        })
    }
}

/// Error of [`UpdateListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Draft`] failed validation.
    #[display("`Listing` validation failed: {_0}")]
    Invalid(Report),

    /// [`Listing`] doesn't exist.
    #[display("`Listing(id: {_0})` does not exist")]
    #[from(ignore)]
    NotExists(#[error(not(source))] listing::Id),
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Handler as _};

    use super::{ExecutionError, UpdateListing};
    use crate::{
        domain::listing::{self, Details, Draft, PropertyNumber},
        infra::database::mock::Mock,
        Config, Service,
    };

    fn draft(title: &str) -> Draft {
        Draft {
            property_number: None,
            details: Details {
                title: title.into(),
                price: 3_000_000,
                area: 40.0,
                property_type: Some("condo".into()),
                address: "1-1 Marunouchi, Chiyoda".into(),
                ..Details::default()
            },
        }
    }

    #[tokio::test]
    async fn preserves_identity() {
        let existing = draft("Original")
            .into_new(PropertyNumber::generate(Some("condo")), DateTime::UNIX_EPOCH);
        let db = Mock::with([existing.clone()]);
        let svc = Service::new(Config::default(), db.clone());

        let mut update = draft("Renovated");
        update.property_number = Some("OTHER-1".into());
        let written = svc
            .execute(UpdateListing {
                id: existing.id,
                draft: update,
            })
            .await
            .unwrap();
        let updated = written.listing;

        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.property_number, existing.property_number);
        assert_eq!(updated.created_at, existing.created_at);
        assert_ne!(updated.updated_at.coerce::<()>(), existing.updated_at.coerce());
        assert_eq!(updated.details.title, "Renovated");
        assert_eq!(written.warnings.len(), 1);
        assert_eq!(db.snapshot(), vec![updated]);
    }

    #[tokio::test]
    async fn rejects_invalid_draft() {
        let existing = draft("Original")
            .into_new(PropertyNumber::generate(None), DateTime::now());
        let db = Mock::with([existing.clone()]);
        let svc = Service::new(Config::default(), db.clone());

        let err = svc
            .execute(UpdateListing {
                id: existing.id,
                draft: draft("x"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Invalid(_)));
        assert_eq!(db.snapshot(), vec![existing]);
    }

    #[tokio::test]
    async fn fails_on_missing_listing() {
        let svc = Service::new(Config::default(), Mock::default());

        let err = svc
            .execute(UpdateListing {
                id: listing::Id::new(),
                draft: draft("Missing"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotExists(_)));
    }
}
