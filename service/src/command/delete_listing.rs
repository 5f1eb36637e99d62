//! [`Command`] for deleting a [`Listing`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{listing, Listing},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Listing`].
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteListing {
    /// ID of the [`Listing`] to delete.
    pub id: listing::Id,
}

impl<Db> Command<DeleteListing> for Service<Db>
where
    Db: Database<
        Delete<By<Listing, listing::Id>>,
        Ok = bool,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DeleteListing { id }: DeleteListing,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let deleted = self
            .database()
            .execute(Delete(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !deleted {
            return Err(tracerr::new!(E::NotExists(id)));
        }

        tracing::info!(%id, "`Listing` deleted");
        Ok(())
    }
}

/// Error of [`DeleteListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Listing`] doesn't exist.
    #[display("`Listing(id: {_0})` does not exist")]
    #[from(ignore)]
    NotExists(#[error(not(source))] listing::Id),
}
