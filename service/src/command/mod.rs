//! [`Command`] definition.

pub mod create_listing;
pub mod delete_listing;
pub mod update_listing;

use crate::domain::Listing;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    create_listing::CreateListing, delete_listing::DeleteListing,
    update_listing::UpdateListing,
};

/// [`Listing`] written by a [`Command`], along with the non-fatal validation
/// warnings.
#[derive(Clone, Debug, PartialEq)]
pub struct Written {
    /// Written [`Listing`].
    pub listing: Listing,

    /// Validation warnings.
    pub warnings: Vec<String>,
}
