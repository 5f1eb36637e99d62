//! [`Location`]-related read definitions.

use crate::domain::location::{Hierarchy, Kind};
#[cfg(doc)]
use crate::domain::{Listing, Location};

/// Substring lookup of a single [`Kind`] of [`Location`]s.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lookup {
    /// [`Kind`] of the field being looked up.
    pub kind: Kind,

    /// Substring to look for.
    pub term: String,

    /// Maximum number of [`Match`]es.
    pub limit: usize,
}

/// [`Listing`] matched by a [`Lookup`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Match {
    /// [`Hierarchy`] of the matched [`Listing`].
    pub hierarchy: Hierarchy,

    /// Street address of the matched [`Listing`].
    pub address: String,
}

/// Sample of [`Hierarchy`]s of [`Listing`]s having a known value of the
/// specified [`Kind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sample {
    /// [`Kind`] of the field required to be present.
    pub kind: Kind,

    /// Maximum number of [`Hierarchy`]s.
    pub limit: usize,
}
