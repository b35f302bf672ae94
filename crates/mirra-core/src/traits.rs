//! The relocation contract for extension-owned per-particle data.

use crate::domain::Domain;
use crate::permutation::Permutation;

/// An external component owning per-particle arrays unknown to the core.
///
/// During a spatial sort the store hands every registered owner the same
/// [`Permutation`] it applied to its own fields. The owner must apply it
/// to all of its per-particle arrays before returning, so that after the
/// call the value at new index `j` is the pre-sort value at old index
/// `permutation.source_of(j)`.
///
/// Owners are registered and unregistered by the surrounding engine; the
/// store never calls anything but these two methods.
pub trait ExtensionOwner: Send {
    /// Human-readable name used in diagnostics.
    fn name(&self) -> &str;

    /// Relocate every owned per-particle array by `permutation`.
    ///
    /// `domain` says which copy of the owner's data is authoritative for
    /// this sort: [`Domain::Device`] for accelerator-side sorts,
    /// [`Domain::Host`] after the store has fallen back to host sorting.
    fn relocate(&mut self, permutation: &Permutation, domain: Domain);

    /// Whether [`relocate`](Self::relocate) can run on the accelerator.
    ///
    /// Queried once per sort. A single `false` downgrades the store to
    /// host-side sorting for the rest of the run.
    fn supports_device_relocation(&self) -> bool;
}
