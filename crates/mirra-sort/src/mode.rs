//! Where the sort runs, and the one-way switch between the two.

use std::fmt;

use mirra_core::Domain;

/// Which domain performs the spatial sort.
///
/// The only transition is [`Device`](Self::Device) to
/// [`Host`](Self::Host), through [`downgrade`](Self::downgrade). Nothing
/// moves it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    /// Bin, permute and relocate on the accelerator.
    Device,
    /// Pull everything to the host, sort there and push results back.
    Host,
}

impl SortMode {
    /// Switch to host sorting. Returns `true` if the mode changed.
    pub fn downgrade(&mut self) -> bool {
        let changed = *self == Self::Device;
        *self = Self::Host;
        changed
    }

    /// The domain the sort reads and writes.
    pub fn domain(self) -> Domain {
        match self {
            Self::Device => Domain::Device,
            Self::Host => Domain::Host,
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Host => write!(f, "host"),
        }
    }
}

/// Lifecycle of the bin grid around a sort.
///
/// ```text
/// BinsStale --prepare--> BinsReady --permutation--> Sorting --finish--> Idle
///     ^                      ^                                           |
///     |                      +---------------- prepare ------------------+
///     +----------------------- geometry change --------------------------+
/// ```
///
/// `prepare` on a single-bin grid goes straight to `Idle` (the sort is
/// skipped). A geometry change moves `Idle` or `BinsReady` to `BinsStale`. During
/// `Sorting` the change is held back and applied when the sort finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortState {
    /// Bins are valid; no sort is running.
    Idle,
    /// Bins must be recomputed before the next sort.
    BinsStale,
    /// Bins were just (re)validated for the sort about to run.
    BinsReady,
    /// A permutation has been handed out and is being applied.
    Sorting,
}
