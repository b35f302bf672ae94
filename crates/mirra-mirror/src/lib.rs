//! Mirrored per-particle buffers and the host/device sync coordinator.
//!
//! Every per-particle field exists as one allocation per memory domain,
//! each with its own "last written here" flag. This crate owns that
//! representation and the protocol that keeps the copies consistent.
//!
//! # Architecture
//!
//! ```text
//! SyncCoordinator (policy: Lazy | AutoMirror)
//! ├── IndexMap<group tag, SmallVec<FieldId>>   (mask -> fields)
//! └── Vec<Box<dyn MirrorSlot>>                 (FieldId -> field)
//!     └── Mirrored<T, N>
//!         ├── [Vec<T>; N]   one copy per domain
//!         ├── [bool; N]     modified-here flags
//!         └── Option<InFlight<T>>  overlapped transfer, joined on use
//! ```
//!
//! # Protocol
//!
//! - `mark_modified(domain, mask)` sets the domain's flag on every field
//!   of every group in `mask`.
//! - `ensure_valid(domain, mask)` copies from the other domain into
//!   `domain` for each field whose other-domain flag is set, then clears
//!   that flag. At most one transfer per field per request.
//! - Growth reallocates both copies and leaves them consistent with both
//!   flags clear.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod coordinator;
pub mod growth;
pub mod mirrored;
mod overlap;
pub mod slot;
pub mod stats;

pub use coordinator::{MirrorSet, SyncCoordinator, SyncPolicy, SyncReport};
pub use growth::grow_rows;
pub use mirrored::{DualField, Element, FieldScope, HostField, Mirrored};
pub use slot::MirrorSlot;
pub use stats::{Transfer, TransferStats};
