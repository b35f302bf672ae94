//! The mirra particle store.
//!
//! [`ParticleStore`] owns every per-particle buffer of one simulation rank:
//! the core fields in a [`SyncCoordinator`](mirra_mirror::SyncCoordinator),
//! run-time custom properties in a
//! [`CustomRegistry`](mirra_custom::CustomRegistry), the
//! [`BinSorter`](mirra_sort::BinSorter) that reorders them for locality,
//! and the extension owners whose arrays must follow every reorder.
//!
//! # Sort pass
//!
//! ```text
//! request_sort(step)  ── not due ──► NotDue
//!   │
//!   ▼
//! check extension owners ── any incapable ──► downgrade to host (once, warn)
//!   │
//!   ▼
//! prepare bins ── single bin ──► Skipped
//!   │
//!   ▼
//! ensure_valid(mode domain, X) ► permutation
//!   │
//!   ▼
//! ensure_valid ► permute ► mark_modified   (core groups + DVECTOR)
//!   │
//!   ▼
//! relocate every extension owner ──► Sorted
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
mod extension;
pub mod fields;
pub mod metrics;
pub mod store;

pub use config::{ConfigError, Layout, SortConfig, StoreConfig};
pub use error::StoreError;
pub use fields::CoreFieldIds;
pub use metrics::StoreMetrics;
pub use store::{ParticleStore, SortOutcome};
