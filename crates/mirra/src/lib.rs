//! Mirra: particle data kept in two memory domains, sorted by space.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Mirra sub-crates. For most users, adding `mirra` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use mirra::prelude::*;
//!
//! let config = StoreConfig {
//!     sort: SortConfig {
//!         frequency: 100,
//!         sizing: BinSizing::Explicit(1.0),
//!         ..SortConfig::default()
//!     },
//!     initial_capacity: 4,
//!     ..StoreConfig::default()
//! };
//! let mut store = ParticleStore::new(config).unwrap();
//! store.set_counts(4, 0).unwrap();
//!
//! // Write positions on the host, then sort by bin along x.
//! let x = store.ids().x;
//! store.field_mut::<f64>(x).unwrap().view_mut(Domain::Host).copy_from_slice(&[
//!     1.5, 0.5, 0.5, //
//!     0.5, 0.5, 0.5, //
//!     1.2, 0.5, 0.5, //
//!     0.2, 0.5, 0.5,
//! ]);
//! store.mark_modified(Domain::Host, FieldMask::X).unwrap();
//!
//! let geometry = OrthoBox::new([0.0; 3], [2.0, 1.0, 1.0]);
//! match store.sort(StepIndex(0), &geometry).unwrap() {
//!     SortOutcome::Sorted { permutation, .. } => assert_eq!(permutation.len(), 4),
//!     other => panic!("expected a sort, got {other:?}"),
//! }
//! assert_eq!(store.next_sort(), StepIndex(100));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `mirra-core` | Domains, field masks, ids, permutations, errors |
//! | [`mirror`] | `mirra-mirror` | Mirrored fields, sync policies, growth |
//! | [`sort`] | `mirra-sort` | Geometry, bin grids, the bin sorter |
//! | [`custom`] | `mirra-custom` | Run-time custom property registry |
//! | [`engine`] | `mirra-engine` | The particle store tying it all together |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, ids and errors (`mirra-core`).
///
/// Contains [`types::Domain`], [`types::FieldMask`], [`types::Permutation`]
/// and the [`types::ExtensionOwner`] relocation contract.
pub use mirra_core as types;

/// Mirrored storage and the sync protocol (`mirra-mirror`).
///
/// [`mirror::Mirrored`] holds one or two copies of a field;
/// [`mirror::SyncCoordinator`] resolves group masks to fields and applies a
/// [`mirror::SyncPolicy`].
pub use mirra_mirror as mirror;

/// Spatial binning and sorting (`mirra-sort`).
///
/// Provides the [`sort::Geometry`] trait with [`sort::OrthoBox`] and
/// [`sort::TriclinicBox`], plus the [`sort::BinSorter`] state machine.
pub use mirra_sort as sort;

/// Custom per-particle properties (`mirra-custom`).
///
/// Handles from [`custom::CustomRegistry`] are dense per category and never
/// reused.
pub use mirra_custom as custom;

/// The particle store (`mirra-engine`).
///
/// [`engine::ParticleStore`] owns the core fields, custom properties,
/// extension owners and the sorter.
pub use mirra_engine as engine;

/// Common imports for typical Mirra usage.
///
/// ```rust
/// use mirra::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use mirra_core::{
        CustomHandle, Domain, ExtensionOwner, FieldId, FieldMask, OwnerId, Permutation, StepIndex,
    };

    // Errors
    pub use mirra_core::{CustomError, GrowError, SortError, SyncError};

    // Mirroring
    pub use mirra_mirror::{DualField, HostField, SyncPolicy, SyncReport};

    // Sorting
    pub use mirra_sort::{BinSizing, Geometry, OrthoBox, SortMode, TriclinicBox};

    // Custom properties
    pub use mirra_custom::ValueType;

    // Engine
    pub use mirra_engine::{
        Layout, ParticleStore, SortConfig, SortOutcome, StoreConfig, StoreError, StoreMetrics,
    };
}
