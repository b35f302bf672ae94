//! Custom per-particle properties for mirra particle stores.
//!
//! Plugins and input commands attach ad-hoc per-particle data at run time
//! through [`CustomRegistry`]. Properties come in four categories (scalar
//! or array, integer or float), each with its own append-only handle
//! space. Removing a property leaves a tombstone, so handles stay stable
//! and are never reissued.
//!
//! Scalar-float properties are mirrored in both memory domains and
//! synchronized as the [`FieldMask::DVECTOR`](mirra_core::FieldMask::DVECTOR)
//! group; the registry implements [`MirrorSet`](mirra_mirror::MirrorSet) so
//! the store's sync policy applies to them unchanged.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod entry;
pub mod registry;

pub use entry::{CustomData, CustomEntry, ValueType};
pub use registry::CustomRegistry;
