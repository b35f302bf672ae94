//! Spatial bin sorting for mirra particle stores.
//!
//! Particles are reordered so that particles in the same spatial bin sit
//! next to each other in memory. This crate computes the reordering; the
//! store applies it to its fields and to every extension owner.
//!
//! - [`geometry`]: the box collaborator (bounding box, shear, fractional frame).
//! - [`grid`]: bin grid construction and the counting-sort permutation.
//! - [`mode`]: the one-way device-to-host sort mode and the grid state machine.
//! - [`sorter`]: [`BinSorter`], which ties the above to a step cadence.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod geometry;
pub mod grid;
pub mod mode;
pub mod sorter;

pub use geometry::{BoundingBox, Geometry, OrthoBox, TriclinicBox};
pub use grid::{bin_permutation, BinFrame, BinGrid, BinSizing};
pub use mode::{SortMode, SortState};
pub use sorter::{BinSorter, SortPlan, SorterConfig, DEFAULT_MAX_BINS};
