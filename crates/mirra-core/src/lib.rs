//! Core types and traits for mirra dual-domain particle storage.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other mirra crate: memory domains,
//! field-group masks, strongly typed ids, the sort permutation, the
//! extension-owner relocation contract, and the error enums.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod domain;
pub mod error;
pub mod id;
pub mod mask;
pub mod permutation;
pub mod traits;

pub use domain::Domain;
pub use error::{CustomError, GrowError, SortError, SyncError};
pub use id::{CustomCategory, CustomHandle, FieldId, OwnerId, StepIndex};
pub use mask::{FieldMask, FieldMaskIter};
pub use permutation::Permutation;
pub use traits::ExtensionOwner;
