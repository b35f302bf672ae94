//! Error types for mirra, organized by subsystem: synchronization,
//! growth, sorting and the custom-property registry.
//!
//! Every variant here is a precondition failure that the embedding engine
//! treats as fatal for the rank. The single recoverable condition (an
//! extension owner that cannot relocate on the accelerator) is not an
//! error at all; it downgrades the sort mode and logs a warning.

use std::error::Error;
use std::fmt;

use crate::id::{CustomHandle, FieldId};
use crate::mask::FieldMask;

/// Errors from `mark_modified` / `ensure_valid` requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// The mask names one or more groups that have no registered field.
    UnregisteredGroup {
        /// The unregistered part of the requested mask.
        mask: FieldMask,
    },
    /// A field was registered under a mask that is not exactly one tag.
    InvalidGroup {
        /// The rejected mask.
        mask: FieldMask,
    },
    /// A [`FieldId`] that is not registered with the coordinator.
    UnknownField {
        /// The unrecognised field.
        field: FieldId,
    },
    /// Typed access requested an element type the field does not hold.
    TypeMismatch {
        /// The field that was accessed.
        field: FieldId,
        /// Name of the requested element type.
        expected: &'static str,
    },
    /// The field has an overlapped transfer in flight that must be joined
    /// before this operation.
    TransferInFlight {
        /// Name of the field being transferred.
        field: String,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredGroup { mask } => {
                write!(f, "field group {mask} has no registered field")
            }
            Self::InvalidGroup { mask } => {
                write!(f, "fields must be registered under a single group tag, got {mask}")
            }
            Self::UnknownField { field } => write!(f, "unknown field: {field}"),
            Self::TypeMismatch { field, expected } => {
                write!(f, "field {field} does not hold elements of type {expected}")
            }
            Self::TransferInFlight { field } => {
                write!(f, "field '{field}' has an overlapped transfer in flight")
            }
        }
    }
}

impl Error for SyncError {}

/// Errors from growing a mirrored field or extension-owned array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrowError {
    /// The requested capacity cannot hold the live particles.
    CapacityBelowCount {
        /// The requested capacity, in rows.
        requested: usize,
        /// The number of live rows.
        live: usize,
    },
    /// A column reshape asked for zero columns.
    InvalidColumns {
        /// Name of the field.
        field: String,
        /// The rejected column count.
        cols: usize,
    },
    /// The field is the target of an in-flight overlapped transfer.
    TransferInFlight {
        /// Name of the field.
        field: String,
    },
    /// The growth request named an unregistered group.
    Sync(SyncError),
}

impl fmt::Display for GrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityBelowCount { requested, live } => write!(
                f,
                "requested capacity {requested} is below the live particle count {live}"
            ),
            Self::InvalidColumns { field, cols } => {
                write!(f, "field '{field}' cannot be reshaped to {cols} columns")
            }
            Self::TransferInFlight { field } => {
                write!(f, "cannot grow field '{field}' while a transfer is in flight")
            }
            Self::Sync(e) => write!(f, "sync: {e}"),
        }
    }
}

impl Error for GrowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sync(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for GrowError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

/// Errors from bin-grid setup and the spatial sort.
#[derive(Clone, Debug, PartialEq)]
pub enum SortError {
    /// The configured bin size is zero, negative, or not finite.
    InvalidBinSize {
        /// The rejected bin length.
        value: f64,
    },
    /// The bounding box has no extent along an axis.
    DegenerateBox {
        /// Axis index (0 = x, 1 = y, 2 = z).
        axis: usize,
    },
    /// The bin grid would exceed the configured bin ceiling.
    TooManyBins {
        /// Number of bins the grid would need.
        requested: u128,
        /// The configured ceiling.
        max: usize,
    },
    /// A candidate permutation is not a bijection.
    InvalidPermutation {
        /// Length of the rejected map.
        len: usize,
    },
    /// The position buffer does not hold three columns per particle.
    PositionLayout {
        /// Columns found.
        cols: usize,
    },
    /// Obtaining a consistent buffer failed.
    Sync(SyncError),
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBinSize { value } => {
                write!(f, "sort bin size must be finite and positive, got {value}")
            }
            Self::DegenerateBox { axis } => {
                write!(f, "bounding box has zero extent along axis {axis}")
            }
            Self::TooManyBins { requested, max } => {
                write!(f, "too many sorting bins: {requested} exceeds {max}")
            }
            Self::InvalidPermutation { len } => {
                write!(f, "permutation of length {len} is not a bijection")
            }
            Self::PositionLayout { cols } => {
                write!(f, "positions must have 3 columns, found {cols}")
            }
            Self::Sync(e) => write!(f, "sync: {e}"),
        }
    }
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sync(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for SortError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

/// Errors from the custom-property registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CustomError {
    /// The handle was removed; its slot is a tombstone.
    Tombstoned {
        /// The removed handle.
        handle: CustomHandle,
    },
    /// The handle was never issued.
    UnknownHandle {
        /// The unrecognised handle.
        handle: CustomHandle,
    },
    /// Typed access asked for the wrong value type.
    WrongValueType {
        /// The handle that was accessed.
        handle: CustomHandle,
    },
}

impl fmt::Display for CustomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tombstoned { handle } => {
                write!(f, "custom property {handle} has been removed")
            }
            Self::UnknownHandle { handle } => {
                write!(f, "custom property {handle} was never added")
            }
            Self::WrongValueType { handle } => {
                write!(f, "custom property {handle} holds a different value type")
            }
        }
    }
}

impl Error for CustomError {}
