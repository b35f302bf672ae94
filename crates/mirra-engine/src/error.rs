//! The store-level error type.

use std::error::Error;
use std::fmt;

use mirra_core::{CustomError, GrowError, SortError, SyncError};

use crate::config::ConfigError;

/// Any error a [`ParticleStore`](crate::ParticleStore) operation can return.
///
/// Every variant is fatal for the rank: the caller is expected to report
/// it and stop. The one recoverable condition, an extension owner without
/// device relocation support, is handled inside the sort and never
/// surfaces here.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreError {
    /// Configuration rejected at construction.
    Config(ConfigError),
    /// A sync request failed.
    Sync(SyncError),
    /// Capacity growth failed.
    Grow(GrowError),
    /// The spatial sort failed.
    Sort(SortError),
    /// A custom-property request failed.
    Custom(CustomError),
    /// A particle type outside `1..=types`.
    UnknownType {
        /// The requested type.
        ty: usize,
        /// Number of configured types.
        types: usize,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Sync(e) => write!(f, "sync: {e}"),
            Self::Grow(e) => write!(f, "grow: {e}"),
            Self::Sort(e) => write!(f, "sort: {e}"),
            Self::Custom(e) => write!(f, "custom property: {e}"),
            Self::UnknownType { ty, types } => {
                write!(f, "particle type {ty} out of range 1..={types}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Sync(e) => Some(e),
            Self::Grow(e) => Some(e),
            Self::Sort(e) => Some(e),
            Self::Custom(e) => Some(e),
            Self::UnknownType { .. } => None,
        }
    }
}

impl From<ConfigError> for StoreError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SyncError> for StoreError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl From<GrowError> for StoreError {
    fn from(e: GrowError) -> Self {
        Self::Grow(e)
    }
}

impl From<SortError> for StoreError {
    fn from(e: SortError) -> Self {
        Self::Sort(e)
    }
}

impl From<CustomError> for StoreError {
    fn from(e: CustomError) -> Self {
        Self::Custom(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirra_core::FieldMask;

    #[test]
    fn display_names_subsystem() {
        let e: StoreError = SyncError::UnregisteredGroup { mask: FieldMask::Q }.into();
        assert_eq!(e.to_string(), "sync: field group q has no registered field");
        assert!(e.source().is_some());
    }
}
