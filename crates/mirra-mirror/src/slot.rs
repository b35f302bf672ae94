//! Type-erased access to mirrored fields.
//!
//! The coordinator stores fields of different element types side by side
//! and drives them through [`MirrorSlot`]. Typed access goes back through
//! [`as_any`](MirrorSlot::as_any) downcasts.

use std::any::Any;

use mirra_core::{Domain, GrowError, Permutation};

use crate::mirrored::{Element, FieldScope, Mirrored};
use crate::stats::{Transfer, TransferStats};

/// Object-safe view of a [`Mirrored`] field.
pub trait MirrorSlot: Send {
    /// Field name.
    fn name(&self) -> &str;
    /// Whether rows are per particle.
    fn scope(&self) -> FieldScope;
    /// Elements per row.
    fn cols(&self) -> usize;
    /// Live rows.
    fn len(&self) -> usize;
    /// Allocated rows.
    fn capacity(&self) -> usize;
    /// Name of the element type.
    fn element_type(&self) -> &'static str;
    /// See [`Mirrored::allocation_bytes`].
    fn allocation_bytes(&self) -> usize;
    /// See [`Mirrored::is_modified`].
    fn is_modified(&self, domain: Domain) -> bool;
    /// See [`Mirrored::in_flight`].
    fn in_flight(&self) -> bool;
    /// See [`Mirrored::modify`].
    fn modify(&mut self, domain: Domain);
    /// See [`Mirrored::sync`].
    fn sync(&mut self, domain: Domain) -> Option<Transfer>;
    /// See [`Mirrored::begin_sync`].
    fn begin_sync(&mut self, domain: Domain) -> Option<Transfer>;
    /// See [`Mirrored::join`].
    fn join(&mut self) -> bool;
    /// See [`Mirrored::set_len`].
    fn set_len(&mut self, len: usize) -> Result<(), GrowError>;
    /// See [`Mirrored::grow`].
    fn grow(&mut self, new_capacity: usize) -> Result<(), GrowError>;
    /// See [`Mirrored::reshape_columns`].
    fn reshape_columns(&mut self, new_cols: usize) -> Result<(), GrowError>;
    /// See [`Mirrored::permute`].
    fn permute(&mut self, permutation: &Permutation, domain: Domain);
    /// See [`Mirrored::stats`].
    fn stats(&self) -> TransferStats;
    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for typed access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Element, const N: usize> MirrorSlot for Mirrored<T, N> {
    fn name(&self) -> &str {
        Mirrored::name(self)
    }

    fn scope(&self) -> FieldScope {
        Mirrored::scope(self)
    }

    fn cols(&self) -> usize {
        Mirrored::cols(self)
    }

    fn len(&self) -> usize {
        Mirrored::len(self)
    }

    fn capacity(&self) -> usize {
        Mirrored::capacity(self)
    }

    fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn allocation_bytes(&self) -> usize {
        Mirrored::allocation_bytes(self)
    }

    fn is_modified(&self, domain: Domain) -> bool {
        Mirrored::is_modified(self, domain)
    }

    fn in_flight(&self) -> bool {
        Mirrored::in_flight(self)
    }

    fn modify(&mut self, domain: Domain) {
        Mirrored::modify(self, domain)
    }

    fn sync(&mut self, domain: Domain) -> Option<Transfer> {
        Mirrored::sync(self, domain)
    }

    fn begin_sync(&mut self, domain: Domain) -> Option<Transfer> {
        Mirrored::begin_sync(self, domain)
    }

    fn join(&mut self) -> bool {
        Mirrored::join(self)
    }

    fn set_len(&mut self, len: usize) -> Result<(), GrowError> {
        Mirrored::set_len(self, len)
    }

    fn grow(&mut self, new_capacity: usize) -> Result<(), GrowError> {
        Mirrored::grow(self, new_capacity)
    }

    fn reshape_columns(&mut self, new_cols: usize) -> Result<(), GrowError> {
        Mirrored::reshape_columns(self, new_cols)
    }

    fn permute(&mut self, permutation: &Permutation, domain: Domain) {
        Mirrored::permute(self, permutation, domain)
    }

    fn stats(&self) -> TransferStats {
        Mirrored::stats(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
