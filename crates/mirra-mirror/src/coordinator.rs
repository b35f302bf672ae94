//! Mask-addressed synchronization across many mirrored fields.
//!
//! [`SyncCoordinator`] maps field-group tags to the fields registered under
//! them and turns `mark_modified` / `ensure_valid` requests into per-field
//! flag updates and transfers. [`SyncPolicy`] layers the auto-mirror
//! behavior on top of any [`MirrorSet`], so the same policy applies to the
//! coordinator's fields and to other mirrored collections such as the
//! custom-property registry.

use indexmap::IndexMap;
use smallvec::SmallVec;

use mirra_core::{Domain, FieldId, FieldMask, GrowError, Permutation, SyncError};

use crate::mirrored::{Element, FieldScope, Mirrored};
use crate::slot::MirrorSlot;
use crate::stats::{Transfer, TransferStats};

/// How `mark_modified` and `ensure_valid` treat the host copy.
///
/// Selected once per store lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Transfer only when `ensure_valid` finds the requested domain stale.
    #[default]
    Lazy,
    /// Keep the host copy current at all times.
    ///
    /// Every device-side `mark_modified` is followed by an inline host
    /// `ensure_valid`. Every device-side `ensure_valid` first re-marks the
    /// host copy as modified, so it always transfers host to device even
    /// when the device copy was already current. Callers may then read and
    /// write host data without calling the coordinator, at the cost of
    /// extra transfer volume.
    AutoMirror,
}

impl SyncPolicy {
    /// Record that the groups in `mask` were just written in `domain`.
    pub fn mark_modified<S: MirrorSet + ?Sized>(
        self,
        set: &mut S,
        domain: Domain,
        mask: FieldMask,
    ) -> Result<SyncReport, SyncError> {
        set.modify_raw(domain, mask)?;
        if domain == Domain::Device && self == Self::AutoMirror {
            return set.sync_raw(Domain::Host, mask, false);
        }
        Ok(SyncReport::default())
    }

    /// Make the groups in `mask` current in `domain`.
    pub fn ensure_valid<S: MirrorSet + ?Sized>(
        self,
        set: &mut S,
        domain: Domain,
        mask: FieldMask,
    ) -> Result<SyncReport, SyncError> {
        if domain == Domain::Device && self == Self::AutoMirror {
            set.modify_raw(Domain::Host, mask)?;
        }
        set.sync_raw(domain, mask, false)
    }

    /// Like [`ensure_valid`](Self::ensure_valid), but transfers run off the
    /// control thread and are joined when the data is next used.
    pub fn overlapped_ensure_valid<S: MirrorSet + ?Sized>(
        self,
        set: &mut S,
        domain: Domain,
        mask: FieldMask,
    ) -> Result<SyncReport, SyncError> {
        if domain == Domain::Device && self == Self::AutoMirror {
            set.modify_raw(Domain::Host, mask)?;
        }
        set.sync_raw(domain, mask, true)
    }
}

/// What one request did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Transfers performed (or started, for overlapped requests).
    pub transfers: usize,
    /// Bytes moved.
    pub bytes: usize,
    /// Of `transfers`, how many are running in the background.
    pub overlapped: usize,
}

impl SyncReport {
    /// Account for one transfer.
    pub fn record(&mut self, transfer: Transfer, overlapped: bool) {
        self.transfers += 1;
        self.bytes += transfer.bytes;
        if overlapped {
            self.overlapped += 1;
        }
    }

    /// Field-wise sum of two reports.
    pub fn merged(self, other: Self) -> Self {
        Self {
            transfers: self.transfers + other.transfers,
            bytes: self.bytes + other.bytes,
            overlapped: self.overlapped + other.overlapped,
        }
    }
}

/// A collection of mirrored data addressable by field-group mask.
///
/// The raw operations apply no policy; [`SyncPolicy`] builds the public
/// protocol on top of them.
pub trait MirrorSet {
    /// Union of the groups this set answers for.
    fn registered(&self) -> FieldMask;

    /// Set `domain`'s modified flag on every field in `mask`.
    fn modify_raw(&mut self, domain: Domain, mask: FieldMask) -> Result<(), SyncError>;

    /// Bring every field in `mask` up to date in `domain`.
    fn sync_raw(
        &mut self,
        domain: Domain,
        mask: FieldMask,
        overlapped: bool,
    ) -> Result<SyncReport, SyncError>;
}

/// Owns the mirrored fields and resolves masks to them.
pub struct SyncCoordinator {
    policy: SyncPolicy,
    fields: Vec<Box<dyn MirrorSlot>>,
    groups: IndexMap<u32, SmallVec<[FieldId; 4]>>,
    registered: FieldMask,
}

impl SyncCoordinator {
    /// Create an empty coordinator with the given policy.
    pub fn new(policy: SyncPolicy) -> Self {
        Self {
            policy,
            fields: Vec::new(),
            groups: IndexMap::new(),
            registered: FieldMask::empty(),
        }
    }

    /// The policy fixed at construction.
    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Register a field under a single group tag.
    ///
    /// A group may hold several fields; they are always synchronized
    /// together.
    pub fn register<T: Element, const N: usize>(
        &mut self,
        group: FieldMask,
        field: Mirrored<T, N>,
    ) -> Result<FieldId, SyncError> {
        if !group.is_single() {
            return Err(SyncError::InvalidGroup { mask: group });
        }
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(Box::new(field));
        self.groups.entry(group.bits()).or_default().push(id);
        self.registered |= group;
        Ok(id)
    }

    /// Union of all groups with at least one field.
    pub fn registered_groups(&self) -> FieldMask {
        self.registered
    }

    /// Number of registered fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Look a field up by name.
    pub fn find(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f.name() == name)
            .map(|i| FieldId(i as u32))
    }

    /// Ids of every field in the groups of `mask`.
    pub fn fields_in(&self, mask: FieldMask) -> Result<SmallVec<[FieldId; 8]>, SyncError> {
        self.check(mask)?;
        Ok(mask
            .iter()
            .flat_map(|tag| self.groups[&tag.bits()].iter().copied())
            .collect())
    }

    fn check(&self, mask: FieldMask) -> Result<(), SyncError> {
        let unknown = mask.difference(self.registered);
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(SyncError::UnregisteredGroup { mask: unknown })
        }
    }

    fn slot(&self, id: FieldId) -> Result<&dyn MirrorSlot, SyncError> {
        self.fields
            .get(id.0 as usize)
            .map(|b| b.as_ref())
            .ok_or(SyncError::UnknownField { field: id })
    }

    fn slot_mut(&mut self, id: FieldId) -> Result<&mut Box<dyn MirrorSlot>, SyncError> {
        self.fields
            .get_mut(id.0 as usize)
            .ok_or(SyncError::UnknownField { field: id })
    }

    /// Type-erased access to a field.
    pub fn erased(&self, id: FieldId) -> Result<&dyn MirrorSlot, SyncError> {
        self.slot(id)
    }

    /// Typed read access to a dual field.
    ///
    /// Fails with [`SyncError::TransferInFlight`] while an overlapped
    /// transfer on the field is still unjoined; use
    /// [`field_mut`](Self::field_mut) or [`join`](Self::join) to wait for it.
    pub fn field<T: Element>(&self, id: FieldId) -> Result<&Mirrored<T, 2>, SyncError> {
        let slot = self.slot(id)?;
        if slot.in_flight() {
            return Err(SyncError::TransferInFlight {
                field: slot.name().to_string(),
            });
        }
        slot.as_any()
            .downcast_ref::<Mirrored<T, 2>>()
            .ok_or(SyncError::TypeMismatch {
                field: id,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Typed mutable access to a dual field. Joins any in-flight transfer.
    pub fn field_mut<T: Element>(
        &mut self,
        id: FieldId,
    ) -> Result<&mut Mirrored<T, 2>, SyncError> {
        let slot = self.slot_mut(id)?;
        slot.join();
        slot.as_any_mut()
            .downcast_mut::<Mirrored<T, 2>>()
            .ok_or(SyncError::TypeMismatch {
                field: id,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Record that `mask` was just written in `domain`, applying the policy.
    pub fn mark_modified(
        &mut self,
        domain: Domain,
        mask: FieldMask,
    ) -> Result<SyncReport, SyncError> {
        let policy = self.policy;
        policy.mark_modified(self, domain, mask)
    }

    /// Make `mask` current in `domain`, applying the policy.
    pub fn ensure_valid(
        &mut self,
        domain: Domain,
        mask: FieldMask,
    ) -> Result<SyncReport, SyncError> {
        let policy = self.policy;
        policy.ensure_valid(self, domain, mask)
    }

    /// Start making `mask` current in `domain` without blocking.
    pub fn overlapped_ensure_valid(
        &mut self,
        domain: Domain,
        mask: FieldMask,
    ) -> Result<SyncReport, SyncError> {
        let policy = self.policy;
        policy.overlapped_ensure_valid(self, domain, mask)
    }

    /// Wait for every in-flight transfer in `mask`. Returns how many were joined.
    pub fn join(&mut self, mask: FieldMask) -> Result<usize, SyncError> {
        let ids = self.fields_in(mask)?;
        let mut joined = 0;
        for id in ids {
            if self.slot_mut(id)?.join() {
                joined += 1;
            }
        }
        Ok(joined)
    }

    /// Wait for every in-flight transfer.
    pub fn join_all(&mut self) -> usize {
        let mut joined = 0;
        for field in &mut self.fields {
            if field.join() {
                joined += 1;
            }
        }
        joined
    }

    /// Grow every per-particle field in `mask` to `new_capacity` rows.
    ///
    /// Table-scoped fields in `mask` are left alone.
    pub fn grow(&mut self, mask: FieldMask, new_capacity: usize) -> Result<(), GrowError> {
        self.check_grow(mask, new_capacity)?;
        for id in self.fields_in(mask)? {
            let slot = self.slot_mut(id)?;
            if slot.scope() == FieldScope::PerParticle {
                slot.grow(new_capacity)?;
            }
        }
        Ok(())
    }

    /// Whether [`grow`](Self::grow) with these arguments would succeed.
    /// Touches nothing.
    pub fn check_grow(&self, mask: FieldMask, new_capacity: usize) -> Result<(), GrowError> {
        for id in self.fields_in(mask)? {
            let slot = self.slot(id)?;
            if slot.in_flight() {
                return Err(GrowError::TransferInFlight {
                    field: slot.name().to_string(),
                });
            }
            if slot.scope() == FieldScope::PerParticle && new_capacity < slot.len() {
                return Err(GrowError::CapacityBelowCount {
                    requested: new_capacity,
                    live: slot.len(),
                });
            }
        }
        Ok(())
    }

    /// Reshape every field in `mask` to `new_cols` columns.
    pub fn reshape_columns(&mut self, mask: FieldMask, new_cols: usize) -> Result<(), GrowError> {
        for id in self.fields_in(mask)? {
            self.slot_mut(id)?.reshape_columns(new_cols)?;
        }
        Ok(())
    }

    /// Set the live row count of every per-particle field.
    pub fn set_len(&mut self, len: usize) -> Result<(), GrowError> {
        for f in self.fields.iter_mut() {
            if f.scope() == FieldScope::PerParticle {
                f.set_len(len)?;
            }
        }
        Ok(())
    }

    /// Smallest capacity among per-particle fields, or `None` if there are none.
    pub fn min_capacity(&self) -> Option<usize> {
        self.fields
            .iter()
            .filter(|f| f.scope() == FieldScope::PerParticle)
            .map(|f| f.capacity())
            .min()
    }

    /// Reorder `domain`'s copy of every per-particle field in `mask`.
    ///
    /// Flags are untouched: callers bracket this with `ensure_valid` and
    /// `mark_modified` on the same domain.
    pub fn permute(
        &mut self,
        mask: FieldMask,
        permutation: &Permutation,
        domain: Domain,
    ) -> Result<usize, SyncError> {
        let mut moved = 0;
        for id in self.fields_in(mask)? {
            let slot = self.slot_mut(id)?;
            if slot.scope() == FieldScope::PerParticle {
                slot.permute(permutation, domain);
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Bytes allocated per domain across every field.
    pub fn allocation_bytes(&self) -> usize {
        self.fields.iter().map(|f| f.allocation_bytes()).sum()
    }

    /// Transfer counters summed over every field.
    pub fn stats(&self) -> TransferStats {
        self.fields
            .iter()
            .fold(TransferStats::default(), |acc, f| acc.merged(f.stats()))
    }
}

impl MirrorSet for SyncCoordinator {
    fn registered(&self) -> FieldMask {
        self.registered
    }

    fn modify_raw(&mut self, domain: Domain, mask: FieldMask) -> Result<(), SyncError> {
        for id in self.fields_in(mask)? {
            self.slot_mut(id)?.modify(domain);
        }
        Ok(())
    }

    fn sync_raw(
        &mut self,
        domain: Domain,
        mask: FieldMask,
        overlapped: bool,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        for id in self.fields_in(mask)? {
            let slot = self.slot_mut(id)?;
            let transfer = if overlapped {
                slot.begin_sync(domain)
            } else {
                slot.sync(domain)
            };
            if let Some(t) = transfer {
                report.record(t, overlapped);
            }
        }
        Ok(report)
    }
}
