//! The append-only custom property registry.

use mirra_core::{
    CustomCategory, CustomError, CustomHandle, Domain, FieldMask, GrowError, Permutation,
    SyncError,
};
use mirra_mirror::{DualField, HostField, MirrorSet, SyncReport, TransferStats};

use crate::entry::{CustomData, CustomEntry, ValueType};

/// A registry slot. Removal leaves a tombstone in place.
#[derive(Debug)]
enum Slot {
    Live(CustomEntry),
    Tombstone,
}

/// Named per-particle properties added at run time.
///
/// Each [`CustomCategory`] has its own list. Handles index into that list
/// and are issued in strictly increasing order; lists never shrink, so a
/// removed handle is never reissued. Name lookup is left to the caller.
#[derive(Debug)]
pub struct CustomRegistry {
    lists: [Vec<Slot>; 4],
    capacity: usize,
    len: usize,
    retired: TransferStats,
}

impl CustomRegistry {
    /// Empty registry whose entries will be allocated with `capacity` rows.
    pub fn new(capacity: usize) -> Self {
        Self {
            lists: Default::default(),
            capacity,
            len: 0,
            retired: TransferStats::default(),
        }
    }

    /// Rows allocated per entry.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live rows per entry.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no particle rows are live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots ever issued in `category`, tombstones included.
    pub fn issued(&self, category: CustomCategory) -> usize {
        self.lists[category.index()].len()
    }

    /// Add a property and return its handle.
    ///
    /// `cols == 0` adds a scalar property, otherwise an array of `cols`
    /// values per particle. Storage is sized to the current capacity and
    /// zero-filled. Names are not checked for uniqueness.
    pub fn add(&mut self, name: &str, value_type: ValueType, cols: usize) -> CustomHandle {
        let category = value_type.category(cols);
        let data = CustomData::allocate(category, cols, self.capacity, self.len, name);
        let list = &mut self.lists[category.index()];
        let handle = CustomHandle {
            category,
            index: list.len() as u32,
        };
        list.push(Slot::Live(CustomEntry {
            category,
            cols,
            data,
        }));
        tracing::debug!(%handle, name, "custom property added");
        handle
    }

    /// Free a property's storage and name, leaving a tombstone.
    pub fn remove(&mut self, handle: CustomHandle) -> Result<(), CustomError> {
        let slot = self.lists[handle.category.index()]
            .get_mut(handle.index as usize)
            .ok_or(CustomError::UnknownHandle { handle })?;
        match std::mem::replace(slot, Slot::Tombstone) {
            Slot::Live(entry) => {
                self.retired = self.retired.merged(entry.data.slot().stats());
                tracing::debug!(%handle, "custom property removed");
                Ok(())
            }
            Slot::Tombstone => Err(CustomError::Tombstoned { handle }),
        }
    }

    /// Transfer counters of every entry ever added, removed ones included.
    pub fn stats(&self) -> TransferStats {
        self.lists
            .iter()
            .flatten()
            .filter_map(|s| match s {
                Slot::Live(e) => Some(e.data.slot().stats()),
                Slot::Tombstone => None,
            })
            .fold(self.retired, TransferStats::merged)
    }

    /// Whether `handle` names a live property.
    pub fn is_live(&self, handle: CustomHandle) -> bool {
        matches!(
            self.lists[handle.category.index()].get(handle.index as usize),
            Some(Slot::Live(_))
        )
    }

    /// The live entry behind `handle`.
    pub fn get(&self, handle: CustomHandle) -> Result<&CustomEntry, CustomError> {
        match self.lists[handle.category.index()].get(handle.index as usize) {
            Some(Slot::Live(e)) => Ok(e),
            Some(Slot::Tombstone) => Err(CustomError::Tombstoned { handle }),
            None => Err(CustomError::UnknownHandle { handle }),
        }
    }

    /// Mutable access to the live entry behind `handle`.
    pub fn get_mut(&mut self, handle: CustomHandle) -> Result<&mut CustomEntry, CustomError> {
        match self.lists[handle.category.index()].get_mut(handle.index as usize) {
            Some(Slot::Live(e)) => Ok(e),
            Some(Slot::Tombstone) => Err(CustomError::Tombstoned { handle }),
            None => Err(CustomError::UnknownHandle { handle }),
        }
    }

    /// Integer storage of a scalar-int or array-int property.
    pub fn ints(&self, handle: CustomHandle) -> Result<&HostField<i32>, CustomError> {
        match &self.get(handle)?.data {
            CustomData::Int(f) => Ok(f),
            _ => Err(CustomError::WrongValueType { handle }),
        }
    }

    /// Mutable integer storage.
    pub fn ints_mut(&mut self, handle: CustomHandle) -> Result<&mut HostField<i32>, CustomError> {
        match &mut self.get_mut(handle)?.data {
            CustomData::Int(f) => Ok(f),
            _ => Err(CustomError::WrongValueType { handle }),
        }
    }

    /// Float storage of an array-float property.
    pub fn floats(&self, handle: CustomHandle) -> Result<&HostField<f64>, CustomError> {
        match &self.get(handle)?.data {
            CustomData::Float(f) => Ok(f),
            _ => Err(CustomError::WrongValueType { handle }),
        }
    }

    /// Mutable float storage of an array-float property.
    pub fn floats_mut(
        &mut self,
        handle: CustomHandle,
    ) -> Result<&mut HostField<f64>, CustomError> {
        match &mut self.get_mut(handle)?.data {
            CustomData::Float(f) => Ok(f),
            _ => Err(CustomError::WrongValueType { handle }),
        }
    }

    /// Mirrored storage of a scalar-float property.
    pub fn mirrored(&self, handle: CustomHandle) -> Result<&DualField<f64>, CustomError> {
        match &self.get(handle)?.data {
            CustomData::MirroredFloat(f) => Ok(f),
            _ => Err(CustomError::WrongValueType { handle }),
        }
    }

    /// Mutable mirrored storage of a scalar-float property.
    pub fn mirrored_mut(
        &mut self,
        handle: CustomHandle,
    ) -> Result<&mut DualField<f64>, CustomError> {
        match &mut self.get_mut(handle)?.data {
            CustomData::MirroredFloat(f) => Ok(f),
            _ => Err(CustomError::WrongValueType { handle }),
        }
    }

    /// Handles of every live property, category by category.
    pub fn live_handles(&self) -> impl Iterator<Item = CustomHandle> + '_ {
        CustomCategory::ALL.into_iter().flat_map(move |category| {
            self.lists[category.index()]
                .iter()
                .enumerate()
                .filter(|(_, s)| matches!(s, Slot::Live(_)))
                .map(move |(i, _)| CustomHandle {
                    category,
                    index: i as u32,
                })
        })
    }

    fn live_mut(&mut self) -> impl Iterator<Item = &mut CustomEntry> {
        self.lists.iter_mut().flatten().filter_map(|s| match s {
            Slot::Live(e) => Some(e),
            Slot::Tombstone => None,
        })
    }

    /// Grow every live entry to `new_capacity` rows.
    ///
    /// Fails without touching anything if `new_capacity` is below the live
    /// row count or an overlapped transfer has not been joined.
    pub fn grow(&mut self, new_capacity: usize) -> Result<(), GrowError> {
        self.check_grow(new_capacity)?;
        for entry in self.live_mut() {
            entry.data.grow(new_capacity)?;
        }
        self.capacity = new_capacity;
        Ok(())
    }

    /// Whether [`grow`](Self::grow) to `new_capacity` would succeed: the
    /// live row count fits and no entry has a transfer in flight.
    pub fn check_grow(&self, new_capacity: usize) -> Result<(), GrowError> {
        if new_capacity < self.len {
            return Err(GrowError::CapacityBelowCount {
                requested: new_capacity,
                live: self.len,
            });
        }
        let busy = self.lists.iter().flatten().find_map(|s| match s {
            Slot::Live(e) if e.data.slot().in_flight() => Some(e.name()),
            _ => None,
        });
        match busy {
            Some(name) => Err(GrowError::TransferInFlight {
                field: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Set the live row count of every entry.
    pub fn set_len(&mut self, len: usize) -> Result<(), GrowError> {
        if len > self.capacity {
            return Err(GrowError::CapacityBelowCount {
                requested: self.capacity,
                live: len,
            });
        }
        for entry in self.live_mut() {
            entry.data.slot_mut().set_len(len)?;
        }
        self.len = len;
        Ok(())
    }

    /// Reorder every live entry.
    ///
    /// Mirrored entries move in `domain`; host-resident entries have a
    /// single copy, which always moves.
    pub fn permute(&mut self, permutation: &Permutation, domain: Domain) {
        for entry in self.live_mut() {
            entry.data.permute(permutation, domain);
        }
    }

    /// Wait for every in-flight transfer. Returns how many were joined.
    pub fn join(&mut self) -> usize {
        let mut joined = 0;
        for field in self.mirrored_entries() {
            if field.join() {
                joined += 1;
            }
        }
        joined
    }

    /// Bytes allocated per domain across all live entries.
    pub fn allocation_bytes(&self) -> usize {
        self.lists
            .iter()
            .flatten()
            .map(|s| match s {
                Slot::Live(e) => match &e.data {
                    CustomData::Int(f) => f.allocation_bytes(),
                    CustomData::Float(f) => f.allocation_bytes(),
                    CustomData::MirroredFloat(f) => f.allocation_bytes(),
                },
                Slot::Tombstone => 0,
            })
            .sum()
    }

    fn mirrored_entries(&mut self) -> impl Iterator<Item = &mut DualField<f64>> {
        self.lists[CustomCategory::ScalarFloat.index()]
            .iter_mut()
            .filter_map(|s| match s {
                Slot::Live(CustomEntry {
                    data: CustomData::MirroredFloat(f),
                    ..
                }) => Some(f),
                _ => None,
            })
    }

    fn check(mask: FieldMask) -> Result<(), SyncError> {
        let foreign = mask.difference(FieldMask::DVECTOR);
        if foreign.is_empty() {
            Ok(())
        } else {
            Err(SyncError::UnregisteredGroup { mask: foreign })
        }
    }
}

/// The registry answers for [`FieldMask::DVECTOR`]: every live scalar-float
/// property, synchronized together.
impl MirrorSet for CustomRegistry {
    fn registered(&self) -> FieldMask {
        FieldMask::DVECTOR
    }

    fn modify_raw(&mut self, domain: Domain, mask: FieldMask) -> Result<(), SyncError> {
        Self::check(mask)?;
        if mask.contains(FieldMask::DVECTOR) {
            for f in self.mirrored_entries() {
                f.modify(domain);
            }
        }
        Ok(())
    }

    fn sync_raw(
        &mut self,
        domain: Domain,
        mask: FieldMask,
        overlapped: bool,
    ) -> Result<SyncReport, SyncError> {
        Self::check(mask)?;
        let mut report = SyncReport::default();
        if mask.contains(FieldMask::DVECTOR) {
            for f in self.mirrored_entries() {
                let transfer = if overlapped {
                    f.begin_sync(domain)
                } else {
                    f.sync(domain)
                };
                if let Some(t) = transfer {
                    report.record(t, overlapped);
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirra_mirror::SyncPolicy;
    use proptest::prelude::*;

    #[test]
    fn handles_are_dense_per_category() {
        let mut r = CustomRegistry::new(4);
        let a = r.add("a", ValueType::Int, 0);
        let b = r.add("b", ValueType::Float, 3);
        let c = r.add("c", ValueType::Int, 0);
        assert_eq!((a.category, a.index), (CustomCategory::ScalarInt, 0));
        assert_eq!((b.category, b.index), (CustomCategory::ArrayFloat, 0));
        assert_eq!(c.index, 1);
        assert_eq!(r.get(b).unwrap().name(), "b");
        assert_eq!(r.floats(b).unwrap().cols(), 3);
    }

    #[test]
    fn remove_tombstones_and_never_reuses() {
        let mut r = CustomRegistry::new(4);
        let h = r.add("q2", ValueType::Float, 0);
        r.remove(h).unwrap();
        assert!(!r.is_live(h));
        assert_eq!(r.get(h).unwrap_err(), CustomError::Tombstoned { handle: h });
        assert_eq!(r.remove(h), Err(CustomError::Tombstoned { handle: h }));
        let next = r.add("q3", ValueType::Float, 0);
        assert!(next.index > h.index);
        assert_eq!(r.issued(CustomCategory::ScalarFloat), 2);
        assert_eq!(r.live_handles().collect::<Vec<_>>(), vec![next]);
    }

    #[test]
    fn unknown_and_mistyped_handles_are_rejected() {
        let mut r = CustomRegistry::new(4);
        let h = r.add("flag", ValueType::Int, 0);
        let bogus = CustomHandle {
            category: CustomCategory::ArrayInt,
            index: 0,
        };
        assert_eq!(
            r.remove(bogus),
            Err(CustomError::UnknownHandle { handle: bogus })
        );
        assert_eq!(
            r.floats(h).unwrap_err(),
            CustomError::WrongValueType { handle: h }
        );
        assert_eq!(
            r.mirrored(h).unwrap_err(),
            CustomError::WrongValueType { handle: h }
        );
    }

    #[test]
    fn grow_and_permute_live_entries() {
        let mut r = CustomRegistry::new(3);
        let h = r.add("id", ValueType::Int, 2);
        r.set_len(3).unwrap();
        r.ints_mut(h)
            .unwrap()
            .view_mut(Domain::Host)
            .copy_from_slice(&[1, 10, 2, 20, 3, 30]);
        r.grow(16).unwrap();
        assert_eq!(r.capacity(), 16);
        assert_eq!(r.ints(h).unwrap().capacity(), 16);

        let p = Permutation::from_new_to_old(vec![2, 0, 1]).unwrap();
        r.permute(&p, Domain::Device);
        assert_eq!(r.ints(h).unwrap().view(Domain::Host), &[3, 30, 1, 10, 2, 20]);
        assert!(r.grow(2).is_err());
    }

    #[test]
    fn new_entries_match_live_count() {
        let mut r = CustomRegistry::new(8);
        r.set_len(5).unwrap();
        let h = r.add("late", ValueType::Float, 4);
        assert_eq!(r.floats(h).unwrap().len(), 5);
        assert!(r.set_len(9).is_err());
    }

    #[test]
    fn scalar_floats_sync_under_dvector() {
        let mut r = CustomRegistry::new(4);
        let h = r.add("energy", ValueType::Float, 0);
        r.set_len(2).unwrap();
        r.mirrored_mut(h).unwrap().view_mut(Domain::Device)[1] = 2.5;

        let policy = SyncPolicy::Lazy;
        policy
            .mark_modified(&mut r, Domain::Device, FieldMask::DVECTOR)
            .unwrap();
        let report = policy
            .ensure_valid(&mut r, Domain::Host, FieldMask::DVECTOR)
            .unwrap();
        assert_eq!(report.transfers, 1);
        assert_eq!(r.mirrored(h).unwrap().view(Domain::Host), &[0.0, 2.5]);

        assert_eq!(
            policy.ensure_valid(&mut r, Domain::Host, FieldMask::X),
            Err(SyncError::UnregisteredGroup { mask: FieldMask::X })
        );
    }

    #[test]
    fn in_flight_entry_blocks_growth_of_every_entry() {
        let mut r = CustomRegistry::new(4);
        let ids = r.add("ids", ValueType::Int, 0);
        let a = r.add("a", ValueType::Float, 0);
        let b = r.add("b", ValueType::Float, 0);
        r.set_len(3).unwrap();

        let policy = SyncPolicy::Lazy;
        policy
            .mark_modified(&mut r, Domain::Device, FieldMask::DVECTOR)
            .unwrap();
        policy
            .overlapped_ensure_valid(&mut r, Domain::Host, FieldMask::DVECTOR)
            .unwrap();
        match r.grow(32) {
            Err(GrowError::TransferInFlight { field }) => assert_eq!(field, "a"),
            other => panic!("expected TransferInFlight, got {other:?}"),
        }
        assert_eq!(r.capacity(), 4);
        assert_eq!(r.ints(ids).unwrap().capacity(), 4);

        assert_eq!(r.join(), 2);
        assert_eq!(r.join(), 0);
        r.grow(32).unwrap();
        assert_eq!(r.mirrored(a).unwrap().capacity(), 32);
        assert_eq!(r.mirrored(b).unwrap().capacity(), 32);
    }

    proptest! {
        #[test]
        fn handles_strictly_increase(ops in prop::collection::vec((0u8..4, any::<bool>()), 1..60)) {
            let mut r = CustomRegistry::new(2);
            let mut last: [Option<u32>; 4] = [None; 4];
            for (kind, remove) in ops {
                let (ty, cols) = match kind {
                    0 => (ValueType::Int, 0),
                    1 => (ValueType::Float, 0),
                    2 => (ValueType::Int, 2),
                    _ => (ValueType::Float, 3),
                };
                let h = r.add("p", ty, cols);
                let slot = &mut last[h.category.index()];
                if let Some(prev) = *slot {
                    prop_assert!(h.index > prev);
                }
                *slot = Some(h.index);
                if remove {
                    r.remove(h).unwrap();
                    prop_assert!(!r.is_live(h));
                }
            }
        }
    }
}
