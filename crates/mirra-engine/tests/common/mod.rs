//! Shared setup for the store integration tests.

#![allow(dead_code)]

use mirra_core::{Domain, FieldId, FieldMask};
use mirra_engine::{Layout, ParticleStore, SortConfig, StoreConfig};
use mirra_mirror::{FieldScope, SyncPolicy};
use mirra_sort::BinSizing;

/// Every optional group switched on.
pub fn everything_layout() -> Layout {
    Layout {
        sphere: true,
        angmom: true,
        angles: true,
        max_angles_per_particle: 2,
        dihedrals: true,
        max_dihedrals_per_particle: 2,
        impropers: true,
        max_impropers_per_particle: 1,
        ..Layout::full(3, 6)
    }
}

pub fn config(layout: Layout, policy: SyncPolicy, edge: f64) -> StoreConfig {
    StoreConfig {
        layout,
        policy,
        sort: SortConfig {
            frequency: 100,
            sizing: BinSizing::Explicit(edge),
            ..SortConfig::default()
        },
        initial_capacity: 4,
        atom_types: 2,
    }
}

/// Ids of every per-particle core field.
pub fn per_particle_fields(store: &ParticleStore) -> Vec<FieldId> {
    (0..store.fields().field_count())
        .map(|i| FieldId(i as u32))
        .filter(|&id| store.fields().erased(id).unwrap().scope() == FieldScope::PerParticle)
        .collect()
}

/// Core per-particle groups, everything but the mass table.
pub fn core_groups(store: &ParticleStore) -> FieldMask {
    store
        .fields()
        .registered_groups()
        .difference(FieldMask::TYPE_MASS)
}

/// Fill `local + ghost` particles on the host: positions from `positions`,
/// every other core field with values unique to its field and row. Marks
/// everything host-modified.
pub fn populate(store: &mut ParticleStore, positions: &[f64], ghost: usize) {
    let n = positions.len() / 3;
    if store.capacity() < n {
        store.grow(n).unwrap();
    }
    store.set_counts(n - ghost, ghost).unwrap();
    for (k, id) in per_particle_fields(store).into_iter().enumerate() {
        let base = (k as i64 + 1) * 100_000;
        let ty = store.fields().erased(id).unwrap().element_type();
        match ty {
            "f64" => {
                let f = store.field_mut::<f64>(id).unwrap();
                for (i, v) in f.view_mut(Domain::Host).iter_mut().enumerate() {
                    *v = (base + i as i64) as f64 + 0.25;
                }
            }
            "i64" => {
                let f = store.field_mut::<i64>(id).unwrap();
                for (i, v) in f.view_mut(Domain::Host).iter_mut().enumerate() {
                    *v = base + i as i64;
                }
            }
            "i32" => {
                let f = store.field_mut::<i32>(id).unwrap();
                for (i, v) in f.view_mut(Domain::Host).iter_mut().enumerate() {
                    *v = (base + i as i64) as i32;
                }
            }
            other => panic!("unexpected element type {other}"),
        }
    }
    let x = store.ids().x;
    store
        .field_mut::<f64>(x)
        .unwrap()
        .view_mut(Domain::Host)
        .copy_from_slice(positions);
    let groups = core_groups(store);
    store.mark_modified(Domain::Host, groups).unwrap();
}

/// Host rows of a core field as raw bits, so fields of every element type
/// compare the same way.
pub fn host_bits(store: &ParticleStore, id: FieldId) -> Vec<u64> {
    match store.fields().erased(id).unwrap().element_type() {
        "f64" => store
            .field::<f64>(id)
            .unwrap()
            .view(Domain::Host)
            .iter()
            .map(|v| v.to_bits())
            .collect(),
        "i64" => store
            .field::<i64>(id)
            .unwrap()
            .view(Domain::Host)
            .iter()
            .map(|&v| v as u64)
            .collect(),
        "i32" => store
            .field::<i32>(id)
            .unwrap()
            .view(Domain::Host)
            .iter()
            .map(|&v| v as u32 as u64)
            .collect(),
        other => panic!("unexpected element type {other}"),
    }
}

/// Check that rows `0..perm.len()` of `after` are rows `perm[j]` of
/// `before` and that every later row is unchanged.
pub fn assert_permuted<T: PartialEq + std::fmt::Debug>(
    name: &str,
    before: &[T],
    after: &[T],
    cols: usize,
    perm: &[usize],
) {
    assert_eq!(before.len(), after.len(), "{name}: length changed");
    for (j, &old) in perm.iter().enumerate() {
        assert_eq!(
            &after[j * cols..(j + 1) * cols],
            &before[old * cols..(old + 1) * cols],
            "{name}: row {j} should hold old row {old}"
        );
    }
    let tail = perm.len() * cols;
    assert_eq!(&after[tail..], &before[tail..], "{name}: ghost rows moved");
}
