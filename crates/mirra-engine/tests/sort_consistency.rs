//! Integration test: a sort moves every per-particle buffer together.
//!
//! Core fields, all four kinds of custom property and extension-owned
//! arrays must all be relocated by the one permutation the sorter
//! produced, local rows only, with ghost rows left in place.

mod common;

use common::{assert_permuted, config, everything_layout, host_bits, per_particle_fields, populate};
use mirra_core::{Domain, FieldMask, StepIndex};
use mirra_custom::ValueType;
use mirra_engine::{Layout, ParticleStore, SortOutcome};
use mirra_mirror::SyncPolicy;
use mirra_sort::{Geometry, OrthoBox, SortMode, TriclinicBox};
use mirra_test_utils::{random_positions, RecordingOwner};
use proptest::prelude::*;

// ── The four-particle scenario ───────────────────────────────────────

#[test]
fn four_particles_group_by_bin() {
    let mut store = ParticleStore::new(config(
        Layout::atomic(),
        SyncPolicy::Lazy,
        1.0,
    ))
    .unwrap();
    // Two bins along x: particles 1 and 3 in bin 0, 0 and 2 in bin 1.
    let positions = [
        1.5, 0.5, 0.5, //
        0.5, 0.5, 0.5, //
        1.2, 0.5, 0.5, //
        0.2, 0.5, 0.5,
    ];
    populate(&mut store, &positions, 0);
    let geom = OrthoBox::new([0.0; 3], [2.0, 1.0, 1.0]);

    let (mode, permutation) = match store.sort(StepIndex(0), &geom).unwrap() {
        SortOutcome::Sorted { mode, permutation } => (mode, permutation),
        other => panic!("expected a sort, got {other:?}"),
    };
    assert_eq!(mode, SortMode::Device);
    assert_eq!(store.sorter().grid().unwrap().bin_count(), 2);

    let p = permutation.as_slice();
    let mut first = [p[0], p[1]];
    first.sort_unstable();
    let mut second = [p[2], p[3]];
    second.sort_unstable();
    assert_eq!(first, [1, 3]);
    assert_eq!(second, [0, 2]);

    store.ensure_valid(Domain::Host, FieldMask::X).unwrap();
    let x = store.field::<f64>(store.ids().x).unwrap();
    let bins = store
        .sorter()
        .grid()
        .unwrap()
        .assign(&geom, x.view(Domain::Host), 4)
        .unwrap();
    assert_eq!(bins, vec![0, 0, 1, 1]);
}

// ── Cross-field consistency ──────────────────────────────────────────

fn check_sort(
    geometry: &dyn Geometry,
    positions: &[f64],
    ghost: usize,
    policy: SyncPolicy,
) -> Result<(), TestCaseError> {
    let mut store = ParticleStore::new(config(everything_layout(), policy, 0.9)).unwrap();
    populate(&mut store, positions, ghost);
    let n = positions.len() / 3;
    let local = n - ghost;

    let energy = store.add_custom("energy", ValueType::Float, 0).unwrap();
    let flags = store.add_custom("flags", ValueType::Int, 0).unwrap();
    let hist = store.add_custom("history", ValueType::Int, 2).unwrap();
    let accum = store.add_custom("accum", ValueType::Float, 3).unwrap();
    for (i, v) in store
        .custom_mirrored_mut(energy)
        .unwrap()
        .view_mut(Domain::Device)
        .iter_mut()
        .enumerate()
    {
        *v = i as f64 * 1.5;
    }
    store.mark_modified(Domain::Device, FieldMask::DVECTOR).unwrap();
    let flag_rows = store.custom_ints_mut(flags).unwrap().view_mut(Domain::Host);
    for (i, v) in flag_rows.iter_mut().enumerate() {
        *v = 7 * i as i32;
    }
    let hist_rows = store.custom_ints_mut(hist).unwrap().view_mut(Domain::Host);
    for (i, v) in hist_rows.iter_mut().enumerate() {
        *v = -(i as i32);
    }
    for (i, v) in store
        .custom_floats_mut(accum)
        .unwrap()
        .view_mut(Domain::Host)
        .iter_mut()
        .enumerate()
    {
        *v = i as f64 + 0.5;
    }

    let (owner, seen) = RecordingOwner::capable("bond-history", (0..n as i64).collect());
    store.register_extension(Box::new(owner));

    let topology = FieldMask::BOND | FieldMask::ANGLE | FieldMask::DIHEDRAL | FieldMask::IMPROPER;
    prop_assert!(store.registered_groups().contains(topology));
    let fields = per_particle_fields(&store);
    let before: Vec<Vec<u64>> = fields.iter().map(|&id| host_bits(&store, id)).collect();
    store.ensure_valid(Domain::Host, FieldMask::DVECTOR).unwrap();
    let energy_before = store.custom().mirrored(energy).unwrap().view(Domain::Host).to_vec();
    let flags_before = store.custom().ints(flags).unwrap().view(Domain::Host).to_vec();
    let hist_before = store.custom().ints(hist).unwrap().view(Domain::Host).to_vec();
    let accum_before = store.custom().floats(accum).unwrap().view(Domain::Host).to_vec();
    let owner_before = seen.values();

    let outcome = store.sort(StepIndex(0), geometry).unwrap();
    let permutation = match outcome {
        SortOutcome::Sorted { permutation, .. } => permutation,
        SortOutcome::Skipped => return Ok(()),
        SortOutcome::NotDue => panic!("explicit sort reported NotDue"),
    };
    prop_assert_eq!(permutation.len(), local);
    let perm = permutation.as_slice();

    let all = store.registered_groups().difference(FieldMask::TYPE_MASS);
    store.ensure_valid(Domain::Host, all).unwrap();
    for (k, &id) in fields.iter().enumerate() {
        let slot = store.fields().erased(id).unwrap();
        let (name, cols) = (slot.name().to_string(), slot.cols());
        assert_permuted(&name, &before[k], &host_bits(&store, id), cols, perm);
    }
    assert_permuted(
        "energy",
        &energy_before,
        store.custom().mirrored(energy).unwrap().view(Domain::Host),
        1,
        perm,
    );
    assert_permuted(
        "flags",
        &flags_before,
        store.custom().ints(flags).unwrap().view(Domain::Host),
        1,
        perm,
    );
    assert_permuted(
        "history",
        &hist_before,
        store.custom().ints(hist).unwrap().view(Domain::Host),
        2,
        perm,
    );
    assert_permuted(
        "accum",
        &accum_before,
        store.custom().floats(accum).unwrap().view(Domain::Host),
        3,
        perm,
    );
    assert_permuted("bond-history", &owner_before, &seen.values(), 1, perm);
    prop_assert_eq!(seen.last_permutation(), Some(permutation.clone()));
    prop_assert_eq!(seen.relocations(), vec![Domain::Device]);

    // Sorted positions land in non-decreasing bins.
    let x = store.field::<f64>(store.ids().x).unwrap();
    let bins = store
        .sorter()
        .grid()
        .unwrap()
        .assign(geometry, x.view(Domain::Host), local)
        .unwrap();
    prop_assert!(bins.windows(2).all(|w| w[0] <= w[1]), "bins {:?}", bins);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn orthogonal_sort_moves_everything_together(
        seed in any::<u64>(),
        local in 2usize..60,
        ghost in 0usize..6,
        auto_mirror in any::<bool>(),
    ) {
        let geom = OrthoBox::cube(4.0);
        let positions = random_positions(seed, local + ghost, [0.0; 3], [4.0; 3]);
        let policy = if auto_mirror { SyncPolicy::AutoMirror } else { SyncPolicy::Lazy };
        check_sort(&geom, &positions, ghost, policy)?;
    }

    #[test]
    fn sheared_sort_moves_everything_together(
        seed in any::<u64>(),
        local in 2usize..60,
        ghost in 0usize..6,
    ) {
        let geom = TriclinicBox::new([0.0; 3], [4.0, 3.0, 3.0], [1.5, 0.5, -0.75]);
        let frac = random_positions(seed, local + ghost, [0.0; 3], [1.0; 3]);
        let positions: Vec<f64> = frac
            .chunks_exact(3)
            .flat_map(|f| geom.to_cartesian([f[0], f[1], f[2]]))
            .collect();
        check_sort(&geom, &positions, ghost, SyncPolicy::Lazy)?;
    }
}

// ── Skips and rescheduling ───────────────────────────────────────────

#[test]
fn single_bin_sort_moves_nothing() {
    let mut store = ParticleStore::new(config(
        Layout::atomic(),
        SyncPolicy::Lazy,
        10.0,
    ))
    .unwrap();
    let positions = random_positions(1, 8, [0.0; 3], [2.0; 3]);
    populate(&mut store, &positions, 0);
    let (owner, seen) = RecordingOwner::capable("o", (0..8).collect());
    store.register_extension(Box::new(owner));
    let before = store.metrics();

    let outcome = store.sort(StepIndex(250), &OrthoBox::cube(2.0)).unwrap();
    assert_eq!(outcome, SortOutcome::Skipped);
    assert!(seen.relocations().is_empty());
    let after = store.metrics();
    assert_eq!(after.sorts_skipped, 1);
    assert_eq!(after.sorts, 0);
    // No position sync for a skipped sort.
    assert_eq!(after.transfers(), before.transfers());
    assert_eq!(store.next_sort(), StepIndex(300));
}

#[test]
fn geometry_change_rebuilds_bins() {
    let mut store = ParticleStore::new(config(
        Layout::atomic(),
        SyncPolicy::Lazy,
        1.0,
    ))
    .unwrap();
    let positions = random_positions(5, 20, [0.0; 3], [2.0; 3]);
    populate(&mut store, &positions, 0);

    store.sort(StepIndex(0), &OrthoBox::cube(2.0)).unwrap();
    assert_eq!(store.sorter().grid().unwrap().dims(), [2, 2, 2]);

    // Without a geometry change the old grid is reused.
    store.sort(StepIndex(1), &OrthoBox::cube(3.0)).unwrap();
    assert_eq!(store.sorter().grid().unwrap().dims(), [2, 2, 2]);

    store.geometry_changed();
    store.sort(StepIndex(2), &OrthoBox::cube(3.0)).unwrap();
    assert_eq!(store.sorter().grid().unwrap().dims(), [3, 3, 3]);
}
