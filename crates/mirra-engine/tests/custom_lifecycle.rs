//! Integration test: custom properties over a store's lifetime.
//!
//! Handles stay dense and are never reissued, removed properties drop out
//! of growth and sorting, and their transfer history stays in the totals.

mod common;

use common::{config, populate};
use mirra_core::{CustomCategory, CustomError, Domain, FieldMask, StepIndex};
use mirra_custom::ValueType;
use mirra_engine::{Layout, ParticleStore, SortOutcome, StoreError};
use mirra_mirror::SyncPolicy;
use mirra_sort::OrthoBox;
use mirra_test_utils::random_positions;

fn store(n: usize) -> ParticleStore {
    let mut store = ParticleStore::new(config(Layout::atomic(), SyncPolicy::Lazy, 1.0)).unwrap();
    populate(&mut store, &random_positions(29, n, [0.0; 3], [4.0; 3]), 0);
    store
}

#[test]
fn handles_are_dense_per_category() {
    let mut s = store(4);
    let a = s.add_custom("a", ValueType::Int, 0).unwrap();
    let b = s.add_custom("b", ValueType::Float, 0).unwrap();
    let c = s.add_custom("c", ValueType::Int, 0).unwrap();
    let d = s.add_custom("d", ValueType::Float, 4).unwrap();
    assert_eq!((a.category, a.index), (CustomCategory::ScalarInt, 0));
    assert_eq!((b.category, b.index), (CustomCategory::ScalarFloat, 0));
    assert_eq!((c.category, c.index), (CustomCategory::ScalarInt, 1));
    assert_eq!((d.category, d.index), (CustomCategory::ArrayFloat, 0));
    assert_eq!(s.custom().issued(CustomCategory::ScalarInt), 2);
    assert_eq!(s.custom().issued(CustomCategory::ArrayInt), 0);
}

#[test]
fn removed_handles_are_never_reissued() {
    let mut s = store(4);
    let first = s.add_custom("first", ValueType::Int, 3).unwrap();
    s.remove_custom(first).unwrap();
    let second = s.add_custom("first", ValueType::Int, 3).unwrap();
    assert!(second.index > first.index);

    match s.custom().ints(first) {
        Err(CustomError::Tombstoned { handle }) => assert_eq!(handle, first),
        other => panic!("expected Tombstoned, got {other:?}"),
    }
    match s.remove_custom(first) {
        Err(StoreError::Custom(CustomError::Tombstoned { .. })) => {}
        other => panic!("expected Tombstoned, got {other:?}"),
    }
    assert!(s.custom().is_live(second));
    assert!(!s.custom().is_live(first));
    let m = s.metrics();
    assert_eq!((m.custom_added, m.custom_removed), (2, 1));
}

#[test]
fn unknown_handles_are_rejected() {
    let mut s = store(4);
    let h = s.add_custom("h", ValueType::Float, 2).unwrap();
    let bogus = mirra_core::CustomHandle {
        index: h.index + 5,
        ..h
    };
    assert!(matches!(
        s.custom_floats_mut(bogus),
        Err(StoreError::Custom(CustomError::UnknownHandle { .. }))
    ));
}

#[test]
fn growth_preserves_custom_rows_and_skips_tombstones() {
    let mut s = store(6);
    let kept = s.add_custom("kept", ValueType::Int, 2).unwrap();
    let gone = s.add_custom("gone", ValueType::Float, 0).unwrap();
    for (i, v) in s
        .custom_ints_mut(kept)
        .unwrap()
        .view_mut(Domain::Host)
        .iter_mut()
        .enumerate()
    {
        *v = 10 + i as i32;
    }
    s.remove_custom(gone).unwrap();
    let before = s.allocation_bytes();

    s.grow(20).unwrap();
    let f = s.custom().ints(kept).unwrap();
    assert_eq!(f.len(), 6);
    assert_eq!(f.view(Domain::Host), &(10..22).collect::<Vec<i32>>()[..]);
    assert!(s.allocation_bytes() > before);

    // Live rows follow set_counts into custom storage.
    s.set_counts(15, 0).unwrap();
    assert_eq!(s.custom().ints(kept).unwrap().len(), 15);
}

#[test]
fn removed_scalar_float_keeps_its_transfer_history() {
    let mut s = store(5);
    let e = s.add_custom("energy", ValueType::Float, 0).unwrap();
    let report = s.ensure_valid(Domain::Host, FieldMask::DVECTOR).unwrap();
    assert_eq!(report.transfers, 1);
    let before = s.metrics().transfers();

    s.remove_custom(e).unwrap();
    assert_eq!(s.metrics().transfers(), before);
    // With nothing live, the custom group has nothing to move.
    let report = s.mark_modified(Domain::Device, FieldMask::DVECTOR).unwrap();
    assert_eq!(report.transfers, 0);
    let report = s.ensure_valid(Domain::Host, FieldMask::DVECTOR).unwrap();
    assert_eq!(report.transfers, 0);
}

#[test]
fn sorting_skips_tombstones() {
    let mut s = store(24);
    let gone = s.add_custom("gone", ValueType::Int, 0).unwrap();
    let kept = s.add_custom("kept", ValueType::Int, 0).unwrap();
    for (i, v) in s
        .custom_ints_mut(kept)
        .unwrap()
        .view_mut(Domain::Host)
        .iter_mut()
        .enumerate()
    {
        *v = i as i32;
    }
    s.remove_custom(gone).unwrap();

    let permutation = match s.sort(StepIndex(0), &OrthoBox::cube(4.0)).unwrap() {
        SortOutcome::Sorted { permutation, .. } => permutation,
        other => panic!("expected a sort, got {other:?}"),
    };
    let after = s.custom().ints(kept).unwrap().view(Domain::Host);
    let expected: Vec<i32> = permutation.as_slice().iter().map(|&i| i as i32).collect();
    assert_eq!(after, &expected[..]);
}
