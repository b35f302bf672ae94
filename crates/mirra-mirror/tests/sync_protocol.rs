//! Model-checks the host/device sync protocol.
//!
//! Random sequences of writes and validity requests are applied to a
//! coordinator and to a two-flag reference model. After every request the
//! requested domain must hold the newest write, and the coordinator must
//! have transferred exactly when the model says the data was stale.

use mirra_core::{Domain, FieldMask};
use mirra_mirror::{DualField, FieldScope, SyncCoordinator, SyncPolicy};
use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
enum Op {
    Write(Domain, i64),
    Ensure(Domain),
    Overlapped(Domain),
}

fn domain() -> impl Strategy<Value = Domain> {
    prop_oneof![Just(Domain::Host), Just(Domain::Device)]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (domain(), any::<i64>()).prop_map(|(d, v)| Op::Write(d, v)),
        domain().prop_map(Op::Ensure),
        domain().prop_map(Op::Overlapped),
    ]
}

/// Reference: which domain holds an unseen write, and what each copy holds.
struct Model {
    modified: [bool; 2],
    value: [i64; 2],
}

impl Model {
    fn ensure(&mut self, d: Domain) -> bool {
        let other = d.other().index();
        if self.modified[other] {
            self.value[d.index()] = self.value[other];
            self.modified[other] = false;
            true
        } else {
            false
        }
    }
}

fn setup(policy: SyncPolicy) -> (SyncCoordinator, mirra_core::FieldId) {
    let mut c = SyncCoordinator::new(policy);
    let mut f = DualField::<i64>::new("tag", FieldScope::PerParticle, 1, 4);
    f.set_len(1).unwrap();
    let id = c.register(FieldMask::TAG, f).unwrap();
    (c, id)
}

proptest! {
    #[test]
    fn lazy_policy_matches_model(ops in prop::collection::vec(op(), 1..40)) {
        let (mut c, id) = setup(SyncPolicy::Lazy);
        let mut model = Model { modified: [false; 2], value: [0; 2] };

        for op in ops {
            match op {
                Op::Write(d, v) => {
                    // A write into a stale copy is only meaningful after a
                    // validity request, as the protocol requires.
                    c.ensure_valid(d, FieldMask::TAG).unwrap();
                    model.ensure(d);
                    c.field_mut::<i64>(id).unwrap().view_mut(d)[0] = v;
                    c.mark_modified(d, FieldMask::TAG).unwrap();
                    model.value[d.index()] = v;
                    model.modified[d.index()] = true;
                }
                Op::Ensure(d) => {
                    let report = c.ensure_valid(d, FieldMask::TAG).unwrap();
                    let expect = model.ensure(d);
                    prop_assert_eq!(report.transfers, usize::from(expect));
                    prop_assert_eq!(c.field::<i64>(id).unwrap().view(d)[0], model.value[d.index()]);
                }
                Op::Overlapped(d) => {
                    let report = c.overlapped_ensure_valid(d, FieldMask::TAG).unwrap();
                    let expect = model.ensure(d);
                    prop_assert_eq!(report.overlapped, usize::from(expect));
                    c.join(FieldMask::TAG).unwrap();
                    prop_assert_eq!(c.field::<i64>(id).unwrap().view(d)[0], model.value[d.index()]);
                }
            }
        }
    }

    #[test]
    fn auto_mirror_host_never_stale(ops in prop::collection::vec(op(), 1..40)) {
        let (mut c, id) = setup(SyncPolicy::AutoMirror);
        let mut last = 0i64;

        for op in ops {
            match op {
                Op::Write(d, v) => {
                    c.ensure_valid(d, FieldMask::TAG).unwrap();
                    c.field_mut::<i64>(id).unwrap().view_mut(d)[0] = v;
                    c.mark_modified(d, FieldMask::TAG).unwrap();
                    last = v;
                }
                Op::Ensure(d) => {
                    c.ensure_valid(d, FieldMask::TAG).unwrap();
                }
                Op::Overlapped(d) => {
                    c.overlapped_ensure_valid(d, FieldMask::TAG).unwrap();
                    c.join_all();
                }
            }
            // Host reads need no request under auto-mirror.
            let f = c.field::<i64>(id).unwrap();
            prop_assert_eq!(f.view(Domain::Host)[0], last);
            prop_assert!(!f.is_modified(Domain::Device));
        }
    }
}

#[test]
fn device_round_trip_moves_data_twice() {
    let (mut c, id) = setup(SyncPolicy::Lazy);
    c.field_mut::<i64>(id).unwrap().view_mut(Domain::Host)[0] = 11;
    c.mark_modified(Domain::Host, FieldMask::TAG).unwrap();

    c.ensure_valid(Domain::Device, FieldMask::TAG).unwrap();
    c.field_mut::<i64>(id).unwrap().view_mut(Domain::Device)[0] += 1;
    c.mark_modified(Domain::Device, FieldMask::TAG).unwrap();
    c.ensure_valid(Domain::Host, FieldMask::TAG).unwrap();

    assert_eq!(c.field::<i64>(id).unwrap().view(Domain::Host)[0], 12);
    let stats = c.stats();
    assert_eq!(stats.to_device, 1);
    assert_eq!(stats.to_host, 1);
    assert_eq!(stats.bytes_to_host, 4 * 8);
}

#[test]
fn growth_keeps_both_copies_consistent() {
    let (mut c, id) = setup(SyncPolicy::Lazy);
    c.field_mut::<i64>(id).unwrap().view_mut(Domain::Device)[0] = -5;
    c.mark_modified(Domain::Device, FieldMask::TAG).unwrap();
    c.grow(FieldMask::TAG, 64).unwrap();

    let f = c.field::<i64>(id).unwrap();
    assert_eq!(f.capacity(), 64);
    assert_eq!(f.view(Domain::Host), &[-5]);
    assert_eq!(f.view(Domain::Device), &[-5]);
    assert!(!f.is_modified(Domain::Host));
    assert!(!f.is_modified(Domain::Device));
    let report = c.ensure_valid(Domain::Host, FieldMask::TAG).unwrap();
    assert_eq!(report.transfers, 0);
}
