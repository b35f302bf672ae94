//! Benchmark profiles for the mirra particle store.
//!
//! - [`reference_store`]: 10K particles in a 20-unit cube with bonds and
//!   special lists, unit bins
//! - [`sheared_box`]: the triclinic cell used by the sheared sort benches

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use mirra_core::{Domain, FieldMask};
use mirra_engine::{Layout, ParticleStore, SortConfig, StoreConfig, StoreError};
use mirra_mirror::SyncPolicy;
use mirra_sort::{BinSizing, TriclinicBox};
use mirra_test_utils::random_positions;

/// Edge length of the reference cube.
pub const BOX_LEN: f64 = 20.0;

/// Build a store holding `n` local particles spread uniformly over a
/// [`BOX_LEN`] cube, positions valid on the host only.
pub fn reference_store(
    n: usize,
    seed: u64,
    policy: SyncPolicy,
) -> Result<ParticleStore, StoreError> {
    let config = StoreConfig {
        layout: Layout::full(4, 12),
        policy,
        sort: SortConfig {
            frequency: 1,
            sizing: BinSizing::Explicit(1.0),
            ..SortConfig::default()
        },
        initial_capacity: n,
        atom_types: 2,
    };
    let mut store = ParticleStore::new(config)?;
    store.set_counts(n, 0)?;
    let positions = random_positions(seed, n, [0.0; 3], [BOX_LEN; 3]);
    let x = store.ids().x;
    store
        .field_mut::<f64>(x)?
        .view_mut(Domain::Host)
        .copy_from_slice(&positions);
    store.mark_modified(Domain::Host, FieldMask::X)?;
    Ok(store)
}

/// A [`BOX_LEN`] cell tilted in all three planes.
pub fn sheared_box() -> TriclinicBox {
    TriclinicBox::new([0.0; 3], [BOX_LEN; 3], [4.0, 2.0, -3.0])
}
