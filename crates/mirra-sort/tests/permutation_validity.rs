//! End-to-end permutation properties over random particle clouds.

use mirra_core::permutation::is_bijection;
use mirra_core::StepIndex;
use mirra_sort::{
    BinSizing, BinSorter, Geometry, OrthoBox, SortMode, SortPlan, SorterConfig, TriclinicBox,
};
use proptest::prelude::*;

fn config(edge: f64) -> SorterConfig {
    SorterConfig {
        frequency: 1,
        sizing: BinSizing::Explicit(edge),
        max_bins: 1 << 16,
    }
}

fn check(
    geometry: &dyn Geometry,
    edge: f64,
    frac: &[(f64, f64, f64)],
    to_cart: impl Fn([f64; 3]) -> [f64; 3],
) -> Result<(), TestCaseError> {
    let positions: Vec<f64> = frac
        .iter()
        .flat_map(|&(a, b, c)| to_cart([a, b, c]))
        .collect();
    let n = frac.len();
    let mut sorter = BinSorter::new(config(edge), SortMode::Device);

    match sorter.prepare(StepIndex(0), geometry, n).unwrap() {
        SortPlan::Skipped => {
            prop_assert_eq!(sorter.grid().map(|g| g.bin_count()), Some(1));
        }
        SortPlan::Ready => {
            let p = sorter.permutation(geometry, &positions, n).unwrap();
            prop_assert_eq!(p.len(), n);
            prop_assert!(is_bijection(p.as_slice()));
            let grid = sorter.grid().unwrap();
            let bins = grid.assign(geometry, &positions, n).unwrap();
            let reordered: Vec<usize> = p.as_slice().iter().map(|&old| bins[old]).collect();
            prop_assert!(reordered.windows(2).all(|w| w[0] <= w[1]));
            sorter.finish();
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn ortho_permutation_is_valid(
        frac in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0), 0..300),
        edge in 0.5f64..6.0,
    ) {
        let g = OrthoBox::new([-2.0, 0.0, 5.0], [8.0, 6.0, 9.0]);
        check(&g, edge, &frac, |f| [
            -2.0 + 10.0 * f[0],
            6.0 * f[1],
            5.0 + 4.0 * f[2],
        ])?;
    }

    #[test]
    fn sheared_permutation_is_valid(
        frac in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0), 0..300),
        edge in 0.5f64..6.0,
        tilt in (-4.0f64..4.0, -3.0f64..3.0, -2.0f64..2.0),
    ) {
        let g = TriclinicBox::new([0.0; 3], [10.0, 8.0, 6.0], [tilt.0, tilt.1, tilt.2]);
        check(&g, edge, &frac, |f| g.to_cartesian(f))?;
    }
}

#[test]
fn sheared_cell_bins_by_fractional_position() {
    let g = TriclinicBox::new([0.0; 3], [4.0, 4.0, 4.0], [4.0, 0.0, 0.0]);
    // Particle 0 sits high along b, particle 1 far along a but low along b.
    let positions = [
        g.to_cartesian([0.1, 0.95, 0.1]),
        g.to_cartesian([0.9, 0.05, 0.1]),
    ]
    .concat();

    let mut sorter = BinSorter::new(config(1.0), SortMode::Device);
    assert_eq!(sorter.prepare(StepIndex(0), &g, 2).unwrap(), SortPlan::Ready);
    let p = sorter.permutation(&g, &positions, 2).unwrap();
    let grid = sorter.grid().unwrap();
    assert_eq!(grid.dims(), [2, 4, 4]);
    assert_eq!(grid.assign(&g, &positions, 2).unwrap(), vec![6, 1]);
    assert_eq!(p.as_slice(), &[1, 0]);
}
