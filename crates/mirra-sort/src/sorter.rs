//! The bin sorter: grid lifecycle, cadence and sort-mode ownership.
//!
//! [`BinSorter`] computes permutations; it never touches particle data.
//! The store drives it:
//!
//! 1. [`check_extensions`](BinSorter::check_extensions) settles the mode.
//! 2. [`prepare`](BinSorter::prepare) reschedules and revalidates bins.
//! 3. [`permutation`](BinSorter::permutation) bins a valid position buffer.
//! 4. The store applies the permutation to every field and extension owner.
//! 5. [`finish`](BinSorter::finish) closes the sort.

use mirra_core::{ExtensionOwner, Permutation, SortError, StepIndex};

use crate::geometry::Geometry;
use crate::grid::{bin_permutation, BinGrid, BinSizing};
use crate::mode::{SortMode, SortState};

/// Default cap on the number of bins, matching the largest count a 32-bit
/// signed bin id can address.
pub const DEFAULT_MAX_BINS: usize = i32::MAX as usize;

/// Sorter settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SorterConfig {
    /// Steps between cadence sorts. Zero disables cadence sorting; explicit
    /// sorts still run.
    pub frequency: u64,
    /// How the bin edge is chosen.
    pub sizing: BinSizing,
    /// Largest grid allowed.
    pub max_bins: usize,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            frequency: 1000,
            sizing: BinSizing::default(),
            max_bins: DEFAULT_MAX_BINS,
        }
    }
}

/// Outcome of [`BinSorter::prepare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortPlan {
    /// The grid has a single bin; there is nothing to gain from sorting.
    Skipped,
    /// Bins are ready; call [`BinSorter::permutation`] with valid positions.
    Ready,
}

/// Computes locality permutations and decides when and where to sort.
#[derive(Debug)]
pub struct BinSorter {
    config: SorterConfig,
    mode: SortMode,
    state: SortState,
    grid: Option<BinGrid>,
    next_sort: StepIndex,
    stale_after_sort: bool,
}

impl BinSorter {
    /// Create a sorter starting in `mode`. Bins start stale.
    pub fn new(config: SorterConfig, mode: SortMode) -> Self {
        let next_sort = if config.frequency > 0 {
            StepIndex(0).next_multiple(config.frequency)
        } else {
            StepIndex(u64::MAX)
        };
        Self {
            config,
            mode,
            state: SortState::BinsStale,
            grid: None,
            next_sort,
            stale_after_sort: false,
        }
    }

    /// Current settings.
    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    /// Where sorts currently run.
    pub fn mode(&self) -> SortMode {
        self.mode
    }

    /// Grid lifecycle state.
    pub fn state(&self) -> SortState {
        self.state
    }

    /// The grid from the last recompute, if any.
    pub fn grid(&self) -> Option<&BinGrid> {
        self.grid.as_ref()
    }

    /// First step at which a cadence sort is due.
    pub fn next_sort(&self) -> StepIndex {
        self.next_sort
    }

    /// Record that the box changed shape or size.
    ///
    /// While a sort is in progress the grid it uses stays valid; the
    /// change takes effect at [`finish`](Self::finish).
    pub fn geometry_changed(&mut self) {
        match self.state {
            SortState::Sorting => self.stale_after_sort = true,
            _ => self.state = SortState::BinsStale,
        }
    }

    /// Whether a cadence sort should run at `step`.
    pub fn is_due(&self, step: StepIndex) -> bool {
        self.config.frequency > 0 && step >= self.next_sort
    }

    /// Set the next cadence sort to the first multiple of the frequency
    /// after `step`.
    pub fn schedule(&mut self, step: StepIndex) {
        if self.config.frequency > 0 {
            self.next_sort = step.next_multiple(self.config.frequency);
        }
    }

    /// Query every owner for device relocation support.
    ///
    /// If the sorter is still in device mode and any owner lacks support,
    /// downgrades to host mode and logs one warning naming that owner.
    /// Returns `true` only for the call that downgraded.
    pub fn check_extensions<'a, I>(&mut self, owners: I) -> bool
    where
        I: IntoIterator<Item = &'a dyn ExtensionOwner>,
    {
        if self.mode != SortMode::Device {
            return false;
        }
        let Some(owner) = owners
            .into_iter()
            .find(|o| !o.supports_device_relocation())
        else {
            return false;
        };
        let changed = self.mode.downgrade();
        if changed {
            tracing::warn!(
                owner = owner.name(),
                "extension owner cannot relocate on the device; \
                 switching to host sorting for the rest of the run"
            );
        }
        changed
    }

    /// Start a sort at `step` for `local` particles.
    ///
    /// Reschedules the next cadence sort and recomputes stale bins. A
    /// single-bin grid returns [`SortPlan::Skipped`] and leaves the sorter
    /// idle; no position buffer is needed in that case.
    pub fn prepare(
        &mut self,
        step: StepIndex,
        geometry: &dyn Geometry,
        local: usize,
    ) -> Result<SortPlan, SortError> {
        self.schedule(step);

        let grid = match self.grid.take() {
            Some(g) if self.state != SortState::BinsStale => g,
            _ => {
                let g = BinGrid::from_geometry(
                    geometry,
                    self.config.sizing,
                    local,
                    self.config.max_bins,
                )?;
                let [nx, ny, nz] = g.dims();
                tracing::debug!(nx, ny, nz, frame = ?g.frame(), "sort bins recomputed");
                g
            }
        };
        let grid = self.grid.insert(grid);

        if grid.bin_count() == 1 {
            self.state = SortState::Idle;
            tracing::debug!(%step, "sort skipped: single bin");
            return Ok(SortPlan::Skipped);
        }
        self.state = SortState::BinsReady;
        Ok(SortPlan::Ready)
    }

    /// Bin the first `local` rows of `positions` and return the permutation
    /// that groups them by ascending bin.
    ///
    /// # Panics
    ///
    /// Panics unless the last [`prepare`](Self::prepare) returned
    /// [`SortPlan::Ready`].
    pub fn permutation(
        &mut self,
        geometry: &dyn Geometry,
        positions: &[f64],
        local: usize,
    ) -> Result<Permutation, SortError> {
        assert_eq!(
            self.state,
            SortState::BinsReady,
            "permutation requested without a ready bin grid"
        );
        let grid = match &self.grid {
            Some(g) => g,
            None => unreachable!("BinsReady implies a grid"),
        };
        let bins = grid.assign(geometry, positions, local)?;
        let permutation = bin_permutation(&bins, grid.bin_count());
        self.state = SortState::Sorting;
        Ok(permutation)
    }

    /// Mark the permutation from [`permutation`](Self::permutation) as applied.
    pub fn finish(&mut self) {
        self.state = if std::mem::take(&mut self.stale_after_sort) {
            SortState::BinsStale
        } else {
            SortState::Idle
        };
    }
}
