//! Store configuration, validation, and error types.
//!
//! [`StoreConfig`] is the input for [`ParticleStore::new`](crate::ParticleStore::new).
//! [`validate()`](StoreConfig::validate) checks structural invariants
//! before anything is allocated.

use std::error::Error;
use std::fmt;

use mirra_mirror::SyncPolicy;
use mirra_sort::{BinSizing, SortMode, SorterConfig, DEFAULT_MAX_BINS};

// ── Layout ─────────────────────────────────────────────────────────

/// Which optional per-particle groups the store carries.
///
/// Positions, velocities, forces, tags, types, group masks and image
/// flags are always present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    /// Per-particle charge.
    pub charge: bool,
    /// Molecule id. Required by bonded topology and special lists.
    pub molecule: bool,
    /// Finite-size spheres: radius, per-particle mass, angular velocity
    /// and torque.
    pub sphere: bool,
    /// Angular momentum (ellipsoids and other aspherical particles).
    pub angmom: bool,
    /// Bond topology: bond count, types and partners.
    pub bonds: bool,
    /// Bond slots per particle. Must be non-zero when `bonds` is set.
    pub max_bonds_per_particle: usize,
    /// Angle topology: angle count, types and atom triples.
    pub angles: bool,
    /// Angle slots per particle. Must be non-zero when `angles` is set.
    pub max_angles_per_particle: usize,
    /// Dihedral topology: dihedral count, types and atom quadruples.
    pub dihedrals: bool,
    /// Dihedral slots per particle. Must be non-zero when `dihedrals` is set.
    pub max_dihedrals_per_particle: usize,
    /// Improper topology: improper count, types and atom quadruples.
    pub impropers: bool,
    /// Improper slots per particle. Must be non-zero when `impropers` is set.
    pub max_impropers_per_particle: usize,
    /// Special-neighbor lists.
    pub special: bool,
    /// Initial special-list width. Must be non-zero when `special` is set.
    pub max_special: usize,
}

impl Layout {
    /// Point particles with no optional data.
    pub fn atomic() -> Self {
        Self::default()
    }

    /// Point particles with charge.
    pub fn charge() -> Self {
        Self {
            charge: true,
            ..Self::default()
        }
    }

    /// Finite-size spheres.
    pub fn sphere() -> Self {
        Self {
            sphere: true,
            ..Self::default()
        }
    }

    /// Charged molecular particles with bonds and special lists.
    pub fn full(max_bonds_per_particle: usize, max_special: usize) -> Self {
        Self {
            charge: true,
            molecule: true,
            bonds: true,
            max_bonds_per_particle,
            special: true,
            max_special,
            ..Self::default()
        }
    }

    /// Full molecular topology: [`full`](Self::full) plus angles,
    /// dihedrals and impropers. Special lists get three slots per bond.
    pub fn molecular(bonds: usize, angles: usize, dihedrals: usize, impropers: usize) -> Self {
        Self {
            angles: true,
            max_angles_per_particle: angles,
            dihedrals: true,
            max_dihedrals_per_particle: dihedrals,
            impropers: true,
            max_impropers_per_particle: impropers,
            ..Self::full(bonds, 3 * bonds.max(1))
        }
    }

    /// Whether any bonded topology beyond special lists is present.
    fn has_topology(&self) -> bool {
        self.bonds || self.angles || self.dihedrals || self.impropers
    }

    /// Widest row, in elements, of any field this layout creates.
    pub(crate) fn widest_row(&self) -> usize {
        let mut w = 3;
        if self.bonds {
            w = w.max(self.max_bonds_per_particle);
        }
        if self.angles {
            w = w.max(3 * self.max_angles_per_particle);
        }
        if self.dihedrals {
            w = w.max(4 * self.max_dihedrals_per_particle);
        }
        if self.impropers {
            w = w.max(4 * self.max_impropers_per_particle);
        }
        if self.special {
            w = w.max(self.max_special);
        }
        w
    }
}

// ── SortConfig ─────────────────────────────────────────────────────

/// Spatial sort settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SortConfig {
    /// Steps between cadence sorts. Zero disables cadence sorting. Default: 1000.
    pub frequency: u64,
    /// Bin edge selection. Default: eight particles per bin.
    pub sizing: BinSizing,
    /// Upper bound on the number of bins. Default: `i32::MAX`.
    pub max_bins: usize,
    /// Start with accelerator-side sorting. `false` sorts on the host
    /// from the first step. Default: `true`.
    pub start_on_device: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            frequency: 1000,
            sizing: BinSizing::default(),
            max_bins: DEFAULT_MAX_BINS,
            start_on_device: true,
        }
    }
}

impl SortConfig {
    pub(crate) fn sorter_config(&self) -> SorterConfig {
        SorterConfig {
            frequency: self.frequency,
            sizing: self.sizing,
            max_bins: self.max_bins,
        }
    }

    pub(crate) fn initial_mode(&self) -> SortMode {
        if self.start_on_device {
            SortMode::Device
        } else {
            SortMode::Host
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`StoreConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The layout asks for a combination the store cannot build.
    UnsupportedLayout {
        /// Description of the problem.
        reason: String,
    },
    /// Sort settings are out of range.
    InvalidSort {
        /// Description of the problem.
        reason: String,
    },
    /// The initial capacity would overflow an allocation.
    InvalidCapacity {
        /// The configured capacity.
        capacity: usize,
    },
    /// `atom_types` is zero.
    NoAtomTypes,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedLayout { reason } => write!(f, "unsupported layout: {reason}"),
            Self::InvalidSort { reason } => write!(f, "invalid sort config: {reason}"),
            Self::InvalidCapacity { capacity } => {
                write!(f, "initial capacity {capacity} is too large to allocate")
            }
            Self::NoAtomTypes => write!(f, "at least one particle type is required"),
        }
    }
}

impl Error for ConfigError {}

// ── StoreConfig ────────────────────────────────────────────────────

/// Complete configuration for constructing a particle store.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// Optional per-particle groups.
    pub layout: Layout,
    /// Host/device sync policy, fixed for the store's lifetime.
    pub policy: SyncPolicy,
    /// Spatial sort settings.
    pub sort: SortConfig,
    /// Rows allocated up front. Default: 1024.
    pub initial_capacity: usize,
    /// Number of particle types. Types are numbered `1..=atom_types`. Default: 1.
    pub atom_types: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            policy: SyncPolicy::default(),
            sort: SortConfig::default(),
            initial_capacity: 1024,
            atom_types: 1,
        }
    }
}

impl StoreConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.layout;
        // 1. Topology needs molecules and a non-zero width.
        if l.bonds && l.max_bonds_per_particle == 0 {
            return Err(ConfigError::UnsupportedLayout {
                reason: "bonds enabled with max_bonds_per_particle = 0".to_string(),
            });
        }
        for (on, width, name) in [
            (l.angles, l.max_angles_per_particle, "angles"),
            (l.dihedrals, l.max_dihedrals_per_particle, "dihedrals"),
            (l.impropers, l.max_impropers_per_particle, "impropers"),
        ] {
            if on && width == 0 {
                return Err(ConfigError::UnsupportedLayout {
                    reason: format!("{name} enabled with zero slots per particle"),
                });
            }
        }
        if l.special && l.max_special == 0 {
            return Err(ConfigError::UnsupportedLayout {
                reason: "special lists enabled with max_special = 0".to_string(),
            });
        }
        if (l.has_topology() || l.special) && !l.molecule {
            return Err(ConfigError::UnsupportedLayout {
                reason: "bonded topology and special lists require molecule ids".to_string(),
            });
        }
        // 2. Particle types.
        if self.atom_types == 0 {
            return Err(ConfigError::NoAtomTypes);
        }
        // 3. Sort settings.
        let s = &self.sort;
        if s.sizing.validate().is_err() {
            return Err(ConfigError::InvalidSort {
                reason: format!(
                    "bin sizing must be finite and positive, got {}",
                    s.sizing.value()
                ),
            });
        }
        if s.max_bins == 0 {
            return Err(ConfigError::InvalidSort {
                reason: "max_bins must be at least 1".to_string(),
            });
        }
        // 4. Widest allocation must fit in isize bytes.
        let row_bytes = l.widest_row() * std::mem::size_of::<f64>();
        if self
            .initial_capacity
            .checked_mul(row_bytes)
            .is_none_or(|b| b > isize::MAX as usize)
        {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.initial_capacity,
            });
        }
        Ok(())
    }
}
