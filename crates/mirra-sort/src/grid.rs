//! The bin grid and the counting sort that groups particles by bin.

use mirra_core::{Permutation, SortError};

use crate::geometry::Geometry;

/// How the bin edge length is chosen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BinSizing {
    /// A fixed edge length in distance units.
    Explicit(f64),
    /// Pick the edge so that, on average, a bin holds this many particles.
    TargetOccupancy(f64),
}

impl Default for BinSizing {
    fn default() -> Self {
        Self::TargetOccupancy(8.0)
    }
}

impl BinSizing {
    /// The configured number, whichever variant holds it.
    pub fn value(self) -> f64 {
        match self {
            Self::Explicit(v) | Self::TargetOccupancy(v) => v,
        }
    }

    /// Reject zero, negative and non-finite values.
    pub fn validate(self) -> Result<(), SortError> {
        let v = self.value();
        if v.is_finite() && v > 0.0 {
            Ok(())
        } else {
            Err(SortError::InvalidBinSize { value: v })
        }
    }
}

/// Coordinate frame positions are binned in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinFrame {
    /// Cartesian positions against the bounding box.
    Cartesian,
    /// Fractional cell coordinates against the unit cube. Used for sheared
    /// cells, where the bounding box would leave whole bins empty.
    Fractional,
}

/// A uniform axis-aligned grid of sorting bins.
#[derive(Clone, Debug, PartialEq)]
pub struct BinGrid {
    frame: BinFrame,
    origin: [f64; 3],
    inv_width: [f64; 3],
    dims: [usize; 3],
}

impl BinGrid {
    /// Build the grid for `geometry`.
    ///
    /// `particles` is the number of local particles, used by
    /// [`BinSizing::TargetOccupancy`]. Each axis gets
    /// `max(1, floor(width / edge))` bins, where `width` is the face width
    /// of the cell along that axis.
    pub fn from_geometry(
        geometry: &dyn Geometry,
        sizing: BinSizing,
        particles: usize,
        max_bins: usize,
    ) -> Result<Self, SortError> {
        sizing.validate()?;
        let bbox = geometry.bounding_box();
        let extent = bbox.extent();
        for (axis, e) in extent.iter().enumerate() {
            if !(e.is_finite() && *e > 0.0) {
                return Err(SortError::DegenerateBox { axis });
            }
        }

        let edge = match sizing {
            BinSizing::Explicit(len) => len,
            BinSizing::TargetOccupancy(_) if particles == 0 => f64::INFINITY,
            BinSizing::TargetOccupancy(per_bin) => {
                (bbox.volume() * per_bin / particles as f64).cbrt()
            }
        };

        let sheared = geometry.is_sheared();
        let widths = if sheared {
            geometry.face_widths()
        } else {
            extent
        };
        let mut dims = [1usize; 3];
        let mut total: u128 = 1;
        for a in 0..3 {
            let n = (widths[a] / edge).floor();
            // Counts beyond u64 are clamped; they fail the ceiling anyway.
            let n = if n.is_finite() && n >= 1.0 {
                n.min(u64::MAX as f64) as u64
            } else {
                1
            };
            total = total.saturating_mul(u128::from(n));
            dims[a] = usize::try_from(n).unwrap_or(usize::MAX);
        }
        if total > max_bins as u128 {
            return Err(SortError::TooManyBins {
                requested: total,
                max: max_bins,
            });
        }

        let (frame, origin, inv_width) = if sheared {
            (
                BinFrame::Fractional,
                [0.0; 3],
                std::array::from_fn(|a| dims[a] as f64),
            )
        } else {
            (
                BinFrame::Cartesian,
                bbox.lo,
                std::array::from_fn(|a| dims[a] as f64 / extent[a]),
            )
        };

        Ok(Self {
            frame,
            origin,
            inv_width,
            dims,
        })
    }

    /// Bins along each axis.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Total number of bins.
    pub fn bin_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// The frame positions must be in for [`bin_of`](Self::bin_of).
    pub fn frame(&self) -> BinFrame {
        self.frame
    }

    /// Flattened bin of a point already in this grid's frame.
    ///
    /// Points outside the grid are clamped to the nearest edge bin.
    pub fn bin_of(&self, p: [f64; 3]) -> usize {
        let mut cell = [0usize; 3];
        for a in 0..3 {
            let c = ((p[a] - self.origin[a]) * self.inv_width[a]).floor();
            cell[a] = c.max(0.0).min((self.dims[a] - 1) as f64) as usize;
        }
        cell[0] + self.dims[0] * (cell[1] + self.dims[1] * cell[2])
    }

    /// Bin of each of the first `count` rows of a 3-column position buffer.
    ///
    /// Sheared cells are binned on fractional coordinates computed into a
    /// scratch value per particle; `positions` itself is never rewritten.
    pub fn assign(
        &self,
        geometry: &dyn Geometry,
        positions: &[f64],
        count: usize,
    ) -> Result<Vec<usize>, SortError> {
        if positions.len() < count * 3 {
            return Err(SortError::PositionLayout {
                cols: positions.len() / count.max(1),
            });
        }
        Ok(positions[..count * 3]
            .chunks_exact(3)
            .map(|r| {
                let p = [r[0], r[1], r[2]];
                match self.frame {
                    BinFrame::Cartesian => self.bin_of(p),
                    BinFrame::Fractional => self.bin_of(geometry.to_fractional(p)),
                }
            })
            .collect())
    }
}

/// Counting sort of particle indices by bin.
///
/// Returns a new-to-old permutation whose image has non-decreasing bin ids.
/// Particles sharing a bin keep their relative order, but callers must not
/// rely on that.
pub fn bin_permutation(bins: &[usize], bin_count: usize) -> Permutation {
    let mut offsets = vec![0usize; bin_count + 1];
    for &b in bins {
        offsets[b + 1] += 1;
    }
    for c in 0..bin_count {
        offsets[c + 1] += offsets[c];
    }
    let mut new_to_old = vec![0usize; bins.len()];
    for (old, &b) in bins.iter().enumerate() {
        new_to_old[offsets[b]] = old;
        offsets[b] += 1;
    }
    Permutation::from_new_to_old(new_to_old)
        .unwrap_or_else(|_| unreachable!("counting sort places every index exactly once"))
}
