//! Box geometry as seen by the binning step.
//!
//! The store does no box math of its own. A [`Geometry`] supplies the
//! axis-aligned bounding box, says whether the box is sheared, and maps
//! positions into the fractional frame of the box.

/// Axis-aligned bounds `[lo, hi]` on each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Lower corner.
    pub lo: [f64; 3],
    /// Upper corner.
    pub hi: [f64; 3],
}

impl BoundingBox {
    /// Extent along each axis.
    pub fn extent(&self) -> [f64; 3] {
        [
            self.hi[0] - self.lo[0],
            self.hi[1] - self.lo[1],
            self.hi[2] - self.lo[2],
        ]
    }

    /// Product of the extents.
    pub fn volume(&self) -> f64 {
        let e = self.extent();
        e[0] * e[1] * e[2]
    }
}

/// The geometry collaborator consulted when bins are computed.
pub trait Geometry {
    /// Axis-aligned box enclosing the simulation cell.
    fn bounding_box(&self) -> BoundingBox;

    /// Whether the cell is a sheared parallelepiped rather than a box.
    fn is_sheared(&self) -> bool;

    /// Map a Cartesian position to fractional cell coordinates in `[0, 1)`
    /// (particles slightly outside the cell map slightly outside the range).
    fn to_fractional(&self, position: [f64; 3]) -> [f64; 3];

    /// Distance between opposite faces along each cell axis.
    ///
    /// For an orthogonal box this is the extent of the bounding box.
    fn face_widths(&self) -> [f64; 3] {
        self.bounding_box().extent()
    }
}

/// An orthogonal box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthoBox {
    /// Lower corner.
    pub lo: [f64; 3],
    /// Upper corner.
    pub hi: [f64; 3],
}

impl OrthoBox {
    /// Box spanning `[lo, hi]`.
    pub fn new(lo: [f64; 3], hi: [f64; 3]) -> Self {
        Self { lo, hi }
    }

    /// Box spanning `[0, len]` on every axis.
    pub fn cube(len: f64) -> Self {
        Self::new([0.0; 3], [len; 3])
    }
}

impl Geometry for OrthoBox {
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            lo: self.lo,
            hi: self.hi,
        }
    }

    fn is_sheared(&self) -> bool {
        false
    }

    fn to_fractional(&self, p: [f64; 3]) -> [f64; 3] {
        std::array::from_fn(|a| (p[a] - self.lo[a]) / (self.hi[a] - self.lo[a]))
    }
}

/// A sheared cell with edge vectors
/// `a = (lx, 0, 0)`, `b = (xy, ly, 0)`, `c = (xz, yz, lz)` from `origin`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriclinicBox {
    /// Corner the edge vectors start from.
    pub origin: [f64; 3],
    /// Edge lengths along x, y and z of the unsheared box.
    pub lengths: [f64; 3],
    /// Tilt factors `xy`, `xz`, `yz`.
    pub tilt: [f64; 3],
}

impl TriclinicBox {
    /// Sheared cell from origin, lengths and `[xy, xz, yz]` tilts.
    pub fn new(origin: [f64; 3], lengths: [f64; 3], tilt: [f64; 3]) -> Self {
        Self {
            origin,
            lengths,
            tilt,
        }
    }

    fn edges(&self) -> [[f64; 3]; 3] {
        let [lx, ly, lz] = self.lengths;
        let [xy, xz, yz] = self.tilt;
        [[lx, 0.0, 0.0], [xy, ly, 0.0], [xz, yz, lz]]
    }

    /// Map fractional coordinates back to a Cartesian position.
    pub fn to_cartesian(&self, f: [f64; 3]) -> [f64; 3] {
        let [lx, ly, lz] = self.lengths;
        let [xy, xz, yz] = self.tilt;
        [
            self.origin[0] + lx * f[0] + xy * f[1] + xz * f[2],
            self.origin[1] + ly * f[1] + yz * f[2],
            self.origin[2] + lz * f[2],
        ]
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

impl Geometry for TriclinicBox {
    fn bounding_box(&self) -> BoundingBox {
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for corner in 0..8u8 {
            let f = [
                f64::from(corner & 1),
                f64::from((corner >> 1) & 1),
                f64::from((corner >> 2) & 1),
            ];
            let p = self.to_cartesian(f);
            for a in 0..3 {
                lo[a] = lo[a].min(p[a]);
                hi[a] = hi[a].max(p[a]);
            }
        }
        BoundingBox { lo, hi }
    }

    fn is_sheared(&self) -> bool {
        self.tilt.iter().any(|&t| t != 0.0)
    }

    fn to_fractional(&self, p: [f64; 3]) -> [f64; 3] {
        let [lx, ly, lz] = self.lengths;
        let [xy, xz, yz] = self.tilt;
        let d = [
            p[0] - self.origin[0],
            p[1] - self.origin[1],
            p[2] - self.origin[2],
        ];
        let fz = d[2] / lz;
        let fy = (d[1] - yz * fz) / ly;
        let fx = (d[0] - xy * fy - xz * fz) / lx;
        [fx, fy, fz]
    }

    fn face_widths(&self) -> [f64; 3] {
        let [a, b, c] = self.edges();
        let volume = self.lengths[0] * self.lengths[1] * self.lengths[2];
        [
            volume / norm(cross(b, c)),
            volume / norm(cross(c, a)),
            volume / norm(cross(a, b)),
        ]
    }
}
