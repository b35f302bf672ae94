//! Field-group masks: compact, bitwise-composable sets of group tags.
//!
//! Each bit of a [`FieldMask`] is one *group tag*. A tag names one or more
//! mirrored fields that are always synchronized together; for example the
//! bond group covers the bond count, bond types and bond partners. A
//! request issued with a composite mask behaves as if it were issued once
//! per constituent tag.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// A set of field-group tags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldMask(u32);

impl FieldMask {
    /// Positions.
    pub const X: Self = Self(1 << 0);
    /// Velocities.
    pub const V: Self = Self(1 << 1);
    /// Forces.
    pub const F: Self = Self(1 << 2);
    /// Global particle identity.
    pub const TAG: Self = Self(1 << 3);
    /// Particle type.
    pub const TYPE: Self = Self(1 << 4);
    /// Group membership bits.
    pub const MASK: Self = Self(1 << 5);
    /// Periodic image flags.
    pub const IMAGE: Self = Self(1 << 6);
    /// Charge.
    pub const Q: Self = Self(1 << 7);
    /// Molecule id.
    pub const MOLECULE: Self = Self(1 << 8);
    /// Finite-size radius.
    pub const RADIUS: Self = Self(1 << 9);
    /// Per-particle mass.
    pub const RMASS: Self = Self(1 << 10);
    /// Angular velocity.
    pub const OMEGA: Self = Self(1 << 11);
    /// Angular momentum.
    pub const ANGMOM: Self = Self(1 << 12);
    /// Torque.
    pub const TORQUE: Self = Self(1 << 13);
    /// Special-neighbor counts and lists.
    pub const SPECIAL: Self = Self(1 << 14);
    /// Bond counts, types and partners.
    pub const BOND: Self = Self(1 << 15);
    /// Per-type mass table (not per particle).
    pub const TYPE_MASS: Self = Self(1 << 16);
    /// Scalar floating-point custom properties.
    pub const DVECTOR: Self = Self(1 << 17);
    /// Angle counts, types and atom triples.
    pub const ANGLE: Self = Self(1 << 18);
    /// Dihedral counts, types and atom quadruples.
    pub const DIHEDRAL: Self = Self(1 << 19);
    /// Improper counts, types and atom quadruples.
    pub const IMPROPER: Self = Self(1 << 20);

    /// Number of defined tags.
    pub const TAG_COUNT: u32 = 21;

    const NAMES: [&'static str; Self::TAG_COUNT as usize] = [
        "x", "v", "f", "tag", "type", "mask", "image", "q", "molecule", "radius", "rmass",
        "omega", "angmom", "torque", "special", "bond", "type_mass", "dvector", "angle",
        "dihedral", "improper",
    ];

    /// Every defined tag.
    pub const ALL: Self = Self((1 << Self::TAG_COUNT) - 1);

    /// The empty mask.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a mask from raw bits. Bits above [`TAG_COUNT`](Self::TAG_COUNT)
    /// are kept; they name no defined group and are rejected by the
    /// coordinator.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Return the union of two masks (`self | other`).
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Return the intersection of two masks (`self & other`).
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Return the tags in `self` but not in `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Whether every tag of `other` is in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the masks share at least one tag.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if the mask names no tag.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of tags in the mask.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` if the mask names exactly one tag.
    pub const fn is_single(self) -> bool {
        self.0.count_ones() == 1
    }

    /// Iterate over the constituent single-tag masks, lowest bit first.
    pub fn iter(self) -> FieldMaskIter {
        FieldMaskIter { remaining: self.0 }
    }

    /// Name of a single-tag mask, or `None` for composite or undefined masks.
    pub fn tag_name(self) -> Option<&'static str> {
        if !self.is_single() {
            return None;
        }
        Self::NAMES.get(self.0.trailing_zeros() as usize).copied()
    }
}

impl BitOr for FieldMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for FieldMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FieldMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for FieldMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for FieldMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl FromIterator<FieldMask> for FieldMask {
    fn from_iter<I: IntoIterator<Item = FieldMask>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::union)
    }
}

impl IntoIterator for FieldMask {
    type Item = FieldMask;
    type IntoIter = FieldMaskIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldMask({self})")
    }
}

impl fmt::Display for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "empty");
        }
        let mut first = true;
        for tag in self.iter() {
            if !first {
                write!(f, "|")?;
            }
            first = false;
            match tag.tag_name() {
                Some(name) => write!(f, "{name}")?,
                None => write!(f, "{:#x}", tag.0)?,
            }
        }
        Ok(())
    }
}

/// Iterator over the single-tag masks of a [`FieldMask`].
pub struct FieldMaskIter {
    remaining: u32,
}

impl Iterator for FieldMaskIter {
    type Item = FieldMask;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let low = self.remaining & self.remaining.wrapping_neg();
        self.remaining &= !low;
        Some(FieldMask(low))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for FieldMaskIter {}
