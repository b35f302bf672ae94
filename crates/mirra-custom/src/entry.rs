//! One custom property: a name and its typed storage.

use mirra_core::{CustomCategory, Domain, GrowError, Permutation};
use mirra_mirror::{DualField, FieldScope, HostField, MirrorSlot};

/// Element type of a custom property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    /// 32-bit signed integers.
    Int,
    /// 64-bit floats.
    Float,
}

impl ValueType {
    /// The category a property of this type and width belongs to.
    ///
    /// `cols == 0` means one value per particle (a scalar property);
    /// anything else is an array of `cols` values per particle.
    pub fn category(self, cols: usize) -> CustomCategory {
        match (self, cols) {
            (Self::Int, 0) => CustomCategory::ScalarInt,
            (Self::Float, 0) => CustomCategory::ScalarFloat,
            (Self::Int, _) => CustomCategory::ArrayInt,
            (Self::Float, _) => CustomCategory::ArrayFloat,
        }
    }
}

/// Backing storage, one variant per storage shape.
///
/// Scalar floats are mirrored in both domains; the other categories live
/// on the host only.
#[derive(Debug)]
pub enum CustomData {
    /// Host-resident integers (scalar or array).
    Int(HostField<i32>),
    /// Host-resident floats (array).
    Float(HostField<f64>),
    /// Scalar floats with a host and a device copy.
    MirroredFloat(DualField<f64>),
}

impl CustomData {
    pub(crate) fn allocate(
        category: CustomCategory,
        cols: usize,
        capacity: usize,
        len: usize,
        name: &str,
    ) -> Self {
        let cols = match category {
            CustomCategory::ScalarInt | CustomCategory::ScalarFloat => 1,
            CustomCategory::ArrayInt | CustomCategory::ArrayFloat => cols.max(1),
        };
        let scope = FieldScope::PerParticle;
        match category {
            CustomCategory::ScalarInt | CustomCategory::ArrayInt => {
                Self::Int(HostField::with_live_rows(name, scope, cols, capacity, len))
            }
            CustomCategory::ArrayFloat => {
                Self::Float(HostField::with_live_rows(name, scope, cols, capacity, len))
            }
            CustomCategory::ScalarFloat => {
                Self::MirroredFloat(DualField::with_live_rows(name, scope, 1, capacity, len))
            }
        }
    }

    /// Type-erased view, for the operations every variant shares.
    pub fn slot(&self) -> &dyn MirrorSlot {
        match self {
            Self::Int(f) => f,
            Self::Float(f) => f,
            Self::MirroredFloat(f) => f,
        }
    }

    /// Mutable type-erased view.
    pub fn slot_mut(&mut self) -> &mut dyn MirrorSlot {
        match self {
            Self::Int(f) => f,
            Self::Float(f) => f,
            Self::MirroredFloat(f) => f,
        }
    }

    pub(crate) fn grow(&mut self, capacity: usize) -> Result<(), GrowError> {
        self.slot_mut().grow(capacity)
    }

    pub(crate) fn permute(&mut self, permutation: &Permutation, domain: Domain) {
        self.slot_mut().permute(permutation, domain);
    }
}

/// A live custom property.
#[derive(Debug)]
pub struct CustomEntry {
    pub(crate) category: CustomCategory,
    pub(crate) cols: usize,
    pub(crate) data: CustomData,
}

impl CustomEntry {
    /// Name given at creation.
    pub fn name(&self) -> &str {
        self.data.slot().name()
    }

    /// The category the handle belongs to.
    pub fn category(&self) -> CustomCategory {
        self.category
    }

    /// Columns as requested at creation (0 for scalars).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The backing storage.
    pub fn data(&self) -> &CustomData {
        &self.data
    }

    /// Mutable backing storage.
    pub fn data_mut(&mut self) -> &mut CustomData {
        &mut self.data
    }
}
