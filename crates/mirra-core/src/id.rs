//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a mirrored field registered with a sync coordinator.
///
/// Fields are assigned sequential ids in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a registered extension owner.
///
/// Ids are never reused after an owner is unregistered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u32);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulation step counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StepIndex(pub u64);

impl StepIndex {
    /// The first multiple of `frequency` strictly after `self`.
    ///
    /// `frequency` must be non-zero.
    pub fn next_multiple(self, frequency: u64) -> Self {
        Self((self.0 / frequency) * frequency + frequency)
    }
}

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepIndex {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// The four kinds of custom per-particle property.
///
/// Each category keeps its own dense, append-only handle space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CustomCategory {
    /// One integer per particle.
    ScalarInt,
    /// One float per particle.
    ScalarFloat,
    /// A fixed number of integers per particle.
    ArrayInt,
    /// A fixed number of floats per particle.
    ArrayFloat,
}

impl CustomCategory {
    /// All categories in handle-space order.
    pub const ALL: [CustomCategory; 4] = [
        Self::ScalarInt,
        Self::ScalarFloat,
        Self::ArrayInt,
        Self::ArrayFloat,
    ];

    /// Dense index of this category.
    pub const fn index(self) -> usize {
        match self {
            Self::ScalarInt => 0,
            Self::ScalarFloat => 1,
            Self::ArrayInt => 2,
            Self::ArrayFloat => 3,
        }
    }
}

impl fmt::Display for CustomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScalarInt => write!(f, "ivector"),
            Self::ScalarFloat => write!(f, "dvector"),
            Self::ArrayInt => write!(f, "iarray"),
            Self::ArrayFloat => write!(f, "darray"),
        }
    }
}

/// Handle to a custom property: a dense index within one category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomHandle {
    /// The category whose handle space `index` belongs to.
    pub category: CustomCategory,
    /// Position in the category's append-only list.
    pub index: u32,
}

impl fmt::Display for CustomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.category, self.index)
    }
}
