//! Memory domains a mirrored buffer can live in.

use std::fmt;

/// One of the two physically distinct places a field's bytes can reside.
///
/// Every mirrored field keeps one allocation per domain. The host copy is
/// what general-purpose code reads; the device copy is what accelerator
/// kernels read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    /// General-purpose processor memory.
    Host,
    /// Accelerator memory.
    Device,
}

impl Domain {
    /// Number of domains. Used to size per-domain arrays.
    pub const COUNT: usize = 2;

    /// Both domains, host first.
    pub const ALL: [Domain; 2] = [Domain::Host, Domain::Device];

    /// Dense index of this domain (`Host = 0`, `Device = 1`).
    pub const fn index(self) -> usize {
        match self {
            Self::Host => 0,
            Self::Device => 1,
        }
    }

    /// The opposite domain.
    pub const fn other(self) -> Self {
        match self {
            Self::Host => Self::Device,
            Self::Device => Self::Host,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Device => write!(f, "device"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_is_involution() {
        for d in Domain::ALL {
            assert_ne!(d, d.other());
            assert_eq!(d, d.other().other());
        }
    }

    #[test]
    fn indices_are_dense() {
        assert_eq!(Domain::Host.index(), 0);
        assert_eq!(Domain::Device.index(), 1);
        assert_eq!(Domain::ALL.len(), Domain::COUNT);
    }
}
