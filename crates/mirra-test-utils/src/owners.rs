//! Extension owners for sort tests.
//!
//! A [`RecordingOwner`] holds one `i64` per particle and applies every
//! permutation it is handed. Once it is boxed into a store the test keeps
//! an [`OwnerLog`] to look at what happened.

use std::sync::{Arc, Mutex};

use mirra_core::{Domain, ExtensionOwner, Permutation};

#[derive(Debug, Default)]
struct Recorded {
    values: Vec<i64>,
    relocations: Vec<Domain>,
    last: Option<Permutation>,
}

/// Shared view of a [`RecordingOwner`]'s state.
#[derive(Clone, Debug, Default)]
pub struct OwnerLog {
    inner: Arc<Mutex<Recorded>>,
}

impl OwnerLog {
    /// Current per-particle values.
    pub fn values(&self) -> Vec<i64> {
        self.inner.lock().unwrap().values.clone()
    }

    /// Domain of every relocation so far, in call order.
    pub fn relocations(&self) -> Vec<Domain> {
        self.inner.lock().unwrap().relocations.clone()
    }

    /// The most recent permutation received.
    pub fn last_permutation(&self) -> Option<Permutation> {
        self.inner.lock().unwrap().last.clone()
    }
}

/// An extension owner with one per-particle `i64` array.
pub struct RecordingOwner {
    name: String,
    device_capable: bool,
    state: Arc<Mutex<Recorded>>,
}

impl RecordingOwner {
    fn build(name: &str, values: Vec<i64>, device_capable: bool) -> (Self, OwnerLog) {
        let state = Arc::new(Mutex::new(Recorded {
            values,
            ..Recorded::default()
        }));
        let owner = Self {
            name: name.to_string(),
            device_capable,
            state: Arc::clone(&state),
        };
        (owner, OwnerLog { inner: state })
    }

    /// An owner that can relocate on the accelerator.
    pub fn capable(name: &str, values: Vec<i64>) -> (Self, OwnerLog) {
        Self::build(name, values, true)
    }

    /// An owner that only relocates on the host. Registering one forces
    /// the store to downgrade to host sorting.
    pub fn host_only(name: &str, values: Vec<i64>) -> (Self, OwnerLog) {
        Self::build(name, values, false)
    }
}

impl ExtensionOwner for RecordingOwner {
    fn name(&self) -> &str {
        &self.name
    }

    fn relocate(&mut self, permutation: &Permutation, domain: Domain) {
        let mut s = self.state.lock().unwrap();
        permutation.apply_rows(&mut s.values, 1);
        s.relocations.push(domain);
        s.last = Some(permutation.clone());
    }

    fn supports_device_relocation(&self) -> bool {
        self.device_capable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocation_is_visible_through_log() {
        let (mut owner, seen) = RecordingOwner::capable("bonds", vec![10, 11, 12]);
        let p = Permutation::from_new_to_old(vec![2, 0, 1]).unwrap();
        owner.relocate(&p, Domain::Device);
        assert_eq!(seen.values(), vec![12, 10, 11]);
        assert_eq!(seen.relocations(), vec![Domain::Device]);
        assert_eq!(seen.last_permutation(), Some(p));
    }

    #[test]
    fn host_only_owner_reports_no_device_support() {
        let (owner, _) = RecordingOwner::host_only("legacy", vec![]);
        assert!(!owner.supports_device_relocation());
    }
}
