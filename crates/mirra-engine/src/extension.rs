//! Registered extension owners.

use indexmap::IndexMap;

use mirra_core::{Domain, ExtensionOwner, OwnerId, Permutation};

/// Extension owners in registration order.
///
/// Ids are never reused, so a stale [`OwnerId`] can never unregister a
/// later owner.
#[derive(Default)]
pub(crate) struct Extensions {
    owners: IndexMap<OwnerId, Box<dyn ExtensionOwner>>,
    next: u32,
}

impl Extensions {
    pub fn register(&mut self, owner: Box<dyn ExtensionOwner>) -> OwnerId {
        let id = OwnerId(self.next);
        self.next += 1;
        tracing::debug!(%id, name = owner.name(), "extension owner registered");
        self.owners.insert(id, owner);
        id
    }

    pub fn unregister(&mut self, id: OwnerId) -> Option<Box<dyn ExtensionOwner>> {
        self.owners.shift_remove(&id)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn get(&self, id: OwnerId) -> Option<&dyn ExtensionOwner> {
        self.owners.get(&id).map(|o| o.as_ref() as &dyn ExtensionOwner)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ExtensionOwner> + '_ {
        self.owners.values().map(|o| o.as_ref() as &dyn ExtensionOwner)
    }

    /// Hand `permutation` to every owner, in registration order.
    pub fn relocate(&mut self, permutation: &Permutation, domain: Domain) {
        for owner in self.owners.values_mut() {
            owner.relocate(permutation, domain);
        }
    }
}
