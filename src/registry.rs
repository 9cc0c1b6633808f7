use crate::binding::{BindingId, DataBinding};
use std::sync::{Arc, Mutex, MutexGuard};

/// Live bindings, in registration order.
///
/// Iteration always works on a snapshot, so a binding may unregister itself
/// (e.g. from a finalize hook) while a sweep is walking the set.
#[derive(Default)]
pub struct BindingRegistry {
    entries: Mutex<Vec<Arc<DataBinding>>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Arc<DataBinding>>> {
        self.entries.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Adds a binding; registering the same binding twice is a no-op.
    pub fn register(&self, binding: Arc<DataBinding>) -> bool {
        let mut entries = self.entries();
        if entries.iter().any(|b| b.id() == binding.id()) {
            return false;
        }
        entries.push(binding);
        true
    }

    /// Removes the first entry with this id.
    pub fn unregister(&self, id: BindingId) -> bool {
        let mut entries = self.entries();
        match entries.iter().position(|b| b.id() == id) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: BindingId) -> bool {
        self.entries().iter().any(|b| b.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Arc<DataBinding>> {
        self.entries().clone()
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<DataBinding>),
    {
        for binding in self.snapshot() {
            f(&binding);
        }
    }

    /// Finds a live binding by store and master key.
    pub fn find(&self, store_name: &str, master_key: &str) -> Option<Arc<DataBinding>> {
        self.entries()
            .iter()
            .find(|b| b.store_name() == store_name && b.master_key() == master_key)
            .cloned()
    }
}
