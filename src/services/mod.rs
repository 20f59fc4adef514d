pub mod index;
pub mod query;

pub use index::{DocumentIndexer, ReloadSummary};
pub use query::{QueryOutcome, QueryService, RankedSource};

use std::sync::RwLock;

/// Name of the collection queries currently read from.
///
/// Reload indexes into a staging collection and swaps the name in here once
/// the new collection is complete, so concurrent queries observe either the
/// old or the new collection in full, never a mix.
#[derive(Debug)]
pub struct ActiveCollection {
    name: RwLock<String>,
}

impl ActiveCollection {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            name: RwLock::new(initial.into()),
        }
    }

    pub fn current(&self) -> String {
        self.name.read().unwrap().clone()
    }

    /// Swap in a new collection name, returning the previous one
    pub fn swap(&self, new_name: String) -> String {
        let mut guard = self.name.write().unwrap();
        std::mem::replace(&mut *guard, new_name)
    }
}
