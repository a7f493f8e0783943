//! Frequency-first eviction order (LFU with LRU tie-break).

use crate::types::PageId;
use std::collections::{BTreeSet, HashMap};

/// Sort key of a resident page. Derived ordering compares the use count
/// first, then the last access tick, then the page ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EvictionKey {
    use_count: u64,
    last_used: u64,
    page_id: PageId,
}

/// Tracks use counts and access times of resident pages and yields them in
/// eviction order.
///
/// A key is never mutated while it sits in `order`: every access removes the
/// old key, updates it, and reinserts it.
pub struct EvictionIndex {
    /// Current key of every tracked page
    keys: HashMap<PageId, EvictionKey>,
    /// Keys sorted by eviction priority (first = next victim)
    order: BTreeSet<EvictionKey>,
    /// Logical clock used as the access timestamp
    clock: u64,
}

impl EvictionIndex {
    /// Create a new index sized for `capacity` pages
    pub fn new(capacity: usize) -> Self {
        Self {
            keys: HashMap::with_capacity(capacity),
            order: BTreeSet::new(),
            clock: 0,
        }
    }

    /// Record access to a page.
    ///
    /// A new page starts with a use count of 1; a tracked page has its count
    /// incremented. Either way its timestamp becomes the newest.
    pub fn access(&mut self, page_id: PageId) {
        self.clock += 1;
        let key = match self.keys.get(&page_id).copied() {
            Some(old) => {
                self.order.remove(&old);
                EvictionKey {
                    use_count: old.use_count + 1,
                    last_used: self.clock,
                    page_id,
                }
            }
            None => EvictionKey {
                use_count: 1,
                last_used: self.clock,
                page_id,
            },
        };
        self.order.insert(key);
        self.keys.insert(page_id, key);
    }

    /// Stop tracking a page
    pub fn remove(&mut self, page_id: PageId) {
        if let Some(key) = self.keys.remove(&page_id) {
            self.order.remove(&key);
        }
    }

    /// Pages in eviction order: lowest use count first, oldest access first
    /// among equal counts
    pub fn candidates(&self) -> impl Iterator<Item = PageId> + '_ {
        self.order.iter().map(|key| key.page_id)
    }

    /// Use count of a tracked page
    pub fn use_count(&self, page_id: PageId) -> Option<u64> {
        self.keys.get(&page_id).map(|key| key.use_count)
    }

    /// Number of tracked pages
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}
