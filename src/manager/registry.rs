use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::profile::ProfileTree;
use crate::site::SiteKey;

/// Outcome of [`SiteRegistry::get_or_create`].
pub(crate) struct Lookup {
    pub(crate) tree: Arc<ProfileTree>,
    pub(crate) created: bool,
    pub(crate) evicted: Option<SiteKey>,
}

/// Site -> profile map; lookup-or-create runs in one critical section.
pub(crate) struct SiteRegistry {
    sites: Mutex<LruCache<SiteKey, Arc<ProfileTree>>>,
}

impl SiteRegistry {
    pub(crate) fn new(capacity: Option<NonZeroUsize>) -> Self {
        let cache = match capacity {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            sites: Mutex::new(cache),
        }
    }

    pub(crate) fn get_or_create(&self, key: &SiteKey) -> Lookup {
        let mut sites = self.sites.lock();
        if let Some(tree) = sites.get(key) {
            return Lookup {
                tree: Arc::clone(tree),
                created: false,
                evicted: None,
            };
        }
        let tree = ProfileTree::new();
        let evicted = sites
            .push(key.clone(), Arc::clone(&tree))
            .map(|(evicted_key, _)| evicted_key);
        Lookup {
            tree,
            created: true,
            evicted,
        }
    }

    pub(crate) fn get(&self, key: &SiteKey) -> Option<Arc<ProfileTree>> {
        self.sites.lock().get(key).cloned()
    }

    pub(crate) fn peek(&self, key: &SiteKey) -> Option<Arc<ProfileTree>> {
        self.sites.lock().peek(key).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.sites.lock().len()
    }

    /// Entries from most to least recently used.
    pub(crate) fn entries(&self) -> Vec<(SiteKey, Arc<ProfileTree>)> {
        self.sites
            .lock()
            .iter()
            .map(|(key, tree)| (key.clone(), Arc::clone(tree)))
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.sites.lock().clear();
    }
}
