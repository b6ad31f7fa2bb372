use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::profile::{ProfileRef, Statistics};

/// Statistics handle for one loaded instance on one profile edge.
///
/// The counters are shared by every instance loaded through the same edge;
/// the accessed flag belongs to this instance alone, which makes
/// [`Tracker::mark_accessed`] idempotent.
pub struct Tracker {
    node: ProfileRef,
    stats: Arc<Statistics>,
    accessed: AtomicBool,
}

impl Tracker {
    pub(crate) fn new(node: ProfileRef, stats: Arc<Statistics>) -> Self {
        Self {
            node,
            stats,
            accessed: AtomicBool::new(false),
        }
    }

    /// Profile node the tracked instance sits on.
    pub fn node(&self) -> &ProfileRef {
        &self.node
    }

    /// Counters of the edge leading to [`Tracker::node`].
    pub fn stats(&self) -> &Arc<Statistics> {
        &self.stats
    }

    /// Whether this instance has been marked traversed.
    pub fn is_accessed(&self) -> bool {
        self.accessed.load(Ordering::Acquire)
    }

    /// Marks the instance traversed; returns `false` if it already was.
    pub fn mark_accessed(&self) -> bool {
        if self.accessed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.stats.mark_accessed();
        true
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("level", &self.node.level())
            .field("stats", &self.stats.snapshot())
            .field("accessed", &self.is_accessed())
            .finish()
    }
}
