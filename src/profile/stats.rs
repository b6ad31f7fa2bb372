use std::fmt;

use parking_lot::Mutex;

/// Once `total` passes this mark, both counters are halved before new loads are added.
const MAX_TOTAL: u64 = i64::MAX as u64 - i32::MAX as u64;

/// Point-in-time copy of a [`Statistics`] counter pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Number of loaded instances observed on the edge.
    pub total: u64,
    /// Number of those instances that were traversed.
    pub accessed: u64,
}

impl StatsSnapshot {
    /// Fraction of loads that were traversed; `0.0` before any load.
    pub fn access_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.accessed as f64 / self.total as f64
        }
    }
}

/// Load/traversal counters attached to one edge of a profile tree.
///
/// Invariant: `accessed <= total` whenever no method is running.
#[derive(Default)]
pub struct Statistics {
    counts: Mutex<StatsSnapshot>,
}

impl Statistics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `amount` new loads on this edge.
    ///
    /// Near the overflow boundary the counters decay: `total` is halved
    /// (rounding up), `accessed` is halved (rounding down) and `amount` is
    /// halved before it is added. Counts become approximate from then on but the
    /// ratio between them is kept.
    pub fn increment_total(&self, amount: u32) {
        let mut counts = self.counts.lock();
        let mut amount = u64::from(amount);
        if counts.total > MAX_TOTAL {
            counts.total = counts.total.div_ceil(2);
            counts.accessed /= 2;
            amount /= 2;
        }
        counts.total += amount;
    }

    /// Records that one loaded instance on this edge was traversed.
    ///
    /// # Panics
    ///
    /// Panics if `accessed` would exceed `total`: the tracking layer marked an
    /// instance twice or never counted its load.
    pub fn mark_accessed(&self) {
        let mut counts = self.counts.lock();
        assert!(
            counts.accessed < counts.total,
            "accessed count {} exceeds total {}",
            counts.accessed + 1,
            counts.total
        );
        counts.accessed += 1;
    }

    /// Returns `accessed / total`, or `0.0` when nothing was loaded yet.
    pub fn access_ratio(&self) -> f64 {
        self.snapshot().access_ratio()
    }

    /// Number of loads observed.
    pub fn total(&self) -> u64 {
        self.counts.lock().total
    }

    /// Number of traversals observed.
    pub fn accessed(&self) -> u64 {
        self.counts.lock().accessed
    }

    /// Reads both counters under one lock.
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.counts.lock()
    }

    #[cfg(test)]
    pub(crate) fn with_counts(total: u64, accessed: u64) -> Self {
        Self {
            counts: Mutex::new(StatsSnapshot { total, accessed }),
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        write!(f, "{} / {}", snapshot.accessed, snapshot.total)
    }
}

impl fmt::Debug for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statistics")
            .field("counts", &self.snapshot())
            .finish()
    }
}
