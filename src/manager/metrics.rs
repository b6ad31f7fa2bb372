use std::sync::atomic::{AtomicU64, Ordering};

/// Hooks for observing the advisor's registry and recommendation activity.
///
/// Implementations must be cheap; they are called on the load path of the host.
pub trait AdvisorMetrics: Send + Sync {
    /// A profile tree was created for a previously unseen site.
    fn site_created(&self);

    /// A site was dropped from a bounded registry.
    fn site_evicted(&self);

    /// A profile extension was refused because of the depth bound.
    fn sub_profile_refused(&self);

    /// A loaded instance was marked traversed for the first time.
    fn traversal_recorded(&self);

    /// A recommendation was computed.
    ///
    /// # Parameters
    /// * `paths` - Number of paths recommended; `0` for cold or disabled sites.
    fn prefetch_computed(&self, paths: usize);
}

/// Discards every event.
#[derive(Default)]
pub struct NoopMetrics;

impl AdvisorMetrics for NoopMetrics {
    fn site_created(&self) {}
    fn site_evicted(&self) {}
    fn sub_profile_refused(&self) {}
    fn traversal_recorded(&self) {}
    fn prefetch_computed(&self, _paths: usize) {}
}

/// Atomic counters for every [`AdvisorMetrics`] event.
#[derive(Default)]
pub struct CounterMetrics {
    /// Sites created.
    pub sites_created: AtomicU64,

    /// Sites evicted by the LRU bound.
    pub sites_evicted: AtomicU64,

    /// Refused profile extensions.
    pub sub_profiles_refused: AtomicU64,

    /// First-time traversals recorded.
    pub traversals_recorded: AtomicU64,

    /// Recommendations computed.
    pub prefetch_requests: AtomicU64,

    /// Recommendations that contained no path.
    pub prefetch_empty: AtomicU64,

    /// Total paths recommended across all requests.
    pub paths_recommended: AtomicU64,
}

/// Plain copy of [`CounterMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Sites created.
    pub sites_created: u64,
    /// Sites evicted.
    pub sites_evicted: u64,
    /// Refused profile extensions.
    pub sub_profiles_refused: u64,
    /// First-time traversals recorded.
    pub traversals_recorded: u64,
    /// Recommendations computed.
    pub prefetch_requests: u64,
    /// Recommendations without paths.
    pub prefetch_empty: u64,
    /// Total paths recommended.
    pub paths_recommended: u64,
}

impl CounterMetrics {
    /// Reads all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        MetricsSnapshot {
            sites_created: load(&self.sites_created),
            sites_evicted: load(&self.sites_evicted),
            sub_profiles_refused: load(&self.sub_profiles_refused),
            traversals_recorded: load(&self.traversals_recorded),
            prefetch_requests: load(&self.prefetch_requests),
            prefetch_empty: load(&self.prefetch_empty),
            paths_recommended: load(&self.paths_recommended),
        }
    }
}

impl AdvisorMetrics for CounterMetrics {
    fn site_created(&self) {
        self.sites_created.fetch_add(1, Ordering::Relaxed);
    }

    fn site_evicted(&self) {
        self.sites_evicted.fetch_add(1, Ordering::Relaxed);
    }

    fn sub_profile_refused(&self) {
        self.sub_profiles_refused.fetch_add(1, Ordering::Relaxed);
    }

    fn traversal_recorded(&self) {
        self.traversals_recorded.fetch_add(1, Ordering::Relaxed);
    }

    fn prefetch_computed(&self, paths: usize) {
        self.prefetch_requests.fetch_add(1, Ordering::Relaxed);
        if paths == 0 {
            self.prefetch_empty.fetch_add(1, Ordering::Relaxed);
        }
        self.paths_recommended
            .fetch_add(paths as u64, Ordering::Relaxed);
    }
}
