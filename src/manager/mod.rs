//! The extent manager: registry of access sites and the recommendation engine.
//!
//! Hosts construct one [`ExtentManager`] and hand it to their loading and
//! tracking layers by reference. The four host-facing operations are
//! [`ExtentManager::record_root_access`], [`ExtentManager::request_sub_profile`],
//! [`ExtentManager::record_traversal`] and [`ExtentManager::prefetch_paths`].

mod config;
mod metrics;
mod prefetch;
mod registry;

use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

pub use config::{AdvisorConfig, ConfigError, ENV_ENABLED, ENV_MAX_DEPTH, ENV_THRESHOLD};
pub use metrics::{AdvisorMetrics, CounterMetrics, MetricsSnapshot, NoopMetrics};

use crate::error::Result;
use crate::path::Path;
use crate::profile::{ProfileRef, ProfileTree};
use crate::site::{FrameFilter, SiteKey};
use crate::tracking::{self, TrackedCollection, TrackedEntity, Tracker};
use prefetch::WalkParams;
use registry::SiteRegistry;

#[derive(Debug, Clone, Copy)]
struct Tuning {
    fetch_threshold: f64,
    max_prefetch_depth: usize,
    prefetch_enabled: bool,
}

/// Registry of per-site traversal profiles and the prefetch decision engine.
pub struct ExtentManager {
    registry: SiteRegistry,
    tuning: RwLock<Tuning>,
    max_sites: Option<NonZeroUsize>,
    max_stack_frames: usize,
    metrics: Arc<dyn AdvisorMetrics>,
}

impl Default for ExtentManager {
    fn default() -> Self {
        Self::build(&AdvisorConfig::default())
    }
}

impl ExtentManager {
    /// Creates a manager with default tuning and an unbounded registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager from a validated configuration.
    pub fn with_config(config: AdvisorConfig) -> Result<Self> {
        config.validate()?;
        info!(
            fetch_threshold = config.fetch_threshold,
            max_prefetch_depth = config.max_prefetch_depth,
            prefetch_enabled = config.prefetch_enabled,
            max_sites = ?config.max_sites,
            "advisor.config.applied"
        );
        Ok(Self::build(&config))
    }

    /// Replaces the metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn AdvisorMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn build(config: &AdvisorConfig) -> Self {
        let max_sites = config.max_sites.and_then(NonZeroUsize::new);
        Self {
            registry: SiteRegistry::new(max_sites),
            tuning: RwLock::new(Tuning {
                fetch_threshold: config.fetch_threshold,
                max_prefetch_depth: config.max_prefetch_depth,
                prefetch_enabled: config.prefetch_enabled,
            }),
            max_sites,
            max_stack_frames: config.max_stack_frames,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Current configuration, including runtime tuning changes.
    pub fn config(&self) -> AdvisorConfig {
        let tuning = *self.tuning.read();
        AdvisorConfig {
            fetch_threshold: tuning.fetch_threshold,
            max_prefetch_depth: tuning.max_prefetch_depth,
            prefetch_enabled: tuning.prefetch_enabled,
            max_sites: self.max_sites.map(NonZeroUsize::get),
            max_stack_frames: self.max_stack_frames,
        }
    }

    /// Frame filter matching the configured frame budget, for stack-derived keys.
    pub fn frame_filter(&self) -> FrameFilter {
        FrameFilter::default().max_frames(self.max_stack_frames)
    }

    /// Current fetch threshold.
    pub fn fetch_threshold(&self) -> f64 {
        self.tuning.read().fetch_threshold
    }

    /// Sets the fetch threshold; it must lie in the open interval (0, 1).
    pub fn set_fetch_threshold(&self, threshold: f64) -> Result<()> {
        config::validate_threshold(threshold)?;
        self.tuning.write().fetch_threshold = threshold;
        info!(threshold, "advisor.tuning.fetch_threshold");
        Ok(())
    }

    /// Current maximum prefetch depth.
    pub fn max_prefetch_depth(&self) -> usize {
        self.tuning.read().max_prefetch_depth
    }

    /// Sets the maximum prefetch depth (at least 1).
    ///
    /// Existing deeper profile nodes are kept but no longer recommended.
    pub fn set_max_prefetch_depth(&self, depth: usize) -> Result<()> {
        config::validate_depth(depth)?;
        self.tuning.write().max_prefetch_depth = depth;
        info!(depth, "advisor.tuning.max_prefetch_depth");
        Ok(())
    }

    /// Whether recommendations are produced.
    pub fn prefetch_enabled(&self) -> bool {
        self.tuning.read().prefetch_enabled
    }

    /// Turns recommendations on or off. Statistics keep accumulating either way.
    pub fn set_prefetch_enabled(&self, enabled: bool) {
        self.tuning.write().prefetch_enabled = enabled;
        info!(enabled, "advisor.tuning.prefetch_enabled");
    }

    fn tree_for(&self, site: &SiteKey) -> Arc<ProfileTree> {
        let lookup = self.registry.get_or_create(site);
        if lookup.created {
            self.metrics.site_created();
            debug!(site = %site, "advisor.site.created");
        }
        if let Some(evicted) = lookup.evicted {
            self.metrics.site_evicted();
            debug!(site = %evicted, "advisor.registry.evicted");
        }
        lookup.tree
    }

    /// Counts one root load for `site` and returns its statistics handle.
    pub fn root_tracker(&self, site: &SiteKey) -> Arc<Tracker> {
        let tree = self.tree_for(site);
        let stats = Arc::clone(tree.root_stats());
        stats.increment_total(1);
        Arc::new(Tracker::new(tree.root(), stats))
    }

    /// Records that `entity` was loaded as the root of a load from `site`.
    ///
    /// An entity that was already touched (e.g. served from a session cache)
    /// is counted as traversed right away and its loaded associations seed the
    /// next profile level. Otherwise the handle is attached to the entity and
    /// waits for [`ExtentManager::record_entity_access`].
    pub fn record_root_access(&self, entity: &dyn TrackedEntity, site: &SiteKey) {
        let tracker = self.root_tracker(site);
        let entity_tracker = entity.entity_tracker();
        if entity_tracker.is_accessed() {
            if self.record_traversal(&tracker) {
                tracking::extend_profile(entity, &tracker, self);
            }
        } else {
            entity_tracker.add_tracker(tracker);
        }
    }

    /// Adds `name` under `parent` unless the depth bound forbids it.
    ///
    /// `false` means the association must not be tracked; no edge exists for it.
    pub fn request_sub_profile(&self, parent: &ProfileRef, name: &str, is_collection: bool) -> bool {
        if parent.has_child(name) {
            return true;
        }
        let max_depth = self.max_prefetch_depth();
        if parent.add_child(name, is_collection, max_depth).is_some() {
            return true;
        }
        self.metrics.sub_profile_refused();
        debug!(
            association = name,
            level = parent.level(),
            max_depth,
            "advisor.profile.depth_refused"
        );
        false
    }

    /// Extends `parent` by one association and counts one load on that edge.
    ///
    /// Returns the handle for the newly loaded instance, or `None` when the
    /// depth bound refuses the extension.
    pub fn extend_tracker(&self, parent: &Tracker, name: &str, is_collection: bool) -> Option<Arc<Tracker>> {
        let node = parent.node();
        if !self.request_sub_profile(node, name, is_collection) {
            return None;
        }
        let child = node.child(name)?;
        let stats = node.child_stats(name)?;
        stats.increment_total(1);
        Some(Arc::new(Tracker::new(child, stats)))
    }

    /// Records the first traversal of a tracked instance.
    ///
    /// Idempotent per handle: returns `false` and changes nothing if the
    /// instance was already counted.
    pub fn record_traversal(&self, tracker: &Tracker) -> bool {
        let first = tracker.mark_accessed();
        if first {
            self.metrics.traversal_recorded();
        }
        first
    }

    /// Reports that user code touched `entity` for the first time.
    pub fn record_entity_access(&self, entity: &dyn TrackedEntity) {
        entity.entity_tracker().track_access(entity, self);
    }

    /// Reports that user code touched `collection` for the first time.
    pub fn record_collection_access(&self, collection: &TrackedCollection) {
        let elements = collection.elements();
        collection.tracker().track_access(&elements, self);
    }

    /// Paths to fetch eagerly on the next load from `site`.
    ///
    /// Empty when recommendations are disabled or the site has no profile yet.
    /// Every returned path is preceded by its parent path.
    pub fn prefetch_paths(&self, site: &SiteKey) -> Vec<Path> {
        self.recommend(site, prefetch::prefetch_paths)
    }

    /// Paths for initializing the collection `association` whose role is `role_site`.
    ///
    /// The learned paths of the role are re-rooted at the owning entity and
    /// preceded by the collection itself. Since the collection counts as one
    /// level and as the path's only collection, the role's own collection
    /// edges and its deepest level are left out. Empty if nothing is worth
    /// prefetching.
    pub fn collection_prefetch_paths(&self, role_site: &SiteKey, association: &str) -> Vec<Path> {
        let inner = self.recommend(role_site, prefetch::collection_role_paths);
        if inner.is_empty() {
            return inner;
        }
        let mut paths = Vec::with_capacity(inner.len() + 1);
        paths.push(Path::empty().append(association));
        paths.extend(inner.iter().map(|path| path.prepend_one(association)));
        paths
    }

    fn recommend(&self, site: &SiteKey, walk: fn(&ProfileRef, WalkParams) -> Vec<Path>) -> Vec<Path> {
        let tuning = *self.tuning.read();
        if !tuning.prefetch_enabled {
            self.metrics.prefetch_computed(0);
            return Vec::new();
        }
        let Some(tree) = self.registry.get(site) else {
            self.metrics.prefetch_computed(0);
            return Vec::new();
        };
        let paths = walk(
            &tree.root(),
            WalkParams {
                fetch_threshold: tuning.fetch_threshold,
                max_depth: tuning.max_prefetch_depth,
            },
        );
        self.metrics.prefetch_computed(paths.len());
        debug!(site = %site, count = paths.len(), "advisor.prefetch.paths");
        paths
    }

    /// Root profile of `site`, if one exists.
    pub fn profile(&self, site: &SiteKey) -> Option<ProfileRef> {
        self.registry.peek(site).map(|tree| tree.root())
    }

    /// Number of tracked sites.
    pub fn site_count(&self) -> usize {
        self.registry.len()
    }

    /// Tracked sites, most recently used first.
    pub fn sites(&self) -> Vec<SiteKey> {
        self.registry
            .entries()
            .into_iter()
            .map(|(site, _)| site)
            .collect()
    }

    /// Drops every site and its statistics.
    pub fn reset(&self) {
        let sites = self.registry.len();
        self.registry.clear();
        info!(sites, "advisor.reset");
    }

    /// Human-readable dump of every site and its profile.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for (site, tree) in self.registry.entries() {
            let _ = writeln!(out, "{site} [{}]", tree.root_stats());
            let _ = write!(out, "{}", tree.root());
            out.push('\n');
        }
        out
    }
}
