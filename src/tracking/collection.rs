use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::entity::{extend_profile, TrackedEntity};
use super::tracker::Tracker;
use crate::manager::ExtentManager;

/// Tracking state of one loaded collection.
pub struct CollectionTracker {
    accessed: AtomicBool,
    tracking: AtomicBool,
    trackers: Mutex<Vec<Arc<Tracker>>>,
}

impl Default for CollectionTracker {
    fn default() -> Self {
        Self {
            accessed: AtomicBool::new(false),
            tracking: AtomicBool::new(true),
            trackers: Mutex::new(Vec::new()),
        }
    }
}

impl CollectionTracker {
    /// Creates untouched tracking state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether user code has iterated or inspected the collection.
    pub fn is_accessed(&self) -> bool {
        self.accessed.load(Ordering::Acquire)
    }

    /// Whether accesses are currently recorded.
    pub fn is_tracking(&self) -> bool {
        self.tracking.load(Ordering::Acquire)
    }

    /// Switches recording on or off; returns the previous setting.
    ///
    /// Hosts turn tracking off while they initialize the collection themselves.
    pub fn set_tracking(&self, tracking: bool) -> bool {
        self.tracking.swap(tracking, Ordering::AcqRel)
    }

    /// Attaches a statistics handle.
    pub fn add_tracker(&self, tracker: Arc<Tracker>) {
        self.trackers.lock().push(tracker);
    }

    /// Handles attached so far.
    pub fn trackers(&self) -> Vec<Arc<Tracker>> {
        self.trackers.lock().clone()
    }

    /// Detaches a handle; returns `true` if it was attached.
    pub fn remove_tracker(&self, tracker: &Arc<Tracker>) -> bool {
        let mut trackers = self.trackers.lock();
        let before = trackers.len();
        trackers.retain(|attached| !Arc::ptr_eq(attached, tracker));
        trackers.len() != before
    }

    pub(crate) fn track_access(&self, elements: &[Arc<dyn TrackedEntity>], manager: &ExtentManager) {
        if !self.is_tracking() || self.accessed.swap(true, Ordering::AcqRel) {
            return;
        }
        let fresh: Vec<Arc<Tracker>> = self
            .trackers()
            .into_iter()
            .filter(|tracker| manager.record_traversal(tracker))
            .collect();
        for element in elements {
            for tracker in &fresh {
                extend_profile(element.as_ref(), tracker, manager);
            }
        }
    }
}

/// A collection association: tracking state plus its current elements.
#[derive(Default)]
pub struct TrackedCollection {
    tracker: CollectionTracker,
    elements: RwLock<Vec<Arc<dyn TrackedEntity>>>,
}

impl TrackedCollection {
    /// Creates a collection holding `elements`.
    pub fn new(elements: Vec<Arc<dyn TrackedEntity>>) -> Self {
        Self {
            tracker: CollectionTracker::new(),
            elements: RwLock::new(elements),
        }
    }

    /// Tracking state of the collection.
    pub fn tracker(&self) -> &CollectionTracker {
        &self.tracker
    }

    /// Current elements.
    pub fn elements(&self) -> Vec<Arc<dyn TrackedEntity>> {
        self.elements.read().clone()
    }

    /// Replaces the elements, e.g. once a lazy collection is initialized.
    pub fn set_elements(&self, elements: Vec<Arc<dyn TrackedEntity>>) {
        *self.elements.write() = elements;
    }

    /// Adds one element.
    pub fn push(&self, element: Arc<dyn TrackedEntity>) {
        self.elements.write().push(element);
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    /// Returns `true` if the collection holds no element.
    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }
}
