use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::collection::TrackedCollection;
use super::tracker::Tracker;
use crate::error::Result;
use crate::manager::ExtentManager;

/// A persistent association of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Property {
    name: String,
    collection: bool,
}

impl Property {
    /// Single-valued association.
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: false,
        }
    }

    /// Collection-valued association.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: true,
        }
    }

    /// Association name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the association holds a collection.
    pub fn is_collection(&self) -> bool {
        self.collection
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.collection {
            f.write_str("<C>")?;
        }
        Ok(())
    }
}

/// Explicit registration of association properties per entity type.
#[derive(Default)]
pub struct PropertyRegistry {
    types: RwLock<HashMap<String, Arc<[Property]>>>,
}

impl PropertyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the associations of `type_name`.
    pub fn register<I>(&self, type_name: impl Into<String>, properties: I) -> Arc<[Property]>
    where
        I: IntoIterator<Item = Property>,
    {
        let properties: Arc<[Property]> = properties.into_iter().collect();
        self.types
            .write()
            .insert(type_name.into(), Arc::clone(&properties));
        properties
    }

    /// Associations registered for `type_name`.
    pub fn properties(&self, type_name: &str) -> Option<Arc<[Property]>> {
        self.types.read().get(type_name).cloned()
    }
}

/// Value of an association as seen by the tracking layer.
#[derive(Clone)]
pub enum Association {
    /// A single entity, possibly an unloaded proxy.
    Entity(Arc<dyn TrackedEntity>),
    /// A collection, possibly uninitialized.
    Collection(Arc<TrackedCollection>),
}

/// Capability the host implements for each tracked entity type.
///
/// Replaces runtime reflection: the host answers association lookups by name.
pub trait TrackedEntity: Send + Sync {
    /// Entity type name, used in error messages.
    fn type_name(&self) -> &str;

    /// Tracking state embedded in the entity.
    fn entity_tracker(&self) -> &EntityTracker;

    /// Current value of association `name`.
    ///
    /// Returns `Ok(None)` for an empty association and
    /// [`crate::AdvisorError::PropertyNotFound`] for a name the type does not have.
    fn association(&self, name: &str) -> Result<Option<Association>>;
}

/// Per-entity tracking state: accessed flag, tracking switch and the
/// statistics handles attached by every path the entity was reached through.
pub struct EntityTracker {
    properties: Arc<[Property]>,
    accessed: AtomicBool,
    tracking: AtomicBool,
    trackers: Mutex<Vec<Arc<Tracker>>>,
}

impl EntityTracker {
    /// Creates tracking state for an entity with the given associations.
    pub fn new(properties: Arc<[Property]>) -> Self {
        Self {
            properties,
            accessed: AtomicBool::new(false),
            tracking: AtomicBool::new(true),
            trackers: Mutex::new(Vec::new()),
        }
    }

    /// Associations of the entity's type.
    pub fn properties(&self) -> &Arc<[Property]> {
        &self.properties
    }

    /// Whether user code has touched the entity.
    pub fn is_accessed(&self) -> bool {
        self.accessed.load(Ordering::Acquire)
    }

    /// Whether accesses are currently recorded.
    pub fn is_tracking(&self) -> bool {
        self.tracking.load(Ordering::Acquire)
    }

    /// Switches recording on or off; returns the previous setting.
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

    pub(crate) fn track_access(&self, entity: &dyn TrackedEntity, manager: &ExtentManager) {
        if !self.is_tracking() || self.accessed.swap(true, Ordering::AcqRel) {
            return;
        }
        for tracker in self.trackers() {
            if manager.record_traversal(&tracker) {
                extend_profile(entity, &tracker, manager);
            }
        }
    }
}

impl fmt::Debug for EntityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTracker")
            .field("properties", &self.properties)
            .field("accessed", &self.is_accessed())
            .field("tracking", &self.is_tracking())
            .field("trackers", &self.trackers.lock().len())
            .finish()
    }
}

/// Extends the profile one level below `tracker` for every association
/// `entity` currently holds, attaching a fresh handle to each target.
pub(crate) fn extend_profile(entity: &dyn TrackedEntity, tracker: &Tracker, manager: &ExtentManager) {
    for property in entity.entity_tracker().properties().iter() {
        let value = match entity.association(property.name()) {
            Ok(Some(value)) => value,
            Ok(None) => continue,
            Err(err) => {
                debug!(
                    entity = entity.type_name(),
                    property = property.name(),
                    error = %err,
                    "advisor.tracking.property_skipped"
                );
                continue;
            }
        };
        let Some(child) = manager.extend_tracker(tracker, property.name(), property.is_collection())
        else {
            continue;
        };
        match value {
            Association::Entity(target) => target.entity_tracker().add_tracker(child),
            Association::Collection(target) => target.tracker().add_tracker(child),
        }
    }
}
