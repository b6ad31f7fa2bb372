use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::collection::TrackedCollection;
use super::entity::{Association, EntityTracker, Property, PropertyRegistry, TrackedEntity};
use crate::error::{AdvisorError, Result};

/// Registration-based [`TrackedEntity`] holding its associations in a map.
///
/// Suited for hosts that materialize rows into generic records and for tests.
pub struct EntityRecord {
    type_name: String,
    tracker: EntityTracker,
    associations: RwLock<HashMap<String, Association>>,
}

impl EntityRecord {
    /// Creates a record of `type_name` with the given associations.
    pub fn new(type_name: impl Into<String>, properties: Arc<[Property]>) -> Self {
        Self {
            type_name: type_name.into(),
            tracker: EntityTracker::new(properties),
            associations: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a record whose associations come from `registry`.
    pub fn from_registry(registry: &PropertyRegistry, type_name: &str) -> Result<Self> {
        let properties = registry.properties(type_name).ok_or_else(|| {
            AdvisorError::InvalidArgument(format!("entity type `{type_name}` is not registered"))
        })?;
        Ok(Self::new(type_name, properties))
    }

    /// Points association `name` at a single entity.
    pub fn set_entity(&self, name: &str, target: Arc<dyn TrackedEntity>) -> Result<()> {
        self.set(name, Association::Entity(target))
    }

    /// Points association `name` at a collection.
    pub fn set_collection(&self, name: &str, target: Arc<TrackedCollection>) -> Result<()> {
        self.set(name, Association::Collection(target))
    }

    /// Empties association `name`.
    pub fn clear(&self, name: &str) -> Result<()> {
        self.ensure_property(name)?;
        self.associations.write().remove(name);
        Ok(())
    }

    fn set(&self, name: &str, value: Association) -> Result<()> {
        self.ensure_property(name)?;
        self.associations.write().insert(name.to_string(), value);
        Ok(())
    }

    fn ensure_property(&self, name: &str) -> Result<()> {
        if self
            .tracker
            .properties()
            .iter()
            .any(|property| property.name() == name)
        {
            Ok(())
        } else {
            Err(AdvisorError::property_not_found(&self.type_name, name))
        }
    }
}

impl TrackedEntity for EntityRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn entity_tracker(&self) -> &EntityTracker {
        &self.tracker
    }

    fn association(&self, name: &str) -> Result<Option<Association>> {
        self.ensure_property(name)?;
        Ok(self.associations.read().get(name).cloned())
    }
}
