//! Host-side tracking primitives.
//!
//! The host's lazy-loading layer embeds an [`EntityTracker`] in every loaded
//! entity and a [`CollectionTracker`] in every loaded collection. The advisor
//! attaches [`Tracker`] handles to them; when user code first touches an
//! object the host reports it through
//! [`crate::ExtentManager::record_entity_access`] or
//! [`crate::ExtentManager::record_collection_access`], which counts the
//! traversal and grows the profile one level below the touched object.

mod collection;
mod entity;
mod record;
mod tracker;

pub use collection::{CollectionTracker, TrackedCollection};
pub use entity::{Association, EntityTracker, Property, PropertyRegistry, TrackedEntity};
pub use record::EntityRecord;
pub use tracker::Tracker;

pub(crate) use entity::extend_profile;
