use std::sync::Arc;

use prefetch_advisor::tracking::{Association, EntityTracker};
use prefetch_advisor::{
    AdvisorConfig, AdvisorError, CounterMetrics, EntityRecord, ExtentManager, Path, Property,
    PropertyRegistry, SiteKey, TrackedCollection, TrackedEntity,
};

fn employee_registry() -> PropertyRegistry {
    let registry = PropertyRegistry::new();
    registry.register(
        "Employee",
        [
            Property::entity("mentor"),
            Property::collection("subordinates"),
            Property::entity("supervisor"),
        ],
    );
    registry
}

fn employee(registry: &PropertyRegistry) -> Arc<EntityRecord> {
    Arc::new(EntityRecord::from_registry(registry, "Employee").unwrap())
}

#[test]
fn entity_access_extends_profile_for_loaded_associations() {
    let registry = employee_registry();
    let manager = ExtentManager::new();
    let site = SiteKey::new("Employee");

    let dave = employee(&registry);
    let ed = employee(&registry);
    dave.set_entity("mentor", ed.clone()).unwrap();
    dave.set_collection("subordinates", Arc::new(TrackedCollection::default()))
        .unwrap();

    manager.record_root_access(dave.as_ref(), &site);
    assert_eq!(dave.entity_tracker().trackers().len(), 1);
    assert!(manager.prefetch_paths(&site).is_empty());

    manager.record_entity_access(dave.as_ref());
    let root = manager.profile(&site).unwrap();
    assert_eq!(root.association_names(), vec!["mentor", "subordinates"]);
    assert_eq!(root.is_collection_edge("subordinates"), Some(true));
    assert_eq!(ed.entity_tracker().trackers().len(), 1);

    manager.record_entity_access(ed.as_ref());
    manager.record_entity_access(ed.as_ref());
    let mentor = root.child_stats("mentor").unwrap();
    assert_eq!((mentor.total(), mentor.accessed()), (1, 1));
    assert_eq!(manager.prefetch_paths(&site), vec![Path::from("mentor")]);
}

#[test]
fn collection_access_extends_every_element() {
    let registry = employee_registry();
    let manager = ExtentManager::new();
    let site = SiteKey::new("Employee");

    let dave = employee(&registry);
    let (alice, bob) = (employee(&registry), employee(&registry));
    let (alice_mentor, bob_mentor) = (employee(&registry), employee(&registry));
    alice.set_entity("mentor", alice_mentor.clone()).unwrap();
    bob.set_entity("mentor", bob_mentor).unwrap();
    let elements: Vec<Arc<dyn TrackedEntity>> = vec![alice, bob];
    let subordinates = Arc::new(TrackedCollection::new(elements));
    dave.set_collection("subordinates", subordinates.clone())
        .unwrap();

    manager.record_root_access(dave.as_ref(), &site);
    manager.record_entity_access(dave.as_ref());
    manager.record_collection_access(&subordinates);
    manager.record_entity_access(alice_mentor.as_ref());

    let root = manager.profile(&site).unwrap();
    let collection = root.child("subordinates").unwrap();
    let mentor = collection.child_stats("mentor").unwrap();
    assert_eq!((mentor.total(), mentor.accessed()), (2, 1));
    assert_eq!(
        manager.prefetch_paths(&site),
        vec![Path::from("subordinates"), Path::from("subordinates.mentor")]
    );
}

#[test]
fn cached_root_is_counted_as_traversed_immediately() {
    let registry = employee_registry();
    let manager = ExtentManager::new();
    let site = SiteKey::new("Employee");

    let dave = employee(&registry);
    let ed = employee(&registry);
    dave.set_entity("supervisor", ed.clone()).unwrap();
    // touched before the load reported it, e.g. served from a session cache
    manager.record_entity_access(dave.as_ref());
    assert!(dave.entity_tracker().is_accessed());

    manager.record_root_access(dave.as_ref(), &site);
    let root = manager.profile(&site).unwrap();
    let root_stats = root.tree().root_stats();
    assert_eq!((root_stats.total(), root_stats.accessed()), (1, 1));
    assert!(root.has_child("supervisor"));
    assert!(dave.entity_tracker().trackers().is_empty());

    manager.record_entity_access(ed.as_ref());
    assert_eq!(manager.prefetch_paths(&site), vec![Path::from("supervisor")]);
}

#[test]
fn suspended_tracking_ignores_access() {
    let registry = employee_registry();
    let manager = ExtentManager::new();
    let site = SiteKey::new("Employee");
    let dave = employee(&registry);
    manager.record_root_access(dave.as_ref(), &site);

    assert!(dave.entity_tracker().set_tracking(false));
    manager.record_entity_access(dave.as_ref());
    assert!(!dave.entity_tracker().is_accessed());
    assert_eq!(manager.profile(&site).unwrap().tree().root_stats().accessed(), 0);

    assert!(!dave.entity_tracker().set_tracking(true));
    manager.record_entity_access(dave.as_ref());
    assert_eq!(manager.profile(&site).unwrap().tree().root_stats().accessed(), 1);
}

#[test]
fn depth_bound_stops_propagation() {
    let registry = employee_registry();
    let metrics = Arc::new(CounterMetrics::default());
    let manager = ExtentManager::with_config(AdvisorConfig {
        max_prefetch_depth: 1,
        ..AdvisorConfig::default()
    })
    .unwrap()
    .with_metrics(metrics.clone());
    let site = SiteKey::new("Employee");

    let dave = employee(&registry);
    let ed = employee(&registry);
    let frank = employee(&registry);
    dave.set_entity("supervisor", ed.clone()).unwrap();
    ed.set_entity("supervisor", frank.clone()).unwrap();

    manager.record_root_access(dave.as_ref(), &site);
    manager.record_entity_access(dave.as_ref());
    manager.record_entity_access(ed.as_ref());

    assert!(frank.entity_tracker().trackers().is_empty());
    assert_eq!(metrics.snapshot().sub_profiles_refused, 1);
    let supervisor = manager.profile(&site).unwrap().child("supervisor").unwrap();
    assert!(supervisor.is_empty());
}

/// Entity whose capability fails for one of its declared associations.
struct Partial {
    tracker: EntityTracker,
    mentor: Arc<EntityRecord>,
}

impl TrackedEntity for Partial {
    fn type_name(&self) -> &str {
        "Partial"
    }

    fn entity_tracker(&self) -> &EntityTracker {
        &self.tracker
    }

    fn association(&self, name: &str) -> prefetch_advisor::Result<Option<Association>> {
        match name {
            "mentor" => Ok(Some(Association::Entity(self.mentor.clone()))),
            other => Err(AdvisorError::PropertyNotFound {
                entity: "Partial".into(),
                property: other.into(),
            }),
        }
    }
}

#[test]
fn failing_property_lookup_is_skipped() {
    let registry = employee_registry();
    let manager = ExtentManager::new();
    let site = SiteKey::new("Partial");
    let partial = Partial {
        tracker: EntityTracker::new(Arc::from(vec![
            Property::entity("legacy"),
            Property::entity("mentor"),
        ])),
        mentor: employee(&registry),
    };

    manager.record_root_access(&partial, &site);
    manager.record_entity_access(&partial);

    let root = manager.profile(&site).unwrap();
    assert_eq!(root.association_names(), vec!["mentor"]);
    assert_eq!(partial.mentor.entity_tracker().trackers().len(), 1);
}

#[test]
fn detached_trackers_are_not_counted() {
    let registry = employee_registry();
    let manager = ExtentManager::new();
    let site = SiteKey::new("Employee");

    let dave = employee(&registry);
    let subordinates = Arc::new(TrackedCollection::default());
    dave.set_collection("subordinates", subordinates.clone())
        .unwrap();
    assert_eq!(dave.type_name(), "Employee");

    manager.record_root_access(dave.as_ref(), &site);
    let attached = dave.entity_tracker().trackers();
    assert!(dave.entity_tracker().remove_tracker(&attached[0]));
    assert!(!dave.entity_tracker().remove_tracker(&attached[0]));
    manager.record_entity_access(dave.as_ref());
    let root = manager.profile(&site).unwrap();
    assert_eq!(root.tree().root_stats().accessed(), 0);
    assert!(root.is_empty());

    // the collection edge is created through a second, still attached root load
    let eve = employee(&registry);
    eve.set_collection("subordinates", subordinates.clone())
        .unwrap();
    manager.record_root_access(eve.as_ref(), &site);
    manager.record_entity_access(eve.as_ref());
    let handles = subordinates.tracker().trackers();
    assert_eq!(handles.len(), 1);
    assert!(subordinates.tracker().remove_tracker(&handles[0]));
    manager.record_collection_access(&subordinates);

    let stats = root.child_stats("subordinates").unwrap();
    assert_eq!((stats.total(), stats.accessed()), (1, 0));
}
