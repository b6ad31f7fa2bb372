use std::io::Write;
use std::sync::Arc;

use prefetch_advisor::{
    AdvisorConfig, CounterMetrics, ExtentManager, Frame, FrameFilter, Path, SiteKey,
};

fn learn(manager: &ExtentManager, site: &SiteKey, name: &str) {
    let root = manager.root_tracker(site);
    let child = manager.extend_tracker(&root, name, false).unwrap();
    manager.record_traversal(&child);
}

#[test]
fn bounded_registry_evicts_least_recently_used_site() {
    let metrics = Arc::new(CounterMetrics::default());
    let manager = ExtentManager::with_config(AdvisorConfig {
        max_sites: Some(2),
        ..AdvisorConfig::default()
    })
    .unwrap()
    .with_metrics(metrics.clone());
    let (a, b, c) = (SiteKey::new("A"), SiteKey::new("B"), SiteKey::new("C"));

    learn(&manager, &a, "mentor");
    learn(&manager, &b, "mentor");
    // touching A makes B the eviction candidate
    assert_eq!(manager.prefetch_paths(&a).len(), 1);
    learn(&manager, &c, "mentor");

    assert_eq!(manager.site_count(), 2);
    assert!(manager.profile(&b).is_none());
    assert!(manager.prefetch_paths(&b).is_empty());
    assert_eq!(manager.prefetch_paths(&a), vec![Path::from("mentor")]);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.sites_created, 3);
    assert_eq!(snapshot.sites_evicted, 1);
    assert_eq!(snapshot.traversals_recorded, 3);
}

#[test]
fn unbounded_registry_keeps_every_site() {
    let manager = ExtentManager::new();
    for idx in 0..100 {
        learn(&manager, &SiteKey::new(format!("Site{idx}")), "mentor");
    }
    assert_eq!(manager.site_count(), 100);
    assert_eq!(manager.sites().len(), 100);
}

#[test]
fn reset_starts_a_new_measurement_window() {
    let metrics = Arc::new(CounterMetrics::default());
    let manager = ExtentManager::new().with_metrics(metrics.clone());
    let site = SiteKey::new("Employee");
    learn(&manager, &site, "mentor");
    assert_eq!(manager.prefetch_paths(&site).len(), 1);

    manager.reset();
    assert_eq!(manager.site_count(), 0);
    assert!(manager.prefetch_paths(&site).is_empty());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.prefetch_requests, 2);
    assert_eq!(snapshot.prefetch_empty, 1);
    assert_eq!(snapshot.paths_recommended, 1);
}

#[test]
fn caller_location_distinguishes_sites() {
    let keys: Vec<SiteKey> = (0..2).map(|_| SiteKey::here("Employee")).collect();
    let elsewhere = SiteKey::here("Employee");

    assert_eq!(keys[0], keys[1]);
    assert_ne!(keys[0], elsewhere);
    assert_ne!(keys[0], SiteKey::new("Employee"));

    let manager = ExtentManager::new();
    learn(&manager, &keys[0], "mentor");
    learn(&manager, &elsewhere, "supervisor");
    assert_eq!(manager.prefetch_paths(&keys[1]), vec![Path::from("mentor")]);
}

#[test]
fn stack_fingerprint_drops_host_frames() {
    let filter = FrameFilter::default()
        .exclude("orm::")
        .allow("orm::tests")
        .max_frames(2);
    let raw = |line| {
        vec![
            Frame::new("orm::session", "load", 10),
            Frame::native("libc", "memcpy"),
            Frame::new("app::service", "list_team", line),
            Frame::new("orm::tests::fixtures", "seed", 3),
            Frame::new("app::main", "main", 1),
        ]
    };

    let first = SiteKey::from_frames("Employee", raw(42), &filter);
    let again = SiteKey::from_frames("Employee", raw(42), &filter);
    let moved = SiteKey::from_frames("Employee", raw(43), &filter);

    assert_eq!(first, again);
    assert_ne!(first, moved);
    assert_eq!(
        first.frames(),
        &[
            Frame::new("app::service", "list_team", 42),
            Frame::new("orm::tests::fixtures", "seed", 3),
        ]
    );
}

#[test]
fn manager_built_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "fetch_threshold = 0.25").unwrap();
    writeln!(file, "max_prefetch_depth = 2").unwrap();
    writeln!(file, "max_sites = 16").unwrap();

    let config = AdvisorConfig::load(file.path()).unwrap();
    let manager = ExtentManager::with_config(config).unwrap();
    let effective = manager.config();
    assert_eq!(effective.fetch_threshold, 0.25);
    assert_eq!(effective.max_prefetch_depth, 2);
    assert_eq!(effective.max_sites, Some(16));
    assert!(effective.prefetch_enabled);

    let site = SiteKey::new("Employee");
    for i in 0..10 {
        let root = manager.root_tracker(&site);
        let child = manager.extend_tracker(&root, "supervisor", false).unwrap();
        if i < 3 {
            manager.record_traversal(&child);
        }
    }
    assert_eq!(manager.prefetch_paths(&site), vec![Path::from("supervisor")]);
}

#[test]
fn invalid_config_is_rejected() {
    let config = AdvisorConfig {
        fetch_threshold: 1.5,
        ..AdvisorConfig::default()
    };
    assert!(ExtentManager::with_config(config).is_err());
}
