//! Adaptive prefetch advisor for lazily loaded object graphs.
//!
//! The advisor watches which associations of a loaded entity are actually
//! traversed after a load from a given access site, aggregates the outcome
//! per site in a [`profile::ProfileTree`], and recommends on the next load
//! from that site which association [`Path`]s to fetch eagerly.
//!
//! ```
//! use prefetch_advisor::{ExtentManager, Path, SiteKey};
//!
//! let manager = ExtentManager::new();
//! let site = SiteKey::new("Employee");
//! assert!(manager.prefetch_paths(&site).is_empty());
//!
//! let root = manager.root_tracker(&site);
//! manager.record_traversal(&root);
//! let mentor = manager.extend_tracker(&root, "mentor", false).unwrap();
//! manager.record_traversal(&mentor);
//!
//! assert_eq!(manager.prefetch_paths(&site), vec![Path::from("mentor")]);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod manager;
pub mod path;
pub mod plan;
pub mod profile;
pub mod site;
pub mod tracking;

pub use error::{AdvisorError, Result};
pub use manager::{AdvisorConfig, AdvisorMetrics, ConfigError, CounterMetrics, ExtentManager};
pub use path::Path;
pub use plan::{FetchJoin, FetchPlan};
pub use site::{Frame, FrameFilter, SiteKey};
pub use tracking::{EntityRecord, Property, PropertyRegistry, TrackedCollection, TrackedEntity, Tracker};
