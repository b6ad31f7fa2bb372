//! Traversal profiles.
//!
//! Each access site owns one [`ProfileTree`]. A node stands for "an entity
//! reached through this chain of associations"; every outgoing edge carries
//! [`Statistics`] counting how often instances on that edge were loaded and how
//! often they were traversed afterwards.

mod stats;
mod tree;

pub use stats::{Statistics, StatsSnapshot};
pub use tree::{EdgeSnapshot, NodeId, ProfileRef, ProfileTree};
