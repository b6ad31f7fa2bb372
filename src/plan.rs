//! Join plan for a batched eager fetch.
//!
//! Loaders that fetch recommended paths in one round-trip nest one join per
//! path, each attached to the alias of its parent path. [`FetchPlan`] computes
//! that nesting; turning it into query text is left to the loader.

use std::collections::HashMap;
use std::fmt;

use crate::error::{AdvisorError, Result};
use crate::path::Path;

const ALIAS_PREFIX: &str = "af";

/// One eager join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJoin {
    /// Full path from the root entity.
    pub path: Path,
    /// Alias the join hangs off.
    pub parent_alias: String,
    /// Association fetched by this join.
    pub association: String,
    /// Alias assigned to the joined entity.
    pub alias: String,
}

/// Ordered list of joins, parents before children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    root_alias: String,
    joins: Vec<FetchJoin>,
}

impl FetchPlan {
    /// Builds the plan for `paths` below an entity aliased `root_alias`.
    ///
    /// Paths must be non-empty and prefix-complete: a path of length `k > 1`
    /// must come after its parent. Duplicates are joined once.
    pub fn build<'a, I>(root_alias: impl Into<String>, paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let root_alias = root_alias.into();
        let mut aliases: HashMap<Path, String> = HashMap::new();
        let mut joins = Vec::new();
        for path in paths {
            if aliases.contains_key(path) {
                continue;
            }
            let (Some(association), Some(parent)) = (path.last(), path.parent()) else {
                return Err(AdvisorError::InvalidArgument(
                    "fetch plan paths must not be empty".into(),
                ));
            };
            let parent_alias = if parent.is_empty() {
                root_alias.clone()
            } else {
                aliases.get(&parent).cloned().ok_or_else(|| {
                    AdvisorError::InvalidArgument(format!(
                        "path `{path}` precedes its parent `{parent}`"
                    ))
                })?
            };
            let alias = format!("{ALIAS_PREFIX}{}", joins.len());
            aliases.insert(path.clone(), alias.clone());
            joins.push(FetchJoin {
                path: path.clone(),
                parent_alias,
                association: association.to_string(),
                alias,
            });
        }
        Ok(Self { root_alias, joins })
    }

    /// Alias of the root entity.
    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    /// Joins in execution order.
    pub fn joins(&self) -> &[FetchJoin] {
        &self.joins
    }

    /// Returns `true` if nothing is fetched eagerly.
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }
}

impl fmt::Display for FetchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root_alias)?;
        for join in &self.joins {
            write!(f, ", {}.{} as {}", join.parent_alias, join.association, join.alias)?;
        }
        Ok(())
    }
}
