use crate::path::Path;
use crate::profile::ProfileRef;

/// Parameters of one recommendation walk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WalkParams {
    pub(crate) fetch_threshold: f64,
    pub(crate) max_depth: usize,
}

/// Collects the paths under `root` whose joint traversal probability exceeds
/// the threshold.
///
/// Output is depth-first pre-order, so every path is preceded by its parent
/// path. Once a collection edge is taken, no further collection edge is taken
/// on the same path; sibling branches are unaffected.
pub(crate) fn prefetch_paths(root: &ProfileRef, params: WalkParams) -> Vec<Path> {
    let mut paths = Vec::new();
    walk(root, &Path::empty(), 1.0, false, params, &mut paths);
    paths
}

/// Like [`prefetch_paths`], for a profile whose root is reached through a
/// collection edge that the caller prepends to every path.
///
/// The collection already occupies one level and the one collection a path
/// may hold, so the walk takes no collection edge and stops one level early.
pub(crate) fn collection_role_paths(root: &ProfileRef, params: WalkParams) -> Vec<Path> {
    let params = WalkParams {
        max_depth: params.max_depth.saturating_sub(1),
        ..params
    };
    let mut paths = Vec::new();
    walk(root, &Path::empty(), 1.0, true, params, &mut paths);
    paths
}

fn walk(
    node: &ProfileRef,
    prefix: &Path,
    probability: f64,
    collection_on_path: bool,
    params: WalkParams,
    out: &mut Vec<Path>,
) {
    if prefix.len() >= params.max_depth {
        return;
    }
    for edge in node.edges() {
        if collection_on_path && edge.collection {
            continue;
        }
        let combined = edge.stats.access_ratio() * probability;
        if combined <= params.fetch_threshold {
            continue;
        }
        let path = prefix.append(edge.name.as_str());
        out.push(path.clone());
        walk(
            &edge.child,
            &path,
            combined,
            collection_on_path || edge.collection,
            params,
            out,
        );
    }
}
