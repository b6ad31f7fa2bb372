use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::stats::Statistics;

/// Index of a node inside a [`ProfileTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone)]
struct ProfileEdge {
    child: NodeId,
    stats: Arc<Statistics>,
    collection: bool,
}

struct ProfileNode {
    level: usize,
    parent: Option<NodeId>,
    edges: BTreeMap<String, ProfileEdge>,
}

/// Traversal statistics for one access site, stored as an arena of nodes.
///
/// Nodes are only ever appended; an id handed out stays valid for the
/// lifetime of the tree.
pub struct ProfileTree {
    nodes: RwLock<Vec<ProfileNode>>,
    root_stats: Arc<Statistics>,
}

impl ProfileTree {
    /// Creates a tree holding only the root node.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: RwLock::new(vec![ProfileNode {
                level: 0,
                parent: None,
                edges: BTreeMap::new(),
            }]),
            root_stats: Arc::new(Statistics::new()),
        })
    }

    /// Handle to the root node.
    pub fn root(self: &Arc<Self>) -> ProfileRef {
        ProfileRef {
            tree: Arc::clone(self),
            node: NodeId::ROOT,
        }
    }

    /// Counters for loads of the site's root entity.
    pub fn root_stats(&self) -> &Arc<Statistics> {
        &self.root_stats
    }

    /// Number of nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }
}

/// One outgoing edge of a node, copied out under a single read lock.
#[derive(Clone, Debug)]
pub struct EdgeSnapshot {
    /// Association name.
    pub name: String,
    /// Node the association leads to.
    pub child: ProfileRef,
    /// Counters of the edge.
    pub stats: Arc<Statistics>,
    /// Whether the association is a collection.
    pub collection: bool,
}

/// Handle to one node of a [`ProfileTree`].
#[derive(Clone)]
pub struct ProfileRef {
    tree: Arc<ProfileTree>,
    node: NodeId,
}

impl ProfileRef {
    /// The tree this node belongs to.
    pub fn tree(&self) -> &Arc<ProfileTree> {
        &self.tree
    }

    /// Arena index of this node.
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Depth of the node; the root is level 0.
    pub fn level(&self) -> usize {
        self.tree.nodes.read()[self.node.index()].level
    }

    /// Parent node, `None` at the root.
    pub fn parent(&self) -> Option<ProfileRef> {
        let parent = self.tree.nodes.read()[self.node.index()].parent?;
        Some(self.at(parent))
    }

    /// Root node of the same tree.
    pub fn root(&self) -> ProfileRef {
        self.at(NodeId::ROOT)
    }

    /// Returns `true` for the root node.
    pub fn is_root(&self) -> bool {
        self.node == NodeId::ROOT
    }

    /// Returns `true` if `name` has been observed under this node.
    pub fn has_child(&self, name: &str) -> bool {
        self.tree.nodes.read()[self.node.index()]
            .edges
            .contains_key(name)
    }

    /// Node reached through `name`.
    pub fn child(&self, name: &str) -> Option<ProfileRef> {
        let child = self.edge(name)?.child;
        Some(self.at(child))
    }

    /// Counters of the edge `name`.
    pub fn child_stats(&self, name: &str) -> Option<Arc<Statistics>> {
        self.edge(name).map(|edge| edge.stats)
    }

    /// Whether the edge `name` is a collection association.
    pub fn is_collection_edge(&self, name: &str) -> Option<bool> {
        self.edge(name).map(|edge| edge.collection)
    }

    /// Association names in lexicographic order.
    pub fn association_names(&self) -> Vec<String> {
        self.tree.nodes.read()[self.node.index()]
            .edges
            .keys()
            .cloned()
            .collect()
    }

    /// Number of outgoing associations.
    pub fn child_count(&self) -> usize {
        self.tree.nodes.read()[self.node.index()].edges.len()
    }

    /// Returns `true` if no association has been observed under this node.
    pub fn is_empty(&self) -> bool {
        self.child_count() == 0
    }

    /// Copies all outgoing edges, in lexicographic order, under one read lock.
    pub fn edges(&self) -> Vec<EdgeSnapshot> {
        let nodes = self.tree.nodes.read();
        nodes[self.node.index()]
            .edges
            .iter()
            .map(|(name, edge)| EdgeSnapshot {
                name: name.clone(),
                child: self.at(edge.child),
                stats: Arc::clone(&edge.stats),
                collection: edge.collection,
            })
            .collect()
    }

    /// Adds the association `name` under this node unless `level >= max_depth`.
    ///
    /// Returns the existing child when the association is already known, so
    /// concurrent first observations of the same name share one node.
    pub fn add_child(&self, name: &str, collection: bool, max_depth: usize) -> Option<ProfileRef> {
        let mut nodes = self.tree.nodes.write();
        let parent = &nodes[self.node.index()];
        if let Some(edge) = parent.edges.get(name) {
            return Some(self.at(edge.child));
        }
        let level = parent.level;
        if level >= max_depth {
            return None;
        }
        let child = NodeId(nodes.len() as u32);
        nodes.push(ProfileNode {
            level: level + 1,
            parent: Some(self.node),
            edges: BTreeMap::new(),
        });
        nodes[self.node.index()].edges.insert(
            name.to_string(),
            ProfileEdge {
                child,
                stats: Arc::new(Statistics::new()),
                collection,
            },
        );
        Some(self.at(child))
    }

    fn edge(&self, name: &str) -> Option<ProfileEdge> {
        self.tree.nodes.read()[self.node.index()]
            .edges
            .get(name)
            .cloned()
    }

    fn at(&self, node: NodeId) -> ProfileRef {
        ProfileRef {
            tree: Arc::clone(&self.tree),
            node,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        for edge in self.edges() {
            write!(f, "{:indent$}- {}", "", edge.name)?;
            if edge.collection {
                f.write_str("(C)")?;
            }
            writeln!(f, " : {}", edge.stats)?;
            edge.child.render(f, indent + 2)?;
        }
        Ok(())
    }
}

impl PartialEq for ProfileRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.node == other.node
    }
}

impl Eq for ProfileRef {}

impl fmt::Display for ProfileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

impl fmt::Debug for ProfileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileRef")
            .field("node", &self.node)
            .field("level", &self.level())
            .finish()
    }
}
