use crate::{clause::Join, construct::NodeId};

/// A join level in the arena. `join.deep_joins` is always empty here; nesting lives in
/// `children`.
#[derive(Debug, Clone)]
pub struct JoinNode {
    pub join: Join,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Joins stored as an arena-indexed tree, flattened from [`Join::deep_joins`] on insertion.
#[derive(Debug, Clone, Default)]
pub struct ConstructJoin {
    nodes: Vec<JoinNode>,
    roots: Vec<NodeId>,
}

impl ConstructJoin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, join: Join) -> NodeId {
        let id = self.insert(join, None);
        self.roots.push(id);
        id
    }

    pub fn add_all(&mut self, joins: impl IntoIterator<Item = Join>) {
        for join in joins {
            self.add(join);
        }
    }

    fn insert(&mut self, mut join: Join, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        let deep_joins = std::mem::take(&mut join.deep_joins);
        self.nodes.push(JoinNode {
            join,
            parent,
            children: Vec::new(),
        });
        let children: Vec<NodeId> = deep_joins
            .into_iter()
            .map(|child| self.insert(child, Some(id)))
            .collect();
        self.nodes[id].children = children;
        id
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of top-level joins.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &JoinNode {
        &self.nodes[id]
    }

    pub fn join(&self, id: NodeId) -> &Join {
        &self.nodes[id].join
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// All nodes, parents before children.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &JoinNode)> {
        self.nodes.iter().enumerate()
    }

    /// Rebuilds the value tree rooted at `id`.
    pub fn to_join(&self, id: NodeId) -> Join {
        let mut join = self.nodes[id].join.clone();
        join.deep_joins = self.nodes[id]
            .children
            .iter()
            .map(|child| self.to_join(*child))
            .collect();
        join
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::JoinOperator;

    #[test]
    fn test_deep_joins_are_flattened() {
        let mut joins = ConstructJoin::new();
        joins.add(Join::make_deep("a.b.c", JoinOperator::Inner));
        joins.add(Join::make("d"));

        assert_eq!(joins.len(), 2);
        let a = joins.roots()[0];
        let b = joins.children(a)[0];
        let c = joins.children(b)[0];
        assert_eq!(joins.join(c).table, "c");
        assert_eq!(joins.node(c).parent, Some(b));
        assert!(joins.join(a).deep_joins.is_empty());
        assert_eq!(joins.iter().count(), 4);
    }

    #[test]
    fn test_to_join_restores_tree() {
        let original = Join::make_deep_as("pets.toys", "toy", JoinOperator::Left);
        let mut joins = ConstructJoin::new();
        let id = joins.add(original.clone());
        assert_eq!(joins.to_join(id), original);
    }
}
