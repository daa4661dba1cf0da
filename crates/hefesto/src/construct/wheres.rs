use crate::{
    clause::{Backend, Where, WhereClause, WhereCustom, WhereExist, WhereField},
    construct::NodeId,
    operator::WhereOperator,
};

/// A node of the where arena; groups keep the ids of their children in order.
#[derive(Debug)]
pub enum WhereNode<B: Backend> {
    Where(Where<B>),
    Field(WhereField),
    Exist(WhereExist<B>),
    Custom(WhereCustom<B>),
    Group {
        where_operation: WhereOperator,
        children: Vec<NodeId>,
    },
}

impl<B: Backend> WhereNode<B> {
    pub fn where_operation(&self) -> WhereOperator {
        match self {
            WhereNode::Where(w) => w.where_operation,
            WhereNode::Field(w) => w.where_operation,
            WhereNode::Exist(w) => w.where_operation,
            WhereNode::Custom(w) => w.where_operation,
            WhereNode::Group {
                where_operation, ..
            } => *where_operation,
        }
    }
}

#[derive(Debug)]
struct Slot<B: Backend> {
    node: WhereNode<B>,
    parent: Option<NodeId>,
}

/// Where clauses stored as an arena-indexed tree.
///
/// [`CollectionWhere`](crate::clause::CollectionWhere) values are flattened into group nodes on
/// insertion; translators walk [`ConstructWhere::roots`] and recurse through group children.
#[derive(Debug)]
pub struct ConstructWhere<B: Backend> {
    nodes: Vec<Slot<B>>,
    roots: Vec<NodeId>,
}

impl<B: Backend> Default for ConstructWhere<B> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }
}

impl<B: Backend> ConstructWhere<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, clause: impl Into<WhereClause<B>>) -> NodeId {
        let id = self.insert(clause.into(), None);
        self.roots.push(id);
        id
    }

    pub fn add_all<I>(&mut self, clauses: I)
    where
        I: IntoIterator,
        I::Item: Into<WhereClause<B>>,
    {
        for clause in clauses {
            self.add(clause);
        }
    }

    /// Moves every root of `other` under a new group node attached with `where_operation`.
    ///
    /// Nothing is added when `other` is empty.
    pub fn graft(&mut self, other: ConstructWhere<B>, where_operation: WhereOperator) {
        if other.is_empty() {
            return;
        }

        let group = self.nodes.len();
        self.nodes.push(Slot {
            node: WhereNode::Group {
                where_operation,
                children: Vec::new(),
            },
            parent: None,
        });

        let offset = self.nodes.len();
        for slot in other.nodes {
            let parent = Some(slot.parent.map(|p| p + offset).unwrap_or(group));
            let node = match slot.node {
                WhereNode::Group {
                    where_operation,
                    children,
                } => WhereNode::Group {
                    where_operation,
                    children: children.into_iter().map(|c| c + offset).collect(),
                },
                leaf => leaf,
            };
            self.nodes.push(Slot {
                node,
                parent,
            });
        }

        let children: Vec<NodeId> = other.roots.iter().map(|r| r + offset).collect();
        if let WhereNode::Group {
            children: slot, ..
        } = &mut self.nodes[group].node
        {
            *slot = children;
        }
        self.roots.push(group);
    }

    fn insert(&mut self, clause: WhereClause<B>, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        let node = match clause {
            WhereClause::Where(w) => WhereNode::Where(w),
            WhereClause::Field(w) => WhereNode::Field(w),
            WhereClause::Exist(w) => WhereNode::Exist(w),
            WhereClause::Custom(w) => WhereNode::Custom(w),
            WhereClause::Collection(collection) => {
                self.nodes.push(Slot {
                    node: WhereNode::Group {
                        where_operation: collection.where_operation,
                        children: Vec::new(),
                    },
                    parent,
                });
                let children: Vec<NodeId> = collection
                    .wheres
                    .into_iter()
                    .map(|child| self.insert(child, Some(id)))
                    .collect();
                if let WhereNode::Group {
                    children: slot, ..
                } = &mut self.nodes[id].node
                {
                    *slot = children;
                }
                return id;
            }
        };
        self.nodes.push(Slot {
            node,
            parent,
        });
        id
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of top-level clauses.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &WhereNode<B> {
        &self.nodes[id].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id].node {
            WhereNode::Group {
                children, ..
            } => children,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clause::CollectionWhere, operator::Operator};

    #[derive(Debug)]
    struct Plain;

    impl Backend for Plain {
        type SubQuery = ();
        type Custom = String;
    }

    fn leaf_field(wheres: &ConstructWhere<Plain>, id: NodeId) -> &str {
        match wheres.node(id) {
            WhereNode::Where(w) => &w.field,
            other => panic!("expected a leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_collection_is_flattened_into_group() {
        let mut wheres = ConstructWhere::<Plain>::new();
        wheres.add(Where::<Plain>::eq("status", "ACTIVE"));
        wheres.add(
            CollectionWhere::<Plain>::new(vec![
                Where::<Plain>::eq("a", 1).into(),
                Where::<Plain>::eq("b", 2).with_operation(WhereOperator::Or).into(),
            ])
            .with_operation(WhereOperator::And),
        );

        assert_eq!(wheres.len(), 2);
        let group = wheres.roots()[1];
        assert_eq!(wheres.children(group).len(), 2);
        assert_eq!(leaf_field(&wheres, wheres.children(group)[1]), "b");
        assert_eq!(wheres.parent(wheres.children(group)[0]), Some(group));
        assert_eq!(wheres.node(group).where_operation(), WhereOperator::And);
    }

    #[test]
    fn test_graft_remaps_nested_ids() {
        let mut inner = ConstructWhere::<Plain>::new();
        inner.add(Where::<Plain>::eq("x", 1));
        inner.add(CollectionWhere::<Plain>::new(vec![Where::<Plain>::unary("y", Operator::IsNull).into()]));

        let mut wheres = ConstructWhere::<Plain>::new();
        wheres.add(Where::<Plain>::eq("root", true));
        wheres.graft(inner, WhereOperator::Or);

        let group = wheres.roots()[1];
        assert_eq!(wheres.node(group).where_operation(), WhereOperator::Or);
        let children = wheres.children(group).to_vec();
        assert_eq!(leaf_field(&wheres, children[0]), "x");
        let nested = wheres.children(children[1]);
        assert_eq!(leaf_field(&wheres, nested[0]), "y");
        assert_eq!(wheres.parent(nested[0]), Some(children[1]));
    }

    #[test]
    fn test_graft_of_empty_group_is_ignored() {
        let mut wheres = ConstructWhere::<Plain>::new();
        wheres.graft(ConstructWhere::new(), WhereOperator::And);
        assert!(wheres.is_empty());
    }
}
