//! The typed query graph handed to a [`CriteriaSession`](crate::session::CriteriaSession).
//!
//! Nodes reference each other by index: a [`FromRef`] names the root or a join of the query at
//! a given nesting depth, so a sub query can point at its parent's nodes for correlation.

use std::fmt;

use hefesto::{
    model::EntityMeta,
    operator::{JoinOperator, SelectOperator, Sort},
    value::{Value, ValueType},
};

/// A from-node inside one query level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FromNode {
    Root,
    Join(usize),
}

/// A from-node qualified with the nesting depth of the query that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FromRef {
    pub depth: usize,
    pub node: FromNode,
}

impl FromRef {
    pub fn root(depth: usize) -> Self {
        Self {
            depth,
            node: FromNode::Root,
        }
    }

    pub fn join(depth: usize, idx: usize) -> Self {
        Self {
            depth,
            node: FromNode::Join(idx),
        }
    }
}

/// Attribute navigation starting at a from-node. No attributes means the entity itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub from: FromRef,
    pub attributes: Vec<String>,
    /// Type of the last attribute; `None` for entities and relations.
    pub value_type: Option<ValueType>,
}

impl Path {
    pub fn entity(from: FromRef) -> Self {
        Self {
            from,
            attributes: Vec::new(),
            value_type: None,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.from.node {
            FromNode::Root => write!(f, "root@{}", self.from.depth)?,
            FromNode::Join(idx) => write!(f, "join{idx}@{}", self.from.depth)?,
        }
        for attribute in &self.attributes {
            write!(f, ".{attribute}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Path(Path),
    Literal(Value),
    /// A database function called by name, such as `find_in_set`.
    Function { name: String, args: Vec<Expression> },
    Aggregate { function: SelectOperator, argument: Box<Expression> },
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expression::Aggregate { .. })
    }
}

impl From<Path> for Expression {
    fn from(path: Path) -> Self {
        Expression::Path(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        left: Expression,
        comparison: Comparison,
        right: Expression,
    },
    Like {
        expression: Expression,
        pattern: Expression,
        negated: bool,
    },
    IsNull(Expression),
    IsNotNull(Expression),
    In {
        expression: Expression,
        values: Vec<Value>,
    },
    InSubQuery {
        expression: Expression,
        sub_query: Box<SubQuery>,
    },
    Exists(Box<SubQuery>),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn compare(left: impl Into<Expression>, comparison: Comparison, right: impl Into<Expression>) -> Self {
        Predicate::Compare {
            left: left.into(),
            comparison,
            right: right.into(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Follows a relationship attribute of the parent node.
    Relation,
    /// Joins every row of an entity, restricted by the ON condition only.
    Entity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    pub parent: FromNode,
    /// Relationship attribute, or the entity name for entity joins.
    pub attribute: String,
    pub entity: &'static EntityMeta,
    pub alias: String,
    pub join_type: JoinOperator,
    pub kind: JoinKind,
    pub on: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchNode {
    pub attribute: String,
    pub alias: Option<String>,
    pub join_type: JoinOperator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub expression: Expression,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expression: Expression,
    pub sort: Sort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaQuery {
    pub depth: usize,
    pub root: &'static EntityMeta,
    /// Parents always precede their children.
    pub joins: Vec<JoinNode>,
    pub fetches: Vec<FetchNode>,
    pub selections: Vec<Selection>,
    pub predicate: Option<Predicate>,
    pub orders: Vec<OrderBy>,
    pub group_by: Vec<Expression>,
    pub first_result: Option<u64>,
    pub max_results: Option<u64>,
}

impl CriteriaQuery {
    pub fn new(root: &'static EntityMeta, depth: usize) -> Self {
        Self {
            depth,
            root,
            joins: Vec::new(),
            fetches: Vec::new(),
            selections: Vec::new(),
            predicate: None,
            orders: Vec::new(),
            group_by: Vec::new(),
            first_result: None,
            max_results: None,
        }
    }

    pub fn root_ref(&self) -> FromRef {
        FromRef::root(self.depth)
    }

    /// Whether rows are collapsed into groups, explicitly or through aggregate selections.
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty() || self.selections.iter().any(|s| s.expression.is_aggregate())
    }
}

/// A correlated query nested in a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub query: CriteriaQuery,
    /// Type of the single selected column; required by `IN`.
    pub result_type: Option<ValueType>,
}
