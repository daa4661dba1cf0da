use crate::{
    clause::{Join, JoinCondition},
    operator::{JoinOperator, Operator},
    value::Value,
};

/// Configures one join level: alias, conditions scoped to the join and nested joins.
///
/// ```ignore
/// JoinBuilder::new("pets", JoinOperator::Left)
///     .alias("p")
///     .where_eq("name", "Rex")
///     .join_with("toys", |toys| toys.alias("t"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct JoinBuilder {
    join: Join,
}

impl JoinBuilder {
    pub fn new(table: impl Into<String>, join_operator: JoinOperator) -> Self {
        Self {
            join: Join::make(table).operator(join_operator),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.join.alias = Some(alias.into());
        self
    }

    /// `field = value` inside the join's ON clause.
    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.where_op(field, Operator::Equal, value)
    }

    pub fn where_op(mut self, field: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.join.conditions.push(JoinCondition::new(field, operator, value));
        self
    }

    /// Adds an inner nested join.
    pub fn join(self, table: &str) -> Self {
        self.join_type(table, JoinOperator::Inner)
    }

    pub fn join_type(mut self, table: &str, join_operator: JoinOperator) -> Self {
        self.join.with_deep(table, join_operator);
        self
    }

    /// Adds an inner nested join configured by `configure`.
    pub fn join_with<F>(self, table: &str, configure: F) -> Self
    where
        F: FnOnce(JoinBuilder) -> JoinBuilder,
    {
        self.join_type_with(table, JoinOperator::Inner, configure)
    }

    pub fn join_type_with<F>(mut self, table: &str, join_operator: JoinOperator, configure: F) -> Self
    where
        F: FnOnce(JoinBuilder) -> JoinBuilder,
    {
        let nested = configure(JoinBuilder::new(table, join_operator));
        self.join.deep_joins.push(nested.build());
        self
    }

    pub fn left_join(self, table: &str) -> Self {
        self.join_type(table, JoinOperator::Left)
    }

    pub fn left_join_with<F>(self, table: &str, configure: F) -> Self
    where
        F: FnOnce(JoinBuilder) -> JoinBuilder,
    {
        self.join_type_with(table, JoinOperator::Left, configure)
    }

    pub fn right_join(self, table: &str) -> Self {
        self.join_type(table, JoinOperator::Right)
    }

    pub fn right_join_with<F>(self, table: &str, configure: F) -> Self
    where
        F: FnOnce(JoinBuilder) -> JoinBuilder,
    {
        self.join_type_with(table, JoinOperator::Right, configure)
    }

    pub fn inner_join(self, table: &str) -> Self {
        self.join_type(table, JoinOperator::Inner)
    }

    pub fn inner_join_with<F>(self, table: &str, configure: F) -> Self
    where
        F: FnOnce(JoinBuilder) -> JoinBuilder,
    {
        self.join_type_with(table, JoinOperator::Inner, configure)
    }

    pub fn build(self) -> Join {
        self.join
    }
}
