use crate::{
    model::EntityMeta,
    operator::{JoinOperator, Operator, WhereOperator},
    value::Value,
};

/// A condition scoped to a single join, rendered as part of its ON clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    pub where_operation: WhereOperator,
}

impl JoinCondition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            where_operation: WhereOperator::And,
        }
    }
}

/// A join against a relationship (`table` is the attribute name) or, when both `field_join` and
/// `field_reference` are set, against an entity with an explicit condition.
///
/// `table` may be a dotted path such as `pets.owner`; translators expand it into one join level
/// per segment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Join {
    pub table: String,
    pub alias: Option<String>,
    pub field_join: Option<String>,
    pub field_reference: Option<String>,
    pub join_operator: JoinOperator,
    pub entity: Option<&'static EntityMeta>,
    pub deep_joins: Vec<Join>,
    pub conditions: Vec<JoinCondition>,
}

impl Join {
    pub fn make(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn make_as(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::make(table).alias(alias)
    }

    pub fn make_on(
        table: impl Into<String>,
        field_join: impl Into<String>,
        field_reference: impl Into<String>,
    ) -> Self {
        Self {
            field_join: Some(field_join.into()),
            field_reference: Some(field_reference.into()),
            ..Self::make(table)
        }
    }

    /// Explicit join against another entity, `<entity>.<field_join> = <field_reference>`.
    pub fn make_entity(
        entity: &'static EntityMeta,
        field_join: impl Into<String>,
        field_reference: impl Into<String>,
    ) -> Self {
        Self {
            entity: Some(entity),
            ..Self::make_on(entity.name, field_join, field_reference)
        }
    }

    /// Builds a chain of nested joins from a dotted path; `a.b.c` yields `a -> b -> c`.
    ///
    /// An empty path produces a join with an empty table, which translators reject.
    pub fn make_deep(path: &str, join_operator: JoinOperator) -> Self {
        let mut segments = path.split('.').rev();
        let last = segments.next().unwrap_or_default();
        let mut join = Join::make(last).operator(join_operator);

        for segment in segments {
            let mut parent = Join::make(segment).operator(join_operator);
            parent.deep_joins.push(join);
            join = parent;
        }

        join
    }

    /// Like [`Join::make_deep`], with `alias` set on the deepest level.
    pub fn make_deep_as(path: &str, alias: impl Into<String>, join_operator: JoinOperator) -> Self {
        let mut root = Self::make_deep(path, join_operator);
        let mut current = &mut root;
        while !current.deep_joins.is_empty() {
            current = &mut current.deep_joins[0];
        }
        current.alias = Some(alias.into());
        root
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn operator(mut self, join_operator: JoinOperator) -> Self {
        self.join_operator = join_operator;
        self
    }

    pub fn condition(mut self, condition: JoinCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Appends a nested join and returns a handle to it.
    pub fn with_deep(&mut self, table: impl Into<String>, join_operator: JoinOperator) -> &mut Join {
        self.deep_joins.push(Join::make(table).operator(join_operator));
        let idx = self.deep_joins.len() - 1;
        &mut self.deep_joins[idx]
    }

    /// Alias used in string queries: the explicit alias or the lowercased table.
    pub fn acronym(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.table.to_lowercase())
    }

    /// Key under which typed translators register the join: the alias or the table as written.
    pub fn alias_or_table(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    pub fn is_custom_join(&self) -> bool {
        self.field_join.is_some() && self.field_reference.is_some()
    }

    pub fn has_deep_joins(&self) -> bool {
        !self.deep_joins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_deep_builds_chain() {
        let join = Join::make_deep("a.b.c", JoinOperator::Left);
        assert_eq!(join.table, "a");
        assert_eq!(join.deep_joins[0].table, "b");
        assert_eq!(join.deep_joins[0].deep_joins[0].table, "c");
        assert!(join.deep_joins[0].deep_joins[0].deep_joins.is_empty());
        assert_eq!(join.deep_joins[0].join_operator, JoinOperator::Left);
    }

    #[test]
    fn test_make_deep_as_aliases_last_level() {
        let join = Join::make_deep_as("pets.toys", "toy", JoinOperator::Inner);
        assert_eq!(join.alias, None);
        assert_eq!(join.deep_joins[0].alias.as_deref(), Some("toy"));
    }

    #[test]
    fn test_acronym_defaults_to_lowercase_table() {
        assert_eq!(Join::make("Pets").acronym(), "pets");
        assert_eq!(Join::make_as("Pets", "p").acronym(), "p");
        assert_eq!(Join::make("Pets").alias_or_table(), "Pets");
    }

    #[test]
    fn test_with_deep_returns_nested() {
        let mut join = Join::make("user");
        join.with_deep("address", JoinOperator::Left).alias = Some("addr".into());
        assert_eq!(join.deep_joins[0].alias.as_deref(), Some("addr"));
        assert!(join.has_deep_joins());
    }

    #[test]
    fn test_custom_join_needs_both_fields() {
        assert!(Join::make_on("Address", "userId", "id").is_custom_join());
        assert!(!Join::make("address").is_custom_join());
    }
}
