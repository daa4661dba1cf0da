use std::collections::HashMap;

use hefesto::{
    cast::cast_value,
    clause::{Join, JoinCondition},
    construct::{ConstructJoin, NodeId},
    error::{HefestoError, Result},
    operator::{Operator, WhereOperator},
    value::Value,
};
use tracing::trace;

use super::{AliasEntry, Scope};
use crate::criteria::{Comparison, Expression, FromRef, JoinKind, JoinNode, Path, Predicate};

/// Materializes the join tree into join nodes and registers every alias in `scope`.
///
/// A join level is created once per alias; repeating an alias reuses the existing node.
pub(crate) fn construct_joins(joins: &ConstructJoin, scope: &mut Scope) -> Result<Vec<JoinNode>> {
    let mut state = JoinState {
        nodes: Vec::new(),
        created: HashMap::new(),
    };

    for &id in joins.roots() {
        let root = scope.root_entry();
        state.construct(joins, id, root, scope)?;
    }

    Ok(state.nodes)
}

struct JoinState {
    nodes: Vec<JoinNode>,
    created: HashMap<String, usize>,
}

impl JoinState {
    fn construct(&mut self, joins: &ConstructJoin, id: NodeId, parent: AliasEntry, scope: &mut Scope) -> Result<()> {
        let join = joins.join(id);
        if join.table.is_empty() || join.table.split('.').any(str::is_empty) {
            return Err(HefestoError::query(format!(
                "Invalid join path '{}' on entity '{}'",
                join.table, parent.entity.name
            )));
        }

        let current = if join.entity.is_some() && join.is_custom_join() {
            self.entity_join(join, scope)?
        } else {
            self.relation_join(join, parent, scope)?
        };

        for &child in joins.children(id) {
            self.construct(joins, child, current, scope)?;
        }
        Ok(())
    }

    fn relation_join(&mut self, join: &Join, parent: AliasEntry, scope: &mut Scope) -> Result<AliasEntry> {
        let segments: Vec<&str> = join.table.split('.').collect();
        let last = segments.len() - 1;
        let mut current = parent;

        for (idx, segment) in segments.iter().enumerate() {
            let alias = match (&join.alias, idx == last) {
                (Some(alias), true) => alias.clone(),
                _ => segment.to_string(),
            };

            if let Some(&existing) = self.created.get(&alias) {
                trace!("join '{alias}' already materialized, reusing it");
                current = AliasEntry {
                    from: FromRef::join(scope.depth(), existing),
                    entity: self.nodes[existing].entity,
                };
                continue;
            }

            let target = current
                .entity
                .field(segment)
                .and_then(|field| field.target())
                .ok_or_else(|| {
                    HefestoError::query(format!(
                        "Relationship '{segment}' not found on entity '{}'",
                        current.entity.name
                    ))
                })?;

            let entry = AliasEntry {
                from: FromRef::join(scope.depth(), self.nodes.len()),
                entity: target,
            };
            let on = if idx == last {
                let custom = match (&join.field_join, &join.field_reference) {
                    (Some(field_join), Some(field_reference)) => {
                        Some(custom_on(scope, entry, field_join, field_reference)?)
                    }
                    _ => None,
                };
                combine(custom, conditions_on(scope, entry, &join.conditions)?)
            } else {
                None
            };

            self.push(
                JoinNode {
                    parent: current.from.node,
                    attribute: segment.to_string(),
                    entity: target,
                    alias,
                    join_type: join.join_operator,
                    kind: JoinKind::Relation,
                    on,
                },
                scope,
            );
            current = entry;
        }

        Ok(current)
    }

    fn entity_join(&mut self, join: &Join, scope: &mut Scope) -> Result<AliasEntry> {
        let (Some(entity), Some(field_join), Some(field_reference)) =
            (join.entity, &join.field_join, &join.field_reference)
        else {
            return Err(HefestoError::query(format!(
                "Join against '{}' needs an entity and both join fields",
                join.table
            )));
        };

        let alias = join.alias_or_table().to_string();
        if let Some(&existing) = self.created.get(&alias) {
            return Ok(AliasEntry {
                from: FromRef::join(scope.depth(), existing),
                entity: self.nodes[existing].entity,
            });
        }

        let entry = AliasEntry {
            from: FromRef::join(scope.depth(), self.nodes.len()),
            entity,
        };
        let on = combine(
            Some(custom_on(scope, entry, field_join, field_reference)?),
            conditions_on(scope, entry, &join.conditions)?,
        );

        self.push(
            JoinNode {
                parent: scope.root_entry().from.node,
                attribute: entity.name.to_string(),
                entity,
                alias,
                join_type: join.join_operator,
                kind: JoinKind::Entity,
                on,
            },
            scope,
        );
        Ok(entry)
    }

    fn push(&mut self, node: JoinNode, scope: &mut Scope) {
        let idx = self.nodes.len();
        scope.register(
            node.alias.clone(),
            AliasEntry {
                from: FromRef::join(scope.depth(), idx),
                entity: node.entity,
            },
        );
        self.created.insert(node.alias.clone(), idx);
        self.nodes.push(node);
    }
}

/// `<join>.<field_join> = <field_reference>`, the reference resolved like any other field.
fn custom_on(scope: &Scope, entry: AliasEntry, field_join: &str, field_reference: &str) -> Result<Predicate> {
    let left = scope.resolve_in(entry, field_join)?;
    let right = scope.resolve(field_reference)?;
    Ok(Predicate::compare(left, Comparison::Equal, right))
}

fn combine(left: Option<Predicate>, right: Option<Predicate>) -> Option<Predicate> {
    match (left, right) {
        (Some(left), Some(right)) => Some(left.and(right)),
        (left, right) => left.or(right),
    }
}

fn conditions_on(scope: &Scope, entry: AliasEntry, conditions: &[JoinCondition]) -> Result<Option<Predicate>> {
    let mut folded: Option<Predicate> = None;
    for condition in conditions {
        let path = scope.resolve_in(entry, &condition.field)?;
        let predicate = condition_predicate(path, condition)?;
        folded = Some(match (folded, condition.where_operation) {
            (None, _) => predicate,
            (Some(acc), WhereOperator::And) => acc.and(predicate),
            (Some(acc), WhereOperator::Or) => acc.or(predicate),
        });
    }
    Ok(folded)
}

fn condition_predicate(path: Path, condition: &JoinCondition) -> Result<Predicate> {
    let value = &condition.value;
    let predicate = match condition.operator {
        Operator::Like | Operator::NotLike => Predicate::Like {
            expression: path.into(),
            pattern: Expression::literal(value.to_string()),
            negated: condition.operator == Operator::NotLike,
        },
        Operator::Equal if value.is_null() => Predicate::IsNull(path.into()),
        Operator::Diff if value.is_null() => Predicate::IsNotNull(path.into()),
        Operator::Equal => Predicate::compare(path, Comparison::Equal, Expression::Literal(value.clone())),
        Operator::Diff => Predicate::compare(path, Comparison::NotEqual, Expression::Literal(value.clone())),
        op if op.is_ordering() => {
            let value = coerce(&path, value)?;
            Predicate::compare(path, comparison_of(op)?, Expression::Literal(value))
        }
        Operator::IsNull => Predicate::IsNull(path.into()),
        Operator::IsNotNull => Predicate::IsNotNull(path.into()),
        Operator::In | Operator::NotIn => {
            let predicate = Predicate::In {
                expression: path.into(),
                values: match value {
                    Value::List(values) => values.clone(),
                    other => vec![other.clone()],
                },
            };
            if condition.operator == Operator::NotIn {
                predicate.negate()
            } else {
                predicate
            }
        }
        other => {
            return Err(HefestoError::unsupported(format!(
                "Unsupported operator for join condition: {other}"
            )))
        }
    };
    Ok(predicate)
}

/// Casts an ordering operand to the type of the compared attribute.
pub(crate) fn coerce(path: &Path, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Err(HefestoError::InvalidArgument(format!(
            "Null value cannot be compared with '{path}'"
        )));
    }
    match path.value_type {
        Some(target) => cast_value(target, value),
        None => Ok(value.clone()),
    }
}

pub(crate) fn comparison_of(operator: Operator) -> Result<Comparison> {
    Ok(match operator {
        Operator::Equal => Comparison::Equal,
        Operator::Diff => Comparison::NotEqual,
        Operator::Less => Comparison::Less,
        Operator::LessOrEqual => Comparison::LessOrEqual,
        Operator::Greater => Comparison::Greater,
        Operator::GreaterOrEqual => Comparison::GreaterOrEqual,
        other => {
            return Err(HefestoError::unsupported(format!(
                "Operator {other} is not a comparison"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use hefesto::{model::Entity, operator::JoinOperator};

    use super::*;
    use crate::{construct::fixtures::*, criteria::FromNode};

    fn build(joins: Vec<Join>) -> Result<(Vec<JoinNode>, Scope)> {
        let mut construct = ConstructJoin::new();
        construct.add_all(joins);
        let mut scope = Scope::new(User::meta());
        let nodes = construct_joins(&construct, &mut scope)?;
        Ok((nodes, scope))
    }

    #[test]
    fn test_deep_join_chains_parents() {
        let (nodes, scope) = build(vec![Join::make_deep("pets.toys", JoinOperator::Left)]).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].parent, FromNode::Root);
        assert_eq!(nodes[1].parent, FromNode::Join(0));
        assert_eq!(nodes[1].entity, Toy::meta());
        assert_eq!(nodes[1].join_type, JoinOperator::Left);
        assert_eq!(scope.join("toys"), Some(Path::entity(FromRef::join(0, 1))));
    }

    #[test]
    fn test_dotted_table_uses_alias_on_last_level() {
        let (nodes, scope) = build(vec![Join::make_as("pets.toys", "toy")]).unwrap();
        assert_eq!(nodes[0].alias, "pets");
        assert_eq!(nodes[1].alias, "toy");
        assert!(scope.join("toy").is_some());
    }

    #[test]
    fn test_repeated_alias_is_materialized_once() {
        let (nodes, _) = build(vec![Join::make("pets"), Join::make_deep("pets.toys", JoinOperator::Inner)]).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].parent, FromNode::Join(0));
    }

    #[test]
    fn test_entity_join_has_on_equality() {
        let (nodes, _) = build(vec![Join::make_entity(Address::meta(), "user_id", "id").alias("addr")]).unwrap();
        assert_eq!(nodes[0].kind, JoinKind::Entity);
        assert_eq!(nodes[0].alias, "addr");
        let Some(Predicate::Compare { left, right, .. }) = &nodes[0].on else {
            panic!("expected an equality");
        };
        assert_eq!(left, &Expression::Path(Path {
            from: FromRef::join(0, 0),
            attributes: vec!["user_id".into()],
            value_type: Some(hefesto::value::ValueType::Long),
        }));
        assert!(matches!(right, Expression::Path(path) if path.from == FromRef::root(0)));
    }

    #[test]
    fn test_inline_conditions_fold_into_on() {
        let join = Join::make("pets")
            .condition(JoinCondition::new("name", Operator::Like, "R%"))
            .condition(JoinCondition::new("id", Operator::Greater, "3"));
        let (nodes, _) = build(vec![join]).unwrap();
        let Some(Predicate::And(_, right)) = &nodes[0].on else {
            panic!("expected a conjunction");
        };
        assert!(matches!(
            right.as_ref(),
            Predicate::Compare { right: Expression::Literal(Value::Long(3)), .. }
        ));
    }

    #[test]
    fn test_unsupported_condition_operator() {
        let join = Join::make("pets").condition(JoinCondition::new("name", Operator::FindInSet, "a"));
        let err = build(vec![join]).unwrap_err();
        assert!(err.to_string().contains("Unsupported operator for join condition"));
    }

    #[test]
    fn test_unknown_relationship_is_error() {
        let err = build(vec![Join::make("friends")]).unwrap_err();
        assert!(err.to_string().contains("friends"));
        assert!(build(vec![Join::make("name")]).is_err());
        assert!(build(vec![Join::make("")]).is_err());
    }

    #[test]
    fn test_null_checks_in_conditions() {
        let join = Join::make("pets")
            .condition(JoinCondition::new("name", Operator::IsNull, Value::Null))
            .condition(JoinCondition::new("id", Operator::IsNotNull, Value::Null));
        let (nodes, _) = build(vec![join]).unwrap();
        let Some(Predicate::And(left, right)) = &nodes[0].on else {
            panic!("expected a conjunction");
        };
        assert!(matches!(left.as_ref(), Predicate::IsNull(Expression::Path(path)) if path.attributes == ["name"]));
        assert!(matches!(right.as_ref(), Predicate::IsNotNull(Expression::Path(path)) if path.attributes == ["id"]));
    }

    #[test]
    fn test_not_in_condition_negates_membership() {
        let join = Join::make("pets").condition(JoinCondition::new(
            "name",
            Operator::NotIn,
            Value::List(vec!["Rex".into(), "Tom".into()]),
        ));
        let (nodes, _) = build(vec![join]).unwrap();
        let Some(Predicate::Not(inner)) = &nodes[0].on else {
            panic!("expected a negation");
        };
        let Predicate::In { values, .. } = inner.as_ref() else {
            panic!("expected a membership test");
        };
        assert_eq!(values, &vec![Value::from("Rex"), Value::from("Tom")]);
    }

    #[test]
    fn test_deepest_level_of_three_level_chain_resolves() {
        let (nodes, scope) = build(vec![Join::make_deep_as("pets.user.address", "home", JoinOperator::Left)]).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2].parent, FromNode::Join(1));
        assert_eq!(nodes[2].entity, Address::meta());

        let city = scope.resolve("home.city").unwrap();
        assert_eq!(city.from, FromRef::join(0, 2));
        assert_eq!(city.attributes, vec!["city".to_string()]);
        assert_eq!(city.value_type, Some(hefesto::value::ValueType::String));
    }
}
