use hefesto::{
    clause::{Where, WhereField, WhereValue},
    construct::{ConstructWhere, NodeId, WhereNode},
    error::{HefestoError, Result},
    operator::{Operator, WhereOperator},
    value::Value,
};

use super::{
    join::{coerce, comparison_of},
    Scope,
};
use crate::{
    builder::{Criteria, SubQueryBuilder},
    criteria::{Comparison, Expression, Predicate},
    executor::compile_sub_query,
};

/// Folds the where tree left to right into one predicate; `None` when nothing applies.
pub(crate) fn construct_where(wheres: &ConstructWhere<Criteria>, scope: &Scope) -> Result<Option<Predicate>> {
    fold(wheres, wheres.roots(), scope)
}

fn fold(wheres: &ConstructWhere<Criteria>, ids: &[NodeId], scope: &Scope) -> Result<Option<Predicate>> {
    let mut folded: Option<Predicate> = None;

    for &id in ids {
        let node = wheres.node(id);
        let Some(predicate) = node_predicate(wheres, id, node, scope)? else {
            continue;
        };
        folded = Some(match (folded, node.where_operation()) {
            (None, _) => predicate,
            (Some(acc), WhereOperator::And) => acc.and(predicate),
            (Some(acc), WhereOperator::Or) => acc.or(predicate),
        });
    }

    Ok(folded)
}

fn node_predicate(
    wheres: &ConstructWhere<Criteria>,
    id: NodeId,
    node: &WhereNode<Criteria>,
    scope: &Scope,
) -> Result<Option<Predicate>> {
    let predicate = match node {
        WhereNode::Where(clause) => where_predicate(clause, scope)?,
        WhereNode::Field(clause) => field_predicate(clause, scope)?,
        WhereNode::Exist(clause) => {
            let exists = Predicate::Exists(Box::new(compile_sub_query(&clause.sub_query, scope)?));
            if clause.exists {
                exists
            } else {
                exists.negate()
            }
        }
        WhereNode::Custom(clause) => clause.custom.predicate(scope)?,
        WhereNode::Group {
            ..
        } => return fold(wheres, wheres.children(id), scope),
    };
    Ok(Some(predicate))
}

fn where_predicate(clause: &Where<Criteria>, scope: &Scope) -> Result<Predicate> {
    let path = scope.resolve(&clause.field)?;
    let operator = clause.operator;

    let value = match &clause.value {
        WhereValue::SubQuery(sub_query) => return in_sub_query(path.into(), operator, sub_query, scope),
        WhereValue::Value(value) => value,
    };

    let predicate = match operator {
        Operator::IsNull => Predicate::IsNull(path.into()),
        Operator::IsNotNull => Predicate::IsNotNull(path.into()),
        Operator::Equal | Operator::Diff if value.is_null() => {
            if operator == Operator::Equal {
                Predicate::IsNull(path.into())
            } else {
                Predicate::IsNotNull(path.into())
            }
        }
        Operator::Equal | Operator::Diff => {
            Predicate::compare(path, comparison_of(operator)?, Expression::Literal(value.clone()))
        }
        op if op.is_ordering() => {
            let value = coerce(&path, value)?;
            Predicate::compare(path, comparison_of(op)?, Expression::Literal(value))
        }
        Operator::Like | Operator::NotLike => Predicate::Like {
            expression: path.into(),
            pattern: Expression::literal(value.to_string()),
            negated: operator == Operator::NotLike,
        },
        Operator::In | Operator::NotIn => {
            let Value::List(values) = value else {
                return Err(HefestoError::unsupported("Invalid value for Where IN operation"));
            };
            let predicate = Predicate::In {
                expression: path.into(),
                values: values.clone(),
            };
            if operator == Operator::NotIn {
                predicate.negate()
            } else {
                predicate
            }
        }
        Operator::FindInSet | Operator::NotFindInSet => {
            let found = Expression::Function {
                name: "find_in_set".into(),
                args: vec![Expression::literal(value.to_string()), path.into()],
            };
            let comparison = if operator == Operator::FindInSet {
                Comparison::Greater
            } else {
                Comparison::Equal
            };
            Predicate::compare(found, comparison, Expression::literal(0i32))
        }
        other => {
            return Err(HefestoError::unsupported(format!(
                "Operator {other} is not supported in a where clause"
            )))
        }
    };
    Ok(predicate)
}

fn in_sub_query(
    expression: Expression,
    operator: Operator,
    sub_query: &SubQueryBuilder,
    scope: &Scope,
) -> Result<Predicate> {
    if !matches!(operator, Operator::In | Operator::NotIn) {
        return Err(HefestoError::unsupported(format!(
            "Sub-query values are only supported by IN and NOT_IN, got {operator}"
        )));
    }
    if sub_query.selects_size() != 1 {
        return Err(HefestoError::query(
            "The quantity of select for sub-query must be 1 for Where IN operation",
        ));
    }
    if !sub_query.has_custom_result() {
        return Err(HefestoError::query(
            "The sub-query must have custom result for Where IN operation",
        ));
    }

    let predicate = Predicate::InSubQuery {
        expression,
        sub_query: Box::new(compile_sub_query(sub_query, scope)?),
    };
    Ok(if operator == Operator::NotIn {
        predicate.negate()
    } else {
        predicate
    })
}

fn field_predicate(clause: &WhereField, scope: &Scope) -> Result<Predicate> {
    if !clause.operator.is_field_comparable() {
        return Err(HefestoError::unsupported(format!(
            "Operator {} is not supported between two fields",
            clause.operator
        )));
    }

    let left = scope.resolve(&clause.field)?;
    let right = scope.resolve_outer(&clause.second_field)?;

    Ok(match clause.operator {
        Operator::Like | Operator::NotLike => Predicate::Like {
            expression: left.into(),
            pattern: right.into(),
            negated: clause.operator == Operator::NotLike,
        },
        op => Predicate::compare(left, comparison_of(op)?, right),
    })
}

#[cfg(test)]
mod tests {
    use hefesto::{
        builder::{ConditionalBuilder, SelectBuilder},
        model::Entity,
        value::ValueType,
    };

    use super::*;
    use crate::{
        builder::CustomWhere,
        construct::fixtures::*,
        criteria::{FromRef, Path},
    };

    #[derive(Default)]
    struct Conditions {
        wheres: ConstructWhere<Criteria>,
    }

    impl ConditionalBuilder<Criteria> for Conditions {
        fn wheres_mut(&mut self) -> &mut ConstructWhere<Criteria> {
            &mut self.wheres
        }
    }

    fn translate(conditions: Conditions) -> Result<Option<Predicate>> {
        construct_where(&conditions.wheres, &Scope::new(User::meta()))
    }

    fn path(field: &str, value_type: ValueType) -> Expression {
        Expression::Path(Path {
            from: FromRef::root(0),
            attributes: vec![field.into()],
            value_type: Some(value_type),
        })
    }

    #[test]
    fn test_or_folds_left_to_right() {
        let predicate = translate(
            Conditions::default()
                .where_eq("status", "ACTIVE")
                .or_where_eq("status", "PENDING")
                .where_eq("name", "Ada"),
        )
        .unwrap()
        .unwrap();
        let Predicate::And(left, _) = predicate else {
            panic!("expected the last clause to be AND-ed");
        };
        assert!(matches!(*left, Predicate::Or(_, _)));
    }

    #[test]
    fn test_ordering_value_is_cast() {
        let predicate = translate(Conditions::default().where_op("age", Operator::Greater, "30"))
            .unwrap()
            .unwrap();
        assert_eq!(
            predicate,
            Predicate::compare(path("age", ValueType::Int), Comparison::Greater, Expression::Literal(Value::Int(30)))
        );
    }

    #[test]
    fn test_bad_ordering_value_fails() {
        let err = translate(Conditions::default().where_op("age", Operator::Less, "old")).unwrap_err();
        assert!(matches!(err, HefestoError::Coercion { .. }));
    }

    #[test]
    fn test_find_in_set() {
        let predicate = translate(Conditions::default().where_op("tags", Operator::NotFindInSet, "vip"))
            .unwrap()
            .unwrap();
        let Predicate::Compare { comparison, right, .. } = predicate else {
            panic!("expected a comparison");
        };
        assert_eq!(comparison, Comparison::Equal);
        assert_eq!(right, Expression::Literal(Value::Int(0)));
    }

    #[test]
    fn test_scalar_in_value_is_rejected() {
        let err = translate(Conditions::default().where_op("id", Operator::In, 3i64)).unwrap_err();
        assert!(err.to_string().contains("Invalid value for Where IN operation"));
    }

    #[test]
    fn test_not_in_wraps_in_not() {
        let predicate = translate(Conditions::default().where_not_in("id", [1i64, 2]))
            .unwrap()
            .unwrap();
        assert!(matches!(predicate, Predicate::Not(inner) if matches!(*inner, Predicate::In { .. })));
    }

    #[test]
    fn test_empty_groups_translate_to_nothing() {
        let predicate = translate(Conditions::default().where_any(|group| group)).unwrap();
        assert!(predicate.is_none());
    }

    #[test]
    fn test_field_comparison_rejects_in() {
        let err = translate(Conditions::default().where_field_op("name", Operator::In, "email")).unwrap_err();
        assert!(matches!(err, HefestoError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_custom_predicate_receives_scope() {
        let predicate = translate(Conditions::default().where_custom(|scope| {
            Ok(Predicate::IsNotNull(scope.resolve("email")?.into()))
        }))
        .unwrap()
        .unwrap();
        assert_eq!(predicate, Predicate::IsNotNull(path("email", ValueType::String)));
    }

    #[test]
    fn test_sub_query_without_custom_result_fails() {
        let sub = SubQueryBuilder::new(UserPet::meta()).add_select("id");
        let err = translate(Conditions::default().where_in_query("id", sub)).unwrap_err();
        assert!(err.to_string().contains("must have custom result"));
    }

    #[test]
    fn test_sub_query_with_two_selects_fails() {
        let sub = SubQueryBuilder::new(UserPet::meta())
            .add_select("id")
            .add_select("name")
            .custom_result(ValueType::Long);
        let err = translate(Conditions::default().where_in_query("id", sub)).unwrap_err();
        assert!(err.to_string().contains("quantity of select"));
    }

    #[test]
    fn test_sub_query_with_like_is_unsupported() {
        let sub = SubQueryBuilder::new(UserPet::meta()).add_select("id").custom_result(ValueType::Long);
        let conditions = Conditions::default().push_sub_query("id", Operator::Like, sub, WhereOperator::And);
        assert!(matches!(translate(conditions).unwrap_err(), HefestoError::UnsupportedOperation(_)));
    }
}
