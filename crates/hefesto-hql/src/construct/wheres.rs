use hefesto::{
    clause::{Where, WhereField, WhereValue},
    construct::{ConstructWhere, NodeId, WhereNode},
    error::{HefestoError, Result},
    operator::{Operator, WhereOperator},
    value::Value,
};
use tracing::trace;

use super::{fold_conditions, ordering_operand, qualify, render, Aliases, Context, Level, QueryMode};
use crate::builder::{Hql, SubQueryBuilder};

/// `where …` for the whole tree, or an empty string when no clause renders.
///
/// Operands of ordering comparisons are cast to the type `aliases` resolves for their field.
pub(crate) fn construct_where(
    wheres: &ConstructWhere<Hql>,
    acronym: &str,
    aliases: &Aliases,
    context: &mut Context,
) -> Result<String> {
    Ok(fold(wheres, wheres.roots(), acronym, aliases, context)?
        .map(|body| format!("where {body}"))
        .unwrap_or_default())
}

fn fold(
    wheres: &ConstructWhere<Hql>,
    ids: &[NodeId],
    acronym: &str,
    aliases: &Aliases,
    context: &mut Context,
) -> Result<Option<String>> {
    let mut rendered: Vec<(WhereOperator, String)> = Vec::with_capacity(ids.len());

    for &id in ids {
        let node = wheres.node(id);
        let condition = match node {
            WhereNode::Where(clause) => Some(where_condition(clause, acronym, aliases, context)?),
            WhereNode::Field(clause) => Some(field_condition(clause, acronym)?),
            WhereNode::Exist(clause) => {
                let keyword = if clause.exists { "exists" } else { "not exists" };
                Some(format!("{keyword} ({})", sub_query(&clause.sub_query, context)?))
            }
            WhereNode::Custom(clause) => Some(clause.custom.clone()),
            WhereNode::Group {
                ..
            } => fold(wheres, wheres.children(id), acronym, aliases, context)?.map(|inner| format!("({inner})")),
        };
        if let Some(condition) = condition {
            trace!("where: {condition}");
            rendered.push((node.where_operation(), condition));
        }
    }

    Ok(fold_conditions(rendered))
}

fn where_condition(
    clause: &Where<Hql>,
    acronym: &str,
    aliases: &Aliases,
    context: &mut Context,
) -> Result<String> {
    let field = qualify(acronym, &clause.field);
    let operator = clause.operator;

    let value = match &clause.value {
        WhereValue::SubQuery(builder) => {
            if !matches!(operator, Operator::In | Operator::NotIn) {
                return Err(HefestoError::unsupported(format!(
                    "Sub-query values are only supported by IN and NOT_IN, got {operator}"
                )));
            }
            return Ok(format!("{field} {} ({})", operator.as_str(), sub_query(builder, context)?));
        }
        WhereValue::Value(value) => value,
    };

    let condition = match operator {
        Operator::IsNull | Operator::IsNotNull => format!("{field} {}", operator.as_str()),
        Operator::Equal if value.is_null() => format!("{field} is null"),
        Operator::Diff if value.is_null() => format!("{field} is not null"),
        Operator::In | Operator::NotIn => {
            if !matches!(value, Value::List(_)) {
                return Err(HefestoError::unsupported("Invalid value for Where IN operation"));
            }
            let param = context.bind(&clause.field, value.clone());
            format!("{field} {} ({param})", operator.as_str())
        }
        Operator::FindInSet | Operator::NotFindInSet => {
            let param = context.bind(&clause.field, value.clone());
            let comparison = if operator == Operator::FindInSet { "> 0" } else { "= 0" };
            format!("find_in_set({param},{field}) {comparison}")
        }
        Operator::Less | Operator::LessOrEqual | Operator::Greater | Operator::GreaterOrEqual => {
            let operand = ordering_operand(&field, operator, value, aliases.value_type(&clause.field))?;
            let param = context.bind(&clause.field, operand);
            format!("{field} {} {param}", operator.as_str())
        }
        _ => {
            let param = context.bind(&clause.field, value.clone());
            format!("{field} {} {param}", operator.as_str())
        }
    };
    Ok(condition)
}

fn field_condition(clause: &WhereField, acronym: &str) -> Result<String> {
    if !clause.operator.is_field_comparable() {
        return Err(HefestoError::unsupported(format!(
            "Unsupported operator: {}",
            clause.operator
        )));
    }
    Ok(format!(
        "{} {} {}",
        qualify(acronym, &clause.field),
        clause.operator.as_str(),
        qualify(acronym, &clause.second_field)
    ))
}

fn sub_query(builder: &SubQueryBuilder, context: &mut Context) -> Result<String> {
    let level = Level {
        entity: builder.root(),
        acronym: builder.acronym(),
        clauses: builder.clauses(),
    };
    render(&level, QueryMode::SubQuery, context)
}

#[cfg(test)]
mod tests {
    use hefesto::{
        builder::{ConditionalBuilder, SelectBuilder},
        clause::{CollectionWhere, Where as WhereValueClause},
        model::Entity,
    };

    use super::*;
    use crate::{builder::RawWhere, construct::fixtures::*};

    #[derive(Default)]
    struct Conditions {
        wheres: ConstructWhere<Hql>,
    }

    impl ConditionalBuilder<Hql> for Conditions {
        fn wheres_mut(&mut self) -> &mut ConstructWhere<Hql> {
            &mut self.wheres
        }
    }

    fn render_where(conditions: Conditions) -> Result<(String, Context)> {
        let mut context = Context::new();
        let aliases = Aliases::new(User::meta(), "user");
        let rendered = construct_where(&conditions.wheres, "user", &aliases, &mut context)?;
        Ok((rendered, context))
    }

    #[test]
    fn test_or_chain() {
        let (rendered, context) = render_where(
            Conditions::default()
                .where_eq("status", "ACTIVE")
                .or_where_eq("status", "PENDING"),
        )
        .unwrap();
        assert_eq!(rendered, "where user.status = :status_1 or user.status = :status_2");
        let params = context.into_params();
        assert_eq!(params.get("status_1"), Some(&Value::from("ACTIVE")));
        assert_eq!(params.get("status_2"), Some(&Value::from("PENDING")));
    }

    #[test]
    fn test_operator_change_groups_like_the_fold() {
        let (rendered, _) = render_where(
            Conditions::default()
                .where_eq("status", "ACTIVE")
                .or_where_eq("status", "PENDING")
                .where_eq("name", "Ada"),
        )
        .unwrap();
        assert_eq!(
            rendered,
            "where (user.status = :status_1 or user.status = :status_2) and user.name = :name_3"
        );
    }

    #[test]
    fn test_collection_where_is_parenthesized() {
        let group = CollectionWhere::<Hql>::new(vec![
            WhereValueClause::<Hql>::eq("name", "Ada").into(),
            WhereValueClause::<Hql>::eq("name", "Grace").with_operation(WhereOperator::Or).into(),
        ]);
        let (rendered, _) =
            render_where(Conditions::default().where_eq("status", "ACTIVE").where_clause(group)).unwrap();
        assert_eq!(
            rendered,
            "where user.status = :status_1 and (user.name = :name_2 or user.name = :name_3)"
        );
    }

    #[test]
    fn test_where_any_group() {
        let (rendered, _) = render_where(
            Conditions::default()
                .where_is_not_null("email")
                .where_any(|group| group.where_eq("age", 30i32).where_eq("age", 40i32)),
        )
        .unwrap();
        assert_eq!(
            rendered,
            "where user.email is not null and (user.age = :age_1 or user.age = :age_2)"
        );
    }

    #[test]
    fn test_in_list_binds_one_parameter() {
        let (rendered, context) = render_where(Conditions::default().where_in("id", [1i64, 2, 3])).unwrap();
        assert_eq!(rendered, "where user.id in (:id_1)");
        assert_eq!(
            context.into_params().get("id_1"),
            Some(&Value::List(vec![Value::Long(1), Value::Long(2), Value::Long(3)]))
        );
    }

    #[test]
    fn test_scalar_in_value_is_rejected() {
        let err = render_where(Conditions::default().where_op("id", Operator::In, 3i64)).unwrap_err();
        assert!(err.to_string().contains("Invalid value for Where IN operation"));
    }

    #[test]
    fn test_find_in_set() {
        let (rendered, _) = render_where(
            Conditions::default()
                .where_op("tags", Operator::FindInSet, "vip")
                .where_op("tags", Operator::NotFindInSet, "banned"),
        )
        .unwrap();
        assert_eq!(
            rendered,
            "where find_in_set(:tags_1,user.tags) > 0 and find_in_set(:tags_2,user.tags) = 0"
        );
    }

    #[test]
    fn test_null_equality_renders_is_null() {
        let clause = WhereValueClause::<Hql>::new("email", Operator::Diff, Value::Null);
        let (rendered, context) = render_where(Conditions::default().where_clause(clause)).unwrap();
        assert_eq!(rendered, "where user.email is not null");
        assert!(context.into_params().is_empty());
    }

    #[test]
    fn test_dotted_fields_are_not_qualified() {
        let (rendered, _) = render_where(Conditions::default().where_op("pets.name", Operator::Like, "R%")).unwrap();
        assert_eq!(rendered, "where pets.name like :petsname_1");
    }

    #[test]
    fn test_field_comparison() {
        let (rendered, _) =
            render_where(Conditions::default().where_field_op("name", Operator::Diff, "address.city")).unwrap();
        assert_eq!(rendered, "where user.name <> address.city");

        let err = render_where(Conditions::default().where_field_op("name", Operator::In, "email")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported operation: Unsupported operator: IN");
    }

    #[test]
    fn test_raw_is_inserted_verbatim() {
        let (rendered, _) = render_where(
            Conditions::default()
                .where_eq("status", "ACTIVE")
                .or_where_raw("size(user.pets) > 2"),
        )
        .unwrap();
        assert_eq!(rendered, "where user.status = :status_1 or size(user.pets) > 2");
    }

    #[test]
    fn test_sub_query_shares_the_counter() {
        let sub = SubQueryBuilder::new(UserPet::meta())
            .add_select("user_id")
            .where_eq("name", "Rex");
        let (rendered, context) = render_where(
            Conditions::default()
                .where_eq("name", "Ada")
                .where_in_query("id", sub),
        )
        .unwrap();
        assert_eq!(
            rendered,
            "where user.name = :name_1 and user.id in (select userpet.user_id from UserPet userpet \
             where userpet.name = :name_2)"
        );
        assert_eq!(context.into_params().len(), 2);
    }

    #[test]
    fn test_exists_with_correlation() {
        let sub = SubQueryBuilder::new(UserPet::meta()).where_field("user_id", "user.id");
        let (rendered, _) = render_where(Conditions::default().where_not_exists(sub)).unwrap();
        assert_eq!(
            rendered,
            "where not exists (select userpet from UserPet userpet where userpet.user_id = user.id)"
        );
    }

    #[test]
    fn test_sub_query_with_two_selects_fails() {
        let sub = SubQueryBuilder::new(UserPet::meta()).add_select("id").add_select("name");
        let err = render_where(Conditions::default().where_in_query("id", sub)).unwrap_err();
        assert!(err.to_string().contains("Sub-query must have only one select"));
    }

    #[test]
    fn test_sub_query_with_like_is_unsupported() {
        let sub = SubQueryBuilder::new(UserPet::meta()).add_select("id");
        let conditions = Conditions::default().push_sub_query("id", Operator::Like, sub, WhereOperator::And);
        assert!(matches!(
            render_where(conditions).unwrap_err(),
            HefestoError::UnsupportedOperation(_)
        ));
    }

    #[test]
    fn test_empty_where_renders_nothing() {
        let (rendered, _) = render_where(Conditions::default().where_all(|group| group)).unwrap();
        assert!(rendered.is_empty());
    }

    #[test]
    fn test_ordering_operand_is_cast_to_the_field_type() {
        let (rendered, context) = render_where(
            Conditions::default()
                .where_op("age", Operator::Greater, "30")
                .where_op("user.id", Operator::LessOrEqual, 100i32),
        )
        .unwrap();
        assert_eq!(rendered, "where user.age > :age_1 and user.id <= :userid_2");
        let params = context.into_params();
        assert_eq!(params.get("age_1"), Some(&Value::Int(30)));
        assert_eq!(params.get("userid_2"), Some(&Value::Long(100)));
    }

    #[test]
    fn test_ordering_operand_resolves_join_aliases() {
        let mut context = Context::new();
        let mut aliases = Aliases::new(User::meta(), "user");
        aliases.register("p", UserPet::meta());
        let conditions = Conditions::default().where_op("p.id", Operator::Less, "12");
        let rendered = construct_where(&conditions.wheres, "user", &aliases, &mut context).unwrap();
        assert_eq!(rendered, "where p.id < :pid_1");
        assert_eq!(context.into_params().get("pid_1"), Some(&Value::Long(12)));
    }

    #[test]
    fn test_null_ordering_operand_is_rejected() {
        let clause = WhereValueClause::<Hql>::new("age", Operator::Greater, Value::Null);
        let err = render_where(Conditions::default().where_clause(clause)).unwrap_err();
        assert!(matches!(err, HefestoError::InvalidArgument(_)));
    }

    #[test]
    fn test_uncastable_ordering_operand_fails() {
        let err = render_where(Conditions::default().where_op("age", Operator::Less, "old")).unwrap_err();
        assert!(matches!(err, HefestoError::Coercion { .. }));
    }

    #[test]
    fn test_unknown_field_keeps_its_operand() {
        let (_, context) = render_where(Conditions::default().where_op("size(user.pets)", Operator::Greater, "2")).unwrap();
        assert_eq!(context.into_params().get("size_userpets__1"), Some(&Value::from("2")));
    }
}
