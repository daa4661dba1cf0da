use hefesto::{
    clause::{Join, JoinCondition},
    construct::{ConstructJoin, NodeId},
    error::{HefestoError, Result},
    model::EntityMeta,
    operator::Operator,
    value::Value,
};
use tracing::trace;

use super::{fold_conditions, ordering_operand, qualify, Aliases, Context};

/// Renders every join level, parents before their nested joins.
///
/// Relationship joins start from the parent level's acronym. A dotted table such as
/// `pets.toys` renders one join per segment; the intermediate levels are aliased
/// `<parent>_<segment>` and the last one takes the join's own acronym. Every level whose entity
/// the metadata knows is registered in `aliases`.
pub(crate) fn construct_joins(
    joins: &ConstructJoin,
    root: &str,
    aliases: &mut Aliases,
    context: &mut Context,
) -> Result<String> {
    let mut rendered = Vec::new();
    let root_entity = aliases.entity(root);
    for &id in joins.roots() {
        let parent = Parent {
            acronym: root,
            entity: root_entity,
        };
        construct_join(joins, id, parent, root, aliases, context, &mut rendered)?;
    }
    Ok(rendered.join(" "))
}

#[derive(Clone, Copy)]
struct Parent<'a> {
    acronym: &'a str,
    entity: Option<&'static EntityMeta>,
}

fn construct_join(
    joins: &ConstructJoin,
    id: NodeId,
    parent: Parent<'_>,
    root: &str,
    aliases: &mut Aliases,
    context: &mut Context,
    rendered: &mut Vec<String>,
) -> Result<()> {
    let join = joins.join(id);
    if join.table.is_empty() || join.table.split('.').any(str::is_empty) {
        return Err(HefestoError::query(format!("Invalid join path '{}'", join.table)));
    }

    let (acronym, entity) = match (&join.field_join, &join.field_reference) {
        (Some(field_join), Some(field_reference)) => {
            let acronym = join.acronym();
            let mut on = vec![format!("{acronym}.{field_join} = {}", qualify(root, field_reference))];
            on.extend(conditions_on(join, &acronym, join.entity, context)?);
            rendered.push(format!(
                "{} join {} {acronym} on {}",
                join.join_operator,
                join.table,
                on.join(" and ")
            ));
            if let Some(entity) = join.entity {
                aliases.register(&acronym, entity);
            }
            (acronym, join.entity)
        }
        _ => relation_join(join, parent, aliases, context, rendered)?,
    };
    trace!("join '{}' rendered as '{acronym}'", join.table);

    for &child in joins.children(id) {
        let parent = Parent {
            acronym: &acronym,
            entity,
        };
        construct_join(joins, child, parent, root, aliases, context, rendered)?;
    }
    Ok(())
}

fn relation_join(
    join: &Join,
    parent: Parent<'_>,
    aliases: &mut Aliases,
    context: &mut Context,
    rendered: &mut Vec<String>,
) -> Result<(String, Option<&'static EntityMeta>)> {
    let segments: Vec<&str> = join.table.split('.').collect();
    let last = segments.len() - 1;
    let mut current = parent.acronym.to_string();
    let mut prefix = parent.acronym.to_string();
    let mut entity = parent.entity;

    for (idx, segment) in segments.iter().enumerate() {
        entity = entity
            .and_then(|entity| entity.field(segment))
            .and_then(|attribute| attribute.target());

        let (acronym, on) = if idx == last {
            let acronym = join.alias.clone().unwrap_or_else(|| segment.to_lowercase());
            let on = conditions_on(join, &acronym, entity, context)?;
            (acronym, on)
        } else {
            prefix = format!("{prefix}_{segment}");
            (prefix.clone(), None)
        };

        let on = on.map(|on| format!(" on {on}")).unwrap_or_default();
        rendered.push(format!("{} join {current}.{segment} {acronym}{on}", join.join_operator));
        if let Some(entity) = entity {
            aliases.register(&acronym, entity);
        }
        current = acronym;
    }

    Ok((current, entity))
}

fn conditions_on(
    join: &Join,
    acronym: &str,
    entity: Option<&'static EntityMeta>,
    context: &mut Context,
) -> Result<Option<String>> {
    let mut rendered = Vec::with_capacity(join.conditions.len());
    for condition in &join.conditions {
        rendered.push((condition.where_operation, condition_on(condition, acronym, entity, context)?));
    }
    Ok(fold_conditions(rendered).map(|on| {
        if join.conditions.len() > 1 && join.is_custom_join() {
            format!("({on})")
        } else {
            on
        }
    }))
}

fn condition_on(
    condition: &JoinCondition,
    acronym: &str,
    entity: Option<&'static EntityMeta>,
    context: &mut Context,
) -> Result<String> {
    let field = qualify(acronym, &condition.field);
    let value = &condition.value;

    let rendered = match condition.operator {
        Operator::Equal if value.is_null() => format!("{field} is null"),
        Operator::Diff if value.is_null() => format!("{field} is not null"),
        Operator::IsNull | Operator::IsNotNull => format!("{field} {}", condition.operator.as_str()),
        Operator::In | Operator::NotIn => {
            if !matches!(value, Value::List(_)) {
                return Err(HefestoError::unsupported("Invalid value for Where IN operation"));
            }
            let param = context.bind(&condition.field, value.clone());
            format!("{field} {} ({param})", condition.operator.as_str())
        }
        Operator::FindInSet | Operator::NotFindInSet => {
            return Err(HefestoError::unsupported(format!(
                "Unsupported operator for join condition: {}",
                condition.operator
            )))
        }
        operator if operator.is_ordering() => {
            let value_type = entity
                .and_then(|entity| entity.resolve_path(&condition.field))
                .and_then(|attribute| attribute.value_type());
            let operand = ordering_operand(&field, operator, value, value_type)?;
            let param = context.bind(&condition.field, operand);
            format!("{field} {} {param}", operator.as_str())
        }
        operator => {
            if value.is_null() {
                return Err(HefestoError::InvalidArgument(format!(
                    "Null value for {operator} on join field '{}'",
                    condition.field
                )));
            }
            let param = context.bind(&condition.field, value.clone());
            format!("{field} {} {param}", operator.as_str())
        }
    };
    Ok(rendered)
}
