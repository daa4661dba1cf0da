//! Renderers from the clause collections to query-string fragments.
//!
//! All renderers of one query share a [`Context`], so parameter names stay unique across the
//! main query, its joins and every nested sub query.

mod fetch;
mod join;
mod order;
mod select;
mod wheres;

use std::collections::{BTreeMap, HashMap};

use hefesto::{
    builder::Clauses,
    cast::cast_value,
    error::{HefestoError, Result},
    model::EntityMeta,
    operator::{Operator, WhereOperator},
    value::{Value, ValueType},
};
use tracing::trace;

pub(crate) use fetch::construct_fetches;
pub(crate) use join::construct_joins;
pub(crate) use order::{construct_group_by, construct_orders};
pub(crate) use select::{construct_selects, construct_sub_query_select};
pub(crate) use wheres::construct_where;

use crate::builder::Hql;

/// Parameters bound while rendering one query.
#[derive(Debug, Default)]
pub(crate) struct Context {
    params: BTreeMap<String, Value>,
    counter: usize,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` under a name derived from `field` and returns its placeholder.
    pub fn bind(&mut self, field: &str, value: Value) -> String {
        self.counter += 1;
        let name = param_name(field, self.counter);
        trace!("binding :{name} = {value:?}");
        self.params.insert(name.clone(), value);
        format!(":{name}")
    }

    pub fn into_params(self) -> BTreeMap<String, Value> {
        self.params
    }
}

/// Entities reachable by name at one query level: the root acronym and every join alias.
#[derive(Debug)]
pub(crate) struct Aliases {
    root: &'static EntityMeta,
    entries: HashMap<String, &'static EntityMeta>,
}

impl Aliases {
    pub fn new(root: &'static EntityMeta, acronym: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(acronym.to_string(), root);
        Self {
            root,
            entries,
        }
    }

    pub fn register(&mut self, alias: &str, entity: &'static EntityMeta) {
        self.entries.insert(alias.to_string(), entity);
    }

    pub fn entity(&self, alias: &str) -> Option<&'static EntityMeta> {
        self.entries.get(alias).copied()
    }

    /// Type of `field` when the metadata knows it. A first segment naming an alias is resolved on
    /// that alias' entity, anything else on the root.
    pub fn value_type(&self, field: &str) -> Option<ValueType> {
        let attribute = match field.split_once('.') {
            Some((head, rest)) => match self.entries.get(head) {
                Some(entity) => entity.resolve_path(rest),
                None => self.root.resolve_path(field),
            },
            None => self.root.resolve_path(field),
        };
        attribute.and_then(|attribute| attribute.value_type())
    }
}

/// Operand of an ordering comparison, cast to the field's type when the metadata knows it.
pub(crate) fn ordering_operand(
    field: &str,
    operator: Operator,
    value: &Value,
    value_type: Option<ValueType>,
) -> Result<Value> {
    if value.is_null() {
        return Err(HefestoError::InvalidArgument(format!(
            "Null value for {operator} on field '{field}'"
        )));
    }
    match value_type {
        Some(target) => cast_value(target, value),
        None => Ok(value.clone()),
    }
}

/// `pets.name` with counter 3 becomes `petsname_3`; parentheses turn into `_`.
pub(crate) fn param_name(field: &str, counter: usize) -> String {
    let base = field.replace('.', "").replace(['(', ')'], "_");
    format!("{base}_{counter}")
}

/// Prefixes a bare field with `acronym`; dotted fields are already qualified.
pub(crate) fn qualify(acronym: &str, field: &str) -> String {
    if field == "*" {
        acronym.to_string()
    } else if field.contains('.') {
        field.to_string()
    } else {
        format!("{acronym}.{field}")
    }
}

/// Joins rendered conditions left to right with their own operators.
///
/// Whenever the operator changes, everything before it is parenthesized so the string groups
/// exactly like the left fold: `a or b and c` renders as `(a or b) and c`.
pub(crate) fn fold_conditions(items: Vec<(WhereOperator, String)>) -> Option<String> {
    let mut folded: Option<String> = None;
    let mut last: Option<WhereOperator> = None;

    for (operation, rendered) in items {
        folded = Some(match folded {
            None => rendered,
            Some(previous) => {
                let previous = match last {
                    Some(last) if last != operation => format!("({previous})"),
                    _ => previous,
                };
                last = Some(operation);
                format!("{previous} {operation} {rendered}")
            }
        });
    }

    folded
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryMode {
    Select,
    Count,
    SubQuery,
}

/// One query level: the root entity, its acronym and its clauses.
pub(crate) struct Level<'a> {
    pub entity: &'static EntityMeta,
    pub acronym: &'a str,
    pub clauses: &'a Clauses<Hql>,
}

/// `select … from <Entity> <acronym> <joins> <fetches> <where> <group by> <order by>`, empty parts
/// omitted. Fetch joins only apply when the entity itself is selected.
pub(crate) fn render(level: &Level<'_>, mode: QueryMode, context: &mut Context) -> Result<String> {
    let acronym = level.acronym;
    let clauses = level.clauses;
    let mut parts = Vec::new();

    match mode {
        QueryMode::Select => parts.push(construct_selects(&clauses.selects, acronym)),
        QueryMode::Count => parts.push(format!("select count({acronym})")),
        QueryMode::SubQuery => parts.push(construct_sub_query_select(&clauses.selects, acronym)?),
    }
    parts.push(format!("from {} {acronym}", level.entity.name));
    let mut aliases = Aliases::new(level.entity, acronym);
    parts.push(construct_joins(&clauses.joins, acronym, &mut aliases, context)?);
    if mode == QueryMode::Select && clauses.selects.is_empty() {
        parts.push(construct_fetches(&clauses.fetches, acronym));
    } else if !clauses.fetches.is_empty() {
        trace!("fetch joins skipped for a {mode:?} query");
    }
    parts.push(construct_where(&clauses.wheres, acronym, &aliases, context)?);
    parts.push(construct_group_by(&clauses.group_by, acronym));
    if mode != QueryMode::Count {
        parts.push(construct_orders(&clauses.orders, acronym));
    }

    parts.retain(|part| !part.is_empty());
    Ok(parts.join(" "))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_names() {
        assert_eq!(param_name("pets.name", 3), "petsname_3");
        assert_eq!(param_name("count(id)", 1), "count_id__1");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("user", "name"), "user.name");
        assert_eq!(qualify("user", "pets.name"), "pets.name");
        assert_eq!(qualify("user", "*"), "user");
    }

    #[test]
    fn test_fold_parenthesizes_on_operator_change() {
        let items = vec![
            (WhereOperator::And, "a".to_string()),
            (WhereOperator::Or, "b".to_string()),
            (WhereOperator::And, "c".to_string()),
            (WhereOperator::And, "d".to_string()),
        ];
        assert_eq!(fold_conditions(items).unwrap(), "(a or b) and c and d");
        assert_eq!(fold_conditions(Vec::new()), None);
    }

    #[test]
    fn test_alias_value_types() {
        use hefesto::model::Entity;

        use super::fixtures::*;

        let mut aliases = Aliases::new(User::meta(), "user");
        aliases.register("t", Toy::meta());
        assert_eq!(aliases.value_type("age"), Some(ValueType::Int));
        assert_eq!(aliases.value_type("user.age"), Some(ValueType::Int));
        assert_eq!(aliases.value_type("address.city"), Some(ValueType::String));
        assert_eq!(aliases.value_type("t.id"), Some(ValueType::Long));
        assert_eq!(aliases.value_type("pets"), None);
        assert_eq!(aliases.value_type("unknown.id"), None);
    }

    #[test]
    fn test_context_counter_is_shared() {
        let mut context = Context::new();
        assert_eq!(context.bind("status", "A".into()), ":status_1");
        assert_eq!(context.bind("status", "B".into()), ":status_2");
        let params = context.into_params();
        assert_eq!(params.get("status_2"), Some(&Value::from("B")));
    }
}
