//! An in-memory [`CriteriaSession`] over fixture records.
//!
//! Every entity table is a list of [`Record`]s; relations are the nested records the fixtures
//! carry, so a relation join walks into the parent record while an entity join scans the
//! joined entity's table. Predicates use three-valued logic: a comparison involving null is
//! unknown and only rows whose condition is true survive.

use std::{cmp::Ordering, collections::HashMap, fs, path::Path as FsPath, sync::Arc};

use hefesto::{
    cast::cast_value,
    error::{HefestoError, Result},
    model::{Entity, EntityMeta, FieldKind},
    operator::{JoinOperator, SelectOperator, Sort},
    projector::Row,
    value::{Record, Value, ValueType},
};
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::{
    criteria::{
        Comparison, CriteriaQuery, Expression, FromNode, JoinKind, JoinNode, Path, Predicate, SubQuery,
    },
    session::CriteriaSession,
};

/// Fixture tables keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tables: HashMap<String, Vec<Arc<Record>>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: Record) {
        self.tables
            .entry(record.entity.clone())
            .or_default()
            .push(Arc::new(record));
    }

    pub fn with(mut self, record: Record) -> Self {
        self.insert(record);
        self
    }

    pub fn records(&self, entity: &str) -> &[Arc<Record>] {
        self.tables.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Loads a JSON array of `E` objects. Field values are cast to the mapped types, nested
    /// objects and arrays become relation records.
    pub fn load_json<E: Entity>(&mut self, json: &str) -> Result<()> {
        let parsed: JsonValue = serde_json::from_str(json)
            .map_err(|err| HefestoError::InvalidArgument(format!("invalid fixture JSON: {err}")))?;

        let JsonValue::Array(items) = parsed else {
            return Err(HefestoError::InvalidArgument(format!(
                "fixtures for '{}' must be a JSON array",
                E::meta().name
            )));
        };

        for item in &items {
            let record = record_from_json(E::meta(), item)?;
            self.insert(record);
        }
        debug!("loaded {} '{}' fixture(s)", items.len(), E::meta().name);
        Ok(())
    }

    pub fn load_json_file<E: Entity, P: AsRef<FsPath>>(&mut self, path: P) -> Result<()> {
        let content = fs::read_to_string(path.as_ref())?;
        self.load_json::<E>(&content)
    }
}

fn record_from_json(meta: &'static EntityMeta, json: &JsonValue) -> Result<Record> {
    let JsonValue::Object(object) = json else {
        return Err(HefestoError::InvalidArgument(format!(
            "fixture for '{}' must be a JSON object, got {json}",
            meta.name
        )));
    };

    let mut record = Record::new(meta.name);
    for (key, raw) in object {
        let Some(field) = meta.field(key) else {
            trace!("'{}' has no attribute '{key}', fixture value skipped", meta.name);
            continue;
        };

        let value = match (field.kind, raw) {
            (_, JsonValue::Null) => Value::Null,
            (FieldKind::Basic(value_type), raw) => scalar_from_json(value_type, raw)?,
            (
                FieldKind::Relation {
                    target,
                    many: true,
                },
                JsonValue::Array(items),
            ) => Value::List(
                items
                    .iter()
                    .map(|item| record_from_json(target(), item).map(Value::record))
                    .collect::<Result<_>>()?,
            ),
            (
                FieldKind::Relation {
                    target,
                    many: false,
                },
                raw,
            ) => Value::record(record_from_json(target(), raw)?),
            (_, other) => {
                return Err(HefestoError::InvalidArgument(format!(
                    "'{}.{key}' expects a list of records, got {other}",
                    meta.name
                )))
            }
        };
        record.set(key.as_str(), value);
    }
    Ok(record)
}

fn scalar_from_json(value_type: ValueType, json: &JsonValue) -> Result<Value> {
    let value = match json {
        JsonValue::Bool(v) => Value::Bool(*v),
        JsonValue::String(v) => Value::String(v.clone()),
        JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(v), _) => Value::Long(v),
            (None, Some(v)) => Value::Double(v),
            (None, None) => Value::String(n.to_string()),
        },
        other => {
            return Err(HefestoError::InvalidArgument(format!(
                "expected a {value_type} fixture value, got {other}"
            )))
        }
    };
    cast_value(value_type, &value)
}

/// One candidate row: the root record followed by one slot per join node.
type Tuple = Vec<Option<Arc<Record>>>;

/// Evaluates queries against a [`Dataset`] and remembers every query it ran.
#[derive(Debug, Default)]
pub struct MemorySession {
    dataset: Dataset,
    executed: Vec<CriteriaQuery>,
}

impl MemorySession {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            executed: Vec::new(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn executed(&self) -> &[CriteriaQuery] {
        &self.executed
    }

    fn select(&self, query: &CriteriaQuery, outer: &[Tuple]) -> Result<Vec<Row>> {
        let tuples = self.filtered(query, outer)?;
        let empty: Tuple = vec![None; query.joins.len() + 1];

        let mut groups: Vec<Vec<Tuple>> = if query.is_grouped() {
            self.group(query, outer, tuples)?
        } else {
            tuples.into_iter().map(|tuple| vec![tuple]).collect()
        };

        if !query.orders.is_empty() {
            let mut keyed = Vec::with_capacity(groups.len());
            for group in groups {
                let current = group.first().unwrap_or(&empty);
                let keys = query
                    .orders
                    .iter()
                    .map(|order| self.evaluate(&order.expression, outer, current))
                    .collect::<Result<Vec<_>>>()?;
                keyed.push((keys, group));
            }
            keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, query));
            groups = keyed.into_iter().map(|(_, group)| group).collect();
        }

        let offset = query.first_result.unwrap_or(0) as usize;
        let limit = query.max_results.map(|max| max as usize).unwrap_or(usize::MAX);

        groups
            .iter()
            .skip(offset)
            .take(limit)
            .map(|group| self.project(query, outer, group, &empty))
            .collect()
    }

    /// Joined tuples that satisfy the where predicate.
    fn filtered(&self, query: &CriteriaQuery, outer: &[Tuple]) -> Result<Vec<Tuple>> {
        let mut tuples: Vec<Tuple> = self
            .dataset
            .records(query.root.name)
            .iter()
            .map(|record| vec![Some(record.clone())])
            .collect();

        for (idx, node) in query.joins.iter().enumerate() {
            tuples = self.join(node, idx, tuples, outer)?;
        }

        let mut kept = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            let matches = match &query.predicate {
                Some(predicate) => self.test(predicate, outer, &tuple)? == Some(true),
                None => true,
            };
            if matches && fetches_present(query, &tuple) {
                kept.push(tuple);
            }
        }
        Ok(kept)
    }

    fn join(&self, node: &JoinNode, idx: usize, tuples: Vec<Tuple>, outer: &[Tuple]) -> Result<Vec<Tuple>> {
        let mut joined = Vec::new();
        let mut matched: Vec<Arc<Record>> = Vec::new();

        for tuple in tuples {
            let mut any = false;
            for candidate in self.candidates(node, &tuple) {
                let mut next = tuple.clone();
                next.push(Some(candidate.clone()));
                let accepted = match &node.on {
                    Some(on) => self.test(on, outer, &next)? == Some(true),
                    None => true,
                };
                if accepted {
                    any = true;
                    matched.push(candidate);
                    joined.push(next);
                }
            }
            if !any && node.join_type == JoinOperator::Left {
                let mut next = tuple;
                next.push(None);
                joined.push(next);
            }
        }

        if node.join_type == JoinOperator::Right {
            for record in self.dataset.records(node.entity.name) {
                if !matched.iter().any(|m| **m == **record) {
                    let mut next: Tuple = vec![None; idx + 1];
                    next.push(Some(record.clone()));
                    joined.push(next);
                }
            }
        }

        Ok(joined)
    }

    fn candidates(&self, node: &JoinNode, tuple: &Tuple) -> Vec<Arc<Record>> {
        match node.kind {
            JoinKind::Entity => self.dataset.records(node.entity.name).to_vec(),
            JoinKind::Relation => {
                let Some(Some(parent)) = tuple.get(slot(node.parent)) else {
                    return Vec::new();
                };
                match parent.get(&node.attribute) {
                    Value::Record(record) => vec![record.clone()],
                    Value::List(values) => values
                        .iter()
                        .filter_map(|value| match value {
                            Value::Record(record) => Some(record.clone()),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                }
            }
        }
    }

    fn group(&self, query: &CriteriaQuery, outer: &[Tuple], tuples: Vec<Tuple>) -> Result<Vec<Vec<Tuple>>> {
        if query.group_by.is_empty() {
            return Ok(vec![tuples]);
        }

        let mut groups: Vec<(Vec<Value>, Vec<Tuple>)> = Vec::new();
        for tuple in tuples {
            let key = query
                .group_by
                .iter()
                .map(|expression| self.evaluate(expression, outer, &tuple))
                .collect::<Result<Vec<_>>>()?;
            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, members)) => members.push(tuple),
                None => groups.push((key, vec![tuple])),
            }
        }
        Ok(groups.into_iter().map(|(_, members)| members).collect())
    }

    fn project(&self, query: &CriteriaQuery, outer: &[Tuple], group: &[Tuple], empty: &Tuple) -> Result<Row> {
        let current = group.first().unwrap_or(empty);
        let mut values = Vec::with_capacity(query.selections.len());
        let mut aliases = Vec::with_capacity(query.selections.len());

        for selection in &query.selections {
            let value = match &selection.expression {
                Expression::Aggregate {
                    function,
                    argument,
                } => self.aggregate(*function, argument, outer, group)?,
                expression => self.evaluate(expression, outer, current)?,
            };
            values.push(value);
            aliases.push(selection.alias.clone());
        }
        Ok(Row::new(values, aliases))
    }

    fn aggregate(&self, function: SelectOperator, argument: &Expression, outer: &[Tuple], group: &[Tuple]) -> Result<Value> {
        let mut values = Vec::with_capacity(group.len());
        for tuple in group {
            let value = self.evaluate(argument, outer, tuple)?;
            if !value.is_null() {
                values.push(value);
            }
        }

        Ok(match function {
            SelectOperator::Count => Value::Long(values.len() as i64),
            _ if values.is_empty() => Value::Null,
            SelectOperator::Sum => sum(&values)?,
            SelectOperator::Avg => {
                let Value::Double(total) = cast_value(ValueType::Double, &sum(&values)?)? else {
                    return Err(HefestoError::Execution("avg over non numeric values".into()));
                };
                Value::Double(total / values.len() as f64)
            }
            SelectOperator::Min => extreme(values, Ordering::Less),
            SelectOperator::Max => extreme(values, Ordering::Greater),
        })
    }

    /// Value of `expression` for the row `current`; `outer` holds the rows of enclosing
    /// queries, indexed by depth.
    fn evaluate(&self, expression: &Expression, outer: &[Tuple], current: &Tuple) -> Result<Value> {
        match expression {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Path(path) => Ok(self.path_value(path, outer, current)),
            Expression::Function {
                name,
                args,
            } => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, outer, current))
                    .collect::<Result<Vec<_>>>()?;
                call(name, &args)
            }
            Expression::Aggregate {
                function, ..
            } => Err(HefestoError::Execution(format!(
                "{} can only be evaluated over a group",
                function.function()
            ))),
        }
    }

    fn path_value(&self, path: &Path, outer: &[Tuple], current: &Tuple) -> Value {
        let tuple = if path.from.depth < outer.len() {
            &outer[path.from.depth]
        } else {
            current
        };
        let Some(Some(record)) = tuple.get(slot(path.from.node)) else {
            return Value::Null;
        };

        let mut value = Value::Record(record.clone());
        for attribute in &path.attributes {
            value = match &value {
                Value::Record(record) => record.get(attribute).clone(),
                _ => return Value::Null,
            };
        }
        value
    }

    fn test(&self, predicate: &Predicate, outer: &[Tuple], current: &Tuple) -> Result<Option<bool>> {
        Ok(match predicate {
            Predicate::Compare {
                left,
                comparison,
                right,
            } => {
                let left = self.evaluate(left, outer, current)?;
                let right = self.evaluate(right, outer, current)?;
                compare(&left, *comparison, &right)
            }
            Predicate::Like {
                expression,
                pattern,
                negated,
            } => {
                let value = self.evaluate(expression, outer, current)?;
                let pattern = self.evaluate(pattern, outer, current)?;
                if value.is_null() || pattern.is_null() {
                    None
                } else {
                    let found = like(&pattern.to_string())?.is_match(&value.to_string());
                    Some(found != *negated)
                }
            }
            Predicate::IsNull(expression) => Some(self.evaluate(expression, outer, current)?.is_null()),
            Predicate::IsNotNull(expression) => Some(!self.evaluate(expression, outer, current)?.is_null()),
            Predicate::In {
                expression,
                values,
            } => {
                let value = self.evaluate(expression, outer, current)?;
                contains(&value, values)
            }
            Predicate::InSubQuery {
                expression,
                sub_query,
            } => {
                let value = self.evaluate(expression, outer, current)?;
                let rows = self.sub_select(sub_query, outer, current)?;
                let values: Vec<Value> = rows.into_iter().filter_map(|row| row.into_values().into_iter().next()).collect();
                contains(&value, &values)
            }
            Predicate::Exists(sub_query) => Some(!self.sub_select(sub_query, outer, current)?.is_empty()),
            Predicate::Not(inner) => self.test(inner, outer, current)?.map(|value| !value),
            Predicate::And(left, right) => match self.test(left, outer, current)? {
                Some(false) => Some(false),
                left => match (left, self.test(right, outer, current)?) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                },
            },
            Predicate::Or(left, right) => match self.test(left, outer, current)? {
                Some(true) => Some(true),
                left => match (left, self.test(right, outer, current)?) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                },
            },
        })
    }

    fn sub_select(&self, sub_query: &SubQuery, outer: &[Tuple], current: &Tuple) -> Result<Vec<Row>> {
        let mut frames = outer.to_vec();
        frames.push(current.clone());
        self.select(&sub_query.query, &frames)
    }
}

impl CriteriaSession for MemorySession {
    fn execute(&mut self, query: &CriteriaQuery) -> Result<Vec<Row>> {
        let rows = self.select(query, &[])?;
        trace!("memory session returned {} row(s) for {}", rows.len(), query.root.name);
        self.executed.push(query.clone());
        Ok(rows)
    }
}

fn slot(node: FromNode) -> usize {
    match node {
        FromNode::Root => 0,
        FromNode::Join(idx) => idx + 1,
    }
}

/// Inner fetch joins drop roots whose fetched relation is empty.
fn fetches_present(query: &CriteriaQuery, tuple: &Tuple) -> bool {
    let Some(Some(root)) = tuple.first() else {
        return true;
    };
    query
        .fetches
        .iter()
        .filter(|fetch| fetch.join_type == JoinOperator::Inner)
        .all(|fetch| {
            let mut value = Value::Record(root.clone());
            for attribute in fetch.attribute.split('.') {
                value = match &value {
                    Value::Record(record) => record.get(attribute).clone(),
                    Value::List(values) => Value::List(
                        values
                            .iter()
                            .filter_map(|v| v.as_record().map(|r| r.get(attribute).clone()))
                            .collect(),
                    ),
                    _ => Value::Null,
                };
            }
            match value {
                Value::Null => false,
                Value::List(values) => values.iter().any(|v| !v.is_null()),
                _ => true,
            }
        })
}

fn compare(left: &Value, comparison: Comparison, right: &Value) -> Option<bool> {
    if left.is_null() || right.is_null() {
        return None;
    }
    let ordering = match left.compare(right) {
        Some(ordering) => ordering,
        None => {
            return match comparison {
                Comparison::Equal => Some(left == right),
                Comparison::NotEqual => Some(left != right),
                _ => None,
            }
        }
    };
    Some(match comparison {
        Comparison::Equal => ordering == Ordering::Equal,
        Comparison::NotEqual => ordering != Ordering::Equal,
        Comparison::Less => ordering == Ordering::Less,
        Comparison::LessOrEqual => ordering != Ordering::Greater,
        Comparison::Greater => ordering == Ordering::Greater,
        Comparison::GreaterOrEqual => ordering != Ordering::Less,
    })
}

fn contains(value: &Value, values: &[Value]) -> Option<bool> {
    if value.is_null() {
        return None;
    }
    if values.iter().any(|candidate| compare(value, Comparison::Equal, candidate) == Some(true)) {
        return Some(true);
    }
    if values.iter().any(Value::is_null) {
        None
    } else {
        Some(false)
    }
}

/// Translates a SQL `LIKE` pattern: `%` matches any run of characters, `_` exactly one.
fn like(pattern: &str) -> Result<Regex> {
    let mut expression = String::from("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => expression.push_str(".*"),
            '_' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    Regex::new(&expression).map_err(|err| HefestoError::Execution(format!("invalid LIKE pattern '{pattern}': {err}")))
}

fn call(name: &str, args: &[Value]) -> Result<Value> {
    match (name, args) {
        ("find_in_set", [needle, haystack]) => {
            if needle.is_null() || haystack.is_null() {
                return Ok(Value::Null);
            }
            let needle = needle.to_string();
            let position = haystack
                .to_string()
                .split(',')
                .position(|item| item == needle)
                .map(|idx| idx as i64 + 1)
                .unwrap_or(0);
            Ok(Value::Long(position))
        }
        _ => Err(HefestoError::Execution(format!(
            "function '{name}' with {} argument(s) is not supported",
            args.len()
        ))),
    }
}

fn sum(values: &[Value]) -> Result<Value> {
    let integral = values
        .iter()
        .all(|value| matches!(value, Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_)));

    if integral {
        let mut total = 0i64;
        for value in values {
            if let Value::Long(v) = cast_value(ValueType::Long, value)? {
                total += v;
            }
        }
        return Ok(Value::Long(total));
    }

    let mut total = 0f64;
    for value in values {
        match cast_value(ValueType::Double, value)? {
            Value::Double(v) => total += v,
            other => {
                return Err(HefestoError::Execution(format!(
                    "cannot sum a {} value",
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::Double(total))
}

fn extreme(values: Vec<Value>, wanted: Ordering) -> Value {
    values
        .into_iter()
        .reduce(|best, value| {
            if value.compare(&best) == Some(wanted) {
                value
            } else {
                best
            }
        })
        .unwrap_or_default()
}

/// Orders sort keys; nulls come first in ascending order.
fn compare_keys(a: &[Value], b: &[Value], query: &CriteriaQuery) -> Ordering {
    for ((left, right), order) in a.iter().zip(b).zip(&query.orders) {
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => left.compare(right).unwrap_or(Ordering::Equal),
        };
        let ordering = match order.sort {
            Sort::Asc => ordering,
            Sort::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use hefesto::model::Entity;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::{
        construct::fixtures::*,
        criteria::{FromRef, OrderBy, Selection},
    };

    fn users() -> Dataset {
        Dataset::new()
            .with(Record::new("User").with("id", 1i64).with("name", "Ada").with("age", 36))
            .with(Record::new("User").with("id", 2i64).with("name", "Grace"))
            .with(Record::new("User").with("id", 3i64).with("name", "Alan").with("age", 41))
    }

    fn path(field: &str) -> Expression {
        Expression::Path(Path {
            from: FromRef::root(0),
            attributes: vec![field.into()],
            value_type: None,
        })
    }

    #[test]
    fn test_null_comparison_is_unknown() {
        let mut session = MemorySession::new(users());
        let mut query = CriteriaQuery::new(User::meta(), 0);
        query.selections = vec![Selection {
            expression: path("name"),
            alias: Some("name".into()),
        }];
        query.predicate = Some(
            Predicate::compare(path("age"), Comparison::Greater, Expression::literal(30))
                .negate(),
        );
        assert!(session.execute(&query).unwrap().is_empty());

        query.predicate = Some(Predicate::compare(path("age"), Comparison::Greater, Expression::literal(40)));
        let rows = session.execute(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_alias("name"), Some(&Value::from("Alan")));
    }

    #[test]
    fn test_nulls_sort_first_and_paging() {
        let mut session = MemorySession::new(users());
        let mut query = CriteriaQuery::new(User::meta(), 0);
        query.selections = vec![Selection {
            expression: path("id"),
            alias: None,
        }];
        query.orders = vec![OrderBy {
            expression: path("age"),
            sort: Sort::Asc,
        }];
        let ids: Vec<Value> = session
            .execute(&query)
            .unwrap()
            .into_iter()
            .filter_map(|row| row.first().cloned())
            .collect();
        assert_eq!(ids, [Value::Long(2), Value::Long(1), Value::Long(3)]);

        query.first_result = Some(1);
        query.max_results = Some(1);
        let rows = session.execute(&query).unwrap();
        assert_eq!(rows, [Row::new(vec![Value::Long(1)], Vec::new())]);
        assert_eq!(session.executed().len(), 2);
    }

    #[test]
    fn test_aggregates_over_empty_set() {
        let mut session = MemorySession::new(Dataset::new());
        let mut query = CriteriaQuery::new(User::meta(), 0);
        query.selections = vec![
            Selection {
                expression: Expression::Aggregate {
                    function: SelectOperator::Count,
                    argument: Box::new(path("id")),
                },
                alias: None,
            },
            Selection {
                expression: Expression::Aggregate {
                    function: SelectOperator::Avg,
                    argument: Box::new(path("age")),
                },
                alias: None,
            },
        ];
        let rows = session.execute(&query).unwrap();
        assert_eq!(rows[0].values(), [Value::Long(0), Value::Null]);
    }

    #[test]
    fn test_like_patterns() {
        assert!(like("R%").unwrap().is_match("Rex"));
        assert!(like("_ex").unwrap().is_match("Rex"));
        assert!(!like("_ex").unwrap().is_match("Trex"));
        assert!(like("a.b%").unwrap().is_match("a.bc"));
        assert!(!like("a.b%").unwrap().is_match("axbc"));
    }

    #[test]
    fn test_find_in_set_positions() {
        assert_eq!(call("find_in_set", &["b".into(), "a,b,c".into()]).unwrap(), Value::Long(2));
        assert_eq!(call("find_in_set", &["z".into(), "a,b".into()]).unwrap(), Value::Long(0));
        assert!(call("soundex", &[]).is_err());
    }

    #[test]
    fn test_load_json_file_casts_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "7", "name": "Ada", "age": 36, "unknown": true,
                 "pets": [{{"id": 1, "name": "Rex"}}]}}]"#
        )
        .unwrap();

        let mut dataset = Dataset::new();
        dataset.load_json_file::<User, _>(file.path()).unwrap();
        let record = &dataset.records("User")[0];
        assert_eq!(record.get("id"), &Value::Long(7));
        assert_eq!(record.get("age"), &Value::Int(36));
        assert_eq!(record.get("unknown"), &Value::Null);
        let pets = record.get("pets").as_list().unwrap();
        assert_eq!(pets[0].as_record().unwrap().entity, "UserPet");
    }

    #[test]
    fn test_load_json_rejects_non_arrays() {
        let mut dataset = Dataset::new();
        assert!(dataset.load_json::<User>(r#"{"id": 1}"#).is_err());
        assert!(dataset.load_json::<User>("not json").is_err());
    }
}
