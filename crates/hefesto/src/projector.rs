//! Maps result rows onto Rust types.
//!
//! Every target type describes how it can be built through [`FromRow::projection`]: a default
//! constructor, typed constructors and named setters (optionally descending into nested
//! objects). The description is built once per type and cached by [`TypeId`].
//!
//! Strategies, tried in order:
//! 1. the first column already holds an instance of the target type ([`Value::Object`]);
//! 2. a registered constructor whose parameter types equal the row's value types;
//! 3. a single [`Value::Record`] column hydrates the default instance through its setters;
//! 4. the default instance, with each column applied through the setter named by its alias.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tracing::trace;

use crate::{
    error::{HefestoError, Result},
    value::{FromValue, Record, Value, ValueType},
};

type Cache = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static PROJECTORS: Lazy<RwLock<Cache>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// One result row: values plus the alias each column was selected under.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
    aliases: Vec<Option<String>>,
}

impl Row {
    pub fn new(values: Vec<Value>, mut aliases: Vec<Option<String>>) -> Self {
        aliases.resize(values.len(), None);
        Self {
            values,
            aliases,
        }
    }

    /// A single unaliased column, e.g. a whole entity or a count.
    pub fn single(value: impl Into<Value>) -> Self {
        Self::new(vec![value.into()], Vec::new())
    }

    pub fn aliased<K, V>(columns: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let (aliases, values) = columns
            .into_iter()
            .map(|(alias, value)| (Some(alias.into()), value.into()))
            .unzip();
        Self {
            values,
            aliases,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn aliases(&self) -> &[Option<String>] {
        &self.aliases
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    pub fn get_by_alias(&self, alias: &str) -> Option<&Value> {
        self.aliases
            .iter()
            .position(|a| a.as_deref() == Some(alias))
            .and_then(|idx| self.values.get(idx))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A type a result row can be projected onto.
pub trait FromRow: Clone + Send + Sync + 'static {
    /// Registers how instances are built. The default registers nothing, which only supports
    /// rows already holding an instance.
    fn projection(builder: ProjectionBuilder<Self>) -> ProjectionBuilder<Self> {
        builder
    }

    fn from_row(row: &Row) -> Result<Self> {
        Projector::<Self>::cached()?.project(row)
    }
}

type BuildFn<T> = Box<dyn Fn(Vec<Value>) -> Result<T> + Send + Sync>;
type SetFn<T> = Box<dyn Fn(&mut T, &Value) -> Result<()> + Send + Sync>;
type PathFn<T> = Box<dyn Fn(&mut T, &str, &Value) -> Result<()> + Send + Sync>;

struct Constructor<T> {
    types: Vec<ValueType>,
    build: BuildFn<T>,
}

enum Property<T> {
    Value(SetFn<T>),
    /// Receives the remaining path, empty when the column targets the property itself.
    Nested(PathFn<T>),
}

/// Collects the constructors and setters of `T`.
pub struct ProjectionBuilder<T> {
    default: Option<fn() -> T>,
    constructors: Vec<Constructor<T>>,
    properties: HashMap<String, Property<T>>,
}

impl<T: FromRow> ProjectionBuilder<T> {
    pub fn new() -> Self {
        Self {
            default: None,
            constructors: Vec::new(),
            properties: HashMap::new(),
        }
    }

    /// Registers the no-argument constructor used by the setter strategy.
    pub fn default(mut self, make: fn() -> T) -> Self {
        self.default = Some(make);
        self
    }

    /// Registers a constructor taking exactly one value per column, of the given types.
    pub fn constructor<F>(mut self, types: &[ValueType], build: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            types: types.to_vec(),
            build: Box::new(build),
        });
        self
    }

    pub fn setter<V, F>(mut self, name: &str, set: F) -> Self
    where
        V: FromValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let property = name.to_string();
        self.properties.insert(
            name.to_string(),
            Property::Value(Box::new(move |target: &mut T, value: &Value| {
                let value = V::from_value(value).map_err(|err| {
                    HefestoError::Projection(format!(
                        "cannot set '{property}' on {}: {err}",
                        std::any::type_name::<T>()
                    ))
                })?;
                set(target, value);
                Ok(())
            })),
        );
        self
    }

    /// Registers a nested object reachable through `name`. A `None` slot is instantiated
    /// before a deeper path is applied to it.
    pub fn nested<C, F>(mut self, name: &str, access: F) -> Self
    where
        C: FromRow,
        F: Fn(&mut T) -> &mut Option<C> + Send + Sync + 'static,
    {
        self.properties.insert(
            name.to_string(),
            Property::Nested(Box::new(move |target: &mut T, rest: &str, value: &Value| {
                let slot = access(target);
                if rest.is_empty() {
                    *slot = match value {
                        Value::Null => None,
                        other => Some(C::from_row(&Row::single(other.clone()))?),
                    };
                    return Ok(());
                }

                let projector = Projector::<C>::cached()?;
                if slot.is_none() {
                    *slot = Some(projector.instantiate()?);
                }
                match slot.as_mut() {
                    Some(child) => projector.apply(child, rest, value),
                    None => Ok(()),
                }
            })),
        );
        self
    }

    /// Registers a collection of nested objects, filled from a list of records.
    pub fn collection<C, F>(mut self, name: &str, access: F) -> Self
    where
        C: FromRow,
        F: Fn(&mut T) -> &mut Vec<C> + Send + Sync + 'static,
    {
        let property = name.to_string();
        self.properties.insert(
            name.to_string(),
            Property::Nested(Box::new(move |target: &mut T, rest: &str, value: &Value| {
                if !rest.is_empty() {
                    return Err(HefestoError::Projection(format!(
                        "cannot set '{rest}' through collection '{property}' on {}",
                        std::any::type_name::<T>()
                    )));
                }
                let items = match value {
                    Value::Null => Vec::new(),
                    Value::List(values) => values
                        .iter()
                        .map(|v| C::from_row(&Row::single(v.clone())))
                        .collect::<Result<Vec<_>>>()?,
                    other => vec![C::from_row(&Row::single(other.clone()))?],
                };
                *access(target) = items;
                Ok(())
            })),
        );
        self
    }

    pub fn build(self) -> Projector<T> {
        Projector {
            type_name: std::any::type_name::<T>(),
            default: self.default,
            constructors: self.constructors,
            properties: self.properties,
        }
    }
}

/// Cached projection metadata of one target type.
pub struct Projector<T> {
    type_name: &'static str,
    default: Option<fn() -> T>,
    constructors: Vec<Constructor<T>>,
    properties: HashMap<String, Property<T>>,
}

fn poisoned() -> HefestoError {
    HefestoError::Projection("projection cache lock poisoned".into())
}

impl<T: FromRow> Projector<T> {
    /// Returns the projector of `T`, building and caching it on first use.
    pub fn cached() -> Result<Arc<Projector<T>>> {
        let id = TypeId::of::<T>();
        let cached = PROJECTORS.read().map_err(|_| poisoned())?.get(&id).cloned();

        let entry = match cached {
            Some(entry) => entry,
            None => {
                trace!("registering projection for {}", std::any::type_name::<T>());
                let projector: Arc<dyn Any + Send + Sync> =
                    Arc::new(T::projection(ProjectionBuilder::new()).build());
                let mut cache = PROJECTORS.write().map_err(|_| poisoned())?;
                cache.entry(id).or_insert(projector).clone()
            }
        };

        entry.downcast::<Projector<T>>().map_err(|_| {
            HefestoError::Projection(format!(
                "cached projection has wrong type for {}",
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn project(&self, row: &Row) -> Result<T> {
        if let Some(Value::Object(object)) = row.first() {
            if let Some(instance) = object.downcast_ref::<T>() {
                return Ok(instance.clone());
            }
        }

        if let Some(constructor) = self.constructors.iter().find(|c| Self::matches(c, row)) {
            return (constructor.build)(row.values().to_vec());
        }

        if let (1, Some(Value::Record(record))) = (row.len(), row.first()) {
            return self.hydrate(record);
        }

        let Some(make) = self.default else {
            let types: Vec<&str> = row.values().iter().map(Value::type_name).collect();
            return Err(HefestoError::Projection(format!(
                "{} has no constructor for ({}) and no default constructor",
                self.type_name,
                types.join(", ")
            )));
        };

        let mut instance = make();
        for (idx, value) in row.values().iter().enumerate() {
            let alias = row.aliases()[idx].as_deref().ok_or_else(|| {
                HefestoError::Projection(format!(
                    "column {idx} projected onto {} has no alias",
                    self.type_name
                ))
            })?;
            self.apply(&mut instance, alias, value)?;
        }
        Ok(instance)
    }

    fn matches(constructor: &Constructor<T>, row: &Row) -> bool {
        constructor.types.len() == row.len()
            && constructor
                .types
                .iter()
                .zip(row.values())
                .all(|(expected, value)| value.value_type() == Some(*expected))
    }

    fn instantiate(&self) -> Result<T> {
        self.default.map(|make| make()).ok_or_else(|| {
            HefestoError::Projection(format!("{} has no default constructor", self.type_name))
        })
    }

    fn hydrate(&self, record: &Record) -> Result<T> {
        let mut instance = self.instantiate()?;
        for (field, value) in &record.fields {
            match self.properties.get(field) {
                Some(Property::Value(set)) => set(&mut instance, value)?,
                Some(Property::Nested(set)) => set(&mut instance, "", value)?,
                None => trace!("{} has no setter for '{field}', skipped", self.type_name),
            }
        }
        Ok(instance)
    }

    /// Applies `value` to the property addressed by `path`.
    ///
    /// Path segments are separated by `_` or `.`. Registered names are matched longest first,
    /// so a snake_case property such as `created_at` is never split.
    pub fn apply(&self, target: &mut T, path: &str, value: &Value) -> Result<()> {
        match self.properties.get(path) {
            Some(Property::Value(set)) => return set(target, value),
            Some(Property::Nested(set)) => return set(target, "", value),
            None => {}
        }

        let nested = self
            .properties
            .iter()
            .filter(|(name, _)| {
                path.len() > name.len()
                    && path.starts_with(name.as_str())
                    && matches!(path.as_bytes()[name.len()], b'_' | b'.')
            })
            .max_by_key(|(name, _)| name.len());

        match nested {
            Some((name, Property::Nested(set))) => set(target, &path[name.len() + 1..], value),
            _ => Err(HefestoError::Projection(format!(
                "no setter for '{path}' on {}",
                self.type_name
            ))),
        }
    }
}

macro_rules! impl_basic_from_row {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &Row) -> Result<Self> {
                    let value = row.first().ok_or_else(|| {
                        HefestoError::Projection(format!(
                            "empty row projected onto {}",
                            stringify!($ty)
                        ))
                    })?;
                    <$ty as FromValue>::from_value(value)
                }
            }
        )*
    };
}

impl_basic_from_row!(
    bool,
    i8,
    i16,
    i32,
    i64,
    i128,
    f32,
    f64,
    char,
    String,
    Decimal,
    NaiveDate,
    NaiveDateTime,
    Value,
);

impl<T> FromRow for Option<T>
where
    T: FromValue + Clone + Send + Sync + 'static,
{
    fn from_row(row: &Row) -> Result<Self> {
        match row.first() {
            Some(value) => Option::<T>::from_value(value),
            None => Ok(None),
        }
    }
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(row.clone())
    }
}
