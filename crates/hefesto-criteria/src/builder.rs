//! The typed-criteria query builder.
//!
//! ```ignore
//! let users = Hefesto::<User>::make()
//!     .with_session(session)
//!     .join("pets")
//!     .where_eq("status", "ACTIVE")
//!     .where_op("pets.name", Operator::Like, "R%")
//!     .order_by("name")
//!     .get()?;
//! ```

use std::{fmt, marker::PhantomData};

use hefesto::{
    builder::{Clauses, ConditionalBuilder},
    cast::cast_value,
    clause::Backend,
    config::Config,
    error::{HefestoError, Result},
    impl_clause_builders,
    model::{Entity, EntityMeta},
    operator::{Operator, WhereOperator},
    page::Page,
    projector::{FromRow, Row},
    value::{Value, ValueType},
};
use tracing::debug;

use crate::{
    construct::Scope,
    criteria::{CriteriaQuery, Predicate},
    executor::{compile, QueryMode},
    session::{self, SessionHandle},
};

/// Marker tying the clause model to the typed translator.
#[derive(Debug)]
pub struct Criteria;

impl Backend for Criteria {
    type SubQuery = SubQueryBuilder;
    type Custom = CustomPredicate;
}

type PredicateFn = dyn Fn(&Scope) -> Result<Predicate> + Send + Sync;

/// A caller supplied condition, built against the translation scope.
pub struct CustomPredicate(Box<PredicateFn>);

impl CustomPredicate {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&Scope) -> Result<Predicate> + Send + Sync + 'static,
    {
        Self(Box::new(build))
    }

    pub fn predicate(&self, scope: &Scope) -> Result<Predicate> {
        (self.0)(scope)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomPredicate(..)")
    }
}

/// `where_custom` for every typed builder and where group.
pub trait CustomWhere: ConditionalBuilder<Criteria> {
    fn where_custom<F>(self, build: F) -> Self
    where
        F: Fn(&Scope) -> Result<Predicate> + Send + Sync + 'static,
    {
        let operation = self.where_operation();
        self.push_custom(CustomPredicate::new(build), operation)
    }

    fn or_where_custom<F>(self, build: F) -> Self
    where
        F: Fn(&Scope) -> Result<Predicate> + Send + Sync + 'static,
    {
        self.push_custom(CustomPredicate::new(build), WhereOperator::Or)
    }
}

impl<T: ConditionalBuilder<Criteria>> CustomWhere for T {}

/// Sub queries configured through a closure over a fresh builder of `S`.
///
/// For the `IN` forms the result type is taken from the sub query's single select on `S`,
/// `Long` when it cannot be resolved, unless one was set explicitly.
pub trait SubQueryWhere: ConditionalBuilder<Criteria> {
    fn where_in_with<S, F>(self, field: &str, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        let operation = self.where_operation();
        let sub_query = SubQueryBuilder::inferred(configure(Hefesto::make()));
        self.push_sub_query(field, Operator::In, sub_query, operation)
    }

    fn or_where_in_with<S, F>(self, field: &str, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        let sub_query = SubQueryBuilder::inferred(configure(Hefesto::make()));
        self.push_sub_query(field, Operator::In, sub_query, WhereOperator::Or)
    }

    fn where_not_in_with<S, F>(self, field: &str, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        let operation = self.where_operation();
        let sub_query = SubQueryBuilder::inferred(configure(Hefesto::make()));
        self.push_sub_query(field, Operator::NotIn, sub_query, operation)
    }

    fn or_where_not_in_with<S, F>(self, field: &str, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        let sub_query = SubQueryBuilder::inferred(configure(Hefesto::make()));
        self.push_sub_query(field, Operator::NotIn, sub_query, WhereOperator::Or)
    }

    fn where_exists_with<S, F>(self, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        let operation = self.where_operation();
        self.push_exists(configure(Hefesto::<S>::make()), true, operation)
    }

    fn where_not_exists_with<S, F>(self, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        let operation = self.where_operation();
        self.push_exists(configure(Hefesto::<S>::make()), false, operation)
    }

    fn or_where_exists_with<S, F>(self, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        self.push_exists(configure(Hefesto::<S>::make()), true, WhereOperator::Or)
    }

    fn or_where_not_exists_with<S, F>(self, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        self.push_exists(configure(Hefesto::<S>::make()), false, WhereOperator::Or)
    }
}

impl<T: ConditionalBuilder<Criteria>> SubQueryWhere for T {}

/// A nested query used as the value of an `IN` or `EXISTS` condition.
#[derive(Debug)]
pub struct SubQueryBuilder {
    root: &'static EntityMeta,
    clauses: Clauses<Criteria>,
    custom_result: Option<ValueType>,
}

impl_clause_builders!(SubQueryBuilder, Criteria, clauses);

impl SubQueryBuilder {
    pub fn new(root: &'static EntityMeta) -> Self {
        Self {
            root,
            clauses: Clauses::new(),
            custom_result: None,
        }
    }

    pub fn of<E: Entity>() -> Self {
        Self::new(E::meta())
    }

    /// Type of the selected column, required by `IN`.
    pub fn custom_result(mut self, value_type: ValueType) -> Self {
        self.custom_result = Some(value_type);
        self
    }

    pub fn custom_result_type(&self) -> Option<ValueType> {
        self.custom_result
    }

    pub fn has_custom_result(&self) -> bool {
        self.custom_result.is_some()
    }

    pub fn selects_size(&self) -> usize {
        self.clauses.selects.len()
    }

    pub fn root(&self) -> &'static EntityMeta {
        self.root
    }

    pub fn clauses(&self) -> &Clauses<Criteria> {
        &self.clauses
    }

    pub fn into_clauses(self) -> Clauses<Criteria> {
        self.clauses
    }

    fn inferred<S: FromRow>(builder: Hefesto<S>) -> Self {
        let mut sub_query = Self::from(builder);
        if sub_query.custom_result.is_none() {
            let inferred = sub_query
                .clauses
                .selects
                .iter()
                .next()
                .and_then(|select| sub_query.root.resolve_path(&select.field))
                .and_then(|field| field.value_type())
                .unwrap_or(ValueType::Long);
            sub_query.custom_result = Some(inferred);
        }
        sub_query
    }
}

impl<S: FromRow> From<Hefesto<S>> for SubQueryBuilder {
    fn from(builder: Hefesto<S>) -> Self {
        Self {
            root: builder.root,
            clauses: builder.clauses,
            custom_result: builder.custom_result,
        }
    }
}

/// Fluent query over the entity `root`, projecting results onto `R`.
///
/// `R` is the entity itself for [`Hefesto::make`], or any [`FromRow`] type when selects are
/// projected with [`Hefesto::make_for`].
pub struct Hefesto<R: FromRow> {
    root: &'static EntityMeta,
    clauses: Clauses<Criteria>,
    custom_result: Option<ValueType>,
    session: Option<SessionHandle>,
    config: Config,
    _result: PhantomData<fn() -> R>,
}

impl_clause_builders!(Hefesto<R>, Criteria, clauses, <R: FromRow>);

impl<E: Entity> Hefesto<E> {
    pub fn make() -> Self {
        Self::make_for::<E>()
    }
}

impl<R: FromRow> Hefesto<R> {
    /// A builder over the entity `E` whose rows are projected onto `R`.
    pub fn make_for<E: Entity>() -> Self {
        Self {
            root: E::meta(),
            clauses: Clauses::new(),
            custom_result: None,
            session: None,
            config: Config::default_config(),
            _result: PhantomData,
        }
    }

    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn root(&self) -> &'static EntityMeta {
        self.root
    }

    pub fn selects_size(&self) -> usize {
        self.clauses.selects.len()
    }

    /// Sets the column type this builder yields when used as an `IN` sub query.
    pub fn set_custom_result_for_sub_query(mut self, value_type: ValueType) -> Self {
        self.custom_result = Some(value_type);
        self
    }

    pub fn has_custom_result_for_sub_query(&self) -> bool {
        self.custom_result.is_some()
    }

    /// Translates the clauses without executing them.
    pub fn build_query(&self) -> Result<CriteriaQuery> {
        compile(self.root, &self.clauses, QueryMode::Select)
    }

    pub fn get(&self) -> Result<Vec<R>> {
        let query = self.build_query()?;
        project(self.run(&query)?)
    }

    /// The selected columns as raw rows.
    pub fn get_selects(&self) -> Result<Vec<Row>> {
        self.require_selects()?;
        let query = self.build_query()?;
        self.run(&query)
    }

    pub fn find_first(&self) -> Result<Option<R>> {
        self.first_row()?.map(|row| R::from_row(&row)).transpose()
    }

    pub fn find_first_by(self, field: &str, value: impl Into<Value>) -> Result<Option<R>> {
        self.where_eq(field, value).find_first()
    }

    pub fn find_first_by_op(self, field: &str, operator: Operator, value: impl Into<Value>) -> Result<Option<R>> {
        self.where_op(field, operator, value).find_first()
    }

    pub fn find_first_by_id(self, id: impl Into<Value>) -> Result<Option<R>> {
        self.find_first_by("id", id)
    }

    /// `limit` rows starting at `offset`, with the total row count of the unpaged query.
    pub fn page(&self, limit: u64, offset: u64) -> Result<Page<R>> {
        let total = self.count_results()?;

        let mut query = self.build_query()?;
        query.first_result = Some(offset);
        query.max_results = Some(limit);
        let data = project(self.run(&query)?)?;

        Ok(Page::new(data, offset, total))
    }

    /// The first page, sized by the configured `default_page_size`.
    pub fn page_first(&self) -> Result<Page<R>> {
        self.page(self.config.default_page_size(), 0)
    }

    /// Number of rows, or of groups when the query is grouped.
    pub fn count_results(&self) -> Result<u64> {
        let query = compile(self.root, &self.clauses, QueryMode::Count)?;
        let rows = self.run(&query)?;

        if !query.group_by.is_empty() {
            return Ok(rows.len() as u64);
        }
        match rows.first().and_then(Row::first) {
            Some(value) => count_of(value),
            None => Ok(0),
        }
    }

    pub fn exist(&self) -> Result<bool> {
        Ok(self.count_results()? > 0)
    }

    pub fn exist_by(self, field: &str, value: impl Into<Value>) -> Result<bool> {
        self.where_eq(field, value).exist()
    }

    pub fn exist_by_op(self, field: &str, operator: Operator, value: impl Into<Value>) -> Result<bool> {
        self.where_op(field, operator, value).exist()
    }

    /// Projects the selected columns onto `T` instead of `R`.
    pub fn find_for<T: FromRow>(&self) -> Result<Vec<T>> {
        project(self.get_selects()?)
    }

    pub fn find_first_for<T: FromRow>(&self) -> Result<Option<T>> {
        self.require_selects()?;
        self.first_row()?.map(|row| T::from_row(&row)).transpose()
    }

    fn first_row(&self) -> Result<Option<Row>> {
        let mut query = self.build_query()?;
        query.first_result = None;
        query.max_results = Some(1);
        Ok(self.run(&query)?.into_iter().next())
    }

    fn require_selects(&self) -> Result<()> {
        if self.clauses.selects.is_empty() {
            return Err(HefestoError::query("You need put at least one select"));
        }
        Ok(())
    }

    fn run(&self, query: &CriteriaQuery) -> Result<Vec<Row>> {
        let session = self.session.as_ref().ok_or_else(|| {
            HefestoError::query(format!(
                "No session set for the query on '{}'; use with_session or a HefestoFactory",
                self.root.name
            ))
        })?;
        if self.config.log_queries() {
            debug!("criteria query on {}: {query:?}", self.root.name);
        }
        session::execute(session, query)
    }
}

impl<R: FromRow> fmt::Debug for Hefesto<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hefesto")
            .field("root", &self.root.name)
            .field("clauses", &self.clauses)
            .field("custom_result", &self.custom_result)
            .field("session", &self.session.is_some())
            .finish()
    }
}

fn project<T: FromRow>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}

fn count_of(value: &Value) -> Result<u64> {
    match cast_value(ValueType::Long, value)? {
        Value::Long(count) => Ok(count.max(0) as u64),
        other => Err(HefestoError::Execution(format!("count returned {}", other.type_name()))),
    }
}

/// Creates builders bound to one session and configuration.
#[derive(Clone)]
pub struct HefestoFactory {
    session: SessionHandle,
    config: Config,
}

impl HefestoFactory {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            config: Config::default_config(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn make<E: Entity>(&self) -> Hefesto<E> {
        self.make_for::<E, E>()
    }

    pub fn make_for<E: Entity, R: FromRow>(&self) -> Hefesto<R> {
        Hefesto::<R>::make_for::<E>()
            .with_session(self.session.clone())
            .with_config(self.config.clone())
    }
}
