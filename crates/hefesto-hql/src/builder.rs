//! The string query builder.
//!
//! ```ignore
//! let query = Hefesto::<User>::make()
//!     .join("pets")
//!     .where_eq("status", "ACTIVE")
//!     .or_where_eq("status", "PENDING")
//!     .order_by("name")
//!     .get_query()?;
//! assert_eq!(
//!     query.query,
//!     "from User user inner join user.pets pets \
//!      where user.status = :status_1 or user.status = :status_2 order by user.name ASC"
//! );
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
    construct::{render, Context, Level, QueryMode},
    query::HqlQuery,
    session::{self, SessionHandle},
};

/// Marker tying the clause model to the string translator. Custom conditions are raw query
/// fragments.
#[derive(Debug)]
pub struct Hql;

impl Backend for Hql {
    type SubQuery = SubQueryBuilder;
    type Custom = String;
}

/// `where_raw` for every string builder and where group.
pub trait RawWhere: ConditionalBuilder<Hql> {
    /// Inserts `raw` into the where clause as written.
    fn where_raw(self, raw: impl Into<String>) -> Self {
        let operation = self.where_operation();
        self.push_custom(raw.into(), operation)
    }

    fn or_where_raw(self, raw: impl Into<String>) -> Self {
        self.push_custom(raw.into(), WhereOperator::Or)
    }
}

impl<T: ConditionalBuilder<Hql>> RawWhere for T {}

/// Sub queries configured through a closure over a fresh builder of `S`.
pub trait SubQueryWhere: ConditionalBuilder<Hql> {
    fn where_in_with<S, F>(self, field: &str, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        let operation = self.where_operation();
        self.push_sub_query(field, Operator::In, configure(Hefesto::make()), operation)
    }

    fn or_where_in_with<S, F>(self, field: &str, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        self.push_sub_query(field, Operator::In, configure(Hefesto::make()), WhereOperator::Or)
    }

    fn where_not_in_with<S, F>(self, field: &str, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        let operation = self.where_operation();
        self.push_sub_query(field, Operator::NotIn, configure(Hefesto::make()), operation)
    }

    fn or_where_not_in_with<S, F>(self, field: &str, configure: F) -> Self
    where
        S: Entity,
        F: FnOnce(Hefesto<S>) -> Hefesto<S>,
    {
        self.push_sub_query(field, Operator::NotIn, configure(Hefesto::make()), WhereOperator::Or)
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

impl<T: ConditionalBuilder<Hql>> SubQueryWhere for T {}

/// A nested query used as the value of an `IN` or `EXISTS` condition.
#[derive(Debug)]
pub struct SubQueryBuilder {
    root: &'static EntityMeta,
    acronym: String,
    clauses: Clauses<Hql>,
}

impl_clause_builders!(SubQueryBuilder, Hql, clauses);

impl SubQueryBuilder {
    pub fn new(root: &'static EntityMeta) -> Self {
        Self {
            root,
            acronym: root.name.to_lowercase(),
            clauses: Clauses::new(),
        }
    }

    pub fn of<E: Entity>() -> Self {
        Self::new(E::meta())
    }

    /// Alias of the sub query's root, needed when it queries the same entity as the outer query.
    pub fn acronym_table(mut self, acronym: impl Into<String>) -> Self {
        self.acronym = acronym.into();
        self
    }

    pub fn acronym(&self) -> &str {
        &self.acronym
    }

    pub fn selects_size(&self) -> usize {
        self.clauses.selects.len()
    }

    pub fn root(&self) -> &'static EntityMeta {
        self.root
    }

    pub fn clauses(&self) -> &Clauses<Hql> {
        &self.clauses
    }
}

impl<S: FromRow> From<Hefesto<S>> for SubQueryBuilder {
    fn from(builder: Hefesto<S>) -> Self {
        Self {
            root: builder.root,
            acronym: builder.acronym,
            clauses: builder.clauses,
        }
    }
}

/// Fluent query over the entity `root`, rendered to a query string and projected onto `R`.
pub struct Hefesto<R: FromRow> {
    root: &'static EntityMeta,
    acronym: String,
    clauses: Clauses<Hql>,
    session: Option<SessionHandle>,
    config: Config,
    _result: PhantomData<fn() -> R>,
}

impl_clause_builders!(Hefesto<R>, Hql, clauses, <R: FromRow>);

impl<E: Entity> Hefesto<E> {
    pub fn make() -> Self {
        Self::make_for::<E>()
    }
}

impl<R: FromRow> Hefesto<R> {
    /// A builder over the entity `E` whose rows are projected onto `R`.
    pub fn make_for<E: Entity>() -> Self {
        let root = E::meta();
        Self {
            root,
            acronym: root.name.to_lowercase(),
            clauses: Clauses::new(),
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

    /// Replaces the root alias, the lowercase entity name by default.
    pub fn acronym_table(mut self, acronym: impl Into<String>) -> Self {
        self.acronym = acronym.into();
        self
    }

    pub fn acronym(&self) -> &str {
        &self.acronym
    }

    pub fn root(&self) -> &'static EntityMeta {
        self.root
    }

    pub fn selects_size(&self) -> usize {
        self.clauses.selects.len()
    }

    /// The query `get` would run, with its parameters and paging.
    pub fn get_query(&self) -> Result<HqlQuery> {
        self.build(QueryMode::Select)
    }

    /// The query `count_results` would run: same joins, where and group by, no paging.
    pub fn count_query(&self) -> Result<HqlQuery> {
        self.build(QueryMode::Count)
    }

    pub fn get(&self) -> Result<Vec<R>> {
        let query = self.get_query()?;
        project(self.run(&query)?)
    }

    /// The selected columns as raw rows.
    pub fn get_selects(&self) -> Result<Vec<Row>> {
        self.require_selects()?;
        let query = self.get_query()?;
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

        let mut query = self.get_query()?;
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
        let query = self.count_query()?;
        let rows = self.run(&query)?;

        if !self.clauses.group_by.is_empty() {
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

    fn build(&self, mode: QueryMode) -> Result<HqlQuery> {
        let level = Level {
            entity: self.root,
            acronym: &self.acronym,
            clauses: &self.clauses,
        };
        let mut context = Context::new();
        let rendered = render(&level, mode, &mut context)?;

        let mut query = HqlQuery::new(rendered, context.into_params());
        if mode == QueryMode::Select {
            query.first_result = self.clauses.offset;
            query.max_results = self.clauses.limit;
        }
        Ok(query)
    }

    fn first_row(&self) -> Result<Option<Row>> {
        let mut query = self.get_query()?;
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

    fn run(&self, query: &HqlQuery) -> Result<Vec<Row>> {
        let session = self.session.as_ref().ok_or_else(|| {
            HefestoError::query(format!(
                "No session set for the query on '{}'; use with_session or a HefestoFactory",
                self.root.name
            ))
        })?;
        if self.config.log_queries() {
            debug!("hql: {query} params: {:?}", query.params);
        }
        session::execute(session, query)
    }
}

impl<R: FromRow> fmt::Debug for Hefesto<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hefesto")
            .field("root", &self.root.name)
            .field("acronym", &self.acronym)
            .field("clauses", &self.clauses)
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

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use hefesto::{
        builder::{RelationBuilder, SelectBuilder, SortBuilder},
        operator::JoinOperator,
        projector::ProjectionBuilder,
    };

    use super::*;
    use crate::{construct::fixtures::*, session::QuerySession};

    /// Records every query and answers with queued results, empty once they run out.
    #[derive(Default)]
    struct Recording {
        executed: Vec<HqlQuery>,
        results: VecDeque<Vec<Row>>,
    }

    impl QuerySession for Recording {
        fn execute(&mut self, query: &HqlQuery) -> Result<Vec<Row>> {
            self.executed.push(query.clone());
            Ok(self.results.pop_front().unwrap_or_default())
        }
    }

    fn factory(results: Vec<Vec<Row>>) -> (HefestoFactory, Arc<Mutex<Recording>>) {
        let recording = Arc::new(Mutex::new(Recording {
            executed: Vec::new(),
            results: results.into(),
        }));
        let handle: SessionHandle = recording.clone();
        (HefestoFactory::new(handle), recording)
    }

    fn executed(recording: &Arc<Mutex<Recording>>) -> Vec<HqlQuery> {
        recording.lock().unwrap().executed.clone()
    }

    fn user(id: i64, name: &str) -> Row {
        Row::single(Value::object(User {
            id,
            name: name.to_string(),
            status: "ACTIVE".to_string(),
            ..Default::default()
        }))
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct UserSummary {
        name: String,
        city: Option<String>,
    }

    impl FromRow for UserSummary {
        fn projection(builder: ProjectionBuilder<Self>) -> ProjectionBuilder<Self> {
            builder
                .default(UserSummary::default)
                .setter("name", |s: &mut Self, v| s.name = v)
                .setter("address_city", |s: &mut Self, v| s.city = v)
        }
    }

    #[test]
    fn test_or_chain() {
        let query = Hefesto::<User>::make()
            .where_eq("status", "ACTIVE")
            .or_where_eq("status", "PENDING")
            .get_query()
            .unwrap();
        assert_eq!(
            query.query,
            "from User user where user.status = :status_1 or user.status = :status_2"
        );
        assert_eq!(query.param("status_1"), Some(&Value::from("ACTIVE")));
        assert_eq!(query.param("status_2"), Some(&Value::from("PENDING")));
    }

    #[test]
    fn test_full_shape() {
        let query = Hefesto::<User>::make()
            .join_as("pets", "p")
            .add_select("status")
            .count_as("p.id", "total")
            .where_op("age", Operator::Greater, 18i32)
            .group_by("status")
            .order_by("status")
            .limit(5)
            .offset(10)
            .get_query()
            .unwrap();
        assert_eq!(
            query.query,
            "select user.status as status, count(p.id) as total from User user inner join user.pets p \
             where user.age > :age_1 group by user.status order by user.status ASC"
        );
        assert_eq!(query.first_result, Some(10));
        assert_eq!(query.max_results, Some(5));
    }

    #[test]
    fn test_count_query_drops_fetches_orders_and_paging() {
        let builder = Hefesto::<User>::make()
            .with("pets")
            .where_eq("status", "ACTIVE")
            .order_by("name")
            .limit(3);
        assert_eq!(
            builder.get_query().unwrap().query,
            "from User user inner join fetch user.pets as pets where user.status = :status_1 \
             order by user.name ASC"
        );

        let count = builder.count_query().unwrap();
        assert_eq!(count.query, "select count(user) from User user where user.status = :status_1");
        assert_eq!(count.max_results, None);
    }

    #[test]
    fn test_custom_acronym() {
        let query = Hefesto::<User>::make()
            .acronym_table("u")
            .join_type("pets", JoinOperator::Left)
            .where_eq("name", "Ada")
            .get_query()
            .unwrap();
        assert_eq!(query.query, "from User u left join u.pets pets where u.name = :name_1");
    }

    #[test]
    fn test_entity_join() {
        let query = Hefesto::<User>::make()
            .join_on::<Address>("user_id", "id")
            .where_eq("address.city", "London")
            .get_query()
            .unwrap();
        assert_eq!(
            query.query,
            "from User user inner join Address address on address.user_id = user.id \
             where address.city = :addresscity_1"
        );
    }

    #[test]
    fn test_sub_query_with_closure() {
        let query = Hefesto::<User>::make()
            .where_eq("status", "ACTIVE")
            .where_in_with::<UserPet, _>("id", |pets| pets.add_select("user_id").where_eq("name", "Rex"))
            .get_query()
            .unwrap();
        assert_eq!(
            query.query,
            "from User user where user.status = :status_1 and user.id in \
             (select userpet.user_id from UserPet userpet where userpet.name = :name_2)"
        );
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_correlated_sub_query_on_same_entity() {
        let query = Hefesto::<User>::make()
            .where_not_exists_with::<User, _>(|other| {
                other
                    .acronym_table("other")
                    .where_field("email", "user.email")
                    .where_field_op("id", Operator::Diff, "user.id")
            })
            .get_query()
            .unwrap();
        assert_eq!(
            query.query,
            "from User user where not exists (select other from User other \
             where other.email = user.email and other.id <> user.id)"
        );
    }

    #[test]
    fn test_raw_inside_group() {
        let query = Hefesto::<User>::make()
            .where_eq("status", "ACTIVE")
            .where_any(|group| group.where_raw("size(user.pets) > 2").where_is_null("age"))
            .get_query()
            .unwrap();
        assert_eq!(
            query.query,
            "from User user where user.status = :status_1 and (size(user.pets) > 2 or user.age is null)"
        );
    }

    #[test]
    fn test_get_projects_entities() {
        let (factory, recording) = factory(vec![vec![user(1, "Ada"), user(2, "Grace")]]);
        let users = factory.make::<User>().where_eq("status", "ACTIVE").get().unwrap();

        assert_eq!(users.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(), vec!["Ada", "Grace"]);
        let executed = executed(&recording);
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].query, "from User user where user.status = :status_1");
    }

    #[test]
    fn test_page_counts_then_fetches() {
        let (factory, recording) = factory(vec![
            vec![Row::single(Value::Long(42))],
            vec![user(21, "Ada"), user(22, "Grace")],
        ]);
        let page = factory
            .make::<User>()
            .where_eq("status", "ACTIVE")
            .order_by("id")
            .page(10, 20)
            .unwrap();

        assert_eq!(page.total, 42);
        assert_eq!(page.page, 20);
        assert_eq!(page.data.len(), 2);

        let executed = executed(&recording);
        assert_eq!(executed[0].query, "select count(user) from User user where user.status = :status_1");
        assert_eq!(executed[0].first_result, None);
        assert_eq!(executed[1].first_result, Some(20));
        assert_eq!(executed[1].max_results, Some(10));
        assert_eq!(executed[0].params, executed[1].params);
    }

    #[test]
    fn test_page_first_uses_configured_size() {
        let (factory, recording) = factory(vec![vec![Row::single(Value::Long(0))]]);
        let config = Config::from_toml("default_page_size = 5").unwrap();
        let page = factory.with_config(config).make::<User>().page_first().unwrap();

        assert!(page.is_empty());
        assert_eq!(executed(&recording)[1].max_results, Some(5));
    }

    #[test]
    fn test_grouped_count_is_the_number_of_groups() {
        let groups = vec![Row::single(Value::Long(2)), Row::single(Value::Long(1)), Row::single(Value::Long(1))];
        let (factory, recording) = factory(vec![groups]);
        let count = factory.make::<User>().group_by("status").count_results().unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            executed(&recording)[0].query,
            "select count(user) from User user group by user.status"
        );
    }

    #[test]
    fn test_exist_by() {
        let (factory, recording) = factory(vec![vec![Row::single(Value::Long(1))], vec![]]);
        assert!(factory.make::<User>().exist_by("email", "ada@example.com").unwrap());
        assert!(!factory.make::<User>().exist().unwrap());
        assert_eq!(
            executed(&recording)[0].query,
            "select count(user) from User user where user.email = :email_1"
        );
    }

    #[test]
    fn test_find_first_by_id() {
        let (factory, recording) = factory(vec![vec![user(7, "Linus")]]);
        let found = factory.make::<User>().offset(4).find_first_by_id(7i64).unwrap();

        assert_eq!(found.map(|u| u.id), Some(7));
        let executed = executed(&recording);
        assert_eq!(executed[0].query, "from User user where user.id = :id_1");
        assert_eq!(executed[0].max_results, Some(1));
        assert_eq!(executed[0].first_result, None);
    }

    #[test]
    fn test_find_for_projects_selects() {
        let rows = vec![Row::aliased([
            ("name", Value::from("Ada")),
            ("address_city", Value::from("London")),
        ])];
        let (factory, recording) = factory(vec![rows]);
        let summaries = factory
            .make::<User>()
            .join_type("address", JoinOperator::Left)
            .add_select("name")
            .add_select("address.city")
            .find_for::<UserSummary>()
            .unwrap();

        assert_eq!(
            summaries,
            vec![UserSummary {
                name: "Ada".into(),
                city: Some("London".into()),
            }]
        );
        assert_eq!(
            executed(&recording)[0].query,
            "select user.name as name, address.city as address_city from User user \
             left join user.address address"
        );
    }

    #[test]
    fn test_find_first_for_needs_a_select() {
        let (factory, recording) = factory(Vec::new());
        let err = factory.make::<User>().find_first_for::<UserSummary>().unwrap_err();
        assert!(err.to_string().contains("You need put at least one select"));
        assert!(executed(&recording).is_empty());
    }

    #[test]
    fn test_translation_errors_never_reach_the_session() {
        let (factory, recording) = factory(Vec::new());
        let err = factory
            .make::<User>()
            .where_op("id", Operator::In, 3i64)
            .get()
            .unwrap_err();
        assert!(matches!(err, HefestoError::UnsupportedOperation(_)));
        assert!(executed(&recording).is_empty());
    }

    #[test]
    fn test_missing_session() {
        let err = Hefesto::<User>::make().get().unwrap_err();
        assert!(err.to_string().contains("No session set"));
    }
}
