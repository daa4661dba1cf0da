use crate::{
    clause::{Backend, CollectionWhere, Where, WhereClause, WhereCustom, WhereExist, WhereField},
    construct::ConstructWhere,
    operator::{Operator, WhereOperator},
    value::Value,
};

/// Where-clause surface shared by builders, subquery builders and where groups.
///
/// Methods without an `or_` prefix attach with [`ConditionalBuilder::where_operation`], which is
/// `AND` for builders and the group operator inside [`WhereGroup`].
pub trait ConditionalBuilder<B: Backend>: Sized {
    fn wheres_mut(&mut self) -> &mut ConstructWhere<B>;

    fn where_operation(&self) -> WhereOperator {
        WhereOperator::And
    }

    /// Adds any where clause as is.
    fn where_clause(mut self, clause: impl Into<WhereClause<B>>) -> Self {
        self.wheres_mut().add(clause);
        self
    }

    fn push_where(mut self, field: &str, operator: Operator, value: Value, where_operation: WhereOperator) -> Self {
        if value.is_null() {
            return self;
        }
        self.wheres_mut()
            .add(Where::<B>::new(field, operator, value).with_operation(where_operation));
        self
    }

    /// `field = value`; skipped when `value` is null.
    fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        let operation = self.where_operation();
        self.push_where(field, Operator::Equal, value.into(), operation)
    }

    /// `field <operator> value`; skipped when `value` is null.
    fn where_op(self, field: &str, operator: Operator, value: impl Into<Value>) -> Self {
        let operation = self.where_operation();
        self.push_where(field, operator, value.into(), operation)
    }

    fn or_where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.push_where(field, Operator::Equal, value.into(), WhereOperator::Or)
    }

    fn or_where_op(self, field: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.push_where(field, operator, value.into(), WhereOperator::Or)
    }

    fn push_list<I>(self, field: &str, operator: Operator, values: I, where_operation: WhereOperator) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self;
        }
        self.push_where(field, operator, Value::List(values), where_operation)
    }

    /// `field in (values)`; skipped when `values` is empty.
    fn where_in<I>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let operation = self.where_operation();
        self.push_list(field, Operator::In, values, operation)
    }

    fn or_where_in<I>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.push_list(field, Operator::In, values, WhereOperator::Or)
    }

    fn where_not_in<I>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let operation = self.where_operation();
        self.push_list(field, Operator::NotIn, values, operation)
    }

    fn or_where_not_in<I>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.push_list(field, Operator::NotIn, values, WhereOperator::Or)
    }

    fn push_sub_query(
        mut self,
        field: &str,
        operator: Operator,
        sub_query: impl Into<B::SubQuery>,
        where_operation: WhereOperator,
    ) -> Self {
        self.wheres_mut()
            .add(Where::<B>::sub_query(field, operator, sub_query.into()).with_operation(where_operation));
        self
    }

    /// `field in (sub query)`; the sub query must select exactly one column.
    fn where_in_query(self, field: &str, sub_query: impl Into<B::SubQuery>) -> Self {
        let operation = self.where_operation();
        self.push_sub_query(field, Operator::In, sub_query, operation)
    }

    fn or_where_in_query(self, field: &str, sub_query: impl Into<B::SubQuery>) -> Self {
        self.push_sub_query(field, Operator::In, sub_query, WhereOperator::Or)
    }

    fn where_not_in_query(self, field: &str, sub_query: impl Into<B::SubQuery>) -> Self {
        let operation = self.where_operation();
        self.push_sub_query(field, Operator::NotIn, sub_query, operation)
    }

    fn or_where_not_in_query(self, field: &str, sub_query: impl Into<B::SubQuery>) -> Self {
        self.push_sub_query(field, Operator::NotIn, sub_query, WhereOperator::Or)
    }

    fn push_unary(mut self, field: &str, operator: Operator, where_operation: WhereOperator) -> Self {
        self.wheres_mut()
            .add(Where::<B>::unary(field, operator).with_operation(where_operation));
        self
    }

    fn where_is_null(self, field: &str) -> Self {
        let operation = self.where_operation();
        self.push_unary(field, Operator::IsNull, operation)
    }

    fn where_is_not_null(self, field: &str) -> Self {
        let operation = self.where_operation();
        self.push_unary(field, Operator::IsNotNull, operation)
    }

    fn or_where_is_null(self, field: &str) -> Self {
        self.push_unary(field, Operator::IsNull, WhereOperator::Or)
    }

    fn or_where_is_not_null(self, field: &str) -> Self {
        self.push_unary(field, Operator::IsNotNull, WhereOperator::Or)
    }

    /// `field = second_field`, both resolved as field paths.
    fn where_field(self, field: &str, second_field: &str) -> Self {
        self.where_field_op(field, Operator::Equal, second_field)
    }

    fn where_field_op(mut self, field: &str, operator: Operator, second_field: &str) -> Self {
        let operation = self.where_operation();
        self.wheres_mut()
            .add(WhereField::new(field, operator, second_field).with_operation(operation));
        self
    }

    fn or_where_field(self, field: &str, second_field: &str) -> Self {
        self.or_where_field_op(field, Operator::Equal, second_field)
    }

    fn or_where_field_op(mut self, field: &str, operator: Operator, second_field: &str) -> Self {
        self.wheres_mut()
            .add(WhereField::new(field, operator, second_field).with_operation(WhereOperator::Or));
        self
    }

    fn push_exists(mut self, sub_query: impl Into<B::SubQuery>, exists: bool, where_operation: WhereOperator) -> Self {
        self.wheres_mut()
            .add(WhereExist::<B>::new(sub_query.into(), exists).with_operation(where_operation));
        self
    }

    fn where_exists(self, sub_query: impl Into<B::SubQuery>) -> Self {
        let operation = self.where_operation();
        self.push_exists(sub_query, true, operation)
    }

    fn where_not_exists(self, sub_query: impl Into<B::SubQuery>) -> Self {
        let operation = self.where_operation();
        self.push_exists(sub_query, false, operation)
    }

    fn or_where_exists(self, sub_query: impl Into<B::SubQuery>) -> Self {
        self.push_exists(sub_query, true, WhereOperator::Or)
    }

    fn or_where_not_exists(self, sub_query: impl Into<B::SubQuery>) -> Self {
        self.push_exists(sub_query, false, WhereOperator::Or)
    }

    /// Adds the clauses as one parenthesized group.
    fn where_group(mut self, wheres: Vec<WhereClause<B>>) -> Self {
        let operation = self.where_operation();
        self.wheres_mut()
            .add(CollectionWhere::new(wheres).with_operation(operation));
        self
    }

    fn or_where_group(mut self, wheres: Vec<WhereClause<B>>) -> Self {
        self.wheres_mut()
            .add(CollectionWhere::new(wheres).with_operation(WhereOperator::Or));
        self
    }

    /// Adds a backend specific condition, see the backend's extension traits.
    fn push_custom(mut self, custom: B::Custom, where_operation: WhereOperator) -> Self {
        self.wheres_mut().add(WhereCustom::new(custom, where_operation));
        self
    }

    fn push_group<F>(mut self, children: WhereOperator, attach: WhereOperator, configure: F) -> Self
    where
        F: FnOnce(WhereGroup<B>) -> WhereGroup<B>,
    {
        let group = configure(WhereGroup::new(children));
        self.wheres_mut().graft(group.wheres, attach);
        self
    }

    /// A parenthesized group whose conditions are joined with `OR`.
    ///
    /// ```ignore
    /// builder.where_any(|group| group.where_eq("name", "Ada").where_eq("name", "Grace"))
    /// ```
    fn where_any<F>(self, configure: F) -> Self
    where
        F: FnOnce(WhereGroup<B>) -> WhereGroup<B>,
    {
        let operation = self.where_operation();
        self.push_group(WhereOperator::Or, operation, configure)
    }

    /// A parenthesized group whose conditions are joined with `AND`.
    fn where_all<F>(self, configure: F) -> Self
    where
        F: FnOnce(WhereGroup<B>) -> WhereGroup<B>,
    {
        let operation = self.where_operation();
        self.push_group(WhereOperator::And, operation, configure)
    }

    fn or_where_any<F>(self, configure: F) -> Self
    where
        F: FnOnce(WhereGroup<B>) -> WhereGroup<B>,
    {
        self.push_group(WhereOperator::Or, WhereOperator::Or, configure)
    }

    fn or_where_all<F>(self, configure: F) -> Self
    where
        F: FnOnce(WhereGroup<B>) -> WhereGroup<B>,
    {
        self.push_group(WhereOperator::And, WhereOperator::Or, configure)
    }
}

/// Conditions collected by [`ConditionalBuilder::where_any`] and friends.
///
/// Every condition added without an `or_` prefix carries the group operator. Empty groups are
/// dropped.
#[derive(Debug)]
pub struct WhereGroup<B: Backend> {
    wheres: ConstructWhere<B>,
    operation: WhereOperator,
}

impl<B: Backend> WhereGroup<B> {
    pub fn new(operation: WhereOperator) -> Self {
        Self {
            wheres: ConstructWhere::new(),
            operation,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wheres.is_empty()
    }

    pub fn into_wheres(self) -> ConstructWhere<B> {
        self.wheres
    }
}

impl<B: Backend> ConditionalBuilder<B> for WhereGroup<B> {
    fn wheres_mut(&mut self) -> &mut ConstructWhere<B> {
        &mut self.wheres
    }

    fn where_operation(&self) -> WhereOperator {
        self.operation
    }
}
