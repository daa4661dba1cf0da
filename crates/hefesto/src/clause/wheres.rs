use crate::{
    clause::Backend,
    operator::{Operator, WhereOperator},
    value::Value,
};

/// Right-hand side of a [`Where`]: a plain value or a nested builder.
#[derive(Debug)]
pub enum WhereValue<B: Backend> {
    Value(Value),
    SubQuery(B::SubQuery),
}

impl<B: Backend> WhereValue<B> {
    pub fn is_null(&self) -> bool {
        matches!(self, WhereValue::Value(Value::Null))
    }
}

impl<B: Backend> From<Value> for WhereValue<B> {
    fn from(value: Value) -> Self {
        WhereValue::Value(value)
    }
}

/// `field <operator> value`.
#[derive(Debug)]
pub struct Where<B: Backend> {
    pub field: String,
    pub operator: Operator,
    pub value: WhereValue<B>,
    pub where_operation: WhereOperator,
}

impl<B: Backend> Where<B> {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: WhereValue::Value(value.into()),
            where_operation: WhereOperator::And,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Equal, value)
    }

    /// A clause without comparison value, such as `IS NULL`.
    pub fn unary(field: impl Into<String>, operator: Operator) -> Self {
        Self::new(field, operator, Value::Null)
    }

    pub fn sub_query(field: impl Into<String>, operator: Operator, sub_query: B::SubQuery) -> Self {
        Self {
            field: field.into(),
            operator,
            value: WhereValue::SubQuery(sub_query),
            where_operation: WhereOperator::And,
        }
    }

    pub fn with_operation(mut self, where_operation: WhereOperator) -> Self {
        self.where_operation = where_operation;
        self
    }
}

/// Compares two fields; `second_field` may live on the root, a join or the parent query.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereField {
    pub field: String,
    pub second_field: String,
    pub operator: Operator,
    pub where_operation: WhereOperator,
}

impl WhereField {
    pub fn new(field: impl Into<String>, operator: Operator, second_field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            second_field: second_field.into(),
            operator,
            where_operation: WhereOperator::And,
        }
    }

    pub fn with_operation(mut self, where_operation: WhereOperator) -> Self {
        self.where_operation = where_operation;
        self
    }
}

/// `EXISTS (sub query)` or `NOT EXISTS (sub query)`.
#[derive(Debug)]
pub struct WhereExist<B: Backend> {
    pub sub_query: B::SubQuery,
    pub exists: bool,
    pub where_operation: WhereOperator,
}

impl<B: Backend> WhereExist<B> {
    pub fn new(sub_query: B::SubQuery, exists: bool) -> Self {
        Self {
            sub_query,
            exists,
            where_operation: WhereOperator::And,
        }
    }

    pub fn with_operation(mut self, where_operation: WhereOperator) -> Self {
        self.where_operation = where_operation;
        self
    }
}

/// A parenthesized group of clauses attached to its siblings with `where_operation`.
#[derive(Debug)]
pub struct CollectionWhere<B: Backend> {
    pub wheres: Vec<WhereClause<B>>,
    pub where_operation: WhereOperator,
}

impl<B: Backend> CollectionWhere<B> {
    pub fn new(wheres: Vec<WhereClause<B>>) -> Self {
        Self {
            wheres,
            where_operation: WhereOperator::And,
        }
    }

    pub fn with_operation(mut self, where_operation: WhereOperator) -> Self {
        self.where_operation = where_operation;
        self
    }
}

#[derive(Debug)]
pub struct WhereCustom<B: Backend> {
    pub custom: B::Custom,
    pub where_operation: WhereOperator,
}

impl<B: Backend> WhereCustom<B> {
    pub fn new(custom: B::Custom, where_operation: WhereOperator) -> Self {
        Self {
            custom,
            where_operation,
        }
    }
}

/// Every kind of where clause a builder accepts.
#[derive(Debug)]
pub enum WhereClause<B: Backend> {
    Where(Where<B>),
    Field(WhereField),
    Exist(WhereExist<B>),
    Collection(CollectionWhere<B>),
    Custom(WhereCustom<B>),
}

impl<B: Backend> WhereClause<B> {
    pub fn where_operation(&self) -> WhereOperator {
        match self {
            WhereClause::Where(w) => w.where_operation,
            WhereClause::Field(w) => w.where_operation,
            WhereClause::Exist(w) => w.where_operation,
            WhereClause::Collection(w) => w.where_operation,
            WhereClause::Custom(w) => w.where_operation,
        }
    }
}

impl<B: Backend> From<Where<B>> for WhereClause<B> {
    fn from(value: Where<B>) -> Self {
        WhereClause::Where(value)
    }
}

impl<B: Backend> From<WhereField> for WhereClause<B> {
    fn from(value: WhereField) -> Self {
        WhereClause::Field(value)
    }
}

impl<B: Backend> From<WhereExist<B>> for WhereClause<B> {
    fn from(value: WhereExist<B>) -> Self {
        WhereClause::Exist(value)
    }
}

impl<B: Backend> From<CollectionWhere<B>> for WhereClause<B> {
    fn from(value: CollectionWhere<B>) -> Self {
        WhereClause::Collection(value)
    }
}

impl<B: Backend> From<WhereCustom<B>> for WhereClause<B> {
    fn from(value: WhereCustom<B>) -> Self {
        WhereClause::Custom(value)
    }
}
