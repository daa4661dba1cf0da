//! Operator enums shared by every clause kind.

use std::fmt::{self, Display};

/// Comparison operator of a where clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operator {
    #[default]
    Equal,
    Diff,
    LessOrEqual,
    Less,
    GreaterOrEqual,
    Greater,
    In,
    Like,
    NotLike,
    NotIn,
    IsNull,
    IsNotNull,
    FindInSet,
    NotFindInSet,
}

impl Operator {
    /// Query-language spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Diff => "<>",
            Operator::LessOrEqual => "<=",
            Operator::Less => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::Greater => ">",
            Operator::In => "in",
            Operator::Like => "like",
            Operator::NotLike => "not like",
            Operator::NotIn => "not in",
            Operator::IsNull => "is null",
            Operator::IsNotNull => "is not null",
            Operator::FindInSet | Operator::NotFindInSet => "find_in_set",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equal => "EQUAL",
            Operator::Diff => "DIFF",
            Operator::LessOrEqual => "LESS_OR_EQUAL",
            Operator::Less => "LESS",
            Operator::GreaterOrEqual => "GREATER_OR_EQUAL",
            Operator::Greater => "GREATER",
            Operator::In => "IN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT_LIKE",
            Operator::NotIn => "NOT_IN",
            Operator::IsNull => "IS_NULL",
            Operator::IsNotNull => "IS_NOT_NULL",
            Operator::FindInSet => "FIND_IN_SET",
            Operator::NotFindInSet => "NOT_FIND_IN_SET",
        }
    }

    /// Operators whose comparison value is coerced to the field type.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Less | Operator::LessOrEqual | Operator::Greater | Operator::GreaterOrEqual
        )
    }

    /// Operators accepted by a field-to-field comparison.
    pub fn is_field_comparable(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::Diff
                | Operator::Like
                | Operator::NotLike
                | Operator::Less
                | Operator::LessOrEqual
                | Operator::Greater
                | Operator::GreaterOrEqual
        )
    }

    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a clause attaches to the clauses before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WhereOperator {
    #[default]
    And,
    Or,
}

impl WhereOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhereOperator::And => "and",
            WhereOperator::Or => "or",
        }
    }
}

impl Display for WhereOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinOperator {
    #[default]
    Inner,
    Left,
    Right,
}

impl JoinOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinOperator::Inner => "inner",
            JoinOperator::Left => "left",
            JoinOperator::Right => "right",
        }
    }
}

impl Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate function applied to a selected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectOperator {
    Count,
    Avg,
    Min,
    Max,
    Sum,
}

impl SelectOperator {
    pub fn function(&self) -> &'static str {
        match self {
            SelectOperator::Count => "count",
            SelectOperator::Avg => "avg",
            SelectOperator::Min => "min",
            SelectOperator::Max => "max",
            SelectOperator::Sum => "sum",
        }
    }

    pub fn apply(&self, field: &str) -> String {
        format!("{}({field})", self.function())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sort {
    #[default]
    Asc,
    Desc,
}

impl Sort {
    pub fn name(&self) -> &'static str {
        match self {
            Sort::Asc => "ASC",
            Sort::Desc => "DESC",
        }
    }
}
