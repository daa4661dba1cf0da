//! Clause value model shared by both translators.
//!
//! Clauses are plain records created while the builder chain runs. Nothing here validates
//! operator/value combinations; that happens when a translator walks the clauses.

mod join;
mod select;
mod wheres;

use std::fmt::Debug;

pub use join::{Join, JoinCondition};
pub use select::{GroupBy, JoinFetch, Order, Select};
pub use wheres::{CollectionWhere, Where, WhereClause, WhereCustom, WhereExist, WhereField, WhereValue};

/// Ties the clause model to a translator.
///
/// `SubQuery` is the nested builder a where clause may carry as its value, `Custom` is the
/// escape-hatch condition (a predicate-producing closure or a raw query fragment).
pub trait Backend: Debug + 'static {
    type SubQuery: Debug;
    type Custom: Debug;
}
