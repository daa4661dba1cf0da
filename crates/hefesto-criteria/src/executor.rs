//! Assembles whole queries from a builder's clauses.

use hefesto::{
    builder::Clauses,
    error::Result,
    model::EntityMeta,
    operator::SelectOperator,
};
use tracing::trace;

use crate::{
    builder::{Criteria, SubQueryBuilder},
    construct::{
        construct_fetches, construct_group_by, construct_joins, construct_orders, construct_selects,
        construct_sub_query_select, construct_where, Scope,
    },
    criteria::{CriteriaQuery, Expression, Selection, SubQuery},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryMode {
    /// The selected columns, or the root entity with its fetch joins.
    Select,
    /// `count(root)` over the same joins, conditions and grouping.
    Count,
}

pub(crate) fn compile(root: &'static EntityMeta, clauses: &Clauses<Criteria>, mode: QueryMode) -> Result<CriteriaQuery> {
    let mut scope = Scope::new(root);
    let mut query = CriteriaQuery::new(root, 0);

    query.joins = construct_joins(&clauses.joins, &mut scope)?;
    trace!("{} join level(s) on {}", query.joins.len(), root.name);

    match mode {
        QueryMode::Select => {
            if clauses.selects.is_empty() {
                query.fetches = construct_fetches(&clauses.fetches, &scope)?;
            } else if !clauses.fetches.is_empty() {
                trace!("fetch joins ignored for a projection");
            }
            query.selections = construct_selects(&clauses.selects, &scope)?;
            query.orders = construct_orders(&clauses.orders, &scope)?;
            query.first_result = clauses.offset;
            query.max_results = clauses.limit;
        }
        QueryMode::Count => {
            if !clauses.fetches.is_empty() {
                trace!("fetch joins skipped in count mode");
            }
            query.selections = vec![Selection {
                expression: Expression::Aggregate {
                    function: SelectOperator::Count,
                    argument: Box::new(scope.root().into()),
                },
                alias: None,
            }];
        }
    }

    query.predicate = construct_where(&clauses.wheres, &scope)?;
    query.group_by = construct_group_by(&clauses.group_by, &scope)?;
    Ok(query)
}

/// Compiles a nested builder against the scope of the query that contains it.
pub(crate) fn compile_sub_query(sub_query: &SubQueryBuilder, parent: &Scope) -> Result<SubQuery> {
    let clauses = sub_query.clauses();
    let mut scope = parent.child(sub_query.root());
    let mut query = CriteriaQuery::new(sub_query.root(), scope.depth());

    query.joins = construct_joins(&clauses.joins, &mut scope)?;
    query.selections = vec![construct_sub_query_select(&clauses.selects, &scope)?];
    query.predicate = construct_where(&clauses.wheres, &scope)?;
    query.group_by = construct_group_by(&clauses.group_by, &scope)?;
    trace!("sub query on {} at depth {}", sub_query.root().name, scope.depth());

    Ok(SubQuery {
        query,
        result_type: sub_query.custom_result_type(),
    })
}
