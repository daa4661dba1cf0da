//! Builder surface shared by both backends.
//!
//! A backend builder owns a [`Clauses`] value and implements the accessor of each trait; every
//! chainable method comes from the default implementations here.

mod conditional;
mod join;

pub use conditional::{ConditionalBuilder, WhereGroup};
pub use join::JoinBuilder;

use crate::{
    clause::{Backend, GroupBy, Join, JoinFetch, Order, Select},
    construct::{ConstructGroupBy, ConstructJoin, ConstructJoinFetch, ConstructOrder, ConstructSelect, ConstructWhere},
    model::Entity,
    operator::{JoinOperator, SelectOperator, Sort},
};

/// Every clause collection of one query, plus paging.
#[derive(Debug)]
pub struct Clauses<B: Backend> {
    pub wheres: ConstructWhere<B>,
    pub joins: ConstructJoin,
    pub selects: ConstructSelect,
    pub orders: ConstructOrder,
    pub group_by: ConstructGroupBy,
    pub fetches: ConstructJoinFetch,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl<B: Backend> Default for Clauses<B> {
    fn default() -> Self {
        Self {
            wheres: ConstructWhere::new(),
            joins: ConstructJoin::new(),
            selects: ConstructSelect::new(),
            orders: ConstructOrder::new(),
            group_by: ConstructGroupBy::new(),
            fetches: ConstructJoinFetch::new(),
            limit: None,
            offset: None,
        }
    }
}

impl<B: Backend> Clauses<B> {
    pub fn new() -> Self {
        Self::default()
    }
}

pub trait SortBuilder: Sized {
    fn orders_mut(&mut self) -> &mut ConstructOrder;

    /// Ascending order on `field`.
    fn order_by(self, field: &str) -> Self {
        self.order_by_sort(field, Sort::Asc)
    }

    fn order_by_sort(mut self, field: &str, sort: Sort) -> Self {
        self.orders_mut().add(Order::new(field, sort));
        self
    }

    /// Ascending order on each field, in the given sequence.
    fn order_by_all<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            self.orders_mut().add(Order::asc(field.as_ref()));
        }
        self
    }

    fn order(mut self, order: Order) -> Self {
        self.orders_mut().add(order);
        self
    }
}

/// Select list management and aggregate shortcuts.
pub trait SelectBuilder: Sized {
    fn selects_mut(&mut self) -> &mut ConstructSelect;

    fn add_select(mut self, field: &str) -> Self {
        self.selects_mut().add(Select::new(field));
        self
    }

    fn add_select_as(mut self, field: &str, alias: &str) -> Self {
        self.selects_mut().add(Select::with_alias(field, alias));
        self
    }

    fn add_select_fn(mut self, field: &str, operator: SelectOperator) -> Self {
        self.selects_mut().add(Select::with_operator(field, operator));
        self
    }

    fn add_select_as_fn(mut self, field: &str, alias: &str, operator: SelectOperator) -> Self {
        self.selects_mut().add(Select::full(field, alias, operator));
        self
    }

    fn add_selects<I>(mut self, selects: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Select>,
    {
        self.selects_mut().add_all(selects);
        self
    }

    /// Replaces the select list with a single field.
    fn set_select(mut self, field: &str) -> Self {
        self.selects_mut().clear();
        self.add_select(field)
    }

    fn set_selects<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selects_mut().clear();
        for field in fields {
            self.selects_mut().add(Select::new(field.as_ref()));
        }
        self
    }

    /// `count(root)`.
    fn count(self) -> Self {
        self.add_select_fn("*", SelectOperator::Count)
    }

    fn count_field(self, field: &str) -> Self {
        self.add_select_fn(field, SelectOperator::Count)
    }

    fn count_as(self, field: &str, alias: &str) -> Self {
        self.add_select_as_fn(field, alias, SelectOperator::Count)
    }

    fn sum(self, field: &str) -> Self {
        self.add_select_fn(field, SelectOperator::Sum)
    }

    fn sum_as(self, field: &str, alias: &str) -> Self {
        self.add_select_as_fn(field, alias, SelectOperator::Sum)
    }

    fn avg(self, field: &str) -> Self {
        self.add_select_fn(field, SelectOperator::Avg)
    }

    fn avg_as(self, field: &str, alias: &str) -> Self {
        self.add_select_as_fn(field, alias, SelectOperator::Avg)
    }

    fn min(self, field: &str) -> Self {
        self.add_select_fn(field, SelectOperator::Min)
    }

    fn min_as(self, field: &str, alias: &str) -> Self {
        self.add_select_as_fn(field, alias, SelectOperator::Min)
    }

    fn max(self, field: &str) -> Self {
        self.add_select_fn(field, SelectOperator::Max)
    }

    fn max_as(self, field: &str, alias: &str) -> Self {
        self.add_select_as_fn(field, alias, SelectOperator::Max)
    }
}

/// Joins, fetch joins, grouping and paging.
pub trait RelationBuilder: Sized {
    fn joins_mut(&mut self) -> &mut ConstructJoin;

    fn fetches_mut(&mut self) -> &mut ConstructJoinFetch;

    fn group_by_mut(&mut self) -> &mut ConstructGroupBy;

    fn paging_mut(&mut self) -> (&mut Option<u64>, &mut Option<u64>);

    /// Inner join against a relationship; a dotted path joins every level.
    fn join(self, table: &str) -> Self {
        self.join_value(Join::make(table))
    }

    fn join_as(self, table: &str, alias: &str) -> Self {
        self.join_value(Join::make_as(table, alias))
    }

    fn join_type(self, table: &str, join_operator: JoinOperator) -> Self {
        self.join_value(Join::make(table).operator(join_operator))
    }

    fn join_as_type(self, table: &str, alias: &str, join_operator: JoinOperator) -> Self {
        self.join_value(Join::make_as(table, alias).operator(join_operator))
    }

    /// One nested join per segment of `path`.
    fn join_deep(self, path: &str, join_operator: JoinOperator) -> Self {
        self.join_value(Join::make_deep(path, join_operator))
    }

    /// Like [`RelationBuilder::join_deep`], aliasing the deepest level.
    fn join_deep_as(self, path: &str, alias: &str, join_operator: JoinOperator) -> Self {
        self.join_value(Join::make_deep_as(path, alias, join_operator))
    }

    fn join_with<F>(self, table: &str, join_operator: JoinOperator, configure: F) -> Self
    where
        F: FnOnce(JoinBuilder) -> JoinBuilder,
    {
        let join = configure(JoinBuilder::new(table, join_operator)).build();
        self.join_value(join)
    }

    /// Joins the entity `E` on `E.field_join = field_reference`.
    fn join_on<E: Entity>(self, field_join: &str, field_reference: &str) -> Self {
        self.join_value(Join::make_entity(E::meta(), field_join, field_reference))
    }

    /// Joins an entity by name on `table.field_join = field_reference`.
    fn join_on_table(self, table: &str, field_join: &str, field_reference: &str) -> Self {
        self.join_value(Join::make_on(table, field_join, field_reference))
    }

    fn join_value(mut self, join: Join) -> Self {
        self.joins_mut().add(join);
        self
    }

    /// Eagerly fetches a relationship with an inner join.
    fn with(self, relationship: &str) -> Self {
        self.with_type(relationship, JoinOperator::Inner)
    }

    fn with_type(self, relationship: &str, join_type: JoinOperator) -> Self {
        self.with_fetch(JoinFetch::new(relationship, join_type))
    }

    fn with_fetch(mut self, fetch: JoinFetch) -> Self {
        self.fetches_mut().add(fetch);
        self
    }

    fn group_by(mut self, field: &str) -> Self {
        self.group_by_mut().add(GroupBy::new(field));
        self
    }

    fn group_by_all<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            self.group_by_mut().add(GroupBy::new(field.as_ref()));
        }
        self
    }

    fn limit(mut self, limit: u64) -> Self {
        *self.paging_mut().0 = Some(limit);
        self
    }

    fn offset(mut self, offset: u64) -> Self {
        *self.paging_mut().1 = Some(offset);
        self
    }
}

/// Implements [`ConditionalBuilder`], [`SortBuilder`], [`SelectBuilder`] and
/// [`RelationBuilder`] for a type holding a [`Clauses`] in the named field.
#[macro_export]
macro_rules! impl_clause_builders {
    ($ty:ty, $backend:ty, $field:ident $(, <$($gen:ident $(: $bound:path)?),*>)?) => {
        impl $(<$($gen $(: $bound)?),*>)? $crate::builder::ConditionalBuilder<$backend> for $ty {
            fn wheres_mut(&mut self) -> &mut $crate::construct::ConstructWhere<$backend> {
                &mut self.$field.wheres
            }
        }

        impl $(<$($gen $(: $bound)?),*>)? $crate::builder::SortBuilder for $ty {
            fn orders_mut(&mut self) -> &mut $crate::construct::ConstructOrder {
                &mut self.$field.orders
            }
        }

        impl $(<$($gen $(: $bound)?),*>)? $crate::builder::SelectBuilder for $ty {
            fn selects_mut(&mut self) -> &mut $crate::construct::ConstructSelect {
                &mut self.$field.selects
            }
        }

        impl $(<$($gen $(: $bound)?),*>)? $crate::builder::RelationBuilder for $ty {
            fn joins_mut(&mut self) -> &mut $crate::construct::ConstructJoin {
                &mut self.$field.joins
            }

            fn fetches_mut(&mut self) -> &mut $crate::construct::ConstructJoinFetch {
                &mut self.$field.fetches
            }

            fn group_by_mut(&mut self) -> &mut $crate::construct::ConstructGroupBy {
                &mut self.$field.group_by
            }

            fn paging_mut(&mut self) -> (&mut Option<u64>, &mut Option<u64>) {
                (&mut self.$field.limit, &mut self.$field.offset)
            }
        }
    };
}
