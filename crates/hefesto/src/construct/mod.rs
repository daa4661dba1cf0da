//! Append-only clause collections owned by a builder.
//!
//! Insertion order is significant: it fixes the left-to-right boolean folding of where clauses
//! and the order in which string queries generate parameter names.

mod join;
mod wheres;

pub use join::{ConstructJoin, JoinNode};
pub use wheres::{ConstructWhere, WhereNode};

use crate::clause::{GroupBy, JoinFetch, Order, Select};

/// Arena index of a node in a tree-shaped collection.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Construct<T> {
    items: Vec<T>,
}

impl<T> Default for Construct<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
        }
    }
}

impl<T> Construct<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: impl Into<T>) {
        self.items.push(item.into());
    }

    pub fn add_all<I>(&mut self, items: I)
    where
        I: IntoIterator,
        I::Item: Into<T>,
    {
        self.items.extend(items.into_iter().map(Into::into));
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a Construct<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

pub type ConstructSelect = Construct<Select>;
pub type ConstructOrder = Construct<Order>;
pub type ConstructGroupBy = Construct<GroupBy>;
pub type ConstructJoinFetch = Construct<JoinFetch>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_keeps_insertion_order() {
        let mut selects = ConstructSelect::new();
        selects.add("name");
        selects.add_all(["email", "age"]);
        let fields: Vec<_> = selects.iter().map(|s| s.field.as_str()).collect();
        assert_eq!(fields, ["name", "email", "age"]);
        assert_eq!(selects.len(), 3);

        selects.clear();
        assert!(selects.is_empty());
    }
}
