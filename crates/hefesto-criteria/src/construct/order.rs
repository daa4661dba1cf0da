use hefesto::{construct::ConstructOrder, error::Result};

use super::Scope;
use crate::criteria::OrderBy;

pub(crate) fn construct_orders(orders: &ConstructOrder, scope: &Scope) -> Result<Vec<OrderBy>> {
    orders
        .iter()
        .map(|order| {
            Ok(OrderBy {
                expression: scope.resolve(&order.field)?.into(),
                sort: order.sort,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hefesto::{clause::Order, model::Entity, operator::Sort};

    use super::*;
    use crate::construct::fixtures::User;

    #[test]
    fn test_orders_keep_sequence() {
        let mut orders = ConstructOrder::new();
        orders.add(Order::desc("age"));
        orders.add(Order::asc("name"));
        let translated = construct_orders(&orders, &Scope::new(User::meta())).unwrap();
        assert_eq!(translated.len(), 2);
        assert_eq!(translated[0].sort, Sort::Desc);
        assert_eq!(translated[1].sort, Sort::Asc);
    }

    #[test]
    fn test_unknown_order_field_fails() {
        let mut orders = ConstructOrder::new();
        orders.add(Order::asc("nickname"));
        assert!(construct_orders(&orders, &Scope::new(User::meta())).is_err());
    }
}
