use hefesto::construct::{ConstructGroupBy, ConstructOrder};

use super::qualify;

/// `order by user.name ASC, pets.name DESC`.
pub(crate) fn construct_orders(orders: &ConstructOrder, acronym: &str) -> String {
    if orders.is_empty() {
        return String::new();
    }
    let fields: Vec<String> = orders
        .iter()
        .map(|order| format!("{} {}", qualify(acronym, &order.field), order.sort.name()))
        .collect();
    format!("order by {}", fields.join(", "))
}

pub(crate) fn construct_group_by(group_by: &ConstructGroupBy, acronym: &str) -> String {
    if group_by.is_empty() {
        return String::new();
    }
    let fields: Vec<String> = group_by.iter().map(|group| qualify(acronym, &group.field)).collect();
    format!("group by {}", fields.join(", "))
}
