use hefesto::{
    clause::Select,
    construct::ConstructSelect,
    error::{HefestoError, Result},
};

use super::qualify;

/// `select a.x as x, count(a) as count`; empty when nothing is selected and the entity itself is
/// returned.
pub(crate) fn construct_selects(selects: &ConstructSelect, acronym: &str) -> String {
    if selects.is_empty() {
        return String::new();
    }
    let columns: Vec<String> = selects
        .iter()
        .map(|select| {
            let column = column(select, acronym);
            let entity = select.is_root() || select.field.ends_with(".*");
            if entity && select.operator.is_none() && select.alias.is_none() {
                column
            } else {
                format!("{column} as {}", select.result_alias())
            }
        })
        .collect();
    format!("select {}", columns.join(", "))
}

/// The single column of a sub query, or its acronym when no select was added.
pub(crate) fn construct_sub_query_select(selects: &ConstructSelect, acronym: &str) -> Result<String> {
    match selects.items() {
        [] => Ok(format!("select {acronym}")),
        [select] => Ok(format!("select {}", column(select, acronym))),
        _ => Err(HefestoError::query(
            "Sub-query must have only one select when is using Where IN operation",
        )),
    }
}

fn column(select: &Select, acronym: &str) -> String {
    let field = match select.field.strip_suffix(".*") {
        Some(alias) => alias.to_string(),
        None => qualify(acronym, &select.field),
    };
    match select.operator {
        Some(operator) => operator.apply(&field),
        None => field,
    }
}

#[cfg(test)]
mod tests {
    use hefesto::operator::SelectOperator;

    use super::*;

    fn selects(items: impl IntoIterator<Item = Select>) -> ConstructSelect {
        let mut construct = ConstructSelect::new();
        construct.add_all(items);
        construct
    }

    #[test]
    fn test_no_selects_render_nothing() {
        assert_eq!(construct_selects(&ConstructSelect::new(), "user"), "");
    }

    #[test]
    fn test_columns_are_qualified_and_aliased() {
        let rendered = construct_selects(
            &selects([
                Select::new("name"),
                Select::new("address.city"),
                Select::with_alias("email", "mail"),
            ]),
            "user",
        );
        assert_eq!(
            rendered,
            "select user.name as name, address.city as address_city, user.email as mail"
        );
    }

    #[test]
    fn test_aggregates() {
        let rendered = construct_selects(
            &selects([
                Select::with_operator("*", SelectOperator::Count),
                Select::full("age", "average.age", SelectOperator::Avg),
            ]),
            "user",
        );
        assert_eq!(rendered, "select count(user) as count, avg(user.age) as average_age");
    }

    #[test]
    fn test_alias_star_selects_the_join() {
        let rendered = construct_selects(&selects([Select::new("*"), Select::new("pets.*")]), "user");
        assert_eq!(rendered, "select user, pets");
    }

    #[test]
    fn test_sub_query_select() {
        assert_eq!(
            construct_sub_query_select(&ConstructSelect::new(), "userpet").unwrap(),
            "select userpet"
        );
        assert_eq!(
            construct_sub_query_select(&selects([Select::with_alias("user_id", "owner")]), "userpet").unwrap(),
            "select userpet.user_id"
        );
        let err = construct_sub_query_select(&selects([Select::new("id"), Select::new("name")]), "userpet")
            .unwrap_err();
        assert!(matches!(err, HefestoError::Query(_)));
    }
}
