use hefesto::{
    clause::Select,
    construct::ConstructSelect,
    error::{HefestoError, Result},
};

use super::Scope;
use crate::criteria::{Expression, Selection};

/// Selections of a top-level query; no selects means the root entity.
pub(crate) fn construct_selects(selects: &ConstructSelect, scope: &Scope) -> Result<Vec<Selection>> {
    if selects.is_empty() {
        return Ok(vec![Selection {
            expression: scope.root().into(),
            alias: None,
        }]);
    }

    selects
        .iter()
        .map(|select| {
            let bare_root = select.is_root() && select.alias.is_none() && select.operator.is_none();
            Ok(Selection {
                expression: select_expression(select, scope)?,
                alias: (!bare_root).then(|| select.result_alias()),
            })
        })
        .collect()
}

/// The single column of a sub query; no selects means the sub query root.
pub(crate) fn construct_sub_query_select(selects: &ConstructSelect, scope: &Scope) -> Result<Selection> {
    match selects.items() {
        [] => Ok(Selection {
            expression: scope.root().into(),
            alias: None,
        }),
        [select] => Ok(Selection {
            expression: select_expression(select, scope)?,
            alias: None,
        }),
        _ => Err(HefestoError::query(
            "Sub-query must have only one select when is using Where IN operation",
        )),
    }
}

fn select_expression(select: &Select, scope: &Scope) -> Result<Expression> {
    let expression: Expression = if select.field.contains('*') {
        match select.field.split_once('.') {
            Some((alias, "*")) => scope
                .join(alias)
                .ok_or_else(|| HefestoError::query(format!("Unknown join alias '{alias}' in select")))?
                .into(),
            _ => scope.root().into(),
        }
    } else {
        scope.resolve(&select.field)?.into()
    };

    Ok(match select.operator {
        Some(function) => Expression::Aggregate {
            function,
            argument: Box::new(expression),
        },
        None => expression,
    })
}

#[cfg(test)]
mod tests {
    use hefesto::{model::Entity, operator::SelectOperator};

    use super::*;
    use crate::{
        construct::{fixtures::*, AliasEntry},
        criteria::{FromRef, Path},
    };

    fn selects(items: Vec<Select>) -> ConstructSelect {
        let mut selects = ConstructSelect::new();
        selects.add_all(items);
        selects
    }

    #[test]
    fn test_empty_selects_root() {
        let scope = Scope::new(User::meta());
        let selections = construct_selects(&ConstructSelect::new(), &scope).unwrap();
        assert_eq!(selections[0].expression, Expression::Path(Path::entity(FromRef::root(0))));
        assert_eq!(selections[0].alias, None);
    }

    #[test]
    fn test_aliases_and_aggregates() {
        let scope = Scope::new(User::meta());
        let selections = construct_selects(
            &selects(vec![
                Select::new("address.city"),
                Select::full("age", "avgAge", SelectOperator::Avg),
                Select::with_operator("*", SelectOperator::Count),
            ]),
            &scope,
        )
        .unwrap();
        assert_eq!(selections[0].alias.as_deref(), Some("address_city"));
        assert_eq!(selections[1].alias.as_deref(), Some("avgAge"));
        assert!(selections[1].expression.is_aggregate());
        assert_eq!(selections[2].alias.as_deref(), Some("count"));
    }

    #[test]
    fn test_join_star_selects_join_entity() {
        let mut scope = Scope::new(User::meta());
        scope.register(
            "pets",
            AliasEntry {
                from: FromRef::join(0, 0),
                entity: UserPet::meta(),
            },
        );
        let selections = construct_selects(&selects(vec![Select::new("pets.*")]), &scope).unwrap();
        assert_eq!(selections[0].expression, Expression::Path(Path::entity(FromRef::join(0, 0))));
    }

    #[test]
    fn test_sub_query_select_needs_single_column() {
        let scope = Scope::new(User::meta());
        let err = construct_sub_query_select(&selects(vec!["id".into(), "name".into()]), &scope).unwrap_err();
        assert!(err.to_string().contains("only one select"));
        assert!(construct_sub_query_select(&selects(vec!["id".into()]), &scope).is_ok());
    }
}
