use hefesto::{construct::ConstructGroupBy, error::Result};

use super::Scope;
use crate::criteria::Expression;

pub(crate) fn construct_group_by(group_by: &ConstructGroupBy, scope: &Scope) -> Result<Vec<Expression>> {
    group_by
        .iter()
        .map(|group| Ok(scope.resolve(&group.field)?.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use hefesto::{clause::GroupBy, model::Entity};

    use super::*;
    use crate::construct::fixtures::User;

    #[test]
    fn test_group_by_resolves_fields() {
        let mut group_by = ConstructGroupBy::new();
        group_by.add(GroupBy::new("status"));
        group_by.add(GroupBy::new("address.city"));
        let translated = construct_group_by(&group_by, &Scope::new(User::meta())).unwrap();
        assert_eq!(translated.len(), 2);
    }
}
