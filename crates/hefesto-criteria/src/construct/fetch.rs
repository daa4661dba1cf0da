use hefesto::{
    construct::ConstructJoinFetch,
    error::{HefestoError, Result},
};

use super::Scope;
use crate::criteria::FetchNode;

/// Eager fetches of the root; every segment of the relationship path must be a relation.
pub(crate) fn construct_fetches(fetches: &ConstructJoinFetch, scope: &Scope) -> Result<Vec<FetchNode>> {
    fetches
        .iter()
        .map(|fetch| {
            let path = scope.resolve_in(scope.root_entry(), &fetch.relationship)?;
            if path.value_type.is_some() {
                return Err(HefestoError::query(format!(
                    "Cannot fetch '{}': not a relationship of '{}'",
                    fetch.relationship,
                    scope.root_entity().name
                )));
            }
            Ok(FetchNode {
                attribute: fetch.relationship.clone(),
                alias: fetch.alias.clone(),
                join_type: fetch.join_type,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hefesto::{clause::JoinFetch, model::Entity, operator::JoinOperator};

    use super::*;
    use crate::construct::fixtures::User;

    #[test]
    fn test_nested_fetch_path() {
        let mut fetches = ConstructJoinFetch::new();
        fetches.add(JoinFetch::new("pets.toys", JoinOperator::Left));
        let translated = construct_fetches(&fetches, &Scope::new(User::meta())).unwrap();
        assert_eq!(translated[0].attribute, "pets.toys");
        assert_eq!(translated[0].alias.as_deref(), Some("pets_toys"));
    }

    #[test]
    fn test_fetching_basic_attribute_fails() {
        let mut fetches = ConstructJoinFetch::new();
        fetches.add(JoinFetch::new("name", JoinOperator::Inner));
        assert!(construct_fetches(&fetches, &Scope::new(User::meta())).is_err());
    }
}
