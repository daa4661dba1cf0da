use hefesto::construct::ConstructJoinFetch;

/// `inner join fetch user.pets as pets`; nested relationships are already qualified.
pub(crate) fn construct_fetches(fetches: &ConstructJoinFetch, acronym: &str) -> String {
    let rendered: Vec<String> = fetches
        .iter()
        .map(|fetch| {
            let relationship = if fetch.nested {
                fetch.relationship.clone()
            } else {
                format!("{acronym}.{}", fetch.relationship)
            };
            let alias = fetch.alias.as_ref().map(|alias| format!(" as {alias}")).unwrap_or_default();
            format!("{} join fetch {relationship}{alias}", fetch.join_type)
        })
        .collect();
    rendered.join(" ")
}

#[cfg(test)]
mod tests {
    use hefesto::{clause::JoinFetch, operator::JoinOperator};

    use super::*;

    #[test]
    fn test_fetches() {
        let mut fetches = ConstructJoinFetch::new();
        fetches.add(JoinFetch::new("pets", JoinOperator::Left));
        fetches.add(JoinFetch::new("pets.toys", JoinOperator::Inner).nested(true).alias("toys"));
        assert_eq!(
            construct_fetches(&fetches, "user"),
            "left join fetch user.pets as pets inner join fetch pets.toys as toys"
        );
    }
}
