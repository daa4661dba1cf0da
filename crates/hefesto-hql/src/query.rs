//! The finished string query handed to a [`QuerySession`](crate::session::QuerySession).

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use hefesto::value::Value;

/// Query text with its named parameters and paging.
///
/// Placeholders in [`HqlQuery::query`] are `:name`; every one of them has an entry in
/// [`HqlQuery::params`] under `name`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HqlQuery {
    pub query: String,
    pub params: BTreeMap<String, Value>,
    pub first_result: Option<u64>,
    pub max_results: Option<u64>,
}

impl HqlQuery {
    pub fn new(query: impl Into<String>, params: BTreeMap<String, Value>) -> Self {
        Self {
            query: query.into(),
            params,
            first_result: None,
            max_results: None,
        }
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Names of the bound parameters, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }
}

impl Display for HqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_and_display() {
        let mut params = BTreeMap::new();
        params.insert("status_1".to_string(), Value::from("ACTIVE"));
        let query = HqlQuery::new("from User user where user.status = :status_1", params);

        assert_eq!(query.to_string(), "from User user where user.status = :status_1");
        assert_eq!(query.param("status_1"), Some(&Value::from("ACTIVE")));
        assert_eq!(query.param_names().collect::<Vec<_>>(), vec!["status_1"]);
        assert!(query.max_results.is_none());
    }
}
