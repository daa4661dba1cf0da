use crate::operator::{JoinOperator, SelectOperator, Sort};

/// A selected field; `*` selects the root entity itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub field: String,
    pub alias: Option<String>,
    pub operator: Option<SelectOperator>,
}

impl Select {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            alias: None,
            operator: None,
        }
    }

    pub fn with_alias(field: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::new(field)
        }
    }

    pub fn with_operator(field: impl Into<String>, operator: SelectOperator) -> Self {
        Self {
            operator: Some(operator),
            ..Self::new(field)
        }
    }

    pub fn full(field: impl Into<String>, alias: impl Into<String>, operator: SelectOperator) -> Self {
        Self {
            field: field.into(),
            alias: Some(alias.into()),
            operator: Some(operator),
        }
    }

    pub fn is_root(&self) -> bool {
        self.field == "*"
    }

    /// Result alias: the given alias, or the field with `.` replaced by `_`.
    pub fn result_alias(&self) -> String {
        match &self.alias {
            Some(alias) => alias.replace('.', "_"),
            None if self.is_root() => self
                .operator
                .map(|op| op.function().to_string())
                .unwrap_or_else(|| "root".to_string()),
            None => self.field.replace('.', "_"),
        }
    }
}

impl From<&str> for Select {
    fn from(field: &str) -> Self {
        Select::new(field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub sort: Sort,
}

impl Order {
    pub fn new(field: impl Into<String>, sort: Sort) -> Self {
        Self {
            field: field.into(),
            sort,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, Sort::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, Sort::Desc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBy {
    pub field: String,
}

impl GroupBy {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

/// Eagerly fetched relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinFetch {
    pub relationship: String,
    pub alias: Option<String>,
    /// The relationship is already qualified (`pets.toys`) and must not be prefixed with the root.
    pub nested: bool,
    pub join_type: JoinOperator,
}

impl JoinFetch {
    pub fn new(relationship: impl Into<String>, join_type: JoinOperator) -> Self {
        let relationship = relationship.into();
        Self {
            alias: Some(relationship.replace('.', "_")),
            relationship,
            nested: false,
            join_type,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_alias_defaults() {
        assert_eq!(Select::new("address.city").result_alias(), "address_city");
        assert_eq!(Select::with_alias("name", "user.name").result_alias(), "user_name");
        assert_eq!(Select::with_operator("*", SelectOperator::Count).result_alias(), "count");
    }

    #[test]
    fn test_join_fetch_default_alias() {
        let fetch = JoinFetch::new("pets.toys", JoinOperator::Left);
        assert_eq!(fetch.alias.as_deref(), Some("pets_toys"));
        assert!(!fetch.nested);
    }
}
