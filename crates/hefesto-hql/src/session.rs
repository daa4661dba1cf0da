//! The executor the string backend hands finished queries to.

use std::sync::{Arc, Mutex};

use hefesto::{
    error::{HefestoError, Result},
    projector::Row,
};

use crate::query::HqlQuery;

/// Runs an [`HqlQuery`], applying its parameters and paging, and returns the rows.
///
/// Entity queries (no select) yield one column per row holding the entity, either as a
/// `Value::Object` of the model or as a `Value::Record`. Errors are surfaced unchanged.
pub trait QuerySession {
    fn execute(&mut self, query: &HqlQuery) -> Result<Vec<Row>>;
}

/// Shared handle to the session a builder executes against.
pub type SessionHandle = Arc<Mutex<dyn QuerySession + Send>>;

pub fn session_handle<S>(session: S) -> SessionHandle
where
    S: QuerySession + Send + 'static,
{
    Arc::new(Mutex::new(session))
}

pub(crate) fn execute(handle: &SessionHandle, query: &HqlQuery) -> Result<Vec<Row>> {
    let mut session = handle
        .lock()
        .map_err(|_| HefestoError::Execution("session lock poisoned".into()))?;
    session.execute(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl QuerySession for Failing {
        fn execute(&mut self, query: &HqlQuery) -> Result<Vec<Row>> {
            Err(HefestoError::Execution(format!("cannot run '{query}'")))
        }
    }

    #[test]
    fn test_errors_are_surfaced_unchanged() {
        let handle = session_handle(Failing);
        let err = execute(&handle, &HqlQuery::new("from User user", Default::default())).unwrap_err();
        assert_eq!(err.to_string(), "Query execution failed: cannot run 'from User user'");
    }
}
