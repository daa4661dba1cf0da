//! The executor the typed backend hands finished queries to.

use std::sync::{Arc, Mutex};

use hefesto::{
    error::{HefestoError, Result},
    projector::Row,
};

use crate::criteria::CriteriaQuery;

/// Runs a finished [`CriteriaQuery`] and returns its rows.
///
/// Offset and limit travel inside the query. Errors are surfaced to the caller unchanged.
pub trait CriteriaSession {
    fn execute(&mut self, query: &CriteriaQuery) -> Result<Vec<Row>>;
}

/// Shared handle to the session a builder executes against.
pub type SessionHandle = Arc<Mutex<dyn CriteriaSession + Send>>;

pub fn session_handle<S>(session: S) -> SessionHandle
where
    S: CriteriaSession + Send + 'static,
{
    Arc::new(Mutex::new(session))
}

pub(crate) fn execute(handle: &SessionHandle, query: &CriteriaQuery) -> Result<Vec<Row>> {
    let mut session = handle
        .lock()
        .map_err(|_| HefestoError::Execution("session lock poisoned".into()))?;
    session.execute(query)
}
