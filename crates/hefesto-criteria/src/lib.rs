//! Typed-criteria backend: translates builder clauses into a [`criteria::CriteriaQuery`] graph
//! and runs it through a [`CriteriaSession`].

pub mod builder;
pub mod construct;
pub mod criteria;
mod executor;
pub mod memory;
pub mod session;

pub use builder::{Criteria, CustomPredicate, CustomWhere, Hefesto, HefestoFactory, SubQueryBuilder, SubQueryWhere};
pub use construct::Scope;
pub use hefesto::{HefestoError, Result};
pub use memory::{Dataset, MemorySession};
pub use session::{session_handle, CriteriaSession, SessionHandle};

pub mod prelude {
    pub use hefesto::prelude::*;

    pub use crate::{
        builder::{CustomWhere, Hefesto, HefestoFactory, SubQueryBuilder, SubQueryWhere},
        criteria::{Expression, Predicate},
        session::{session_handle, SessionHandle},
    };
}
