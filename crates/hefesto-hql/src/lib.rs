//! String query backend: renders builder clauses into an HQL string with named parameters and
//! runs it through a [`QuerySession`].

pub mod builder;
mod construct;
pub mod query;
pub mod session;

pub use builder::{Hefesto, HefestoFactory, Hql, RawWhere, SubQueryBuilder, SubQueryWhere};
pub use hefesto::{HefestoError, Result};
pub use query::HqlQuery;
pub use session::{session_handle, QuerySession, SessionHandle};

pub mod prelude {
    pub use hefesto::prelude::*;

    pub use crate::{
        builder::{Hefesto, HefestoFactory, RawWhere, SubQueryBuilder, SubQueryWhere},
        query::HqlQuery,
        session::{session_handle, QuerySession, SessionHandle},
    };
}
