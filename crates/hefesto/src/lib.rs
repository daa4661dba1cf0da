pub mod builder;
pub mod cast;
pub mod clause;
pub mod config;
pub mod construct;
pub mod error;
pub mod logging;
pub mod model;
pub mod operator;
pub mod page;
pub mod projector;
pub mod value;

pub use error::{HefestoError, Result};
pub use page::Page;

pub mod prelude {
    pub use crate::{
        builder::{ConditionalBuilder, JoinBuilder, RelationBuilder, SelectBuilder, SortBuilder, WhereGroup},
        clause::{CollectionWhere, GroupBy, Join, JoinFetch, Order, Select, Where, WhereClause, WhereField},
        define_entity,
        model::Entity,
        operator::{JoinOperator, Operator, SelectOperator, Sort, WhereOperator},
        page::Page,
        projector::{FromRow, ProjectionBuilder, Row},
        value::{Record, Value, ValueType},
    };
}
