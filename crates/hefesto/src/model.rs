//! Entity metadata used for field-path resolution and result projection.

use std::fmt;

use crate::{projector::FromRow, value::ValueType};

/// Kind of a mapped attribute.
#[derive(Clone, Copy)]
pub enum FieldKind {
    Basic(ValueType),
    /// A relationship to another entity; `many` marks a collection.
    Relation {
        target: fn() -> &'static EntityMeta,
        many: bool,
    },
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Basic(value_type) => write!(f, "Basic({value_type})"),
            FieldKind::Relation {
                target,
                many,
            } => write!(f, "Relation({}, many: {many})", target().name),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldMeta {
    pub const fn basic(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            kind: FieldKind::Basic(value_type),
        }
    }

    pub const fn relation(name: &'static str, target: fn() -> &'static EntityMeta, many: bool) -> Self {
        Self {
            name,
            kind: FieldKind::Relation {
                target,
                many,
            },
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self.kind {
            FieldKind::Basic(value_type) => Some(value_type),
            FieldKind::Relation {
                ..
            } => None,
        }
    }

    pub fn target(&self) -> Option<&'static EntityMeta> {
        match self.kind {
            FieldKind::Relation {
                target, ..
            } => Some(target()),
            FieldKind::Basic(_) => None,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self.kind, FieldKind::Relation { many: true, .. })
    }
}

/// Static description of an entity: its name and mapped attributes.
#[derive(Debug)]
pub struct EntityMeta {
    pub name: &'static str,
    pub fields: &'static [FieldMeta],
}

impl EntityMeta {
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Lowercased entity name, the root alias of string queries.
    pub fn acronym(&self) -> String {
        self.name.to_lowercase()
    }

    /// Follows a dotted attribute path through relations and returns its last attribute.
    pub fn resolve_path(&self, path: &str) -> Option<&'static FieldMeta> {
        let mut current: &EntityMeta = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let field = current.fields.iter().find(|f| f.name == segment)?;
            if segments.peek().is_none() {
                return Some(field);
            }
            current = field.target()?;
        }
        None
    }
}

impl PartialEq for EntityMeta {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A mapped entity.
pub trait Entity: FromRow {
    fn meta() -> &'static EntityMeta;
}

/// Implements [`Entity`] and a setter-based [`FromRow`] for a struct.
///
/// The struct must implement `Default`. Basic fields are listed with their [`ValueType`]
/// variant, relations with `one` (an `Option<T>` field) or `many` (a `Vec<T>` field).
///
/// # Syntax
///
/// ```ignore
/// define_entity!(
///     User as "User" {
///         fields: {
///             id: Long,
///             name: String
///         },
///         relations: {
///             address: one Address,
///             pets: many UserPet
///         }
///     }
/// );
/// ```
#[macro_export]
macro_rules! define_entity {
    (
        $entity:ident as $name:literal {
            fields: {
                $($field:ident: $kind:ident),* $(,)?
            }
            $(, relations: {
                $($rel:ident: $card:ident $target:ty),* $(,)?
            })? $(,)?
        }
    ) => {
        impl $crate::model::Entity for $entity {
            fn meta() -> &'static $crate::model::EntityMeta {
                static META: $crate::model::EntityMeta = $crate::model::EntityMeta {
                    name: $name,
                    fields: &[
                        $(
                            $crate::model::FieldMeta::basic(
                                stringify!($field),
                                $crate::value::ValueType::$kind,
                            ),
                        )*
                        $($(
                            $crate::model::FieldMeta::relation(
                                stringify!($rel),
                                <$target as $crate::model::Entity>::meta,
                                $crate::define_relation!(@many $card),
                            ),
                        )*)?
                    ],
                };
                &META
            }
        }

        impl $crate::projector::FromRow for $entity {
            fn projection(
                builder: $crate::projector::ProjectionBuilder<Self>,
            ) -> $crate::projector::ProjectionBuilder<Self> {
                let builder = builder.default(<$entity as ::std::default::Default>::default);
                $(
                    let builder = builder.setter(stringify!($field), |entity: &mut Self, value| {
                        entity.$field = value;
                    });
                )*
                $($(
                    let builder = $crate::define_relation!($card, builder, $rel);
                )*)?
                builder
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! define_relation {
    (@many one) => {
        false
    };
    (@many many) => {
        true
    };
    (one, $builder:ident, $rel:ident) => {
        $builder.nested(stringify!($rel), |entity: &mut Self| &mut entity.$rel)
    };
    (many, $builder:ident, $rel:ident) => {
        $builder.collection(stringify!($rel), |entity: &mut Self| &mut entity.$rel)
    };
}
