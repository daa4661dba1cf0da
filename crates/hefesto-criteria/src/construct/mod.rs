//! Translators from the clause collections to the criteria graph.
//!
//! Each translator reads its collection once and resolves field paths through a [`Scope`],
//! which is rebuilt for every translation.

mod fetch;
mod group_by;
mod join;
mod order;
mod select;
mod wheres;

use std::collections::HashMap;

use hefesto::{
    error::{HefestoError, Result},
    model::{EntityMeta, FieldKind},
};

pub(crate) use fetch::construct_fetches;
pub(crate) use group_by::construct_group_by;
pub(crate) use join::construct_joins;
pub(crate) use order::construct_orders;
pub(crate) use select::{construct_selects, construct_sub_query_select};
pub(crate) use wheres::construct_where;

use crate::criteria::{FromRef, Path};

/// A from-node together with the entity it ranges over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AliasEntry {
    pub from: FromRef,
    pub entity: &'static EntityMeta,
}

/// Name resolution context of one query level.
///
/// The root is also reachable under its lowercase entity name, so `user.status` and `status`
/// resolve alike. Join aliases of enclosing queries stay visible in sub queries; an alias declared
/// by the sub query itself shadows the parent's. The enclosing root's name is not inherited.
#[derive(Debug, Clone)]
pub struct Scope {
    depth: usize,
    root: &'static EntityMeta,
    aliases: HashMap<String, AliasEntry>,
    parent_root: Option<AliasEntry>,
}

impl Scope {
    pub fn new(root: &'static EntityMeta) -> Self {
        Self {
            depth: 0,
            root,
            aliases: HashMap::new(),
            parent_root: None,
        }
        .with_root_alias()
    }

    /// Scope of a sub query nested in this one.
    pub fn child(&self, root: &'static EntityMeta) -> Self {
        let parent = self.root_entry();
        let mut aliases = self.aliases.clone();
        if aliases.get(&self.root.acronym()) == Some(&parent) {
            aliases.remove(&self.root.acronym());
        }
        Self {
            depth: self.depth + 1,
            root,
            aliases,
            parent_root: Some(parent),
        }
        .with_root_alias()
    }

    fn with_root_alias(mut self) -> Self {
        let entry = self.root_entry();
        self.aliases.insert(self.root.acronym(), entry);
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn root_entity(&self) -> &'static EntityMeta {
        self.root
    }

    pub fn root_entry(&self) -> AliasEntry {
        AliasEntry {
            from: FromRef::root(self.depth),
            entity: self.root,
        }
    }

    /// The root entity of this query level.
    pub fn root(&self) -> Path {
        Path::entity(FromRef::root(self.depth))
    }

    /// The root of the enclosing query, inside a sub query.
    pub fn parent_root(&self) -> Option<Path> {
        self.parent_root.map(|entry| Path::entity(entry.from))
    }

    /// The join registered under `alias`, in this scope or an enclosing one.
    pub fn join(&self, alias: &str) -> Option<Path> {
        self.aliases.get(alias).map(|entry| Path::entity(entry.from))
    }


    pub(crate) fn register(&mut self, alias: impl Into<String>, entry: AliasEntry) {
        self.aliases.insert(alias.into(), entry);
    }

    /// Resolves `field` from the join named by its first segment, or from the root.
    ///
    /// A join alias always wins over a root attribute with the same name.
    pub fn resolve(&self, field: &str) -> Result<Path> {
        self.resolve_with_default(field, self.root_entry())
    }

    /// Like [`Scope::resolve`], but unqualified fields start at the parent root inside a sub
    /// query.
    pub fn resolve_outer(&self, field: &str) -> Result<Path> {
        let default = self.parent_root.unwrap_or_else(|| self.root_entry());
        self.resolve_with_default(field, default)
    }

    fn resolve_with_default(&self, field: &str, default: AliasEntry) -> Result<Path> {
        if let Some((head, rest)) = field.split_once('.') {
            if let Some(entry) = self.aliases.get(head) {
                return self.resolve_in(*entry, rest);
            }
        }
        self.resolve_in(default, field)
    }

    /// Walks the dotted `path` from `entry`, checking every attribute against the metadata.
    pub fn resolve_in(&self, entry: AliasEntry, path: &str) -> Result<Path> {
        if path.is_empty() {
            return Err(HefestoError::query(format!(
                "Empty attribute path on entity '{}'",
                entry.entity.name
            )));
        }

        let segments: Vec<&str> = path.split('.').collect();
        let mut entity = entry.entity;
        let mut value_type = None;

        for (idx, segment) in segments.iter().enumerate() {
            let attribute = entity.field(segment).ok_or_else(|| {
                HefestoError::query(format!(
                    "Attribute '{segment}' not found on entity '{}'",
                    entity.name
                ))
            })?;

            match attribute.kind {
                FieldKind::Basic(basic) => {
                    if idx + 1 < segments.len() {
                        return Err(HefestoError::query(format!(
                            "Attribute '{segment}' of entity '{}' is not a relationship",
                            entity.name
                        )));
                    }
                    value_type = Some(basic);
                }
                FieldKind::Relation {
                    target, ..
                } => entity = target(),
            }
        }

        Ok(Path {
            from: entry.from,
            attributes: segments.into_iter().map(String::from).collect(),
            value_type,
        })
    }
}
