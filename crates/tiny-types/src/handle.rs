//! Untyped reference handles.
//!
//! These are the value-level forms of references: what an object field or a
//! snapshot record stores. The typed `Reference<T>` in `tiny-registry` wraps
//! the same `(id, name)` pair.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::Id;

/// The kinds of top-level objects that can be referenced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceKind {
    Module,
    Type,
    EntityGroup,
    Entity,
    Script,
    System,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 6] = [
        ReferenceKind::Module,
        ReferenceKind::Type,
        ReferenceKind::EntityGroup,
        ReferenceKind::Entity,
        ReferenceKind::Script,
        ReferenceKind::System,
    ];

    /// Name of the reference tag as written by snapshot back ends.
    pub fn tag(self) -> &'static str {
        match self {
            ReferenceKind::Module => "ModuleReference",
            ReferenceKind::Type => "TypeReference",
            ReferenceKind::EntityGroup => "EntityGroupReference",
            ReferenceKind::Entity => "EntityReference",
            ReferenceKind::Script => "ScriptReference",
            ReferenceKind::System => "SystemReference",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Kind-tagged weak reference: an id plus the name it had when the reference
/// was taken. The name is a display cache only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ReferenceKind,
    pub id: Id,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ReferenceKind, id: Id, name: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            name: name.into(),
        }
    }
}

/// Opaque handle to an asset owned by the host (texture, sound, font…).
///
/// The core never interprets it beyond equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub guid: String,
    pub file_id: i64,
}

impl AssetRef {
    pub fn new(guid: impl Into<String>, file_id: i64) -> Self {
        Self {
            guid: guid.into(),
            file_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_distinct() {
        let mut tags: Vec<_> = ReferenceKind::ALL.iter().map(|k| k.tag()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), ReferenceKind::ALL.len());
    }

    #[test]
    fn object_ref_equality_includes_kind() {
        let id = Id::generate("thing");
        let a = ObjectRef::new(ReferenceKind::Entity, id, "thing");
        let b = ObjectRef::new(ReferenceKind::Type, id, "thing");
        assert_ne!(a, b);
    }

    #[test]
    fn serde_roundtrip() {
        let r = ObjectRef::new(ReferenceKind::Module, Id::generate("core"), "core");
        let json = serde_json::to_string(&r).unwrap();
        let parsed: ObjectRef = serde_json::from_str(&json).unwrap();
        assert_eq!(r, parsed);
    }
}
