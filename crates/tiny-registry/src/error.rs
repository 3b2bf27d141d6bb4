use tiny_types::{Id, ReferenceKind};

/// A caller referenced something that is not part of the current schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// The field name is not declared by the object's type.
    #[error("type `{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    /// The type id does not resolve in the registry.
    #[error("unknown type: {0}")]
    UnknownType(Id),

    /// A value of the wrong shape was assigned to a field.
    #[error("field `{field}` expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// The value has the right shape but is out of range for the field.
    #[error("invalid value for field `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    /// A sibling field with this name already exists.
    #[error("type `{type_name}` already declares a field named `{field}`")]
    DuplicateField { type_name: String, field: String },

    /// A path step went through a field that is not a nested struct.
    #[error("field `{field}` is not a nested struct")]
    NotAStruct { field: String },

    /// An enum-only operation was applied to a non-enum type.
    #[error("type `{0}` is not an enum")]
    NotAnEnum(String),

    /// The type cannot be attached to an entity.
    #[error("type `{0}` is not a component")]
    NotAComponent(String),

    /// No enum member matches the given name or value.
    #[error("enum `{enum_name}` has no member `{member}` (value {value})")]
    UnknownEnumMember {
        enum_name: String,
        member: String,
        value: i64,
    },

    /// The field would make a struct contain itself by value.
    #[error("field `{field}` would make `{type_name}` contain itself")]
    RecursiveField { type_name: String, field: String },

    /// Default resolution went deeper than the configured limit.
    #[error("default resolution exceeded depth {0}")]
    RecursionLimit(usize),
}

/// An invariant breach. The operation is rejected outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyViolation {
    /// The nil id is reserved for null references.
    #[error("cannot register an object under the nil id")]
    NullId,

    #[error("duplicate id: {0}")]
    DuplicateId(Id),

    #[error("object type mismatch: expected {expected}, got {actual}")]
    ObjectTypeMismatch { expected: Id, actual: Id },

    #[error("object {id} is a {actual}, not a {expected}")]
    KindMismatch {
        id: Id,
        expected: ReferenceKind,
        actual: ReferenceKind,
    },

    #[error("entity {entity} already has component {component}")]
    DuplicateComponent { entity: Id, component: Id },
}

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyViolation),

    /// The target object of a mutation is not registered.
    #[error("object not found: {0}")]
    NotFound(Id),
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
