//! Dynamic, schema-checked property containers.
//!
//! An [`Object`] stores only the fields it explicitly overrides, keyed by
//! field [`Id`]. Reads resolve through a cascade:
//!
//! 1. the instance's own override,
//! 2. the owning type's default-value object,
//! 3. the field type's own default (recursively for nested structs),
//! 4. the builtin zero value.
//!
//! Nothing is cached, so schema and default edits are observed on the next
//! read. Writes go through an [`Assignment`], which is resolved and
//! type-checked against a [`Registry`] first and then applied to the object.
//! The split lets callers mutate objects that live inside the registry
//! without holding a shared and a mutable borrow at once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tiny_types::{Id, Version};

use crate::error::{ConsistencyViolation, SchemaError};
use crate::reference::{Reference, Registered};
use crate::registry::Registry;
use crate::types::{Field, TinyType, TypeCode};
use crate::value::Value;

/// A schema-conformant property bag.
///
/// Equality compares the type and the explicit overrides; versions are
/// ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Object {
    type_ref: Reference<TinyType>,
    overrides: BTreeMap<Id, Value>,
    is_default: bool,
    #[serde(skip)]
    version: Version,
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.type_ref == other.type_ref
            && self.is_default == other.is_default
            && self.overrides == other.overrides
    }
}

impl Object {
    /// A fresh instance of `type_ref` with no overrides.
    pub fn new(type_ref: Reference<TinyType>) -> Self {
        Self {
            type_ref,
            overrides: BTreeMap::new(),
            is_default: false,
            version: Version::next(),
        }
    }

    /// The default-value object owned by a type. Its missing fields fall
    /// straight through to the field types' defaults.
    pub(crate) fn default_for(type_ref: Reference<TinyType>) -> Self {
        Self {
            is_default: true,
            ..Self::new(type_ref)
        }
    }

    fn resolved(type_ref: Reference<TinyType>) -> Self {
        Self {
            type_ref,
            overrides: BTreeMap::new(),
            is_default: false,
            version: Version::ZERO,
        }
    }

    pub fn type_ref(&self) -> &Reference<TinyType> {
        &self.type_ref
    }

    pub fn type_id(&self) -> Id {
        self.type_ref.id()
    }

    /// Whether this is a type's default-value object.
    pub fn is_default_value(&self) -> bool {
        self.is_default
    }

    pub(crate) fn retarget(&mut self, type_ref: Reference<TinyType>) {
        self.type_ref = type_ref;
    }

    /// Current version: the newest stamp of this object or any nested object
    /// it holds.
    pub fn version(&self) -> Version {
        self.overrides
            .values()
            .map(nested_version)
            .fold(self.version, Version::max)
    }

    /// Stamp a fresh version.
    pub fn touch(&mut self) {
        self.version = Version::next();
    }

    // ---------------------------------------------------------------
    // Overrides
    // ---------------------------------------------------------------

    /// Explicit overrides in field-id order.
    pub fn overrides(&self) -> impl Iterator<Item = (Id, &Value)> {
        self.overrides.iter().map(|(id, v)| (*id, v))
    }

    pub fn override_value(&self, field: Id) -> Option<&Value> {
        self.overrides.get(&field)
    }

    pub fn is_overridden_field(&self, field: Id) -> bool {
        self.overrides.contains_key(&field)
    }

    /// Whether the named field holds an explicit override.
    pub fn is_overridden(&self, registry: &Registry, name: &str) -> Result<bool, SchemaError> {
        let ty = self.schema(registry)?;
        let field = field_named(ty, name)?;
        Ok(self.overrides.contains_key(&field.id()))
    }

    pub(crate) fn set_override(&mut self, field: Id, value: Value) {
        self.overrides.insert(field, value);
        self.touch();
    }

    pub(crate) fn remove_override(&mut self, field: Id) -> Option<Value> {
        let removed = self.overrides.remove(&field);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Read a field, falling back through the default cascade.
    ///
    /// Nested struct fields come back as a fully resolved [`Object`] snapshot.
    pub fn get(&self, registry: &Registry, name: &str) -> Result<Value, SchemaError> {
        self.get_path(registry, &[name])
    }

    /// Read a nested field, e.g. `["transform", "position", "x"]`.
    pub fn get_path(&self, registry: &Registry, path: &[&str]) -> Result<Value, SchemaError> {
        let steps = resolve_steps(registry, self.type_id(), path)?;
        resolve(registry, self, &steps, 0)
    }

    fn schema<'r>(&self, registry: &'r Registry) -> Result<&'r TinyType, SchemaError> {
        registry
            .find_type(self.type_id())
            .ok_or(SchemaError::UnknownType(self.type_id()))
    }

    fn lookup(&self, steps: &[Step]) -> Option<&Value> {
        let (last, init) = steps.split_last()?;
        let mut current = self;
        for step in init {
            match current.overrides.get(&step.field) {
                Some(Value::Object(nested)) => current = nested,
                _ => return None,
            }
        }
        current.overrides.get(&last.field)
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    /// Type-check `value` against the named field and store it as an
    /// override.
    pub fn set(&mut self, registry: &Registry, name: &str, value: impl Into<Value>) -> Result<(), SchemaError> {
        self.set_path(registry, &[name], value)
    }

    pub fn set_path(
        &mut self,
        registry: &Registry,
        path: &[&str],
        value: impl Into<Value>,
    ) -> Result<(), SchemaError> {
        let assignment = Assignment::new(registry, self.type_id(), path, value.into())?;
        self.apply(assignment).map_err(|_| SchemaError::UnknownType(self.type_id()))
    }

    /// Store a pre-checked assignment. Every object on the path gets a fresh
    /// version.
    pub fn apply(&mut self, assignment: Assignment) -> Result<(), ConsistencyViolation> {
        if assignment.type_id != self.type_id() {
            return Err(ConsistencyViolation::ObjectTypeMismatch {
                expected: self.type_id(),
                actual: assignment.type_id,
            });
        }
        let Assignment { steps, value, .. } = assignment;
        let Some((last, init)) = steps.split_last() else {
            return Ok(());
        };
        let mut current = self;
        for step in init {
            current.touch();
            let slot = current
                .overrides
                .entry(step.field)
                .or_insert_with(|| Value::Object(Object::new(step.field_type.clone())));
            if !matches!(slot, Value::Object(nested) if nested.type_id() == step.field_type.id()) {
                *slot = Value::Object(Object::new(step.field_type.clone()));
            }
            current = match slot {
                Value::Object(nested) => nested,
                _ => unreachable!("slot was just replaced with an object"),
            };
        }
        current.overrides.insert(last.field, value);
        current.touch();
        Ok(())
    }

    /// Drop the override for one field so it inherits again.
    pub fn reset_field(&mut self, registry: &Registry, name: &str) -> Result<bool, SchemaError> {
        let ty = self.schema(registry)?;
        let id = field_named(ty, name)?.id();
        Ok(self.remove_override(id).is_some())
    }

    /// Drop every override.
    pub fn reset(&mut self) {
        self.overrides.clear();
        self.touch();
    }

    /// Copy every override (and therefore every inheritance flag) from
    /// `other`. The destination keeps its own type and default-ness.
    pub fn copy_from(&mut self, other: &Object) -> Result<(), ConsistencyViolation> {
        if other.type_id() != self.type_id() {
            return Err(ConsistencyViolation::ObjectTypeMismatch {
                expected: self.type_id(),
                actual: other.type_id(),
            });
        }
        self.overrides = other.overrides.clone();
        self.touch();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    /// Report overrides that no longer fit the schema. Nothing is repaired.
    pub fn validate(&self, registry: &Registry) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();
        self.validate_into(registry, "", &mut issues);
        issues
    }

    fn validate_into(&self, registry: &Registry, prefix: &str, issues: &mut Vec<SchemaIssue>) {
        let Some(ty) = registry.find_type(self.type_id()) else {
            issues.push(SchemaIssue {
                path: prefix.to_string(),
                problem: SchemaProblem::MissingType(self.type_id()),
            });
            return;
        };
        for (field_id, value) in &self.overrides {
            let Some(field) = ty.field(*field_id) else {
                issues.push(SchemaIssue {
                    path: join(prefix, &field_id.short_hex()),
                    problem: SchemaProblem::StaleOverride(*field_id),
                });
                continue;
            };
            let path = join(prefix, field.name());
            if let Err(e) = check_value(registry, field, value.clone()) {
                issues.push(SchemaIssue {
                    path: path.clone(),
                    problem: SchemaProblem::InvalidOverride(e),
                });
            }
            match value {
                Value::Object(nested) => nested.validate_into(registry, &path, issues),
                Value::List(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if let Value::Object(nested) = item {
                            nested.validate_into(registry, &format!("{path}[{i}]"), issues);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Remove overrides for fields the type no longer declares, recursively.
    /// Returns the number removed.
    pub fn prune(&mut self, registry: &Registry) -> usize {
        let Some(ty) = registry.find_type(self.type_id()) else {
            return 0;
        };
        let before = self.overrides.len();
        self.overrides.retain(|id, _| ty.field(*id).is_some());
        let mut removed = before - self.overrides.len();
        for value in self.overrides.values_mut() {
            match value {
                Value::Object(nested) => removed += nested.prune(registry),
                Value::List(items) => {
                    for item in items {
                        if let Value::Object(nested) = item {
                            removed += nested.prune(registry);
                        }
                    }
                }
                _ => {}
            }
        }
        if removed > 0 {
            self.touch();
        }
        removed
    }
}

fn nested_version(value: &Value) -> Version {
    match value {
        Value::Object(o) => o.version(),
        Value::List(items) => items.iter().map(nested_version).fold(Version::ZERO, Version::max),
        _ => Version::ZERO,
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn field_named<'t>(ty: &'t TinyType, name: &str) -> Result<&'t Field, SchemaError> {
    ty.field_by_name(name).ok_or_else(|| SchemaError::UnknownField {
        type_name: ty.name().to_string(),
        field: name.to_string(),
    })
}

/// A problem found by [`Object::validate`].
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaIssue {
    /// Dotted field path, `[i]` for list elements.
    pub path: String,
    pub problem: SchemaProblem,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SchemaProblem {
    /// The object's type is no longer registered.
    MissingType(Id),
    /// An override for a field the type no longer declares.
    StaleOverride(Id),
    /// An override that no longer type-checks against its field.
    InvalidOverride(SchemaError),
}

// -------------------------------------------------------------------
// Assignments
// -------------------------------------------------------------------

/// A type-checked write, resolved against a registry and ready to apply to
/// any object of `type_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    type_id: Id,
    steps: Vec<Step>,
    value: Value,
}

impl Assignment {
    pub fn new(registry: &Registry, type_id: Id, path: &[&str], value: Value) -> Result<Self, SchemaError> {
        let steps = resolve_steps(registry, type_id, path)?;
        let Some(last) = steps.last() else {
            return Err(SchemaError::UnknownField {
                type_name: type_name(registry, type_id),
                field: String::new(),
            });
        };
        let field = registry
            .find_type(last.declaring)
            .and_then(|ty| ty.field(last.field))
            .ok_or(SchemaError::UnknownType(last.declaring))?;
        let value = check_value(registry, field, value)?;
        Ok(Self {
            type_id,
            steps,
            value,
        })
    }

    pub fn type_id(&self) -> Id {
        self.type_id
    }

    /// The checked (possibly coerced) value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

fn type_name(registry: &Registry, id: Id) -> String {
    registry
        .find_type(id)
        .map_or_else(|| id.short_hex(), |ty| ty.name().to_string())
}

/// One hop of a field path.
#[derive(Clone, Debug, PartialEq)]
struct Step {
    declaring: Id,
    field: Id,
    field_type: Reference<TinyType>,
    is_array: bool,
    is_struct: bool,
}

impl Step {
    fn of(registry: &Registry, declaring: Id, field: &Field) -> Self {
        let is_struct = registry
            .find_type(field.field_type().id())
            .is_some_and(|ty| ty.type_code().is_struct_like());
        Self {
            declaring,
            field: field.id(),
            field_type: field.field_type().clone(),
            is_array: field.is_array(),
            is_struct,
        }
    }

    fn is_nested_struct(&self) -> bool {
        self.is_struct && !self.is_array
    }
}

fn resolve_steps(registry: &Registry, type_id: Id, path: &[&str]) -> Result<Vec<Step>, SchemaError> {
    let mut steps: Vec<Step> = Vec::with_capacity(path.len());
    let mut current = type_id;
    for (i, name) in path.iter().enumerate() {
        if let Some(prev) = steps.last() {
            if !prev.is_nested_struct() {
                return Err(SchemaError::NotAStruct {
                    field: path[..i].join("."),
                });
            }
        }
        let ty = registry
            .find_type(current)
            .ok_or(SchemaError::UnknownType(current))?;
        let field = field_named(ty, name)?;
        let step = Step::of(registry, ty.id(), field);
        current = step.field_type.id();
        steps.push(step);
    }
    Ok(steps)
}

fn resolve(registry: &Registry, obj: &Object, steps: &[Step], depth: usize) -> Result<Value, SchemaError> {
    let limit = registry.config().max_resolve_depth;
    if depth > limit {
        return Err(SchemaError::RecursionLimit(limit));
    }
    let Some(last) = steps.last() else {
        return Ok(Value::Null);
    };

    if last.is_nested_struct() {
        let Some(ty) = registry.find_type(last.field_type.id()) else {
            return Ok(Value::Null);
        };
        let mut out = Object::resolved(ty.reference());
        for field in ty.fields() {
            let mut path = steps.to_vec();
            path.push(Step::of(registry, ty.id(), field));
            let value = resolve(registry, obj, &path, depth + 1)?;
            out.overrides.insert(field.id(), value);
        }
        return Ok(Value::Object(out));
    }

    if let Some(value) = obj.lookup(steps) {
        return Ok(value.clone());
    }
    if !obj.is_default {
        if let Some(ty) = registry.find_type(obj.type_id()) {
            return resolve(registry, ty.default_value(), steps, depth + 1);
        }
    }
    field_type_default(registry, steps, depth)
}

/// The default a field gets from its declared type, ignoring any overrides
/// along the way except those stored in nested types' default values.
fn field_type_default(registry: &Registry, steps: &[Step], depth: usize) -> Result<Value, SchemaError> {
    match steps {
        [] => Ok(Value::Null),
        [leaf] => Ok(leaf_default(registry, leaf)),
        [head, rest @ ..] => match registry.find_type(head.field_type.id()) {
            Some(ty) => resolve(registry, ty.default_value(), rest, depth + 1),
            None => Ok(Value::Null),
        },
    }
}

fn leaf_default(registry: &Registry, step: &Step) -> Value {
    if step.is_array {
        return Value::List(Vec::new());
    }
    let Some(ty) = registry.find_type(step.field_type.id()) else {
        return Value::Null;
    };
    match ty.type_code() {
        TypeCode::Builtin => ty.as_builtin().map_or(Value::Null, |b| b.default_value()),
        TypeCode::Enum => ty
            .fields()
            .first()
            .map_or(Value::Null, |member| Value::Enum(ty.enum_member(member))),
        TypeCode::Struct | TypeCode::Component | TypeCode::Configuration => Value::Null,
    }
}

/// Check `value` against `field`'s declared type, returning the normalised
/// value to store.
pub(crate) fn check_value(registry: &Registry, field: &Field, value: Value) -> Result<Value, SchemaError> {
    if field.is_array() {
        return match value {
            Value::Null => Ok(Value::List(Vec::new())),
            Value::List(items) => items
                .into_iter()
                .map(|item| check_element(registry, field, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            other => Err(SchemaError::TypeMismatch {
                field: field.name().to_string(),
                expected: format!("list of {}", field.field_type().name()),
                actual: other.shape().to_string(),
            }),
        };
    }
    check_element(registry, field, value)
}

fn check_element(registry: &Registry, field: &Field, value: Value) -> Result<Value, SchemaError> {
    let type_id = field.field_type().id();
    let ty = registry
        .find_type(type_id)
        .ok_or(SchemaError::UnknownType(type_id))?;
    let mismatch = |actual: String| SchemaError::TypeMismatch {
        field: field.name().to_string(),
        expected: ty.name().to_string(),
        actual,
    };

    match ty.type_code() {
        TypeCode::Builtin => match ty.as_builtin() {
            Some(builtin) => builtin.coerce(field.name(), value),
            None => Err(SchemaError::UnknownType(type_id)),
        },
        TypeCode::Enum => {
            let (name, number) = match &value {
                Value::Enum(e) if e.enum_type == ty.id() => (e.name.clone(), e.value),
                Value::Int(i) => (String::new(), *i),
                Value::String(s) => (s.clone(), i64::MIN),
                other => return Err(mismatch(other.shape().to_string())),
            };
            ty.find_enum_member(&name, number)
                .map(|member| Value::Enum(ty.enum_member(member)))
                .ok_or_else(|| SchemaError::UnknownEnumMember {
                    enum_name: ty.name().to_string(),
                    member: name,
                    value: number,
                })
        }
        TypeCode::Struct | TypeCode::Component | TypeCode::Configuration => match value {
            Value::Object(o) if o.type_id() == ty.id() => Ok(Value::Object(o)),
            Value::Object(o) => Err(mismatch(format!("object of `{}`", o.type_ref().name()))),
            other => Err(mismatch(other.shape().to_string())),
        },
    }
}
