//! Schema descriptors: [`TinyType`] and its [`Field`]s.
//!
//! A type owns an ordered field list and a default-value [`Object`] whose
//! overrides are the type-level defaults. Instances never copy defaults;
//! they resolve them at read time, so editing a type's defaults is visible
//! to every non-overriding instance immediately.
//!
//! Enums reuse the same shape: each field is a member whose field type is the
//! enum's base type, and the member's integer value lives in the default
//! value object.

use serde::{Deserialize, Serialize};
use tiny_types::{Id, Version};

use crate::builtin::BuiltinType;
use crate::error::SchemaError;
use crate::object::Object;
use crate::reference::Reference;
use crate::value::{EnumValue, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    Builtin,
    Struct,
    Enum,
    Component,
    Configuration,
}

impl TypeCode {
    /// Types whose instances are field containers.
    pub fn is_struct_like(self) -> bool {
        matches!(
            self,
            TypeCode::Struct | TypeCode::Component | TypeCode::Configuration
        )
    }
}

/// A field declared by exactly one [`TinyType`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    id: Id,
    name: String,
    field_type: Reference<TinyType>,
    is_array: bool,
    documentation: String,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: Reference<TinyType>, is_array: bool) -> Self {
        Self::with_id(Id::new(), name, field_type, is_array)
    }

    pub fn with_id(
        id: Id,
        name: impl Into<String>,
        field_type: Reference<TinyType>,
        is_array: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            field_type,
            is_array,
            documentation: String::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &Reference<TinyType> {
        &self.field_type
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn documentation(&self) -> &str {
        &self.documentation
    }
}

/// Describes a struct, component, enum, or builtin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TinyType {
    id: Id,
    name: String,
    #[serde(skip)]
    version: Version,
    type_code: TypeCode,
    builtin: Option<BuiltinType>,
    base_type: Option<Reference<TinyType>>,
    fields: Vec<Field>,
    default_value: Object,
    documentation: String,
}

impl TinyType {
    pub fn new(id: Id, name: impl Into<String>, type_code: TypeCode) -> Self {
        let name = name.into();
        let default_value = Object::default_for(Reference::new(id, name.clone()));
        let base_type = (type_code == TypeCode::Enum).then(|| {
            let int32 = BuiltinType::Int32;
            Reference::new(int32.id(), int32.name())
        });
        Self {
            id,
            name,
            version: Version::next(),
            type_code,
            builtin: None,
            base_type,
            fields: Vec::new(),
            default_value,
            documentation: String::new(),
        }
    }

    /// The descriptor for a builtin type.
    pub fn builtin(builtin: BuiltinType) -> Self {
        let mut ty = Self::new(builtin.id(), builtin.name(), TypeCode::Builtin);
        ty.builtin = Some(builtin);
        ty
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.default_value.retarget(Reference::new(self.id, name.clone()));
        self.name = name;
        self.touch();
    }

    /// Current version, including edits to the default value.
    pub fn version(&self) -> Version {
        self.version.max(self.default_value.version())
    }

    pub fn touch(&mut self) {
        self.version = Version::next();
    }

    pub fn type_code(&self) -> TypeCode {
        self.type_code
    }

    pub fn as_builtin(&self) -> Option<BuiltinType> {
        self.builtin
    }

    pub fn base_type(&self) -> Option<&Reference<TinyType>> {
        self.base_type.as_ref()
    }

    pub fn documentation(&self) -> &str {
        &self.documentation
    }

    pub fn set_documentation(&mut self, documentation: impl Into<String>) {
        self.documentation = documentation.into();
        self.touch();
    }

    // ---------------------------------------------------------------
    // Fields
    // ---------------------------------------------------------------

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, id: Id) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, id: Id) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    /// Append a new field. For enums the field becomes a member typed by the
    /// base type and gets the next free integer value.
    ///
    /// This does not check that `field_type` exists or that the field keeps
    /// the type non-recursive; `Registry::create_field` does.
    pub fn create_field(
        &mut self,
        name: impl Into<String>,
        field_type: Reference<TinyType>,
        is_array: bool,
    ) -> Result<&Field, SchemaError> {
        let field = match (&self.type_code, &self.base_type) {
            (TypeCode::Enum, Some(base)) => Field::new(name, base.clone(), false),
            _ => Field::new(name, field_type, is_array),
        };
        let index = self.fields.len();
        self.insert_field(index, field)?;
        Ok(&self.fields[index])
    }

    /// Insert `field` at `index` (clamped). If a field with the same id is
    /// already declared it is moved instead, keeping every stored override.
    pub fn insert_field(&mut self, index: usize, field: Field) -> Result<(), SchemaError> {
        if self
            .fields
            .iter()
            .any(|f| f.name == field.name && f.id != field.id)
        {
            return Err(SchemaError::DuplicateField {
                type_name: self.name.clone(),
                field: field.name,
            });
        }
        let is_new = match self.field_index(field.id) {
            Some(existing) => {
                self.fields.remove(existing);
                false
            }
            None => true,
        };
        let index = index.min(self.fields.len());
        let id = field.id;
        self.fields.insert(index, field);
        if is_new && self.type_code == TypeCode::Enum {
            let next = self.next_enum_value();
            self.default_value.set_override(id, Value::Int(next));
        }
        self.touch();
        Ok(())
    }

    /// Remove a field and its type-level default. Instances that still
    /// carry an override for it are left alone; see `Object::validate`.
    pub fn remove_field(&mut self, id: Id) -> Option<Field> {
        let index = self.field_index(id)?;
        let field = self.fields.remove(index);
        self.default_value.remove_override(id);
        self.touch();
        Some(field)
    }

    pub fn rename_field(&mut self, id: Id, name: impl Into<String>) -> Result<(), SchemaError> {
        let name = name.into();
        if self.fields.iter().any(|f| f.name == name && f.id != id) {
            return Err(SchemaError::DuplicateField {
                type_name: self.name.clone(),
                field: name,
            });
        }
        if let Some(field) = self.fields.iter_mut().find(|f| f.id == id) {
            field.name = name;
            self.touch();
        }
        Ok(())
    }

    pub fn set_field_documentation(&mut self, id: Id, documentation: impl Into<String>) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.id == id) {
            field.documentation = documentation.into();
            self.touch();
        }
    }

    /// Retype a field and drop the type-level default derived from the old
    /// type. Checked entry point: `Registry::set_field_type`.
    pub(crate) fn set_field_type(&mut self, id: Id, field_type: Reference<TinyType>, is_array: bool) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.id == id) {
            field.field_type = field_type;
            field.is_array = is_array;
            self.default_value.remove_override(id);
            self.touch();
        }
    }

    /// Change an enum's base type, retyping every member.
    pub(crate) fn set_base_type(&mut self, base: Reference<TinyType>) -> Result<(), SchemaError> {
        if self.type_code != TypeCode::Enum {
            return Err(SchemaError::NotAnEnum(self.name.clone()));
        }
        for field in &mut self.fields {
            field.field_type = base.clone();
        }
        self.base_type = Some(base);
        self.touch();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Defaults
    // ---------------------------------------------------------------

    /// The object holding this type's field-level defaults.
    pub fn default_value(&self) -> &Object {
        &self.default_value
    }

    pub fn default_value_mut(&mut self) -> &mut Object {
        &mut self.default_value
    }

    // ---------------------------------------------------------------
    // Enums
    // ---------------------------------------------------------------

    /// The integer value of an enum member.
    pub fn enum_value(&self, member: Id) -> i64 {
        self.default_value
            .override_value(member)
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    pub(crate) fn next_enum_value(&self) -> i64 {
        self.fields
            .iter()
            .filter_map(|f| self.default_value.override_value(f.id))
            .filter_map(Value::as_i64)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Find an enum member by name, falling back to its integer value.
    pub fn find_enum_member(&self, name: &str, value: i64) -> Option<&Field> {
        if self.type_code != TypeCode::Enum {
            return None;
        }
        self.field_by_name(name)
            .or_else(|| self.fields.iter().find(|f| self.enum_value(f.id) == value))
    }

    /// The member value of `member`, ready to store in a field.
    pub fn enum_member(&self, member: &Field) -> EnumValue {
        EnumValue::new(self.id, member.name.clone(), self.enum_value(member.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float32() -> Reference<TinyType> {
        Reference::new(BuiltinType::Float32.id(), "Float32")
    }

    #[test]
    fn create_field_appends_in_order() {
        let mut ty = TinyType::new(Id::new(), "Vec2", TypeCode::Struct);
        ty.create_field("x", float32(), false).unwrap();
        ty.create_field("y", float32(), false).unwrap();
        let names: Vec<_> = ty.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let mut ty = TinyType::new(Id::new(), "Vec2", TypeCode::Struct);
        ty.create_field("x", float32(), false).unwrap();
        let err = ty.create_field("x", float32(), false).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn insert_existing_field_moves_it() {
        let mut ty = TinyType::new(Id::new(), "Vec3", TypeCode::Struct);
        ty.create_field("x", float32(), false).unwrap();
        ty.create_field("y", float32(), false).unwrap();
        let z = ty.create_field("z", float32(), false).unwrap().clone();
        ty.default_value_mut().set_override(z.id(), Value::Float(3.0));

        ty.insert_field(0, z.clone()).unwrap();
        let names: Vec<_> = ty.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["z", "x", "y"]);
        assert_eq!(ty.field_by_name("z").unwrap().id(), z.id());
        assert_eq!(ty.default_value().override_value(z.id()), Some(&Value::Float(3.0)));
    }

    #[test]
    fn remove_field_drops_type_default() {
        let mut ty = TinyType::new(Id::new(), "Vec2", TypeCode::Struct);
        let x = ty.create_field("x", float32(), false).unwrap().id();
        ty.default_value_mut().set_override(x, Value::Float(1.0));
        let removed = ty.remove_field(x).unwrap();
        assert_eq!(removed.name(), "x");
        assert!(ty.default_value().override_value(x).is_none());
        assert!(ty.remove_field(x).is_none());
    }

    #[test]
    fn enum_members_get_sequential_values() {
        let mut ty = TinyType::new(Id::new(), "Direction", TypeCode::Enum);
        let up = ty.create_field("Up", float32(), false).unwrap().id();
        let down = ty.create_field("Down", float32(), false).unwrap().id();
        assert_eq!(ty.enum_value(up), 0);
        assert_eq!(ty.enum_value(down), 1);
        // Members are typed by the base type, not the requested type.
        assert_eq!(ty.field(up).unwrap().field_type().id(), BuiltinType::Int32.id());
    }

    #[test]
    fn enum_lookup_matches_name_then_value() {
        let mut ty = TinyType::new(Id::new(), "Direction", TypeCode::Enum);
        ty.create_field("Up", float32(), false).unwrap();
        let down = ty.create_field("Down", float32(), false).unwrap().id();
        ty.default_value_mut().set_override(down, Value::Int(10));

        assert_eq!(ty.find_enum_member("Down", 0).unwrap().name(), "Down");
        assert_eq!(ty.find_enum_member("Renamed", 10).unwrap().name(), "Down");
        assert!(ty.find_enum_member("Left", 99).is_none());
    }

    #[test]
    fn base_type_only_on_enums() {
        let mut ty = TinyType::new(Id::new(), "Vec2", TypeCode::Struct);
        assert!(ty.base_type().is_none());
        let err = ty.set_base_type(float32()).unwrap_err();
        assert_eq!(err, SchemaError::NotAnEnum("Vec2".into()));
    }

    #[test]
    fn default_value_edits_bump_type_version() {
        let mut ty = TinyType::new(Id::new(), "Vec2", TypeCode::Struct);
        let x = ty.create_field("x", float32(), false).unwrap().id();
        let before = ty.version();
        ty.default_value_mut().set_override(x, Value::Float(2.0));
        assert!(ty.version() > before);
    }

    #[test]
    fn version_is_not_serialized() {
        let ty = TinyType::new(Id::new(), "Vec2", TypeCode::Struct);
        let json = serde_json::to_value(&ty).unwrap();
        assert!(json.get("version").is_none());
        let back: TinyType = serde_json::from_value(json).unwrap();
        assert_eq!(back.version(), Version::ZERO);
        assert_eq!(back.name(), "Vec2");
    }
}
