//! The builtin type catalogue.
//!
//! Builtins are ordinary [`TinyType`](crate::TinyType)s with
//! [`TypeCode::Builtin`](crate::TypeCode::Builtin) whose ids are generated
//! from their names, so every session agrees on them.

use serde::{Deserialize, Serialize};
use tiny_types::{Id, ReferenceKind};

use crate::error::SchemaError;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Boolean,
    String,
    EntityReference,
    Texture2D,
    Sprite,
    AudioClip,
    Font,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 17] = [
        BuiltinType::Int8,
        BuiltinType::Int16,
        BuiltinType::Int32,
        BuiltinType::Int64,
        BuiltinType::UInt8,
        BuiltinType::UInt16,
        BuiltinType::UInt32,
        BuiltinType::UInt64,
        BuiltinType::Float32,
        BuiltinType::Float64,
        BuiltinType::Boolean,
        BuiltinType::String,
        BuiltinType::EntityReference,
        BuiltinType::Texture2D,
        BuiltinType::Sprite,
        BuiltinType::AudioClip,
        BuiltinType::Font,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Int8 => "Int8",
            BuiltinType::Int16 => "Int16",
            BuiltinType::Int32 => "Int32",
            BuiltinType::Int64 => "Int64",
            BuiltinType::UInt8 => "UInt8",
            BuiltinType::UInt16 => "UInt16",
            BuiltinType::UInt32 => "UInt32",
            BuiltinType::UInt64 => "UInt64",
            BuiltinType::Float32 => "Float32",
            BuiltinType::Float64 => "Float64",
            BuiltinType::Boolean => "Boolean",
            BuiltinType::String => "String",
            BuiltinType::EntityReference => "EntityReference",
            BuiltinType::Texture2D => "Texture2D",
            BuiltinType::Sprite => "Sprite",
            BuiltinType::AudioClip => "AudioClip",
            BuiltinType::Font => "Font",
        }
    }

    /// The stable id of this builtin.
    pub fn id(self) -> Id {
        Id::generate(self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn is_integer(self) -> bool {
        self.int_range().is_some()
    }

    pub fn is_float(self) -> bool {
        matches!(self, BuiltinType::Float32 | BuiltinType::Float64)
    }

    pub fn is_asset(self) -> bool {
        matches!(
            self,
            BuiltinType::Texture2D | BuiltinType::Sprite | BuiltinType::AudioClip | BuiltinType::Font
        )
    }

    /// Inclusive range of an integer builtin, widened to `i128`.
    fn int_range(self) -> Option<(i128, i128)> {
        let range = match self {
            BuiltinType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            BuiltinType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            BuiltinType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            BuiltinType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            BuiltinType::UInt8 => (0, u8::MAX as i128),
            BuiltinType::UInt16 => (0, u16::MAX as i128),
            BuiltinType::UInt32 => (0, u32::MAX as i128),
            BuiltinType::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    fn is_unsigned(self) -> bool {
        matches!(
            self,
            BuiltinType::UInt8 | BuiltinType::UInt16 | BuiltinType::UInt32 | BuiltinType::UInt64
        )
    }

    /// The value a field of this type holds when nothing overrides it.
    pub fn default_value(self) -> Value {
        match self {
            _ if self.is_unsigned() => Value::UInt(0),
            _ if self.is_integer() => Value::Int(0),
            BuiltinType::Float32 | BuiltinType::Float64 => Value::Float(0.0),
            BuiltinType::Boolean => Value::Bool(false),
            BuiltinType::String => Value::String(String::new()),
            _ => Value::Null,
        }
    }

    /// Check `value` against this type, converting between numeric shapes
    /// where that loses nothing the field can represent.
    pub fn coerce(self, field: &str, value: Value) -> Result<Value, SchemaError> {
        let mismatch = |value: &Value| SchemaError::TypeMismatch {
            field: field.to_string(),
            expected: self.name().to_string(),
            actual: value.shape().to_string(),
        };

        if let Some((min, max)) = self.int_range() {
            let wide = match &value {
                Value::Int(i) => i128::from(*i),
                Value::UInt(u) => i128::from(*u),
                _ => return Err(mismatch(&value)),
            };
            if wide < min || wide > max {
                return Err(SchemaError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("{wide} is out of range for {}", self.name()),
                });
            }
            // Range checked above, so the narrowing casts are exact.
            return Ok(if self.is_unsigned() {
                Value::UInt(wide as u64)
            } else {
                Value::Int(wide as i64)
            });
        }

        match self {
            BuiltinType::Float32 | BuiltinType::Float64 => match value.as_f64() {
                Some(f) if self == BuiltinType::Float32 => Ok(Value::Float(f64::from(f as f32))),
                Some(f) => Ok(Value::Float(f)),
                None => Err(mismatch(&value)),
            },
            BuiltinType::Boolean => match value {
                Value::Bool(_) => Ok(value),
                _ => Err(mismatch(&value)),
            },
            BuiltinType::String => match value {
                Value::String(_) => Ok(value),
                _ => Err(mismatch(&value)),
            },
            BuiltinType::EntityReference => match &value {
                Value::Null => Ok(value),
                Value::Reference(r) if r.kind == ReferenceKind::Entity => Ok(value),
                _ => Err(mismatch(&value)),
            },
            _ => match value {
                Value::Null | Value::Asset(_) => Ok(value),
                _ => Err(mismatch(&value)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_types::{AssetRef, ObjectRef};

    #[test]
    fn ids_are_stable_and_distinct() {
        assert_eq!(BuiltinType::Int32.id(), Id::generate("Int32"));
        let mut ids: Vec<_> = BuiltinType::ALL.iter().map(|b| b.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), BuiltinType::ALL.len());
    }

    #[test]
    fn from_name_roundtrip() {
        for b in BuiltinType::ALL {
            assert_eq!(BuiltinType::from_name(b.name()), Some(b));
        }
        assert_eq!(BuiltinType::from_name("Vec2"), None);
    }

    #[test]
    fn defaults() {
        assert_eq!(BuiltinType::Int8.default_value(), Value::Int(0));
        assert_eq!(BuiltinType::UInt16.default_value(), Value::UInt(0));
        assert_eq!(BuiltinType::Float32.default_value(), Value::Float(0.0));
        assert_eq!(BuiltinType::Boolean.default_value(), Value::Bool(false));
        assert_eq!(BuiltinType::String.default_value(), Value::from(""));
        assert_eq!(BuiltinType::Sprite.default_value(), Value::Null);
    }

    #[test]
    fn integers_coerce_into_floats() {
        assert_eq!(
            BuiltinType::Float32.coerce("x", Value::Int(5)).unwrap(),
            Value::Float(5.0)
        );
    }

    #[test]
    fn integer_range_is_enforced() {
        assert_eq!(BuiltinType::UInt8.coerce("x", Value::Int(255)).unwrap(), Value::UInt(255));
        assert!(matches!(
            BuiltinType::UInt8.coerce("x", Value::Int(256)),
            Err(SchemaError::InvalidValue { .. })
        ));
        assert!(matches!(
            BuiltinType::UInt32.coerce("x", Value::Int(-1)),
            Err(SchemaError::InvalidValue { .. })
        ));
        assert!(matches!(
            BuiltinType::Int32.coerce("x", Value::Float(1.5)),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn references_and_assets() {
        let entity = ObjectRef::new(ReferenceKind::Entity, Id::new(), "e");
        let module = ObjectRef::new(ReferenceKind::Module, Id::new(), "m");
        assert!(BuiltinType::EntityReference
            .coerce("target", Value::Reference(entity))
            .is_ok());
        assert!(BuiltinType::EntityReference
            .coerce("target", Value::Reference(module))
            .is_err());
        assert!(BuiltinType::Texture2D
            .coerce("tex", Value::Asset(AssetRef::new("abc", 1)))
            .is_ok());
        assert!(BuiltinType::Texture2D.coerce("tex", Value::Bool(true)).is_err());
    }
}
