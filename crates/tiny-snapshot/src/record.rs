use serde::{Deserialize, Serialize};
use tiny_registry::{EnumValue, Value};
use tiny_types::{AssetRef, Id, ObjectRef, ReferenceKind};

/// The written form of one registry object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: ReferenceKind,
    pub id: Id,
    pub name: String,
    /// Present when written with `include_versions`.
    pub version: Option<u64>,
    pub properties: Vec<Property>,
}

impl Record {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        find(&self.properties, name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A kind-tagged property value.
///
/// Externally tagged so the binary back end can decode it without a
/// self-describing format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Enum {
        type_id: Id,
        name: String,
        value: i64,
    },
    /// A nested object. Descriptor structures with no schema type (field
    /// declarations) carry a nil `type_id`.
    Object {
        type_id: Id,
        type_name: String,
        properties: Vec<Property>,
    },
    List(Vec<PropertyValue>),
    Reference {
        kind: ReferenceKind,
        id: Id,
        name: String,
    },
    Asset {
        guid: String,
        file_id: i64,
    },
}

impl PropertyValue {
    /// Tag naming the value's kind; references use their per-kind tag.
    pub fn tag(&self) -> &'static str {
        match self {
            PropertyValue::Null => "Null",
            PropertyValue::Bool(_) => "Bool",
            PropertyValue::Int(_) => "Int",
            PropertyValue::UInt(_) => "UInt",
            PropertyValue::Float(_) => "Float",
            PropertyValue::String(_) => "String",
            PropertyValue::Enum { .. } => "Enum",
            PropertyValue::Object { .. } => "Object",
            PropertyValue::List(_) => "List",
            PropertyValue::Reference { kind, .. } => kind.tag(),
            PropertyValue::Asset { .. } => "Asset",
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        match self {
            PropertyValue::Object { properties, .. } => find(properties, name),
            _ => None,
        }
    }

    pub fn reference(r: &ObjectRef) -> Self {
        PropertyValue::Reference {
            kind: r.kind,
            id: r.id,
            name: r.name.clone(),
        }
    }

    pub fn optional_string(s: Option<&str>) -> Self {
        s.map_or(PropertyValue::Null, |s| PropertyValue::String(s.to_string()))
    }
}

fn find<'p>(properties: &'p [Property], name: &str) -> Option<&'p PropertyValue> {
    properties.iter().find(|p| p.name == name).map(|p| &p.value)
}

/// Scalar conversions. Objects are handled by the writer, which needs the
/// registry to enumerate fields.
pub(crate) fn scalar(value: &Value) -> Option<PropertyValue> {
    let converted = match value {
        Value::Null => PropertyValue::Null,
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Int(i) => PropertyValue::Int(*i),
        Value::UInt(u) => PropertyValue::UInt(*u),
        Value::Float(f) => PropertyValue::Float(*f),
        Value::String(s) => PropertyValue::String(s.clone()),
        Value::Enum(e) => PropertyValue::Enum {
            type_id: e.enum_type,
            name: e.name.clone(),
            value: e.value,
        },
        Value::Reference(r) => PropertyValue::reference(r),
        Value::Asset(a) => PropertyValue::Asset {
            guid: a.guid.clone(),
            file_id: a.file_id,
        },
        Value::Object(_) | Value::List(_) => return None,
    };
    Some(converted)
}

/// Inverse of [`scalar`].
pub(crate) fn scalar_value(value: &PropertyValue) -> Option<Value> {
    let converted = match value {
        PropertyValue::Null => Value::Null,
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::Int(i) => Value::Int(*i),
        PropertyValue::UInt(u) => Value::UInt(*u),
        PropertyValue::Float(f) => Value::Float(*f),
        PropertyValue::String(s) => Value::String(s.clone()),
        PropertyValue::Enum {
            type_id,
            name,
            value,
        } => Value::Enum(EnumValue::new(*type_id, name.clone(), *value)),
        PropertyValue::Reference { kind, id, name } => {
            Value::Reference(ObjectRef::new(*kind, *id, name.clone()))
        }
        PropertyValue::Asset { guid, file_id } => Value::Asset(AssetRef::new(guid.clone(), *file_id)),
        PropertyValue::Object { .. } | PropertyValue::List(_) => return None,
    };
    Some(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_tags_follow_kind() {
        for kind in ReferenceKind::ALL {
            let v = PropertyValue::reference(&ObjectRef::new(kind, Id::nil(), ""));
            assert_eq!(v.tag(), kind.tag());
        }
        assert_eq!(PropertyValue::Asset { guid: "g".into(), file_id: 1 }.tag(), "Asset");
    }

    #[test]
    fn scalars_convert_both_ways() {
        let values = [
            Value::Null,
            Value::Bool(true),
            Value::Int(-3),
            Value::UInt(7),
            Value::Float(1.5),
            Value::from("s"),
            Value::Enum(EnumValue::new(Id::generate("E"), "A", 2)),
            Value::Asset(AssetRef::new("guid", 4)),
        ];
        for value in values {
            let written = scalar(&value).unwrap();
            assert_eq!(scalar_value(&written), Some(value));
        }
        assert!(scalar(&Value::List(vec![])).is_none());
    }
}
