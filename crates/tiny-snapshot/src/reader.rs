//! Reading object properties back.
//!
//! A property that is absent means "use the declared default", so reading
//! only ever sets what was written.

use tiny_registry::{Object, Registered, Registry, SchemaError, Value};

use crate::error::SnapshotResult;
use crate::record::{scalar_value, Property, PropertyValue};

/// Build an object of the type named by an `Object` property value.
pub fn read_object(registry: &Registry, value: &PropertyValue) -> SnapshotResult<Object> {
    let PropertyValue::Object {
        type_id, properties, ..
    } = value
    else {
        return Err(SchemaError::TypeMismatch {
            field: String::new(),
            expected: "Object".to_string(),
            actual: value.tag().to_string(),
        }
        .into());
    };
    let ty = registry
        .find_type(*type_id)
        .ok_or(SchemaError::UnknownType(*type_id))?;
    let mut object = Object::new(ty.reference());
    apply_properties(registry, &mut object, properties)?;
    Ok(object)
}

/// Set every written property on `object`, type-checked.
pub fn apply_properties(registry: &Registry, object: &mut Object, properties: &[Property]) -> SnapshotResult<()> {
    for property in properties {
        let value = read_value(registry, &property.value)?;
        object.set(registry, &property.name, value)?;
    }
    Ok(())
}

fn read_value(registry: &Registry, value: &PropertyValue) -> SnapshotResult<Value> {
    match value {
        PropertyValue::Object { .. } => read_object(registry, value).map(Value::Object),
        PropertyValue::List(items) => items
            .iter()
            .map(|item| read_value(registry, item))
            .collect::<SnapshotResult<Vec<_>>>()
            .map(Value::List),
        other => Ok(scalar_value(other).unwrap_or(Value::Null)),
    }
}
