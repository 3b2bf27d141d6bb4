//! Turning registry objects into [`Record`]s.
//!
//! Output is order-stable: object fields follow the type's declaration
//! order, and record properties follow a fixed order per kind.

use tiny_registry::{
    Entity, EntityGroup, Field, Module, Object, Reference, Registered, Registry, RegistryObject,
    Script, System, TinyType, Value,
};
use tiny_types::{Id, ReferenceKind};
use tracing::{debug, warn};

use crate::config::WriteOptions;
use crate::error::SnapshotResult;
use crate::record::{scalar, Property, PropertyValue, Record};

/// Write one registry object.
pub fn write_record(registry: &Registry, object: &RegistryObject, options: &WriteOptions) -> SnapshotResult<Record> {
    let properties = match object {
        RegistryObject::Type(ty) => type_properties(registry, ty, options)?,
        RegistryObject::Entity(entity) => entity_properties(registry, entity, options)?,
        RegistryObject::EntityGroup(group) => group_properties(group),
        RegistryObject::Module(module) => module_properties(module),
        RegistryObject::System(system) => system_properties(system),
        RegistryObject::Script(script) => script_properties(script),
    };
    Ok(Record {
        kind: object.kind(),
        id: object.id(),
        name: object.name().to_string(),
        version: options.include_versions.then(|| object.version().get()),
        properties,
    })
}

/// Write a sequence of objects, keeping their order.
pub fn write_records<'a>(
    registry: &Registry,
    objects: impl IntoIterator<Item = &'a RegistryObject>,
    options: &WriteOptions,
) -> SnapshotResult<Vec<Record>> {
    let records = objects
        .into_iter()
        .map(|object| write_record(registry, object, options))
        .collect::<SnapshotResult<Vec<_>>>()?;
    debug!(count = records.len(), "wrote records");
    Ok(records)
}

/// Write every registered object of kind `T`, in registration order.
pub fn write_all<T: Registered>(registry: &Registry, options: &WriteOptions) -> SnapshotResult<Vec<Record>> {
    write_records(
        registry,
        registry.iter().filter(|o| o.kind() == T::KIND),
        options,
    )
}

/// Write a schema object's fields as an `Object` property value.
///
/// An object whose type is no longer registered is written from its raw
/// overrides, keyed by field id, so one dangling component does not fail a
/// whole snapshot.
pub fn write_object(registry: &Registry, object: &Object, options: &WriteOptions) -> SnapshotResult<PropertyValue> {
    let Some(ty) = registry.find_type(object.type_id()) else {
        warn!(type_id = %object.type_id(), "writing object of unknown type from its overrides");
        return raw_object(registry, object, options);
    };
    let mut properties = Vec::with_capacity(ty.fields().len());
    for field in ty.fields() {
        let value = match object.override_value(field.id()) {
            Some(stored) => write_value(registry, stored, options)?,
            None if options.omit_defaults => continue,
            None => match object.get(registry, field.name()) {
                Ok(inherited) => write_value(registry, &inherited, options)?,
                Err(e) => {
                    warn!(field = field.name(), error = %e, "skipping unresolvable default");
                    continue;
                }
            },
        };
        properties.push(Property::new(field.name(), value));
    }
    Ok(PropertyValue::Object {
        type_id: ty.id(),
        type_name: ty.name().to_string(),
        properties,
    })
}

fn raw_object(registry: &Registry, object: &Object, options: &WriteOptions) -> SnapshotResult<PropertyValue> {
    let properties = object
        .overrides()
        .map(|(field, value)| {
            write_value(registry, value, options).map(|value| Property::new(field.to_hex(), value))
        })
        .collect::<SnapshotResult<Vec<_>>>()?;
    Ok(PropertyValue::Object {
        type_id: object.type_id(),
        type_name: object.type_ref().name().to_string(),
        properties,
    })
}

fn write_value(registry: &Registry, value: &Value, options: &WriteOptions) -> SnapshotResult<PropertyValue> {
    match value {
        Value::Object(object) => write_object(registry, object, options),
        Value::List(items) => items
            .iter()
            .map(|item| write_value(registry, item, options))
            .collect::<SnapshotResult<Vec<_>>>()
            .map(PropertyValue::List),
        other => Ok(scalar(other).unwrap_or(PropertyValue::Null)),
    }
}

fn reference<T: Registered>(r: &Reference<T>) -> PropertyValue {
    PropertyValue::reference(&r.to_object_ref())
}

fn optional_reference<T: Registered>(r: Option<&Reference<T>>) -> PropertyValue {
    r.map_or(PropertyValue::Null, reference)
}

fn references<T: Registered>(list: &[Reference<T>]) -> PropertyValue {
    PropertyValue::List(list.iter().map(reference).collect())
}

fn string(s: &str) -> PropertyValue {
    PropertyValue::String(s.to_string())
}

fn type_properties(registry: &Registry, ty: &TinyType, options: &WriteOptions) -> SnapshotResult<Vec<Property>> {
    let fields = ty.fields().iter().map(field_descriptor).collect();
    let mut properties = vec![
        Property::new("type_code", string(&format!("{:?}", ty.type_code()))),
        Property::new("base_type", optional_reference(ty.base_type())),
        Property::new("fields", PropertyValue::List(fields)),
    ];
    if !ty.fields().is_empty() {
        properties.push(Property::new(
            "default_value",
            write_object(registry, ty.default_value(), options)?,
        ));
    }
    properties.push(Property::new("documentation", string(ty.documentation())));
    Ok(properties)
}

fn field_descriptor(field: &Field) -> PropertyValue {
    PropertyValue::Object {
        type_id: Id::nil(),
        type_name: "Field".to_string(),
        properties: vec![
            Property::new("id", string(&field.id().to_hex())),
            Property::new("name", string(field.name())),
            Property::new("field_type", reference(field.field_type())),
            Property::new("is_array", PropertyValue::Bool(field.is_array())),
            Property::new("documentation", string(field.documentation())),
        ],
    }
}

fn entity_properties(registry: &Registry, entity: &Entity, options: &WriteOptions) -> SnapshotResult<Vec<Property>> {
    let components = entity
        .components()
        .iter()
        .map(|c| write_object(registry, c, options))
        .collect::<SnapshotResult<Vec<_>>>()?;
    Ok(vec![
        Property::new("enabled", PropertyValue::Bool(entity.enabled())),
        Property::new("layer", PropertyValue::Int(i64::from(entity.layer()))),
        Property::new("entity_group", optional_reference(entity.entity_group())),
        Property::new("components", PropertyValue::List(components)),
    ])
}

fn group_properties(group: &EntityGroup) -> Vec<Property> {
    vec![
        Property::new("entities", references(group.entities())),
        Property::new("documentation", string(group.documentation())),
    ]
}

fn module_properties(module: &Module) -> Vec<Property> {
    vec![
        Property::new("namespace", string(module.namespace())),
        Property::new("documentation", string(module.documentation())),
        Property::new("dependencies", references(module.dependencies())),
        Property::new("types", references(module.types())),
        Property::new("systems", references(module.systems())),
        Property::new("scripts", references(module.scripts())),
        Property::new("entity_groups", references(module.entity_groups())),
        Property::new("start_entity_group", optional_reference(module.start_entity_group())),
    ]
}

fn system_properties(system: &System) -> Vec<Property> {
    vec![
        Property::new("documentation", string(system.documentation())),
        Property::new("components", references(system.components())),
        Property::new("execute_after", references(system.execute_after())),
        Property::new("execute_before", references(system.execute_before())),
        Property::new("text_asset", PropertyValue::optional_string(system.text_asset())),
        Property::new("enabled", PropertyValue::Bool(system.enabled())),
    ]
}

fn script_properties(script: &Script) -> Vec<Property> {
    vec![
        Property::new("documentation", string(script.documentation())),
        Property::new("text_asset", PropertyValue::optional_string(script.text_asset())),
    ]
}

/// Record kinds in the order a full project dump writes them.
pub const WRITE_ORDER: [ReferenceKind; 6] = [
    ReferenceKind::Module,
    ReferenceKind::Type,
    ReferenceKind::System,
    ReferenceKind::Script,
    ReferenceKind::EntityGroup,
    ReferenceKind::Entity,
];

/// Write the whole registry grouped by kind, skipping builtin types.
pub fn write_registry(registry: &Registry, options: &WriteOptions) -> SnapshotResult<Vec<Record>> {
    let mut records = Vec::with_capacity(registry.len());
    for kind in WRITE_ORDER {
        let objects = registry
            .iter()
            .filter(|o| o.kind() == kind && !registry.is_builtin(o.id()));
        records.extend(write_records(registry, objects, options)?);
    }
    Ok(records)
}
