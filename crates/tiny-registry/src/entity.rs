//! Entities and entity groups.

use serde::{Deserialize, Serialize};
use tiny_types::{Id, Version};

use crate::object::Object;
use crate::reference::Reference;

/// A named bag of component instances.
///
/// At most one component per type. Attach components through
/// `Registry::add_component`, which checks the type is a component.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    id: Id,
    name: String,
    #[serde(skip)]
    version: Version,
    enabled: bool,
    layer: i32,
    components: Vec<Object>,
    entity_group: Option<Reference<EntityGroup>>,
}

impl Entity {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: Version::next(),
            enabled: true,
            layer: 0,
            components: Vec::new(),
            entity_group: None,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
        self.touch();
    }

    /// Newest stamp of the entity or any of its components.
    pub fn version(&self) -> Version {
        self.components
            .iter()
            .map(Object::version)
            .fold(self.version, Version::max)
    }

    pub fn touch(&mut self) {
        self.version = Version::next();
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.touch();
        }
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    pub fn set_layer(&mut self, layer: i32) {
        if self.layer != layer {
            self.layer = layer;
            self.touch();
        }
    }

    pub fn entity_group(&self) -> Option<&Reference<EntityGroup>> {
        self.entity_group.as_ref()
    }

    pub(crate) fn set_entity_group(&mut self, group: Option<Reference<EntityGroup>>) {
        self.entity_group = group;
        self.touch();
    }

    pub fn components(&self) -> &[Object] {
        &self.components
    }

    pub(crate) fn components_mut(&mut self) -> &mut [Object] {
        &mut self.components
    }

    pub fn component(&self, type_id: Id) -> Option<&Object> {
        self.components.iter().find(|c| c.type_id() == type_id)
    }

    pub fn component_mut(&mut self, type_id: Id) -> Option<&mut Object> {
        self.components.iter_mut().find(|c| c.type_id() == type_id)
    }

    pub fn has_component(&self, type_id: Id) -> bool {
        self.component(type_id).is_some()
    }

    pub(crate) fn add_component(&mut self, component: Object) -> &mut Object {
        self.touch();
        self.components.push(component);
        let last = self.components.len() - 1;
        &mut self.components[last]
    }

    pub fn remove_component(&mut self, type_id: Id) -> Option<Object> {
        let index = self.components.iter().position(|c| c.type_id() == type_id)?;
        self.touch();
        Some(self.components.remove(index))
    }
}

/// An ordered list of entities, loaded and unloaded together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityGroup {
    id: Id,
    name: String,
    #[serde(skip)]
    version: Version,
    entities: Vec<Reference<Entity>>,
    documentation: String,
}

impl EntityGroup {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: Version::next(),
            entities: Vec::new(),
            documentation: String::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
        self.touch();
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn touch(&mut self) {
        self.version = Version::next();
    }

    pub fn entities(&self) -> &[Reference<Entity>] {
        &self.entities
    }

    pub fn contains(&self, entity: Id) -> bool {
        self.entities.iter().any(|e| e.id() == entity)
    }

    /// Append `entity` unless it is already listed.
    pub fn add_entity(&mut self, entity: Reference<Entity>) -> bool {
        if self.contains(entity.id()) {
            return false;
        }
        self.entities.push(entity);
        self.touch();
        true
    }

    pub fn remove_entity(&mut self, entity: Id) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e.id() != entity);
        let removed = self.entities.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn documentation(&self) -> &str {
        &self.documentation
    }

    pub fn set_documentation(&mut self, documentation: impl Into<String>) {
        self.documentation = documentation.into();
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Registered;

    #[test]
    fn new_entity_is_enabled_and_empty() {
        let e = Entity::new(Id::new(), "Player");
        assert!(e.enabled());
        assert_eq!(e.layer(), 0);
        assert!(e.components().is_empty());
        assert!(e.entity_group().is_none());
    }

    #[test]
    fn setters_only_bump_on_change() {
        let mut e = Entity::new(Id::new(), "Player");
        let v0 = e.version();
        e.set_enabled(true);
        assert_eq!(e.version(), v0);
        e.set_layer(3);
        assert!(e.version() > v0);
    }

    #[test]
    fn group_membership_is_unique() {
        let e = Entity::new(Id::new(), "Player");
        let mut g = EntityGroup::new(Id::new(), "Level");
        assert!(g.add_entity(e.reference()));
        assert!(!g.add_entity(e.reference()));
        assert_eq!(g.entities().len(), 1);
        assert!(g.remove_entity(e.id()));
        assert!(!g.remove_entity(e.id()));
    }
}
