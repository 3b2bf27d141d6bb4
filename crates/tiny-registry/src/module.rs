//! Modules, systems and scripts: the project-level containers that group
//! types and behaviour.

use serde::{Deserialize, Serialize};
use tiny_types::{Id, Version};

use crate::entity::EntityGroup;
use crate::reference::Reference;
use crate::types::TinyType;

fn add_unique<T>(list: &mut Vec<Reference<T>>, item: Reference<T>) -> bool {
    if list.iter().any(|r| r.id() == item.id()) {
        return false;
    }
    list.push(item);
    true
}

fn remove_id<T>(list: &mut Vec<Reference<T>>, id: Id) -> bool {
    let before = list.len();
    list.retain(|r| r.id() != id);
    list.len() != before
}

macro_rules! identity {
    ($ty:ident) => {
        impl $ty {
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

            pub fn documentation(&self) -> &str {
                &self.documentation
            }

            pub fn set_documentation(&mut self, documentation: impl Into<String>) {
                self.documentation = documentation.into();
                self.touch();
            }
        }
    };
}

/// A unit of content: a namespace plus the types, systems, scripts and
/// entity groups it declares.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Module {
    id: Id,
    name: String,
    #[serde(skip)]
    version: Version,
    namespace: String,
    documentation: String,
    dependencies: Vec<Reference<Module>>,
    types: Vec<Reference<TinyType>>,
    systems: Vec<Reference<System>>,
    scripts: Vec<Reference<Script>>,
    entity_groups: Vec<Reference<EntityGroup>>,
    start_entity_group: Option<Reference<EntityGroup>>,
}

identity!(Module);

impl Module {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            namespace: name.clone(),
            name,
            version: Version::next(),
            documentation: String::new(),
            dependencies: Vec::new(),
            types: Vec::new(),
            systems: Vec::new(),
            scripts: Vec::new(),
            entity_groups: Vec::new(),
            start_entity_group: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
        self.touch();
    }

    pub fn dependencies(&self) -> &[Reference<Module>] {
        &self.dependencies
    }

    pub fn types(&self) -> &[Reference<TinyType>] {
        &self.types
    }

    pub fn systems(&self) -> &[Reference<System>] {
        &self.systems
    }

    pub fn scripts(&self) -> &[Reference<Script>] {
        &self.scripts
    }

    pub fn entity_groups(&self) -> &[Reference<EntityGroup>] {
        &self.entity_groups
    }

    pub fn start_entity_group(&self) -> Option<&Reference<EntityGroup>> {
        self.start_entity_group.as_ref()
    }

    /// Returns `false` when the dependency is already listed or is the
    /// module itself.
    pub fn add_dependency(&mut self, module: Reference<Module>) -> bool {
        if module.id() == self.id {
            return false;
        }
        let added = add_unique(&mut self.dependencies, module);
        if added {
            self.touch();
        }
        added
    }

    pub fn remove_dependency(&mut self, module: Id) -> bool {
        let removed = remove_id(&mut self.dependencies, module);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn add_type(&mut self, ty: Reference<TinyType>) -> bool {
        let added = add_unique(&mut self.types, ty);
        if added {
            self.touch();
        }
        added
    }

    pub fn remove_type(&mut self, ty: Id) -> bool {
        let removed = remove_id(&mut self.types, ty);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn add_system(&mut self, system: Reference<System>) -> bool {
        let added = add_unique(&mut self.systems, system);
        if added {
            self.touch();
        }
        added
    }

    pub fn remove_system(&mut self, system: Id) -> bool {
        let removed = remove_id(&mut self.systems, system);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn add_script(&mut self, script: Reference<Script>) -> bool {
        let added = add_unique(&mut self.scripts, script);
        if added {
            self.touch();
        }
        added
    }

    pub fn remove_script(&mut self, script: Id) -> bool {
        let removed = remove_id(&mut self.scripts, script);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn add_entity_group(&mut self, group: Reference<EntityGroup>) -> bool {
        let added = add_unique(&mut self.entity_groups, group);
        if added {
            self.touch();
        }
        added
    }

    /// Removing the start group also clears it.
    pub fn remove_entity_group(&mut self, group: Id) -> bool {
        let removed = remove_id(&mut self.entity_groups, group);
        if self.start_entity_group.as_ref().is_some_and(|g| g.id() == group) {
            self.start_entity_group = None;
        }
        if removed {
            self.touch();
        }
        removed
    }

    /// Set the group loaded on startup, adding it to the module if needed.
    pub fn set_start_entity_group(&mut self, group: Option<Reference<EntityGroup>>) {
        if let Some(g) = &group {
            add_unique(&mut self.entity_groups, g.clone());
        }
        self.start_entity_group = group;
        self.touch();
    }
}

/// Per-frame behaviour over a set of component types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct System {
    id: Id,
    name: String,
    #[serde(skip)]
    version: Version,
    documentation: String,
    components: Vec<Reference<TinyType>>,
    execute_after: Vec<Reference<System>>,
    execute_before: Vec<Reference<System>>,
    text_asset: Option<String>,
    enabled: bool,
}

identity!(System);

impl System {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: Version::next(),
            documentation: String::new(),
            components: Vec::new(),
            execute_after: Vec::new(),
            execute_before: Vec::new(),
            text_asset: None,
            enabled: true,
        }
    }

    pub fn components(&self) -> &[Reference<TinyType>] {
        &self.components
    }

    pub fn add_component(&mut self, ty: Reference<TinyType>) -> bool {
        let added = add_unique(&mut self.components, ty);
        if added {
            self.touch();
        }
        added
    }

    pub fn remove_component(&mut self, ty: Id) -> bool {
        let removed = remove_id(&mut self.components, ty);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn execute_after(&self) -> &[Reference<System>] {
        &self.execute_after
    }

    pub fn execute_before(&self) -> &[Reference<System>] {
        &self.execute_before
    }

    /// Order this system after `other`. A system cannot follow itself.
    pub fn add_execute_after(&mut self, other: Reference<System>) -> bool {
        if other.id() == self.id {
            return false;
        }
        let added = add_unique(&mut self.execute_after, other);
        if added {
            self.touch();
        }
        added
    }

    pub fn add_execute_before(&mut self, other: Reference<System>) -> bool {
        if other.id() == self.id {
            return false;
        }
        let added = add_unique(&mut self.execute_before, other);
        if added {
            self.touch();
        }
        added
    }

    pub fn remove_ordering(&mut self, other: Id) -> bool {
        let removed =
            remove_id(&mut self.execute_after, other) | remove_id(&mut self.execute_before, other);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn text_asset(&self) -> Option<&str> {
        self.text_asset.as_deref()
    }

    pub fn set_text_asset(&mut self, asset: Option<String>) {
        self.text_asset = asset;
        self.touch();
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
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Script {
    id: Id,
    name: String,
    #[serde(skip)]
    version: Version,
    documentation: String,
    text_asset: Option<String>,
}

identity!(Script);

impl Script {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: Version::next(),
            documentation: String::new(),
            text_asset: None,
        }
    }

    pub fn text_asset(&self) -> Option<&str> {
        self.text_asset.as_deref()
    }

    pub fn set_text_asset(&mut self, asset: Option<String>) {
        self.text_asset = asset;
        self.touch();
    }
}
