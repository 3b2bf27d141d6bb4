//! The owning store of every schema object.
//!
//! [`Registry`] is an insertion-ordered arena keyed by [`Id`]. Everything else
//! in the model holds ids ([`Reference<T>`](crate::Reference)) rather than
//! pointers, so removing an object can only ever turn a lookup into a miss.
//!
//! Objects registered while a [`SourceScope`] is alive are tagged with the
//! innermost scope's tag, so everything a file contributed can be removed in
//! one call with [`Registry::unregister_all_by_source`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::ops::{Deref, DerefMut};

use indexmap::{IndexMap, IndexSet};
use tiny_types::{Id, ReferenceKind};
use tracing::{debug, info, warn};

use crate::builtin::BuiltinType;
use crate::config::RegistryConfig;
use crate::entity::{Entity, EntityGroup};
use crate::error::{ConsistencyViolation, RegistryError, RegistryResult, SchemaError};
use crate::item::RegistryObject;
use crate::module::{Module, Script, System};
use crate::object::{Assignment, Object, SchemaIssue};
use crate::reference::Registered;
use crate::types::{Field, TinyType, TypeCode};
use crate::value::Value;

pub struct Registry {
    config: RegistryConfig,
    objects: IndexMap<Id, RegistryObject>,
    names: HashMap<String, Vec<Id>>,
    sources: HashMap<Id, String>,
    by_source: HashMap<String, IndexSet<Id>>,
    scopes: Vec<String>,
    builtins: HashSet<Id>,
}

impl Registry {
    /// A registry with the default configuration and the builtin types
    /// installed.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let mut registry = Self {
            config,
            objects: IndexMap::new(),
            names: HashMap::new(),
            sources: HashMap::new(),
            by_source: HashMap::new(),
            scopes: Vec::new(),
            builtins: HashSet::new(),
        };
        if registry.config.install_builtins {
            registry.install_builtins();
        }
        registry
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn install_builtins(&mut self) {
        for builtin in BuiltinType::ALL {
            self.insert(TinyType::builtin(builtin).into(), None);
            self.builtins.insert(builtin.id());
        }
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Number of registered objects, builtins included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn is_builtin(&self, id: Id) -> bool {
        self.builtins.contains(&id)
    }

    /// Every object in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryObject> {
        self.objects.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.objects.keys().copied()
    }

    pub fn get(&self, id: Id) -> Option<&RegistryObject> {
        self.objects.get(&id)
    }

    /// Direct mutable access. Renames must still go through [`Registry::rename`].
    pub fn get_mut(&mut self, id: Id) -> Option<&mut RegistryObject> {
        self.objects.get_mut(&id)
    }

    /// Look up an object of kind `T`. `None` if absent or of another kind.
    pub fn find_by_id<T: Registered>(&self, id: Id) -> Option<&T> {
        self.objects.get(&id).and_then(T::from_object)
    }

    pub fn find_by_id_mut<T: Registered>(&mut self, id: Id) -> Option<&mut T> {
        self.objects.get_mut(&id).and_then(T::from_object_mut)
    }

    /// First registered object of kind `T` with this name.
    pub fn find_by_name<T: Registered>(&self, name: &str) -> Option<&T> {
        self.names
            .get(name)?
            .iter()
            .find_map(|id| self.find_by_id::<T>(*id))
    }

    /// Every object of kind `T`, in registration order.
    pub fn find_all<'a, T: Registered + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.objects.values().filter_map(T::from_object)
    }

    pub fn find_type(&self, id: Id) -> Option<&TinyType> {
        self.find_by_id::<TinyType>(id)
    }

    pub fn find_type_by_name(&self, name: &str) -> Option<&TinyType> {
        self.find_by_name::<TinyType>(name)
    }

    pub fn builtin(&self, builtin: BuiltinType) -> Option<&TinyType> {
        self.find_type(builtin.id())
    }

    /// Kind of the object registered under `id`.
    pub fn kind_of(&self, id: Id) -> Option<ReferenceKind> {
        self.objects.get(&id).map(RegistryObject::kind)
    }

    // ---------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------

    /// Register a new object, failing if its id is taken. The object is
    /// tagged with the innermost active source scope.
    pub fn create<T: Registered>(&mut self, object: T) -> RegistryResult<&mut T> {
        let id = object.id();
        if id.is_nil() {
            return Err(ConsistencyViolation::NullId.into());
        }
        if self.objects.contains_key(&id) {
            return Err(ConsistencyViolation::DuplicateId(id).into());
        }
        let source = self.scopes.last().cloned();
        let slot = self.insert(object.into_object(), source);
        T::from_object_mut(slot).ok_or(RegistryError::NotFound(id))
    }

    pub fn create_type(&mut self, id: Id, name: impl Into<String>, type_code: TypeCode) -> RegistryResult<&mut TinyType> {
        self.create(TinyType::new(id, name, type_code))
    }

    pub fn create_entity(&mut self, id: Id, name: impl Into<String>) -> RegistryResult<&mut Entity> {
        self.create(Entity::new(id, name))
    }

    pub fn create_entity_group(&mut self, id: Id, name: impl Into<String>) -> RegistryResult<&mut EntityGroup> {
        self.create(EntityGroup::new(id, name))
    }

    pub fn create_module(&mut self, id: Id, name: impl Into<String>) -> RegistryResult<&mut Module> {
        self.create(Module::new(id, name))
    }

    pub fn create_system(&mut self, id: Id, name: impl Into<String>) -> RegistryResult<&mut System> {
        self.create(System::new(id, name))
    }

    pub fn create_script(&mut self, id: Id, name: impl Into<String>) -> RegistryResult<&mut Script> {
        self.create(Script::new(id, name))
    }

    /// Insert or replace. Inside a source scope the object takes the scope's
    /// tag; otherwise a replaced object keeps the tag it had.
    pub fn register(&mut self, object: RegistryObject) -> RegistryResult<&mut RegistryObject> {
        let id = object.id();
        let source = self
            .scopes
            .last()
            .cloned()
            .or_else(|| self.sources.get(&id).cloned());
        self.register_with_source(object, source)
    }

    /// Insert or replace with an explicit source tag.
    pub fn register_with_source(
        &mut self,
        object: RegistryObject,
        source: Option<String>,
    ) -> RegistryResult<&mut RegistryObject> {
        if object.id().is_nil() {
            return Err(ConsistencyViolation::NullId.into());
        }
        Ok(self.insert(object, source))
    }

    fn insert(&mut self, object: RegistryObject, source: Option<String>) -> &mut RegistryObject {
        let id = object.id();
        if let Some(previous) = self.objects.get(&id) {
            let old_name = previous.name().to_string();
            self.unindex_name(&old_name, id);
        }
        self.unindex_source(id);

        self.names.entry(object.name().to_string()).or_default().push(id);
        if let Some(tag) = source {
            self.by_source.entry(tag.clone()).or_default().insert(id);
            self.sources.insert(id, tag);
        }
        debug!(id = %id, kind = %object.kind(), name = object.name(), "registered object");

        match self.objects.entry(id) {
            indexmap::map::Entry::Occupied(mut slot) => {
                slot.insert(object);
                slot.into_mut()
            }
            indexmap::map::Entry::Vacant(slot) => slot.insert(object),
        }
    }

    fn unindex_name(&mut self, name: &str, id: Id) {
        if let Some(ids) = self.names.get_mut(name) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.names.remove(name);
            }
        }
    }

    fn unindex_source(&mut self, id: Id) {
        if let Some(tag) = self.sources.remove(&id) {
            if let Some(ids) = self.by_source.get_mut(&tag) {
                ids.shift_remove(&id);
                if ids.is_empty() {
                    self.by_source.remove(&tag);
                }
            }
        }
    }

    /// Remove an object. Absent ids are a no-op.
    pub fn unregister(&mut self, id: Id) -> Option<RegistryObject> {
        let removed = self.objects.shift_remove(&id)?;
        self.unindex_name(removed.name(), id);
        self.unindex_source(id);
        self.builtins.remove(&id);
        debug!(id = %id, kind = %removed.kind(), "unregistered object");
        Some(removed)
    }

    /// Rename an object, keeping the name index current.
    pub fn rename(&mut self, id: Id, name: impl Into<String>) -> RegistryResult<()> {
        let name = name.into();
        let object = self.objects.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        let old = object.name().to_string();
        if old == name {
            return Ok(());
        }
        object.set_name(name.clone());
        self.unindex_name(&old, id);
        self.names.entry(name).or_default().push(id);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Source scopes
    // ---------------------------------------------------------------

    /// Open a source scope. Objects registered through the returned guard
    /// are tagged with `tag` until it is dropped.
    pub fn source_scope(&mut self, tag: impl Into<String>) -> SourceScope<'_> {
        let tag = tag.into();
        debug!(tag = %tag, depth = self.scopes.len() + 1, "entering source scope");
        self.scopes.push(tag);
        SourceScope { registry: self }
    }

    /// Run `f` inside a source scope.
    pub fn with_source<R>(&mut self, tag: impl Into<String>, f: impl FnOnce(&mut Registry) -> R) -> R {
        let mut scope = self.source_scope(tag);
        f(&mut scope)
    }

    /// The innermost active scope tag.
    pub fn current_source(&self) -> Option<&str> {
        self.scopes.last().map(String::as_str)
    }

    /// The tag an object was registered under.
    pub fn source_of(&self, id: Id) -> Option<&str> {
        self.sources.get(&id).map(String::as_str)
    }

    /// Ids tagged with `tag`, in registration order.
    pub fn ids_by_source(&self, tag: &str) -> Vec<Id> {
        self.by_source
            .get(tag)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remove every object tagged with `tag`. Returns the number removed.
    pub fn unregister_all_by_source(&mut self, tag: &str) -> usize {
        let ids = self.ids_by_source(tag);
        let count = ids
            .into_iter()
            .filter(|id| self.unregister(*id).is_some())
            .count();
        info!(tag, count, "unregistered source");
        count
    }

    /// Remove every non-builtin object and reinstall the builtin types.
    pub fn clear(&mut self) {
        let ids: Vec<Id> = self
            .objects
            .keys()
            .copied()
            .filter(|id| !self.builtins.contains(id))
            .collect();
        let count = ids.len();
        for id in ids {
            self.unregister(id);
        }
        if self.config.install_builtins {
            self.install_builtins();
        }
        info!(count, "cleared registry");
    }

    // ---------------------------------------------------------------
    // Schema edits
    // ---------------------------------------------------------------

    /// Append a field to a type. On enums the field becomes a member typed by
    /// the enum's base type.
    pub fn create_field(
        &mut self,
        type_id: Id,
        name: impl Into<String>,
        field_type: Id,
        is_array: bool,
    ) -> RegistryResult<Id> {
        let name = name.into();
        let field_ty = self.find_type(field_type).ok_or(SchemaError::UnknownType(field_type))?;
        let field_ref = field_ty.reference();
        let owner = self.find_type(type_id).ok_or(RegistryError::NotFound(type_id))?;
        if owner.type_code() != TypeCode::Enum
            && !is_array
            && field_ty.type_code().is_struct_like()
            && self.embeds(field_type, type_id, 0)
        {
            return Err(SchemaError::RecursiveField {
                type_name: owner.name().to_string(),
                field: name,
            }
            .into());
        }
        let ty = self
            .find_by_id_mut::<TinyType>(type_id)
            .ok_or(RegistryError::NotFound(type_id))?;
        let id = ty.create_field(name, field_ref, is_array)?.id();
        debug!(type_id = %type_id, field = %id, "created field");
        Ok(id)
    }

    /// Retype a field. Instances inheriting the field pick up the new type's
    /// default; overriding instances keep their value (see `Object::validate`).
    pub fn set_field_type(&mut self, type_id: Id, field_id: Id, field_type: Id, is_array: bool) -> RegistryResult<()> {
        let field_ty = self.find_type(field_type).ok_or(SchemaError::UnknownType(field_type))?;
        let field_ref = field_ty.reference();
        let owner = self.find_type(type_id).ok_or(RegistryError::NotFound(type_id))?;
        let field = owner.field(field_id).ok_or_else(|| SchemaError::UnknownField {
            type_name: owner.name().to_string(),
            field: field_id.short_hex(),
        })?;
        if !is_array && field_ty.type_code().is_struct_like() && self.embeds(field_type, type_id, 0) {
            return Err(SchemaError::RecursiveField {
                type_name: owner.name().to_string(),
                field: field.name().to_string(),
            }
            .into());
        }
        if let Some(ty) = self.find_by_id_mut::<TinyType>(type_id) {
            ty.set_field_type(field_id, field_ref, is_array);
        }
        Ok(())
    }

    /// Change an enum's base type. Member values that still fit are kept;
    /// the rest are renumbered after the largest kept value, or into the
    /// lowest free value once that overflows the base. Fails without
    /// changes if the base has no room left.
    pub fn set_base_type(&mut self, enum_id: Id, base: Id) -> RegistryResult<()> {
        let base_ty = self.find_type(base).ok_or(SchemaError::UnknownType(base))?;
        let builtin = base_ty
            .as_builtin()
            .filter(|b| b.is_integer())
            .ok_or_else(|| SchemaError::TypeMismatch {
                field: "base_type".to_string(),
                expected: "integer builtin".to_string(),
                actual: base_ty.name().to_string(),
            })?;
        let base_ref = base_ty.reference();
        let ty = self.find_type(enum_id).ok_or(RegistryError::NotFound(enum_id))?;
        if ty.type_code() != TypeCode::Enum {
            return Err(SchemaError::NotAnEnum(ty.name().to_string()).into());
        }

        let fits = |value: i64| builtin.coerce("", Value::Int(value)).is_ok();
        let (kept, misfits): (Vec<&Field>, Vec<&Field>) =
            ty.fields().iter().partition(|f| fits(ty.enum_value(f.id())));
        let mut used: BTreeSet<i64> = kept.iter().map(|f| ty.enum_value(f.id())).collect();
        let mut renumbered = Vec::with_capacity(misfits.len());
        for member in misfits {
            let after_max = match used.last() {
                None => Some(0),
                Some(max) => max.checked_add(1).filter(|v| fits(*v)),
            };
            // Only the first `used.len() + 1` values can hold a gap.
            let lowest_free = || (0..=used.len() as i64).find(|v| !used.contains(v) && fits(*v));
            let next = after_max.or_else(lowest_free).ok_or_else(|| SchemaError::InvalidValue {
                field: member.name().to_string(),
                reason: format!("no free value left in {}", builtin.name()),
            })?;
            used.insert(next);
            renumbered.push((member.id(), next));
        }

        let ty = self
            .find_by_id_mut::<TinyType>(enum_id)
            .ok_or(RegistryError::NotFound(enum_id))?;
        ty.set_base_type(base_ref)?;
        for (id, value) in renumbered {
            warn!(enum_id = %enum_id, member = %id, value, "renumbered enum member");
            ty.default_value_mut().set_override(id, Value::Int(value));
        }
        Ok(())
    }

    /// Set a type-level default, e.g. `["position", "x"]`.
    pub fn set_default_value(&mut self, type_id: Id, path: &[&str], value: Value) -> RegistryResult<()> {
        let assignment = Assignment::new(self, type_id, path, value)?;
        let ty = self
            .find_by_id_mut::<TinyType>(type_id)
            .ok_or(RegistryError::NotFound(type_id))?;
        ty.default_value_mut().apply(assignment)?;
        Ok(())
    }

    /// Whether `container` holds `target` by value, directly or through
    /// nested struct fields.
    fn embeds(&self, container: Id, target: Id, depth: usize) -> bool {
        if container == target {
            return true;
        }
        if depth >= self.config.max_resolve_depth {
            return true;
        }
        let Some(ty) = self.find_type(container) else {
            return false;
        };
        ty.fields().iter().filter(|f| !f.is_array()).any(|f| {
            self.find_type(f.field_type().id())
                .is_some_and(|inner| inner.type_code().is_struct_like())
                && self.embeds(f.field_type().id(), target, depth + 1)
        })
    }

    // ---------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------

    /// Attach a fresh instance of a component type to an entity.
    pub fn add_component(&mut self, entity_id: Id, type_id: Id) -> RegistryResult<&mut Object> {
        let ty = self.find_type(type_id).ok_or(SchemaError::UnknownType(type_id))?;
        if ty.type_code() != TypeCode::Component {
            return Err(SchemaError::NotAComponent(ty.name().to_string()).into());
        }
        let type_ref = ty.reference();
        let entity = self.entity_mut(entity_id)?;
        if entity.has_component(type_id) {
            return Err(ConsistencyViolation::DuplicateComponent {
                entity: entity_id,
                component: type_id,
            }
            .into());
        }
        Ok(entity.add_component(Object::new(type_ref)))
    }

    pub fn remove_component(&mut self, entity_id: Id, type_id: Id) -> RegistryResult<Option<Object>> {
        Ok(self.entity_mut(entity_id)?.remove_component(type_id))
    }

    /// Type-checked write into one of an entity's components. Bumps the
    /// component and, through it, the entity.
    pub fn set_component_value(
        &mut self,
        entity_id: Id,
        type_id: Id,
        path: &[&str],
        value: impl Into<Value>,
    ) -> RegistryResult<()> {
        let assignment = Assignment::new(self, type_id, path, value.into())?;
        let component = self
            .entity_mut(entity_id)?
            .component_mut(type_id)
            .ok_or(RegistryError::NotFound(type_id))?;
        component.apply(assignment)?;
        Ok(())
    }

    /// Move an entity into a group, leaving its previous group.
    pub fn add_entity_to_group(&mut self, group_id: Id, entity_id: Id) -> RegistryResult<()> {
        let group_ref = self
            .find_by_id::<EntityGroup>(group_id)
            .map(|group| group.reference())
            .ok_or_else(|| self.not_of_kind(group_id, ReferenceKind::EntityGroup))?;
        let entity = self.entity_mut(entity_id)?;
        let entity_ref = entity.reference();
        let previous = entity.entity_group().map(|g| g.id());
        entity.set_entity_group(Some(group_ref));

        if let Some(previous) = previous.filter(|p| *p != group_id) {
            if let Some(old) = self.find_by_id_mut::<EntityGroup>(previous) {
                old.remove_entity(entity_id);
            }
        }
        if let Some(group) = self.find_by_id_mut::<EntityGroup>(group_id) {
            group.add_entity(entity_ref);
        }
        Ok(())
    }

    fn entity_mut(&mut self, id: Id) -> RegistryResult<&mut Entity> {
        if let Some(actual) = self.kind_of(id).filter(|k| *k != ReferenceKind::Entity) {
            return Err(ConsistencyViolation::KindMismatch {
                id,
                expected: ReferenceKind::Entity,
                actual,
            }
            .into());
        }
        self.find_by_id_mut::<Entity>(id).ok_or(RegistryError::NotFound(id))
    }

    fn not_of_kind(&self, id: Id, expected: ReferenceKind) -> RegistryError {
        match self.kind_of(id) {
            Some(actual) => ConsistencyViolation::KindMismatch { id, expected, actual }.into(),
            None => RegistryError::NotFound(id),
        }
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    /// Schema issues of every stored object: type defaults and entity
    /// components.
    pub fn validate(&self) -> Vec<(Id, SchemaIssue)> {
        let mut issues = Vec::new();
        for object in self.objects.values() {
            let found = match object {
                RegistryObject::Type(ty) => ty.default_value().validate(self),
                RegistryObject::Entity(entity) => entity
                    .components()
                    .iter()
                    .flat_map(|c| c.validate(self))
                    .collect(),
                _ => Vec::new(),
            };
            issues.extend(found.into_iter().map(|issue| (object.id(), issue)));
        }
        issues
    }

    /// Drop overrides for fields their type no longer declares. Returns the
    /// number removed.
    pub fn prune_stale_overrides(&mut self) -> usize {
        let mut total = 0;
        for index in 0..self.objects.len() {
            let Some((_, object)) = self.objects.get_index(index) else {
                continue;
            };
            let mut pruned = object.clone();
            let removed = match &mut pruned {
                RegistryObject::Type(ty) => ty.default_value_mut().prune(self),
                RegistryObject::Entity(entity) => entity
                    .components_mut()
                    .iter_mut()
                    .map(|c| c.prune(self))
                    .sum::<usize>(),
                _ => 0,
            };
            if removed > 0 {
                if let Some((_, slot)) = self.objects.get_index_mut(index) {
                    *slot = pruned;
                }
                total += removed;
            }
        }
        if total > 0 {
            info!(count = total, "pruned stale overrides");
        }
        total
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("object_count", &self.objects.len())
            .field("builtin_count", &self.builtins.len())
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Guard returned by [`Registry::source_scope`]. Dereferences to the
/// registry; the scope closes when the guard is dropped.
pub struct SourceScope<'r> {
    registry: &'r mut Registry,
}

impl SourceScope<'_> {
    pub fn tag(&self) -> &str {
        self.registry.current_source().unwrap_or_default()
    }
}

impl Deref for SourceScope<'_> {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        self.registry
    }
}

impl DerefMut for SourceScope<'_> {
    fn deref_mut(&mut self) -> &mut Registry {
        self.registry
    }
}

impl Drop for SourceScope<'_> {
    fn drop(&mut self) {
        if let Some(tag) = self.registry.scopes.pop() {
            debug!(tag = %tag, "leaving source scope");
        }
    }
}
