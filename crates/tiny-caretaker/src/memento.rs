//! Opaque state snapshots.
//!
//! A [`Memento`] is a deep structural clone of one object taken at a known
//! [`Version`]. The state is shared behind an `Arc`, so handing mementos to
//! several subscribers or keeping them on an undo stack is cheap.

use std::cmp::Ordering;
use std::sync::Arc;

use tiny_registry::{Object, Registry, RegistryObject, SchemaProblem};
use tiny_types::{Id, ReferenceKind, Version};
use tracing::debug;

use crate::error::{CaretakerError, CaretakerResult};

/// A capture that could not fully resolve its object's schema. The memento
/// still holds the complete state; this records what was dangling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureDegradation {
    pub originator: Id,
    pub reason: String,
}

#[derive(Debug)]
enum State {
    Object(Object),
    Item(RegistryObject),
}

#[derive(Clone, Debug)]
pub struct Memento {
    originator: Id,
    kind: Option<ReferenceKind>,
    version: Version,
    source: Option<String>,
    state: Arc<State>,
    degradations: Vec<CaptureDegradation>,
}

impl Memento {
    /// Id of the captured object. For a bare [`Object`] this is its type id.
    pub fn originator(&self) -> Id {
        self.originator
    }

    /// Kind of the captured registry object, `None` for a bare object.
    pub fn kind(&self) -> Option<ReferenceKind> {
        self.kind
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Source tag the object carried when captured.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn degradations(&self) -> &[CaptureDegradation] {
        &self.degradations
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Whether both mementos hold structurally equal state, ignoring
    /// versions.
    pub fn same_state(&self, other: &Memento) -> bool {
        match (&*self.state, &*other.state) {
            (State::Object(a), State::Object(b)) => a == b,
            (State::Item(a), State::Item(b)) => items_equal(a, b),
            _ => false,
        }
    }

    /// The captured registry object, for writers and inspectors.
    pub fn item(&self) -> Option<&RegistryObject> {
        match &*self.state {
            State::Item(item) => Some(item),
            State::Object(_) => None,
        }
    }

    pub fn object(&self) -> Option<&Object> {
        match &*self.state {
            State::Object(object) => Some(object),
            State::Item(_) => None,
        }
    }
}

fn items_equal(a: &RegistryObject, b: &RegistryObject) -> bool {
    use RegistryObject as R;
    match (a, b) {
        (R::Type(x), R::Type(y)) => {
            x.id() == y.id()
                && x.name() == y.name()
                && x.type_code() == y.type_code()
                && x.fields() == y.fields()
                && x.base_type() == y.base_type()
                && x.default_value() == y.default_value()
                && x.documentation() == y.documentation()
        }
        (R::Entity(x), R::Entity(y)) => {
            x.id() == y.id()
                && x.name() == y.name()
                && x.enabled() == y.enabled()
                && x.layer() == y.layer()
                && x.components() == y.components()
                && x.entity_group() == y.entity_group()
        }
        (R::EntityGroup(x), R::EntityGroup(y)) => {
            x.id() == y.id()
                && x.name() == y.name()
                && x.entities() == y.entities()
                && x.documentation() == y.documentation()
        }
        (R::Module(x), R::Module(y)) => {
            x.id() == y.id()
                && x.name() == y.name()
                && x.namespace() == y.namespace()
                && x.dependencies() == y.dependencies()
                && x.types() == y.types()
                && x.systems() == y.systems()
                && x.scripts() == y.scripts()
                && x.entity_groups() == y.entity_groups()
                && x.start_entity_group() == y.start_entity_group()
                && x.documentation() == y.documentation()
        }
        (R::System(x), R::System(y)) => {
            x.id() == y.id()
                && x.name() == y.name()
                && x.components() == y.components()
                && x.execute_after() == y.execute_after()
                && x.execute_before() == y.execute_before()
                && x.text_asset() == y.text_asset()
                && x.enabled() == y.enabled()
                && x.documentation() == y.documentation()
        }
        (R::Script(x), R::Script(y)) => {
            x.id() == y.id()
                && x.name() == y.name()
                && x.text_asset() == y.text_asset()
                && x.documentation() == y.documentation()
        }
        _ => false,
    }
}

/// Equal when captured from the same object at the same version.
impl PartialEq for Memento {
    fn eq(&self, other: &Self) -> bool {
        self.originator == other.originator && self.version == other.version
    }
}

/// Mementos of the same originator order by version; others are
/// incomparable.
impl PartialOrd for Memento {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.originator == other.originator).then(|| self.version.cmp(&other.version))
    }
}

/// Something whose whole state can be captured and later put back.
pub trait Originator {
    /// Capture the current state. Never fails; unresolvable schema
    /// references are recorded as degradations.
    fn save(&self, registry: &Registry) -> Memento;

    /// Replace the current state with the memento's and stamp a fresh
    /// version.
    fn restore(&mut self, memento: &Memento) -> CaretakerResult<()>;
}

impl Originator for Object {
    fn save(&self, registry: &Registry) -> Memento {
        let originator = self.type_id();
        let degradations = self
            .validate(registry)
            .into_iter()
            .filter_map(|issue| match issue.problem {
                SchemaProblem::MissingType(id) => Some(CaptureDegradation {
                    originator,
                    reason: format!("`{}` has unknown type {id}", display_path(&issue.path)),
                }),
                _ => None,
            })
            .collect();
        Memento {
            originator,
            kind: None,
            version: self.version(),
            source: None,
            state: Arc::new(State::Object(self.clone())),
            degradations,
        }
    }

    fn restore(&mut self, memento: &Memento) -> CaretakerResult<()> {
        if memento.originator != self.type_id() {
            return Err(CaretakerError::OriginatorMismatch {
                expected: self.type_id(),
                actual: memento.originator,
            });
        }
        match &*memento.state {
            State::Object(object) => {
                *self = object.clone();
                self.touch();
                Ok(())
            }
            State::Item(item) => Err(CaretakerError::KindMismatch {
                id: self.type_id(),
                expected: None,
                actual: Some(item.kind()),
            }),
        }
    }
}

impl Originator for RegistryObject {
    fn save(&self, registry: &Registry) -> Memento {
        let originator = self.id();
        Memento {
            originator,
            kind: Some(self.kind()),
            version: self.version(),
            source: registry.source_of(originator).map(str::to_string),
            state: Arc::new(State::Item(self.clone())),
            degradations: dangling_types(registry, self),
        }
    }

    fn restore(&mut self, memento: &Memento) -> CaretakerResult<()> {
        if memento.originator != self.id() {
            return Err(CaretakerError::OriginatorMismatch {
                expected: self.id(),
                actual: memento.originator,
            });
        }
        let item = captured_item(memento, self.id(), Some(self.kind()))?;
        *self = item.clone();
        self.touch();
        Ok(())
    }
}

fn captured_item(memento: &Memento, id: Id, expected: Option<ReferenceKind>) -> CaretakerResult<&RegistryObject> {
    match &*memento.state {
        State::Item(item) if expected.is_none() || expected == Some(item.kind()) => Ok(item),
        State::Item(item) => Err(CaretakerError::KindMismatch {
            id,
            expected,
            actual: Some(item.kind()),
        }),
        State::Object(_) => Err(CaretakerError::KindMismatch {
            id,
            expected,
            actual: None,
        }),
    }
}

/// Put a captured registry object back into `registry` at its original id.
///
/// A live object is replaced in place, so every `Reference` to it observes
/// the restored state. An object that has since been unregistered is
/// re-registered under the source tag it had when captured.
pub fn restore_into(registry: &mut Registry, memento: &Memento) -> CaretakerResult<()> {
    let id = memento.originator;
    let live_kind = registry.kind_of(id);
    let item = captured_item(memento, id, live_kind)?;
    let resurrected = live_kind.is_none();

    let slot = registry.register_with_source(item.clone(), memento.source.clone())?;
    slot.touch();
    debug!(id = %id, version = %memento.version, resurrected, "restored memento");
    Ok(())
}

fn dangling_types(registry: &Registry, object: &RegistryObject) -> Vec<CaptureDegradation> {
    let originator = object.id();
    let degraded = |reason: String| CaptureDegradation { originator, reason };
    match object {
        RegistryObject::Type(ty) => ty
            .fields()
            .iter()
            .filter(|f| registry.find_type(f.field_type().id()).is_none())
            .map(|f| {
                degraded(format!(
                    "field `{}` references unknown type {}",
                    f.name(),
                    f.field_type().id()
                ))
            })
            .collect(),
        RegistryObject::Entity(entity) => entity
            .components()
            .iter()
            .flat_map(|c| c.validate(registry))
            .filter_map(|issue| match issue.problem {
                SchemaProblem::MissingType(id) => Some(degraded(format!(
                    "component `{}` has unknown type {id}",
                    display_path(&issue.path)
                ))),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
