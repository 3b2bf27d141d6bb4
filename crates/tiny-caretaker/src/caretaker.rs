//! Poll-based change detection.
//!
//! Mutations only bump version stamps. Once per frame the host calls
//! [`Caretaker::update`], which compares every registered object's version
//! with the last one it saw, captures a [`Memento`] for each object that
//! moved, and notifies subscribers.

use std::fmt;

use indexmap::IndexMap;
use tiny_registry::{Registry, RegistryObject};
use tiny_types::{Id, ReferenceKind, Version};
use tracing::{debug, warn};

use crate::config::CaretakerConfig;
use crate::error::CaretakerResult;
use crate::memento::{restore_into, Memento, Originator};

/// One detected change. `previous` is `None` the first time an object is
/// seen; `current` is `None` once it has been unregistered.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    pub originator: Id,
    pub kind: ReferenceKind,
    pub previous: Option<Memento>,
    pub current: Option<Memento>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl Change {
    pub fn change_kind(&self) -> ChangeKind {
        match (&self.previous, &self.current) {
            (None, _) => ChangeKind::Created,
            (Some(_), Some(_)) => ChangeKind::Modified,
            (Some(_), None) => ChangeKind::Removed,
        }
    }
}

/// Handle returned by [`Caretaker::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Change)>;

pub struct Caretaker {
    config: CaretakerConfig,
    tracked: IndexMap<Id, Memento>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Caretaker {
    pub fn new() -> Self {
        Self::with_config(CaretakerConfig::default())
    }

    pub fn with_config(config: CaretakerConfig) -> Self {
        Self {
            config,
            tracked: IndexMap::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn config(&self) -> &CaretakerConfig {
        &self.config
    }

    /// Register a callback invoked for every change `update` detects.
    pub fn subscribe(&mut self, f: impl FnMut(&Change) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Number of objects with a recorded baseline.
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_tracking(&self, id: Id) -> bool {
        self.tracked.contains_key(&id)
    }

    /// Version recorded at the last capture of `id`.
    pub fn tracked_version(&self, id: Id) -> Option<Version> {
        self.tracked.get(&id).map(Memento::version)
    }

    /// The last memento captured for `id`.
    pub fn latest(&self, id: Id) -> Option<&Memento> {
        self.tracked.get(&id)
    }

    fn watches(&self, registry: &Registry, object: &RegistryObject) -> bool {
        self.config.track_builtins || !registry.is_builtin(object.id())
    }

    /// Capture every object whose version moved since the last pass, emit
    /// removals for objects that disappeared, and notify subscribers.
    ///
    /// One object failing to resolve its schema never blocks the others: the
    /// capture is kept and the degradation is logged.
    pub fn update(&mut self, registry: &Registry) -> Vec<Change> {
        let changes = self.scan(registry);
        for change in &changes {
            if let Some(current) = &change.current {
                for d in current.degradations() {
                    warn!(originator = %d.originator, reason = %d.reason, "degraded capture");
                }
            }
            for (_, subscriber) in &mut self.subscribers {
                subscriber(change);
            }
        }
        if !changes.is_empty() {
            debug!(changes = changes.len(), tracked = self.tracked.len(), "caretaker update");
        }
        changes
    }

    /// Record the current state as the baseline without notifying anyone.
    pub fn baseline(&mut self, registry: &Registry) {
        let changes = self.scan(registry);
        debug!(changes = changes.len(), "caretaker baseline");
    }

    fn scan(&mut self, registry: &Registry) -> Vec<Change> {
        let mut changes = Vec::new();
        for object in registry.iter() {
            if !self.watches(registry, object) {
                continue;
            }
            let id = object.id();
            if self.tracked_version(id) == Some(object.version()) {
                continue;
            }
            let current = object.save(registry);
            let mut previous = self.tracked.insert(id, current.clone());
            // An id reused by another kind is a removal plus a creation.
            if let Some(old) = previous.take_if(|p| p.kind() != Some(object.kind())) {
                changes.push(Change {
                    originator: id,
                    kind: old.kind().unwrap_or(ReferenceKind::Type),
                    previous: Some(old),
                    current: None,
                });
            }
            changes.push(Change {
                originator: id,
                kind: object.kind(),
                previous,
                current: Some(current),
            });
        }

        let gone: Vec<Id> = self
            .tracked
            .keys()
            .copied()
            .filter(|id| !registry.contains(*id))
            .collect();
        for id in gone {
            if let Some(previous) = self.tracked.shift_remove(&id) {
                let kind = previous.kind().unwrap_or(ReferenceKind::Type);
                changes.push(Change {
                    originator: id,
                    kind,
                    previous: Some(previous),
                    current: None,
                });
            }
        }
        changes
    }

    /// Capture `id` without touching the baseline.
    pub fn capture(&self, registry: &Registry, id: Id) -> Option<Memento> {
        registry.get(id).map(|object| object.save(registry))
    }

    /// Restore a memento into the registry and move the baseline to the
    /// restored state, so the next `update` does not report it again.
    pub fn restore(&mut self, registry: &mut Registry, memento: &Memento) -> CaretakerResult<()> {
        restore_into(registry, memento)?;
        self.resync(registry, memento.originator());
        Ok(())
    }

    /// Unregister `id` and forget it, without a removal change.
    pub fn remove(&mut self, registry: &mut Registry, id: Id) -> Option<RegistryObject> {
        self.tracked.shift_remove(&id);
        registry.unregister(id)
    }

    /// Stop tracking `id`. Its next appearance counts as a creation.
    pub fn untrack(&mut self, id: Id) -> Option<Memento> {
        self.tracked.shift_remove(&id)
    }

    fn resync(&mut self, registry: &Registry, id: Id) {
        match registry.get(id) {
            Some(object) if self.watches(registry, object) => {
                self.tracked.insert(id, object.save(registry));
            }
            _ => {
                self.tracked.shift_remove(&id);
            }
        }
    }

    /// Forget every baseline.
    pub fn reset(&mut self) {
        self.tracked.clear();
    }
}

impl Default for Caretaker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Caretaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caretaker")
            .field("config", &self.config)
            .field("tracked", &self.tracked.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use tiny_registry::{BuiltinType, Entity, TypeCode};

    fn untracked_builtins() -> Caretaker {
        Caretaker::with_config(CaretakerConfig {
            track_builtins: false,
            ..CaretakerConfig::default()
        })
    }

    #[test]
    fn first_update_captures_everything() {
        let registry = Registry::new();
        let mut caretaker = Caretaker::new();
        let changes = caretaker.update(&registry);
        assert_eq!(changes.len(), BuiltinType::ALL.len());
        assert!(changes.iter().all(|c| c.change_kind() == ChangeKind::Created));
        assert!(caretaker.update(&registry).is_empty());
    }

    #[test]
    fn builtins_can_be_ignored() {
        let registry = Registry::new();
        let mut caretaker = untracked_builtins();
        assert!(caretaker.update(&registry).is_empty());
    }

    #[test]
    fn nested_edit_is_detected_on_owner() {
        let mut registry = Registry::new();
        let (entity, health) = (Id::new(), Id::new());
        registry.create_entity(entity, "e").unwrap();
        registry.create_type(health, "Health", TypeCode::Component).unwrap();
        registry
            .create_field(health, "hp", BuiltinType::Int32.id(), false)
            .unwrap();
        registry.add_component(entity, health).unwrap();

        let mut caretaker = untracked_builtins();
        caretaker.baseline(&registry);
        registry.set_component_value(entity, health, &["hp"], 3).unwrap();

        let changes = caretaker.update(&registry);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].originator, entity);
        assert_eq!(changes[0].change_kind(), ChangeKind::Modified);
        assert!(changes[0].previous < changes[0].current);
    }

    #[test]
    fn subscribers_see_every_change() {
        let mut registry = Registry::new();
        let mut caretaker = untracked_builtins();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = caretaker.subscribe(move |c| sink.borrow_mut().push(c.originator));

        let a = Id::new();
        registry.create_entity(a, "a").unwrap();
        caretaker.update(&registry);
        assert_eq!(*seen.borrow(), vec![a]);

        assert!(caretaker.unsubscribe(sub));
        registry.find_by_id_mut::<Entity>(a).unwrap().set_layer(2);
        caretaker.update(&registry);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn removal_is_reported_once() {
        let mut registry = Registry::new();
        let mut caretaker = untracked_builtins();
        let id = Id::new();
        registry.create_entity(id, "e").unwrap();
        caretaker.update(&registry);

        registry.unregister(id);
        let changes = caretaker.update(&registry);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_kind(), ChangeKind::Removed);
        assert_eq!(changes[0].kind, ReferenceKind::Entity);
        assert!(!caretaker.is_tracking(id));
        assert!(caretaker.update(&registry).is_empty());
    }

    #[test]
    fn restore_does_not_echo() {
        let mut registry = Registry::new();
        let mut caretaker = untracked_builtins();
        let id = Id::new();
        registry.create_entity(id, "e").unwrap();
        caretaker.update(&registry);
        let m0 = caretaker.latest(id).cloned().unwrap();

        registry.find_by_id_mut::<Entity>(id).unwrap().set_enabled(false);
        caretaker.update(&registry);

        caretaker.restore(&mut registry, &m0).unwrap();
        assert!(registry.find_by_id::<Entity>(id).unwrap().enabled());
        assert!(caretaker.update(&registry).is_empty());
    }

    #[test]
    fn degraded_capture_does_not_block_others() {
        let mut registry = Registry::new();
        let mut caretaker = untracked_builtins();
        let (broken, fine, ty) = (Id::new(), Id::new(), Id::new());
        registry.create_type(ty, "Gone", TypeCode::Component).unwrap();
        registry.create_entity(broken, "broken").unwrap();
        registry.add_component(broken, ty).unwrap();
        registry.create_entity(fine, "fine").unwrap();
        registry.unregister(ty);

        let changes = caretaker.update(&registry);
        assert_eq!(changes.len(), 2);
        let degraded: Vec<bool> = changes
            .iter()
            .map(|c| c.current.as_ref().unwrap().is_degraded())
            .collect();
        assert_eq!(degraded, vec![true, false]);
    }

    #[test]
    fn capture_leaves_baseline_alone() {
        let mut registry = Registry::new();
        let mut caretaker = untracked_builtins();
        let id = Id::new();
        registry.create_entity(id, "e").unwrap();
        assert!(caretaker.capture(&registry, id).is_some());
        assert!(!caretaker.is_tracking(id));
        assert_eq!(caretaker.update(&registry).len(), 1);
        assert!(caretaker.capture(&registry, Id::new()).is_none());
    }

    #[test]
    fn id_reused_by_another_kind_is_removal_then_creation() {
        let mut registry = Registry::new();
        let id = Id::new();
        registry.create_entity(id, "e").unwrap();
        let mut caretaker = untracked_builtins();
        caretaker.baseline(&registry);

        registry.unregister(id);
        registry.create_type(id, "Reused", TypeCode::Struct).unwrap();
        let changes = caretaker.update(&registry);

        let summary: Vec<_> = changes.iter().map(|c| (c.originator, c.kind, c.change_kind())).collect();
        assert_eq!(
            summary,
            vec![
                (id, ReferenceKind::Entity, ChangeKind::Removed),
                (id, ReferenceKind::Type, ChangeKind::Created),
            ]
        );
        assert_eq!(caretaker.latest(id).and_then(Memento::kind), Some(ReferenceKind::Type));
    }
}
