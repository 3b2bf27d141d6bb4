//! Undo/redo on top of caretaker change groups.

use indexmap::IndexMap;
use tiny_registry::Registry;
use tiny_types::Id;
use tracing::{debug, warn};

use crate::caretaker::{Caretaker, Change};
use crate::error::CaretakerResult;
use crate::memento::Memento;

/// Bounded history of change groups, one group per non-empty
/// [`Caretaker::update`].
#[derive(Debug, Default)]
pub struct UndoStack {
    undo: Vec<Vec<Change>>,
    redo: Vec<Vec<Change>>,
    max_depth: usize,
}

impl UndoStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_depth,
        }
    }

    /// Push a change group. Recording anything clears the redo history.
    pub fn record(&mut self, changes: &[Change]) {
        if changes.is_empty() || self.max_depth == 0 {
            return;
        }
        self.undo.push(changes.to_vec());
        self.redo.clear();
        if self.undo.len() > self.max_depth {
            let excess = self.undo.len() - self.max_depth;
            self.undo.drain(..excess);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Revert the newest group: modified objects go back to their previous
    /// memento, created ones are removed, removed ones are resurrected.
    /// Returns `false` when there is nothing to undo.
    ///
    /// A group is applied whole or not at all. On failure every object it
    /// touched is put back and the group stays on the undo side.
    pub fn undo(&mut self, registry: &mut Registry, caretaker: &mut Caretaker) -> CaretakerResult<bool> {
        let Some(group) = self.undo.pop() else {
            return Ok(false);
        };
        let steps = group.iter().rev().map(|c| (c.originator, c.previous.as_ref()));
        if let Err(e) = apply_group(registry, caretaker, &group, steps) {
            self.undo.push(group);
            return Err(e);
        }
        debug!(changes = group.len(), "undo");
        self.redo.push(group);
        Ok(true)
    }

    /// Reapply the newest undone group, with the same all-or-nothing rule
    /// as [`UndoStack::undo`].
    pub fn redo(&mut self, registry: &mut Registry, caretaker: &mut Caretaker) -> CaretakerResult<bool> {
        let Some(group) = self.redo.pop() else {
            return Ok(false);
        };
        let steps = group.iter().map(|c| (c.originator, c.current.as_ref()));
        if let Err(e) = apply_group(registry, caretaker, &group, steps) {
            self.redo.push(group);
            return Err(e);
        }
        debug!(changes = group.len(), "redo");
        self.undo.push(group);
        Ok(true)
    }
}

/// Bring each originator to its target state: restore the memento, or
/// remove the object when the target is `None`.
fn apply_group<'g>(
    registry: &mut Registry,
    caretaker: &mut Caretaker,
    group: &[Change],
    steps: impl Iterator<Item = (Id, Option<&'g Memento>)>,
) -> CaretakerResult<()> {
    let mut saved: IndexMap<Id, Option<Memento>> = IndexMap::new();
    for change in group {
        saved
            .entry(change.originator)
            .or_insert_with(|| caretaker.capture(registry, change.originator));
    }

    let mut result = Ok(());
    for (id, target) in steps {
        let step = match target {
            Some(memento) => caretaker.restore(registry, memento),
            None => {
                caretaker.remove(registry, id);
                Ok(())
            }
        };
        if let Err(e) = step {
            result = Err(e);
            break;
        }
    }

    if let Err(e) = &result {
        warn!(error = %e, changes = group.len(), "rolling back change group");
        for (id, before) in saved {
            caretaker.remove(registry, id);
            if let Some(before) = before {
                if let Err(e) = caretaker.restore(registry, &before) {
                    warn!(id = %id, error = %e, "could not roll back object");
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaretakerConfig;
    use proptest::prelude::*;
    use tiny_registry::{BuiltinType, Entity, TypeCode, Value};
    use tiny_types::{Id, ReferenceKind};

    struct Fixture {
        registry: Registry,
        caretaker: Caretaker,
        undo: UndoStack,
        entity: Id,
        health: Id,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = Registry::new();
            let (entity, health) = (Id::new(), Id::new());
            registry.create_entity(entity, "Player").unwrap();
            registry.create_type(health, "Health", TypeCode::Component).unwrap();
            registry
                .create_field(health, "hp", BuiltinType::Int32.id(), false)
                .unwrap();
            registry.add_component(entity, health).unwrap();
            let mut caretaker = Caretaker::with_config(CaretakerConfig {
                track_builtins: false,
                ..CaretakerConfig::default()
            });
            caretaker.baseline(&registry);
            Self {
                registry,
                caretaker,
                undo: UndoStack::new(256),
                entity,
                health,
            }
        }

        fn tick(&mut self) {
            let changes = self.caretaker.update(&self.registry);
            self.undo.record(&changes);
        }

        fn set_hp(&mut self, hp: i32) {
            self.registry
                .set_component_value(self.entity, self.health, &["hp"], hp)
                .unwrap();
            self.tick();
        }

        fn hp(&self) -> Value {
            self.registry
                .find_by_id::<Entity>(self.entity)
                .unwrap()
                .component(self.health)
                .unwrap()
                .get(&self.registry, "hp")
                .unwrap()
        }

        fn undo(&mut self) -> bool {
            self.undo.undo(&mut self.registry, &mut self.caretaker).unwrap()
        }

        fn redo(&mut self) -> bool {
            self.undo.redo(&mut self.registry, &mut self.caretaker).unwrap()
        }
    }

    #[test]
    fn undo_then_redo_value_edit() {
        let mut f = Fixture::new();
        f.set_hp(10);
        f.set_hp(20);
        assert!(f.undo());
        assert_eq!(f.hp(), Value::Int(10));
        assert!(f.undo());
        assert_eq!(f.hp(), Value::Int(0));
        assert!(!f.undo());
        assert!(f.redo());
        assert!(f.redo());
        assert_eq!(f.hp(), Value::Int(20));
        assert!(!f.redo());
    }

    #[test]
    fn undo_does_not_record_itself() {
        let mut f = Fixture::new();
        f.set_hp(10);
        f.undo();
        f.tick();
        assert_eq!(f.undo.undo_len(), 0);
        assert!(f.undo.can_redo());
    }

    #[test]
    fn undo_creation_and_removal() {
        let mut f = Fixture::new();
        let extra = Id::new();
        f.registry.create_entity(extra, "Extra").unwrap();
        f.tick();
        assert!(f.undo());
        assert!(!f.registry.contains(extra));
        assert!(f.redo());
        assert!(f.registry.contains(extra));

        f.registry.unregister(f.entity);
        f.tick();
        assert!(f.undo());
        assert_eq!(f.hp(), Value::Int(0));
        assert_eq!(f.registry.find_by_id::<Entity>(f.entity).unwrap().name(), "Player");
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut f = Fixture::new();
        f.set_hp(1);
        f.undo();
        f.set_hp(2);
        assert!(!f.undo.can_redo());
    }

    #[test]
    fn depth_is_bounded() {
        let mut f = Fixture::new();
        f.undo = UndoStack::new(2);
        for hp in 1..=5 {
            f.set_hp(hp);
        }
        assert_eq!(f.undo.undo_len(), 2);
        while f.undo() {}
        assert_eq!(f.hp(), Value::Int(3));
    }

    #[test]
    fn id_reused_by_another_kind_undoes_cleanly() {
        let mut f = Fixture::new();
        f.registry.unregister(f.entity);
        f.registry.create_type(f.entity, "Reused", TypeCode::Struct).unwrap();
        f.tick();

        assert!(f.undo());
        assert_eq!(f.registry.find_by_id::<Entity>(f.entity).unwrap().name(), "Player");
        assert_eq!(f.hp(), Value::Int(0));
        assert!(f.redo());
        assert_eq!(f.registry.kind_of(f.entity), Some(ReferenceKind::Type));
    }

    #[test]
    fn failed_undo_rolls_back_whole_group() {
        let mut f = Fixture::new();
        f.registry.rename(f.entity, "Hero").unwrap();
        f.registry.rename(f.health, "Vitality").unwrap();
        f.tick();

        // Swap the entity for a type behind the caretaker's back, so the
        // group's last step cannot be restored.
        f.registry.unregister(f.entity);
        f.registry.create_type(f.entity, "Impostor", TypeCode::Struct).unwrap();

        assert!(f.undo.undo(&mut f.registry, &mut f.caretaker).is_err());
        assert_eq!(f.registry.find_type(f.health).unwrap().name(), "Vitality");
        assert_eq!(f.registry.find_type(f.entity).unwrap().name(), "Impostor");
        assert_eq!(f.undo.undo_len(), 1);
        assert!(!f.undo.can_redo());
    }

    proptest! {
        #[test]
        fn undo_all_then_redo_all(values in proptest::collection::vec(-1000i32..1000, 1..12)) {
            let mut f = Fixture::new();
            for v in &values {
                f.set_hp(*v);
            }
            let last = *values.last().unwrap();
            while f.undo() {}
            prop_assert_eq!(f.hp(), Value::Int(0));
            while f.redo() {}
            prop_assert_eq!(f.hp(), Value::Int(i64::from(last)));
        }
    }
}
