//! End-to-end behavior of the object model through the [`Project`] facade.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use tiny_sdk::{
    BuiltinType, ChangeKind, Entity, Id, Object, Originator, Project, Registered, Registry, RegistryObject, SchemaProblem, TinyType,
    TypeCode, Value,
};

fn vec2(registry: &mut Registry) -> Id {
    let id = Id::generate("Vec2");
    registry.create_type(id, "Vec2", TypeCode::Struct).unwrap();
    registry.create_field(id, "x", BuiltinType::Float32.id(), false).unwrap();
    registry.create_field(id, "y", BuiltinType::Float32.id(), false).unwrap();
    id
}

/// A `Body` component embedding a `Vec2` and a mass.
fn body(registry: &mut Registry) -> (Id, Id) {
    let v = vec2(registry);
    let body = Id::generate("Body");
    registry.create_type(body, "Body", TypeCode::Component).unwrap();
    registry.create_field(body, "velocity", v, false).unwrap();
    registry.create_field(body, "mass", BuiltinType::Float32.id(), false).unwrap();
    (v, body)
}

#[test]
fn vec2_capture_and_restore() {
    let mut registry = Registry::new();
    let v = vec2(&mut registry);
    let ty = registry.find_type(v).unwrap().reference();

    let mut o = Object::new(ty);
    assert_eq!(o.get(&registry, "x").unwrap(), Value::Float(0.0));
    o.set(&registry, "x", 5.0f32).unwrap();
    assert_eq!(o.get(&registry, "x").unwrap(), Value::Float(5.0));
    assert_eq!(o.get(&registry, "y").unwrap(), Value::Float(0.0));

    let m = o.save(&registry);
    o.set(&registry, "y", 9.0f32).unwrap();
    o.restore(&m).unwrap();
    assert_eq!(o.get(&registry, "y").unwrap(), Value::Float(0.0));
    assert_eq!(o.get(&registry, "x").unwrap(), Value::Float(5.0));
}

#[test]
fn defaults_cascade_to_inheriting_instances_only() {
    let mut p = Project::new();
    let registry = p.registry_mut();
    let (_, body) = body(registry);
    let (a, b) = (Id::new(), Id::new());
    for e in [a, b] {
        registry.create_entity(e, "e").unwrap();
        registry.add_component(e, body).unwrap();
    }
    registry.set_component_value(b, body, &["velocity", "x"], 2.0f32).unwrap();

    registry.set_default_value(body, &["velocity", "x"], Value::Float(7.0)).unwrap();
    registry.set_default_value(body, &["mass"], Value::Float(1.0)).unwrap();

    let read = |e: Id, path: &[&str]| {
        let registry = p.registry();
        let entity = registry.find_by_id::<Entity>(e).unwrap();
        entity.component(body).unwrap().get_path(registry, path).unwrap()
    };
    assert_eq!(read(a, &["velocity", "x"]), Value::Float(7.0));
    assert_eq!(read(b, &["velocity", "x"]), Value::Float(2.0));
    assert_eq!(read(a, &["mass"]), Value::Float(1.0));
    assert_eq!(read(b, &["mass"]), Value::Float(1.0));
}

#[test]
fn instances_do_not_share_overrides() {
    let mut registry = Registry::new();
    let v = vec2(&mut registry);
    let ty = registry.find_type(v).unwrap().reference();
    let mut first = Object::new(ty.clone());
    let second = Object::new(ty);

    first.set(&registry, "x", 3.0f32).unwrap();
    assert_eq!(second.get(&registry, "x").unwrap(), Value::Float(0.0));
    assert!(!second.is_overridden(&registry, "x").unwrap());

    let mut copy = second.clone();
    copy.copy_from(&first).unwrap();
    first.set(&registry, "x", 4.0f32).unwrap();
    assert_eq!(copy.get(&registry, "x").unwrap(), Value::Float(3.0));
}

#[test]
fn unknown_field_is_rejected_without_side_effects() {
    let mut registry = Registry::new();
    let v = vec2(&mut registry);
    let mut o = Object::new(registry.find_type(v).unwrap().reference());
    let before = o.version();
    assert!(o.set(&registry, "z", 1.0f32).is_err());
    assert_eq!(o.version(), before);
    assert_eq!(o.overrides().count(), 0);
}

#[test]
fn changing_field_type_keeps_override_and_reports_it() {
    let mut registry = Registry::new();
    let v = vec2(&mut registry);
    let mut o = Object::new(registry.find_type(v).unwrap().reference());
    o.set(&registry, "x", 5.0f32).unwrap();

    let x = registry.find_type(v).unwrap().field_by_name("x").unwrap().id();
    registry.set_field_type(v, x, BuiltinType::String.id(), false).unwrap();

    // The override survives the type change.
    assert_eq!(o.get(&registry, "y").unwrap(), Value::Float(0.0));
    assert_eq!(o.override_value(x), Some(&Value::Float(5.0)));
    let issues = o.validate(&registry);
    assert_eq!(issues.len(), 1);
    assert!(matches!(issues[0].problem, SchemaProblem::InvalidOverride(_)));
}

#[test]
fn tick_reports_each_edit_once() {
    let mut p = Project::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    p.subscribe(move |change| sink.borrow_mut().push((change.originator, change.change_kind())));

    let (_, body) = body(p.registry_mut());
    let e = Id::new();
    p.registry_mut().create_entity(e, "player").unwrap();
    p.tick();
    seen.borrow_mut().clear();

    p.registry_mut().add_component(e, body).unwrap();
    p.tick();
    assert_eq!(*seen.borrow(), vec![(e, ChangeKind::Modified)]);
    assert!(p.tick().is_empty());
}

#[test]
fn undo_redo_round_trip_through_project() {
    let mut p = Project::new();
    let (_, body) = body(p.registry_mut());
    let e = Id::new();
    p.registry_mut().create_entity(e, "player").unwrap();
    p.registry_mut().add_component(e, body).unwrap();
    p.tick();

    p.registry_mut().set_component_value(e, body, &["mass"], 80.0f32).unwrap();
    p.tick();
    p.registry_mut().set_component_value(e, body, &["mass"], 90.0f32).unwrap();

    let mass = |p: &Project| {
        let registry = p.registry();
        let entity = registry.find_by_id::<Entity>(e).unwrap();
        entity.component(body).unwrap().get(registry, "mass").unwrap()
    };

    assert!(p.undo().unwrap());
    assert_eq!(mass(&p), Value::Float(80.0));
    assert!(p.undo().unwrap());
    assert_eq!(mass(&p), Value::Float(0.0));
    assert!(p.redo().unwrap());
    assert!(p.redo().unwrap());
    assert_eq!(mass(&p), Value::Float(90.0));
    assert!(!p.redo().unwrap());
    // Restores are not themselves recorded as edits.
    assert!(p.tick().is_empty());
}

#[test]
fn references_see_restored_state() {
    let mut p = Project::new();
    let e = Id::new();
    let handle = p.registry_mut().create_entity(e, "before").unwrap().reference();
    p.tick();

    p.registry_mut().rename(e, "after").unwrap();
    p.tick();
    assert_eq!(handle.dereference(p.registry()).unwrap().name(), "after");

    p.undo().unwrap();
    assert_eq!(handle.dereference(p.registry()).unwrap().name(), "before");
    assert_eq!(p.registry().find_by_name::<Entity>("before").map(Entity::id), Some(e));
}

#[test]
fn capture_with_missing_type_degrades_but_keeps_state() {
    let mut p = Project::new();
    let (v, body) = body(p.registry_mut());
    let e = Id::new();
    p.registry_mut().create_entity(e, "player").unwrap();
    p.registry_mut().add_component(e, body).unwrap();
    p.registry_mut().set_component_value(e, body, &["velocity", "x"], 1.0f32).unwrap();
    p.tick();

    p.registry_mut().unregister(v);
    p.registry_mut().set_component_value(e, body, &["mass"], 3.0f32).unwrap();
    let changes = p.tick();

    assert!(changes.iter().any(|c| c.originator == v && c.change_kind() == ChangeKind::Removed));
    let current = changes
        .iter()
        .find(|c| c.originator == e)
        .and_then(|c| c.current.clone())
        .unwrap();
    assert!(current.is_degraded());
    let Some(RegistryObject::Entity(captured)) = current.item() else {
        panic!("expected an entity capture");
    };
    assert_eq!(captured.component(body).unwrap().overrides().count(), 2);
    // Writing degrades the same way instead of failing.
    assert!(p.snapshot().unwrap().iter().any(|r| r.id == e));
}

#[test]
fn reusing_an_id_for_another_kind_is_undoable() {
    let mut p = Project::new();
    let id = Id::new();
    p.registry_mut().create_entity(id, "old").unwrap();
    p.tick();

    let bystander = Id::new();
    p.registry_mut().create_entity(bystander, "bystander").unwrap();
    p.registry_mut().unregister(id);
    p.registry_mut().create_type(id, "New", TypeCode::Struct).unwrap();

    assert!(p.undo().unwrap());
    assert_eq!(p.registry().find_by_id::<Entity>(id).unwrap().name(), "old");
    assert!(!p.registry().contains(bystander));
    assert!(p.redo().unwrap());
    assert_eq!(p.registry().find_by_id::<TinyType>(id).unwrap().name(), "New");
    assert!(p.registry().contains(bystander));
}

#[test]
fn unloading_a_scope_leaves_other_objects() {
    let mut p = Project::new();
    let (kept, level) = (Id::new(), Id::new());
    p.registry_mut().create_entity(kept, "kept").unwrap();
    let ty = p.load_scope("level", |r| {
        r.create_entity(level, "level").unwrap();
        let t = Id::new();
        r.create_type(t, "LevelOnly", TypeCode::Struct).unwrap();
        t
    });
    assert_eq!(p.registry().source_of(level), Some("level"));

    assert_eq!(p.unload("level"), 2);
    assert!(p.registry().contains(kept));
    assert!(!p.registry().contains(level));
    assert!(p.registry().find_by_id::<TinyType>(ty).is_none());
    assert!(!p.can_undo());
}

#[test]
fn snapshot_skips_builtins_and_default_fields() {
    let mut p = Project::new();
    let (_, body) = body(p.registry_mut());
    let e = Id::new();
    p.registry_mut().create_entity(e, "player").unwrap();
    p.registry_mut().add_component(e, body).unwrap();
    p.registry_mut().set_component_value(e, body, &["mass"], 2.0f32).unwrap();

    let records = p.snapshot().unwrap();
    assert!(records.iter().all(|r| !p.registry().is_builtin(r.id)));
    assert!(records.iter().any(|r| r.id == e));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.json");
    assert_eq!(p.save_snapshot(&path).unwrap(), records.len());
    assert_eq!(tiny_snapshot::load(&path).unwrap(), records);
}

#[derive(Clone, Debug)]
enum Edit {
    Mass(f32),
    VelocityX(f32),
    Rename,
    Toggle,
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (-100.0f32..100.0).prop_map(Edit::Mass),
        (-100.0f32..100.0).prop_map(Edit::VelocityX),
        Just(Edit::Rename),
        Just(Edit::Toggle),
    ]
}

proptest! {
    #[test]
    fn entity_version_never_goes_back(edits in prop::collection::vec(edit(), 1..24)) {
        let mut registry = Registry::new();
        let (_, body) = body(&mut registry);
        let e = Id::new();
        registry.create_entity(e, "e").unwrap();
        registry.add_component(e, body).unwrap();

        let version = |r: &Registry| r.find_by_id::<Entity>(e).unwrap().version();
        let mut last = version(&registry);
        for (i, edit) in edits.into_iter().enumerate() {
            match edit {
                Edit::Mass(m) => registry.set_component_value(e, body, &["mass"], m).unwrap(),
                Edit::VelocityX(x) => registry.set_component_value(e, body, &["velocity", "x"], x).unwrap(),
                Edit::Rename => registry.rename(e, format!("e{i}")).unwrap(),
                Edit::Toggle => {
                    let entity = registry.find_by_id_mut::<Entity>(e).unwrap();
                    let enabled = entity.enabled();
                    entity.set_enabled(!enabled);
                }
            }
            let now = version(&registry);
            prop_assert!(now > last);
            last = now;
        }
    }
}
