use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use tiny_registry::{BuiltinType, Entity, Id, Registry, RegistryObject, TypeCode, Value};
use tiny_sdk::{Change, ChangeKind, Project, TinyConfig};
use tiny_snapshot::WriteOptions;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    debug!(path = ?cli.config, "loaded configuration");
    match cli.command {
        Command::Schema(args) => cmd_schema(config, args, &cli.format),
        Command::Demo(args) => cmd_demo(config, args, &cli.format),
        Command::Config(_) => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TinyConfig> {
    match path {
        Some(path) => TinyConfig::load(path).with_context(|| format!("reading {}", path.display())),
        None => Ok(TinyConfig::default()),
    }
}

fn cmd_schema(config: TinyConfig, args: SchemaArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let project = Project::with_config(config);
    let registry = project.registry();
    let builtins = registry.iter().filter(|o| registry.is_builtin(o.id()));

    match format {
        OutputFormat::Json => {
            let options = if args.full {
                WriteOptions::full()
            } else {
                project.config().snapshot.clone()
            };
            let records = tiny_snapshot::write_records(registry, builtins, &options)?;
            println!("{}", tiny_snapshot::encode_json(&records)?);
        }
        OutputFormat::Text => {
            let mut count = 0;
            for object in builtins {
                if let RegistryObject::Type(ty) = object {
                    println!("  {:<14} {}", ty.name().bold(), ty.id().short_hex().dimmed());
                    count += 1;
                }
            }
            println!("{} builtin types", count.to_string().bold());
        }
    }
    Ok(())
}

struct DemoSchema {
    body: Id,
    player: Id,
}

fn demo_schema(registry: &mut Registry) -> anyhow::Result<DemoSchema> {
    let vec2 = Id::generate("Vec2");
    registry.create_type(vec2, "Vec2", TypeCode::Struct)?;
    registry.create_field(vec2, "x", BuiltinType::Float32.id(), false)?;
    registry.create_field(vec2, "y", BuiltinType::Float32.id(), false)?;

    let body = Id::generate("Body");
    registry.create_type(body, "Body", TypeCode::Component)?;
    registry.create_field(body, "velocity", vec2, false)?;
    registry.create_field(body, "mass", BuiltinType::Float32.id(), false)?;
    registry.set_default_value(body, &["mass"], Value::Float(1.0))?;

    let player = Id::generate("Player");
    registry.create_entity(player, "Player")?;
    registry.add_component(player, body)?;
    Ok(DemoSchema { body, player })
}

fn cmd_demo(config: TinyConfig, args: DemoArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let mut project = Project::with_config(config);
    let DemoSchema { body, player } = project.load_scope("demo", demo_schema)?;
    let text = matches!(format, OutputFormat::Text);

    let read = |project: &Project, path: &[&str]| -> anyhow::Result<Value> {
        let registry = project.registry();
        let entity = registry
            .find_by_id::<Entity>(player)
            .context("player entity is gone")?;
        let component = entity.component(body).context("player has no Body")?;
        Ok(component.get_path(registry, path)?)
    };
    let report = |step: &str, project: &Project, changes: &[Change]| -> anyhow::Result<()> {
        if text {
            println!(
                "{} {:<22} mass={:?} velocity.x={:?}",
                "•".cyan(),
                step,
                read(project, &["mass"])?,
                read(project, &["velocity", "x"])?,
            );
            for change in changes {
                println!("    {} {} {}", change_label(change), change.kind, change.originator.short_hex().dimmed());
            }
        }
        Ok(())
    };

    report("loaded", &project, &[])?;

    project.registry_mut().set_component_value(player, body, &["mass"], 80.0f32)?;
    let changes = project.tick();
    report("set mass", &project, &changes)?;

    project
        .registry_mut()
        .set_component_value(player, body, &["velocity", "x"], 3.0f32)?;
    let changes = project.tick();
    report("set velocity.x", &project, &changes)?;

    project.registry_mut().set_default_value(body, &["velocity", "y"], Value::Float(-9.8))?;
    let changes = project.tick();
    report("default velocity.y", &project, &changes)?;

    let mut steps = 0;
    while project.undo()? {
        steps += 1;
    }
    report(&format!("undo x{steps}"), &project, &[])?;

    project.redo()?;
    report("redo", &project, &[])?;

    let records = project.snapshot()?;
    if !text {
        println!("{}", tiny_snapshot::encode_json(&records)?);
    }
    if let Some(out) = &args.out {
        let count = project.save_snapshot(out)?;
        if text {
            println!("{} wrote {} records to {}", "✓".green().bold(), count, out.display());
        }
    }
    Ok(())
}

fn change_label(change: &Change) -> colored::ColoredString {
    match change.change_kind() {
        ChangeKind::Created => "created".green(),
        ChangeKind::Modified => "modified".yellow(),
        ChangeKind::Removed => "removed".red(),
    }
}

fn cmd_config(config: &TinyConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_schema_builds() {
        let mut registry = Registry::new();
        let schema = demo_schema(&mut registry).unwrap();
        let entity = registry.find_by_id::<Entity>(schema.player).unwrap();
        let mass = entity.component(schema.body).unwrap().get(&registry, "mass").unwrap();
        assert_eq!(mass, Value::Float(1.0));
    }

    #[test]
    fn demo_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("demo.json");
        let args = DemoArgs { out: Some(out.clone()) };
        cmd_demo(TinyConfig::default(), args, &OutputFormat::Text).unwrap();
        let records = tiny_snapshot::load(&out).unwrap();
        assert!(records.iter().any(|r| r.name == "Player"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("absent.toml").as_path())).is_err());
        assert_eq!(load_config(None).unwrap(), TinyConfig::default());
    }
}
