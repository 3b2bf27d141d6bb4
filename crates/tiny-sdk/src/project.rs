use std::path::Path;

use tiny_caretaker::{Caretaker, Change, SubscriptionId, UndoStack};
use tiny_registry::Registry;
use tiny_snapshot::Record;
use tracing::info;

use crate::config::TinyConfig;
use crate::error::SdkResult;

/// A registry with change tracking and undo/redo wired together.
///
/// The host mutates [`Project::registry_mut`] freely and calls
/// [`Project::tick`] once per frame; each tick that saw changes becomes one
/// undo step.
pub struct Project {
    config: TinyConfig,
    registry: Registry,
    caretaker: Caretaker,
    undo: UndoStack,
}

impl Project {
    pub fn new() -> Self {
        Self::with_config(TinyConfig::default())
    }

    pub fn with_config(config: TinyConfig) -> Self {
        let registry = Registry::with_config(config.registry.clone());
        let mut caretaker = Caretaker::with_config(config.caretaker.clone());
        caretaker.baseline(&registry);
        let undo = UndoStack::new(config.caretaker.max_undo_depth);
        Self {
            config,
            registry,
            caretaker,
            undo,
        }
    }

    /// Open a project configured from a TOML file.
    pub fn open(config_path: &Path) -> SdkResult<Self> {
        Ok(Self::with_config(TinyConfig::load(config_path)?))
    }

    pub fn config(&self) -> &TinyConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn caretaker(&self) -> &Caretaker {
        &self.caretaker
    }

    pub fn subscribe(&mut self, f: impl FnMut(&Change) + 'static) -> SubscriptionId {
        self.caretaker.subscribe(f)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.caretaker.unsubscribe(id)
    }

    /// Detect changes since the last tick and record them as one undo step.
    pub fn tick(&mut self) -> Vec<Change> {
        let changes = self.caretaker.update(&self.registry);
        self.undo.record(&changes);
        changes
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Revert the last recorded step. Pending, unticked edits are recorded
    /// first so they are what gets undone.
    pub fn undo(&mut self) -> SdkResult<bool> {
        self.tick();
        Ok(self.undo.undo(&mut self.registry, &mut self.caretaker)?)
    }

    pub fn redo(&mut self) -> SdkResult<bool> {
        Ok(self.undo.redo(&mut self.registry, &mut self.caretaker)?)
    }

    /// Run `f` inside the source scope `tag`, then take the result as the
    /// new baseline. Loading is not an undoable edit.
    pub fn load_scope<R>(&mut self, tag: &str, f: impl FnOnce(&mut Registry) -> R) -> R {
        self.tick();
        let result = self.registry.with_source(tag, f);
        self.caretaker.baseline(&self.registry);
        info!(tag, objects = self.registry.ids_by_source(tag).len(), "loaded scope");
        result
    }

    /// Unregister everything loaded under `tag`. History is cleared, since
    /// it may refer to the unloaded objects.
    pub fn unload(&mut self, tag: &str) -> usize {
        let removed = self.registry.unregister_all_by_source(tag);
        self.caretaker.baseline(&self.registry);
        self.undo.clear();
        removed
    }

    /// Records for every non-builtin object, using the configured write
    /// options.
    pub fn snapshot(&self) -> SdkResult<Vec<Record>> {
        Ok(tiny_snapshot::write_registry(&self.registry, &self.config.snapshot)?)
    }

    /// Write [`Project::snapshot`] to `path` (`.json` or binary).
    pub fn save_snapshot(&self, path: &Path) -> SdkResult<usize> {
        let records = self.snapshot()?;
        tiny_snapshot::save(path, &records)?;
        Ok(records.len())
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("registry", &self.registry)
            .field("caretaker", &self.caretaker)
            .field("undo_steps", &self.undo.undo_len())
            .finish()
    }
}
