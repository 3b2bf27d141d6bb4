use std::path::Path;

use serde::{Deserialize, Serialize};
use tiny_caretaker::CaretakerConfig;
use tiny_registry::RegistryConfig;
use tiny_snapshot::WriteOptions;

use crate::error::{SdkError, SdkResult};

/// Configuration for a [`Project`](crate::Project), usually read from a
/// `tiny.toml`. Missing sections and keys take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TinyConfig {
    pub registry: RegistryConfig,
    pub caretaker: CaretakerConfig,
    pub snapshot: WriteOptions,
}

impl TinyConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }
}
