use serde::{Deserialize, Serialize};

/// How records are produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Leave out object fields that inherit their value. Readers fill them
    /// back in from the declared defaults.
    pub omit_defaults: bool,
    /// Stamp each record with the object's current version.
    pub include_versions: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            omit_defaults: true,
            include_versions: false,
        }
    }
}

impl WriteOptions {
    /// Every declared field, resolved.
    pub fn full() -> Self {
        Self {
            omit_defaults: false,
            ..Self::default()
        }
    }
}
