use serde::{Deserialize, Serialize};

/// Configuration for a [`Registry`](crate::Registry).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Install the builtin primitive and asset types on creation and on
    /// `clear`.
    pub install_builtins: bool,
    /// Maximum nesting depth followed when resolving cascaded defaults.
    pub max_resolve_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            install_builtins: true,
            max_resolve_depth: 32,
        }
    }
}
