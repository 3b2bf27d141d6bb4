use serde::{Deserialize, Serialize};

/// Configuration for a [`Caretaker`](crate::Caretaker) and its
/// [`UndoStack`](crate::UndoStack).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaretakerConfig {
    /// Capture builtin types along with user objects.
    pub track_builtins: bool,
    /// Number of change groups kept on the undo stack.
    pub max_undo_depth: usize,
}

impl Default for CaretakerConfig {
    fn default() -> Self {
        Self {
            track_builtins: true,
            max_undo_depth: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = CaretakerConfig::default();
        assert!(c.track_builtins);
        assert_eq!(c.max_undo_depth, 256);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let c: CaretakerConfig = serde_json::from_str(r#"{"track_builtins": false}"#).unwrap();
        assert!(!c.track_builtins);
        assert_eq!(c.max_undo_depth, 256);
    }
}
