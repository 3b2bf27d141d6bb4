//! Back ends over [`Record`]: pretty JSON for humans, bincode for size.

use std::path::Path;

use crate::error::{SnapshotError, SnapshotResult};
use crate::record::Record;

pub fn encode_json(records: &[Record]) -> SnapshotResult<String> {
    serde_json::to_string_pretty(records).map_err(|e| SnapshotError::Serialization(e.to_string()))
}

pub fn decode_json(json: &str) -> SnapshotResult<Vec<Record>> {
    serde_json::from_str(json).map_err(|e| SnapshotError::Serialization(e.to_string()))
}

pub fn encode_binary(records: &[Record]) -> SnapshotResult<Vec<u8>> {
    bincode::serialize(records).map_err(|e| SnapshotError::Serialization(e.to_string()))
}

pub fn decode_binary(bytes: &[u8]) -> SnapshotResult<Vec<Record>> {
    bincode::deserialize(bytes).map_err(|e| SnapshotError::Serialization(e.to_string()))
}

/// Write records to `path`, choosing the back end from the extension:
/// `.json` gets JSON, anything else bincode.
pub fn save(path: &Path, records: &[Record]) -> SnapshotResult<()> {
    let bytes = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => encode_json(records)?.into_bytes(),
        _ => encode_binary(records)?,
    };
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn load(path: &Path) -> SnapshotResult<Vec<Record>> {
    let bytes = std::fs::read(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let text = String::from_utf8(bytes).map_err(|e| SnapshotError::Serialization(e.to_string()))?;
            decode_json(&text)
        }
        _ => decode_binary(&bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Property, PropertyValue};
    use tiny_types::{Id, ReferenceKind};

    fn sample() -> Vec<Record> {
        vec![Record {
            kind: ReferenceKind::Entity,
            id: Id::generate("player"),
            name: "Player".into(),
            version: Some(3),
            properties: vec![
                Property::new("enabled", PropertyValue::Bool(true)),
                Property::new(
                    "entity_group",
                    PropertyValue::Reference {
                        kind: ReferenceKind::EntityGroup,
                        id: Id::generate("level"),
                        name: "Level".into(),
                    },
                ),
                Property::new(
                    "components",
                    PropertyValue::List(vec![PropertyValue::Object {
                        type_id: Id::generate("Health"),
                        type_name: "Health".into(),
                        properties: vec![Property::new("hp", PropertyValue::Int(10))],
                    }]),
                ),
            ],
        }]
    }

    #[test]
    fn both_back_ends_preserve_records() {
        let records = sample();
        assert_eq!(decode_json(&encode_json(&records).unwrap()).unwrap(), records);
        assert_eq!(decode_binary(&encode_binary(&records).unwrap()).unwrap(), records);
    }

    #[test]
    fn binary_is_smaller_than_json() {
        let records = sample();
        assert!(encode_binary(&records).unwrap().len() < encode_json(&records).unwrap().len());
    }

    #[test]
    fn save_and_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let records = sample();
        for name in ["dump.json", "dump.bin"] {
            let path = dir.path().join(name);
            save(&path, &records).unwrap();
            assert_eq!(load(&path).unwrap(), records);
        }
        let json = std::fs::read_to_string(dir.path().join("dump.json")).unwrap();
        assert!(json.contains("\"Player\""));
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        assert!(matches!(
            decode_binary(&[0xff, 0x01]),
            Err(SnapshotError::Serialization(_))
        ));
        assert!(matches!(decode_json("{"), Err(SnapshotError::Serialization(_))));
    }
}
