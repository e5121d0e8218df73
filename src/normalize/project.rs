//! Galaxy project entities.

use serde_json::Value;
use tracing::warn;

use super::field::FieldShape;
use crate::models::{EntityKind, ProjectRecord, NOT_AVAILABLE};

/// An entity lacked a required field and was dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} #{index} is missing required field '{field}'")]
pub struct ValidationError {
    pub kind: &'static str,
    pub index: usize,
    pub field: &'static str,
}

/// Validate and flatten one entity
pub fn entity(
    kind: EntityKind,
    index: usize,
    item: &Value,
) -> Result<ProjectRecord, ValidationError> {
    let required = |field: &'static str| {
        FieldShape::from_json(item.get(field))
            .into_text()
            .ok_or(ValidationError {
                kind: kind.name(),
                index,
                field,
            })
    };
    let detail = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| FieldShape::from_json(item.get(*key)).into_text())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    let mut record = ProjectRecord::new(required("id")?, kind, required("name")?);
    record.description = detail(&["description", "annotation", "synopsis"]);
    record.owner = detail(&["owner", "username"]);
    record.version = detail(&["version"]);
    record.updated = detail(&["update_time"]);
    Ok(record)
}

/// Flatten every valid entity of a listing page; invalid ones are logged and dropped
pub fn entities(kind: EntityKind, page: &Value) -> Vec<ProjectRecord> {
    let Some(items) = page.as_array() else {
        warn!("{} page is not an array", kind.name());
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match entity(kind, index, item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("dropping record: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_details() {
        let item = json!({
            "id": "f2db41e1fa331b3e",
            "name": "RNA-seq pipeline",
            "owner": "alice",
            "version": 3,
            "annotation": "paired-end",
            "update_time": "2024-05-01T10:00:00"
        });
        let record = entity(EntityKind::Workflow, 0, &item).unwrap();
        assert_eq!(record.kind, "workflow");
        assert_eq!(record.version, "3");
        assert_eq!(record.description, "paired-end");
        assert_eq!(record.updated, "2024-05-01T10:00:00");
    }

    #[test]
    fn test_missing_name_dropped() {
        let page = json!([
            {"id": "a", "name": "kept"},
            {"id": "b"},
            {"id": "c", "name": "  "},
            {"name": "no id"}
        ]);
        let records = entities(EntityKind::Library, &page);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "kept");
        assert_eq!(records[0].owner, NOT_AVAILABLE);
    }

    #[test]
    fn test_validation_error_names_field() {
        let err = entity(EntityKind::Tool, 4, &json!({"id": "x"})).unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.to_string(), "tool #4 is missing required field 'name'");
    }
}
