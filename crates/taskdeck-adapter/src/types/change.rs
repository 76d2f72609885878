/*
[INPUT]:  Row-level change notifications (type, new record, old record)
[OUTPUT]: ChangeEvent tagged enum consumed by cache reconciliation
[POS]:    Types layer - live feed event model
[UPDATE]: When the change feed delivers new event kinds
*/

use serde::Deserialize;
use serde_json::Value;

use super::task::{Task, TaskId};
use crate::http::{BackendError, Result};

/// A single row-level change on the task table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert(Task),
    Update(Task),
    Delete { id: TaskId },
}

/// Kind of change as reported by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeEvent {
    /// Build an event from the feed's `{type, record, old_record}` triple.
    ///
    /// Deletes only need the old row's id; the rest of the old row may be
    /// absent depending on the table's replica identity.
    pub fn from_parts(kind: ChangeKind, record: Option<Value>, old_record: Option<Value>) -> Result<Self> {
        match kind {
            ChangeKind::Insert => Ok(ChangeEvent::Insert(Task::from_row(required(record, "record")?)?)),
            ChangeKind::Update => Ok(ChangeEvent::Update(Task::from_row(required(record, "record")?)?)),
            ChangeKind::Delete => {
                let old = required(old_record, "old_record")?;
                let id = old
                    .get("id")
                    .and_then(Value::as_i64)
                    .filter(|id| *id > 0)
                    .ok_or_else(|| BackendError::InvalidRow(format!("delete without a valid id: {old}")))?;
                Ok(ChangeEvent::Delete { id })
            }
        }
    }

    /// Id of the row the event refers to
    pub fn id(&self) -> TaskId {
        match self {
            ChangeEvent::Insert(task) | ChangeEvent::Update(task) => task.id,
            ChangeEvent::Delete { id } => *id,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Insert(_) => ChangeKind::Insert,
            ChangeEvent::Update(_) => ChangeKind::Update,
            ChangeEvent::Delete { .. } => ChangeKind::Delete,
        }
    }
}

fn required(value: Option<Value>, field: &str) -> Result<Value> {
    match value {
        Some(Value::Null) | None => Err(BackendError::InvalidRow(format!("missing {field}"))),
        Some(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_update_decode_record() {
        let record = json!({"id": 6, "title": "a", "description": "b", "email": "e"});
        let insert = ChangeEvent::from_parts(ChangeKind::Insert, Some(record.clone()), None).unwrap();
        assert_eq!(insert.id(), 6);
        assert_eq!(insert.kind(), ChangeKind::Insert);

        let update = ChangeEvent::from_parts(ChangeKind::Update, Some(record), Some(json!({"id": 6}))).unwrap();
        assert!(matches!(update, ChangeEvent::Update(ref task) if task.title == "a"));
    }

    #[test]
    fn test_delete_needs_only_old_id() {
        let event = ChangeEvent::from_parts(ChangeKind::Delete, Some(json!({})), Some(json!({"id": 5}))).unwrap();
        assert_eq!(event, ChangeEvent::Delete { id: 5 });
    }

    #[test]
    fn test_invalid_payloads_rejected() {
        assert!(ChangeEvent::from_parts(ChangeKind::Insert, None, None).is_err());
        assert!(ChangeEvent::from_parts(ChangeKind::Update, Some(json!({"id": "x"})), None).is_err());
        assert!(ChangeEvent::from_parts(ChangeKind::Delete, None, Some(json!({"title": "t"}))).is_err());
    }

    #[test]
    fn test_change_kind_from_wire() {
        let kind: ChangeKind = serde_json::from_value(json!("DELETE")).unwrap();
        assert_eq!(kind, ChangeKind::Delete);
    }
}
