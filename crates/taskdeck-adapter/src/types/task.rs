/*
[INPUT]:  Raw JSON rows from the task table
[OUTPUT]: Strictly validated Task records plus insert/update payloads
[POS]:    Types layer - row model shared by rest, realtime and the app
[UPDATE]: When task table columns change
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::http::{BackendError, Result};

/// Store-assigned task identity
pub type TaskId = i64;

/// One row of the task table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskRow")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub email: String,
}

#[derive(Deserialize)]
struct TaskRow {
    id: i64,
    title: String,
    description: String,
    #[serde(default)]
    image_url: Option<String>,
    email: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = String;

    fn try_from(row: TaskRow) -> std::result::Result<Self, Self::Error> {
        if row.id <= 0 {
            return Err(format!("id must be positive, got {}", row.id));
        }
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            image_url: row.image_url,
            email: row.email,
        })
    }
}

impl Task {
    /// Validate a single raw row. Unknown columns are ignored.
    pub fn from_row(row: Value) -> Result<Self> {
        serde_json::from_value(row).map_err(|err| BackendError::InvalidRow(err.to_string()))
    }
}

/// Validate a batch of rows, quarantining the ones with the wrong shape.
pub fn tasks_from_rows(rows: Vec<Value>) -> Vec<Task> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned();
            match Task::from_row(row) {
                Ok(task) => Some(task),
                Err(err) => {
                    warn!(row_id = ?id, error = %err, "task row quarantined");
                    None
                }
            }
        })
        .collect()
}

/// Payload for a new row; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub email: String,
}

/// Full-field update; `email` is written once at insert and never patched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_row_ignores_unknown_columns() {
        let task = Task::from_row(json!({
            "id": 7,
            "created_at": "2024-05-01T10:00:00Z",
            "title": "buy milk",
            "description": "2 litres",
            "image_url": null,
            "email": "a@example.com"
        }))
        .unwrap();

        assert_eq!(task.id, 7);
        assert_eq!(task.image_url, None);
        assert_eq!(task.email, "a@example.com");
    }

    #[test]
    fn test_from_row_rejects_bad_shapes() {
        let cases = [
            json!({"id": 0, "title": "t", "description": "d", "email": "e"}),
            json!({"id": -3, "title": "t", "description": "d", "email": "e"}),
            json!({"id": "9", "title": "t", "description": "d", "email": "e"}),
            json!({"id": 1.5, "title": "t", "description": "d", "email": "e"}),
            json!({"id": 1, "title": 4, "description": "d", "email": "e"}),
            json!({"id": 1, "title": "t", "description": "d", "image_url": 3, "email": "e"}),
            json!({"id": 1, "title": "t", "description": "d"}),
        ];

        for row in cases {
            let err = Task::from_row(row.clone()).unwrap_err();
            assert!(matches!(err, BackendError::InvalidRow(_)), "{row} -> {err}");
        }
    }

    #[test]
    fn test_tasks_from_rows_quarantines_invalid() {
        let rows = vec![
            json!({"id": 3, "title": "a", "description": "b", "email": "e"}),
            json!({"id": null, "title": "a", "description": "b", "email": "e"}),
            json!({"id": 1, "title": "c", "description": "d", "image_url": "http://x/y.png", "email": "e"}),
        ];

        let tasks = tasks_from_rows(rows);
        let ids: Vec<TaskId> = tasks.iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(tasks[1].image_url.as_deref(), Some("http://x/y.png"));
    }

    #[test]
    fn test_patch_serializes_null_image() {
        let patch = TaskPatch {
            title: "t".to_string(),
            description: "d".to_string(),
            image_url: None,
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"title": "t", "description": "d", "image_url": null})
        );
    }
}
