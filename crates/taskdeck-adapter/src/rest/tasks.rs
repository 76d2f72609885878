/*
[INPUT]:  Backend HTTP client, table name, task payloads
[OUTPUT]: Validated Task rows from list/insert/update/delete
[POS]:    Rest layer - task table endpoints (bearer auth)
[UPDATE]: When adding task queries or changing filters
*/

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::http::{BackendClient, BackendError, Result};
use crate::types::{NewTask, Task, TaskId, TaskPatch, tasks_from_rows};

const RETURN_REPRESENTATION: &str = "return=representation";

/// Client for one task table
#[derive(Debug, Clone)]
pub struct TaskTable {
    client: BackendClient,
    table: String,
}

impl TaskTable {
    pub fn new(client: BackendClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// All rows, newest first. Rows with the wrong shape are quarantined.
    ///
    /// GET /rest/v1/{table}?select=*&order=id.desc
    pub async fn list(&self) -> Result<Vec<Task>> {
        let endpoint = format!("{}?select=*&order=id.desc", self.endpoint());
        let builder = self.client.authed_request(Method::GET, &endpoint).await?;
        let rows: Vec<Value> = self.client.send_json(builder).await?;
        let total = rows.len();
        let tasks = tasks_from_rows(rows);
        debug!(table = %self.table, total, valid = tasks.len(), "tasks listed");
        Ok(tasks)
    }

    /// POST /rest/v1/{table}
    pub async fn insert(&self, task: &NewTask) -> Result<Task> {
        let builder = self
            .client
            .authed_request(Method::POST, &self.endpoint())
            .await?
            .header("Prefer", RETURN_REPRESENTATION)
            .json(task);
        let rows: Vec<Value> = self.client.send_json(builder).await?;
        first_row(rows)?.ok_or_else(|| BackendError::InvalidResponse("insert returned no row".to_string()))
    }

    /// Overwrite the editable fields of one row.
    ///
    /// PATCH /rest/v1/{table}?id=eq.{id}
    ///
    /// Returns `None` when no row with `id` exists (or it is not visible to
    /// the current user).
    pub async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>> {
        let endpoint = format!("{}?id=eq.{id}", self.endpoint());
        let builder = self
            .client
            .authed_request(Method::PATCH, &endpoint)
            .await?
            .header("Prefer", RETURN_REPRESENTATION)
            .json(patch);
        let rows: Vec<Value> = self.client.send_json(builder).await?;
        first_row(rows)
    }

    /// DELETE /rest/v1/{table}?id=eq.{id}
    pub async fn delete(&self, id: TaskId) -> Result<()> {
        let endpoint = format!("{}?id=eq.{id}", self.endpoint());
        let builder = self.client.authed_request(Method::DELETE, &endpoint).await?;
        self.client.send_empty(builder).await
    }

    fn endpoint(&self) -> String {
        format!("rest/v1/{}", self.table)
    }
}

fn first_row(rows: Vec<Value>) -> Result<Option<Task>> {
    rows.into_iter().next().map(Task::from_row).transpose()
}
