/*
[INPUT]:  Concrete auth, rest, storage and realtime clients
[OUTPUT]: Object-safe traits the application depends on, plus an in-memory backend
[POS]:    Backend seam - lets the app run against the hosted service or a fake
[UPDATE]: When the app needs a new backend capability
*/

use async_trait::async_trait;

use crate::auth::{AuthClient, AuthSubscription, Session};
use crate::http::Result;
use crate::realtime::{LiveSubscription, RealtimeClient};
use crate::rest::TaskTable;
use crate::storage::StorageClient;
use crate::types::{NewTask, Task, TaskId, TaskPatch};

pub mod memory;

pub use memory::MemoryBackend;

/// Session source for the gate and the authentication form
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>>;

    fn on_auth_state_change(&self) -> AuthSubscription;

    /// `None` means the account awaits confirmation
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Option<Session>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;
}

/// Row operations on the task table
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All rows ordered by id descending
    async fn list(&self) -> Result<Vec<Task>>;

    async fn insert(&self, task: &NewTask) -> Result<Task>;

    /// `None` when the row does not exist
    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>>;

    async fn delete(&self, id: TaskId) -> Result<()>;
}

/// Object upload plus public URL resolution
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    fn public_url(&self, bucket: &str, key: &str) -> Result<String>;
}

/// Live row-change notifications
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, table: &str) -> Result<LiveSubscription>;
}

#[async_trait]
impl AuthProvider for AuthClient {
    async fn get_session(&self) -> Result<Option<Session>> {
        AuthClient::get_session(self).await
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        AuthClient::on_auth_state_change(self)
    }

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Option<Session>> {
        AuthClient::sign_up(self, email, password, name).await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        AuthClient::sign_in_with_password(self, email, password).await
    }

    async fn sign_out(&self) -> Result<()> {
        AuthClient::sign_out(self).await
    }
}

#[async_trait]
impl TaskStore for TaskTable {
    async fn list(&self) -> Result<Vec<Task>> {
        TaskTable::list(self).await
    }

    async fn insert(&self, task: &NewTask) -> Result<Task> {
        TaskTable::insert(self, task).await
    }

    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>> {
        TaskTable::update(self, id, patch).await
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        TaskTable::delete(self, id).await
    }
}

#[async_trait]
impl ObjectStorage for StorageClient {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        StorageClient::upload(self, bucket, key, bytes, content_type)
            .await
            .map(|_| ())
    }

    fn public_url(&self, bucket: &str, key: &str) -> Result<String> {
        StorageClient::public_url(self, bucket, key).map(String::from)
    }
}

#[async_trait]
impl ChangeFeed for RealtimeClient {
    async fn subscribe(&self, table: &str) -> Result<LiveSubscription> {
        RealtimeClient::subscribe(self, table).await
    }
}
