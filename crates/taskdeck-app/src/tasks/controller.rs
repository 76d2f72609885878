/*
[INPUT]:  Backend handles, signed-in user email, form input, live change events
[OUTPUT]: Cached task list kept in sync with the remote table
[POS]:    Application layer - task list controller
[UPDATE]: When task operations or cache policy change
*/

use std::path::PathBuf;

use chrono::Utc;
use taskdeck_adapter::{BackendError, ChangeEvent, LiveSubscription, NewTask, Task, TaskId, TaskPatch};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::attachment::Attachment;
use super::cache::{Reconciled, reconcile};
use super::form::TaskForm;
use crate::backends::Backends;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("title and description are required")]
    Validation,
    #[error("no task is being edited")]
    NotEditing,
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error(transparent)]
    Remote(#[from] BackendError),
}

/// Table and bucket the controller works against
#[derive(Debug, Clone)]
pub struct TaskSettings {
    pub table: String,
    pub bucket: String,
}

/// Read-only view of the controller for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct TaskListSnapshot {
    /// Newest first, without the row being edited
    pub tasks: Vec<Task>,
    pub editing: Option<TaskId>,
    pub form: TaskForm,
    pub live: bool,
}

#[derive(Debug, Clone)]
struct EditCursor {
    id: TaskId,
    image_url: Option<String>,
}

/// Owns the cached task list and every operation that changes it.
///
/// The cache holds all known rows; the row under the editing cursor is only
/// hidden from the visible list.
pub struct TaskListController {
    backends: Backends,
    settings: TaskSettings,
    user_email: String,
    cache: Vec<Task>,
    cursor: Option<EditCursor>,
    form: TaskForm,
    live: Option<LiveSubscription>,
}

impl TaskListController {
    pub fn new(backends: Backends, settings: TaskSettings, user_email: impl Into<String>) -> Self {
        Self {
            backends,
            settings,
            user_email: user_email.into(),
            cache: Vec::new(),
            cursor: None,
            form: TaskForm::default(),
            live: None,
        }
    }

    /// List, then open the live channel. Failures are logged and not retried.
    pub async fn mount(&mut self) {
        let _ = self.load().await;
        if self.backends.feed.is_some() {
            let _ = self.subscribe().await;
        }
    }

    /// Replace the cache with the remote rows; on error the cache is kept
    pub async fn load(&mut self) -> Result<usize, TaskError> {
        match self.backends.store.list().await {
            Ok(tasks) => {
                self.cache = tasks;
                info!(count = self.cache.len(), "tasks loaded");
                Ok(self.cache.len())
            }
            Err(err) => {
                error!(error = %err, "failed to load tasks");
                Err(err.into())
            }
        }
    }

    /// Open the live channel, replacing any open one
    pub async fn subscribe(&mut self) -> Result<(), TaskError> {
        let Some(feed) = self.backends.feed.clone() else {
            return Ok(());
        };
        match feed.subscribe(&self.settings.table).await {
            Ok(subscription) => {
                if let Some(previous) = self.live.replace(subscription)
                    && let Err(err) = previous.close().await
                {
                    warn!(error = %err, "failed to close previous live channel");
                }
                info!(table = %self.settings.table, "live channel open");
                Ok(())
            }
            Err(err) => {
                error!(table = %self.settings.table, error = %err, "failed to open live channel");
                Err(err.into())
            }
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Next live event; `None` when no channel is open or it just closed
    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        let live = self.live.as_mut()?;
        let event = live.recv().await;
        if event.is_none() {
            warn!(table = %self.settings.table, "live channel closed");
            self.live = None;
        }
        event
    }

    pub fn apply_change(&mut self, event: &ChangeEvent) -> Reconciled {
        let outcome = reconcile(&mut self.cache, event);
        debug!(kind = ?event.kind(), id = event.id(), outcome = ?outcome, "change applied");
        outcome
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.form.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.form.description = description.into();
    }

    pub fn set_attachment(&mut self, path: Option<PathBuf>) {
        self.form.attachment = path;
    }

    pub fn form(&self) -> &TaskForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut TaskForm {
        &mut self.form
    }

    pub fn editing(&self) -> Option<TaskId> {
        self.cursor.as_ref().map(|cursor| cursor.id)
    }

    pub fn visible_tasks(&self) -> impl Iterator<Item = &Task> {
        let hidden = self.editing();
        self.cache.iter().filter(move |task| Some(task.id) != hidden)
    }

    pub fn snapshot(&self) -> TaskListSnapshot {
        TaskListSnapshot {
            tasks: self.visible_tasks().cloned().collect(),
            editing: self.editing(),
            form: self.form.clone(),
            live: self.is_live(),
        }
    }

    /// Upload a file and resolve its public URL; failures yield `None`
    pub async fn upload_attachment(&self, path: &std::path::Path) -> Option<String> {
        let attachment = match Attachment::from_path(path).await {
            Ok(attachment) => attachment,
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to read attachment");
                return None;
            }
        };

        let key = attachment.object_key(Utc::now());
        let bucket = &self.settings.bucket;
        let size = attachment.bytes.len();
        if let Err(err) = self
            .backends
            .storage
            .upload(bucket, &key, attachment.bytes, &attachment.content_type)
            .await
        {
            error!(bucket = %bucket, key = %key, error = %err, "attachment upload failed");
            return None;
        }

        match self.backends.storage.public_url(bucket, &key) {
            Ok(url) => {
                info!(bucket = %bucket, key = %key, size, "attachment uploaded");
                Some(url)
            }
            Err(err) => {
                error!(bucket = %bucket, key = %key, error = %err, "failed to resolve attachment URL");
                None
            }
        }
    }

    /// Update when a row is being edited, insert otherwise
    pub async fn submit(&mut self) -> Result<Task, TaskError> {
        if self.cursor.is_some() {
            self.update().await
        } else {
            self.insert().await
        }
    }

    /// Write the form as a new row owned by the signed-in user.
    ///
    /// With a live channel open the row shows up through the channel;
    /// without one it is prepended from the insert response.
    pub async fn insert(&mut self) -> Result<Task, TaskError> {
        if !self.form.is_valid() {
            return Err(TaskError::Validation);
        }

        let image_url = match self.form.attachment.clone() {
            Some(path) => self.upload_attachment(&path).await,
            None => None,
        };
        let new_task = NewTask {
            title: self.form.title.clone(),
            description: self.form.description.clone(),
            image_url,
            email: self.user_email.clone(),
        };

        let task = match self.backends.store.insert(&new_task).await {
            Ok(task) => task,
            Err(err) => {
                error!(error = %err, "failed to insert task");
                return Err(err.into());
            }
        };

        info!(id = task.id, "task inserted");
        if !self.is_live() {
            reconcile(&mut self.cache, &ChangeEvent::Insert(task.clone()));
        }
        self.form.clear();
        Ok(task)
    }

    /// Overwrite the row under the editing cursor with the form.
    ///
    /// Without a new attachment (or when its upload fails) the row keeps the
    /// image it had when editing started.
    pub async fn update(&mut self) -> Result<Task, TaskError> {
        let cursor = self.cursor.clone().ok_or(TaskError::NotEditing)?;
        if !self.form.is_valid() {
            return Err(TaskError::Validation);
        }

        let uploaded = match self.form.attachment.clone() {
            Some(path) => self.upload_attachment(&path).await,
            None => None,
        };
        let patch = TaskPatch {
            title: self.form.title.clone(),
            description: self.form.description.clone(),
            image_url: uploaded.or(cursor.image_url),
        };

        let task = match self.backends.store.update(cursor.id, &patch).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                error!(id = cursor.id, "task to update no longer exists");
                return Err(TaskError::NotFound(cursor.id));
            }
            Err(err) => {
                error!(id = cursor.id, error = %err, "failed to update task");
                return Err(err.into());
            }
        };

        info!(id = task.id, "task updated");
        reconcile(&mut self.cache, &ChangeEvent::Update(task.clone()));
        self.cursor = None;
        self.form.clear();
        Ok(task)
    }

    /// Start editing `id`: copy it into the form and hide it from the list
    pub fn edit(&mut self, id: TaskId) -> Result<(), TaskError> {
        let task = self
            .cache
            .iter()
            .find(|task| task.id == id)
            .ok_or(TaskError::NotFound(id))?;

        self.form = TaskForm {
            title: task.title.clone(),
            description: task.description.clone(),
            attachment: None,
        };
        self.cursor = Some(EditCursor {
            id,
            image_url: task.image_url.clone(),
        });
        Ok(())
    }

    /// Drop the cursor and the form; the row is listed again
    pub fn cancel_edit(&mut self) {
        self.cursor = None;
        self.form.clear();
    }

    pub async fn delete(&mut self, id: TaskId) -> Result<(), TaskError> {
        if !self.cache.iter().any(|task| task.id == id) {
            return Err(TaskError::NotFound(id));
        }

        if let Err(err) = self.backends.store.delete(id).await {
            error!(id, error = %err, "failed to delete task");
            return Err(err.into());
        }

        info!(id, "task deleted");
        reconcile(&mut self.cache, &ChangeEvent::Delete { id });
        if self.editing() == Some(id) {
            self.cancel_edit();
        }
        Ok(())
    }

    /// Ask the provider to end the session; the session gate switches views
    pub async fn sign_out(&self) -> Result<(), TaskError> {
        if let Err(err) = self.backends.auth.sign_out().await {
            error!(error = %err, "sign out failed");
            return Err(err.into());
        }
        Ok(())
    }

    /// Close the live channel; requests already sent are left alone
    pub async fn teardown(&mut self) {
        if let Some(live) = self.live.take()
            && let Err(err) = live.close().await
        {
            warn!(error = %err, "failed to close live channel");
        }
    }
}
