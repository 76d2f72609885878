/*
[INPUT]:  Calls through the backend traits
[OUTPUT]: In-process auth, task rows, objects and change events
[POS]:    Backend seam - fake backend for tests and offline runs
[UPDATE]: When a backend trait gains methods
*/

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use super::{AuthProvider, ChangeFeed, ObjectStorage, TaskStore};
use crate::auth::{AuthEvent, AuthStateChange, AuthSubscription, Session, User};
use crate::http::{BackendError, Result};
use crate::realtime::LiveSubscription;
use crate::types::{ChangeEvent, NewTask, Task, TaskId, TaskPatch};

const FEED_CAPACITY: usize = 64;

/// Operations that can be counted or made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetSession,
    SignUp,
    SignIn,
    SignOut,
    List,
    Insert,
    Update,
    Delete,
    Upload,
    Subscribe,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, (String, User)>,
    session: Option<Session>,
    rows: BTreeMap<TaskId, Task>,
    next_id: TaskId,
    objects: BTreeMap<(String, String), (Vec<u8>, String)>,
    feeds: Vec<mpsc::Sender<ChangeEvent>>,
    calls: HashMap<Operation, usize>,
    failing: HashMap<Operation, String>,
}

/// Backend that keeps everything in memory.
///
/// Writes publish change events to every open subscription, the way the
/// hosted realtime service does.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    events: broadcast::Sender<AuthStateChange>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                next_id: 1,
                ..MemoryState::default()
            })),
            events,
        }
    }

    /// Register an account without signing in
    pub fn with_user(self, email: &str, password: &str, name: &str) -> Self {
        self.lock()
            .users
            .insert(email.to_string(), (password.to_string(), new_user(email, name)));
        self
    }

    /// Start out signed in as `email`
    pub fn signed_in(self, email: &str) -> Self {
        {
            let mut state = self.lock();
            let user = state
                .users
                .entry(email.to_string())
                .or_insert_with(|| (String::new(), new_user(email, "")))
                .1
                .clone();
            state.session = Some(new_session(user));
        }
        self
    }

    /// Add a row as if another client wrote it; subscribers are notified
    pub fn seed(&self, title: &str, description: &str, email: &str) -> Task {
        let task = {
            let mut state = self.lock();
            let task = Task {
                id: state.next_id,
                title: title.to_string(),
                description: description.to_string(),
                image_url: None,
                email: email.to_string(),
            };
            state.next_id += 1;
            state.rows.insert(task.id, task.clone());
            task
        };
        self.publish(ChangeEvent::Insert(task.clone()));
        task
    }

    /// Delete a row as if another client did; subscribers are notified
    pub fn remote_delete(&self, id: TaskId) {
        let removed = self.lock().rows.remove(&id).is_some();
        if removed {
            self.publish(ChangeEvent::Delete { id });
        }
    }

    /// Send an arbitrary event to every subscriber without touching rows
    pub fn publish(&self, event: ChangeEvent) {
        let mut state = self.lock();
        state.feeds.retain(|feed| match feed.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Make every later call to `operation` fail until [`Self::recover`]
    pub fn fail(&self, operation: Operation, message: &str) {
        self.lock().failing.insert(operation, message.to_string());
    }

    pub fn recover(&self, operation: Operation) {
        self.lock().failing.remove(&operation);
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Stored rows, newest first
    pub fn rows(&self) -> Vec<Task> {
        self.lock().rows.values().rev().cloned().collect()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<(Vec<u8>, String)> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Open live subscriptions
    pub fn subscribers(&self) -> usize {
        let mut state = self.lock();
        state.feeds.retain(|feed| !feed.is_closed());
        state.feeds.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, operation: Operation) -> Result<()> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        match state.failing.get(&operation) {
            Some(message) => Err(BackendError::Api {
                code: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let _ = self.events.send(AuthStateChange { event, session });
    }
}

fn new_user(email: &str, name: &str) -> User {
    let mut user_metadata = Map::new();
    if !name.is_empty() {
        user_metadata.insert("name".to_string(), Value::String(name.to_string()));
    }
    User {
        id: Uuid::new_v4(),
        email: Some(email.to_string()),
        user_metadata,
    }
}

fn new_session(user: User) -> Session {
    Session {
        access_token: format!("memory-{}", Uuid::new_v4()),
        refresh_token: format!("memory-refresh-{}", Uuid::new_v4()),
        token_type: "bearer".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
        user,
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>> {
        self.enter(Operation::GetSession)?;
        Ok(self.lock().session.clone())
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        AuthSubscription::from_receiver(self.events.subscribe())
    }

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Option<Session>> {
        self.enter(Operation::SignUp)?;
        let session = {
            let mut state = self.lock();
            if state.users.contains_key(email) {
                return Err(BackendError::Api {
                    code: 422,
                    message: "User already registered".to_string(),
                });
            }
            let user = new_user(email, name);
            state
                .users
                .insert(email.to_string(), (password.to_string(), user.clone()));
            let session = new_session(user);
            state.session = Some(session.clone());
            session
        };
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(Some(session))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.enter(Operation::SignIn)?;
        let session = {
            let mut state = self.lock();
            let user = match state.users.get(email) {
                Some((stored, user)) if stored == password => user.clone(),
                _ => {
                    return Err(BackendError::Api {
                        code: 400,
                        message: "Invalid login credentials".to_string(),
                    });
                }
            };
            let session = new_session(user);
            state.session = Some(session.clone());
            session
        };
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        self.enter(Operation::SignOut)?;
        self.lock().session = None;
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryBackend {
    async fn list(&self) -> Result<Vec<Task>> {
        self.enter(Operation::List)?;
        Ok(self.rows())
    }

    async fn insert(&self, task: &NewTask) -> Result<Task> {
        self.enter(Operation::Insert)?;
        let row = {
            let mut state = self.lock();
            let row = Task {
                id: state.next_id,
                title: task.title.clone(),
                description: task.description.clone(),
                image_url: task.image_url.clone(),
                email: task.email.clone(),
            };
            state.next_id += 1;
            state.rows.insert(row.id, row.clone());
            row
        };
        self.publish(ChangeEvent::Insert(row.clone()));
        Ok(row)
    }

    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>> {
        self.enter(Operation::Update)?;
        let updated = {
            let mut state = self.lock();
            state.rows.get_mut(&id).map(|row| {
                row.title = patch.title.clone();
                row.description = patch.description.clone();
                row.image_url = patch.image_url.clone();
                row.clone()
            })
        };
        if let Some(row) = &updated {
            self.publish(ChangeEvent::Update(row.clone()));
        }
        Ok(updated)
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        self.enter(Operation::Delete)?;
        let removed = self.lock().rows.remove(&id).is_some();
        if removed {
            self.publish(ChangeEvent::Delete { id });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.enter(Operation::Upload)?;
        let mut state = self.lock();
        let slot = (bucket.to_string(), key.to_string());
        if state.objects.contains_key(&slot) {
            return Err(BackendError::Api {
                code: 409,
                message: "The resource already exists".to_string(),
            });
        }
        state.objects.insert(slot, (bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> Result<String> {
        Ok(format!("memory://{bucket}/{key}"))
    }
}

#[async_trait]
impl ChangeFeed for MemoryBackend {
    async fn subscribe(&self, table: &str) -> Result<LiveSubscription> {
        self.enter(Operation::Subscribe)?;
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        self.lock().feeds.push(tx);
        Ok(LiveSubscription::from_channel(table, rx))
    }
}
