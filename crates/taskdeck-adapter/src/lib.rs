/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public hosted-backend adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod backend;
pub mod http;
pub mod realtime;
pub mod rest;
pub mod storage;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    AuthClient,
    AuthEvent,
    AuthStateChange,
    AuthSubscription,
    Session,
    SessionHolder,
    SessionStore,
    User,
};

// Re-export the backend seam
pub use backend::{
    AuthProvider,
    ChangeFeed,
    MemoryBackend,
    ObjectStorage,
    TaskStore,
    memory::Operation,
};

// Re-export commonly used types from http
pub use http::{
    BackendClient,
    BackendError,
    ClientConfig,
    Result,
};

pub use realtime::{LiveSubscription, RealtimeClient, RealtimeConfig};
pub use rest::TaskTable;
pub use storage::{StorageClient, UploadResponse};

// Re-export all types
pub use types::*;
