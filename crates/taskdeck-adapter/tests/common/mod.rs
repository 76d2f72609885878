/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for taskdeck-adapter tests

#![allow(dead_code)]

use serde_json::{Value, json};
use taskdeck_adapter::BackendClient;
use wiremock::MockServer;

pub const API_KEY: &str = "anon-test-key";
pub const USER_ID: &str = "5b0b8c3e-6c5f-4a4c-9e55-9f0f0d3b1c11";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Backend client pointed at the mock server
pub fn client_for(server: &MockServer) -> BackendClient {
    BackendClient::new(&server.uri(), API_KEY).expect("client should build")
}

/// Token endpoint body as the auth service returns it
pub fn token_body(access_token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": expires_in,
        "refresh_token": format!("refresh-{access_token}"),
        "user": {
            "id": USER_ID,
            "aud": "authenticated",
            "email": "ada@example.com",
            "user_metadata": { "name": "Ada" }
        }
    })
}

pub fn task_row(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "created_at": "2024-05-01T10:00:00+00:00",
        "title": title,
        "description": format!("{title} details"),
        "image_url": null,
        "email": "ada@example.com"
    })
}

/// Unique scratch directory under the system temp dir
pub fn temp_dir() -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("taskdeck-adapter-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&path).expect("temp dir");
    path
}
