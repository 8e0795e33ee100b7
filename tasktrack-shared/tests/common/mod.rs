//! Shared helpers for service-level integration tests
//!
//! Every test gets its own in-memory store and recording publisher, so
//! tests run in parallel without a database.

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tasktrack_shared::auth::jwt::JwtKeys;
use tasktrack_shared::events::RecordingPublisher;
use tasktrack_shared::models::user::{CreateUser, User};
use tasktrack_shared::services::{Services, TaskDraft};
use tasktrack_shared::store::{MemoryStore, Store, UserStore};

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub services: Services,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let services = Services::new(
            store.clone() as Arc<dyn Store>,
            publisher.clone(),
            JwtKeys::new(TEST_SECRET),
        );

        Self {
            store,
            publisher,
            services,
        }
    }

    /// Inserts a user directly, skipping password hashing
    pub async fn user(&self, name: &str) -> User {
        self.store
            .create_user(CreateUser {
                email: format!("{}@example.com", name.to_lowercase()),
                name: name.to_string(),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .expect("Failed to create user")
    }
}

pub fn date(value: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .expect("Invalid date")
        .and_hms_opt(0, 0, 0)
        .expect("Invalid time")
        .and_utc()
}

pub fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: format!("Description of {}", title),
        due_date: Utc::now() + Duration::days(3),
        priority: None,
        status: None,
        assigned_to_id: None,
    }
}
