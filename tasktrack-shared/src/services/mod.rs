/// Domain services
///
/// Services hold an `Arc<dyn Store>` and return [`ServiceError`]s; they know
/// nothing about HTTP.
///
/// - `tasks`: the task mutation and notification pipeline
/// - `notifications`: per-user inbox
/// - `audit`: append-only change log
/// - `accounts`: registration, login and profiles
///
/// [`ServiceError`]: crate::error::ServiceError

pub mod accounts;
pub mod audit;
pub mod notifications;
pub mod tasks;

use crate::auth::jwt::JwtKeys;
use crate::events::EventPublisher;
use crate::store::Store;
use std::sync::Arc;

pub use accounts::{AccountService, AuthSession};
pub use audit::AuditService;
pub use notifications::{Inbox, NotificationService};
pub use tasks::{Dashboard, TaskDraft, TaskService, TaskUpdate};

/// Every service wired to one store and one publisher
#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub tasks: TaskService,
    pub notifications: NotificationService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, publisher: Arc<dyn EventPublisher>, keys: JwtKeys) -> Self {
        Self {
            accounts: AccountService::new(store.clone(), keys),
            tasks: TaskService::new(store.clone(), publisher),
            notifications: NotificationService::new(store),
        }
    }
}
