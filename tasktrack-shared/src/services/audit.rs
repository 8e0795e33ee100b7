/// Audit service
///
/// Write-only record of task changes plus the per-task read used by the
/// audit endpoint. Entries are never updated or deleted.

use crate::error::ServiceResult;
use crate::models::audit_log::{AuditAction, AuditLogEntry, NewAuditEntry};
use crate::store::Store;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn Store>,
}

impl AuditService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn append(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        action: AuditAction,
        previous_value: Option<String>,
        new_value: Option<String>,
    ) -> ServiceResult<()> {
        self.store
            .append_audit(NewAuditEntry {
                task_id,
                user_id,
                action,
                previous_value,
                new_value,
            })
            .await?;

        tracing::debug!(task_id = %task_id, action = %action, "Audit entry appended");
        Ok(())
    }

    /// Entries for a task, newest first
    pub async fn list_for_task(&self, task_id: Uuid) -> ServiceResult<Vec<AuditLogEntry>> {
        Ok(self.store.audit_for_task(task_id).await?)
    }
}
