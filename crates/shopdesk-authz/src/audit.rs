//! Best-effort audit recording and gated audit log reads.

use serde_json::Value;
use shopdesk_core::error::ShopdeskResult;
use shopdesk_core::models::audit::{AuditLogEntry, CreateAuditLogEntry};
use shopdesk_core::principal::Session;
use shopdesk_core::repository::{
    AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination, UserRepository,
};
use tracing::{debug, error};
use uuid::Uuid;

use crate::gate::AuthorizationGate;

/// Appends audit entries after a mutation has succeeded.
///
/// A failed append is logged and swallowed; it never fails or rolls
/// back the mutation that triggered it.
#[derive(Clone)]
pub struct AuditRecorder<A: AuditLogRepository> {
    repo: A,
}

impl<A: AuditLogRepository> AuditRecorder<A> {
    pub fn new(repo: A) -> Self {
        Self { repo }
    }

    pub async fn log_audit(
        &self,
        user_id: Uuid,
        action: &str,
        description: impl Into<String>,
        metadata: Option<Value>,
    ) {
        let entry = CreateAuditLogEntry {
            user_id,
            action: action.to_string(),
            description: description.into(),
            metadata: metadata.unwrap_or(Value::Null),
        };

        match self.repo.append(entry).await {
            Ok(entry) => debug!(audit_id = %entry.id, action, "Audit entry recorded"),
            Err(e) => error!(%user_id, action, error = %e, "Failed to record audit entry"),
        }
    }
}

/// Read access to the audit log, gated by `audit.view`.
pub struct AuditLogService<U: UserRepository, A: AuditLogRepository> {
    gate: AuthorizationGate<U>,
    repo: A,
}

impl<U: UserRepository, A: AuditLogRepository> AuditLogService<U, A> {
    pub fn new(gate: AuthorizationGate<U>, repo: A) -> Self {
        Self { gate, repo }
    }

    pub async fn list_audit_logs(
        &self,
        session: Option<&Session>,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> ShopdeskResult<PaginatedResult<AuditLogEntry>> {
        self.gate
            .require_permission(session, "audit.view", None)
            .await?;
        self.repo.list(filter, pagination).await
    }
}
