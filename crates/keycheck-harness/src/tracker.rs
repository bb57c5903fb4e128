//! Pending-deletion bookkeeping for resources created during a scenario.

use keycheck_client::{ApiError, DenialKind, SecretApi, SecretRequest};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, warn};

/// Kind of resource a cleanup entry refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Secret,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Secret => "secret",
        }
    }

    fn delete_request(&self, id: &str) -> SecretRequest {
        match self {
            ResourceType::Secret => SecretRequest::delete(id),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secret" => Ok(ResourceType::Secret),
            _ => Err(format!("unknown resource type: {}", s)),
        }
    }
}

/// A resource awaiting deletion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CleanupEntry {
    pub resource_type: ResourceType,
    pub id: String,
}

/// What a cleanup pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted: Vec<CleanupEntry>,
    /// Entries the service no longer knew about.
    pub already_gone: Vec<CleanupEntry>,
    pub failed: Vec<(CleanupEntry, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.already_gone.len() + self.failed.len()
    }
}

/// Set of resources created in one scenario and not yet deleted.
///
/// Entries are unique; registration order is kept so teardown can delete in
/// reverse creation order.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    pending: Vec<CleanupEntry>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly created resource. Returns false if it was already pending.
    pub fn register(&mut self, resource_type: ResourceType, id: impl Into<String>) -> bool {
        let entry = CleanupEntry {
            resource_type,
            id: id.into(),
        };
        if self.pending.contains(&entry) {
            warn!(resource_type = %entry.resource_type, id = %entry.id, "resource registered twice");
            return false;
        }
        debug!(resource_type = %entry.resource_type, id = %entry.id, "registered for cleanup");
        self.pending.push(entry);
        true
    }

    /// Forget a resource the scenario deleted itself. Returns false if it was not pending.
    pub fn release(&mut self, resource_type: ResourceType, id: &str) -> bool {
        let before = self.pending.len();
        self.pending
            .retain(|e| !(e.resource_type == resource_type && e.id == id));
        before != self.pending.len()
    }

    pub fn pending(&self) -> &[CleanupEntry] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Delete every pending resource through `client`, newest first.
    ///
    /// Failures are logged and reported, never returned. The pending set is
    /// empty afterwards whatever happened, so a second call is a no-op.
    pub async fn cleanup_all(&mut self, client: &dyn SecretApi) -> CleanupReport {
        let mut report = CleanupReport::default();
        let entries = std::mem::take(&mut self.pending);

        for entry in entries.into_iter().rev() {
            let request = entry.resource_type.delete_request(&entry.id);
            match client.call(&request).await {
                Ok(_) => {
                    debug!(resource_type = %entry.resource_type, id = %entry.id, "cleaned up");
                    report.deleted.push(entry);
                }
                Err(ApiError::Denied {
                    kind: DenialKind::NotFound,
                    ..
                }) => {
                    debug!(resource_type = %entry.resource_type, id = %entry.id, "already gone");
                    report.already_gone.push(entry);
                }
                Err(e) => {
                    warn!(
                        resource_type = %entry.resource_type,
                        id = %entry.id,
                        error = %e,
                        "cleanup delete failed"
                    );
                    report.failed.push((entry, e.to_string()));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keycheck_client::{ApiResponse, MockSecretApi};
    use mockall::Sequence;

    #[test]
    fn register_is_unique() {
        let mut tracker = ResourceTracker::new();
        assert!(tracker.register(ResourceType::Secret, "a"));
        assert!(!tracker.register(ResourceType::Secret, "a"));
        assert_eq!(tracker.pending().len(), 1);
    }

    #[test]
    fn release_removes_only_matching_entry() {
        let mut tracker = ResourceTracker::new();
        tracker.register(ResourceType::Secret, "a");
        tracker.register(ResourceType::Secret, "b");

        assert!(tracker.release(ResourceType::Secret, "a"));
        assert!(!tracker.release(ResourceType::Secret, "a"));
        assert_eq!(tracker.pending()[0].id, "b");
    }

    #[tokio::test]
    async fn cleanup_deletes_newest_first() {
        let mut tracker = ResourceTracker::new();
        tracker.register(ResourceType::Secret, "first");
        tracker.register(ResourceType::Secret, "second");

        let mut seq = Sequence::new();
        let mut mock = MockSecretApi::new();
        mock.expect_call()
            .withf(|req| req == &SecretRequest::delete("second"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ApiResponse::empty(204)));
        mock.expect_call()
            .withf(|req| req == &SecretRequest::delete("first"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ApiResponse::empty(204)));

        let report = tracker.cleanup_all(&mock).await;
        assert_eq!(report.deleted.len(), 2);
        assert!(report.is_clean());
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn cleanup_failures_are_reported_not_raised() {
        let mut tracker = ResourceTracker::new();
        tracker.register(ResourceType::Secret, "stuck");
        tracker.register(ResourceType::Secret, "gone");
        tracker.register(ResourceType::Secret, "fine");

        let mut mock = MockSecretApi::new();
        mock.expect_call().times(3).returning(|req| match req.secret_id() {
            Some("stuck") => Err(ApiError::Server { status: 500 }),
            Some("gone") => Err(ApiError::denied(404, "not found")),
            _ => Ok(ApiResponse::empty(204)),
        });

        let report = tracker.cleanup_all(&mock).await;
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.deleted[0].id, "fine");
        assert_eq!(report.already_gone[0].id, "gone");
        assert_eq!(report.failed[0].0.id, "stuck");
        assert!(!report.is_clean());
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn second_cleanup_is_a_noop() {
        let mut tracker = ResourceTracker::new();
        tracker.register(ResourceType::Secret, "a");

        let mut mock = MockSecretApi::new();
        mock.expect_call()
            .times(1)
            .returning(|_| Ok(ApiResponse::empty(204)));

        tracker.cleanup_all(&mock).await;
        let second = tracker.cleanup_all(&mock).await;
        assert_eq!(second, CleanupReport::default());
    }

    #[tokio::test]
    async fn released_entries_are_not_deleted() {
        let mut tracker = ResourceTracker::new();
        tracker.register(ResourceType::Secret, "deleted-by-test");
        tracker.release(ResourceType::Secret, "deleted-by-test");

        let mut mock = MockSecretApi::new();
        mock.expect_call().never();

        let report = tracker.cleanup_all(&mock).await;
        assert_eq!(report.attempted(), 0);
    }
}
