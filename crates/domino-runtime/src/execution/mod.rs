//! Execution identity and lifecycle
//!
//! Every call that makes a block fall down gets its own [`ExecutionHandle`].
//! The handle moves through `Pending -> Running -> {Succeeded, Failed}` and
//! never revisits a state.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

/// Current status of one execution
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Succeeded,
    Failed(String), // Error message
}

impl ExecutionStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, ExecutionStatus::Succeeded | ExecutionStatus::Failed(_))
    }
}

/// Handle for tracking one execution
///
/// Cloning yields another handle to the same execution.
#[derive(Clone, Debug)]
pub struct ExecutionHandle {
    /// Unique execution ID
    pub id: Uuid,
    /// Execution whose fall down touched this block, None for a root
    pub parent_id: Option<Uuid>,
    /// Short type name of the block being executed
    pub block_type: &'static str,
    status: watch::Sender<ExecutionStatus>,
}

impl ExecutionHandle {
    /// Create a handle for a root execution
    pub fn root(block_type: &'static str) -> Self {
        Self::new(block_type, None)
    }

    /// Create a handle for an execution touched by `parent_id`
    pub fn cascaded(block_type: &'static str, parent_id: Uuid) -> Self {
        Self::new(block_type, Some(parent_id))
    }

    fn new(block_type: &'static str, parent_id: Option<Uuid>) -> Self {
        let (status, _) = watch::channel(ExecutionStatus::Pending);
        Self {
            id: Uuid::new_v4(),
            parent_id,
            block_type,
            status,
        }
    }

    /// Whether this execution was started directly by a caller
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<ExecutionStatus> {
        self.status.subscribe()
    }

    pub(crate) fn set_running(&self) {
        self.transition(ExecutionStatus::Running);
    }

    pub(crate) fn set_succeeded(&self) {
        self.transition(ExecutionStatus::Succeeded);
    }

    pub(crate) fn set_failed(&self, error: impl Into<String>) {
        self.transition(ExecutionStatus::Failed(error.into()));
    }

    // Finished executions never change state again
    fn transition(&self, next: ExecutionStatus) {
        self.status.send_if_modified(|current| {
            if current.is_finished() {
                return false;
            }
            *current = next;
            true
        });
    }
}
