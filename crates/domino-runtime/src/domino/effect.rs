use std::future::IntoFuture;
use std::ops::{Add, AddAssign};

use tokio::task::JoinHandle;

use crate::action::BoxFuture;

/// How many cascaded executions settled, and how many of them failed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl CascadeSummary {
    pub(crate) fn success() -> Self {
        Self {
            succeeded: 1,
            failed: 0,
        }
    }

    pub(crate) fn failure() -> Self {
        Self {
            succeeded: 0,
            failed: 1,
        }
    }

    /// Total number of settled executions
    pub fn settled(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl Add for CascadeSummary {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            succeeded: self.succeeded + rhs.succeeded,
            failed: self.failed + rhs.failed,
        }
    }
}

impl AddAssign for CascadeSummary {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Join point for every execution cascaded from one fall down
///
/// The follow-ups are already running when this handle is returned; awaiting
/// it waits until all of them, and everything they touch in turn, have
/// settled. Cascaded failures do not fail the join, they are counted in the
/// returned [`CascadeSummary`].
///
/// Dropping the handle does not cancel the cascade.
#[derive(Debug, Default)]
pub struct PendingEffect {
    tasks: Vec<JoinHandle<CascadeSummary>>,
}

impl PendingEffect {
    pub(crate) fn new(tasks: Vec<JoinHandle<CascadeSummary>>) -> Self {
        Self { tasks }
    }

    /// Number of follow-ups started directly by the fall down
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether every direct follow-up task has finished
    pub fn is_settled(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Wait for the whole cascade to settle
    pub async fn settle(self) -> CascadeSummary {
        let mut summary = CascadeSummary::default();
        for task in self.tasks {
            match task.await {
                Ok(cascade) => summary += cascade,
                Err(e) => {
                    tracing::error!("Cascaded execution task did not complete: {e}");
                    summary += CascadeSummary::failure();
                }
            }
        }
        summary
    }
}

impl IntoFuture for PendingEffect {
    type Output = CascadeSummary;
    type IntoFuture = BoxFuture<'static, CascadeSummary>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.settle())
    }
}
