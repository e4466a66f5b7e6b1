use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::domino::DominoError;

/// Bounded pool for blocking actions
///
/// Blocking actions run on tokio's blocking threads; the semaphore caps how
/// many of them may run at once for one scheduler.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Maximum number of blocking actions running at once
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of blocking actions that could start right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run a blocking closure once a permit is available
    pub async fn run<F, R>(&self, type_name: &'static str, f: F) -> Result<R, DominoError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DominoError::WorkerPoolClosed)?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                tracing::error!("Blocking action for {type_name} panicked");
                DominoError::ActionPanicked { type_name }
            } else {
                DominoError::WorkerPoolClosed
            }
        })
    }

    /// Stop accepting new blocking actions
    pub fn close(&self) {
        self.permits.close();
    }
}
