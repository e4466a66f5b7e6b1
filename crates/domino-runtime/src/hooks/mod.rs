//! Lifecycle hooks around each fall down
//!
//! The scheduler calls exactly one of `post_fall_down` or
//! `exception_fall_down` per execution, always after `pre_fall_down`. Hooks
//! observe; they cannot change the outcome.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::blocks::AnyBlock;
use crate::context::TouchedBlocks;
use crate::domino::DominoError;
use crate::events::{DominoEvent, EventBus};
use crate::execution::ExecutionHandle;

/// Hooks invoked by the scheduler, all no-ops by default
#[async_trait]
pub trait FallDownHooks: Send + Sync {
    /// Before the block's placement is resolved
    async fn pre_fall_down(&self, _execution: &ExecutionHandle, _block: &dyn AnyBlock) {}

    /// After the block fell down, before its follow-ups are started
    async fn post_fall_down(
        &self,
        _execution: &ExecutionHandle,
        _block: &dyn AnyBlock,
        _result: &(dyn Any + Send + Sync),
        _follow_ups: &TouchedBlocks,
    ) {
    }

    /// After the block failed, before the error is returned (root) or absorbed (cascaded)
    async fn exception_fall_down(
        &self,
        _execution: &ExecutionHandle,
        _block: &dyn AnyBlock,
        _error: &DominoError,
    ) {
    }
}

/// Hooks that do nothing
pub struct NoOpHooks;

impl FallDownHooks for NoOpHooks {}

/// Hooks that forward every lifecycle point to an [`EventBus`]
pub struct EventHooks {
    bus: Arc<dyn EventBus>,
}

impl EventHooks {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    async fn emit(&self, event: DominoEvent) {
        if let Err(e) = self.bus.emit(event).await {
            tracing::warn!("Failed to emit domino event: {e}");
        }
    }
}

#[async_trait]
impl FallDownHooks for EventHooks {
    async fn pre_fall_down(&self, execution: &ExecutionHandle, block: &dyn AnyBlock) {
        self.emit(DominoEvent::BlockStarted {
            execution_id: execution.id,
            parent_id: execution.parent_id,
            block_type: block.block_type_name().to_string(),
        })
        .await;
    }

    async fn post_fall_down(
        &self,
        execution: &ExecutionHandle,
        block: &dyn AnyBlock,
        _result: &(dyn Any + Send + Sync),
        follow_ups: &TouchedBlocks,
    ) {
        self.emit(DominoEvent::BlockFinished {
            execution_id: execution.id,
            block_type: block.block_type_name().to_string(),
            follow_ups: follow_ups
                .type_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
        .await;
    }

    async fn exception_fall_down(
        &self,
        execution: &ExecutionHandle,
        block: &dyn AnyBlock,
        error: &DominoError,
    ) {
        self.emit(DominoEvent::BlockFailed {
            execution_id: execution.id,
            block_type: block.block_type_name().to_string(),
            error: error.to_string(),
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::blocks::Block;
    use crate::events::MemoryEventBus;

    #[derive(Debug, Clone, PartialEq)]
    struct Fetch;

    impl Block for Fetch {
        type Deps = ();
        type Output = u32;
    }

    #[tokio::test]
    async fn test_event_hooks_emit_lifecycle_events() {
        let bus = MemoryEventBus::new();
        let hooks = EventHooks::new(Arc::new(bus.clone()));
        let execution = ExecutionHandle::root("Fetch");
        let mut follow_ups = TouchedBlocks::new();
        follow_ups.insert(Box::new(Fetch));

        hooks.pre_fall_down(&execution, &Fetch).await;
        hooks
            .post_fall_down(&execution, &Fetch, &42u32, &follow_ups)
            .await;
        hooks
            .exception_fall_down(
                &execution,
                &Fetch,
                &DominoError::UnplacedBlock { type_name: "Fetch" },
            )
            .await;

        assert_eq!(
            bus.events(),
            vec![
                DominoEvent::BlockStarted {
                    execution_id: execution.id,
                    parent_id: None,
                    block_type: "Fetch".to_string(),
                },
                DominoEvent::BlockFinished {
                    execution_id: execution.id,
                    block_type: "Fetch".to_string(),
                    follow_ups: vec!["Fetch".to_string()],
                },
                DominoEvent::BlockFailed {
                    execution_id: execution.id,
                    block_type: "Fetch".to_string(),
                    error: "block Fetch was started but never placed".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_noop_hooks_do_nothing() {
        let execution = ExecutionHandle::root("Fetch");
        NoOpHooks.pre_fall_down(&execution, &Fetch).await;
        NoOpHooks
            .exception_fall_down(&execution, &Fetch, &DominoError::WorkerPoolClosed)
            .await;
    }
}
