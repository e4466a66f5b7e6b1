//! Event system for runtime monitoring
//!
//! This module provides an event bus abstraction for observing block
//! executions. Events are emitted by [`crate::hooks::EventHooks`] at the same
//! points as the lifecycle hooks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blocks::BoxError;

/// Events emitted by the scheduler for monitoring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum DominoEvent {
    /// A block is about to fall down
    BlockStarted {
        execution_id: Uuid,
        parent_id: Option<Uuid>,
        block_type: String,
    },

    /// A block fell down and touched the given follow-ups
    BlockFinished {
        execution_id: Uuid,
        block_type: String,
        follow_ups: Vec<String>,
    },

    /// A block failed to fall down
    BlockFailed {
        execution_id: Uuid,
        block_type: String,
        error: String,
    },
}

impl DominoEvent {
    pub fn execution_id(&self) -> Uuid {
        match self {
            DominoEvent::BlockStarted { execution_id, .. }
            | DominoEvent::BlockFinished { execution_id, .. }
            | DominoEvent::BlockFailed { execution_id, .. } => *execution_id,
        }
    }

    pub fn block_type(&self) -> &str {
        match self {
            DominoEvent::BlockStarted { block_type, .. }
            | DominoEvent::BlockFinished { block_type, .. }
            | DominoEvent::BlockFailed { block_type, .. } => block_type,
        }
    }
}

/// Trait for emitting events from the runtime
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Emit an event to the event bus
    ///
    /// # Errors
    /// Returns an error if the event cannot be emitted
    async fn emit(&self, event: DominoEvent) -> Result<(), BoxError>;
}

/// No-op event bus for when events are not needed
pub struct NoOpEventBus;

#[async_trait]
impl EventBus for NoOpEventBus {
    async fn emit(&self, _event: DominoEvent) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Event bus that collects events in memory
///
/// Useful for testing or scenarios where events need to be collected
/// and inspected programmatically.
#[derive(Default, Clone)]
pub struct MemoryEventBus {
    events: std::sync::Arc<std::sync::Mutex<Vec<DominoEvent>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DominoEvent> {
        self.lock().clone()
    }

    /// Events emitted for blocks of the given type
    pub fn events_for(&self, block_type: &str) -> Vec<DominoEvent> {
        self.lock()
            .iter()
            .filter(|event| event.block_type() == block_type)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DominoEvent>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn emit(&self, event: DominoEvent) -> Result<(), BoxError> {
        self.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_memory_event_bus_collects_and_filters() {
        let bus = MemoryEventBus::new();
        let id = Uuid::new_v4();

        bus.emit(DominoEvent::BlockStarted {
            execution_id: id,
            parent_id: None,
            block_type: "Fetch".to_string(),
        })
        .await
        .unwrap();
        bus.emit(DominoEvent::BlockFailed {
            execution_id: Uuid::new_v4(),
            block_type: "Notify".to_string(),
            error: "boom".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(bus.events().len(), 2);
        let fetch = bus.events_for("Fetch");
        assert_eq!(fetch.len(), 1);
        assert_eq!(fetch[0].execution_id(), id);

        bus.clear();
        assert!(bus.events().is_empty());
    }

    #[tokio::test]
    async fn test_noop_event_bus_accepts_events() {
        let result = NoOpEventBus
            .emit(DominoEvent::BlockFinished {
                execution_id: Uuid::new_v4(),
                block_type: "Fetch".to_string(),
                follow_ups: vec![],
            })
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_event_serialization() {
        let id = Uuid::nil();
        let json = serde_json::to_value(DominoEvent::BlockFinished {
            execution_id: id,
            block_type: "Fetch".to_string(),
            follow_ups: vec!["Notify".to_string()],
        })
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "blockFinished",
                "data": {
                    "execution_id": id,
                    "block_type": "Fetch",
                    "follow_ups": ["Notify"],
                }
            })
        );
    }
}
