//! The scheduler
//!
//! A [`Domino`] owns the placement registry and makes blocks fall down. Each
//! fall down runs inside a fresh [`TouchContext`]; the follow-ups touched
//! there are started concurrently as cascaded executions, which in turn start
//! their own follow-ups until nothing new is touched.
//!
//! Failures of the block passed to [`Domino::start`] are returned to the
//! caller. Failures further down the cascade are reported to
//! [`FallDownHooks::exception_fall_down`] and otherwise absorbed.
//!
//! Cycles in the follow-up graph are not detected: a block that (transitively)
//! touches an equal block keeps cascading.

mod effect;
mod error;
mod placement;

pub use effect::{CascadeSummary, PendingEffect};
pub use error::DominoError;

use std::sync::Arc;

use tracing::Instrument;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::action::{Action, BoxFuture, ErasedOutput, WorkerPool};
use crate::blocks::{AnyBlock, Block, FallDown, FallDownBlocking};
use crate::config::DominoConfig;
use crate::context::{TouchContext, TouchedBlocks};
use crate::execution::ExecutionHandle;
use crate::hooks::{FallDownHooks, NoOpHooks};
use placement::Placements;

/// Options for building a [`Domino`]
#[derive(TypedBuilder)]
pub struct DominoOptions {
    #[builder(default)]
    config: DominoConfig,
    #[builder(default = no_op_hooks())]
    hooks: Arc<dyn FallDownHooks>,
}

fn no_op_hooks() -> Arc<dyn FallDownHooks> {
    Arc::new(NoOpHooks)
}

/// Cascading block scheduler
///
/// Cheap to clone; clones share placements, hooks and the worker pool.
#[derive(Clone)]
pub struct Domino {
    inner: Arc<DominoInner>,
}

struct DominoInner {
    placements: Placements,
    hooks: Arc<dyn FallDownHooks>,
    pool: WorkerPool,
    config: DominoConfig,
}

impl std::fmt::Debug for Domino {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domino")
            .field("placements", &self.inner.placements.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Default for Domino {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DominoOptions> for Domino {
    fn from(options: DominoOptions) -> Self {
        Self::with_options(options)
    }
}

impl Domino {
    /// Scheduler with default config and no-op hooks
    pub fn new() -> Self {
        Self::with_options(DominoOptions::builder().build())
    }

    pub fn with_options(options: DominoOptions) -> Self {
        let pool = WorkerPool::new(options.config.max_blocking_actions.max(1));
        Self {
            inner: Arc::new(DominoInner {
                placements: Placements::default(),
                hooks: options.hooks,
                pool,
                config: options.config,
            }),
        }
    }

    pub fn config(&self) -> &DominoConfig {
        &self.inner.config
    }

    pub fn worker_pool(&self) -> &WorkerPool {
        &self.inner.pool
    }

    /// Place a block type whose [`FallDown`] behavior runs on the scheduler
    pub fn place<B: FallDown>(&self, deps: B::Deps) {
        self.place_action(Action::<B>::fall_down(), deps);
    }

    /// Place a block type whose [`FallDownBlocking`] behavior runs on the worker pool
    pub fn place_blocking<B: FallDownBlocking>(&self, deps: B::Deps) {
        self.place_action(Action::<B>::fall_down_blocking(), deps);
    }

    /// Place a block type with an explicit action
    ///
    /// Replaces any earlier placement of `B`.
    pub fn place_action<B: Block>(&self, action: Action<B>, deps: B::Deps) {
        self.inner.placements.place(action, deps);
    }

    pub fn is_placed<B: Block>(&self) -> bool {
        self.inner.placements.is_placed::<B>()
    }

    /// Make a block fall down and wait for its whole cascade to settle
    ///
    /// # Errors
    /// Returns the block's own failure; cascaded failures are only reported
    /// to the hooks.
    pub async fn start<B: Block>(&self, block: B) -> Result<B::Output, DominoError> {
        let (output, effect) = self.start_with_effect(block).await?;
        effect.await;
        Ok(output)
    }

    /// Make a block fall down and return as soon as its own result is known
    ///
    /// The cascade keeps running in the background; await the returned
    /// [`PendingEffect`] to join it.
    pub async fn start_with_effect<B: Block>(
        &self,
        block: B,
    ) -> Result<(B::Output, PendingEffect), DominoError> {
        let (output, effect) = self.fall(Box::new(block), None).await?;
        let output = output
            .downcast::<B::Output>()
            .map_err(|_| DominoError::TypeMismatch {
                type_name: B::type_name(),
            })?;
        Ok((*output, effect))
    }

    /// Make an erased block fall down and wait for its whole cascade to settle
    pub async fn start_boxed(&self, block: Box<dyn AnyBlock>) -> Result<ErasedOutput, DominoError> {
        let (output, effect) = self.fall(block, None).await?;
        effect.await;
        Ok(output)
    }

    async fn fall(
        &self,
        block: Box<dyn AnyBlock>,
        parent_id: Option<Uuid>,
    ) -> Result<(ErasedOutput, PendingEffect), DominoError> {
        let execution = match parent_id {
            Some(parent_id) => ExecutionHandle::cascaded(block.block_type_name(), parent_id),
            None => ExecutionHandle::root(block.block_type_name()),
        };
        let span = tracing::debug_span!(
            "fall_down",
            execution_id = %execution.id,
            block = execution.block_type,
            root = execution.is_root(),
        );

        self.fall_in_span(block, execution).instrument(span).await
    }

    async fn fall_in_span(
        &self,
        block: Box<dyn AnyBlock>,
        execution: ExecutionHandle,
    ) -> Result<(ErasedOutput, PendingEffect), DominoError> {
        let hooks = &self.inner.hooks;
        tracing::trace!("Falling down {block:?}");
        hooks.pre_fall_down(&execution, &*block).await;

        match self.invoke(&*block, &execution).await {
            Ok((output, touched)) => {
                execution.set_succeeded();
                hooks
                    .post_fall_down(&execution, &*block, &*output, &touched)
                    .await;
                let effect = self.spread(touched, execution.id);
                Ok((output, effect))
            }
            Err(err) => {
                tracing::debug!("Fall down failed: {err}");
                execution.set_failed(err.to_string());
                hooks.exception_fall_down(&execution, &*block, &err).await;
                Err(err)
            }
        }
    }

    /// Resolve the placement and run it inside a fresh touch context
    async fn invoke(
        &self,
        block: &dyn AnyBlock,
        execution: &ExecutionHandle,
    ) -> Result<(ErasedOutput, TouchedBlocks), DominoError> {
        let placement = self.inner.placements.resolve(block)?;
        execution.set_running();

        let touch_context = TouchContext::new();
        let result = placement
            .invoke(
                dyn_clone::clone_box(block),
                touch_context.clone(),
                self.inner.pool.clone(),
            )
            .await;
        // closed on every path, later touches into it fail
        let touched = touch_context.close();

        let output = result?;
        tracing::debug!("Harvested {} follow-ups", touched.len());
        if self.inner.config.log_follow_ups && !touched.is_empty() {
            tracing::debug!("Follow-ups: {:?}", touched.type_names());
        }
        Ok((output, touched))
    }

    /// Start every follow-up as a cascaded execution on its own task
    fn spread(&self, touched: TouchedBlocks, parent_id: Uuid) -> PendingEffect {
        let tasks = touched
            .into_iter()
            .map(|follow_up| tokio::spawn(self.clone().cascade(follow_up, parent_id)))
            .collect();
        PendingEffect::new(tasks)
    }

    fn cascade(self, block: Box<dyn AnyBlock>, parent_id: Uuid) -> BoxFuture<'static, CascadeSummary> {
        Box::pin(async move {
            let type_name = block.block_type_name();
            match self.fall(block, Some(parent_id)).await {
                Ok((_, effect)) => {
                    let summary = CascadeSummary::success() + effect.await;
                    tracing::debug!(
                        "Cascade from {type_name} settled: {} succeeded, {} failed",
                        summary.succeeded,
                        summary.failed
                    );
                    summary
                }
                Err(e) => {
                    tracing::warn!("Cascaded block {type_name} failed: {e}");
                    CascadeSummary::failure()
                }
            }
        })
    }
}
