//! Actions bound to block types
//!
//! An [`Action`] is the callable the scheduler invokes to make a block fall
//! down. It comes in two flavours, decided once when it is built:
//!
//! - [`Action::Async`] is awaited directly on the scheduler's runtime
//! - [`Action::Blocking`] is offloaded to the bounded [`WorkerPool`]
//!
//! Either way the caller just awaits [`Action::invoke`]; errors from the
//! callable are returned as [`DominoError::FallDown`] with the original error
//! as the source, and a panic in either flavour becomes
//! [`DominoError::ActionPanicked`].

mod pool;

pub use pool::WorkerPool;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::blocks::{AnyBlock, Block, BoxError, FallDown, FallDownBlocking};
use crate::context::TouchContext;
use crate::domino::DominoError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Output of an action whose block type has been erased
pub type ErasedOutput = Box<dyn Any + Send + Sync>;

type AsyncActionFn<B> = dyn Fn(B, Arc<<B as Block>::Deps>) -> BoxFuture<'static, Result<<B as Block>::Output, BoxError>>
    + Send
    + Sync;

type BlockingActionFn<B> =
    dyn Fn(B, &<B as Block>::Deps) -> Result<<B as Block>::Output, BoxError> + Send + Sync;

/// Callable that makes blocks of type `B` fall down
pub enum Action<B: Block> {
    Async(Arc<AsyncActionFn<B>>),
    Blocking(Arc<BlockingActionFn<B>>),
}

impl<B: Block> Clone for Action<B> {
    fn clone(&self) -> Self {
        match self {
            Action::Async(f) => Action::Async(f.clone()),
            Action::Blocking(f) => Action::Blocking(f.clone()),
        }
    }
}

impl<B: Block> std::fmt::Debug for Action<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_async() { "Async" } else { "Blocking" };
        f.debug_tuple("Action")
            .field(&kind)
            .field(&B::type_name())
            .finish()
    }
}

impl<B: Block> Action<B> {
    /// Build an action from an async callable
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(B, Arc<B::Deps>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B::Output, BoxError>> + Send + 'static,
    {
        Action::Async(Arc::new(
            move |block: B, deps: Arc<B::Deps>| -> BoxFuture<'static, Result<B::Output, BoxError>> {
                Box::pin(f(block, deps))
            },
        ))
    }

    /// Build an action from a blocking callable
    pub fn from_blocking<F>(f: F) -> Self
    where
        F: Fn(B, &B::Deps) -> Result<B::Output, BoxError> + Send + Sync + 'static,
    {
        Action::Blocking(Arc::new(f))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Action::Async(_))
    }

    /// Invoke the action for one block
    ///
    /// `touch_context` becomes the ambient touch context for the callable,
    /// whichever flavour it is.
    pub async fn invoke(
        &self,
        block: B,
        deps: Arc<B::Deps>,
        touch_context: &TouchContext,
        pool: &WorkerPool,
    ) -> Result<B::Output, DominoError> {
        let result = match self {
            Action::Async(f) => AssertUnwindSafe(touch_context.scope(f(block, deps)))
                .catch_unwind()
                .await
                .map_err(|_| {
                    tracing::error!("Action for {} panicked", B::type_name());
                    DominoError::ActionPanicked {
                        type_name: B::type_name(),
                    }
                })?,
            Action::Blocking(f) => {
                let f = f.clone();
                let touch_context = touch_context.clone();
                pool.run(B::type_name(), move || {
                    touch_context.sync_scope(|| f(block, &deps))
                })
                .await?
            }
        };

        result.map_err(|source| DominoError::FallDown {
            type_name: B::type_name(),
            source,
        })
    }
}

impl<B: FallDown> Action<B> {
    /// Action calling the block's own [`FallDown::fall_down`]
    pub fn fall_down() -> Self {
        Self::from_async(|block: B, deps: Arc<B::Deps>| async move {
            block.fall_down(&deps).await
        })
    }
}

impl<B: FallDownBlocking> Action<B> {
    /// Action calling the block's own [`FallDownBlocking::fall_down`] on the worker pool
    pub fn fall_down_blocking() -> Self {
        Self::from_blocking(|block: B, deps: &B::Deps| block.fall_down(deps))
    }
}

/// An action together with the dependencies placed for its block type
pub(crate) struct Placement<B: Block> {
    action: Action<B>,
    deps: Arc<B::Deps>,
}

impl<B: Block> Placement<B> {
    pub(crate) fn new(action: Action<B>, deps: B::Deps) -> Self {
        Self {
            action,
            deps: Arc::new(deps),
        }
    }
}

/// Placement whose block type has been erased, as stored in the registry
pub(crate) trait ErasedPlacement: Send + Sync {
    fn is_async(&self) -> bool;

    fn invoke(
        &self,
        block: Box<dyn AnyBlock>,
        touch_context: TouchContext,
        pool: WorkerPool,
    ) -> BoxFuture<'static, Result<ErasedOutput, DominoError>>;
}

impl<B: Block> ErasedPlacement for Placement<B> {
    fn is_async(&self) -> bool {
        self.action.is_async()
    }

    fn invoke(
        &self,
        block: Box<dyn AnyBlock>,
        touch_context: TouchContext,
        pool: WorkerPool,
    ) -> BoxFuture<'static, Result<ErasedOutput, DominoError>> {
        let action = self.action.clone();
        let deps = self.deps.clone();
        Box::pin(async move {
            let block = block.downcast::<B>().map_err(|_| DominoError::TypeMismatch {
                type_name: B::type_name(),
            })?;
            let output = action.invoke(*block, deps, &touch_context, &pool).await?;
            Ok(Box::new(output) as ErasedOutput)
        })
    }
}
