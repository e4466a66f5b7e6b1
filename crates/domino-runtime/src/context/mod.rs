//! Touch context for collecting follow-up blocks
//!
//! While a block falls down, any code it reaches can [`touch`] further blocks
//! without being handed an explicit collector. The collector lives in
//! task-local storage, so every execution (and every concurrently spawned
//! sibling) sees only its own scope.
//!
//! The lifecycle of one scope is:
//! 1. [`TouchContext::new`] allocates an empty collection
//! 2. [`TouchContext::scope`] / [`TouchContext::sync_scope`] make it ambient
//!    for a future or a closure; the previous ambient scope is restored when
//!    it ends, including on error or panic
//! 3. [`TouchContext::close`] harvests the collection exactly once
//!
//! Work that leaves the current task (e.g. `tokio::spawn`) does not inherit
//! task-local storage. Wrap it in [`in_current_scope`] to keep touching the
//! same collection.

mod touched;

pub use touched::TouchedBlocks;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::blocks::{AnyBlock, Block};

tokio::task_local! {
    static TOUCH_CONTEXT: TouchContext;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TouchError {
    #[error("touch must be called while a block is falling down (no active touch context)")]
    NoActiveScope,

    #[error("touch context was already closed; its follow-ups have been harvested")]
    ScopeClosed,
}

/// Collection of follow-up blocks touched during one execution
///
/// Cloning yields another handle to the same collection.
#[derive(Clone, Debug)]
pub struct TouchContext {
    // None once closed
    touched: Arc<Mutex<Option<TouchedBlocks>>>,
}

impl TouchContext {
    /// Allocate a new, empty scope
    pub fn new() -> Self {
        Self {
            touched: Arc::new(Mutex::new(Some(TouchedBlocks::new()))),
        }
    }

    /// The ambient scope of the current task, if any
    pub fn current() -> Option<TouchContext> {
        TOUCH_CONTEXT.try_with(|ctx| ctx.clone()).ok()
    }

    /// Run a future with this scope as the ambient touch context
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        TOUCH_CONTEXT.scope(self.clone(), future).await
    }

    /// Run a closure with this scope as the ambient touch context
    ///
    /// Used on worker threads, which never inherit task-local storage.
    pub fn sync_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        TOUCH_CONTEXT.sync_scope(self.clone(), f)
    }

    /// Add a block to this scope
    pub fn insert(&self, block: Box<dyn AnyBlock>) -> Result<(), TouchError> {
        let mut guard = self.touched.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(touched) => {
                touched.insert(block);
                Ok(())
            }
            None => Err(TouchError::ScopeClosed),
        }
    }

    /// Whether [`TouchContext::close`] has been called on any handle to this scope
    pub fn is_closed(&self) -> bool {
        self.touched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Detach and return the touched blocks
    ///
    /// Later calls return an empty collection, and touching this scope
    /// afterwards fails with [`TouchError::ScopeClosed`].
    pub fn close(&self) -> TouchedBlocks {
        self.touched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default()
    }
}

impl Default for TouchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Declare a follow-up block for the execution currently falling down
///
/// A block equal to one already touched in this scope is ignored; the check
/// compares against every touched block of the same type.
pub fn touch<B: Block>(block: B) -> Result<(), TouchError> {
    touch_boxed(Box::new(block))
}

/// Declare several follow-up blocks of possibly different types
pub fn touch_all<I>(blocks: I) -> Result<(), TouchError>
where
    I: IntoIterator<Item = Box<dyn AnyBlock>>,
{
    let ctx = TouchContext::current().ok_or(TouchError::NoActiveScope)?;
    for block in blocks {
        ctx.insert(block)?;
    }
    Ok(())
}

/// Declare an already-erased follow-up block
pub fn touch_boxed(block: Box<dyn AnyBlock>) -> Result<(), TouchError> {
    TOUCH_CONTEXT
        .try_with(|ctx| ctx.insert(block))
        .map_err(|_| TouchError::NoActiveScope)?
}

/// Carry the ambient touch context into a future that may run elsewhere
///
/// Without an ambient scope the future runs unchanged.
pub fn in_current_scope<F>(future: F) -> impl Future<Output = F::Output> + Send
where
    F: Future + Send,
    F::Output: Send,
{
    let ctx = TouchContext::current();
    async move {
        match ctx {
            Some(ctx) => ctx.scope(future).await,
            None => future.await,
        }
    }
}
