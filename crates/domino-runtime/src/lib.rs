//! Cascading-effect execution engine
//!
//! Blocks are plain values with a single behavior, "fall down". While a block
//! falls down it may [`touch`] other blocks; the [`Domino`] scheduler
//! collects those follow-ups and makes them fall down concurrently, repeating
//! until nothing new is touched. It includes:
//!
//! - Block traits and their type-erased form ([`blocks`])
//! - Async and blocking actions, and the bounded worker pool ([`action`])
//! - The ambient touch context that collects follow-ups ([`context`])
//! - The placement registry and scheduler ([`domino`])
//! - Lifecycle hooks and execution events ([`hooks`], [`events`], [`execution`])
//! - The message codec and transport boundary ([`message`])
//!
//! # Example
//!
//! ```ignore
//! let domino = Domino::new();
//! domino.place::<FetchOrder>(http_client);
//! domino.place_blocking::<WriteInvoice>(invoice_dir);
//!
//! // FetchOrder touches WriteInvoice while falling down
//! let order = domino.start(FetchOrder { id: 7 }).await?;
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for standalone logging to the terminal.
///
/// This sets up tracing to output directly to stderr with the log level
/// controlled by the `RUST_LOG` environment variable, defaulting to `info`.
///
/// Applications with their own logging setup don't need this: `tracing` is
/// built with its `log` feature, so events from this crate are emitted as
/// `log` records when no subscriber is installed.
///
/// # Examples
///
/// ```ignore
/// // Set RUST_LOG=domino_runtime=trace to follow every fall down
/// domino_runtime::init_tracing();
/// ```
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

pub mod action;
pub mod blocks;
pub mod config;
pub mod context;
pub mod domino;
pub mod events;
pub mod execution;
pub mod hooks;
pub mod message;

pub use action::Action;
pub use blocks::{AnyBlock, Block, BoxError, FallDown, FallDownBlocking};
pub use crate::config::DominoConfig;
pub use context::{touch, touch_all, TouchContext, TouchError};
pub use domino::{CascadeSummary, Domino, DominoError, DominoOptions, PendingEffect};
pub use hooks::FallDownHooks;
