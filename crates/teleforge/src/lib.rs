//! # teleforge
//!
//! A middleware-driven Telegram bot framework.
//!
//! ## Overview
//!
//! teleforge routes incoming updates through a classification step that
//! picks the most specific registered endpoint (exact command, exact text,
//! callback unique id) before falling back to category endpoints like
//! "any text" or "any media". Handlers run behind per-handler middleware
//! chains with explicit `next()` propagation.
//!
//! ```text
//! ┌────────────┐    ┌────────────┐    ┌─────────────────────────────┐
//! │ LongPoller │───▶│ dispatch   │───▶│ middleware chain ─▶ handler │
//! │ (or other  │    │ loop       │───▶│ middleware chain ─▶ handler │
//! │  source)   │    │            │───▶│ ...                         │
//! └────────────┘    └────────────┘    └─────────────────────────────┘
//! ```
//!
//! In synchronous mode the loop awaits each handler in turn; otherwise
//! every handler invocation runs as its own task.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use teleforge::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ApiError> {
//!     let bot = Bot::builder(std::env::var("BOT_TOKEN").unwrap())
//!         .transport(Arc::new(HttpTransport::new()?))
//!         .source(Arc::new(LongPoller::default()))
//!         .build()
//!         .await?;
//!
//!     bot.handle("/hello", handler(|ctx: Context| async move {
//!         ctx.reply("hi there").await?;
//!         Ok(())
//!     }), vec![]);
//!
//!     bot.start().await
//! }
//! ```

pub use teleforge_core as core;
pub use teleforge_transport as transport;

/// Everything a typical bot binary imports.
pub mod prelude {
    pub use teleforge_core::{
        ApiError, Bot, Context, HandlerResult, InlineButton, Message, ParseMode, ReplyMarkup,
        SendOptions, Update, UpdateKind, User, handler, middleware,
    };
    pub use teleforge_core::endpoint::*;
    pub use teleforge_core::middleware::{
        auto_respond, blacklist, ignore_via, logger, recover, restrict, whitelist,
    };
    pub use teleforge_transport::{HttpTransport, LongPoller};
}
