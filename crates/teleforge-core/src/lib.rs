//! Core engine for Telegram bots: update classification, handler registry,
//! middleware chains, pooled per-update contexts, and the dispatch loop.
//!
//! The transport and long-polling pieces live in `teleforge-transport`;
//! this crate only depends on their seams ([`Transport`], [`UpdateSource`],
//! [`Codec`]) and ships null/in-process implementations for tests.

pub mod bot;
pub mod codec;
pub mod context;
mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod message;
pub mod middleware;
pub mod options;
mod registry;
pub mod source;
pub mod transport;
pub mod types;
pub mod update;

pub use bot::{Bot, BotBuilder, Editable, Group};
pub use codec::{Codec, JsonCodec};
pub use context::Context;
pub use endpoint::{CallbackEndpoint, IntoEndpoint};
pub use error::{ApiError, ErrorSink};
pub use handler::{HandlerFn, HandlerResult, MiddlewareFn, handler, middleware};
pub use message::Message;
pub use options::{InlineButton, ReplyButton, ReplyMarkup, SendOptions};
pub use source::{ChannelSource, UpdateSource};
pub use transport::{ApiRequest, ApiResponse, FilePart, RequestBody, Transport};
pub use types::{ChatAction, ParseMode, Recipient, User};
pub use update::{Update, UpdateKind};
