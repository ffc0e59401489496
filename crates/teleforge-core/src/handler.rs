//! Handler and middleware function types.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::ApiError;

/// What a handler or middleware step returns. Errors never propagate to the
/// dispatch loop; they go to the bot's error sink.
pub type HandlerResult = Result<(), ApiError>;

/// A boxed, type-erased handler. Built from any async closure via
/// [`handler`].
pub type HandlerFn = Arc<dyn Fn(Context) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Middleware shares the handler shape; the difference is purely
/// positional. A middleware step calls [`Context::next`] to let the chain
/// proceed.
pub type MiddlewareFn = HandlerFn;

/// Erases an async closure into a [`HandlerFn`].
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx| -> BoxFuture<'static, HandlerResult> { Box::pin(f(ctx)) })
}

/// Erases an async closure into a [`MiddlewareFn`].
pub fn middleware<F, Fut>(f: F) -> MiddlewareFn
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler(f)
}
