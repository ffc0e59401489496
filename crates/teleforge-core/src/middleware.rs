//! Stock middleware, opt-in per handler or engine-wide.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::ApiError;
use crate::handler::{HandlerFn, MiddlewareFn, handler, middleware};

/// Answers every callback query before the handler runs, so clients stop
/// showing the progress spinner even when the handler forgets to respond.
pub fn auto_respond() -> MiddlewareFn {
    middleware(|ctx| async move {
        if ctx.callback().is_some() {
            ctx.respond(None).await?;
        }
        ctx.next()
    })
}

/// Drops messages sent through other bots (inline-mode relays).
pub fn ignore_via() -> MiddlewareFn {
    middleware(|ctx| async move {
        if ctx.message().is_some_and(|m| m.via.is_some()) {
            return Ok(());
        }
        ctx.next()
    })
}

/// The generic privilege filter: proceeds only when the sender's presence
/// in `ids` matches `allow_listed`. Everything else is silently dropped.
pub fn restrict(ids: Vec<i64>, allow_listed: bool) -> MiddlewareFn {
    middleware(move |ctx| {
        let ids = ids.clone();
        async move {
            let listed = ctx.sender().is_some_and(|user| ids.contains(&user.id));
            if listed == allow_listed { ctx.next() } else { Ok(()) }
        }
    })
}

/// Lets only the listed user ids through.
pub fn whitelist(ids: Vec<i64>) -> MiddlewareFn {
    restrict(ids, true)
}

/// Silently drops updates from the listed user ids.
pub fn blacklist(ids: Vec<i64>) -> MiddlewareFn {
    restrict(ids, false)
}

/// Logs every update passing through, at debug level.
pub fn logger() -> MiddlewareFn {
    middleware(|ctx| async move {
        tracing::debug!(
            update_id = ctx.update().id,
            sender = ctx.sender().map(|u| u.id),
            text = ctx.text(),
            "update",
        );
        ctx.next()
    })
}

/// Wraps a handler so a panic inside it becomes a normal error for the
/// sink instead of tearing down the task (or, in synchronous mode, the
/// dispatch loop).
pub fn recover(inner: HandlerFn) -> HandlerFn {
    handler(move |ctx| {
        let inner = inner.clone();
        async move {
            match AssertUnwindSafe(inner(ctx)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let what = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "handler panicked".to_string());
                    Err(ApiError::Other(what))
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::bot::Bot;
    use crate::endpoint::ON_TEXT;
    use crate::message::Message;
    use crate::types::User;
    use crate::update::{Update, UpdateKind};

    async fn sync_bot() -> Bot {
        Bot::builder("TOKEN").offline().synchronous(true).build().await.unwrap()
    }

    fn counting(hits: Arc<AtomicUsize>) -> HandlerFn {
        handler(move |_| {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn from_user(user_id: i64, text: &str) -> Update {
        Update {
            id: 1,
            kind: UpdateKind::Message(Message {
                text: text.into(),
                sender: Some(User { id: user_id, ..Default::default() }),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn ignore_via_drops_relayed_messages() {
        let bot = sync_bot().await;
        let hits = Arc::new(AtomicUsize::new(0));
        bot.handle(ON_TEXT, counting(hits.clone()), vec![ignore_via()]);

        let mut relayed = Message { text: "hi".into(), ..Default::default() };
        relayed.via = Some(User { id: 77, is_bot: true, ..Default::default() });
        bot.process_update(Update { id: 1, kind: UpdateKind::Message(relayed) }).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bot.process_update(from_user(5, "hi")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn whitelist_filters_by_sender() {
        let bot = sync_bot().await;
        let hits = Arc::new(AtomicUsize::new(0));
        bot.handle(ON_TEXT, counting(hits.clone()), vec![whitelist(vec![1, 2])]);

        bot.process_update(from_user(1, "in")).await;
        bot.process_update(from_user(9, "out")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blacklist_filters_by_sender() {
        let bot = sync_bot().await;
        let hits = Arc::new(AtomicUsize::new(0));
        bot.handle(ON_TEXT, counting(hits.clone()), vec![blacklist(vec![9])]);

        bot.process_update(from_user(9, "blocked")).await;
        bot.process_update(from_user(1, "fine")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recover_turns_panic_into_error() {
        let bot = sync_bot().await;
        let errors = Arc::new(AtomicUsize::new(0));
        let errors2 = errors.clone();
        bot.on_error(Arc::new(move |err, _| {
            assert_eq!(err.to_string(), "boom");
            errors2.fetch_add(1, Ordering::SeqCst);
        }));
        bot.handle(
            ON_TEXT,
            recover(handler(|_| async { panic!("boom") })),
            vec![],
        );

        bot.process_update(from_user(1, "hi")).await;
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
