//! Update classification and handler execution.
//!
//! One entry point matters here: [`Bot::process_update`]. It classifies an
//! update to an endpoint (specific beats generic), runs the registered
//! handler through its middleware chain, and reports whether anything ran.

use crate::bot::Bot;
use crate::context::Context;
use crate::endpoint::{self, CALLBACK_MARKER};
use crate::handler::{HandlerFn, HandlerResult, MiddlewareFn};
use crate::message::Message;
use crate::update::{Update, UpdateKind};

/// A command token parsed out of message text.
#[derive(Debug, PartialEq)]
pub(crate) struct ParsedCommand {
    /// The command itself, slash included.
    pub endpoint: String,
    /// The `@botname` suffix, if one was given.
    pub target: Option<String>,
    /// Everything after the command token, `\n` sequences unescaped.
    pub payload: String,
}

/// Parses `/cmd@botname payload` out of message text. Returns `None` when
/// the text is not a command at all.
pub(crate) fn parse_command(text: &str) -> Option<ParsedCommand> {
    if !text.starts_with('/') {
        return None;
    }
    let (endpoint, target, payload) = match text.split_once('@') {
        Some((cmd, rest)) => {
            let (name, payload) = match rest.split_once(' ') {
                Some((name, payload)) => (name, payload),
                None => (rest, ""),
            };
            (cmd, Some(name.to_string()), payload)
        }
        None => match text.split_once(' ') {
            Some((cmd, payload)) => (cmd, None, payload),
            None => (text, None, ""),
        },
    };
    if endpoint.len() < 2
        || !endpoint[1..].chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        return None;
    }
    Some(ParsedCommand {
        endpoint: endpoint.to_string(),
        target,
        payload: payload.replace("\\n", "\n"),
    })
}

/// Runs the middleware chain, then the terminal handler.
///
/// The proceed flag starts false and is consumed before every step: only
/// the first middleware runs unconditionally, each later one requires the
/// previous to have called [`Context::next`]. A middleware error aborts the
/// chain and skips the terminal handler. When middleware exists, the
/// terminal handler itself is gated on the last step's proceed signal.
pub(crate) async fn run_chain(
    ctx: &Context,
    middleware: &[MiddlewareFn],
    terminal: &HandlerFn,
) -> HandlerResult {
    for (i, step) in middleware.iter().enumerate() {
        if i != 0 && !ctx.proceeding() {
            return Ok(());
        }
        ctx.reset_next();
        step(ctx.clone()).await?;
    }
    if !middleware.is_empty() && !ctx.proceeding() {
        return Ok(());
    }
    terminal(ctx.clone()).await
}

impl Bot {
    /// Classifies one update and runs the matching handler, if any.
    /// Returns whether a handler ran. Never fails: handler errors go to the
    /// error sink, unmatched updates simply return false.
    pub async fn process_update(&self, update: Update) -> bool {
        let id = update.id;
        match update.kind {
            UpdateKind::Message(msg) => self.process_message(id, msg).await,
            UpdateKind::EditedMessage(msg) => {
                self.try_handle(endpoint::ON_EDITED, id, UpdateKind::EditedMessage(msg)).await
            }
            UpdateKind::ChannelPost(msg) => {
                let end = if msg.pinned.is_some() {
                    endpoint::ON_PINNED
                } else {
                    endpoint::ON_CHANNEL_POST
                };
                self.try_handle(end, id, UpdateKind::ChannelPost(msg)).await
            }
            UpdateKind::EditedChannelPost(msg) => {
                self.try_handle(
                    endpoint::ON_EDITED_CHANNEL_POST,
                    id,
                    UpdateKind::EditedChannelPost(msg),
                )
                .await
            }
            UpdateKind::Callback(mut cb) => {
                if let Some(data) = cb.data.strip_prefix(CALLBACK_MARKER) {
                    let (unique, payload) = match data.split_once('|') {
                        Some((unique, payload)) => (unique.to_string(), payload.to_string()),
                        None => (data.to_string(), String::new()),
                    };
                    let end = format!("{CALLBACK_MARKER}{unique}");
                    if self.registered(&end) {
                        cb.unique = unique;
                        cb.data = payload;
                        return self.try_handle(&end, id, UpdateKind::Callback(cb)).await;
                    }
                }
                self.try_handle(endpoint::ON_CALLBACK, id, UpdateKind::Callback(cb)).await
            }
            UpdateKind::Query(q) => {
                self.try_handle(endpoint::ON_QUERY, id, UpdateKind::Query(q)).await
            }
            UpdateKind::InlineResult(r) => {
                self.try_handle(endpoint::ON_INLINE_RESULT, id, UpdateKind::InlineResult(r)).await
            }
            UpdateKind::ShippingQuery(s) => {
                self.try_handle(endpoint::ON_SHIPPING, id, UpdateKind::ShippingQuery(s)).await
            }
            UpdateKind::PreCheckoutQuery(p) => {
                self.try_handle(endpoint::ON_CHECKOUT, id, UpdateKind::PreCheckoutQuery(p)).await
            }
            UpdateKind::Poll(p) => {
                self.try_handle(endpoint::ON_POLL, id, UpdateKind::Poll(p)).await
            }
            UpdateKind::PollAnswer(a) => {
                self.try_handle(endpoint::ON_POLL_ANSWER, id, UpdateKind::PollAnswer(a)).await
            }
            UpdateKind::MyChatMember(u) => {
                self.try_handle(endpoint::ON_MY_CHAT_MEMBER, id, UpdateKind::MyChatMember(u)).await
            }
            UpdateKind::ChatMember(u) => {
                self.try_handle(endpoint::ON_CHAT_MEMBER, id, UpdateKind::ChatMember(u)).await
            }
            UpdateKind::ChatJoinRequest(j) => {
                self.try_handle(endpoint::ON_CHAT_JOIN_REQUEST, id, UpdateKind::ChatJoinRequest(j))
                    .await
            }
            UpdateKind::None => false,
        }
    }

    async fn process_message(&self, id: i64, mut msg: Message) -> bool {
        use endpoint::*;

        if msg.pinned.is_some() {
            return self.try_handle(ON_PINNED, id, UpdateKind::Message(msg)).await;
        }

        if !msg.text.is_empty() {
            // Synthetic endpoint keys must never arrive as user text.
            if msg.text.starts_with(SENTINEL) {
                return true;
            }
            if let Some(cmd) = parse_command(&msg.text) {
                if let Some(target) = &cmd.target {
                    let me = self.username();
                    if !target.eq_ignore_ascii_case(&me) {
                        return false;
                    }
                }
                msg.payload = cmd.payload;
                if self.registered(&cmd.endpoint) {
                    return self
                        .try_handle(&cmd.endpoint, id, UpdateKind::Message(msg))
                        .await;
                }
            }
            let text = msg.text.clone();
            if self.registered(&text) {
                return self.try_handle(&text, id, UpdateKind::Message(msg)).await;
            }
            return self.try_handle(ON_TEXT, id, UpdateKind::Message(msg)).await;
        }

        if msg.has_media() {
            return self.handle_media(id, msg).await;
        }

        if msg.contact.is_some() {
            return self.try_handle(ON_CONTACT, id, UpdateKind::Message(msg)).await;
        }
        if msg.location.is_some() {
            return self.try_handle(ON_LOCATION, id, UpdateKind::Message(msg)).await;
        }
        if msg.venue.is_some() {
            return self.try_handle(ON_VENUE, id, UpdateKind::Message(msg)).await;
        }
        if msg.game.is_some() {
            return self.try_handle(ON_GAME, id, UpdateKind::Message(msg)).await;
        }
        if msg.dice.is_some() {
            return self.try_handle(ON_DICE, id, UpdateKind::Message(msg)).await;
        }
        if msg.invoice.is_some() {
            return self.try_handle(ON_INVOICE, id, UpdateKind::Message(msg)).await;
        }
        if msg.payment.is_some() {
            return self.try_handle(ON_PAYMENT, id, UpdateKind::Message(msg)).await;
        }
        if msg.topic_created.is_some() {
            return self.try_handle(ON_TOPIC_CREATED, id, UpdateKind::Message(msg)).await;
        }
        if msg.topic_reopened.is_some() {
            return self.try_handle(ON_TOPIC_REOPENED, id, UpdateKind::Message(msg)).await;
        }
        if msg.topic_closed.is_some() {
            return self.try_handle(ON_TOPIC_CLOSED, id, UpdateKind::Message(msg)).await;
        }
        if msg.topic_edited.is_some() {
            return self.try_handle(ON_TOPIC_EDITED, id, UpdateKind::Message(msg)).await;
        }
        if msg.general_topic_hidden.is_some() {
            return self.try_handle(ON_GENERAL_TOPIC_HIDDEN, id, UpdateKind::Message(msg)).await;
        }
        if msg.general_topic_unhidden.is_some() {
            return self
                .try_handle(ON_GENERAL_TOPIC_UNHIDDEN, id, UpdateKind::Message(msg))
                .await;
        }
        if msg.write_access_allowed.is_some() {
            return self.try_handle(ON_WRITE_ACCESS_ALLOWED, id, UpdateKind::Message(msg)).await;
        }

        let me = self.me().id;
        let was_added = msg.group_created
            || msg.supergroup_created
            || msg.user_joined.as_ref().is_some_and(|u| u.id == me)
            || msg
                .users_joined
                .as_ref()
                .is_some_and(|users| users.iter().any(|u| u.id == me));
        if was_added {
            return self.try_handle(ON_ADDED_TO_GROUP, id, UpdateKind::Message(msg)).await;
        }
        if msg.user_joined.is_some() {
            return self.try_handle(ON_USER_JOINED, id, UpdateKind::Message(msg)).await;
        }
        if let Some(users) = msg.users_joined.take() {
            // One invocation per joined user, each rewritten to the
            // single-user shape.
            let mut handled = false;
            for user in users {
                let mut one = msg.clone();
                one.user_joined = Some(user);
                handled |= self.try_handle(ON_USER_JOINED, id, UpdateKind::Message(one)).await;
            }
            return handled;
        }
        if msg.user_left.is_some() {
            return self.try_handle(ON_USER_LEFT, id, UpdateKind::Message(msg)).await;
        }
        if !msg.new_group_title.is_empty() {
            return self.try_handle(ON_NEW_GROUP_TITLE, id, UpdateKind::Message(msg)).await;
        }
        if msg.new_group_photo.is_some() {
            return self.try_handle(ON_NEW_GROUP_PHOTO, id, UpdateKind::Message(msg)).await;
        }
        if msg.group_photo_deleted {
            return self.try_handle(ON_GROUP_PHOTO_DELETED, id, UpdateKind::Message(msg)).await;
        }
        if msg.channel_created {
            return self.try_handle(ON_CHANNEL_CREATED, id, UpdateKind::Message(msg)).await;
        }
        if msg.migrate_to.is_some() {
            msg.migrate_from = Some(msg.chat.id);
            return self.try_handle(ON_MIGRATION, id, UpdateKind::Message(msg)).await;
        }

        if msg.video_chat_started.is_some() {
            return self.try_handle(ON_VIDEO_CHAT_STARTED, id, UpdateKind::Message(msg)).await;
        }
        if msg.video_chat_ended.is_some() {
            return self.try_handle(ON_VIDEO_CHAT_ENDED, id, UpdateKind::Message(msg)).await;
        }
        if msg.video_chat_participants.is_some() {
            return self
                .try_handle(ON_VIDEO_CHAT_PARTICIPANTS, id, UpdateKind::Message(msg))
                .await;
        }
        if msg.video_chat_scheduled.is_some() {
            return self.try_handle(ON_VIDEO_CHAT_SCHEDULED, id, UpdateKind::Message(msg)).await;
        }
        if msg.web_app_data.is_some() {
            return self.try_handle(ON_WEB_APP, id, UpdateKind::Message(msg)).await;
        }
        if msg.proximity_alert.is_some() {
            return self.try_handle(ON_PROXIMITY_ALERT, id, UpdateKind::Message(msg)).await;
        }
        if msg.auto_delete_timer.is_some() {
            return self.try_handle(ON_AUTO_DELETE_TIMER, id, UpdateKind::Message(msg)).await;
        }

        false
    }

    /// Dispatches the message's single media attachment: the specific
    /// category first, the generic media category as catch-all.
    async fn handle_media(&self, id: i64, msg: Message) -> bool {
        use endpoint::*;

        let specific = if msg.photo.is_some() {
            ON_PHOTO
        } else if msg.voice.is_some() {
            ON_VOICE
        } else if msg.audio.is_some() {
            ON_AUDIO
        } else if msg.animation.is_some() {
            ON_ANIMATION
        } else if msg.document.is_some() {
            ON_DOCUMENT
        } else if msg.sticker.is_some() {
            ON_STICKER
        } else if msg.video.is_some() {
            ON_VIDEO
        } else {
            ON_VIDEO_NOTE
        };
        if self.registered(specific) {
            return self.try_handle(specific, id, UpdateKind::Message(msg)).await;
        }
        self.try_handle(ON_MEDIA, id, UpdateKind::Message(msg)).await
    }

    /// Looks up `endpoint` and, if registered, runs its handler over a fresh
    /// context. In synchronous mode this returns after the handler (and
    /// context release) completes; otherwise the unit of work is spawned on
    /// the bot's task tracker and this returns immediately.
    async fn try_handle(&self, endpoint: &str, id: i64, kind: UpdateKind) -> bool {
        let Some((handler, middleware)) = self.lookup(endpoint) else {
            return false;
        };
        let ctx = self.acquire_context(Update { id, kind });
        let bot = self.clone();
        let unit = async move {
            if let Err(err) = run_chain(&ctx, &middleware, &handler).await {
                bot.sink_error(&err, Some(&ctx));
            }
            bot.release_context(ctx);
        };
        if self.synchronous() {
            unit.await;
        } else {
            self.tracker().spawn(unit);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use crate::bot::Bot;
    use crate::error::ApiError;
    use crate::handler::{handler, middleware};
    use crate::types::{Callback, User};

    async fn bot_named(username: &str) -> Bot {
        Bot::builder("TEST_TOKEN")
            .offline()
            .synchronous(true)
            .me(User {
                id: 1000,
                is_bot: true,
                first_name: "Test".into(),
                username: Some(username.into()),
                ..Default::default()
            })
            .build()
            .await
            .unwrap()
    }

    fn text_update(id: i64, text: &str) -> Update {
        Update {
            id,
            kind: UpdateKind::Message(Message { id, text: text.into(), ..Default::default() }),
        }
    }

    fn log_handler(log: Arc<Mutex<Vec<String>>>, tag: &str) -> crate::handler::HandlerFn {
        let tag = tag.to_string();
        handler(move |_ctx| {
            let log = log.clone();
            let tag = tag.clone();
            async move {
                log.lock().push(tag);
                Ok(())
            }
        })
    }

    #[test]
    fn command_tokenizer() {
        let cmd = parse_command("/start@MyBot hello world").unwrap();
        assert_eq!(cmd.endpoint, "/start");
        assert_eq!(cmd.target.as_deref(), Some("MyBot"));
        assert_eq!(cmd.payload, "hello world");

        let cmd = parse_command("/help").unwrap();
        assert_eq!(cmd.endpoint, "/help");
        assert_eq!(cmd.target, None);
        assert_eq!(cmd.payload, "");

        let cmd = parse_command("/note first\\nsecond").unwrap();
        assert_eq!(cmd.payload, "first\nsecond");

        assert!(parse_command("hello /start").is_none());
        assert!(parse_command("/").is_none());
        assert!(parse_command("/bad cmd!").is_some()); // payload may be anything
        assert!(parse_command("/bad!name").is_none());
    }

    #[tokio::test]
    async fn unmatched_text_is_not_handled() {
        let bot = bot_named("MyBot").await;
        assert!(!bot.process_update(text_update(1, "just some text")).await);
    }

    #[tokio::test]
    async fn command_for_other_bot_is_dropped() {
        let bot = bot_named("MyBot").await;
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        bot.handle("/start", handler(move |_| {
            let hits = hits2.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }), vec![]);

        assert!(!bot.process_update(text_update(1, "/start@OtherBot extra")).await);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn command_for_me_carries_payload() {
        let bot = bot_named("MyBot").await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bot.handle("/start", handler(move |ctx| {
            let seen = seen2.clone();
            async move {
                let payload = match &ctx.update().kind {
                    UpdateKind::Message(m) => m.payload.clone(),
                    _ => String::new(),
                };
                seen.lock().push(payload);
                Ok(())
            }
        }), vec![]);

        assert!(bot.process_update(text_update(1, "/start@MyBot hello world")).await);
        assert_eq!(*seen.lock(), vec!["hello world"]);
    }

    #[tokio::test]
    async fn exact_text_beats_text_category() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));
        bot.handle("ping", log_handler(log.clone(), "exact"), vec![]);
        bot.handle(endpoint::ON_TEXT, log_handler(log.clone(), "generic"), vec![]);

        assert!(bot.process_update(text_update(1, "ping")).await);
        assert!(bot.process_update(text_update(2, "pong")).await);
        assert_eq!(*log.lock(), vec!["exact", "generic"]);
    }

    #[tokio::test]
    async fn sentinel_text_is_swallowed() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));
        bot.handle(endpoint::ON_TEXT, log_handler(log.clone(), "text"), vec![]);

        assert!(bot.process_update(text_update(1, "\u{7}text")).await);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn callback_data_is_rewritten() {
        let bot = bot_named("MyBot").await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bot.handle("\u{c}myUnique", handler(move |ctx| {
            let seen = seen2.clone();
            async move {
                let cb = ctx.callback().cloned().unwrap();
                let args: Vec<String> = ctx.args().iter().map(|s| s.to_string()).collect();
                seen.lock().push((cb.unique, cb.data, args));
                Ok(())
            }
        }), vec![]);

        let update = Update {
            id: 1,
            kind: UpdateKind::Callback(Callback {
                id: "cb".into(),
                data: "\u{c}myUnique|p1|p2".into(),
                ..Default::default()
            }),
        };
        assert!(bot.process_update(update).await);
        let seen = seen.lock();
        assert_eq!(seen[0].0, "myUnique");
        assert_eq!(seen[0].1, "p1|p2");
        assert_eq!(seen[0].2, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn unregistered_unique_falls_back_to_callback_category() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));
        bot.handle(endpoint::ON_CALLBACK, log_handler(log.clone(), "generic"), vec![]);

        let update = Update {
            id: 1,
            kind: UpdateKind::Callback(Callback {
                data: "\u{c}unknown|x".into(),
                ..Default::default()
            }),
        };
        assert!(bot.process_update(update).await);
        assert_eq!(*log.lock(), vec!["generic"]);
    }

    #[tokio::test]
    async fn middleware_short_circuits_without_error() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(AtomicUsize::new(0));

        let a = {
            let log = log.clone();
            middleware(move |_ctx| {
                let log = log.clone();
                async move {
                    log.lock().push("A".to_string());
                    Ok(()) // never calls next()
                }
            })
        };
        let b = {
            let log = log.clone();
            middleware(move |ctx| {
                let log = log.clone();
                async move {
                    log.lock().push("B".to_string());
                    ctx.next()
                }
            })
        };
        let errors2 = errors.clone();
        bot.on_error(Arc::new(move |_, _| {
            errors2.fetch_add(1, Ordering::SeqCst);
        }));
        bot.handle(endpoint::ON_TEXT, log_handler(log.clone(), "terminal"), vec![a, b]);

        assert!(bot.process_update(text_update(1, "hi")).await);
        assert_eq!(*log.lock(), vec!["A"]);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn middleware_error_reaches_sink_once_and_skips_terminal() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(AtomicUsize::new(0));

        let failing = middleware(|_ctx| async { Err(ApiError::other("denied")) });
        let errors2 = errors.clone();
        bot.on_error(Arc::new(move |err, _| {
            assert_eq!(err.to_string(), "denied");
            errors2.fetch_add(1, Ordering::SeqCst);
        }));
        bot.handle(endpoint::ON_TEXT, log_handler(log.clone(), "terminal"), vec![failing]);

        assert!(bot.process_update(text_update(1, "hi")).await);
        assert!(log.lock().is_empty());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn chain_runs_in_order_when_all_proceed() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));

        let step = |tag: &str| {
            let log = log.clone();
            let tag = tag.to_string();
            middleware(move |ctx| {
                let log = log.clone();
                let tag = tag.clone();
                async move {
                    log.lock().push(tag);
                    ctx.next()
                }
            })
        };
        bot.handle(
            endpoint::ON_TEXT,
            log_handler(log.clone(), "terminal"),
            vec![step("A"), step("B")],
        );

        assert!(bot.process_update(text_update(1, "hi")).await);
        assert_eq!(*log.lock(), vec!["A", "B", "terminal"]);
    }

    #[tokio::test]
    async fn synchronous_mode_preserves_order() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));
        bot.handle(endpoint::ON_TEXT, {
            let log = log.clone();
            handler(move |ctx| {
                let log = log.clone();
                async move {
                    log.lock().push(ctx.update().id);
                    Ok(())
                }
            })
        }, vec![]);

        for id in [1, 2, 3] {
            bot.process_update(text_update(id, "tick")).await;
        }
        assert_eq!(*log.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn each_joined_user_dispatches_once() {
        let bot = bot_named("MyBot").await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bot.handle(endpoint::ON_USER_JOINED, handler(move |ctx| {
            let seen = seen2.clone();
            async move {
                let joined = match &ctx.update().kind {
                    UpdateKind::Message(m) => m.user_joined.clone().unwrap(),
                    _ => unreachable!(),
                };
                seen.lock().push(joined.id);
                Ok(())
            }
        }), vec![]);

        let msg = Message {
            users_joined: Some(vec![
                User { id: 11, ..Default::default() },
                User { id: 12, ..Default::default() },
                User { id: 13, ..Default::default() },
            ]),
            ..Default::default()
        };
        assert!(bot.process_update(Update { id: 1, kind: UpdateKind::Message(msg) }).await);
        assert_eq!(*seen.lock(), vec![11, 12, 13]);
    }

    #[tokio::test]
    async fn bot_in_joined_list_means_added_to_group() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));
        bot.handle(endpoint::ON_ADDED_TO_GROUP, log_handler(log.clone(), "added"), vec![]);
        bot.handle(endpoint::ON_USER_JOINED, log_handler(log.clone(), "joined"), vec![]);

        let msg = Message {
            users_joined: Some(vec![
                User { id: 11, ..Default::default() },
                User { id: 1000, ..Default::default() }, // the bot itself
            ]),
            ..Default::default()
        };
        assert!(bot.process_update(Update { id: 1, kind: UpdateKind::Message(msg) }).await);
        assert_eq!(*log.lock(), vec!["added"]);
    }

    #[tokio::test]
    async fn topic_created_uses_its_own_field() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));
        bot.handle(endpoint::ON_TOPIC_CREATED, log_handler(log.clone(), "created"), vec![]);
        bot.handle(endpoint::ON_TOPIC_CLOSED, log_handler(log.clone(), "closed"), vec![]);

        let msg = Message {
            topic_created: Some(crate::types::TopicCreated {
                name: "general".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(bot.process_update(Update { id: 1, kind: UpdateKind::Message(msg) }).await);

        let msg = Message { topic_closed: Some(Default::default()), ..Default::default() };
        assert!(bot.process_update(Update { id: 2, kind: UpdateKind::Message(msg) }).await);

        assert_eq!(*log.lock(), vec!["created", "closed"]);
    }

    #[tokio::test]
    async fn specific_media_beats_generic() {
        let bot = bot_named("MyBot").await;
        let log = Arc::new(Mutex::new(Vec::new()));
        bot.handle(endpoint::ON_PHOTO, log_handler(log.clone(), "photo"), vec![]);
        bot.handle(endpoint::ON_MEDIA, log_handler(log.clone(), "media"), vec![]);

        let photo = Message { photo: Some(vec![Default::default()]), ..Default::default() };
        let voice = Message { voice: Some(Default::default()), ..Default::default() };
        assert!(bot.process_update(Update { id: 1, kind: UpdateKind::Message(photo) }).await);
        assert!(bot.process_update(Update { id: 2, kind: UpdateKind::Message(voice) }).await);
        assert_eq!(*log.lock(), vec!["photo", "media"]);
    }

    #[tokio::test]
    async fn migration_fills_source_chat() {
        let bot = bot_named("MyBot").await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bot.handle(endpoint::ON_MIGRATION, handler(move |ctx| {
            let seen = seen2.clone();
            async move {
                if let UpdateKind::Message(m) = &ctx.update().kind {
                    seen.lock().push((m.migrate_from, m.migrate_to));
                }
                Ok(())
            }
        }), vec![]);

        let msg = Message {
            chat: crate::types::Chat { id: -42, ..Default::default() },
            migrate_to: Some(-100),
            ..Default::default()
        };
        assert!(bot.process_update(Update { id: 1, kind: UpdateKind::Message(msg) }).await);
        assert_eq!(*seen.lock(), vec![(Some(-42), Some(-100))]);
    }
}
