//! Per-update request context, recycled through an engine-owned pool.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::bot::Bot;
use crate::error::ApiError;
use crate::handler::HandlerResult;
use crate::message::Message;
use crate::types::{
    Callback, Chat, ChatJoinRequest, ChatMemberUpdate, InlineResult, Poll, PollAnswer,
    PreCheckoutQuery, Query, ShippingQuery, User,
};
use crate::update::{Update, UpdateKind};

/// The state behind a [`Context`]. Mutated only while uniquely held, which
/// the pool guarantees at acquire and release time.
pub(crate) struct ContextInner {
    bot: Option<Bot>,
    update: Update,
    /// Set by [`Context::next`], consumed by the middleware runner before
    /// each chain step.
    proceeding: AtomicBool,
    /// Lazily allocated key/value store scoped to this update.
    store: RwLock<Option<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

impl ContextInner {
    fn fresh(bot: Bot, update: Update) -> Self {
        ContextInner {
            bot: Some(bot),
            update,
            proceeding: AtomicBool::new(false),
            store: RwLock::new(None),
        }
    }
}

/// Everything a handler needs about the update it is serving.
///
/// Cloning is cheap; clones share the same state. A clone held past the end
/// of its handler keeps the state alive and simply prevents the pool from
/// recycling it.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("update_id", &self.inner.update.id).finish()
    }
}

impl Context {
    /// The bot serving this update.
    pub fn bot(&self) -> Result<Bot, ApiError> {
        self.inner.bot.clone().ok_or(ApiError::BadContext("bot"))
    }

    /// The raw update.
    pub fn update(&self) -> &Update {
        &self.inner.update
    }

    /// The message behind this update, if any. For callback updates this is
    /// the message the pressed button was attached to.
    pub fn message(&self) -> Option<&Message> {
        match &self.inner.update.kind {
            UpdateKind::Message(m)
            | UpdateKind::EditedMessage(m)
            | UpdateKind::ChannelPost(m)
            | UpdateKind::EditedChannelPost(m) => Some(m),
            UpdateKind::Callback(c) => c.message.as_deref(),
            _ => None,
        }
    }

    pub fn callback(&self) -> Option<&Callback> {
        match &self.inner.update.kind {
            UpdateKind::Callback(c) => Some(c),
            _ => None,
        }
    }

    pub fn query(&self) -> Option<&Query> {
        match &self.inner.update.kind {
            UpdateKind::Query(q) => Some(q),
            _ => None,
        }
    }

    pub fn inline_result(&self) -> Option<&InlineResult> {
        match &self.inner.update.kind {
            UpdateKind::InlineResult(r) => Some(r),
            _ => None,
        }
    }

    pub fn shipping_query(&self) -> Option<&ShippingQuery> {
        match &self.inner.update.kind {
            UpdateKind::ShippingQuery(s) => Some(s),
            _ => None,
        }
    }

    pub fn pre_checkout_query(&self) -> Option<&PreCheckoutQuery> {
        match &self.inner.update.kind {
            UpdateKind::PreCheckoutQuery(p) => Some(p),
            _ => None,
        }
    }

    pub fn poll(&self) -> Option<&Poll> {
        match &self.inner.update.kind {
            UpdateKind::Poll(p) => Some(p),
            _ => None,
        }
    }

    pub fn poll_answer(&self) -> Option<&PollAnswer> {
        match &self.inner.update.kind {
            UpdateKind::PollAnswer(a) => Some(a),
            _ => None,
        }
    }

    pub fn chat_member(&self) -> Option<&ChatMemberUpdate> {
        match &self.inner.update.kind {
            UpdateKind::MyChatMember(u) | UpdateKind::ChatMember(u) => Some(u),
            _ => None,
        }
    }

    pub fn chat_join_request(&self) -> Option<&ChatJoinRequest> {
        match &self.inner.update.kind {
            UpdateKind::ChatJoinRequest(j) => Some(j),
            _ => None,
        }
    }

    /// The user responsible for this update, wherever it came from.
    pub fn sender(&self) -> Option<&User> {
        match &self.inner.update.kind {
            UpdateKind::Callback(c) => Some(&c.sender),
            UpdateKind::Query(q) => Some(&q.sender),
            UpdateKind::InlineResult(r) => Some(&r.sender),
            UpdateKind::ShippingQuery(s) => Some(&s.sender),
            UpdateKind::PreCheckoutQuery(p) => Some(&p.sender),
            UpdateKind::PollAnswer(a) => Some(&a.sender),
            UpdateKind::MyChatMember(u) | UpdateKind::ChatMember(u) => Some(&u.sender),
            UpdateKind::ChatJoinRequest(j) => Some(&j.sender),
            _ => self.message().and_then(|m| m.sender.as_ref()),
        }
    }

    /// The chat this update belongs to, if any.
    pub fn chat(&self) -> Option<&Chat> {
        match &self.inner.update.kind {
            UpdateKind::MyChatMember(u) | UpdateKind::ChatMember(u) => Some(&u.chat),
            UpdateKind::ChatJoinRequest(j) => Some(&j.chat),
            _ => self.message().map(|m| &m.chat),
        }
    }

    /// The message text, or its caption when there is no text.
    pub fn text(&self) -> &str {
        match self.message() {
            Some(m) if !m.text.is_empty() => &m.text,
            Some(m) => &m.caption,
            None => "",
        }
    }

    /// The free-form data carried by this update: callback payload, inline
    /// query text, chosen-result query, or invoice payload.
    pub fn data(&self) -> &str {
        match &self.inner.update.kind {
            UpdateKind::Callback(c) => &c.data,
            UpdateKind::Query(q) => &q.text,
            UpdateKind::InlineResult(r) => &r.query,
            UpdateKind::ShippingQuery(s) => &s.payload,
            UpdateKind::PreCheckoutQuery(p) => &p.payload,
            _ => "",
        }
    }

    /// Splits the update's payload into arguments: command payloads on
    /// whitespace, callback data on `|`, inline query text on whitespace.
    pub fn args(&self) -> Vec<&str> {
        match &self.inner.update.kind {
            UpdateKind::Message(m) => {
                let payload = m.payload.trim();
                if payload.is_empty() { Vec::new() } else { payload.split_whitespace().collect() }
            }
            UpdateKind::Callback(c) => {
                if c.data.is_empty() { Vec::new() } else { c.data.split('|').collect() }
            }
            UpdateKind::Query(q) => q.text.split_whitespace().collect(),
            _ => Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Middleware chain control
    // -------------------------------------------------------------------------

    /// Lets the chain proceed to the next middleware (or the handler).
    /// Returning this from middleware reads naturally: `return ctx.next()`.
    pub fn next(&self) -> HandlerResult {
        self.inner.proceeding.store(true, Ordering::Release);
        Ok(())
    }

    pub(crate) fn proceeding(&self) -> bool {
        self.inner.proceeding.load(Ordering::Acquire)
    }

    pub(crate) fn reset_next(&self) {
        self.inner.proceeding.store(false, Ordering::Release);
    }

    // -------------------------------------------------------------------------
    // Key/value store
    // -------------------------------------------------------------------------

    /// Stores a value under `key`, visible to every later step of this
    /// update's processing.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        let mut store = self.inner.store.write();
        store.get_or_insert_with(HashMap::new).insert(key.into(), Arc::new(value));
    }

    /// Fetches a value stored under `key`, if it exists and has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let store = self.inner.store.read();
        store.as_ref()?.get(key)?.clone().downcast::<T>().ok()
    }

    // -------------------------------------------------------------------------
    // API shortcuts
    // -------------------------------------------------------------------------

    /// Sends `text` to this update's chat.
    pub async fn send(&self, text: impl Into<String>) -> Result<Message, ApiError> {
        let chat = self.chat().cloned().ok_or(ApiError::BadContext("chat"))?;
        self.bot()?.send(&chat, text, &Default::default()).await
    }

    /// Replies to this update's message.
    pub async fn reply(&self, text: impl Into<String>) -> Result<Message, ApiError> {
        let msg = self.message().cloned().ok_or(ApiError::BadContext("message"))?;
        self.bot()?.reply(&msg, text, &Default::default()).await
    }

    /// Answers the pending callback query, with an optional alert text.
    pub async fn respond(&self, text: Option<&str>) -> Result<(), ApiError> {
        let cb = self.callback().cloned().ok_or(ApiError::BadContext("callback"))?;
        self.bot()?.respond(&cb, text).await
    }

    /// Deletes this update's message.
    pub async fn delete(&self) -> Result<(), ApiError> {
        let msg = self.message().cloned().ok_or(ApiError::BadContext("message"))?;
        self.bot()?.delete(&msg).await
    }

    /// Edits this update's message text. Handy for callback handlers that
    /// rewrite the message their button was attached to.
    pub async fn edit(&self, text: impl Into<String>) -> Result<Message, ApiError> {
        let msg = self.message().cloned().ok_or(ApiError::BadContext("message"))?;
        self.bot()?.edit_text(&msg, text, &Default::default()).await
    }

    /// Forwards this update's message to another recipient.
    pub async fn forward_to(&self, to: &dyn crate::types::Recipient) -> Result<Message, ApiError> {
        let msg = self.message().cloned().ok_or(ApiError::BadContext("message"))?;
        self.bot()?.forward(to, &msg).await
    }

    /// Shows a chat action ("typing…") in this update's chat.
    pub async fn notify(&self, action: crate::types::ChatAction) -> Result<(), ApiError> {
        let chat = self.chat().cloned().ok_or(ApiError::BadContext("chat"))?;
        self.bot()?.notify(&chat, action).await
    }

    /// Deletes this update's message after a delay, without blocking the
    /// handler. Deletion failures go to the error sink; the returned handle
    /// can abort the timer.
    pub fn delete_after(&self, delay: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let ctx = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = ctx.delete().await {
                if let Ok(bot) = ctx.bot() {
                    bot.sink_error(&err, Some(&ctx));
                }
            }
        })
    }
}

/// Engine-owned free list of context state.
///
/// Only uniquely-held state is recycled: if a handler kept a clone of its
/// context alive, release simply drops our reference and the clone keeps a
/// private, never-reused copy.
pub(crate) struct ContextPool {
    free: Mutex<Vec<Arc<ContextInner>>>,
}

impl ContextPool {
    pub(crate) fn new() -> Self {
        ContextPool { free: Mutex::new(Vec::new()) }
    }

    pub(crate) fn acquire(&self, bot: Bot, update: Update) -> Context {
        if let Some(mut arc) = self.free.lock().pop() {
            if let Some(slot) = Arc::get_mut(&mut arc) {
                slot.bot = Some(bot);
                slot.update = update;
                return Context { inner: arc };
            }
            // A pooled entry is unique by construction; fall through if not.
        }
        Context { inner: Arc::new(ContextInner::fresh(bot, update)) }
    }

    pub(crate) fn release(&self, ctx: Context) {
        let mut arc = ctx.inner;
        if let Some(slot) = Arc::get_mut(&mut arc) {
            slot.bot = None;
            slot.update = Update::default();
            *slot.proceeding.get_mut() = false;
            *slot.store.get_mut() = None;
            self.free.lock().push(arc);
        }
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::Bot;
    use crate::message::Message;

    async fn offline_bot() -> Bot {
        Bot::builder("TEST_TOKEN").offline().build().await.unwrap()
    }

    fn text_update(id: i64, text: &str) -> Update {
        Update {
            id,
            kind: UpdateKind::Message(Message { id, text: text.into(), ..Default::default() }),
        }
    }

    #[tokio::test]
    async fn release_recycles_unique_state() {
        let bot = offline_bot().await;
        let pool = ContextPool::new();

        let ctx = pool.acquire(bot.clone(), text_update(1, "a"));
        ctx.set("k", 7_i32);
        let _ = ctx.next();
        pool.release(ctx);
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire(bot, text_update(2, "b"));
        assert_eq!(pool.idle(), 0);
        assert!(ctx.get::<i32>("k").is_none(), "store must be cleared on release");
        assert!(!ctx.proceeding(), "proceed flag must be cleared on release");
        assert_eq!(ctx.update().id, 2);
    }

    #[tokio::test]
    async fn retained_clone_is_never_recycled() {
        let bot = offline_bot().await;
        let pool = ContextPool::new();

        let ctx = pool.acquire(bot, text_update(3, "kept"));
        ctx.set("k", String::from("mine"));
        let kept = ctx.clone();
        pool.release(ctx);

        assert_eq!(pool.idle(), 0, "shared state must not enter the pool");
        assert_eq!(kept.text(), "kept");
        assert_eq!(*kept.get::<String>("k").unwrap(), "mine");
    }

    #[tokio::test]
    async fn args_split_per_update_kind() {
        let bot = offline_bot().await;
        let pool = ContextPool::new();

        let mut msg = Message { text: "/greet hello world".into(), ..Default::default() };
        msg.payload = "hello world".into();
        let ctx = pool.acquire(bot.clone(), Update { id: 1, kind: UpdateKind::Message(msg) });
        assert_eq!(ctx.args(), vec!["hello", "world"]);

        let cb = Callback { data: "p1|p2".into(), ..Default::default() };
        let ctx = pool.acquire(bot, Update { id: 2, kind: UpdateKind::Callback(cb) });
        assert_eq!(ctx.args(), vec!["p1", "p2"]);
    }
}
