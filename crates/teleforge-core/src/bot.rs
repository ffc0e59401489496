//! The bot engine: configuration, registration, the dispatch loop, and the
//! thin wrappers over the platform API.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::codec::{Codec, JsonCodec};
use crate::context::{Context, ContextPool};
use crate::endpoint::IntoEndpoint;
use crate::error::{ApiError, ErrorSink, default_error_sink};
use crate::handler::{HandlerFn, MiddlewareFn};
use crate::message::Message;
use crate::options::SendOptions;
use crate::registry::Registry;
use crate::source::UpdateSource;
use crate::transport::{ApiRequest, NullTransport, RequestBody, Transport};
use crate::types::{
    BotCommand, Callback, ChatAction, ChatJoinRequest, ParseMode, Recipient, User,
};
use crate::update::Update;

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_UPDATE_BUFFER: usize = 100;

/// Configures and builds a [`Bot`].
pub struct BotBuilder {
    token: String,
    api_url: String,
    updates: usize,
    synchronous: bool,
    await_tasks_on_stop: bool,
    offline: bool,
    me: Option<User>,
    parse_mode: Option<ParseMode>,
    transport: Option<Arc<dyn Transport>>,
    codec: Option<Arc<dyn Codec>>,
    source: Option<Arc<dyn UpdateSource>>,
    on_error: Option<ErrorSink>,
}

impl BotBuilder {
    fn new(token: impl Into<String>) -> Self {
        BotBuilder {
            token: token.into(),
            api_url: DEFAULT_API_URL.into(),
            updates: DEFAULT_UPDATE_BUFFER,
            synchronous: false,
            await_tasks_on_stop: false,
            offline: false,
            me: None,
            parse_mode: None,
            transport: None,
            codec: None,
            source: None,
            on_error: None,
        }
    }

    /// Overrides the API base URL, e.g. for a local Bot API server.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Capacity of the internal update channel.
    pub fn updates(mut self, capacity: usize) -> Self {
        self.updates = capacity;
        self
    }

    /// When true, updates are processed one at a time, in order. When
    /// false (the default), each handler runs as its own task.
    pub fn synchronous(mut self, yes: bool) -> Self {
        self.synchronous = yes;
        self
    }

    /// When true, [`Bot::stop`] waits for in-flight handler tasks to finish
    /// instead of leaving them to run out on their own.
    pub fn await_tasks_on_stop(mut self, yes: bool) -> Self {
        self.await_tasks_on_stop = yes;
        self
    }

    /// Never touches the network: no `getMe` probe at build time, and any
    /// API call fails loudly. Meant for tests.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Provides the bot's own identity up front, skipping the `getMe`
    /// probe.
    pub fn me(mut self, me: User) -> Self {
        self.me = Some(me);
        self
    }

    /// Default parse mode applied to outgoing messages.
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// The producer feeding the dispatch loop. Required before
    /// [`Bot::start`].
    pub fn source(mut self, source: Arc<dyn UpdateSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn on_error(mut self, sink: ErrorSink) -> Self {
        self.on_error = Some(sink);
        self
    }

    /// Builds the bot. Unless offline or given an identity explicitly,
    /// this probes `getMe` to learn the bot's username, which command
    /// routing needs.
    pub async fn build(self) -> Result<Bot, ApiError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None if self.offline => Arc::new(NullTransport),
            None => return Err(ApiError::Other("no transport configured".into())),
        };
        let bot = Bot {
            inner: Arc::new(BotInner {
                token: self.token,
                api_url: self.api_url,
                updates: self.updates,
                synchronous: self.synchronous,
                await_tasks_on_stop: self.await_tasks_on_stop,
                parse_mode: self.parse_mode,
                me: RwLock::new(self.me.unwrap_or_default()),
                fetch_me: !self.offline,
                transport,
                codec: self.codec.unwrap_or_else(|| Arc::new(JsonCodec)),
                source: self.source,
                on_error: RwLock::new(self.on_error.unwrap_or_else(default_error_sink)),
                registry: Registry::new(),
                group_middleware: Mutex::new(Vec::new()),
                pool: ContextPool::new(),
                tracker: TaskTracker::new(),
                stop: Mutex::new(None),
            }),
        };
        if bot.inner.fetch_me && bot.inner.me.read().id == 0 {
            let me = bot.get_me().await?;
            *bot.inner.me.write() = me;
        }
        Ok(bot)
    }
}

#[derive(Clone)]
struct StopHandle {
    cancel: CancellationToken,
    confirm: watch::Receiver<bool>,
}

pub(crate) struct BotInner {
    token: String,
    api_url: String,
    updates: usize,
    synchronous: bool,
    await_tasks_on_stop: bool,
    parse_mode: Option<ParseMode>,
    me: RwLock<User>,
    fetch_me: bool,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    source: Option<Arc<dyn UpdateSource>>,
    on_error: RwLock<ErrorSink>,
    registry: Registry,
    group_middleware: Mutex<Vec<MiddlewareFn>>,
    pool: ContextPool,
    tracker: TaskTracker,
    stop: Mutex<Option<StopHandle>>,
}

/// A bot engine instance. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    /// Starts configuring a bot for the given token.
    pub fn builder(token: impl Into<String>) -> BotBuilder {
        BotBuilder::new(token)
    }

    /// The bot's own identity.
    pub fn me(&self) -> User {
        self.inner.me.read().clone()
    }

    pub(crate) fn username(&self) -> String {
        self.inner.me.read().username.clone().unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Registers `handler` for `endpoint` with optional per-handler
    /// middleware. Engine-level middleware installed via [`Bot::use_middleware`]
    /// is prepended at registration time; later `use_middleware` calls do
    /// not affect handlers already registered.
    pub fn handle(
        &self,
        endpoint: impl IntoEndpoint,
        handler: HandlerFn,
        middleware: Vec<MiddlewareFn>,
    ) {
        let mut chain = self.inner.group_middleware.lock().clone();
        chain.extend(middleware);
        self.inner.registry.register(endpoint.into_endpoint(), handler, chain);
    }

    /// Appends engine-level middleware, applied to every handler
    /// registered afterwards.
    pub fn use_middleware(&self, middleware: MiddlewareFn) {
        self.inner.group_middleware.lock().push(middleware);
    }

    /// A handler group with its own middleware stack.
    pub fn group(&self) -> Group {
        Group { bot: self.clone(), middleware: Vec::new() }
    }

    /// Replaces the error sink.
    pub fn on_error(&self, sink: ErrorSink) {
        *self.inner.on_error.write() = sink;
    }

    // -------------------------------------------------------------------------
    // Runtime control
    // -------------------------------------------------------------------------

    /// Runs the dispatch loop until [`Bot::stop`] is called or the update
    /// source exhausts. Requires a configured source.
    pub async fn start(&self) -> Result<(), ApiError> {
        let source = self
            .inner
            .source
            .clone()
            .ok_or_else(|| ApiError::Other("no update source configured".into()))?;

        let cancel = CancellationToken::new();
        let (confirm_tx, confirm_rx) = watch::channel(false);
        {
            let mut stop = self.inner.stop.lock();
            if stop.is_some() {
                return Err(ApiError::Other("bot is already running".into()));
            }
            *stop = Some(StopHandle { cancel: cancel.clone(), confirm: confirm_rx });
        }

        let (tx, mut rx) = mpsc::channel(self.inner.updates);
        let producer = tokio::spawn({
            let cancel = cancel.clone();
            let bot = self.clone();
            async move { source.run(bot, tx, cancel).await }
        });

        tracing::info!(updates = self.inner.updates, "dispatch loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                update = rx.recv() => match update {
                    Some(update) => {
                        self.process_update(update).await;
                    }
                    None => break,
                },
            }
        }

        cancel.cancel();
        let _ = producer.await;

        if self.inner.await_tasks_on_stop {
            self.inner.tracker.close();
            self.inner.tracker.wait().await;
            self.inner.tracker.reopen();
        }

        let _ = confirm_tx.send(true);
        *self.inner.stop.lock() = None;
        tracing::info!("dispatch loop stopped");
        Ok(())
    }

    /// Signals shutdown and waits until the dispatch loop confirms exit.
    /// A no-op when the bot is not running.
    pub async fn stop(&self) {
        let Some(handle) = self.inner.stop.lock().clone() else {
            return;
        };
        handle.cancel.cancel();
        let mut confirm = handle.confirm;
        while !*confirm.borrow() {
            if confirm.changed().await.is_err() {
                return;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Dispatcher plumbing
    // -------------------------------------------------------------------------

    pub(crate) fn lookup(&self, endpoint: &str) -> Option<(HandlerFn, Vec<MiddlewareFn>)> {
        self.inner.registry.lookup(endpoint)
    }

    pub(crate) fn registered(&self, endpoint: &str) -> bool {
        self.inner.registry.contains(endpoint)
    }

    pub(crate) fn acquire_context(&self, update: Update) -> Context {
        self.inner.pool.acquire(self.clone(), update)
    }

    pub(crate) fn release_context(&self, ctx: Context) {
        self.inner.pool.release(ctx);
    }

    pub(crate) fn sink_error(&self, err: &ApiError, ctx: Option<&Context>) {
        let sink = self.inner.on_error.read().clone();
        sink(err, ctx);
    }

    pub(crate) fn synchronous(&self) -> bool {
        self.inner.synchronous
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.inner.tracker
    }

    // -------------------------------------------------------------------------
    // Raw API
    // -------------------------------------------------------------------------

    /// Calls an API method with already-assembled parameters and returns
    /// the `result` payload.
    pub async fn raw(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        let url = format!("{}/bot{}/{}", self.inner.api_url, self.inner.token, method);
        let bytes = self.inner.codec.marshal(&params)?;
        let response = self
            .inner
            .transport
            .execute(ApiRequest {
                url,
                body: RequestBody::Encoded {
                    content_type: self.inner.codec.content_type(),
                    bytes,
                },
            })
            .await?;
        let value = self.inner.codec.unmarshal(&response.body)?;
        check_response(value)
    }

    /// Probes the platform for the bot's own identity.
    pub async fn get_me(&self) -> Result<User, ApiError> {
        let result = self.raw("getMe", json!({})).await?;
        Ok(serde_json::from_value(result)?)
    }

    // -------------------------------------------------------------------------
    // Messaging
    // -------------------------------------------------------------------------

    /// Sends a text message to `to`.
    pub async fn send(
        &self,
        to: &dyn Recipient,
        text: impl Into<String>,
        opts: &SendOptions,
    ) -> Result<Message, ApiError> {
        let mut params = serde_json::Map::new();
        params.insert("chat_id".into(), to.recipient().into());
        params.insert("text".into(), text.into().into());
        if opts.parse_mode.is_none() {
            if let Some(mode) = self.inner.parse_mode {
                params.insert("parse_mode".into(), mode.as_str().into());
            }
        }
        opts.apply(&mut params);
        extract_message(self.raw("sendMessage", Value::Object(params)).await?)
    }

    /// Sends a reply to `msg` in its chat.
    pub async fn reply(
        &self,
        msg: &Message,
        text: impl Into<String>,
        opts: &SendOptions,
    ) -> Result<Message, ApiError> {
        let mut opts = opts.clone();
        opts.reply_to = Some(msg.id);
        self.send(&msg.chat, text, &opts).await
    }

    /// Forwards `msg` to `to`.
    pub async fn forward(&self, to: &dyn Recipient, msg: &Message) -> Result<Message, ApiError> {
        let params = json!({
            "chat_id": to.recipient(),
            "from_chat_id": msg.chat.id.to_string(),
            "message_id": msg.id,
        });
        extract_message(self.raw("forwardMessage", params).await?)
    }

    /// Copies `msg` to `to` without a forward header.
    pub async fn copy(&self, to: &dyn Recipient, msg: &Message) -> Result<(), ApiError> {
        let params = json!({
            "chat_id": to.recipient(),
            "from_chat_id": msg.chat.id.to_string(),
            "message_id": msg.id,
        });
        self.raw("copyMessage", params).await.map(|_| ())
    }

    /// Edits the text of an editable message.
    pub async fn edit_text(
        &self,
        what: &dyn Editable,
        text: impl Into<String>,
        opts: &SendOptions,
    ) -> Result<Message, ApiError> {
        let mut params = serde_json::Map::new();
        sig_params(what, &mut params);
        params.insert("text".into(), text.into().into());
        opts.apply(&mut params);
        extract_message(self.raw("editMessageText", Value::Object(params)).await?)
    }

    /// Replaces the inline keyboard of an editable message.
    pub async fn edit_reply_markup(
        &self,
        what: &dyn Editable,
        markup: Option<&crate::options::ReplyMarkup>,
    ) -> Result<Message, ApiError> {
        let mut params = serde_json::Map::new();
        sig_params(what, &mut params);
        if let Some(markup) = markup {
            params.insert("reply_markup".into(), serde_json::to_value(markup)?);
        }
        extract_message(self.raw("editMessageReplyMarkup", Value::Object(params)).await?)
    }

    /// Deletes `msg`.
    pub async fn delete(&self, msg: &Message) -> Result<(), ApiError> {
        let params = json!({ "chat_id": msg.chat.id.to_string(), "message_id": msg.id });
        self.raw("deleteMessage", params).await.map(|_| ())
    }

    /// Shows a chat action ("typing…") in `to`.
    pub async fn notify(&self, to: &dyn Recipient, action: ChatAction) -> Result<(), ApiError> {
        let params = json!({
            "chat_id": to.recipient(),
            "action": serde_json::to_value(action)?,
        });
        self.raw("sendChatAction", params).await.map(|_| ())
    }

    /// Pins `msg` in its chat.
    pub async fn pin(&self, msg: &Message) -> Result<(), ApiError> {
        let params = json!({ "chat_id": msg.chat.id.to_string(), "message_id": msg.id });
        self.raw("pinChatMessage", params).await.map(|_| ())
    }

    /// Unpins the given message in `to`, or the most recent pin when
    /// `message_id` is `None`.
    pub async fn unpin(&self, to: &dyn Recipient, message_id: Option<i64>) -> Result<(), ApiError> {
        let mut params = serde_json::Map::new();
        params.insert("chat_id".into(), to.recipient().into());
        if let Some(id) = message_id {
            params.insert("message_id".into(), id.into());
        }
        self.raw("unpinChatMessage", Value::Object(params)).await.map(|_| ())
    }

    pub async fn unpin_all(&self, to: &dyn Recipient) -> Result<(), ApiError> {
        let params = json!({ "chat_id": to.recipient() });
        self.raw("unpinAllChatMessages", params).await.map(|_| ())
    }

    /// Makes the bot leave the chat.
    pub async fn leave(&self, to: &dyn Recipient) -> Result<(), ApiError> {
        let params = json!({ "chat_id": to.recipient() });
        self.raw("leaveChat", params).await.map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Query answers
    // -------------------------------------------------------------------------

    /// Answers a callback query; `text` shows as a notification or alert.
    pub async fn respond(&self, cb: &Callback, text: Option<&str>) -> Result<(), ApiError> {
        let mut params = serde_json::Map::new();
        params.insert("callback_query_id".into(), cb.id.clone().into());
        if let Some(text) = text {
            params.insert("text".into(), text.into());
        }
        self.raw("answerCallbackQuery", Value::Object(params)).await.map(|_| ())
    }

    /// Answers an inline query with pre-built result objects.
    pub async fn answer(&self, query_id: &str, results: Value) -> Result<(), ApiError> {
        let params = json!({ "inline_query_id": query_id, "results": results });
        self.raw("answerInlineQuery", params).await.map(|_| ())
    }

    /// Approves or declines a chat join request.
    pub async fn accept(&self, req: &ChatJoinRequest, approve: bool) -> Result<(), ApiError> {
        let method = if approve { "approveChatJoinRequest" } else { "declineChatJoinRequest" };
        let params = json!({
            "chat_id": req.chat.id.to_string(),
            "user_id": req.sender.id,
        });
        self.raw(method, params).await.map(|_| ())
    }

    /// Answers a shipping query. `ok` false requires an error message.
    pub async fn ship(
        &self,
        query_id: &str,
        ok: bool,
        error_message: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut params = serde_json::Map::new();
        params.insert("shipping_query_id".into(), query_id.into());
        params.insert("ok".into(), ok.into());
        if let Some(message) = error_message {
            params.insert("error_message".into(), message.into());
        }
        self.raw("answerShippingQuery", Value::Object(params)).await.map(|_| ())
    }

    /// Answers a pre-checkout query.
    pub async fn checkout(
        &self,
        query_id: &str,
        ok: bool,
        error_message: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut params = serde_json::Map::new();
        params.insert("pre_checkout_query_id".into(), query_id.into());
        params.insert("ok".into(), ok.into());
        if let Some(message) = error_message {
            params.insert("error_message".into(), message.into());
        }
        self.raw("answerPreCheckoutQuery", Value::Object(params)).await.map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Command management
    // -------------------------------------------------------------------------

    /// Fetches the command list registered with the platform.
    pub async fn commands(&self) -> Result<Vec<BotCommand>, ApiError> {
        let result = self.raw("getMyCommands", json!({})).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Replaces the command list shown in client UIs.
    pub async fn set_commands(&self, commands: &[BotCommand]) -> Result<(), ApiError> {
        let params = json!({ "commands": serde_json::to_value(commands)? });
        self.raw("setMyCommands", params).await.map(|_| ())
    }

    /// Clears the registered command list.
    pub async fn delete_commands(&self) -> Result<(), ApiError> {
        self.raw("deleteMyCommands", json!({})).await.map(|_| ())
    }
}

/// Something already on the platform that edit calls can address: a chat
/// message, or an inline message with no chat.
pub trait Editable {
    /// Returns `(message_id, chat_id)`; inline messages use a string id
    /// and a zero chat.
    fn message_sig(&self) -> (String, i64);
}

impl Editable for Message {
    fn message_sig(&self) -> (String, i64) {
        (self.id.to_string(), self.chat.id)
    }
}

impl Editable for Callback {
    fn message_sig(&self) -> (String, i64) {
        match &self.message {
            Some(msg) => msg.message_sig(),
            None => (self.message_id.clone(), 0),
        }
    }
}

fn sig_params(what: &dyn Editable, params: &mut serde_json::Map<String, Value>) {
    let (message_id, chat_id) = what.message_sig();
    if chat_id == 0 {
        params.insert("inline_message_id".into(), message_id.into());
    } else {
        params.insert("chat_id".into(), chat_id.to_string().into());
        if let Ok(id) = message_id.parse::<i64>() {
            params.insert("message_id".into(), id.into());
        }
    }
}

/// Maps a decoded API response onto the error taxonomy, yielding the
/// `result` payload on success.
fn check_response(value: Value) -> Result<Value, ApiError> {
    if value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(value.get("result").cloned().unwrap_or(Value::Null));
    }
    if let Some(retry) = value.pointer("/parameters/retry_after").and_then(Value::as_u64) {
        return Err(ApiError::Flood { retry_after: retry });
    }
    if let Some(chat) = value.pointer("/parameters/migrate_to_chat_id").and_then(Value::as_i64) {
        return Err(ApiError::Group { migrated_to: chat });
    }
    Err(ApiError::Telegram {
        code: value.get("error_code").and_then(Value::as_i64).unwrap_or(0) as i32,
        description: value
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
    })
}

/// Converts an API `result` into a [`Message`]. Some edit calls answer
/// with a bare `true` for inline messages; that surfaces as
/// [`ApiError::TrueResult`] so callers can treat it as a non-failure.
fn extract_message(result: Value) -> Result<Message, ApiError> {
    match result {
        Value::Bool(true) => Err(ApiError::TrueResult),
        other => Ok(serde_json::from_value(other)?),
    }
}

/// A set of handlers sharing a middleware stack.
pub struct Group {
    bot: Bot,
    middleware: Vec<MiddlewareFn>,
}

impl Group {
    /// Appends middleware applied to every handler this group registers
    /// afterwards.
    pub fn use_middleware(&mut self, middleware: MiddlewareFn) {
        self.middleware.push(middleware);
    }

    /// Registers a handler with the group's middleware prepended.
    pub fn handle(
        &self,
        endpoint: impl IntoEndpoint,
        handler: HandlerFn,
        middleware: Vec<MiddlewareFn>,
    ) {
        let mut chain = self.middleware.clone();
        chain.extend(middleware);
        self.bot.handle(endpoint, handler, chain);
    }
}
