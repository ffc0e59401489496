//! Incoming updates and their closed classification.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::types::{
    Callback, ChatJoinRequest, ChatMemberUpdate, InlineResult, Poll, PollAnswer, PreCheckoutQuery,
    Query, ShippingQuery,
};

/// The payload of an update.
///
/// The wire format carries at most one of the optional payload fields; this
/// enum makes that invariant unrepresentable to break. Unknown payloads
/// decode to [`UpdateKind::None`] and are skipped by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum UpdateKind {
    Message(Message),
    EditedMessage(Message),
    ChannelPost(Message),
    EditedChannelPost(Message),
    Callback(Callback),
    Query(Query),
    InlineResult(InlineResult),
    ShippingQuery(ShippingQuery),
    PreCheckoutQuery(PreCheckoutQuery),
    Poll(Poll),
    PollAnswer(PollAnswer),
    MyChatMember(ChatMemberUpdate),
    ChatMember(ChatMemberUpdate),
    ChatJoinRequest(ChatJoinRequest),
    #[default]
    None,
}

/// A single incoming event from the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireUpdate", into = "WireUpdate")]
pub struct Update {
    pub id: i64,
    pub kind: UpdateKind,
}

/// The flat wire shape of an update, used only at the serde boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireUpdate {
    update_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edited_message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_post: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edited_channel_post: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_query: Option<Callback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_query: Option<Query>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chosen_inline_result: Option<InlineResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipping_query: Option<ShippingQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pre_checkout_query: Option<PreCheckoutQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    poll: Option<Poll>,
    #[serde(skip_serializing_if = "Option::is_none")]
    poll_answer: Option<PollAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    my_chat_member: Option<ChatMemberUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_member: Option<ChatMemberUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_join_request: Option<ChatJoinRequest>,
}

impl From<WireUpdate> for Update {
    fn from(w: WireUpdate) -> Self {
        let kind = if let Some(m) = w.message {
            UpdateKind::Message(m)
        } else if let Some(m) = w.edited_message {
            UpdateKind::EditedMessage(m)
        } else if let Some(m) = w.channel_post {
            UpdateKind::ChannelPost(m)
        } else if let Some(m) = w.edited_channel_post {
            UpdateKind::EditedChannelPost(m)
        } else if let Some(c) = w.callback_query {
            UpdateKind::Callback(c)
        } else if let Some(q) = w.inline_query {
            UpdateKind::Query(q)
        } else if let Some(r) = w.chosen_inline_result {
            UpdateKind::InlineResult(r)
        } else if let Some(s) = w.shipping_query {
            UpdateKind::ShippingQuery(s)
        } else if let Some(p) = w.pre_checkout_query {
            UpdateKind::PreCheckoutQuery(p)
        } else if let Some(p) = w.poll {
            UpdateKind::Poll(p)
        } else if let Some(a) = w.poll_answer {
            UpdateKind::PollAnswer(a)
        } else if let Some(u) = w.my_chat_member {
            UpdateKind::MyChatMember(u)
        } else if let Some(u) = w.chat_member {
            UpdateKind::ChatMember(u)
        } else if let Some(j) = w.chat_join_request {
            UpdateKind::ChatJoinRequest(j)
        } else {
            UpdateKind::None
        };
        Update { id: w.update_id, kind }
    }
}

impl From<Update> for WireUpdate {
    fn from(u: Update) -> Self {
        let mut w = WireUpdate { update_id: u.id, ..WireUpdate::default() };
        match u.kind {
            UpdateKind::Message(m) => w.message = Some(m),
            UpdateKind::EditedMessage(m) => w.edited_message = Some(m),
            UpdateKind::ChannelPost(m) => w.channel_post = Some(m),
            UpdateKind::EditedChannelPost(m) => w.edited_channel_post = Some(m),
            UpdateKind::Callback(c) => w.callback_query = Some(c),
            UpdateKind::Query(q) => w.inline_query = Some(q),
            UpdateKind::InlineResult(r) => w.chosen_inline_result = Some(r),
            UpdateKind::ShippingQuery(s) => w.shipping_query = Some(s),
            UpdateKind::PreCheckoutQuery(p) => w.pre_checkout_query = Some(p),
            UpdateKind::Poll(p) => w.poll = Some(p),
            UpdateKind::PollAnswer(a) => w.poll_answer = Some(a),
            UpdateKind::MyChatMember(u) => w.my_chat_member = Some(u),
            UpdateKind::ChatMember(u) => w.chat_member = Some(u),
            UpdateKind::ChatJoinRequest(j) => w.chat_join_request = Some(j),
            UpdateKind::None => {}
        }
        w
    }
}
