//! The message model, the richest object delivered by an update.

use serde::{Deserialize, Serialize};

use crate::types::{
    Animation, Audio, AutoDeleteTimer, Chat, Contact, Dice, Document, Game, GeneralTopicHidden,
    GeneralTopicUnhidden, Invoice, Location, PhotoSize, Poll, ProximityAlert, Sticker,
    SuccessfulPayment, TopicClosed, TopicCreated, TopicEdited, TopicReopened, User, Venue, Video,
    VideoChatEnded, VideoChatParticipants, VideoChatScheduled, VideoChatStarted, VideoNote, Voice,
    WebAppData, WriteAccessAllowed,
};

/// A message in a chat: text, media, or a service event.
///
/// All optional content is modelled with `Option` so a single struct can
/// carry every message flavor; the dispatcher inspects these fields to pick
/// the category endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(rename = "message_id")]
    pub id: i64,
    #[serde(rename = "message_thread_id", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    #[serde(rename = "from", skip_serializing_if = "Option::is_none")]
    pub sender: Option<User>,
    #[serde(rename = "date")]
    pub unixtime: i64,
    pub chat: Chat,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Command payload: everything after `/cmd` on a command message.
    /// Populated by the dispatcher, never present on the wire.
    #[serde(skip)]
    pub payload: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub caption: String,

    #[serde(rename = "reply_to_message", skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Box<Message>>,
    #[serde(rename = "via_bot", skip_serializing_if = "Option::is_none")]
    pub via: Option<User>,
    #[serde(rename = "edit_date", skip_serializing_if = "Option::is_none")]
    pub last_edit: Option<i64>,
    #[serde(rename = "media_group_id", skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,

    // Media, at most one present per message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Audio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<Animation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker: Option<Sticker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
    #[serde(rename = "video_note", skip_serializing_if = "Option::is_none")]
    pub video_note: Option<VideoNote>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<Venue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<Game>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dice: Option<Dice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<Poll>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<Invoice>,
    #[serde(rename = "successful_payment", skip_serializing_if = "Option::is_none")]
    pub payment: Option<SuccessfulPayment>,

    // Service events.
    #[serde(rename = "new_chat_member", skip_serializing_if = "Option::is_none")]
    pub user_joined: Option<User>,
    #[serde(rename = "new_chat_members", skip_serializing_if = "Option::is_none")]
    pub users_joined: Option<Vec<User>>,
    #[serde(rename = "left_chat_member", skip_serializing_if = "Option::is_none")]
    pub user_left: Option<User>,
    #[serde(rename = "new_chat_title", skip_serializing_if = "String::is_empty")]
    pub new_group_title: String,
    #[serde(rename = "new_chat_photo", skip_serializing_if = "Option::is_none")]
    pub new_group_photo: Option<Vec<PhotoSize>>,
    #[serde(rename = "delete_chat_photo", skip_serializing_if = "std::ops::Not::not")]
    pub group_photo_deleted: bool,
    #[serde(rename = "group_chat_created", skip_serializing_if = "std::ops::Not::not")]
    pub group_created: bool,
    #[serde(
        rename = "supergroup_chat_created",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub supergroup_created: bool,
    #[serde(
        rename = "channel_chat_created",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub channel_created: bool,
    #[serde(rename = "migrate_to_chat_id", skip_serializing_if = "Option::is_none")]
    pub migrate_to: Option<i64>,
    #[serde(rename = "migrate_from_chat_id", skip_serializing_if = "Option::is_none")]
    pub migrate_from: Option<i64>,
    #[serde(rename = "pinned_message", skip_serializing_if = "Option::is_none")]
    pub pinned: Option<Box<Message>>,
    #[serde(
        rename = "message_auto_delete_timer_changed",
        skip_serializing_if = "Option::is_none"
    )]
    pub auto_delete_timer: Option<AutoDeleteTimer>,

    #[serde(rename = "forum_topic_created", skip_serializing_if = "Option::is_none")]
    pub topic_created: Option<TopicCreated>,
    #[serde(rename = "forum_topic_closed", skip_serializing_if = "Option::is_none")]
    pub topic_closed: Option<TopicClosed>,
    #[serde(rename = "forum_topic_reopened", skip_serializing_if = "Option::is_none")]
    pub topic_reopened: Option<TopicReopened>,
    #[serde(rename = "forum_topic_edited", skip_serializing_if = "Option::is_none")]
    pub topic_edited: Option<TopicEdited>,
    #[serde(
        rename = "general_forum_topic_hidden",
        skip_serializing_if = "Option::is_none"
    )]
    pub general_topic_hidden: Option<GeneralTopicHidden>,
    #[serde(
        rename = "general_forum_topic_unhidden",
        skip_serializing_if = "Option::is_none"
    )]
    pub general_topic_unhidden: Option<GeneralTopicUnhidden>,

    #[serde(
        rename = "write_access_allowed",
        skip_serializing_if = "Option::is_none"
    )]
    pub write_access_allowed: Option<WriteAccessAllowed>,
    #[serde(rename = "video_chat_started", skip_serializing_if = "Option::is_none")]
    pub video_chat_started: Option<VideoChatStarted>,
    #[serde(rename = "video_chat_ended", skip_serializing_if = "Option::is_none")]
    pub video_chat_ended: Option<VideoChatEnded>,
    #[serde(
        rename = "video_chat_participants_invited",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_chat_participants: Option<VideoChatParticipants>,
    #[serde(
        rename = "video_chat_scheduled",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_chat_scheduled: Option<VideoChatScheduled>,
    #[serde(rename = "web_app_data", skip_serializing_if = "Option::is_none")]
    pub web_app_data: Option<WebAppData>,
    #[serde(
        rename = "proximity_alert_triggered",
        skip_serializing_if = "Option::is_none"
    )]
    pub proximity_alert: Option<ProximityAlert>,
}

impl Message {
    /// True if the message carries exactly one media attachment.
    pub fn has_media(&self) -> bool {
        self.photo.is_some()
            || self.voice.is_some()
            || self.audio.is_some()
            || self.animation.is_some()
            || self.document.is_some()
            || self.sticker.is_some()
            || self.video.is_some()
            || self.video_note.is_some()
    }

    /// True if the message is a chat service event rather than content.
    pub fn is_service(&self) -> bool {
        self.user_joined.is_some()
            || self.users_joined.is_some()
            || self.user_left.is_some()
            || !self.new_group_title.is_empty()
            || self.new_group_photo.is_some()
            || self.group_photo_deleted
            || self.group_created
            || self.supergroup_created
            || self.channel_created
            || self.migrate_to.is_some()
            || self.migrate_from.is_some()
            || self.pinned.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_message_from_wire() {
        let raw = r#"{
            "message_id": 7,
            "date": 1700000000,
            "chat": {"id": 42, "type": "private"},
            "from": {"id": 1, "first_name": "Ada"},
            "text": "hello"
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.id, 7);
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.chat.id, 42);
        assert_eq!(msg.sender.as_ref().unwrap().first_name, "Ada");
        assert!(!msg.has_media());
        assert!(!msg.is_service());
    }

    #[test]
    fn service_fields_from_wire() {
        let raw = r#"{
            "message_id": 8,
            "date": 1700000001,
            "chat": {"id": -100, "type": "supergroup"},
            "new_chat_members": [
                {"id": 2, "first_name": "Bob"},
                {"id": 3, "first_name": "Cid"}
            ]
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert!(msg.is_service());
        assert_eq!(msg.users_joined.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn topic_created_does_not_set_topic_closed() {
        let raw = r#"{
            "message_id": 9,
            "date": 1700000002,
            "chat": {"id": -100, "type": "supergroup", "is_forum": true},
            "forum_topic_created": {"name": "general", "icon_color": 1}
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert!(msg.topic_created.is_some());
        assert!(msg.topic_closed.is_none());
    }
}
