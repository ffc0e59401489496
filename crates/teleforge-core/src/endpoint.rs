//! Endpoint keys for handler registration.
//!
//! Handlers are registered under string keys. A key is one of:
//!
//! - a literal command token (e.g. `"/start"`) or any exact message text;
//! - one of the fixed category constants below, which all start with the
//!   reserved sentinel byte `\u{7}` so they can never collide with real text;
//! - a callback-unique identifier, which the registry prefixes with the
//!   reserved marker byte `\u{C}`.
//!
//! The sentinel byte doubles as a guard on inbound text: a message whose text
//! begins with `\u{7}` is treated as handled-but-ignored by the dispatcher,
//! so crafted payloads cannot be routed into category handlers.

/// Reserved sentinel byte prefixing all category endpoints.
pub const SENTINEL: char = '\u{7}';

/// Reserved marker byte prefixing callback-unique endpoint keys.
pub const CALLBACK_MARKER: char = '\u{c}';

// Basic message categories.
pub const ON_TEXT: &str = "\u{7}text";
pub const ON_EDITED: &str = "\u{7}edited";
pub const ON_PHOTO: &str = "\u{7}photo";
pub const ON_AUDIO: &str = "\u{7}audio";
pub const ON_ANIMATION: &str = "\u{7}animation";
pub const ON_DOCUMENT: &str = "\u{7}document";
pub const ON_STICKER: &str = "\u{7}sticker";
pub const ON_VIDEO: &str = "\u{7}video";
pub const ON_VOICE: &str = "\u{7}voice";
pub const ON_VIDEO_NOTE: &str = "\u{7}video_note";
pub const ON_CONTACT: &str = "\u{7}contact";
pub const ON_LOCATION: &str = "\u{7}location";
pub const ON_VENUE: &str = "\u{7}venue";
pub const ON_DICE: &str = "\u{7}dice";
pub const ON_INVOICE: &str = "\u{7}invoice";
pub const ON_PAYMENT: &str = "\u{7}payment";
pub const ON_GAME: &str = "\u{7}game";
pub const ON_POLL: &str = "\u{7}poll";
pub const ON_POLL_ANSWER: &str = "\u{7}poll_answer";
pub const ON_PINNED: &str = "\u{7}pinned";
pub const ON_CHANNEL_POST: &str = "\u{7}channel_post";
pub const ON_EDITED_CHANNEL_POST: &str = "\u{7}edited_channel_post";

// Forum topic lifecycle.
pub const ON_TOPIC_CREATED: &str = "\u{7}topic_created";
pub const ON_TOPIC_REOPENED: &str = "\u{7}topic_reopened";
pub const ON_TOPIC_CLOSED: &str = "\u{7}topic_closed";
pub const ON_TOPIC_EDITED: &str = "\u{7}topic_edited";
pub const ON_GENERAL_TOPIC_HIDDEN: &str = "\u{7}general_topic_hidden";
pub const ON_GENERAL_TOPIC_UNHIDDEN: &str = "\u{7}general_topic_unhidden";
pub const ON_WRITE_ACCESS_ALLOWED: &str = "\u{7}write_access_allowed";

// Group lifecycle.
pub const ON_ADDED_TO_GROUP: &str = "\u{7}added_to_group";
pub const ON_USER_JOINED: &str = "\u{7}user_joined";
pub const ON_USER_LEFT: &str = "\u{7}user_left";
pub const ON_NEW_GROUP_TITLE: &str = "\u{7}new_chat_title";
pub const ON_NEW_GROUP_PHOTO: &str = "\u{7}new_chat_photo";
pub const ON_GROUP_PHOTO_DELETED: &str = "\u{7}chat_photo_deleted";
pub const ON_GROUP_CREATED: &str = "\u{7}group_created";
pub const ON_SUPERGROUP_CREATED: &str = "\u{7}supergroup_created";
pub const ON_CHANNEL_CREATED: &str = "\u{7}channel_created";

/// Fired when a group migrates to a supergroup. Internal references to the
/// chat should be updated on migration as its ID changes.
pub const ON_MIGRATION: &str = "\u{7}migration";

pub const ON_MEDIA: &str = "\u{7}media";
pub const ON_CALLBACK: &str = "\u{7}callback";
pub const ON_QUERY: &str = "\u{7}query";
pub const ON_INLINE_RESULT: &str = "\u{7}inline_result";
pub const ON_SHIPPING: &str = "\u{7}shipping_query";
pub const ON_CHECKOUT: &str = "\u{7}pre_checkout_query";
pub const ON_MY_CHAT_MEMBER: &str = "\u{7}my_chat_member";
pub const ON_CHAT_MEMBER: &str = "\u{7}chat_member";
pub const ON_CHAT_JOIN_REQUEST: &str = "\u{7}chat_join_request";
pub const ON_PROXIMITY_ALERT: &str = "\u{7}proximity_alert_triggered";
pub const ON_AUTO_DELETE_TIMER: &str = "\u{7}message_auto_delete_timer_changed";
pub const ON_WEB_APP: &str = "\u{7}web_app";

// Video chat lifecycle.
pub const ON_VIDEO_CHAT_STARTED: &str = "\u{7}video_chat_started";
pub const ON_VIDEO_CHAT_ENDED: &str = "\u{7}video_chat_ended";
pub const ON_VIDEO_CHAT_PARTICIPANTS: &str = "\u{7}video_chat_participants_invited";
pub const ON_VIDEO_CHAT_SCHEDULED: &str = "\u{7}video_chat_scheduled";

/// A UI element that routes callback queries back to a registered handler
/// through a stable unique identifier.
///
/// Implementors are registrable as endpoints: the registry stores their
/// handlers under `\u{C}<unique>`, which the dispatcher matches against
/// inbound callback data of the form `\u{C}<unique>|<payload>`.
pub trait CallbackEndpoint {
    /// Returns the stable unique identifier of this element.
    fn callback_unique(&self) -> &str;
}

/// Conversion into a registry key.
///
/// Implemented for plain strings (commands, exact text, category constants)
/// and for callback endpoints. Registration is typed: there is no
/// "unsupported endpoint" failure mode at runtime.
pub trait IntoEndpoint {
    /// Resolves the registry key for this endpoint.
    fn into_endpoint(self) -> String;
}

impl IntoEndpoint for &str {
    fn into_endpoint(self) -> String {
        self.to_string()
    }
}

impl IntoEndpoint for String {
    fn into_endpoint(self) -> String {
        self
    }
}

/// Builds the registry key for a callback endpoint.
pub fn callback_endpoint_key(endpoint: &dyn CallbackEndpoint) -> String {
    format!("{CALLBACK_MARKER}{}", endpoint.callback_unique())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_constants_carry_the_sentinel() {
        for endpoint in [ON_TEXT, ON_MEDIA, ON_CALLBACK, ON_MIGRATION] {
            assert!(endpoint.starts_with(SENTINEL));
        }
    }

    #[test]
    fn callback_keys_carry_the_marker() {
        struct Button;
        impl CallbackEndpoint for Button {
            fn callback_unique(&self) -> &str {
                "stats"
            }
        }
        assert_eq!(callback_endpoint_key(&Button), "\u{c}stats");
    }
}
