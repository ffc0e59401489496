//! Per-call send options and keyboards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::CallbackEndpoint;
use crate::types::ParseMode;

/// Extra parameters attached to outgoing send/edit calls.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// A message to reply to, by id.
    pub reply_to: Option<i64>,
    /// Overrides the bot-wide parse mode for this call.
    pub parse_mode: Option<ParseMode>,
    /// Sends the message silently (no client-side notification).
    pub disable_notification: bool,
    /// Disables link previews for text messages.
    pub disable_web_page_preview: bool,
    /// Protects the message from forwarding and saving.
    pub protected: bool,
    /// The forum topic the message belongs to.
    pub thread_id: Option<i64>,
    pub reply_markup: Option<ReplyMarkup>,
}

impl SendOptions {
    /// Folds these options into an API parameter object.
    pub fn apply(&self, params: &mut serde_json::Map<String, Value>) {
        if let Some(id) = self.reply_to {
            params.insert("reply_to_message_id".into(), id.into());
        }
        if let Some(mode) = self.parse_mode {
            params.insert("parse_mode".into(), mode.as_str().into());
        }
        if self.disable_notification {
            params.insert("disable_notification".into(), true.into());
        }
        if self.disable_web_page_preview {
            params.insert("disable_web_page_preview".into(), true.into());
        }
        if self.protected {
            params.insert("protect_content".into(), true.into());
        }
        if let Some(id) = self.thread_id {
            params.insert("message_thread_id".into(), id.into());
        }
        if let Some(markup) = &self.reply_markup {
            if let Ok(v) = serde_json::to_value(markup) {
                params.insert("reply_markup".into(), v);
            }
        }
    }
}

/// A keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline {
        inline_keyboard: Vec<Vec<InlineButton>>,
    },
    Keyboard {
        keyboard: Vec<Vec<ReplyButton>>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        resize_keyboard: bool,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        one_time_keyboard: bool,
    },
    Remove {
        remove_keyboard: bool,
    },
    ForceReply {
        force_reply: bool,
    },
}

impl ReplyMarkup {
    /// An inline keyboard from rows of buttons.
    pub fn inline(rows: Vec<Vec<InlineButton>>) -> Self {
        ReplyMarkup::Inline { inline_keyboard: rows }
    }

    /// Removes any custom keyboard on the client.
    pub fn remove() -> Self {
        ReplyMarkup::Remove { remove_keyboard: true }
    }
}

/// A button on an inline keyboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineButton {
    /// The handler identifier this button dispatches to. Stripped from the
    /// wire form; it travels inside `callback_data`.
    #[serde(skip)]
    pub unique: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "callback_data", skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl InlineButton {
    /// A button that triggers the callback handler registered under
    /// `unique`, carrying `data` as its payload.
    pub fn callback(text: impl Into<String>, unique: impl Into<String>, data: impl Into<String>) -> Self {
        let unique = unique.into();
        let data = data.into();
        let wire = if data.is_empty() {
            format!("{}{unique}", crate::endpoint::CALLBACK_MARKER)
        } else {
            format!("{}{unique}|{data}", crate::endpoint::CALLBACK_MARKER)
        };
        InlineButton { unique, text: text.into(), url: None, data: Some(wire) }
    }

    /// A button that opens a URL.
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        InlineButton { text: text.into(), url: Some(url.into()), ..Default::default() }
    }
}

impl CallbackEndpoint for InlineButton {
    fn callback_unique(&self) -> &str {
        &self.unique
    }
}

impl crate::endpoint::IntoEndpoint for &InlineButton {
    fn into_endpoint(self) -> String {
        crate::endpoint::callback_endpoint_key(self)
    }
}

/// A button on a reply keyboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub request_contact: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub request_location: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn callback_button_embeds_marker() {
        let btn = InlineButton::callback("Vote", "vote", "yes");
        assert_eq!(btn.data.as_deref(), Some("\u{c}vote|yes"));
        assert_eq!(btn.callback_unique(), "vote");

        use crate::endpoint::IntoEndpoint;
        assert_eq!((&btn).into_endpoint(), "\u{c}vote");
    }

    #[test]
    fn options_fold_into_params() {
        let opts = SendOptions {
            reply_to: Some(12),
            parse_mode: Some(ParseMode::Html),
            disable_notification: true,
            ..Default::default()
        };
        let mut params = serde_json::Map::new();
        opts.apply(&mut params);
        assert_eq!(params.get("reply_to_message_id"), Some(&json!(12)));
        assert_eq!(params.get("parse_mode"), Some(&json!("HTML")));
        assert_eq!(params.get("disable_notification"), Some(&json!(true)));
    }

    #[test]
    fn inline_markup_serializes_flat() {
        let markup = ReplyMarkup::inline(vec![vec![InlineButton::url("Open", "https://example.org")]]);
        let v = serde_json::to_value(&markup).unwrap();
        assert_eq!(
            v,
            json!({"inline_keyboard": [[{"text": "Open", "url": "https://example.org"}]]})
        );
    }
}
