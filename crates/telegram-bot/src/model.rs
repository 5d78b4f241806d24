//! Typed views of inbound Telegram updates.
//!
//! Records arrive as loosely-typed JSON. Only the ids are required; every
//! other field falls back to a default so that partial payloads still parse.

use crate::error::ParseError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// A Telegram user, or the other party of a private chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Build a user from a contact record. `field` names the record in errors.
    pub fn from_record(record: &Value, field: &'static str) -> Result<Self, ParseError> {
        Ok(Self {
            id: required_int(record, "id", field)?,
            username: optional_string(record, "username"),
            first_name: optional_string(record, "first_name"),
            last_name: optional_string(record, "last_name"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChat {
    pub id: i64,
    pub title: Option<String>,
}

impl GroupChat {
    pub fn from_record(record: &Value) -> Result<Self, ParseError> {
        Ok(Self {
            id: required_int(record, "id", "chat.id")?,
            title: optional_string(record, "title"),
        })
    }
}

/// Where a message was posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chat {
    /// Private conversation, identified by the other user.
    Private(User),
    Group(GroupChat),
}

impl Chat {
    /// A chat record carrying a non-empty username is a private chat.
    pub fn from_record(record: &Value) -> Result<Self, ParseError> {
        let has_username = record
            .get("username")
            .and_then(Value::as_str)
            .is_some_and(|u| !u.is_empty());

        if has_username {
            Ok(Chat::Private(User::from_record(record, "chat.id")?))
        } else {
            Ok(Chat::Group(GroupChat::from_record(record)?))
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Chat::Private(user) => user.id,
            Chat::Group(group) => group.id,
        }
    }
}

/// Message payloads the dispatcher does not look into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachments {
    pub audio: Option<Value>,
    pub document: Option<Value>,
    pub photo: Option<Value>,
    pub sticker: Option<Value>,
    pub video: Option<Value>,
    pub contact: Option<Value>,
    pub location: Option<Value>,
    pub new_chat_participant: Option<Value>,
    pub left_chat_participant: Option<Value>,
    pub new_chat_title: Option<String>,
    pub new_chat_photo: Option<Value>,
    pub delete_chat_photo: bool,
    pub group_chat_created: bool,
}

impl Attachments {
    fn from_record(record: &Value) -> Self {
        let opaque = |key: &str| record.get(key).filter(|v| is_present(v)).cloned();
        let flag = |key: &str| record.get(key).and_then(Value::as_bool).unwrap_or(false);

        Self {
            audio: opaque("audio"),
            document: opaque("document"),
            photo: opaque("photo"),
            sticker: opaque("sticker"),
            video: opaque("video"),
            contact: opaque("contact"),
            location: opaque("location"),
            new_chat_participant: opaque("new_chat_participant"),
            left_chat_participant: opaque("left_chat_participant"),
            new_chat_title: optional_string(record, "new_chat_title"),
            new_chat_photo: opaque("new_chat_photo"),
            delete_chat_photo: flag("delete_chat_photo"),
            group_chat_created: flag("group_chat_created"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub chat: Chat,
    pub user: User,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub forward_from: Option<User>,
    pub forward_timestamp: Option<DateTime<Utc>>,
    /// Replies only ever point at older messages, so the chain ends.
    pub reply_to_message: Option<Box<Message>>,
    pub attachments: Attachments,
}

impl Message {
    pub fn from_record(record: &Value) -> Result<Self, ParseError> {
        let id = required_int(record, "message_id", "message_id")?;
        let chat = Chat::from_record(record.get("chat").unwrap_or(&Value::Null))?;
        let user = User::from_record(record.get("from").unwrap_or(&Value::Null), "from.id")?;

        let forward_from = match present_object(record, "forward_from") {
            Some(forward) => Some(User::from_record(forward, "forward_from.id")?),
            None => None,
        };
        let reply_to_message = match present_object(record, "reply_to_message") {
            Some(reply) => Some(Box::new(Message::from_record(reply)?)),
            None => None,
        };

        Ok(Self {
            id,
            chat,
            user,
            timestamp: record
                .get("date")
                .and_then(timestamp)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            text: optional_string(record, "text").unwrap_or_default(),
            forward_from,
            forward_timestamp: record.get("forward_date").and_then(timestamp),
            reply_to_message,
            attachments: Attachments::from_record(record),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}> {}",
            self.user.username.as_deref().unwrap_or("?"),
            self.text
        )
    }
}

/// One entry of a `getupdates` batch.
///
/// `command` and `command_args` are derived from the message text the
/// first time they are read and cached for the lifetime of the update.
#[derive(Debug, Clone)]
pub struct Update {
    pub id: i64,
    pub message: Option<Message>,
    command: OnceLock<Option<String>>,
    command_args: OnceLock<Vec<String>>,
}

impl Update {
    pub fn new(id: i64, message: Option<Message>) -> Self {
        Self {
            id,
            message,
            command: OnceLock::new(),
            command_args: OnceLock::new(),
        }
    }

    pub fn from_record(record: &Value) -> Result<Self, ParseError> {
        let id = required_int(record, "update_id", "update_id")?;
        let message = match present_object(record, "message") {
            Some(message) => Some(Message::from_record(message)?),
            None => None,
        };
        Ok(Self::new(id, message))
    }

    /// Message text, or `""` for updates without a text message.
    pub fn text(&self) -> &str {
        self.message.as_ref().map(|m| m.text.as_str()).unwrap_or("")
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.message.as_ref().map(|m| m.chat.id())
    }

    /// First word of the text without its leading `/`.
    pub fn command(&self) -> Option<&str> {
        self.command
            .get_or_init(|| {
                self.text()
                    .split_whitespace()
                    .next()
                    .map(|token| token.trim_start_matches('/').trim().to_string())
            })
            .as_deref()
    }

    /// Words following the command.
    pub fn command_args(&self) -> &[String] {
        self.command_args
            .get_or_init(|| {
                self.text()
                    .split_whitespace()
                    .skip(1)
                    .map(str::to_string)
                    .collect()
            })
            .as_slice()
    }
}

impl TryFrom<&Value> for Update {
    type Error = ParseError;

    fn try_from(record: &Value) -> Result<Self, Self::Error> {
        Update::from_record(record)
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "Update {}: {}", self.id, message),
            None => write!(f, "Update {}: (no message)", self.id),
        }
    }
}

/// Read an integer id, accepting numbers and numeric strings.
pub(crate) fn required_int(
    record: &Value,
    key: &str,
    field: &'static str,
) -> Result<i64, ParseError> {
    let invalid = |value: &Value| ParseError::InvalidField {
        field,
        value: value.to_string(),
    };

    match record.get(key) {
        None | Some(Value::Null) => Err(ParseError::MissingField(field)),
        Some(value @ Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| invalid(value)),
        Some(value @ Value::String(s)) => s.trim().parse().map_err(|_| invalid(value)),
        Some(value) => Err(invalid(value)),
    }
}

fn optional_string(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn present_object<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|v| v.is_object() && is_present(v))
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let secs = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))?;
    DateTime::<Utc>::from_timestamp(secs, 0)
}
