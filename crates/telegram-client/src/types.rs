//! Telegram Bot API wire types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Envelope returned by every Bot API method.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    pub description: Option<String>,
}

/// Outgoing text message request.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
}

/// Outgoing chat action request.
#[derive(Debug, Clone, Serialize)]
pub struct SendChatActionRequest {
    pub chat_id: i64,
    pub action: ChatAction,
}

/// Status shown to the chat while the bot is working.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    #[default]
    Typing,
    UploadPhoto,
    RecordVideo,
    UploadVideo,
    RecordAudio,
    UploadAudio,
    UploadDocument,
    FindLocation,
}

impl ChatAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatAction::Typing => "typing",
            ChatAction::UploadPhoto => "upload_photo",
            ChatAction::RecordVideo => "record_video",
            ChatAction::UploadVideo => "upload_video",
            ChatAction::RecordAudio => "record_audio",
            ChatAction::UploadAudio => "upload_audio",
            ChatAction::UploadDocument => "upload_document",
            ChatAction::FindLocation => "find_location",
        }
    }

    /// Parse an action name, falling back to `Typing` for anything unknown.
    pub fn parse_lossy(action: &str) -> Self {
        action.parse().unwrap_or_default()
    }
}

impl FromStr for ChatAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "typing" => Ok(ChatAction::Typing),
            "upload_photo" => Ok(ChatAction::UploadPhoto),
            "record_video" => Ok(ChatAction::RecordVideo),
            "upload_video" => Ok(ChatAction::UploadVideo),
            "record_audio" => Ok(ChatAction::RecordAudio),
            "upload_audio" => Ok(ChatAction::UploadAudio),
            "upload_document" => Ok(ChatAction::UploadDocument),
            "find_location" => Ok(ChatAction::FindLocation),
            other => Err(format!("unknown chat action: {}", other)),
        }
    }
}

impl fmt::Display for ChatAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
