//! Chat message model for the assistant conversation log.

use serde::{Deserialize, Serialize};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One message in a user's assistant conversation.
///
/// The per-user log is append-only and ordered by `timestamp` ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message id (also the document id)
    pub id: String,
    pub role: ChatRole,
    /// Message text
    pub text: String,
    /// Attached image, if any (data URL or remote URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// When the message was created (epoch ms)
    pub timestamp: i64,
}
