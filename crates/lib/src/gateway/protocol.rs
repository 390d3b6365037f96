//! Wire types for `POST /chat` (camelCase JSON, as the judging portal sends it).

use serde::{Deserialize, Serialize};

/// One chat line: who sent it, the text, and the sender's timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub text: String,
    pub timestamp: i64,
}

/// Request body: the new scammer message plus the full prior history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: String,
    pub message: Message,
    #[serde(default)]
    pub conversation_history: Vec<Message>,
    /// Free-form caller metadata (e.g. channel, language). Accepted and ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ChatRequest {
    /// Messages exchanged so far, counting the new one.
    pub fn total_messages(&self) -> usize {
        self.conversation_history.len() + 1
    }
}

/// Response body: `{ "status": "success", "reply": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub status: String,
    pub reply: String,
}

impl ChatReply {
    pub fn success(reply: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            reply: reply.into(),
        }
    }
}

/// Error body: `{ "detail": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
