//! Backend wire shapes
//!
//! Ollama-compatible backends expose two generation endpoints with different
//! request and response schemas. The registry entry for each model selects one
//! of them; everything shape-specific lives on [`WireShape`] so callers never
//! branch on the shape themselves.

use serde::{Deserialize, Serialize};

/// Request/response schema a backend expects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireShape {
    /// `POST /api/generate` with a single `prompt` field, text in `response`
    #[default]
    Generate,
    /// `POST /api/chat` with a `messages` list, text in `message.content`
    Chat,
}

impl WireShape {
    /// Path of the generation endpoint, relative to the backend base URL
    pub fn path(&self) -> &'static str {
        match self {
            WireShape::Generate => "/api/generate",
            WireShape::Chat => "/api/chat",
        }
    }

    /// Label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            WireShape::Generate => "generate",
            WireShape::Chat => "chat",
        }
    }

    /// Build the backend request body for this shape
    ///
    /// The generate shape always carries an explicit `stream` flag. The chat
    /// shape only carries one when the caller asked to stream.
    pub fn build_request(
        &self,
        backend_model: &str,
        input: &ChatInput,
        stream: bool,
    ) -> BackendRequest {
        match self {
            WireShape::Generate => BackendRequest::Generate {
                model: backend_model.to_string(),
                prompt: input.to_prompt(),
                stream,
            },
            WireShape::Chat => BackendRequest::Chat {
                model: backend_model.to_string(),
                messages: input.to_messages(),
                stream: stream.then_some(true),
            },
        }
    }

    /// Extract the text fragment carried by one backend object
    ///
    /// Returns `None` when the object has no text for this shape (for example
    /// the final `done` object of a chat stream without a message).
    pub fn fragment<'a>(&self, chunk: &'a BackendChunk) -> Option<&'a str> {
        match self {
            WireShape::Generate => chunk.response.as_deref(),
            WireShape::Chat => chunk
                .message
                .as_ref()
                .and_then(|m| m.content.as_deref()),
        }
    }
}

impl std::fmt::Display for WireShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    /// Defaults to `user` when the caller leaves it out
    #[serde(default = "default_role")]
    pub role: String,
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl ChatMessage {
    /// Create a user-role message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Validated textual input of a chat request
///
/// Construction goes through the request validation, so a `ChatInput` always
/// carries at least one non-blank piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Prompt(String),
    Messages(Vec<ChatMessage>),
}

impl ChatInput {
    /// Number of characters of text the caller sent
    pub fn char_len(&self) -> usize {
        match self {
            ChatInput::Prompt(p) => p.chars().count(),
            ChatInput::Messages(ms) => ms.iter().map(|m| m.content.chars().count()).sum(),
        }
    }

    /// Flatten into a single prompt for the generate shape
    ///
    /// A lone message is sent as its bare content; longer conversations are
    /// rendered as `role: content` blocks separated by blank lines.
    pub fn to_prompt(&self) -> String {
        match self {
            ChatInput::Prompt(p) => p.clone(),
            ChatInput::Messages(ms) if ms.len() == 1 => ms[0].content.clone(),
            ChatInput::Messages(ms) => ms
                .iter()
                .map(|m| format!("{}: {}", m.role, m.content))
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    /// Expand into a message list for the chat shape
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        match self {
            ChatInput::Prompt(p) => vec![ChatMessage::user(p.clone())],
            ChatInput::Messages(ms) => ms.clone(),
        }
    }
}

/// Body sent to a backend generation endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BackendRequest {
    Generate {
        model: String,
        prompt: String,
        stream: bool,
    },
    Chat {
        model: String,
        messages: Vec<ChatMessage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stream: Option<bool>,
    },
}

/// One JSON object returned by a backend, either the whole non-streamed
/// reply or one line of a stream
///
/// Every field is optional so that both shapes (and error objects) parse
/// into the same type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Response of `GET /api/tags`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagModel {
    pub name: String,
}
