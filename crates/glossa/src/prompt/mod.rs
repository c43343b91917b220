//! Prompt types for the Glossa system
//!
//! Defines the abstract, provider-independent conversation model: ordered
//! turns of system/user/model/tool messages plus the tool definitions the
//! model may invoke. A `Prompt` is immutable once constructed and is owned
//! read-only for the duration of one translate+send+normalize cycle.

mod tools;

pub use tools::{ParameterKind, ToolDefinition, ToolParameter};

use serde::{Deserialize, Serialize};

use crate::error::{GlossaError, Result};

/// The role a message plays in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Instructions that frame the whole conversation
    System,
    /// A human turn
    User,
    /// A model turn (plain prose)
    Model,
    /// A model turn requesting a tool invocation
    ToolCall,
    /// The result of a previously requested tool invocation
    Tool,
}

/// An image reference attached to a user message.
///
/// Only meaningful for `User` turns sent to vision-capable models; dialects
/// targeting non-vision models drop attachments entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type of the image (e.g. "image/png")
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// What kind of turn this is
    pub kind: MessageKind,
    /// The text content of the turn
    pub content: String,
    /// Author username for `User` turns, or the invocation id correlating a
    /// `ToolCall` with its matching `Tool` result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Image attachments (user turns only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            id: None,
            attachments: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageKind::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageKind::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Model, content)
    }

    /// A model turn requesting the invocation identified by `id`.
    pub fn tool_call(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::ToolCall,
            content: content.into(),
            id: Some(id.into()),
            attachments: Vec::new(),
        }
    }

    /// A tool result correlating back to the `ToolCall` with the same id.
    pub fn tool_result(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Tool,
            content: content.into(),
            id: Some(id.into()),
            attachments: Vec::new(),
        }
    }

    /// Attach an author username (user turns) or override the invocation id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach an image to this turn.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// The abstract conversation: ordered messages plus available tools.
///
/// Order is chronological and is never reordered by translation - only
/// filtered (trimming) or interleaved with synthetic filler turns.
/// Deserialization goes through [`Prompt::new`], so a prompt read from a
/// file carries the same invariants as one built in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PromptData")]
pub struct Prompt {
    messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
}

#[derive(Deserialize)]
struct PromptData {
    messages: Vec<Message>,
    #[serde(default)]
    tools: Vec<ToolDefinition>,
}

impl TryFrom<PromptData> for Prompt {
    type Error = GlossaError;

    fn try_from(data: PromptData) -> Result<Self> {
        Prompt::new(data.messages, data.tools)
    }
}

impl Prompt {
    /// Construct a prompt, validating conversation invariants.
    ///
    /// # Errors
    /// Returns `GlossaError::Prompt` if a `Tool` result does not correlate
    /// back to a preceding `ToolCall`, or if a `Tool`/`ToolCall` turn is
    /// missing its invocation id.
    pub fn new(messages: Vec<Message>, tools: Vec<ToolDefinition>) -> Result<Self> {
        let mut pending_calls: Vec<&str> = Vec::new();

        for message in &messages {
            match message.kind {
                MessageKind::ToolCall => {
                    let id = message.id.as_deref().ok_or_else(|| {
                        GlossaError::Prompt("tool_call message is missing an invocation id".into())
                    })?;
                    pending_calls.push(id);
                }
                MessageKind::Tool => {
                    let id = message.id.as_deref().ok_or_else(|| {
                        GlossaError::Prompt("tool message is missing an invocation id".into())
                    })?;
                    if !pending_calls.contains(&id) {
                        return Err(GlossaError::Prompt(format!(
                            "tool result '{id}' has no preceding tool_call"
                        )));
                    }
                }
                _ => {}
            }
        }

        Ok(Self { messages, tools })
    }

    /// All turns, in chronological order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The tools the model may invoke.
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Whether any tools are available to the model.
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}
