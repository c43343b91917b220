//! Cohere-style dialect
//!
//! Renders the system content as the `preamble`, the final user-side turn
//! as the standalone `message`, and everything in between as `chat_history`
//! with upper-case roles. Tool traffic is embedded as XML blocks.

use serde_json::{Value, json};

use crate::dialect::{ModelSpec, WirePayload};
use crate::error::Result;
use crate::prompt::{Message, MessageKind, Prompt};
use crate::toolcall;

pub(crate) fn translate(
    prompt: &Prompt,
    kept: &[&Message],
    _spec: &ModelSpec,
) -> Result<WirePayload> {
    let mut preamble = kept
        .iter()
        .filter(|m| m.kind == MessageKind::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if prompt.has_tools() {
        if !preamble.is_empty() {
            preamble.push_str("\n\n");
        }
        preamble.push_str(&toolcall::render_tool_list(prompt.tools()));
    }

    let mut rendered: Vec<(&'static str, String)> = kept
        .iter()
        .filter(|m| m.kind != MessageKind::System)
        .map(|message| render_turn(message))
        .collect();

    // The final user-side turn becomes the standalone message field.
    let message = match rendered.last() {
        Some(("USER", _)) => rendered.pop().map(|(_, content)| content).unwrap_or_default(),
        _ => String::new(),
    };

    let chat_history: Vec<Value> = rendered
        .into_iter()
        .map(|(role, content)| json!({ "role": role, "message": content }))
        .collect();

    Ok(WirePayload::Json(json!({
        "preamble": preamble,
        "chat_history": chat_history,
        "message": message,
    })))
}

fn render_turn(message: &Message) -> (&'static str, String) {
    match message.kind {
        MessageKind::User => ("USER", message.content.clone()),
        MessageKind::Model => ("CHATBOT", message.content.clone()),
        MessageKind::ToolCall => {
            let id = message.id.as_deref().unwrap_or_default();
            (
                "CHATBOT",
                toolcall::render_call_message(id, &message.content),
            )
        }
        MessageKind::Tool => {
            let id = message.id.as_deref().unwrap_or_default();
            ("USER", toolcall::render_result(id, &message.content))
        }
        MessageKind::System => ("SYSTEM", message.content.clone()),
    }
}
