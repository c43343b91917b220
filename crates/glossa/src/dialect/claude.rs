//! Anthropic-style dialect
//!
//! Renders a single merged system string plus a strictly alternating
//! user/assistant message array. Tool definitions ride in the system text
//! and tool traffic is embedded as XML blocks: calls on the assistant side,
//! results on the user side.

use serde_json::{Value, json};

use crate::dialect::{ModelSpec, Side, TranslateOptions, Turn, WirePayload, repair_alternation};
use crate::error::Result;
use crate::prompt::{Message, MessageKind, Prompt};
use crate::toolcall;

pub(crate) fn translate(
    prompt: &Prompt,
    kept: &[&Message],
    spec: &ModelSpec,
    options: &TranslateOptions,
) -> Result<WirePayload> {
    let system = system_text(prompt, kept);

    let turns: Vec<Turn> = kept
        .iter()
        .filter(|m| m.kind != MessageKind::System)
        .map(|message| render_turn(message, spec))
        .collect();

    let turns = repair_alternation(turns, &options.filler_turn);

    let messages: Vec<Value> = turns
        .into_iter()
        .map(|turn| {
            let role = match turn.side {
                Side::User => "user",
                Side::Assistant => "assistant",
            };
            json!({ "role": role, "content": turn.content })
        })
        .collect();

    Ok(WirePayload::Json(json!({
        "system": system,
        "messages": messages,
    })))
}

/// Merge all retained system messages into one string, chronologically, and
/// append the tool list for models without native function calling.
fn system_text(prompt: &Prompt, kept: &[&Message]) -> String {
    let mut system = kept
        .iter()
        .filter(|m| m.kind == MessageKind::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if prompt.has_tools() {
        if !system.is_empty() {
            system.push_str("\n\n");
        }
        system.push_str(&toolcall::render_tool_list(prompt.tools()));
    }

    system
}

fn render_turn(message: &Message, spec: &ModelSpec) -> Turn {
    match message.kind {
        MessageKind::User => Turn {
            side: Side::User,
            content: user_content(message, spec),
        },
        MessageKind::Model => Turn::text(Side::Assistant, message.content.clone()),
        MessageKind::ToolCall => {
            let id = message.id.as_deref().unwrap_or_default();
            Turn::text(
                Side::Assistant,
                toolcall::render_call_message(id, &message.content),
            )
        }
        MessageKind::Tool => {
            let id = message.id.as_deref().unwrap_or_default();
            Turn::text(Side::User, toolcall::render_result(id, &message.content))
        }
        // System turns are filtered out by the caller.
        MessageKind::System => Turn::text(Side::User, message.content.clone()),
    }
}

fn user_content(message: &Message, spec: &ModelSpec) -> Value {
    if !spec.vision || message.attachments.is_empty() {
        return Value::String(message.content.clone());
    }

    let mut parts: Vec<Value> = message
        .attachments
        .iter()
        .map(|attachment| {
            json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": attachment.mime_type,
                    "data": attachment.data,
                }
            })
        })
        .collect();
    parts.push(json!({ "type": "text", "text": message.content }));
    Value::Array(parts)
}
