//! Instruction-template dialect for open-weight chat models
//!
//! Produces a single rendered string. Two framings exist: the mistral
//! family wraps turns in `[INST] ... [/INST]` tags, everything else uses
//! `### System:` / `### User:` / `### Assistant:` headers. Tool traffic is
//! embedded as XML blocks and attachments are dropped (no vision models in
//! this family).

use crate::dialect::{Side, TranslateOptions, Turn, WirePayload, repair_alternation};
use crate::error::Result;
use crate::prompt::{Message, MessageKind, Prompt};
use crate::toolcall;

pub(crate) fn translate(
    prompt: &Prompt,
    kept: &[&Message],
    model: &str,
    options: &TranslateOptions,
) -> Result<WirePayload> {
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

    let turns: Vec<Turn> = kept
        .iter()
        .filter(|m| m.kind != MessageKind::System)
        .map(|message| render_turn(message))
        .collect();
    let turns = repair_alternation(turns, &options.filler_turn);

    let rendered = if uses_inst_tags(model) {
        render_inst(&system, &turns)
    } else {
        render_headers(&system, &turns)
    };

    Ok(WirePayload::Text(rendered))
}

fn uses_inst_tags(model: &str) -> bool {
    model.starts_with("mistral") || model.starts_with("mixtral")
}

fn render_turn(message: &Message) -> Turn {
    match message.kind {
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
        _ => Turn::text(Side::User, message.content.clone()),
    }
}

fn turn_text(turn: &Turn) -> &str {
    turn.content.as_str().unwrap_or_default()
}

fn render_inst(system: &str, turns: &[Turn]) -> String {
    if turns.is_empty() {
        return system.to_string();
    }

    let mut out = String::from("<s>");
    let mut first_user = true;

    for turn in turns {
        match turn.side {
            Side::User => {
                if first_user && !system.is_empty() {
                    out.push_str(&format!(
                        "[INST] <<SYS>>\n{system}\n<</SYS>>\n\n{} [/INST]",
                        turn_text(turn)
                    ));
                } else {
                    out.push_str(&format!("[INST] {} [/INST]", turn_text(turn)));
                }
                first_user = false;
            }
            Side::Assistant => {
                out.push_str(&format!(" {}</s><s>", turn_text(turn)));
            }
        }
    }

    if let Some(stripped) = out.strip_suffix("<s>") {
        stripped.to_string()
    } else {
        out
    }
}

fn render_headers(system: &str, turns: &[Turn]) -> String {
    let mut out = String::new();
    if !system.is_empty() {
        out.push_str(&format!("### System:\n{system}\n\n"));
    }

    for turn in turns {
        let header = match turn.side {
            Side::User => "### User:",
            Side::Assistant => "### Assistant:",
        };
        out.push_str(&format!("{header}\n{}\n\n", turn_text(turn)));
    }

    // Cue the model to answer when the conversation ends on the user side.
    if turns.last().map(|t| t.side) != Some(Side::Assistant) {
        out.push_str("### Assistant:\n");
    }

    out
}
