//! Dialect translation: abstract prompt to provider wire payload
//!
//! A dialect is a stateless translator from a [`Prompt`] to the exact wire
//! representation one provider family expects. Selection is a capability
//! probe over known model identifiers; translation is a pure function of
//! the prompt and model name. Trimming and turn-alternation repair are
//! shared across families.

mod chat_gpt;
mod claude;
mod command;
mod instruct;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{GlossaError, Result};
use crate::prompt::{Message, MessageKind, Prompt};
use crate::tokenizer::{
    ANTHROPIC_TOKENIZER, COHERE_TOKENIZER, INSTRUCT_TOKENIZER, OPENAI_TOKENIZER, Tokenizer,
};

/// The provider families Glossa can translate for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    /// OpenAI-style role arrays with native function calling
    ChatGpt,
    /// Anthropic-style system + strictly alternating messages
    Claude,
    /// Cohere-style preamble / chat_history / message
    Command,
    /// Raw instruction-tag templates for open-weight chat models
    Instruct,
}

impl ProviderFamily {
    /// Whether this family claims the given model name.
    pub fn can_translate(&self, model: &str) -> bool {
        builtin_specs()
            .iter()
            .any(|spec| spec.family == *self && model.starts_with(spec.prefix.as_str()))
    }

    /// The tokenizer whose counts match this family's budget math.
    pub fn tokenizer(&self) -> &'static dyn Tokenizer {
        match self {
            ProviderFamily::ChatGpt => &*OPENAI_TOKENIZER,
            ProviderFamily::Claude => &*ANTHROPIC_TOKENIZER,
            ProviderFamily::Command => &*COHERE_TOKENIZER,
            ProviderFamily::Instruct => &*INSTRUCT_TOKENIZER,
        }
    }

    /// Fixed per-message token overhead covering role/delimiter framing.
    pub fn message_overhead(&self) -> usize {
        match self {
            ProviderFamily::ChatGpt => 5,
            ProviderFamily::Claude => 3,
            ProviderFamily::Command => 0,
            ProviderFamily::Instruct => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFamily::ChatGpt => "chat_gpt",
            ProviderFamily::Claude => "claude",
            ProviderFamily::Command => "command",
            ProviderFamily::Instruct => "instruct",
        }
    }

    fn parse(name: &str) -> Result<Self> {
        match name {
            "chat_gpt" | "openai" => Ok(ProviderFamily::ChatGpt),
            "claude" | "anthropic" => Ok(ProviderFamily::Claude),
            "command" | "cohere" => Ok(ProviderFamily::Command),
            "instruct" => Ok(ProviderFamily::Instruct),
            other => Err(GlossaError::Config(format!(
                "Unknown provider family '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the model capability table.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Model-name prefix this entry claims (longest match wins)
    pub prefix: String,
    pub family: ProviderFamily,
    /// Context window in tokens
    pub context_tokens: usize,
    /// Whether user-message image attachments are inlined
    pub vision: bool,
}

/// A model registered via configuration on top of the built-in table.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelOverride {
    pub name: String,
    pub family: String,
    pub context_tokens: usize,
    #[serde(default)]
    pub vision: bool,
}

fn builtin_specs() -> Vec<ModelSpec> {
    let spec = |prefix: &str, family, context_tokens, vision| ModelSpec {
        prefix: prefix.to_string(),
        family,
        context_tokens,
        vision,
    };

    vec![
        spec("gpt-3.5-turbo", ProviderFamily::ChatGpt, 16_385, false),
        spec("gpt-4", ProviderFamily::ChatGpt, 8_192, false),
        spec("gpt-4-turbo", ProviderFamily::ChatGpt, 128_000, true),
        spec("gpt-4o", ProviderFamily::ChatGpt, 128_000, true),
        spec("claude-instant-1", ProviderFamily::Claude, 100_000, false),
        spec("claude-2", ProviderFamily::Claude, 100_000, false),
        spec("claude-3-haiku", ProviderFamily::Claude, 200_000, true),
        spec("claude-3-sonnet", ProviderFamily::Claude, 200_000, true),
        spec("claude-3-opus", ProviderFamily::Claude, 200_000, true),
        spec("command-light", ProviderFamily::Command, 4_096, false),
        spec("command", ProviderFamily::Command, 4_096, false),
        spec("command-r", ProviderFamily::Command, 128_000, false),
        spec("command-r-plus", ProviderFamily::Command, 128_000, false),
        spec("mistral-7b-instruct", ProviderFamily::Instruct, 32_768, false),
        spec("mixtral-8x7b-instruct", ProviderFamily::Instruct, 32_768, false),
        spec("llama2-70b-chat", ProviderFamily::Instruct, 4_096, false),
        spec("stablebeluga2", ProviderFamily::Instruct, 4_096, false),
    ]
}

/// The model capability table used for dialect selection.
#[derive(Debug, Clone)]
pub struct ModelTable {
    specs: Vec<ModelSpec>,
}

impl ModelTable {
    /// The built-in table of known provider model identifiers.
    pub fn builtin() -> Self {
        Self {
            specs: builtin_specs(),
        }
    }

    /// Built-in table extended with configured model entries.
    pub fn with_overrides(overrides: &[ModelOverride]) -> Result<Self> {
        let mut specs = builtin_specs();
        for entry in overrides {
            specs.push(ModelSpec {
                prefix: entry.name.clone(),
                family: ProviderFamily::parse(&entry.family)?,
                context_tokens: entry.context_tokens,
                vision: entry.vision,
            });
        }
        Ok(Self { specs })
    }

    /// All known model entries.
    pub fn specs(&self) -> &[ModelSpec] {
        &self.specs
    }

    /// Resolve the dialect for a model name.
    ///
    /// Longest-prefix match over the table, so "gpt-4-turbo" beats "gpt-4".
    ///
    /// # Errors
    /// `GlossaError::NoDialectFor` when no entry claims the name.
    pub fn select(&self, model: &str) -> Result<Dialect> {
        let spec = self
            .specs
            .iter()
            .filter(|spec| model.starts_with(spec.prefix.as_str()))
            .max_by_key(|spec| spec.prefix.len())
            .cloned()
            .ok_or_else(|| GlossaError::NoDialectFor(model.to_string()))?;

        debug!(model, family = %spec.family, "dialect selected");

        Ok(Dialect {
            family: spec.family,
            model: model.to_string(),
            spec,
            options: TranslateOptions::default(),
        })
    }
}

/// Knobs the caller can adjust per deployment.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Tokens held back from the context window for the model's reply
    pub reserved_output_tokens: usize,
    /// Synthetic turn inserted to restore strict alternation
    pub filler_turn: String,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            reserved_output_tokens: 3_500,
            filler_turn: "OK".to_string(),
        }
    }
}

/// The provider-specific request body produced by translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WirePayload {
    /// Structured JSON body (OpenAI-, Anthropic-, Cohere-style)
    Json(Value),
    /// A single rendered template string (instruction-tag models)
    Text(String),
}

impl WirePayload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            WirePayload::Json(value) => Some(value),
            WirePayload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            WirePayload::Text(text) => Some(text),
            WirePayload::Json(_) => None,
        }
    }
}

/// An ephemeral translator bound to one model name.
///
/// Created per completion call via [`ModelTable::select`] (or
/// [`Dialect::select`] for the built-in table), used once, discarded.
#[derive(Debug, Clone)]
pub struct Dialect {
    family: ProviderFamily,
    model: String,
    spec: ModelSpec,
    options: TranslateOptions,
}

impl Dialect {
    /// Resolve a dialect from the built-in model table.
    pub fn select(model: &str) -> Result<Self> {
        ModelTable::builtin().select(model)
    }

    pub fn family(&self) -> ProviderFamily {
        self.family
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The model's context window in tokens.
    pub fn max_prompt_tokens(&self) -> usize {
        self.spec.context_tokens
    }

    pub fn vision_capable(&self) -> bool {
        self.spec.vision
    }

    pub fn with_options(mut self, options: TranslateOptions) -> Self {
        self.options = options;
        self
    }

    /// Translate the prompt into this provider's wire payload.
    ///
    /// Pure and idempotent: the same prompt and model yield byte-identical
    /// output. Raises before returning any partial payload.
    pub fn translate(&self, prompt: &Prompt) -> Result<WirePayload> {
        let kept = trim_to_budget(
            prompt.messages(),
            self.family.tokenizer(),
            self.family.message_overhead(),
            self.max_prompt_tokens()
                .saturating_sub(self.options.reserved_output_tokens),
        )?;

        match self.family {
            ProviderFamily::ChatGpt => chat_gpt::translate(prompt, &kept, &self.spec),
            ProviderFamily::Claude => claude::translate(prompt, &kept, &self.spec, &self.options),
            ProviderFamily::Command => command::translate(prompt, &kept, &self.spec),
            ProviderFamily::Instruct => {
                instruct::translate(prompt, &kept, &self.model, &self.options)
            }
        }
    }
}

/// Trim a conversation to a token budget.
///
/// System messages are always retained. Non-system messages are accumulated
/// newest-first until the budget would be exceeded; older messages are
/// dropped whole - a kept message is never truncated. The result is in
/// original chronological order.
fn trim_to_budget<'a>(
    messages: &'a [Message],
    tokenizer: &dyn Tokenizer,
    message_overhead: usize,
    budget: usize,
) -> Result<Vec<&'a Message>> {
    let cost = |message: &Message| tokenizer.size(&message.content) + message_overhead;

    let system_cost: usize = messages
        .iter()
        .filter(|m| m.kind == MessageKind::System)
        .map(cost)
        .sum();

    let mut keep = vec![false; messages.len()];
    for (index, message) in messages.iter().enumerate() {
        if message.kind == MessageKind::System {
            keep[index] = true;
        }
    }

    let mut remaining = budget.saturating_sub(system_cost);
    let mut kept_count = 0;
    for (index, message) in messages.iter().enumerate().rev() {
        if message.kind == MessageKind::System {
            continue;
        }
        let message_cost = cost(message);
        if message_cost > remaining {
            break;
        }
        remaining -= message_cost;
        keep[index] = true;
        kept_count += 1;
    }

    let conversation_len = messages
        .iter()
        .filter(|m| m.kind != MessageKind::System)
        .count();
    if conversation_len > 0 && kept_count == 0 {
        let newest = messages
            .iter()
            .rev()
            .find(|m| m.kind != MessageKind::System)
            .map(cost)
            .unwrap_or(0);
        return Err(GlossaError::PromptTooLong {
            needed: system_cost + newest,
            budget,
        });
    }

    if kept_count < conversation_len {
        debug!(
            dropped = conversation_len - kept_count,
            kept = kept_count,
            "trimmed conversation to budget"
        );
    }

    Ok(messages
        .iter()
        .enumerate()
        .filter(|(index, _)| keep[*index])
        .map(|(_, message)| message)
        .collect())
}

/// Which side of a strictly alternating conversation a turn lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    User,
    Assistant,
}

impl Side {
    fn opposite(&self) -> Side {
        match self {
            Side::User => Side::Assistant,
            Side::Assistant => Side::User,
        }
    }
}

/// One rendered turn of an alternation-bound conversation.
#[derive(Debug, Clone)]
pub(crate) struct Turn {
    pub side: Side,
    pub content: Value,
}

impl Turn {
    pub(crate) fn text(side: Side, content: impl Into<String>) -> Self {
        Self {
            side,
            content: Value::String(content.into()),
        }
    }
}

/// Restore strict user/assistant alternation.
///
/// Whenever two consecutive turns share a side, a minimal filler turn of
/// the opposite side is inserted between them; if the conversation opens on
/// the assistant side, a filler user turn is prepended. Existing content is
/// never altered.
pub(crate) fn repair_alternation(turns: Vec<Turn>, filler: &str) -> Vec<Turn> {
    let mut repaired: Vec<Turn> = Vec::with_capacity(turns.len());

    for turn in turns {
        let needs_filler = match repaired.last() {
            None => turn.side == Side::Assistant,
            Some(previous) => previous.side == turn.side,
        };
        if needs_filler {
            repaired.push(Turn::text(turn.side.opposite(), filler));
        }
        repaired.push(turn);
    }

    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Message;

    fn tokenizer() -> &'static dyn Tokenizer {
        &*OPENAI_TOKENIZER
    }

    #[test]
    fn test_select_by_prefix() {
        let dialect = Dialect::select("gpt-4o-2024-05-13").unwrap();
        assert_eq!(dialect.family(), ProviderFamily::ChatGpt);
        assert!(dialect.vision_capable());

        let dialect = Dialect::select("claude-3-opus-20240229").unwrap();
        assert_eq!(dialect.family(), ProviderFamily::Claude);
        assert_eq!(dialect.max_prompt_tokens(), 200_000);
    }

    #[test]
    fn test_select_longest_prefix_wins() {
        let dialect = Dialect::select("command-r-plus").unwrap();
        assert_eq!(dialect.family(), ProviderFamily::Command);
        assert_eq!(dialect.max_prompt_tokens(), 128_000);
    }

    #[test]
    fn test_select_unknown_model_fails() {
        let err = Dialect::select("totally-unknown-model").unwrap_err();
        assert!(matches!(err, GlossaError::NoDialectFor(_)));
    }

    #[test]
    fn test_no_family_claims_anothers_model() {
        assert!(ProviderFamily::ChatGpt.can_translate("gpt-4"));
        assert!(!ProviderFamily::Claude.can_translate("gpt-4"));
        assert!(!ProviderFamily::Command.can_translate("gpt-4"));
        assert!(!ProviderFamily::Instruct.can_translate("gpt-4"));
    }

    #[test]
    fn test_model_override_extends_table() {
        let overrides = vec![ModelOverride {
            name: "my-fine-tune".to_string(),
            family: "instruct".to_string(),
            context_tokens: 8_192,
            vision: false,
        }];
        let table = ModelTable::with_overrides(&overrides).unwrap();
        let dialect = table.select("my-fine-tune").unwrap();
        assert_eq!(dialect.family(), ProviderFamily::Instruct);
        assert_eq!(dialect.max_prompt_tokens(), 8_192);
    }

    #[test]
    fn test_model_override_bad_family_fails() {
        let overrides = vec![ModelOverride {
            name: "x".to_string(),
            family: "nope".to_string(),
            context_tokens: 1,
            vision: false,
        }];
        assert!(ModelTable::with_overrides(&overrides).is_err());
    }

    #[test]
    fn test_trim_keeps_system_and_newest() {
        let messages = vec![
            Message::system("sys"),
            Message::user("old ".repeat(100)),
            Message::model("middle"),
            Message::user("newest"),
        ];
        // Budget fits system + the two newest turns but not the old one.
        let kept = trim_to_budget(&messages, tokenizer(), 5, 30).unwrap();
        let contents: Vec<&str> = kept.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["sys", "middle", "newest"]);
    }

    #[test]
    fn test_trim_keeps_chronological_order() {
        let messages = vec![
            Message::user("one"),
            Message::system("sys"),
            Message::user("two"),
        ];
        let kept = trim_to_budget(&messages, tokenizer(), 0, 1_000).unwrap();
        let contents: Vec<&str> = kept.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "sys", "two"]);
    }

    #[test]
    fn test_trim_never_truncates_a_kept_message() {
        let long = "word ".repeat(50);
        let messages = vec![Message::system("sys"), Message::user(long.clone())];
        let kept = trim_to_budget(&messages, tokenizer(), 5, 10_000).unwrap();
        assert_eq!(kept.last().unwrap().content, long);
    }

    #[test]
    fn test_trim_impossible_budget_is_capacity_error() {
        let messages = vec![
            Message::system("system prompt ".repeat(10)),
            Message::user("user turn ".repeat(10)),
        ];
        let err = trim_to_budget(&messages, tokenizer(), 5, 10).unwrap_err();
        assert!(matches!(err, GlossaError::PromptTooLong { .. }));
    }

    #[test]
    fn test_trim_system_only_prompt_is_fine() {
        let messages = vec![Message::system("sys")];
        let kept = trim_to_budget(&messages, tokenizer(), 0, 1_000).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_repair_alternation_inserts_filler() {
        let turns = vec![
            Turn::text(Side::User, "a"),
            Turn::text(Side::User, "b"),
            Turn::text(Side::Assistant, "c"),
            Turn::text(Side::Assistant, "d"),
        ];
        let repaired = repair_alternation(turns, "OK");
        let sides: Vec<Side> = repaired.iter().map(|t| t.side).collect();
        assert_eq!(
            sides,
            vec![
                Side::User,
                Side::Assistant,
                Side::User,
                Side::Assistant,
                Side::User,
                Side::Assistant
            ]
        );
        assert_eq!(repaired[1].content, Value::String("OK".to_string()));
    }

    #[test]
    fn test_repair_alternation_prepends_user_filler() {
        let turns = vec![Turn::text(Side::Assistant, "hello")];
        let repaired = repair_alternation(turns, "OK");
        assert_eq!(repaired[0].side, Side::User);
        assert_eq!(repaired[1].side, Side::Assistant);
    }

    #[test]
    fn test_repair_alternation_pathological_run() {
        let turns: Vec<Turn> = (0..10).map(|i| Turn::text(Side::User, format!("u{i}"))).collect();
        let repaired = repair_alternation(turns, "OK");
        for pair in repaired.windows(2) {
            assert_ne!(pair[0].side, pair[1].side);
        }
    }
}
