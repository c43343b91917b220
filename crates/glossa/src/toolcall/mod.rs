//! Tool-call wire grammar
//!
//! The XML micro-protocol embedded in conversation text for providers
//! without native function-calling fields, and searched for by the stream
//! normalizer:
//!
//! ```text
//! <function_calls>
//! <invoke>
//! <tool_name>NAME</tool_name>
//! <tool_id>ID</tool_id>
//! <parameters>
//! <location>Paris</location>
//! </parameters>
//! </invoke>
//! </function_calls>
//! ```
//!
//! Rendering is deterministic: the same logical call produces identical
//! bytes every time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::prompt::ToolDefinition;

/// Exact opening marker the stream normalizer searches for.
pub const OPEN_MARKER: &str = "<function_calls>";

/// Exact closing marker the stream normalizer searches for.
pub const CLOSE_MARKER: &str = "</function_calls>";

/// The payload a `ToolCall` message carries in its content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, Value>,
}

impl ToolCallPayload {
    /// Parse a tool_call message's content, if it is a payload object.
    pub fn parse(content: &str) -> Option<Self> {
        serde_json::from_str(content).ok()
    }
}

/// Escape text for embedding inside an XML element.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape`].
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render one `<invoke>` element.
pub fn render_invoke(name: &str, id: &str, arguments: &serde_json::Map<String, Value>) -> String {
    let mut block = String::from("<invoke>\n");
    block.push_str(&format!("<tool_name>{}</tool_name>\n", escape(name)));
    block.push_str(&format!("<tool_id>{}</tool_id>\n", escape(id)));
    block.push_str("<parameters>\n");
    for (key, value) in arguments {
        block.push_str(&format!(
            "<{key}>{}</{key}>\n",
            escape(&value_text(value))
        ));
    }
    block.push_str("</parameters>\n");
    block.push_str("</invoke>");
    block
}

/// Render a full `<function_calls>` block for a tool_call message.
///
/// When the message content is not a parseable [`ToolCallPayload`], it is
/// assumed to already be a rendered block and is returned unchanged.
pub fn render_call_message(id: &str, content: &str) -> String {
    if content.contains(OPEN_MARKER) {
        return content.to_string();
    }
    match ToolCallPayload::parse(content) {
        Some(payload) => format!(
            "{OPEN_MARKER}\n{}\n{CLOSE_MARKER}",
            render_invoke(&payload.name, id, &payload.arguments)
        ),
        None => content.to_string(),
    }
}

/// Render a tool result block correlating back to its invocation.
pub fn render_result(id: &str, content: &str) -> String {
    format!(
        "<function_results>\n<result>\n<tool_id>{}</tool_id>\n<content>{}</content>\n</result>\n</function_results>",
        escape(id),
        escape(content)
    )
}

/// Render the available tools as an XML block for dialects without native
/// function-calling fields. Appended to the system text.
pub fn render_tool_list(tools: &[ToolDefinition]) -> String {
    if tools.is_empty() {
        return String::new();
    }

    let mut block = String::from("<tools>\n");
    for tool in tools {
        block.push_str("<tool>\n");
        block.push_str(&format!("<name>{}</name>\n", escape(&tool.name)));
        block.push_str(&format!(
            "<description>{}</description>\n",
            escape(&tool.description)
        ));
        block.push_str("<parameters>\n");
        for parameter in &tool.parameters {
            block.push_str("<parameter>\n");
            block.push_str(&format!("<name>{}</name>\n", escape(&parameter.name)));
            block.push_str(&format!("<type>{}</type>\n", parameter.kind.as_json_type()));
            if !parameter.description.is_empty() {
                block.push_str(&format!(
                    "<description>{}</description>\n",
                    escape(&parameter.description)
                ));
            }
            block.push_str(&format!("<required>{}</required>\n", parameter.required));
            if let Some(values) = &parameter.allowed_values {
                block.push_str(&format!("<options>{}</options>\n", escape(&values.join(","))));
            }
            block.push_str("</parameter>\n");
        }
        block.push_str("</parameters>\n");
        block.push_str("</tool>\n");
    }
    block.push_str("</tools>");
    block
}

/// Content span of the first `<tag>...</tag>` element at or after `from`.
fn find_element(haystack: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = haystack[from..].find(&open)? + from + open.len();
    let end = haystack[start..].find(&close)? + start;
    Some((start, end))
}

/// Inner text of the first `<tag>` element, if present.
pub fn element_text<'a>(haystack: &'a str, tag: &str) -> Option<&'a str> {
    find_element(haystack, tag, 0).map(|(start, end)| &haystack[start..end])
}

/// Normalize a raw tool-call block into exactly one well-formed
/// `<function_calls>` fragment.
///
/// Every `<invoke>` gains a `<tool_id>` child if the upstream text omitted
/// one or left it blank; synthetic ids are `tool_N` with N the invoke's
/// position in document order. Stray content outside the `<invoke>` elements
/// is discarded. Returns `None` when no `<invoke>` element can be found.
pub fn normalize_block(raw: &str) -> Option<String> {
    let body_start = raw.find(OPEN_MARKER).map(|i| i + OPEN_MARKER.len())?;
    let body = &raw[body_start..];

    let mut invokes = Vec::new();
    let mut cursor = 0;
    while let Some((start, end)) = find_element(body, "invoke", cursor) {
        invokes.push(&body[start..end]);
        cursor = end;
    }

    if invokes.is_empty() {
        return None;
    }

    let mut block = String::from(OPEN_MARKER);
    for (index, inner) in invokes.iter().enumerate() {
        block.push('\n');
        block.push_str("<invoke>");
        block.push_str(&ensure_tool_id(inner, index));
        block.push_str("</invoke>");
    }
    block.push('\n');
    block.push_str(CLOSE_MARKER);
    Some(block)
}

/// Insert or repair the `<tool_id>` child of one invoke body.
fn ensure_tool_id(inner: &str, index: usize) -> String {
    let synthetic = format!("tool_{index}");

    match find_element(inner, "tool_id", 0) {
        Some((start, end)) if !inner[start..end].trim().is_empty() => inner.to_string(),
        Some((start, end)) => {
            // Blank id - substitute the synthetic one in place.
            format!("{}{}{}", &inner[..start], synthetic, &inner[end..])
        }
        None => {
            let id_element = format!("<tool_id>{synthetic}</tool_id>");
            match inner.find("</tool_name>") {
                Some(pos) => {
                    let after = pos + "</tool_name>".len();
                    format!("{}\n{}{}", &inner[..after], id_element, &inner[after..])
                }
                None => format!("{id_element}\n{inner}"),
            }
        }
    }
}
