//! OpenAI-style dialect
//!
//! Renders the prompt as a `messages` role array with native function
//! definitions. Tool calls map to the `function_call` assistant field and
//! tool results to `function` role messages, so no XML block rides inside
//! the conversation text.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::dialect::{ModelSpec, WirePayload};
use crate::error::Result;
use crate::prompt::{Message, MessageKind, Prompt, ToolDefinition};
use crate::toolcall::ToolCallPayload;

pub(crate) fn translate(
    prompt: &Prompt,
    kept: &[&Message],
    spec: &ModelSpec,
) -> Result<WirePayload> {
    // function-role messages carry the tool *name*, which lives on the
    // originating call rather than the result.
    let call_names: HashMap<&str, String> = kept
        .iter()
        .filter(|m| m.kind == MessageKind::ToolCall)
        .filter_map(|m| {
            let id = m.id.as_deref()?;
            let payload = ToolCallPayload::parse(&m.content)?;
            Some((id, payload.name))
        })
        .collect();

    let mut messages = Vec::with_capacity(kept.len());
    for message in kept {
        messages.push(render_message(message, spec, &call_names));
    }

    let mut body = json!({ "messages": messages });
    if prompt.has_tools() {
        body["functions"] = Value::Array(prompt.tools().iter().map(render_function).collect());
    }

    Ok(WirePayload::Json(body))
}

fn render_message(
    message: &Message,
    spec: &ModelSpec,
    call_names: &HashMap<&str, String>,
) -> Value {
    match message.kind {
        MessageKind::System => json!({ "role": "system", "content": message.content }),
        MessageKind::User => {
            let mut rendered = json!({ "role": "user", "content": user_content(message, spec) });
            if let Some(name) = &message.id {
                rendered["name"] = Value::String(name.clone());
            }
            rendered
        }
        MessageKind::Model => json!({ "role": "assistant", "content": message.content }),
        MessageKind::ToolCall => match ToolCallPayload::parse(&message.content) {
            Some(payload) => json!({
                "role": "assistant",
                "content": Value::Null,
                "function_call": {
                    "name": payload.name,
                    "arguments": Value::Object(payload.arguments).to_string(),
                }
            }),
            None => json!({ "role": "assistant", "content": message.content }),
        },
        MessageKind::Tool => {
            let id = message.id.as_deref().unwrap_or_default();
            let name = call_names.get(id).cloned().unwrap_or_else(|| id.to_string());
            json!({ "role": "function", "name": name, "content": message.content })
        }
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
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{}", attachment.mime_type, attachment.data)
                }
            })
        })
        .collect();
    parts.push(json!({ "type": "text", "text": message.content }));
    Value::Array(parts)
}

fn render_function(tool: &ToolDefinition) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for parameter in &tool.parameters {
        let mut schema = Map::new();
        schema.insert(
            "type".to_string(),
            Value::String(parameter.kind.as_json_type().to_string()),
        );
        if !parameter.description.is_empty() {
            schema.insert(
                "description".to_string(),
                Value::String(parameter.description.clone()),
            );
        }
        if let Some(values) = &parameter.allowed_values {
            schema.insert(
                "enum".to_string(),
                Value::Array(values.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(item_kind) = &parameter.item_kind {
            schema.insert(
                "items".to_string(),
                json!({ "type": item_kind.as_json_type() }),
            );
        }
        properties.insert(parameter.name.clone(), Value::Object(schema));
        if parameter.required {
            required.push(Value::String(parameter.name.clone()));
        }
    }

    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::prompt::{Attachment, ParameterKind, ToolParameter};

    fn simple_prompt() -> Prompt {
        Prompt::new(
            vec![
                Message::system("be brief"),
                Message::user("hello").with_id("alice"),
                Message::model("hi"),
            ],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_roles_map_to_openai_names() {
        let payload = Dialect::select("gpt-4")
            .unwrap()
            .translate(&simple_prompt())
            .unwrap();
        let body = payload.as_json().unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["name"], "alice");
        assert_eq!(messages[2]["role"], "assistant");
    }

    #[test]
    fn test_native_function_definitions() {
        let tools = vec![
            ToolDefinition::new("get_weather", "Look up the weather").with_parameter(
                ToolParameter::new("location", ParameterKind::String)
                    .required()
                    .with_description("City name"),
            ),
        ];
        let prompt = Prompt::new(vec![Message::user("weather in Paris?")], tools).unwrap();
        let payload = Dialect::select("gpt-4").unwrap().translate(&prompt).unwrap();
        let body = payload.as_json().unwrap();

        let functions = body["functions"].as_array().unwrap();
        assert_eq!(functions[0]["name"], "get_weather");
        assert_eq!(
            functions[0]["parameters"]["properties"]["location"]["type"],
            "string"
        );
        assert_eq!(functions[0]["parameters"]["required"][0], "location");
    }

    #[test]
    fn test_tool_call_and_result_use_native_fields() {
        let prompt = Prompt::new(
            vec![
                Message::user("weather?"),
                Message::tool_call("call_1", r#"{"name":"get_weather","arguments":{"location":"Paris"}}"#),
                Message::tool_result("call_1", "sunny"),
            ],
            vec![],
        )
        .unwrap();
        let payload = Dialect::select("gpt-4").unwrap().translate(&prompt).unwrap();
        let messages = payload.as_json().unwrap()["messages"].as_array().unwrap();

        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["function_call"]["name"], "get_weather");
        assert!(messages[1]["function_call"]["arguments"]
            .as_str()
            .unwrap()
            .contains("Paris"));
        assert_eq!(messages[2]["role"], "function");
        assert_eq!(messages[2]["name"], "get_weather");
        assert_eq!(messages[2]["content"], "sunny");
    }

    #[test]
    fn test_vision_model_inlines_attachments() {
        let prompt = Prompt::new(
            vec![Message::user("what is this?").with_attachment(Attachment {
                mime_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            })],
            vec![],
        )
        .unwrap();
        let payload = Dialect::select("gpt-4o").unwrap().translate(&prompt).unwrap();
        let content = &payload.as_json().unwrap()["messages"][0]["content"];

        let parts = content.as_array().unwrap();
        assert_eq!(parts[0]["type"], "image_url");
        assert!(parts[0]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(parts[1]["text"], "what is this?");
    }

    #[test]
    fn test_non_vision_model_drops_attachments() {
        let prompt = Prompt::new(
            vec![Message::user("what is this?").with_attachment(Attachment {
                mime_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            })],
            vec![],
        )
        .unwrap();
        let payload = Dialect::select("gpt-4").unwrap().translate(&prompt).unwrap();
        let content = &payload.as_json().unwrap()["messages"][0]["content"];
        assert_eq!(content, "what is this?");
    }

    #[test]
    fn test_translate_is_idempotent() {
        let dialect = Dialect::select("gpt-4").unwrap();
        let prompt = simple_prompt();
        let first = serde_json::to_string(dialect.translate(&prompt).unwrap().as_json().unwrap())
            .unwrap();
        let second = serde_json::to_string(dialect.translate(&prompt).unwrap().as_json().unwrap())
            .unwrap();
        assert_eq!(first, second);
    }
}
