//! Tool definitions available to the model
//!
//! Describes the external capabilities a model may invoke. Dialects with
//! native function calling map these to structured request fields; the rest
//! render them as an XML block inside the conversation text.

use serde::{Deserialize, Serialize};

/// The wire type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    #[default]
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterKind {
    /// The JSON-schema type name used by native function-calling fields.
    pub fn as_json_type(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Number => "number",
            ParameterKind::Boolean => "boolean",
            ParameterKind::Array => "array",
            ParameterKind::Object => "object",
        }
    }
}

/// One parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(default)]
    pub kind: ParameterKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Allowed values, when the parameter is an enumeration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    /// Element type, when `kind` is `Array`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_kind: Option<ParameterKind>,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            required: false,
            allowed_values: None,
            item_kind: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A tool the model may invoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}
