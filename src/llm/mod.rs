//! Language-model boundary.
//!
//! The resolver only sees [`LanguageModel`]: a system instruction, the
//! conversation so far and the tool definitions go in; text and tool calls
//! come out.

mod gemini;
pub mod mock;

pub use gemini::GeminiModel;

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One conversation turn
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    User(String),
    /// A model turn: free text and/or tool calls
    Model {
        text: String,
        calls: Vec<ToolCall>,
    },
    /// Outcome of a tool call, reported back to the model
    Tool { name: String, result: String },
}

/// A function the model may call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new<P: JsonSchema>(name: &str, description: &str) -> Result<Self, LlmError> {
        let schema = schema_for!(P);
        let parameters = serde_json::to_value(&schema.schema)
            .map_err(|e| LlmError::Schema(format!("{}: {}", name, e)))?;
        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Decode the arguments into a parameter struct
    pub fn args<O: DeserializeOwned>(&self) -> Result<O, LlmError> {
        serde_json::from_value(self.args.clone())
            .map_err(|e| LlmError::Arguments(format!("{}: {}", self.name, e)))
    }
}

impl std::fmt::Display for ToolCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.args)
    }
}

pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    /// No text and no tool calls
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.tool_calls.is_empty()
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete<'a>(&self, request: CompletionRequest<'a>) -> Result<Completion, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Model API returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unusable model response: {0}")]
    Response(String),

    #[error("Invalid tool schema: {0}")]
    Schema(String),

    #[error("Invalid tool arguments: {0}")]
    Arguments(String),
}
