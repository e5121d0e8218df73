//! Scripted language model for tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Completion, CompletionRequest, LanguageModel, LlmError, Message, ToolCall};

/// What the model saw on one call
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Answers calls from a queue of canned completions, in order.
///
/// An exhausted script answers with an error.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<Completion, LlmError>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a single tool call
    pub fn calls(self, name: &str, args: Value) -> Self {
        self.push(Ok(Completion {
            text: String::new(),
            tool_calls: vec![ToolCall::new(name, args)],
        }))
    }

    /// Queue one answer carrying several tool calls
    pub fn calls_all(self, calls: &[(&str, Value)]) -> Self {
        self.push(Ok(Completion {
            text: String::new(),
            tool_calls: calls
                .iter()
                .map(|(name, args)| ToolCall::new(*name, args.clone()))
                .collect(),
        }))
    }

    /// Queue a plain text answer
    pub fn says(self, text: &str) -> Self {
        self.push(Ok(Completion {
            text: text.to_string(),
            tool_calls: Vec::new(),
        }))
    }

    /// Queue a failure
    pub fn fails(self, message: &str) -> Self {
        self.push(Err(LlmError::Request(message.to_string())))
    }

    fn push(self, answer: Result<Completion, LlmError>) -> Self {
        self.script.lock().expect("mock lock poisoned").push_back(answer);
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete<'a>(&self, request: CompletionRequest<'a>) -> Result<Completion, LlmError> {
        self.seen.lock().expect("mock lock poisoned").push(SeenRequest {
            system: request.system.to_string(),
            messages: request.messages.to_vec(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
        });
        self.script
            .lock()
            .expect("mock lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Response("script exhausted".to_string())))
    }
}
