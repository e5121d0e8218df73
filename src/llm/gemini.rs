//! Google Gemini `generateContent` REST client with function calling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{
    Completion, CompletionRequest, LanguageModel, LlmError, Message, ToolCall, ToolDefinition,
};
use crate::config::LlmConfig;
use crate::utils::HttpClient;

/// Schema keys Gemini's OpenAPI subset understands
const SCHEMA_KEYS: [&str; 7] = [
    "type",
    "description",
    "enum",
    "properties",
    "required",
    "items",
    "nullable",
];

#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: HttpClient,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolBlock {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiModel {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::Request("GOOGLE_API_KEY is not set".to_string()))?;
        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))
            .map_err(|e| LlmError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn content(message: &Message) -> Content {
        match message {
            Message::User(text) => Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(text.clone()),
                    ..Part::default()
                }],
            },
            Message::Model { text, calls } => {
                let mut parts = Vec::new();
                if !text.is_empty() {
                    parts.push(Part {
                        text: Some(text.clone()),
                        ..Part::default()
                    });
                }
                parts.extend(calls.iter().map(|call| Part {
                    function_call: Some(FunctionCall {
                        name: call.name.clone(),
                        args: call.args.clone(),
                    }),
                    ..Part::default()
                }));
                Content {
                    role: Some("model".to_string()),
                    parts,
                }
            }
            Message::Tool { name, result } => Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    function_response: Some(FunctionResponse {
                        name: name.clone(),
                        response: serde_json::json!({ "content": result }),
                    }),
                    ..Part::default()
                }],
            },
        }
    }

    fn declaration(tool: &ToolDefinition) -> FunctionDeclaration {
        FunctionDeclaration {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: sanitize_schema(&tool.parameters),
        }
    }

    fn completion(response: GenerateResponse) -> Result<Completion, LlmError> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(LlmError::Response(format!("model returned no answer ({})", reason)));
        };

        let mut completion = Completion::default();
        for part in candidate.content.parts {
            if let Some(text) = part.text {
                completion.text.push_str(&text);
            }
            if let Some(call) = part.function_call {
                completion.tool_calls.push(ToolCall::new(call.name, call.args));
            }
        }
        // SAFETY, RECITATION and MAX_TOKENS stops can arrive without content
        if completion.is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "no content".to_string());
            return Err(LlmError::Response(format!(
                "model returned an empty answer ({})",
                reason
            )));
        }
        Ok(completion)
    }
}

/// Reduce a schemars schema to the subset Gemini accepts.
///
/// Unsupported keys are dropped, type names are upper-cased and
/// `["string", "null"]` style types become `nullable`.
pub fn sanitize_schema(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };

    let mut out = Map::new();
    for (key, value) in map {
        if !SCHEMA_KEYS.contains(&key.as_str()) {
            continue;
        }
        match key.as_str() {
            "type" => match value {
                Value::String(t) => {
                    out.insert(key.clone(), Value::String(t.to_uppercase()));
                }
                Value::Array(types) => {
                    let mut concrete = types
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|t| *t != "null");
                    if let Some(t) = concrete.next() {
                        out.insert(key.clone(), Value::String(t.to_uppercase()));
                    }
                    if types.iter().any(|t| t == "null") {
                        out.insert("nullable".to_string(), Value::Bool(true));
                    }
                }
                _ => {}
            },
            "properties" => {
                let props = value
                    .as_object()
                    .map(|p| {
                        p.iter()
                            .map(|(name, prop)| (name.clone(), sanitize_schema(prop)))
                            .collect::<Map<_, _>>()
                    })
                    .unwrap_or_default();
                out.insert(key.clone(), Value::Object(props));
            }
            "items" => {
                out.insert(key.clone(), sanitize_schema(value));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

#[async_trait]
impl LanguageModel for GeminiModel {
    #[instrument(skip_all, fields(model = %self.model, turns = request.messages.len()))]
    async fn complete<'a>(&self, request: CompletionRequest<'a>) -> Result<Completion, LlmError> {
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(request.system.to_string()),
                    ..Part::default()
                }],
            },
            contents: request.messages.iter().map(Self::content).collect(),
            tools: if request.tools.is_empty() {
                Vec::new()
            } else {
                vec![ToolBlock {
                    function_declarations: request.tools.iter().map(Self::declaration).collect(),
                }]
            },
        };

        debug!("sending generateContent request");
        let response = self
            .client
            .post(&self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: message.trim().chars().take(500).collect(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Response(e.to_string()))?;
        Self::completion(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            api_key: Some("g-key".to_string()),
            base_url: base_url.to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_sanitize_schema() {
        let raw = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "Params",
            "type": "object",
            "required": ["term"],
            "properties": {
                "term": {"description": "Search term", "type": "string"},
                "db": {"type": ["string", "null"]},
                "limit": {"type": "integer", "format": "uint", "minimum": 0.0}
            },
            "definitions": {}
        });
        let clean = sanitize_schema(&raw);
        assert_eq!(
            clean,
            json!({
                "type": "OBJECT",
                "required": ["term"],
                "properties": {
                    "term": {"description": "Search term", "type": "STRING"},
                    "db": {"type": "STRING", "nullable": true},
                    "limit": {"type": "INTEGER"}
                }
            })
        );
    }

    #[test]
    fn test_new_requires_key() {
        assert!(GeminiModel::new(&LlmConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_function_call_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash-latest:generateContent")
            .match_header("x-goog-api-key", "g-key")
            .match_body(mockito::Matcher::Regex(r#""functionDeclarations""#.into()))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[
                    {"functionCall":{"name":"GetSummary","args":{"term":"BRCA1"}}}]}}]}"#,
            )
            .create_async()
            .await;

        let model = GeminiModel::new(&config(&server.url())).unwrap();
        let tools = vec![ToolDefinition {
            name: "GetSummary".into(),
            description: "search".into(),
            parameters: json!({"type": "object"}),
        }];
        let messages = vec![Message::User("find BRCA1 papers".into())];
        let completion = model
            .complete(CompletionRequest {
                system: "be useful",
                messages: &messages,
                tools: &tools,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            completion.tool_calls,
            vec![ToolCall::new("GetSummary", json!({"term": "BRCA1"}))]
        );
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-1.5-flash-latest:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let model = GeminiModel::new(&config(&server.url())).unwrap();
        let err = model
            .complete(CompletionRequest {
                system: "",
                messages: &[Message::User("x".into())],
                tools: &[],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_candidate_without_content_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-1.5-flash-latest:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)
            .create_async()
            .await;

        let model = GeminiModel::new(&config(&server.url())).unwrap();
        let err = model
            .complete(CompletionRequest {
                system: "",
                messages: &[Message::User("x".into())],
                tools: &[],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Response(_)));
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_tool_turn_becomes_function_response() {
        let content = GeminiModel::content(&Message::Tool {
            name: "GetSummary".into(),
            result: "fetched 2 records".into(),
        });
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(
            value["parts"][0]["functionResponse"]["response"]["content"],
            "fetched 2 records"
        );
    }
}
