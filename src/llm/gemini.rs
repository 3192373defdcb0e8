//! Google Gemini agent gateway
//!
//! SECURITY: API keys are ONLY sent to official Google endpoints.
//! The GEMINI_API_KEY is never logged.

use super::{
    ContentPart, LlmError, LlmProvider, LlmResponse, Message, MessageContent, Role, TokenUsage,
    ToolCall, ToolDefinition,
};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Official Google Gemini API endpoint
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: usize,
}

impl GeminiProvider {
    /// A missing key is reported on the first call, not here
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 8192,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Split messages into the system instruction and Gemini `contents`
    ///
    /// Assistant tool-use parts become `functionCall` parts; tool results
    /// become `functionResponse` parts named after the call they answer.
    fn convert_messages(&self, messages: &[Message]) -> (Option<String>, Vec<GeminiContent>) {
        let mut system_instruction = None;
        let mut contents = Vec::new();
        let mut call_names: HashMap<String, String> = HashMap::new();

        for msg in messages {
            match (msg.role, &msg.content) {
                (Role::System, content) => {
                    if let Some(text) = content.as_text() {
                        system_instruction = Some(text.to_string());
                    }
                }
                (Role::User, content) => {
                    if let Some(text) = content.as_text() {
                        contents.push(GeminiContent::text("user", text));
                    }
                }
                (Role::Assistant, MessageContent::Text(text)) => {
                    contents.push(GeminiContent::text("model", text));
                }
                (Role::Assistant, MessageContent::Parts(parts)) => {
                    let mut converted = Vec::new();
                    for part in parts {
                        match part {
                            ContentPart::Text { text } => {
                                converted.push(GeminiPart::Text { text: text.clone() })
                            }
                            ContentPart::ToolUse { id, name, input } => {
                                call_names.insert(id.clone(), name.clone());
                                converted.push(GeminiPart::FunctionCall {
                                    function_call: GeminiFunctionCall {
                                        name: name.clone(),
                                        args: input.clone(),
                                    },
                                });
                            }
                            ContentPart::ToolResult { .. } => {}
                        }
                    }
                    if !converted.is_empty() {
                        contents.push(GeminiContent {
                            role: "model".to_string(),
                            parts: converted,
                        });
                    }
                }
                (Role::Tool, content) => {
                    let (id, body) = match content {
                        MessageContent::Parts(parts) => parts
                            .iter()
                            .find_map(|p| match p {
                                ContentPart::ToolResult {
                                    tool_use_id,
                                    content,
                                } => Some((tool_use_id.clone(), content.clone())),
                                _ => None,
                            })
                            .unwrap_or_default(),
                        MessageContent::Text(text) => {
                            (msg.tool_call_id.clone().unwrap_or_default(), text.clone())
                        }
                    };
                    let name = call_names
                        .get(&id)
                        .cloned()
                        .unwrap_or_else(|| id.trim_start_matches("gemini_").to_string());
                    contents.push(GeminiContent {
                        role: "function".to_string(),
                        parts: vec![GeminiPart::FunctionResponse {
                            function_response: GeminiFunctionResponse {
                                name,
                                response: response_object(&body),
                            },
                        }],
                    });
                }
            }
        }

        (system_instruction, contents)
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<GeminiFunctionDeclaration> {
        tools
            .iter()
            .map(|t| GeminiFunctionDeclaration {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            })
            .collect()
    }

    async fn send_request(&self, request: &GeminiRequest) -> Result<GeminiResponse, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingCredentials("GEMINI_API_KEY"))?;
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, error_text));
        }

        let body = response.text().await.map_err(LlmError::from_network_error)?;
        serde_json::from_str(&body).map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

/// `functionResponse.response` must be a JSON object
fn response_object(body: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        _ => serde_json::json!({ "content": body }),
    }
}

fn into_llm_response(response: GeminiResponse) -> LlmResponse {
    let usage = response.usage_metadata.map(|u| TokenUsage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let Some(candidate) = response.candidates.into_iter().next() else {
        return LlmResponse::Text {
            text: String::new(),
            usage,
        };
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for part in candidate.content.parts {
        match part {
            GeminiPart::Text { text: t } => text.push_str(&t),
            GeminiPart::FunctionCall { function_call } => tool_calls.push(ToolCall {
                // Gemini doesn't provide IDs
                id: format!("gemini_{}", function_call.name),
                name: function_call.name,
                arguments: function_call.args,
            }),
            GeminiPart::FunctionResponse { .. } | GeminiPart::Other(_) => {}
        }
    }

    if tool_calls.is_empty() {
        LlmResponse::Text { text, usage }
    } else if text.is_empty() {
        LlmResponse::ToolCalls {
            calls: tool_calls,
            usage,
        }
    } else {
        LlmResponse::Mixed {
            text: Some(text),
            tool_calls,
            usage,
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse> {
        let (system_instruction, contents) = self.convert_messages(messages);

        let request = GeminiRequest {
            contents,
            system_instruction: system_instruction.map(|text| GeminiSystemInstruction {
                parts: vec![GeminiPart::Text { text }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(self.max_tokens),
            }),
            tools: tools.filter(|t| !t.is_empty()).map(|t| {
                vec![GeminiTools {
                    function_declarations: self.convert_tools(t),
                }]
            }),
        };

        let response = self.send_request(&request).await?;
        Ok(into_llm_response(response))
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTools>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![GeminiPart::Text {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
    /// Parts this gateway does not use (inline data, code execution, ...)
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct GeminiTools {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default = "empty_content")]
    content: GeminiContent,
}

fn empty_content() -> GeminiContent {
    GeminiContent {
        role: "model".to_string(),
        parts: Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u32,
}
