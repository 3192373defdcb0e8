//! Mock gateway and provider adapters shared by the integration tests

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use ecospatial::agent::{DispatcherConfig, ToolDispatcher};
use ecospatial::core::ProviderError;
use ecospatial::layers::{DataSource, ElderlyStats, LayerPayload};
use ecospatial::llm::{
    ContentPart, LlmProvider, LlmResponse, Message, MessageContent, Role, ToolCall, ToolDefinition,
};
use ecospatial::places::CanonicalLocation;
use ecospatial::providers::{ProviderAdapter, ProviderSet};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum Step {
    Reply(LlmResponse),
    Fail(&'static str),
    Delayed(Duration, LlmResponse),
}

/// Gateway that plays back scripted responses and records every request
#[derive(Default)]
pub struct ScriptedLlm {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[Message],
        _tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Fail(message)) => Err(anyhow::anyhow!(message)),
            Some(Step::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            None => Ok(text("기본 응답")),
        }
    }
}

/// Adapter returning a fixed payload, or failing when it has none
pub struct StubAdapter {
    source: DataSource,
    payload: Option<LayerPayload>,
    calls: AtomicUsize,
}

impl StubAdapter {
    pub fn ok(source: DataSource, payload: LayerPayload) -> Arc<Self> {
        Arc::new(Self {
            source,
            payload: Some(payload),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(source: DataSource) -> Arc<Self> {
        Arc::new(Self {
            source,
            payload: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for StubAdapter {
    fn source(&self) -> DataSource {
        self.source
    }

    fn name(&self) -> &'static str {
        "stub"
    }

    fn has_credentials(&self) -> bool {
        true
    }

    fn credential_hint(&self) -> &'static str {
        "STUB_KEY"
    }

    async fn fetch(&self, _location: &CanonicalLocation) -> Result<LayerPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload.clone().ok_or(ProviderError::Unavailable {
            provider: "stub",
            message: "HTTP 503".to_string(),
        })
    }
}

pub fn text(s: &str) -> LlmResponse {
    LlmResponse::Text {
        text: s.to_string(),
        usage: None,
    }
}

pub fn activate(args: serde_json::Value) -> LlmResponse {
    LlmResponse::ToolCalls {
        calls: vec![ToolCall {
            id: "gemini_activate_layers".to_string(),
            name: "activate_layers".to_string(),
            arguments: args,
        }],
        usage: None,
    }
}

pub fn suwon_elderly() -> LayerPayload {
    LayerPayload::Elderly(ElderlyStats {
        district_name: "수원시".to_string(),
        district_code: "31010".to_string(),
        elderly_count: 98_765,
        elderly_ratio: 8.2,
    })
}

pub fn test_config() -> DispatcherConfig {
    DispatcherConfig {
        timeout: Duration::from_millis(300),
        ..DispatcherConfig::default()
    }
}

pub fn dispatcher(llm: Arc<ScriptedLlm>, providers: ProviderSet) -> Arc<ToolDispatcher> {
    Arc::new(ToolDispatcher::new(llm, providers, test_config()))
}

/// Body of the tool result that closes a second-round request
pub fn tool_result_body(messages: &[ecospatial::llm::Message]) -> String {
    let last = messages.last().unwrap();
    assert_eq!(last.role, Role::Tool);
    match &last.content {
        MessageContent::Parts(parts) => match &parts[0] {
            ContentPart::ToolResult { content, .. } => content.clone(),
            other => panic!("expected tool result, got {:?}", other),
        },
        MessageContent::Text(text) => text.clone(),
    }
}
