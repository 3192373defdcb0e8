//! Two-round tool dispatch
//!
//! One user message runs through:
//! 1. First round: message + history window + tool declaration to the agent
//!    (served from the response cache when possible)
//! 2. If the agent calls `activate_layers`: concurrent provider fetches,
//!    layer reconciliation, tool result composition
//! 3. Second round: the tool result goes back to the agent for a grounded answer
//!
//! Every agent round-trip is bounded by the configured timeout. The interrupt
//! flag is checked before each suspension point; a set flag ends dispatch with
//! [`RequestError::Superseded`].

use super::cache::{CacheKey, ResponseCache};
use super::context::ConversationContext;
use super::prompt::system_instruction;
use super::result::{LayerOutcome, ToolResult};
use super::tool::{activate_layers_definition, ActivateLayersArgs, ACTIVATE_LAYERS};
use crate::config::Config;
use crate::core::{ChatMessage, ChatRole, ErrorCategory, RequestError};
use crate::layers::{build_layer_set, reconcile, ActiveLayer, LayerKind, ReconcileDecision};
use crate::llm::{LlmProvider, LlmResponse, Message, ToolCall, ToolDefinition};
use crate::places::{self, CanonicalLocation};
use crate::providers::ProviderSet;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Reply when the first round has neither text nor a usable tool call
pub const FIRST_ROUND_FALLBACK: &str =
    "질문을 이해했습니다. 더 구체적인 분석이 필요하시면 지역과 분석 유형을 알려주세요.";

/// Reply when the second round comes back empty
pub const SECOND_ROUND_FALLBACK: &str = "데이터 분석이 완료되었습니다.";

/// Where a dispatch currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Idle,
    AwaitingFirstResponse,
    NoToolCall,
    ExecutingTools,
    AwaitingSecondResponse,
}

impl DispatchPhase {
    fn advance(&mut self, next: DispatchPhase) {
        tracing::debug!("Dispatch phase {:?} -> {:?}", self, next);
        *self = next;
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of previous turns sent with each request
    pub history_window: usize,
    /// Budget for each agent round-trip
    pub timeout: Duration,
    /// Opacity of freshly built layers
    pub layer_opacity: f32,
    pub response_cache_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            history_window: 6,
            timeout: Duration::from_secs(15),
            layer_opacity: 0.75,
            response_cache_size: 100,
        }
    }
}

impl From<&Config> for DispatcherConfig {
    fn from(config: &Config) -> Self {
        Self {
            history_window: config.agent.history_window,
            timeout: config.agent.timeout(),
            layer_opacity: config.layers.opacity,
            response_cache_size: config.agent.response_cache_size,
        }
    }
}

/// Session state a dispatch reads
pub struct DispatchRequest<'a> {
    pub message: &'a str,
    /// Full history, oldest first; the window is applied here
    pub history: &'a [ChatMessage],
    pub current_layers: &'a [ActiveLayer],
    pub context: &'a ConversationContext,
}

/// Everything one `activate_layers` call produced
#[derive(Debug, Clone)]
pub struct ToolExecution {
    pub kinds: Vec<LayerKind>,
    pub location: Option<CanonicalLocation>,
    pub outcomes: Vec<(LayerKind, LayerOutcome)>,
    pub decision: ReconcileDecision,
    /// Fresh layer set, `None` when the current set is kept
    pub layers: Option<Vec<ActiveLayer>>,
    /// Context after this execution
    pub context: ConversationContext,
    pub result: ToolResult,
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub reply: String,
    pub execution: Option<ToolExecution>,
    pub from_cache: bool,
}

/// A dispatch that ended early
///
/// `partial` holds the tool execution when it completed before the failure,
/// so its layers can still be published.
#[derive(Debug)]
pub struct DispatchFailure {
    pub error: RequestError,
    pub partial: Option<ToolExecution>,
}

impl DispatchFailure {
    fn new(error: RequestError) -> Self {
        Self {
            error,
            partial: None,
        }
    }

    fn with_partial(error: RequestError, execution: ToolExecution) -> Self {
        Self {
            error,
            partial: Some(execution),
        }
    }
}

pub struct ToolDispatcher {
    llm: Arc<dyn LlmProvider>,
    providers: ProviderSet,
    cache: ResponseCache,
    tools: Vec<ToolDefinition>,
    config: DispatcherConfig,
}

impl ToolDispatcher {
    pub fn new(llm: Arc<dyn LlmProvider>, providers: ProviderSet, config: DispatcherConfig) -> Self {
        Self {
            llm,
            providers,
            cache: ResponseCache::new(config.response_cache_size),
            tools: vec![activate_layers_definition()],
            config,
        }
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn dispatch(
        &self,
        request: DispatchRequest<'_>,
        interrupt: &AtomicBool,
    ) -> Result<DispatchOutcome, DispatchFailure> {
        let mut phase = DispatchPhase::Idle;
        let history = self.history_window(request.history);
        let key = CacheKey::new(request.message, &history);

        phase.advance(DispatchPhase::AwaitingFirstResponse);
        let (first, from_cache) = match self.cache.get(&key) {
            Some(cached) => {
                tracing::debug!("Returning cached response");
                (cached, true)
            }
            None => {
                check_interrupt(interrupt)?;
                let mut messages = Vec::with_capacity(history.len() + 2);
                messages.push(Message::system(system_instruction(request.context)));
                messages.extend(history.iter().cloned());
                messages.push(Message::user(request.message));

                let response = self.round_trip(&messages).await?;
                self.cache.put(key, &response);
                (response, false)
            }
        };
        check_interrupt(interrupt)?;

        let Some(call) = select_tool_call(&first) else {
            phase.advance(DispatchPhase::NoToolCall);
            let reply = non_empty(first.text()).unwrap_or(FIRST_ROUND_FALLBACK);
            phase.advance(DispatchPhase::Idle);
            return Ok(DispatchOutcome {
                reply: reply.to_string(),
                execution: None,
                from_cache,
            });
        };

        phase.advance(DispatchPhase::ExecutingTools);
        let (execution, tool_result) = match ActivateLayersArgs::parse(&call.arguments) {
            Ok(args) => {
                let execution = self.execute(args, &request).await;
                let result = execution.result.clone();
                (Some(execution), result)
            }
            Err(e) => {
                tracing::warn!(
                    category = %ErrorCategory::AgentGatewayFailure,
                    "Tool call could not be executed: {}",
                    e
                );
                (None, ToolResult::failure(e.to_string()))
            }
        };

        if let Err(err) = check_interrupt(interrupt) {
            return Err(attach(err.error, execution));
        }

        phase.advance(DispatchPhase::AwaitingSecondResponse);
        let context = execution
            .as_ref()
            .map(|e| &e.context)
            .unwrap_or(request.context);
        let mut messages = Vec::with_capacity(history.len() + 4);
        messages.push(Message::system(system_instruction(context)));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(request.message));
        messages.push(Message::assistant_tool_call(&call));
        messages.push(Message::tool_result(&call.id, tool_result.to_json()));

        let second = match self.round_trip(&messages).await {
            Ok(response) => response,
            Err(failure) => return Err(attach(failure.error, execution)),
        };
        if let Err(err) = check_interrupt(interrupt) {
            return Err(attach(err.error, execution));
        }
        if second.has_tool_calls() {
            tracing::warn!("Ignoring tool calls in the second round");
        }

        phase.advance(DispatchPhase::Idle);
        let reply = non_empty(second.text()).unwrap_or(SECOND_ROUND_FALLBACK);
        Ok(DispatchOutcome {
            reply: reply.to_string(),
            execution,
            from_cache,
        })
    }

    /// Run one `activate_layers` call: fetch, reconcile, compose
    async fn execute(&self, args: ActivateLayersArgs, request: &DispatchRequest<'_>) -> ToolExecution {
        for unknown in &args.unknown_kinds {
            tracing::warn!("Ignoring unknown layer kind '{}'", unknown);
        }

        let location = match args.location_name.as_deref().map(places::resolve) {
            Some(Ok(location)) => Some(location),
            Some(Err(e)) => {
                tracing::warn!(category = %e.category(), "{}", e);
                None
            }
            None => None,
        };

        let outcomes = self.fetch_all(&args.kinds, location.as_ref()).await;

        let decision = reconcile(request.current_layers, &args.kinds, location.as_ref());
        let layers = if decision.needs_update {
            tracing::info!("Rebuilding layer set ({:?})", decision.reason);
            let mut payloads: HashMap<LayerKind, _> = outcomes
                .iter()
                .filter_map(|(kind, outcome)| outcome.payload().map(|p| (*kind, p.clone())))
                .collect();
            Some(build_layer_set(
                &args.kinds,
                location.as_ref(),
                args.filter.as_deref(),
                self.config.layer_opacity,
                &mut payloads,
            ))
        } else {
            tracing::debug!("Layer set unchanged");
            None
        };

        // Only a resolved place becomes the remembered location
        let mut context = request.context.clone();
        context.update(location.as_ref().map(|l| l.display_name.as_str()), &args.kinds);

        let label = location
            .as_ref()
            .map(|l| l.display_name.as_str())
            .or(args.location_name.as_deref());
        let result = ToolResult::compose(label, &outcomes);

        ToolExecution {
            kinds: args.kinds,
            location,
            outcomes,
            decision,
            layers,
            context,
            result,
        }
    }

    /// Fetch every data-bearing kind concurrently; one failure never fails another
    async fn fetch_all(
        &self,
        kinds: &[LayerKind],
        location: Option<&CanonicalLocation>,
    ) -> Vec<(LayerKind, LayerOutcome)> {
        let fetches = kinds.iter().map(|kind| async move {
            let Some(source) = kind.data_source() else {
                return (*kind, LayerOutcome::Visual);
            };
            let Some(location) = location else {
                return (*kind, LayerOutcome::Unlocated);
            };
            let Some(adapter) = self.providers.get(source) else {
                tracing::warn!(
                    category = %ErrorCategory::ProviderUnavailable,
                    "No adapter registered for {}",
                    source.as_str()
                );
                return (
                    *kind,
                    LayerOutcome::Failed {
                        category: ErrorCategory::ProviderUnavailable,
                        detail: format!("no adapter for {}", source.as_str()),
                    },
                );
            };

            match adapter.fetch(location).await {
                Ok(payload) => (*kind, LayerOutcome::Fetched(payload)),
                Err(e) => {
                    tracing::warn!(
                        category = %e.category(),
                        provider = e.provider(),
                        "Provider fetch failed for {}: {}",
                        kind,
                        e
                    );
                    (
                        *kind,
                        LayerOutcome::Failed {
                            category: e.category(),
                            detail: e.to_string(),
                        },
                    )
                }
            }
        });

        join_all(fetches).await
    }

    async fn round_trip(&self, messages: &[Message]) -> Result<LlmResponse, DispatchFailure> {
        match tokio::time::timeout(
            self.config.timeout,
            self.llm.chat(messages, Some(self.tools.as_slice())),
        )
        .await
        {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(DispatchFailure::new(RequestError::Gateway(e))),
            Err(_) => Err(DispatchFailure::new(RequestError::Timeout {
                after: self.config.timeout,
            })),
        }
    }

    fn history_window(&self, history: &[ChatMessage]) -> Vec<Message> {
        let start = history.len().saturating_sub(self.config.history_window);
        history[start..]
            .iter()
            .map(|turn| match turn.role {
                ChatRole::User => Message::user(&turn.content),
                ChatRole::Assistant => Message::assistant(&turn.content),
            })
            .collect()
    }
}

fn check_interrupt(interrupt: &AtomicBool) -> Result<(), DispatchFailure> {
    if interrupt.load(Ordering::SeqCst) {
        tracing::debug!("Dispatch interrupted");
        Err(DispatchFailure::new(RequestError::Superseded))
    } else {
        Ok(())
    }
}

fn attach(error: RequestError, execution: Option<ToolExecution>) -> DispatchFailure {
    match execution {
        Some(execution) => DispatchFailure::with_partial(error, execution),
        None => DispatchFailure::new(error),
    }
}

/// The first `activate_layers` call; anything else is ignored
fn select_tool_call(response: &LlmResponse) -> Option<ToolCall> {
    let mut selected: Option<ToolCall> = None;
    for call in response.tool_calls() {
        if call.name != ACTIVATE_LAYERS {
            tracing::warn!("Ignoring call to unknown tool '{}'", call.name);
        } else if selected.is_some() {
            tracing::warn!("Ignoring additional {} call", call.name);
        } else {
            selected = Some(call.clone());
        }
    }
    selected
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: format!("gemini_{}", name),
            name: name.to_string(),
            arguments: json!({}),
        }
    }

    #[test]
    fn test_select_first_activate_call() {
        let response = LlmResponse::ToolCalls {
            calls: vec![call("draw_chart"), call(ACTIVATE_LAYERS), call(ACTIVATE_LAYERS)],
            usage: None,
        };
        let selected = select_tool_call(&response).unwrap();
        assert_eq!(selected.name, ACTIVATE_LAYERS);

        let response = LlmResponse::ToolCalls {
            calls: vec![call("draw_chart")],
            usage: None,
        };
        assert!(select_tool_call(&response).is_none());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("답변")), Some("답변"));
    }

    #[test]
    fn test_check_interrupt() {
        let flag = AtomicBool::new(false);
        assert!(check_interrupt(&flag).is_ok());
        flag.store(true, Ordering::SeqCst);
        let failure = check_interrupt(&flag).unwrap_err();
        assert!(matches!(failure.error, RequestError::Superseded));
    }

    #[test]
    fn test_phase_advance() {
        let mut phase = DispatchPhase::Idle;
        phase.advance(DispatchPhase::AwaitingFirstResponse);
        assert_eq!(phase, DispatchPhase::AwaitingFirstResponse);
    }
}
