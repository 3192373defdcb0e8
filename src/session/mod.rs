//! Session lifecycle: history, active layers, and the single live request
//!
//! Every submission replaces the live request handle before doing any work,
//! which sets the previous handle's interrupt flag. Results are committed only
//! if their request id is still the live one; anything else is dropped
//! silently. State locks are never held across an `.await`.

use crate::agent::{
    ConversationContext, DispatchFailure, DispatchOutcome, DispatchRequest, ToolDispatcher,
    ToolExecution,
};
use crate::core::{ChatMessage, ErrorCategory};
use crate::layers::ActiveLayer;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub const TIMEOUT_APOLOGY: &str = "요청 시간이 초과되었습니다. 잠시 후 다시 시도해주세요.";
pub const GATEWAY_APOLOGY: &str = "데이터 연동 중 오류가 발생했습니다. 잠시 후 다시 시도해 주세요.";

/// How a submission ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The assistant answered; the reply is already in the history
    Replied(ChatMessage),
    /// The request was aborted; `message` is the apology added to the history
    Failed {
        category: ErrorCategory,
        message: String,
    },
    /// A newer submission replaced this one; nothing was committed
    Superseded,
    /// Blank input, nothing sent
    Ignored,
}

#[derive(Debug, Default)]
struct SessionState {
    history: Vec<ChatMessage>,
    layers: Vec<ActiveLayer>,
    context: ConversationContext,
}

struct RequestHandle {
    id: u64,
    cancel: Arc<AtomicBool>,
}

pub struct SessionController {
    dispatcher: Arc<ToolDispatcher>,
    state: Mutex<SessionState>,
    live: Mutex<Option<RequestHandle>>,
    next_id: AtomicU64,
    warnings: Vec<String>,
}

impl SessionController {
    /// Create a session; credential gaps are collected once as warnings
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        let warnings = dispatcher.providers().credential_warnings();
        for warning in &warnings {
            tracing::warn!(category = %ErrorCategory::CredentialsMissing, "{}", warning);
        }
        Self {
            dispatcher,
            state: Mutex::new(SessionState::default()),
            live: Mutex::new(None),
            next_id: AtomicU64::new(1),
            warnings,
        }
    }

    /// Add a warning shown alongside the provider credential warnings
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let (id, cancel) = self.begin();
        tracing::info!("Request {} started", id);

        let (history, layers, context) = {
            let mut state = self.state();
            let snapshot = (
                state.history.clone(),
                state.layers.clone(),
                state.context.clone(),
            );
            state.history.push(ChatMessage::user(text));
            snapshot
        };

        let request = DispatchRequest {
            message: text,
            history: &history,
            current_layers: &layers,
            context: &context,
        };
        let result = self.dispatcher.dispatch(request, &cancel).await;

        self.commit(id, result)
    }

    /// Cancel the live request, if any
    pub fn cancel(&self) {
        if let Some(handle) = self.live().take() {
            tracing::debug!("Cancelling request {}", handle.id);
            handle.cancel.store(true, Ordering::SeqCst);
        }
    }

    /// Clear history, layers, context and the response cache
    pub fn new_conversation(&self) {
        self.cancel();
        *self.state() = SessionState::default();
        self.dispatcher.cache().clear();
        tracing::info!("Started a new conversation");
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().history.clone()
    }

    pub fn active_layers(&self) -> Vec<ActiveLayer> {
        self.state().layers.clone()
    }

    pub fn context(&self) -> ConversationContext {
        self.state().context.clone()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_busy(&self) -> bool {
        self.live().is_some()
    }

    /// Replace the live handle, cancelling the previous request
    fn begin(&self) -> (u64, Arc<AtomicBool>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let cancel = Arc::new(AtomicBool::new(false));
        let previous = self.live().replace(RequestHandle {
            id,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            tracing::debug!("Request {} supersedes {}", id, previous.id);
            previous.cancel.store(true, Ordering::SeqCst);
        }
        (id, cancel)
    }

    fn commit(
        &self,
        id: u64,
        result: Result<DispatchOutcome, DispatchFailure>,
    ) -> SubmitOutcome {
        let mut live = self.live();
        if live.as_ref().map(|h| h.id) != Some(id) {
            tracing::debug!("Discarding result of superseded request {}", id);
            return SubmitOutcome::Superseded;
        }
        *live = None;

        let mut state = self.state();
        match result {
            Ok(outcome) => {
                if let Some(execution) = outcome.execution {
                    publish(&mut state, execution);
                }
                let reply = ChatMessage::assistant(outcome.reply);
                state.history.push(reply.clone());
                tracing::info!("Request {} completed (cached: {})", id, outcome.from_cache);
                SubmitOutcome::Replied(reply)
            }
            Err(failure) => {
                let category = failure.error.category();
                if !category.is_user_visible() {
                    return SubmitOutcome::Superseded;
                }
                let message = apology(category);
                if let Some(execution) = failure.partial {
                    publish(&mut state, execution);
                }
                tracing::error!(category = %category, "Request {} failed: {}", id, failure.error);
                state.history.push(ChatMessage::assistant(message));
                SubmitOutcome::Failed {
                    category,
                    message: message.to_string(),
                }
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn live(&self) -> MutexGuard<'_, Option<RequestHandle>> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Text appended to the history when a request is aborted
fn apology(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::AgentTimeout => TIMEOUT_APOLOGY,
        _ => GATEWAY_APOLOGY,
    }
}

/// Apply a completed tool execution to the session
fn publish(state: &mut SessionState, execution: ToolExecution) {
    if let Some(layers) = execution.layers {
        tracing::info!("Publishing {} layer(s)", layers.len());
        state.layers = layers;
    }
    state.context = execution.context;
}
