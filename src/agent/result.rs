//! Tool result sent back to the agent in the second round

use crate::core::ErrorCategory;
use crate::layers::{LayerKind, LayerPayload};
use serde::Serialize;

/// What happened to one requested kind during tool execution
#[derive(Debug, Clone, PartialEq)]
pub enum LayerOutcome {
    Fetched(LayerPayload),
    Failed {
        category: ErrorCategory,
        detail: String,
    },
    /// Data-bearing kind requested without a resolvable location
    Unlocated,
    /// Purely visual kind, nothing to fetch
    Visual,
}

impl LayerOutcome {
    pub fn payload(&self) -> Option<&LayerPayload> {
        match self {
            LayerOutcome::Fetched(payload) => Some(payload),
            _ => None,
        }
    }

    fn summary_line(&self, kind: LayerKind) -> Option<String> {
        match self {
            LayerOutcome::Fetched(payload) => Some(format!("[{}] {}", kind, payload.summary())),
            LayerOutcome::Failed { .. } => Some(format!("[{}] 데이터를 가져오지 못했습니다.", kind)),
            LayerOutcome::Unlocated => Some(format!(
                "[{}] 지역을 확인할 수 없어 데이터를 조회하지 않았습니다.",
                kind
            )),
            LayerOutcome::Visual => None,
        }
    }
}

/// JSON object placed in the `functionResponse` of the second round
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub success: bool,
    #[serde(rename = "locationName", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "layersActivated")]
    pub activated_kinds: Vec<LayerKind>,
    #[serde(rename = "summaries")]
    pub provider_summaries: Vec<String>,
    #[serde(rename = "message")]
    pub composed_message: String,
}

impl ToolResult {
    /// Compose the result of a completed tool execution
    ///
    /// `location` is the display name of the resolved place, or the raw name
    /// the agent sent when it could not be resolved.
    pub fn compose(location: Option<&str>, outcomes: &[(LayerKind, LayerOutcome)]) -> Self {
        let summaries: Vec<String> = outcomes
            .iter()
            .filter_map(|(kind, outcome)| outcome.summary_line(*kind))
            .collect();

        let mut lines = vec![
            format!("=== {} 기후 데이터 분석 결과 ===", location.unwrap_or("경기도")),
            String::new(),
        ];
        if outcomes.is_empty() {
            lines.push("지도의 레이어를 모두 해제했습니다.".to_string());
        } else if summaries.is_empty() {
            lines.push("요청한 레이어를 지도에 표시했습니다.".to_string());
        } else {
            lines.extend(summaries.iter().cloned());
        }

        Self {
            success: true,
            location: location.map(str::to_string),
            activated_kinds: outcomes.iter().map(|(kind, _)| *kind).collect(),
            provider_summaries: summaries,
            composed_message: lines.join("\n"),
        }
    }

    /// Result for a tool call that could not be executed
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            location: None,
            activated_kinds: Vec::new(),
            provider_summaries: Vec::new(),
            composed_message: reason.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"success\":{},\"message\":{:?}}}",
                self.success, self.composed_message
            )
        })
    }
}
