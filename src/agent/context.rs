//! Conversation context carried between turns

use crate::layers::LayerKind;
use serde::Serialize;

/// What the previous successful tool execution was about
///
/// Follow-up questions like "그럼 성남은?" only make sense against this.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationContext {
    pub last_location: Option<String>,
    pub last_layer_kinds: Vec<LayerKind>,
    pub last_topic: Option<String>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the outcome of a tool execution
    ///
    /// Empty inputs keep the previous values.
    pub fn update(&mut self, location: Option<&str>, kinds: &[LayerKind]) {
        if let Some(location) = location.filter(|l| !l.is_empty()) {
            self.last_location = Some(location.to_string());
        }
        if !kinds.is_empty() {
            self.last_layer_kinds = kinds.to_vec();
            self.last_topic = Some(topic_for(kinds));
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.last_location.is_none() && self.last_layer_kinds.is_empty() && self.last_topic.is_none()
    }

    /// Block appended to the system instruction, `None` when nothing is known yet
    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let kinds = if self.last_layer_kinds.is_empty() {
            "없음".to_string()
        } else {
            join_kinds(&self.last_layer_kinds)
        };
        Some(format!(
            "[현재 대화 맥락]\n- 마지막 분석 지역: {}\n- 마지막 활성 레이어: {}\n- 마지막 분석 주제: {}",
            self.last_location.as_deref().unwrap_or("없음"),
            kinds,
            self.last_topic.as_deref().unwrap_or("없음"),
        ))
    }
}

fn join_kinds(kinds: &[LayerKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn topic_for(kinds: &[LayerKind]) -> String {
    format!("{} 분석", join_kinds(kinds))
}
