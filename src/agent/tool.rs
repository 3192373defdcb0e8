//! The single tool the agent can call: layer activation

use crate::layers::LayerKind;
use crate::llm::ToolDefinition;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

pub const ACTIVATE_LAYERS: &str = "activate_layers";

/// Declaration sent with every agent round-trip
pub fn activate_layers_definition() -> ToolDefinition {
    let kinds: Vec<&str> = LayerKind::ALL.iter().map(|k| k.as_str()).collect();
    ToolDefinition {
        name: ACTIVATE_LAYERS.to_string(),
        description: "Update the visible climate and social data layers on the map based on \
                      the user's request. Used for spatial analysis of risks and vulnerabilities."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "requestedKinds": {
                    "type": "array",
                    "items": { "type": "string", "enum": kinds },
                    "description": "List of layers to activate or show. Can combine multiple layers for overlap analysis."
                },
                "locationName": {
                    "type": "string",
                    "description": "The specific city (Si/Gun) or district in Gyeonggi-do to focus on (e.g., 수원, 용인, 판교)."
                },
                "filterCondition": {
                    "type": "string",
                    "description": "Optional spatial filter or attribute query."
                }
            },
            "required": ["requestedKinds"]
        }),
    }
}

#[derive(Debug, Error)]
pub enum ToolArgsError {
    #[error("Unparsable tool arguments: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("No known layer kinds requested (got {0:?})")]
    NoKnownKinds(Vec<String>),
}

/// Parsed `activate_layers` arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ActivateLayersArgs {
    /// Distinct kinds in request order
    pub kinds: Vec<LayerKind>,
    pub location_name: Option<String>,
    pub filter: Option<String>,
    /// Kind names the agent sent that are not layer kinds
    pub unknown_kinds: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArgs {
    #[serde(default, alias = "activeLayers")]
    requested_kinds: Vec<String>,
    #[serde(default)]
    location_name: Option<String>,
    #[serde(default)]
    filter_condition: Option<String>,
}

impl ActivateLayersArgs {
    pub fn parse(arguments: &serde_json::Value) -> Result<Self, ToolArgsError> {
        let raw: RawArgs = serde_json::from_value(arguments.clone())?;

        let mut kinds = Vec::new();
        let mut unknown_kinds = Vec::new();
        for name in raw.requested_kinds {
            match name.parse::<LayerKind>() {
                Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
                Ok(_) => {}
                Err(_) => unknown_kinds.push(name),
            }
        }
        // An empty list clears the map; names that all fail to parse do not
        if kinds.is_empty() && !unknown_kinds.is_empty() {
            return Err(ToolArgsError::NoKnownKinds(unknown_kinds));
        }

        Ok(Self {
            kinds,
            location_name: non_blank(raw.location_name),
            filter: non_blank(raw.filter_condition),
            unknown_kinds,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_lists_every_kind() {
        let def = activate_layers_definition();
        assert_eq!(def.name, "activate_layers");
        let kinds = def.parameters["properties"]["requestedKinds"]["items"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(kinds.len(), LayerKind::ALL.len());
        assert!(kinds.iter().any(|k| k == "elderly"));
    }

    #[test]
    fn test_parse_args() {
        let args = ActivateLayersArgs::parse(&json!({
            "requestedKinds": ["elderly", "flood_risk", "elderly"],
            "locationName": " 수원시 ",
            "filterCondition": ""
        }))
        .unwrap();
        assert_eq!(
            args.kinds,
            vec![LayerKind::ElderlyPopulation, LayerKind::FloodRisk]
        );
        assert_eq!(args.location_name.as_deref(), Some("수원시"));
        assert_eq!(args.filter, None);
    }

    #[test]
    fn test_parse_accepts_active_layers_alias() {
        let args = ActivateLayersArgs::parse(&json!({"activeLayers": ["parks"]})).unwrap();
        assert_eq!(args.kinds, vec![LayerKind::GreenSpace]);
        assert!(args.location_name.is_none());
    }

    #[test]
    fn test_unknown_kinds_dropped() {
        let args =
            ActivateLayersArgs::parse(&json!({"requestedKinds": ["weather", "traffic"]})).unwrap();
        assert_eq!(args.kinds, vec![LayerKind::Weather]);
        assert_eq!(args.unknown_kinds, vec!["traffic"]);

        let err = ActivateLayersArgs::parse(&json!({"requestedKinds": ["traffic"]})).unwrap_err();
        assert!(matches!(err, ToolArgsError::NoKnownKinds(_)));
    }

    #[test]
    fn test_empty_kind_list_is_valid() {
        let args = ActivateLayersArgs::parse(&json!({"requestedKinds": []})).unwrap();
        assert!(args.kinds.is_empty());
        assert!(args.unknown_kinds.is_empty());
    }

    #[test]
    fn test_malformed_args() {
        let err = ActivateLayersArgs::parse(&json!({"requestedKinds": "elderly"})).unwrap_err();
        assert!(matches!(err, ToolArgsError::Invalid(_)));
    }
}
