use serde::Deserialize;
use serde::Serialize;

use super::records::GraphRecord;
use super::state::EdgeStatus;
use super::state::NodeStatus;

/// One record of the execution event stream.
///
/// Kinds this client does not know deserialize to [`ExecutionEvent::Unknown`]
/// and are ignored by the reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    GraphInit {
        graph: GraphRecord,
    },
    NodeStatus {
        #[serde(rename = "nodeId")]
        node_id: String,
        status: NodeStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
    EdgeStatus {
        #[serde(rename = "edgeId")]
        edge_id: String,
        status: EdgeStatus,
        #[serde(
            rename = "dataPreview",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        data_preview: Option<String>,
    },
    CheckpointReached {
        #[serde(rename = "nodeId")]
        node_id: String,
        #[serde(rename = "stepId")]
        step_id: String,
    },
    ExecutionComplete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        graph: Option<GraphRecord>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    ExecutionFailed {
        #[serde(rename = "nodeId", default, skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl ExecutionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GraphInit { .. } => "graph_init",
            Self::NodeStatus { .. } => "node_status",
            Self::EdgeStatus { .. } => "edge_status",
            Self::CheckpointReached { .. } => "checkpoint_reached",
            Self::ExecutionComplete { .. } => "execution_complete",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ExecutionComplete { .. } | Self::ExecutionFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn node_status_uses_wire_field_names() {
        let event: ExecutionEvent = serde_json::from_str(
            r#"{"type":"node_status","nodeId":"step_1","status":"completed","result":"ok","duration":42}"#,
        )
        .expect("parse");
        assert_eq!(
            event,
            ExecutionEvent::NodeStatus {
                node_id: "step_1".to_string(),
                status: NodeStatus::Completed,
                result: Some("ok".to_string()),
                duration: Some(42),
            }
        );
    }

    #[test]
    fn unrecognised_kind_maps_to_unknown() {
        let event: ExecutionEvent =
            serde_json::from_str(r#"{"type":"heartbeat","at":12}"#).expect("parse");
        assert_eq!(event, ExecutionEvent::Unknown);
    }

    #[test]
    fn execution_complete_tolerates_missing_summary() {
        let event: ExecutionEvent =
            serde_json::from_str(r#"{"type":"execution_complete","graph":{"nodes":[],"edges":[]}}"#)
                .expect("parse");
        assert!(matches!(
            event,
            ExecutionEvent::ExecutionComplete { summary: None, .. }
        ));
        assert!(event.is_terminal());
    }

    #[test]
    fn unknown_node_status_is_rejected() {
        let parsed = serde_json::from_str::<ExecutionEvent>(
            r#"{"type":"node_status","nodeId":"n1","status":"exploded"}"#,
        );
        assert!(parsed.is_err());
    }
}
