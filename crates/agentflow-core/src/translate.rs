use std::collections::HashSet;

use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::Utc;

use super::error::EdgeEndpoint;
use super::error::GraphIntegrityError;
use super::error::TranslateError;
use super::error::ValidationError;
use super::layout::apply_layout;
use super::records::EdgeDataRecord;
use super::records::ChatReply;
use super::records::EdgeRecord;
use super::records::GraphRecord;
use super::records::NodeDataRecord;
use super::records::NodeRecord;
use super::records::PlanRecord;
use super::records::PositionRecord;
use super::records::StepRecord;
use super::state::AgentBadge;
use super::state::ExecutionGraphState;
use super::state::GraphEdge;
use super::state::GraphNode;
use super::state::GraphStatus;
use super::state::NodeKind;
use super::state::PlanStatus;
use super::state::Position;
use super::state::StepStatus;
use super::state::TaskPlan;
use super::state::TaskStep;

/// Backend plan record to client plan. Every step starts `pending` and the
/// plan starts `proposed`.
pub fn translate_plan(record: &PlanRecord) -> Result<TaskPlan, ValidationError> {
    if record.summary.trim().is_empty() {
        return Err(ValidationError::MissingSummary);
    }
    if record.steps.is_empty() {
        return Err(ValidationError::EmptyPlan);
    }

    let mut seen = HashSet::new();
    for (index, step) in record.steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            return Err(ValidationError::MissingStepId { index });
        }
        if step.agent_id.trim().is_empty() {
            return Err(ValidationError::MissingAgentId {
                step_id: step.id.clone(),
            });
        }
        if !seen.insert(step.id.as_str()) {
            return Err(ValidationError::DuplicateStep {
                step_id: step.id.clone(),
            });
        }
    }
    for step in &record.steps {
        if let Some(dependency) = step
            .depends_on
            .iter()
            .find(|dep| !seen.contains(dep.as_str()))
        {
            return Err(ValidationError::UnknownDependency {
                step_id: step.id.clone(),
                dependency: dependency.clone(),
            });
        }
    }

    let id = record
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    Ok(TaskPlan {
        id,
        summary: record.summary.clone(),
        user_message: record.user_message.clone(),
        steps: record
            .steps
            .iter()
            .map(|step| TaskStep {
                id: step.id.clone(),
                agent_id: step.agent_id.clone(),
                action: step.action.clone(),
                description: step.description.clone(),
                params: step.params.clone(),
                status: StepStatus::Pending,
                result: None,
                requires_approval: step.requires_approval,
                depends_on: step.depends_on.clone(),
            })
            .collect(),
        status: PlanStatus::Proposed,
        created_at: record
            .created_at
            .as_deref()
            .and_then(parse_created_at)
            .unwrap_or_else(Utc::now),
    })
}

/// RFC 3339, or an ISO timestamp without offset, read as UTC.
fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Client plan in the service's naming, as sent with an execute request.
pub fn plan_to_record(plan: &TaskPlan) -> PlanRecord {
    PlanRecord {
        id: Some(plan.id.clone()),
        summary: plan.summary.clone(),
        user_message: plan.user_message.clone(),
        steps: plan
            .steps
            .iter()
            .map(|step| StepRecord {
                id: step.id.clone(),
                agent_id: step.agent_id.clone(),
                action: step.action.clone(),
                description: step.description.clone(),
                params: step.params.clone(),
                requires_approval: step.requires_approval,
                depends_on: step.depends_on.clone(),
            })
            .collect(),
        status: Some(plan.status),
        created_at: Some(plan.created_at.to_rfc3339()),
    }
}

/// Backend graph record to client graph, laid out and in `planning` status.
pub fn build_graph(record: &GraphRecord) -> Result<ExecutionGraphState, GraphIntegrityError> {
    let mut node_ids = HashSet::new();
    let mut nodes = Vec::with_capacity(record.nodes.len());
    for (index, node) in record.nodes.iter().enumerate() {
        if node.id.trim().is_empty() {
            return Err(GraphIntegrityError::MissingNodeId { index });
        }
        if !node_ids.insert(node.id.as_str()) {
            return Err(GraphIntegrityError::DuplicateNode {
                node_id: node.id.clone(),
            });
        }
        nodes.push(build_node(node)?);
    }

    let mut edge_ids = HashSet::new();
    let mut edges = Vec::with_capacity(record.edges.len());
    for edge in &record.edges {
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(GraphIntegrityError::DuplicateEdge {
                edge_id: edge.id.clone(),
            });
        }
        for (endpoint, node_id) in [
            (EdgeEndpoint::Source, &edge.source),
            (EdgeEndpoint::Target, &edge.target),
        ] {
            if !node_ids.contains(node_id.as_str()) {
                return Err(GraphIntegrityError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    endpoint,
                    node_id: node_id.clone(),
                });
            }
        }
        edges.push(GraphEdge {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            status: edge.data.status,
            data_preview: edge.data.data_preview.clone(),
        });
    }

    let mut graph = ExecutionGraphState {
        task_id: record.task_id.clone(),
        nodes,
        edges,
        current_node_id: record
            .current_node_id
            .clone()
            .filter(|id| node_ids.contains(id.as_str())),
        status: GraphStatus::Planning,
        pending_checkpoint: None,
    };
    apply_layout(&mut graph);
    Ok(graph)
}

fn build_node(record: &NodeRecord) -> Result<GraphNode, GraphIntegrityError> {
    let role = record
        .role
        .as_deref()
        .or(record.data.role.as_deref())
        .unwrap_or_default();
    let kind = NodeKind::parse(role).ok_or_else(|| GraphIntegrityError::UnknownRole {
        node_id: record.id.clone(),
        role: role.to_string(),
    })?;

    let data = &record.data;
    Ok(GraphNode {
        id: record.id.clone(),
        kind,
        label: if data.label.is_empty() {
            record.id.clone()
        } else {
            data.label.clone()
        },
        status: data.status,
        agent: data.agent_id.as_ref().map(|agent_id| AgentBadge {
            agent_id: agent_id.clone(),
            color: data.agent_color.clone(),
            icon: data.agent_icon.clone(),
        }),
        result: data.result.clone(),
        duration_ms: data.duration,
        input_modality: data.input_modality,
        timestamp: data.timestamp.clone(),
        position: Position {
            x: record.position.x,
            y: record.position.y,
        },
    })
}

/// Client graph in the service's naming, as sent with an execute request.
pub fn graph_to_record(graph: &ExecutionGraphState) -> GraphRecord {
    GraphRecord {
        task_id: graph.task_id.clone(),
        nodes: graph
            .nodes
            .iter()
            .map(|node| NodeRecord {
                id: node.id.clone(),
                role: Some(node.kind.label().to_string()),
                data: NodeDataRecord {
                    label: node.label.clone(),
                    role: Some(node.kind.label().to_string()),
                    status: node.status,
                    agent_id: node.agent.as_ref().map(|a| a.agent_id.clone()),
                    agent_color: node.agent.as_ref().and_then(|a| a.color.clone()),
                    agent_icon: node.agent.as_ref().and_then(|a| a.icon.clone()),
                    result: node.result.clone(),
                    duration: node.duration_ms,
                    input_modality: node.input_modality,
                    timestamp: node.timestamp.clone(),
                },
                position: PositionRecord {
                    x: node.position.x,
                    y: node.position.y,
                },
            })
            .collect(),
        edges: graph
            .edges
            .iter()
            .map(|edge| EdgeRecord {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                data: EdgeDataRecord {
                    status: edge.status,
                    data_preview: edge.data_preview.clone(),
                },
            })
            .collect(),
        current_node_id: graph.current_node_id.clone(),
        status: Some(graph.status),
    }
}

/// Plan and graph carried by a chat reply. Either both translate or nothing
/// is returned.
pub fn translate_reply(
    reply: &ChatReply,
) -> Result<(Option<TaskPlan>, Option<ExecutionGraphState>), TranslateError> {
    let plan = reply.plan.as_ref().map(translate_plan).transpose()?;
    let graph = reply.graph.as_ref().map(build_graph).transpose()?;
    Ok((plan, graph))
}
