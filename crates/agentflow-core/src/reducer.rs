use tracing::debug;
use tracing::info;
use tracing::warn;

use super::actions::AppAction;
use super::actions::ChatSubmission;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::events::ExecutionEvent;
use super::policy::disclosure_for;
use super::policy::modality_permitted;
use super::records::ChatReply;
use super::records::GraphRecord;
use super::records::PlanRecord;
use super::state::AppState;
use super::state::ChatMessage;
use super::state::EdgeStatus;
use super::state::GraphStatus;
use super::state::InputModality;
use super::state::MessageRole;
use super::state::NodeStatus;
use super::state::PendingCheckpoint;
use super::state::PlanStatus;
use super::translate::build_graph;
use super::translate::graph_to_record;
use super::translate::plan_to_record;
use super::translate::translate_reply;

pub const PROCESSING_MESSAGE: &str = "Processing your request...";
pub const CHAT_ERROR_MESSAGE: &str =
    "Sorry, something went wrong. Please check that the server is running.";
pub const EXECUTION_ERROR_MESSAGE: &str = "Execution failed. Please check the server connection.";
pub const COMPLETION_MESSAGE: &str = "All tasks completed successfully!";
pub const VOICE_PLACEHOLDER: &str = "Voice message";
pub const IMAGE_PLACEHOLDER: &str = "Image sent";

/// Body of a plan request, as handed to the orchestration client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub message: String,
    pub image_base64: Option<String>,
    pub audio_base64: Option<String>,
    pub modality: InputModality,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentflowEffect {
    RequestPlan(PlanRequest),
    OpenExecutionStream {
        run_id: u64,
        plan: PlanRecord,
        graph: GraphRecord,
    },
    SubmitApproval {
        step_id: String,
        approved: bool,
    },
}

pub fn reduce(state: &mut AppState, action: AppAction) -> Vec<AgentflowEffect> {
    match action {
        AppAction::User(user) => reduce_user(state, user),
        AppAction::Runtime(runtime) => reduce_runtime(state, runtime),
    }
}

fn reduce_user(state: &mut AppState, action: UserAction) -> Vec<AgentflowEffect> {
    match action {
        UserAction::SubmitChat(submission) => submit_chat(state, submission),
        UserAction::ExecutePlan => begin_execution(state),
        UserAction::RejectPlan => {
            let proposed = state
                .current_plan
                .as_ref()
                .is_some_and(|plan| plan.status == PlanStatus::Proposed);
            if proposed && !state.is_executing() {
                state.current_plan = None;
                state.graph_state = None;
                state.plan_disclosure = None;
                debug!(target: "agentflow.reducer", "proposed plan rejected");
            }
            Vec::new()
        }
        UserAction::ResolveCheckpoint { approved } => {
            let Some(checkpoint) = state
                .graph_state
                .as_ref()
                .and_then(|graph| graph.pending_checkpoint.clone())
            else {
                debug!(target: "agentflow.reducer", "no checkpoint awaiting a decision");
                return Vec::new();
            };
            vec![AgentflowEffect::SubmitApproval {
                step_id: checkpoint.step_id,
                approved,
            }]
        }
        UserAction::SetTransparency(level) => {
            state.preferences.transparency = level;
            Vec::new()
        }
        UserAction::SetModalityMode(mode) => {
            state.preferences.modality = mode;
            Vec::new()
        }
        UserAction::SetThemeMode(theme) => {
            state.preferences.theme = theme;
            Vec::new()
        }
        UserAction::SetLanguage(language) => {
            state.preferences.language = language;
            Vec::new()
        }
        UserAction::SelectTab(tab) => {
            state.ui.tab = tab;
            Vec::new()
        }
        UserAction::ToggleExpandedGraph => {
            state.ui.expanded_graph = !state.ui.expanded_graph;
            Vec::new()
        }
        UserAction::SetImagePreview(preview) => {
            state.ui.image_preview = preview;
            Vec::new()
        }
        UserAction::StartNewConversation => {
            if let Some(archived) = state
                .history
                .archive(&state.messages, state.preferences.transparency)
            {
                info!(
                    target: "agentflow.archive",
                    id = %archived.id,
                    title = %archived.title,
                    "conversation archived"
                );
            }
            state.messages.clear();
            state.current_plan = None;
            state.graph_state = None;
            state.plan_disclosure = None;
            // Replies and stream records still in flight belong to the old
            // conversation.
            state.is_loading = false;
            state.execution.active_run = None;
            Vec::new()
        }
        UserAction::OpenConversation { id } => {
            if state.history.get(&id).is_some() {
                state.viewing = Some(id);
            } else {
                debug!(target: "agentflow.archive", %id, "open of unknown conversation ignored");
            }
            Vec::new()
        }
        UserAction::CloseConversation => {
            state.viewing = None;
            Vec::new()
        }
        UserAction::DeleteConversation { id } => {
            if state.history.delete(&id) {
                if state.viewing.as_deref() == Some(id.as_str()) {
                    state.viewing = None;
                }
                debug!(target: "agentflow.archive", %id, "conversation deleted");
            } else {
                debug!(target: "agentflow.archive", %id, "delete of unknown conversation ignored");
            }
            Vec::new()
        }
        UserAction::ClearAllHistory => {
            let removed = state.history.clear();
            state.viewing = None;
            debug!(target: "agentflow.archive", removed, "history cleared");
            Vec::new()
        }
    }
}

fn reduce_runtime(state: &mut AppState, action: RuntimeAction) -> Vec<AgentflowEffect> {
    match action {
        RuntimeAction::ChatResponseReceived(reply) => receive_reply(state, reply),
        RuntimeAction::ChatRequestFailed { reason } => {
            if !state.is_loading {
                debug!(target: "agentflow.reducer", "stale chat failure ignored");
                return Vec::new();
            }
            warn!(target: "agentflow.reducer", %reason, "plan request failed");
            state.is_loading = false;
            state.messages.push(ChatMessage::assistant(CHAT_ERROR_MESSAGE));
            Vec::new()
        }
        RuntimeAction::ExecutionEvent { run_id, event } => {
            if state.execution.active_run != Some(run_id) {
                debug!(
                    target: "agentflow.reducer",
                    run_id,
                    kind = event.kind(),
                    "record from inactive run dropped"
                );
                return Vec::new();
            }
            apply_event(state, event);
            Vec::new()
        }
        RuntimeAction::ExecutionStreamClosed { run_id } => {
            if state.execution.active_run == Some(run_id) {
                debug!(target: "agentflow.reducer", run_id, "stream closed before a terminal event");
                state.execution.active_run = None;
            }
            Vec::new()
        }
        RuntimeAction::ExecutionRequestFailed { run_id, reason } => {
            if state.execution.active_run != Some(run_id) {
                return Vec::new();
            }
            warn!(target: "agentflow.reducer", run_id, %reason, "execute request failed");
            state.execution.active_run = None;
            state
                .messages
                .push(ChatMessage::assistant(EXECUTION_ERROR_MESSAGE));
            Vec::new()
        }
        RuntimeAction::AgentsLoaded(agents) => {
            state.agents = agents;
            Vec::new()
        }
    }
}

fn submit_chat(state: &mut AppState, submission: ChatSubmission) -> Vec<AgentflowEffect> {
    if state.is_loading || state.is_executing() {
        debug!(target: "agentflow.reducer", "chat rejected while busy");
        return Vec::new();
    }
    if !modality_permitted(state.preferences.modality, submission.modality) {
        debug!(
            target: "agentflow.reducer",
            modality = submission.modality.label(),
            mode = state.preferences.modality.label(),
            "chat rejected by modality mode"
        );
        return Vec::new();
    }
    let ChatSubmission {
        text,
        image_base64,
        audio_base64,
        modality,
    } = submission;
    if text.trim().is_empty() && image_base64.is_none() && audio_base64.is_none() {
        return Vec::new();
    }

    let content = if text.is_empty() {
        match modality {
            InputModality::Voice => VOICE_PLACEHOLDER.to_string(),
            InputModality::Image => IMAGE_PLACEHOLDER.to_string(),
            InputModality::Text => String::new(),
        }
    } else {
        text.clone()
    };
    let mut message = ChatMessage::new(MessageRole::User, content, modality);
    message.image_url = image_base64.as_deref().map(image_data_url);
    state.messages.push(message);
    state.is_loading = true;
    state.ui.image_preview = None;

    vec![AgentflowEffect::RequestPlan(PlanRequest {
        message: text,
        image_base64,
        audio_base64,
        modality,
    })]
}

fn receive_reply(state: &mut AppState, reply: ChatReply) -> Vec<AgentflowEffect> {
    if !state.is_loading {
        debug!(target: "agentflow.reducer", "stale chat reply ignored");
        return Vec::new();
    }
    state.is_loading = false;

    let (plan, graph) = match translate_reply(&reply) {
        Ok(translated) => translated,
        Err(err) => {
            warn!(target: "agentflow.reducer", error = %err, "chat reply rejected");
            state.messages.push(ChatMessage::assistant(CHAT_ERROR_MESSAGE));
            return Vec::new();
        }
    };

    let proposed = plan.is_some();
    if let Some(plan) = plan {
        info!(
            target: "agentflow.reducer",
            plan_id = %plan.id,
            steps = plan.steps.len(),
            level = state.preferences.transparency.label(),
            "plan proposed"
        );
        state.plan_disclosure = Some(disclosure_for(state.preferences.transparency));
        state.current_plan = Some(plan);
        state.graph_state = graph;
    } else if graph.is_some() {
        state.graph_state = graph;
    }

    let disclosure = state.active_disclosure();
    if proposed && disclosure.auto_execute && state.graph_state.is_none() {
        // Nothing can run and nothing may be shown: drop the hidden plan.
        warn!(target: "agentflow.reducer", "black-box plan arrived without a graph");
        state.current_plan = None;
        state.plan_disclosure = None;
        state.messages.push(ChatMessage::assistant(EXECUTION_ERROR_MESSAGE));
        return Vec::new();
    }
    let mut message = if proposed && disclosure.auto_execute {
        ChatMessage::assistant(PROCESSING_MESSAGE)
    } else {
        let mut message = ChatMessage::assistant(reply.message);
        if proposed && disclosure.show_plan {
            message.task_plan = state.current_plan.clone();
        }
        if disclosure.show_graph {
            message.execution_graph = state.graph_state.clone();
        }
        message
    };
    message.image_url = reply.image_base64.as_deref().map(image_data_url);
    state.messages.push(message);

    if proposed && disclosure.auto_execute {
        begin_execution(state)
    } else {
        Vec::new()
    }
}

/// Single entry point for starting a run. Refuses while another run is in
/// flight, so at most one execution stream is ever open.
fn begin_execution(state: &mut AppState) -> Vec<AgentflowEffect> {
    if let Some(run_id) = state.execution.active_run {
        debug!(target: "agentflow.reducer", run_id, "execute rejected: run in flight");
        return Vec::new();
    }
    let (Some(plan), Some(graph)) = (state.current_plan.as_mut(), state.graph_state.as_mut())
    else {
        debug!(target: "agentflow.reducer", "execute rejected: no plan or graph");
        return Vec::new();
    };
    if !matches!(plan.status, PlanStatus::Proposed | PlanStatus::Approved) {
        debug!(
            target: "agentflow.reducer",
            status = plan.status.label(),
            "execute rejected: plan not runnable"
        );
        return Vec::new();
    }

    let plan_record = plan_to_record(plan);
    let graph_record = graph_to_record(graph);
    plan.status = PlanStatus::Executing;
    graph.status = GraphStatus::Executing;

    let run_id = state.execution.start_run();
    info!(target: "agentflow.reducer", run_id, plan_id = %plan.id, "execution started");

    vec![AgentflowEffect::OpenExecutionStream {
        run_id,
        plan: plan_record,
        graph: graph_record,
    }]
}

fn apply_event(state: &mut AppState, event: ExecutionEvent) {
    match event {
        ExecutionEvent::GraphInit { graph } => match build_graph(&graph) {
            Ok(mut graph) => {
                graph.status = GraphStatus::Executing;
                state.graph_state = Some(graph);
            }
            Err(err) => {
                warn!(target: "agentflow.reducer", error = %err, "graph_init rejected");
            }
        },
        ExecutionEvent::NodeStatus {
            node_id,
            status,
            result,
            duration,
        } => set_node_status(state, node_id, status, result, duration),
        ExecutionEvent::EdgeStatus {
            edge_id,
            status,
            data_preview,
        } => set_edge_status(state, &edge_id, status, data_preview),
        ExecutionEvent::CheckpointReached { node_id, step_id } => {
            let Some(graph) = state.graph_state.as_mut() else {
                return;
            };
            debug!(target: "agentflow.reducer", %node_id, %step_id, "checkpoint reached");
            graph.pending_checkpoint = Some(PendingCheckpoint { node_id, step_id });
            graph.status = GraphStatus::AwaitingApproval;
        }
        ExecutionEvent::ExecutionComplete { summary, .. } => {
            if let Some(graph) = state.graph_state.as_mut() {
                graph.status = GraphStatus::Completed;
                graph.pending_checkpoint = None;
            }
            if let Some(plan) = state.current_plan.as_mut() {
                plan.status = PlanStatus::Completed;
            }
            state.execution.active_run = None;
            let content = summary
                .filter(|summary| !summary.trim().is_empty())
                .unwrap_or_else(|| COMPLETION_MESSAGE.to_string());
            state.messages.push(ChatMessage::assistant(content));
            info!(target: "agentflow.reducer", "execution completed");
        }
        ExecutionEvent::ExecutionFailed { node_id, error } => {
            if let Some(graph) = state.graph_state.as_mut() {
                graph.status = GraphStatus::Failed;
                graph.pending_checkpoint = None;
            }
            if let Some(plan) = state.current_plan.as_mut() {
                plan.status = PlanStatus::Failed;
            }
            state.execution.active_run = None;
            warn!(
                target: "agentflow.reducer",
                node_id = node_id.as_deref().unwrap_or("-"),
                error = error.as_deref().unwrap_or("-"),
                "execution failed"
            );
        }
        ExecutionEvent::Unknown => {
            debug!(target: "agentflow.reducer", "unknown event kind ignored");
        }
    }
}

fn set_node_status(
    state: &mut AppState,
    node_id: String,
    status: NodeStatus,
    result: Option<String>,
    duration: Option<u64>,
) {
    let Some(graph) = state.graph_state.as_mut() else {
        debug!(target: "agentflow.reducer", %node_id, "node_status without a graph");
        return;
    };
    let Some(node) = graph.nodes.iter_mut().find(|node| node.id == node_id) else {
        debug!(target: "agentflow.reducer", %node_id, "node_status for unknown node");
        return;
    };
    node.status = status;
    if result.is_some() {
        node.result = result;
    }
    if duration.is_some() {
        node.duration_ms = duration;
    }

    let resolves = graph
        .pending_checkpoint
        .as_ref()
        .is_some_and(|checkpoint| checkpoint.node_id == node_id)
        && status.resolves_checkpoint();
    if resolves {
        graph.pending_checkpoint = None;
        if graph.status == GraphStatus::AwaitingApproval {
            graph.status = GraphStatus::Executing;
        }
    }
    if status == NodeStatus::Running {
        graph.current_node_id = Some(node_id);
    }
}

fn set_edge_status(
    state: &mut AppState,
    edge_id: &str,
    status: EdgeStatus,
    data_preview: Option<String>,
) {
    let Some(edge) = state
        .graph_state
        .as_mut()
        .and_then(|graph| graph.edges.iter_mut().find(|edge| edge.id == edge_id))
    else {
        debug!(target: "agentflow.reducer", edge_id, "edge_status for unknown edge");
        return;
    };
    edge.status = status;
    if data_preview.is_some() {
        edge.data_preview = data_preview;
    }
}

fn image_data_url(base64: &str) -> String {
    format!("data:image/jpeg;base64,{base64}")
}

#[cfg(test)]
mod tests;
