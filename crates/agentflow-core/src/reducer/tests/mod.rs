pub(super) use super::reduce;
pub(super) use super::AgentflowEffect;
pub(super) use super::CHAT_ERROR_MESSAGE;
pub(super) use super::COMPLETION_MESSAGE;
pub(super) use super::EXECUTION_ERROR_MESSAGE;
pub(super) use super::PROCESSING_MESSAGE;
pub(super) use crate::actions::AppAction;
pub(super) use crate::actions::ChatSubmission;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::events::ExecutionEvent;
pub(super) use crate::records::ChatReply;
pub(super) use crate::records::EdgeDataRecord;
pub(super) use crate::records::EdgeRecord;
pub(super) use crate::records::GraphRecord;
pub(super) use crate::records::NodeDataRecord;
pub(super) use crate::records::NodeRecord;
pub(super) use crate::records::PlanRecord;
pub(super) use crate::records::PositionRecord;
pub(super) use crate::records::StepRecord;
pub(super) use crate::state::AppState;
pub(super) use crate::state::EdgeStatus;
pub(super) use crate::state::GraphStatus;
pub(super) use crate::state::InputModality;
pub(super) use crate::state::MessageRole;
pub(super) use crate::state::ModalityMode;
pub(super) use crate::state::NodeStatus;
pub(super) use crate::state::PlanStatus;
pub(super) use crate::state::StepStatus;
pub(super) use crate::state::TransparencyLevel;

mod event_protocol;
mod transparency;
mod view_consistency;

fn state() -> AppState {
    AppState::new()
}

fn state_with(level: TransparencyLevel) -> AppState {
    let mut state = state();
    state.preferences.transparency = level;
    state
}

fn run_user(state: &mut AppState, action: UserAction) -> Vec<AgentflowEffect> {
    reduce(state, AppAction::User(action))
}

fn run_runtime(state: &mut AppState, action: RuntimeAction) -> Vec<AgentflowEffect> {
    reduce(state, AppAction::Runtime(action))
}

fn run_event(state: &mut AppState, run_id: u64, event: ExecutionEvent) -> Vec<AgentflowEffect> {
    run_runtime(state, RuntimeAction::ExecutionEvent { run_id, event })
}

fn step_record(id: &str, depends_on: &[&str]) -> StepRecord {
    StepRecord {
        id: id.to_string(),
        agent_id: "web".to_string(),
        action: "web_search".to_string(),
        description: format!("run {id}"),
        params: serde_json::Map::new(),
        requires_approval: false,
        depends_on: depends_on.iter().map(|dep| dep.to_string()).collect(),
    }
}

fn node_record(id: &str, role: &str) -> NodeRecord {
    NodeRecord {
        id: id.to_string(),
        role: Some(role.to_string()),
        data: NodeDataRecord {
            label: id.to_string(),
            role: Some(role.to_string()),
            ..NodeDataRecord::default()
        },
        position: PositionRecord::default(),
    }
}

fn edge_record(id: &str, source: &str, target: &str) -> EdgeRecord {
    EdgeRecord {
        id: id.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        data: EdgeDataRecord::default(),
    }
}

/// Graph G: nodes `n1`, `n2` and edge `e1: n1 -> n2`.
fn two_node_graph() -> GraphRecord {
    GraphRecord {
        task_id: "task-1".to_string(),
        nodes: vec![node_record("n1", "agent"), node_record("n2", "agent")],
        edges: vec![edge_record("e1", "n1", "n2")],
        current_node_id: None,
        status: None,
    }
}

fn two_step_reply() -> ChatReply {
    ChatReply {
        message: "Here is the plan".to_string(),
        plan: Some(PlanRecord {
            id: Some("plan-1".to_string()),
            summary: "Two steps".to_string(),
            user_message: Some("do two things".to_string()),
            steps: vec![step_record("n1", &[]), step_record("n2", &["n1"])],
            status: None,
            created_at: None,
        }),
        graph: Some(two_node_graph()),
        image_base64: None,
    }
}

/// Sends a chat turn and answers it with `reply`, returning the effects of
/// the reply.
fn propose(state: &mut AppState, reply: ChatReply) -> Vec<AgentflowEffect> {
    let effects = run_user(
        state,
        UserAction::SubmitChat(ChatSubmission::text("do two things")),
    );
    assert!(matches!(
        effects.as_slice(),
        [AgentflowEffect::RequestPlan(_)]
    ));
    run_runtime(state, RuntimeAction::ChatResponseReceived(reply))
}

fn opened_run(effects: &[AgentflowEffect]) -> Option<u64> {
    effects.iter().find_map(|effect| match effect {
        AgentflowEffect::OpenExecutionStream { run_id, .. } => Some(*run_id),
        _ => None,
    })
}

/// Proposes the two-step plan under full transparency and approves it.
fn executing_state() -> (AppState, u64) {
    let mut state = state();
    propose(&mut state, two_step_reply());
    let effects = run_user(&mut state, UserAction::ExecutePlan);
    let run_id = opened_run(&effects).expect("execution stream opened");
    (state, run_id)
}
