use super::*;
use pretty_assertions::assert_eq;

fn node_status(node_id: &str, status: NodeStatus) -> ExecutionEvent {
    ExecutionEvent::NodeStatus {
        node_id: node_id.to_string(),
        status,
        result: None,
        duration: None,
    }
}

#[test]
fn seven_event_scenario_leaves_edge_active_and_run_completed() {
    let (mut state, run_id) = executing_state();
    let messages_before = state.messages.len();

    let events = vec![
        ExecutionEvent::GraphInit {
            graph: two_node_graph(),
        },
        node_status("n1", NodeStatus::Running),
        ExecutionEvent::EdgeStatus {
            edge_id: "e1".to_string(),
            status: EdgeStatus::Active,
            data_preview: None,
        },
        node_status("n1", NodeStatus::Completed),
        node_status("n2", NodeStatus::Running),
        node_status("n2", NodeStatus::Completed),
        ExecutionEvent::ExecutionComplete {
            graph: None,
            summary: Some("done".to_string()),
        },
    ];
    for event in events {
        run_event(&mut state, run_id, event);
    }

    let graph = state.graph_state.as_ref().expect("graph");
    assert_eq!(graph.node("n1").map(|n| n.status), Some(NodeStatus::Completed));
    assert_eq!(graph.node("n2").map(|n| n.status), Some(NodeStatus::Completed));
    assert_eq!(graph.edge("e1").map(|e| e.status), Some(EdgeStatus::Active));
    assert_eq!(graph.status, GraphStatus::Completed);
    assert_eq!(
        state.current_plan.as_ref().map(|plan| plan.status),
        Some(PlanStatus::Completed)
    );
    assert!(!state.is_executing());

    let appended = &state.messages[messages_before..];
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].role, MessageRole::Assistant);
    assert_eq!(appended[0].content, "done");
}

#[test]
fn completion_without_summary_uses_default_message() {
    let (mut state, run_id) = executing_state();
    run_event(
        &mut state,
        run_id,
        ExecutionEvent::ExecutionComplete {
            graph: None,
            summary: None,
        },
    );
    assert_eq!(
        state.messages.last().map(|m| m.content.as_str()),
        Some(COMPLETION_MESSAGE)
    );
}

#[test]
fn running_node_becomes_current_and_stays_after_completion() {
    let (mut state, run_id) = executing_state();
    run_event(&mut state, run_id, node_status("n1", NodeStatus::Running));
    run_event(&mut state, run_id, node_status("n1", NodeStatus::Completed));

    let graph = state.graph_state.as_ref().expect("graph");
    assert_eq!(graph.current_node_id.as_deref(), Some("n1"));
}

#[test]
fn node_result_and_duration_are_recorded() {
    let (mut state, run_id) = executing_state();
    run_event(
        &mut state,
        run_id,
        ExecutionEvent::NodeStatus {
            node_id: "n1".to_string(),
            status: NodeStatus::Completed,
            result: Some("3 papers".to_string()),
            duration: Some(812),
        },
    );

    let node = state
        .graph_state
        .as_ref()
        .and_then(|graph| graph.node("n1"))
        .expect("node");
    assert_eq!(node.result.as_deref(), Some("3 papers"));
    assert_eq!(node.duration_ms, Some(812));
}

#[test]
fn execution_failed_marks_graph_and_plan_failed() {
    let (mut state, run_id) = executing_state();
    let messages_before = state.messages.len();
    run_event(
        &mut state,
        run_id,
        ExecutionEvent::ExecutionFailed {
            node_id: Some("n1".to_string()),
            error: Some("agent crashed".to_string()),
        },
    );

    assert_eq!(
        state.graph_state.as_ref().map(|g| g.status),
        Some(GraphStatus::Failed)
    );
    assert_eq!(
        state.current_plan.as_ref().map(|p| p.status),
        Some(PlanStatus::Failed)
    );
    assert!(!state.is_executing());
    assert_eq!(state.messages.len(), messages_before);
}

#[test]
fn unknown_event_kind_is_ignored() {
    let (mut state, run_id) = executing_state();
    let before = state.clone();
    let event: ExecutionEvent =
        serde_json::from_str(r#"{"type":"agent_thought","text":"hmm"}"#).expect("parse");
    run_event(&mut state, run_id, event);
    assert_eq!(state, before);
}

#[test]
fn events_for_unknown_nodes_and_edges_change_nothing() {
    let (mut state, run_id) = executing_state();
    let before = state.clone();
    run_event(&mut state, run_id, node_status("ghost", NodeStatus::Running));
    run_event(
        &mut state,
        run_id,
        ExecutionEvent::EdgeStatus {
            edge_id: "e-ghost".to_string(),
            status: EdgeStatus::Active,
            data_preview: None,
        },
    );
    assert_eq!(state, before);
}

#[test]
fn graph_init_replaces_graph_while_executing() {
    let (mut state, run_id) = executing_state();
    let mut replacement = two_node_graph();
    replacement.nodes.push(node_record("output", "output"));
    replacement
        .edges
        .push(edge_record("e-n2-output", "n2", "output"));

    run_event(
        &mut state,
        run_id,
        ExecutionEvent::GraphInit { graph: replacement },
    );

    let graph = state.graph_state.as_ref().expect("graph");
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.status, GraphStatus::Executing);
    assert_eq!(graph.node("output").map(|n| n.position.y), Some(168.0));
}

#[test]
fn invalid_graph_init_keeps_previous_graph() {
    let (mut state, run_id) = executing_state();
    let before = state.graph_state.clone();
    let mut broken = two_node_graph();
    broken.edges.push(edge_record("e-bad", "n2", "nowhere"));

    run_event(&mut state, run_id, ExecutionEvent::GraphInit { graph: broken });
    assert_eq!(state.graph_state, before);
}

#[test]
fn checkpoint_waits_for_decision_and_clears_on_approval() {
    let (mut state, run_id) = executing_state();
    run_event(
        &mut state,
        run_id,
        ExecutionEvent::CheckpointReached {
            node_id: "n2".to_string(),
            step_id: "n2".to_string(),
        },
    );
    assert_eq!(
        state.graph_state.as_ref().map(|g| g.status),
        Some(GraphStatus::AwaitingApproval)
    );

    let effects = run_user(&mut state, UserAction::ResolveCheckpoint { approved: true });
    assert_eq!(
        effects,
        vec![AgentflowEffect::SubmitApproval {
            step_id: "n2".to_string(),
            approved: true,
        }]
    );

    run_event(&mut state, run_id, node_status("n2", NodeStatus::Approved));
    let graph = state.graph_state.as_ref().expect("graph");
    assert_eq!(graph.pending_checkpoint, None);
    assert_eq!(graph.status, GraphStatus::Executing);
}

#[test]
fn resolving_without_checkpoint_emits_nothing() {
    let (mut state, _) = executing_state();
    let effects = run_user(&mut state, UserAction::ResolveCheckpoint { approved: false });
    assert!(effects.is_empty());
}

#[test]
fn records_from_superseded_run_are_dropped() {
    let (mut state, run_id) = executing_state();
    run_user(&mut state, UserAction::StartNewConversation);
    let before = state.clone();

    run_event(&mut state, run_id, node_status("n1", NodeStatus::Running));
    run_event(
        &mut state,
        run_id,
        ExecutionEvent::ExecutionComplete {
            graph: None,
            summary: Some("late".to_string()),
        },
    );
    assert_eq!(state, before);
    assert!(state.messages.is_empty());
}

#[test]
fn stream_closing_early_ends_execution_without_message() {
    let (mut state, run_id) = executing_state();
    run_event(&mut state, run_id, node_status("n1", NodeStatus::Running));
    let messages_before = state.messages.len();

    run_runtime(&mut state, RuntimeAction::ExecutionStreamClosed { run_id });
    assert!(!state.is_executing());
    assert_eq!(state.messages.len(), messages_before);
    assert_eq!(
        state
            .graph_state
            .as_ref()
            .and_then(|g| g.node("n1"))
            .map(|n| n.status),
        Some(NodeStatus::Running)
    );
}

#[test]
fn execute_transport_failure_appends_error_message() {
    let (mut state, run_id) = executing_state();
    run_runtime(
        &mut state,
        RuntimeAction::ExecutionRequestFailed {
            run_id,
            reason: "connection refused".to_string(),
        },
    );
    assert!(!state.is_executing());
    assert_eq!(
        state.messages.last().map(|m| m.content.as_str()),
        Some(EXECUTION_ERROR_MESSAGE)
    );
}
