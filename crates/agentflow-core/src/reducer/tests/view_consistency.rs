use super::*;
use pretty_assertions::assert_eq;

fn step_status_matches_node(state: &AppState, node_id: &str) {
    let node_status = state
        .graph_state
        .as_ref()
        .and_then(|graph| graph.node(node_id))
        .map(|node| node.status)
        .expect("node present");
    let expected = StepStatus::from_node(node_status);
    assert_eq!(state.step_status(node_id), expected);
}

#[test]
fn step_status_follows_every_node_status_event() {
    let (mut state, run_id) = executing_state();
    let sequence = [
        ("n1", NodeStatus::Running),
        ("n1", NodeStatus::AwaitingApproval),
        ("n1", NodeStatus::Completed),
        ("n2", NodeStatus::Running),
        ("n2", NodeStatus::Failed),
        ("n2", NodeStatus::Pending),
        ("n2", NodeStatus::Running),
        ("n2", NodeStatus::Completed),
    ];

    for (node_id, status) in sequence {
        run_event(
            &mut state,
            run_id,
            ExecutionEvent::NodeStatus {
                node_id: node_id.to_string(),
                status,
                result: None,
                duration: None,
            },
        );
        step_status_matches_node(&state, node_id);
        step_status_matches_node(&state, "n1");
        step_status_matches_node(&state, "n2");
    }
}

#[test]
fn approved_node_reads_as_completed_step() {
    let (mut state, run_id) = executing_state();
    run_event(
        &mut state,
        run_id,
        ExecutionEvent::NodeStatus {
            node_id: "n1".to_string(),
            status: NodeStatus::Approved,
            result: None,
            duration: None,
        },
    );
    assert_eq!(state.step_status("n1"), Some(StepStatus::Completed));
}

#[test]
fn step_result_is_read_from_the_node() {
    let (mut state, run_id) = executing_state();
    run_event(
        &mut state,
        run_id,
        ExecutionEvent::NodeStatus {
            node_id: "n2".to_string(),
            status: NodeStatus::Completed,
            result: Some("summary text".to_string()),
            duration: None,
        },
    );
    let plan = state.plan_view().expect("plan");
    let step = plan.step("n2").expect("step");
    assert_eq!(step.status, StepStatus::Completed);
    assert_eq!(step.result.as_deref(), Some("summary text"));
}

#[test]
fn stored_plan_keeps_base_statuses() {
    let (mut state, run_id) = executing_state();
    run_event(
        &mut state,
        run_id,
        ExecutionEvent::NodeStatus {
            node_id: "n1".to_string(),
            status: NodeStatus::Running,
            result: None,
            duration: None,
        },
    );
    let stored = state.current_plan.as_ref().expect("plan");
    assert!(stored
        .steps
        .iter()
        .all(|step| step.status == StepStatus::Pending));
    assert_eq!(state.step_status("n1"), Some(StepStatus::Running));
}
