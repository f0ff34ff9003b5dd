use super::*;
use pretty_assertions::assert_eq;

#[test]
fn black_box_auto_executes_without_embeds() {
    let mut state = state_with(TransparencyLevel::BlackBox);
    let effects = propose(&mut state, two_step_reply());

    assert!(opened_run(&effects).is_some());
    assert!(state.is_executing());

    let message = state.messages.last().expect("assistant message");
    assert_eq!(message.role, MessageRole::Assistant);
    assert_eq!(message.content, PROCESSING_MESSAGE);
    assert_eq!(message.task_plan, None);
    assert_eq!(message.execution_graph, None);
    assert_eq!(state.visible_plan(), None);
    assert_eq!(state.visible_graph(), None);
}

#[test]
fn plan_preview_embeds_plan_but_not_graph() {
    let mut state = state_with(TransparencyLevel::PlanPreview);
    let effects = propose(&mut state, two_step_reply());

    assert!(effects.is_empty());
    assert!(!state.is_executing());
    assert!(state.graph_state.is_some());

    let message = state.messages.last().expect("assistant message");
    assert_eq!(message.content, "Here is the plan");
    assert_eq!(
        message.task_plan.as_ref().map(|plan| plan.id.as_str()),
        Some("plan-1")
    );
    assert_eq!(message.execution_graph, None);
    assert!(state.visible_plan().is_some());
    assert_eq!(state.visible_graph(), None);
}

#[test]
fn full_transparency_embeds_both_and_waits_for_approval() {
    let mut state = state_with(TransparencyLevel::FullTransparency);
    let effects = propose(&mut state, two_step_reply());

    assert!(effects.is_empty());
    let message = state.messages.last().expect("assistant message");
    assert!(message.task_plan.is_some());
    assert!(message.execution_graph.is_some());

    let effects = run_user(&mut state, UserAction::ExecutePlan);
    assert!(opened_run(&effects).is_some());
}

#[test]
fn level_change_does_not_reveal_in_flight_plan() {
    let mut state = state_with(TransparencyLevel::BlackBox);
    propose(&mut state, two_step_reply());

    run_user(
        &mut state,
        UserAction::SetTransparency(TransparencyLevel::FullTransparency),
    );
    assert_eq!(state.visible_plan(), None);
    assert_eq!(state.visible_graph(), None);
    assert_eq!(
        state.preferences.transparency,
        TransparencyLevel::FullTransparency
    );
}

#[test]
fn reply_without_plan_never_auto_executes() {
    let mut state = state_with(TransparencyLevel::BlackBox);
    let reply = ChatReply {
        message: "Hello! How can I help?".to_string(),
        ..ChatReply::default()
    };
    let effects = propose(&mut state, reply);

    assert!(effects.is_empty());
    assert_eq!(
        state.messages.last().map(|m| m.content.as_str()),
        Some("Hello! How can I help?")
    );
}

#[test]
fn decision_survives_restore_after_level_change() {
    let mut state = state_with(TransparencyLevel::PlanPreview);
    propose(&mut state, two_step_reply());
    run_user(
        &mut state,
        UserAction::SetTransparency(TransparencyLevel::FullTransparency),
    );
    assert_eq!(state.visible_graph(), None);

    let restored = AppState::restore(Some(state.snapshot()), Vec::new());
    assert_eq!(
        restored.preferences.transparency,
        TransparencyLevel::FullTransparency
    );
    assert_eq!(restored.plan_disclosure, state.plan_disclosure);
    assert!(restored.visible_plan().is_some());
    assert_eq!(restored.visible_graph(), None);
}

#[test]
fn snapshot_without_decision_restores_plan_hidden() {
    let mut state = state_with(TransparencyLevel::FullTransparency);
    propose(&mut state, two_step_reply());
    let mut snapshot = state.snapshot();
    snapshot.plan_disclosure = None;

    let restored = AppState::restore(Some(snapshot), Vec::new());
    assert!(restored.current_plan.is_some());
    assert_eq!(restored.visible_plan(), None);
    assert_eq!(restored.visible_graph(), None);
}

#[test]
fn black_box_plan_without_graph_reports_failure() {
    let mut state = state_with(TransparencyLevel::BlackBox);
    let reply = ChatReply {
        graph: None,
        ..two_step_reply()
    };
    let effects = propose(&mut state, reply);

    assert!(effects.is_empty());
    assert!(!state.is_executing());
    assert!(!state.is_loading);
    assert_eq!(state.current_plan, None);
    assert_eq!(
        state.messages.last().map(|m| m.content.as_str()),
        Some(EXECUTION_ERROR_MESSAGE)
    );
    assert!(state
        .messages
        .iter()
        .all(|message| message.content != PROCESSING_MESSAGE));
}
