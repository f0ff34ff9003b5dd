use std::collections::VecDeque;

use agentflow_core::AgentflowEffect;
use agentflow_core::AppAction;
use agentflow_core::ExecutionEvent;
use agentflow_core::PendingCheckpoint;
use agentflow_core::RuntimeAction;
use agentflow_core::Store;
use agentflow_core::UserAction;
use futures::StreamExt;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::client::Orchestrator;
use crate::contracts::ApprovalRequest;
use crate::contracts::ExecuteRequest;
use crate::error::SessionError;
use crate::stream::decode_stream;

type EventTap = Box<dyn FnMut(&ExecutionEvent) + Send>;
type CheckpointHandler = Box<dyn FnMut(&PendingCheckpoint) -> Option<bool> + Send>;

/// Drives a [`Store`] against an orchestration service: dispatches an action,
/// then runs the effects it produced until none are left.
///
/// Each stream record is dispatched to completion before the next one is
/// read.
pub struct Session<O> {
    store: Store,
    orchestrator: O,
    event_tap: Option<EventTap>,
    checkpoint_handler: Option<CheckpointHandler>,
}

impl<O: Orchestrator> Session<O> {
    pub fn new(store: Store, orchestrator: O) -> Self {
        Self {
            store,
            orchestrator,
            event_tap: None,
            checkpoint_handler: None,
        }
    }

    /// Observes every record of the active run before it is applied.
    pub fn with_event_tap(mut self, tap: impl FnMut(&ExecutionEvent) + Send + 'static) -> Self {
        self.event_tap = Some(Box::new(tap));
        self
    }

    /// Asked once per checkpoint while the stream is open. `Some(approved)`
    /// submits the decision, `None` leaves the checkpoint pending.
    pub fn with_checkpoint_handler(
        mut self,
        handler: impl FnMut(&PendingCheckpoint) -> Option<bool> + Send + 'static,
    ) -> Self {
        self.checkpoint_handler = Some(Box::new(handler));
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    pub async fn dispatch(&mut self, action: AppAction) {
        let mut queue: VecDeque<AgentflowEffect> = self.store.dispatch(action).into();
        while let Some(effect) = queue.pop_front() {
            let follow_up = self.run_effect(effect).await;
            queue.extend(follow_up);
        }
    }

    pub async fn user(&mut self, action: UserAction) {
        self.dispatch(AppAction::User(action)).await;
    }

    pub async fn refresh_agents(&mut self) -> Result<(), SessionError> {
        let agents = self.orchestrator.list_agents().await?;
        debug!(target: "agentflow.session", count = agents.len(), "agent registry loaded");
        self.store
            .dispatch(AppAction::Runtime(RuntimeAction::AgentsLoaded(agents)));
        Ok(())
    }

    pub async fn set_agent_enabled(&mut self, id: &str, enabled: bool) -> Result<(), SessionError> {
        self.update_agent(id, |agent| agent.enabled = enabled).await
    }

    pub async fn set_agent_guidance(
        &mut self,
        id: &str,
        guidance: Option<String>,
    ) -> Result<(), SessionError> {
        self.update_agent(id, |agent| agent.constitution = guidance)
            .await
    }

    async fn update_agent(
        &mut self,
        id: &str,
        edit: impl FnOnce(&mut agentflow_core::AgentRecord),
    ) -> Result<(), SessionError> {
        self.refresh_agents().await?;
        let Some(mut agent) = self
            .store
            .state()
            .agents
            .iter()
            .find(|agent| agent.id == id)
            .cloned()
        else {
            return Err(SessionError::UnknownAgent { id: id.to_string() });
        };
        edit(&mut agent);
        self.orchestrator.update_agent(&agent).await?;
        info!(target: "agentflow.session", agent = %id, "agent updated");
        self.refresh_agents().await
    }

    async fn run_effect(&mut self, effect: AgentflowEffect) -> Vec<AgentflowEffect> {
        match effect {
            AgentflowEffect::RequestPlan(request) => {
                let action = match self.orchestrator.chat(request.into()).await {
                    Ok(reply) => RuntimeAction::ChatResponseReceived(reply),
                    Err(err) => RuntimeAction::ChatRequestFailed {
                        reason: err.to_string(),
                    },
                };
                self.store.dispatch(AppAction::Runtime(action))
            }
            AgentflowEffect::OpenExecutionStream {
                run_id,
                plan,
                graph,
            } => self.run_execution(run_id, ExecuteRequest { plan, graph }).await,
            AgentflowEffect::SubmitApproval { step_id, approved } => {
                self.submit_approval(&step_id, approved).await;
                Vec::new()
            }
        }
    }

    async fn run_execution(&mut self, run_id: u64, request: ExecuteRequest) -> Vec<AgentflowEffect> {
        let body = match self.orchestrator.execute(request).await {
            Ok(body) => body,
            Err(err) => {
                return self.store.dispatch(AppAction::Runtime(
                    RuntimeAction::ExecutionRequestFailed {
                        run_id,
                        reason: err.to_string(),
                    },
                ));
            }
        };

        let mut follow_up = Vec::new();
        let mut offered: Option<PendingCheckpoint> = None;
        let mut events = std::pin::pin!(decode_stream(body));
        while let Some(record) = events.next().await {
            let event = match record {
                Ok(event) => event,
                Err(err) => {
                    follow_up.extend(self.store.dispatch(AppAction::Runtime(
                        RuntimeAction::ExecutionRequestFailed {
                            run_id,
                            reason: err.to_string(),
                        },
                    )));
                    return follow_up;
                }
            };
            debug!(target: "agentflow.session", run_id, kind = event.kind(), "record received");
            if let Some(tap) = self.event_tap.as_mut() {
                tap(&event);
            }
            follow_up.extend(self.store.dispatch(AppAction::Runtime(
                RuntimeAction::ExecutionEvent { run_id, event },
            )));
            self.offer_checkpoint(&mut offered).await;
        }

        follow_up.extend(
            self.store
                .dispatch(AppAction::Runtime(RuntimeAction::ExecutionStreamClosed { run_id })),
        );
        follow_up
    }

    async fn offer_checkpoint(&mut self, offered: &mut Option<PendingCheckpoint>) {
        let pending = self
            .store
            .state()
            .graph_state
            .as_ref()
            .and_then(|graph| graph.pending_checkpoint.clone());
        let Some(checkpoint) = pending else {
            return;
        };
        if offered.as_ref() == Some(&checkpoint) {
            return;
        }
        *offered = Some(checkpoint.clone());

        let Some(handler) = self.checkpoint_handler.as_mut() else {
            return;
        };
        let Some(approved) = handler(&checkpoint) else {
            return;
        };
        let effects = self
            .store
            .dispatch(AppAction::User(UserAction::ResolveCheckpoint { approved }));
        for effect in effects {
            if let AgentflowEffect::SubmitApproval { step_id, approved } = effect {
                self.submit_approval(&step_id, approved).await;
            }
        }
    }

    async fn submit_approval(&self, step_id: &str, approved: bool) {
        let request = ApprovalRequest {
            approved,
            comment: String::new(),
        };
        match self.orchestrator.approve(step_id, request).await {
            Ok(()) => {
                info!(target: "agentflow.session", %step_id, approved, "checkpoint decision sent");
            }
            Err(err) => {
                warn!(target: "agentflow.session", %step_id, error = %err, "checkpoint decision not delivered");
            }
        }
    }
}
