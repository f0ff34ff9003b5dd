use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::archive::Conversation;
use super::archive::ConversationArchive;
use super::persistence::PersistedSession;
use super::policy::disclosure_for;
use super::policy::Disclosure;
use super::records::AgentRecord;

pub const SNAPSHOT_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputModality {
    #[default]
    Text,
    Voice,
    Image,
}

impl InputModality {
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Image => "image",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "voice" => Some(Self::Voice),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// One transcript entry. Plan and graph embeds are value copies taken when
/// the message was appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_plan: Option<TaskPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_graph: Option<ExecutionGraphState>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub input_modality: InputModality,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>, modality: InputModality) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            image_url: None,
            voice_transcript: None,
            agent_id: None,
            task_plan: None,
            execution_graph: None,
            timestamp: Utc::now(),
            input_modality: modality,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content, InputModality::Text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    AwaitingApproval,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Step status implied by a graph node status. `Skipped` has no step
    /// counterpart and leaves the step untouched.
    pub fn from_node(status: NodeStatus) -> Option<Self> {
        match status {
            NodeStatus::Pending => Some(Self::Pending),
            NodeStatus::Running => Some(Self::Running),
            NodeStatus::AwaitingApproval => Some(Self::AwaitingApproval),
            NodeStatus::Completed | NodeStatus::Approved => Some(Self::Completed),
            NodeStatus::Failed => Some(Self::Failed),
            NodeStatus::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    pub id: String,
    pub agent_id: String,
    pub action: String,
    pub description: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Proposed,
    Approved,
    Executing,
    Completed,
    Failed,
}

impl PlanStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Approved => "approved",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    pub steps: Vec<TaskStep>,
    #[serde(default)]
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
}

impl TaskPlan {
    pub fn step(&self, step_id: &str) -> Option<&TaskStep> {
        self.steps.iter().find(|step| step.id == step_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Input,
    Orchestrator,
    Agent,
    Checkpoint,
    Output,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Orchestrator => "orchestrator",
            Self::Agent => "agent",
            Self::Checkpoint => "checkpoint",
            Self::Output => "output",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "input" => Some(Self::Input),
            "orchestrator" => Some(Self::Orchestrator),
            "agent" => Some(Self::Agent),
            "checkpoint" => Some(Self::Checkpoint),
            "output" => Some(Self::Output),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    AwaitingApproval,
    Approved,
    Skipped,
}

impl NodeStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Approved => "approved",
            Self::Skipped => "skipped",
        }
    }

    /// A checkpoint waiting on this node is resolved once it reaches one of these.
    pub fn resolves_checkpoint(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Completed | Self::Failed | Self::Skipped
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Failed,
}

impl EdgeStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBadge {
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentBadge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_modality: Option<InputModality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub status: EdgeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_preview: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphStatus {
    #[default]
    Planning,
    AwaitingApproval,
    Executing,
    Completed,
    Failed,
}

impl GraphStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCheckpoint {
    pub node_id: String,
    pub step_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionGraphState {
    #[serde(default)]
    pub task_id: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Last node reported as `running`. Not cleared when that node finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node_id: Option<String>,
    #[serde(default)]
    pub status: GraphStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_checkpoint: Option<PendingCheckpoint>,
}

impl ExecutionGraphState {
    pub fn node(&self, node_id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    pub fn edge(&self, edge_id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|edge| edge.id == edge_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransparencyLevel {
    BlackBox,
    PlanPreview,
    #[default]
    FullTransparency,
}

impl TransparencyLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::BlackBox => "black_box",
            Self::PlanPreview => "plan_preview",
            Self::FullTransparency => "full_transparency",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "black_box" | "blackbox" => Some(Self::BlackBox),
            "plan_preview" | "preview" => Some(Self::PlanPreview),
            "full_transparency" | "full" => Some(Self::FullTransparency),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalityMode {
    #[default]
    Multimodal,
    TextImage,
    VoiceOnly,
}

impl ModalityMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Multimodal => "multimodal",
            Self::TextImage => "text_image",
            Self::VoiceOnly => "voice_only",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "multimodal" => Some(Self::Multimodal),
            "text_image" => Some(Self::TextImage),
            "voice_only" | "voice" => Some(Self::VoiceOnly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
    Auto,
}

impl ThemeMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
            Self::Auto => "auto",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Zh,
    Bg,
    Ar,
}

impl Language {
    pub fn label(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
            Self::Bg => "bg",
            Self::Ar => "ar",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "zh" => Some(Self::Zh),
            "bg" => Some(Self::Bg),
            "ar" => Some(Self::Ar),
            _ => None,
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub transparency: TransparencyLevel,
    pub modality: ModalityMode,
    pub theme: ThemeMode,
    pub language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Chat,
    Agents,
    History,
}

impl Tab {
    pub fn label(self) -> &'static str {
        match self {
            Self::Chat => "Chat",
            Self::Agents => "Agents",
            Self::History => "History",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UiState {
    pub tab: Tab,
    pub expanded_graph: bool,
    pub image_preview: Option<String>,
}

/// Execution runs are numbered so that records from a superseded stream can
/// be told apart from the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionTracker {
    pub next_run_id: u64,
    pub active_run: Option<u64>,
}

impl ExecutionTracker {
    /// Allocates the next run id and makes it the active run.
    pub fn start_run(&mut self) -> u64 {
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        self.active_run = Some(run_id);
        run_id
    }
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self {
            next_run_id: 1,
            active_run: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub messages: Vec<ChatMessage>,
    pub current_plan: Option<TaskPlan>,
    pub graph_state: Option<ExecutionGraphState>,
    pub preferences: Preferences,
    /// Gate decision captured when the current plan was proposed.
    pub plan_disclosure: Option<Disclosure>,
    pub is_loading: bool,
    pub execution: ExecutionTracker,
    pub history: ConversationArchive,
    pub viewing: Option<String>,
    pub agents: Vec<AgentRecord>,
    pub ui: UiState,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            current_plan: None,
            graph_state: None,
            preferences: Preferences::default(),
            plan_disclosure: None,
            is_loading: false,
            execution: ExecutionTracker::default(),
            history: ConversationArchive::default(),
            viewing: None,
            agents: Vec::new(),
            ui: UiState::default(),
        }
    }

    /// Rebuilds the live session from the snapshots written by the
    /// persistence subscriber. Nothing is considered in flight after a restart.
    pub fn restore(session: Option<PersistedSession>, conversations: Vec<Conversation>) -> Self {
        let mut state = Self::new();
        state.history = ConversationArchive::from_entries(conversations);
        let Some(session) = session else {
            return state;
        };

        state.preferences = Preferences {
            transparency: session.transparency_level,
            modality: session.modality_mode,
            theme: session.theme_mode,
            language: session.language,
        };
        state.messages = session.messages;
        // Snapshots without a recorded decision keep the plan hidden rather
        // than applying whatever level is selected now.
        state.plan_disclosure = session.current_plan.as_ref().map(|_| {
            session
                .plan_disclosure
                .unwrap_or_else(|| disclosure_for(TransparencyLevel::BlackBox))
        });
        state.current_plan = session.current_plan;
        state.graph_state = session.graph_state;
        state
    }

    pub fn snapshot(&self) -> PersistedSession {
        PersistedSession {
            version: SNAPSHOT_VERSION,
            messages: self.messages.clone(),
            current_plan: self.current_plan.clone(),
            graph_state: self.graph_state.clone(),
            plan_disclosure: self.plan_disclosure,
            transparency_level: self.preferences.transparency,
            modality_mode: self.preferences.modality,
            theme_mode: self.preferences.theme,
            language: self.preferences.language,
        }
    }

    pub fn is_executing(&self) -> bool {
        self.execution.active_run.is_some()
    }

    /// Disclosure for the current plan, or for whatever the next plan would
    /// get when none is active.
    pub fn active_disclosure(&self) -> Disclosure {
        self.plan_disclosure
            .unwrap_or_else(|| disclosure_for(self.preferences.transparency))
    }

    /// Current plan with step status and result read from the graph nodes of
    /// the same id. The graph is the only place step progress is recorded.
    pub fn plan_view(&self) -> Option<TaskPlan> {
        self.current_plan
            .as_ref()
            .map(|plan| project_plan(plan, self.graph_state.as_ref()))
    }

    pub fn step_status(&self, step_id: &str) -> Option<StepStatus> {
        self.plan_view()?
            .steps
            .into_iter()
            .find(|step| step.id == step_id)
            .map(|step| step.status)
    }

    /// Plan as the transparency gate allows it to be rendered.
    pub fn visible_plan(&self) -> Option<TaskPlan> {
        if self.active_disclosure().show_plan {
            self.plan_view()
        } else {
            None
        }
    }

    /// Live graph as the transparency gate allows it to be rendered.
    pub fn visible_graph(&self) -> Option<&ExecutionGraphState> {
        if self.active_disclosure().show_graph {
            self.graph_state.as_ref()
        } else {
            None
        }
    }

    pub fn viewed_conversation(&self) -> Option<&Conversation> {
        self.viewing
            .as_deref()
            .and_then(|id| self.history.get(id))
    }

    pub fn last_assistant_message(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == MessageRole::Assistant)
    }
}

pub fn project_plan(plan: &TaskPlan, graph: Option<&ExecutionGraphState>) -> TaskPlan {
    let mut projected = plan.clone();
    let Some(graph) = graph else {
        return projected;
    };
    for step in projected.steps.iter_mut() {
        let Some(node) = graph.node(&step.id) else {
            continue;
        };
        if let Some(status) = StepStatus::from_node(node.status) {
            step.status = status;
        }
        if node.result.is_some() {
            step.result = node.result.clone();
        }
    }
    projected
}
