use super::events::ExecutionEvent;
use super::records::AgentRecord;
use super::records::ChatReply;
use super::state::InputModality;
use super::state::Language;
use super::state::ModalityMode;
use super::state::Tab;
use super::state::ThemeMode;
use super::state::TransparencyLevel;

#[derive(Debug, Clone)]
pub enum AppAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

/// One chat turn as typed, spoken or photographed by the user. Media is
/// carried base64-encoded, as the plan request sends it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatSubmission {
    pub text: String,
    pub image_base64: Option<String>,
    pub audio_base64: Option<String>,
    pub modality: InputModality,
}

impl ChatSubmission {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum UserAction {
    SubmitChat(ChatSubmission),
    ExecutePlan,
    RejectPlan,
    ResolveCheckpoint { approved: bool },
    SetTransparency(TransparencyLevel),
    SetModalityMode(ModalityMode),
    SetThemeMode(ThemeMode),
    SetLanguage(Language),
    SelectTab(Tab),
    ToggleExpandedGraph,
    SetImagePreview(Option<String>),
    StartNewConversation,
    OpenConversation { id: String },
    CloseConversation,
    DeleteConversation { id: String },
    ClearAllHistory,
}

/// Results of effects coming back into the state. Execution records carry the
/// run they were read for; records of any other run are dropped.
#[derive(Debug, Clone)]
pub enum RuntimeAction {
    ChatResponseReceived(ChatReply),
    ChatRequestFailed { reason: String },
    ExecutionEvent { run_id: u64, event: ExecutionEvent },
    ExecutionStreamClosed { run_id: u64 },
    ExecutionRequestFailed { run_id: u64, reason: String },
    AgentsLoaded(Vec<AgentRecord>),
}
