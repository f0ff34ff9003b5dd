use agentflow_core::GraphRecord;
use agentflow_core::InputModality;
use agentflow_core::PlanRecord;
use agentflow_core::PlanRequest;
use serde::Deserialize;
use serde::Serialize;

/// `POST /api/chat` body. Absent media is sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub image_base64: Option<String>,
    pub audio_base64: Option<String>,
    pub input_modality: InputModality,
}

impl From<PlanRequest> for ChatRequest {
    fn from(request: PlanRequest) -> Self {
        Self {
            message: request.message,
            image_base64: request.image_base64,
            audio_base64: request.audio_base64,
            input_modality: request.modality,
        }
    }
}

/// `POST /api/execute` body. The response is an event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub plan: PlanRecord,
    pub graph: GraphRecord,
}

/// `POST /api/approve/{step_id}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
    #[serde(default)]
    pub comment: String,
}
