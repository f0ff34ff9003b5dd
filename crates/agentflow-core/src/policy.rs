use serde::Deserialize;
use serde::Serialize;

use super::state::InputModality;
use super::state::ModalityMode;
use super::state::TransparencyLevel;

/// What the user gets to see of a plan, and whether it runs without approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    pub show_plan: bool,
    pub show_graph: bool,
    pub auto_execute: bool,
}

pub fn disclosure_for(level: TransparencyLevel) -> Disclosure {
    match level {
        TransparencyLevel::BlackBox => Disclosure {
            show_plan: false,
            show_graph: false,
            auto_execute: true,
        },
        TransparencyLevel::PlanPreview => Disclosure {
            show_plan: true,
            show_graph: false,
            auto_execute: false,
        },
        TransparencyLevel::FullTransparency => Disclosure {
            show_plan: true,
            show_graph: true,
            auto_execute: false,
        },
    }
}

pub fn modality_permitted(mode: ModalityMode, modality: InputModality) -> bool {
    match mode {
        ModalityMode::Multimodal => true,
        ModalityMode::TextImage => modality != InputModality::Voice,
        ModalityMode::VoiceOnly => modality == InputModality::Voice,
    }
}
