use crate::model::game_spec::{Component, GameSpec};
use crate::model::recovery::{Outcome, Recovery};
use crate::ui::settings::AppSettings;

/// Monotonic id attached to every command so late responses can be told
/// apart from the one the user is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn next(self) -> Self {
        RequestId(self.0 + 1)
    }
}

pub enum EngineCommand {
    Generate {
        request_id: RequestId,
        prompt: String,
    },
    Regenerate {
        request_id: RequestId,
        component: Component,
        current: Box<GameSpec>,
        prompt: String,
    },
    SuggestNames {
        request_id: RequestId,
        level_index: usize,
        theme: String,
        prompt: String,
        count: usize,
    },
    UpdateSettings(AppSettings),
}

pub enum EngineResponse {
    Generated {
        request_id: RequestId,
        recovery: Recovery,
    },
    Regenerated {
        request_id: RequestId,
        component: Component,
        spec: Box<GameSpec>,
        outcome: Outcome,
        warning: Option<String>,
    },
    NamesSuggested {
        request_id: RequestId,
        level_index: usize,
        names: Vec<String>,
    },
    Failed {
        request_id: RequestId,
        error: String,
    },
}

impl EngineResponse {
    pub fn request_id(&self) -> RequestId {
        match self {
            EngineResponse::Generated { request_id, .. }
            | EngineResponse::Regenerated { request_id, .. }
            | EngineResponse::NamesSuggested { request_id, .. }
            | EngineResponse::Failed { request_id, .. } => *request_id,
        }
    }
}
