use thiserror::Error;

use crate::model::game_spec::GameSpec;

/// Why the pipeline gave up on the model output. The `Display` text is what
/// ends up in `GameSpec::fallback_reason`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackReason {
    #[error("AI output did not contain a JSON object")]
    NoCandidate,

    #[error("AI output could not be repaired into valid JSON")]
    RepairExhausted,

    #[error("AI output was valid JSON but not an object")]
    NotAnObject,

    #[error("AI output had no usable game name")]
    MissingName,

    #[error("AI output had no usable game code")]
    MissingCode,

    #[error("AI output did not contain the requested {0}")]
    MissingComponent(&'static str),
}

impl FallbackReason {
    /// Validation failures say more about the output than a failed repair.
    pub fn is_shape_problem(&self) -> bool {
        matches!(
            self,
            FallbackReason::NotAnObject
                | FallbackReason::MissingName
                | FallbackReason::MissingCode
                | FallbackReason::MissingComponent(_)
        )
    }
}

/// Terminal state of one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Direct,
    Repaired,
    Fallback,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Direct => "parsed",
            Outcome::Repaired => "repaired",
            Outcome::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recovery {
    pub spec: GameSpec,
    pub outcome: Outcome,
}
