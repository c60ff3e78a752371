use log::{debug, info};
use serde_json::Value;

use crate::engine::extract;
use crate::engine::repair::{self, RepairStage};
use crate::model::game_spec::{Component, GameSpec};
use crate::model::llm_decode;
use crate::model::recovery::{FallbackReason, Outcome, Recovery};

/// Raw completion text in, renderable GameSpec out. Never fails: anything
/// that can't be recovered becomes a fallback spec holding the raw text.
pub fn recover(raw: &str, prompt: &str) -> Recovery {
    let found = recover_with(raw, |value| {
        llm_decode::decode_game_spec(value).map(|_| value.clone())
    });

    match found {
        Ok((value, outcome)) => {
            let spec = llm_decode::normalize(Ok(&value), prompt, raw);
            info!("recovered game '{}' ({})", spec.name, outcome.label());
            Recovery { spec, outcome }
        }
        Err(reason) => Recovery {
            spec: llm_decode::normalize(Err(reason), prompt, raw),
            outcome: Outcome::Fallback,
        },
    }
}

/// Recover a single regenerated component and merge it into `base`.
/// On failure `base` is left untouched and the reason is returned.
pub fn recover_component(
    raw: &str,
    base: &GameSpec,
    component: Component,
) -> Result<(GameSpec, Outcome), FallbackReason> {
    recover_with(raw, |value| llm_decode::merge_component(base, component, value))
}

/// Candidates are tried longest first; the first one that repairs and
/// decodes wins.
fn recover_with<T, F>(raw: &str, decode: F) -> Result<(T, Outcome), FallbackReason>
where
    F: Fn(&Value) -> Result<T, FallbackReason>,
{
    let candidates = extract::candidates(raw);
    if candidates.is_empty() {
        return Err(FallbackReason::NoCandidate);
    }

    let mut reason = FallbackReason::RepairExhausted;
    for candidate in &candidates {
        let repaired = match repair::repair(candidate) {
            Ok(repaired) => repaired,
            Err(e) => {
                debug!("candidate of {} bytes not repairable: {e}", candidate.len());
                continue;
            }
        };

        match decode(&repaired.value) {
            Ok(decoded) => {
                let outcome = match repaired.stage {
                    RepairStage::AsIs => Outcome::Direct,
                    stage => {
                        debug!("candidate needed repair: {stage:?}");
                        Outcome::Repaired
                    }
                };
                return Ok((decoded, outcome));
            }
            Err(e) => {
                debug!("candidate rejected: {e}");
                if e.is_shape_problem() {
                    reason = e;
                }
            }
        }
    }

    Err(reason)
}
