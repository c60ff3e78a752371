use std::sync::mpsc::{Receiver, Sender};

use log::{error, info, warn};

use crate::engine::llm_client::{self, ChatBackend, HttpBackend, Sampling};
use crate::engine::name_cache::NameCache;
use crate::engine::pipeline;
use crate::engine::prompt_builder::PromptBuilder;
use crate::engine::protocol::{EngineCommand, EngineResponse, RequestId};
use crate::model::game_spec::{Component, GameSpec};
use crate::model::recovery::Outcome;
use crate::ui::settings::AppSettings;

/// Background worker: receives commands from the UI, talks to the model and
/// runs the recovery pipeline. Network calls only ever block this thread.
pub struct Engine {
    rx: Receiver<EngineCommand>,
    tx: Sender<EngineResponse>,
    settings: AppSettings,
    backend: Box<dyn ChatBackend>,
    names: NameCache,
}

impl Engine {
    pub fn new(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineResponse>,
        settings: AppSettings,
    ) -> Self {
        let backend = Box::new(HttpBackend::new(settings.clone()));
        Self::with_backend(rx, tx, settings, backend)
    }

    pub fn with_backend(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineResponse>,
        settings: AppSettings,
        backend: Box<dyn ChatBackend>,
    ) -> Self {
        Self {
            rx,
            tx,
            settings,
            backend,
            names: NameCache::default(),
        }
    }

    pub fn run(&mut self) {
        while let Ok(cmd) = self.rx.recv() {
            if let Some(resp) = self.handle(cmd) {
                if self.tx.send(resp).is_err() {
                    break;
                }
            }
        }
        info!("engine stopped");
    }

    pub fn handle(&mut self, cmd: EngineCommand) -> Option<EngineResponse> {
        match cmd {
            EngineCommand::Generate { request_id, prompt } => {
                Some(self.generate(request_id, &prompt))
            }

            EngineCommand::Regenerate {
                request_id,
                component,
                current,
                prompt,
            } => Some(self.regenerate(request_id, component, *current, &prompt)),

            EngineCommand::SuggestNames {
                request_id,
                level_index,
                theme,
                prompt,
                count,
            } => {
                let names = self.suggest_names(&theme, &prompt, count);
                Some(EngineResponse::NamesSuggested {
                    request_id,
                    level_index,
                    names,
                })
            }

            EngineCommand::UpdateSettings(settings) => {
                self.backend.reconfigure(&settings);
                self.settings = settings;
                info!("engine settings updated (model {})", self.settings.model);
                None
            }
        }
    }

    fn sampling(&self, temperature: f32) -> Sampling {
        Sampling {
            max_tokens: self.settings.max_tokens,
            temperature,
        }
    }

    fn generate(&self, request_id: RequestId, prompt: &str) -> EngineResponse {
        info!("request {}: generating game", request_id.0);
        let messages = PromptBuilder::game_messages(prompt);

        match self
            .backend
            .complete(&messages, self.sampling(self.settings.temperature))
        {
            Ok(text) => EngineResponse::Generated {
                request_id,
                recovery: pipeline::recover(&text, prompt),
            },
            Err(e) => {
                error!("request {}: generation failed: {e}", request_id.0);
                EngineResponse::Failed {
                    request_id,
                    error: format!("Failed to generate game: {e}"),
                }
            }
        }
    }

    fn regenerate(
        &self,
        request_id: RequestId,
        component: Component,
        current: GameSpec,
        prompt: &str,
    ) -> EngineResponse {
        info!("request {}: regenerating {}", request_id.0, component.label());
        let messages = PromptBuilder::regenerate_messages(component, &current, prompt);
        // Slightly hotter than a fresh generation, for variety.
        let temperature = (self.settings.temperature + 0.1).min(2.0);

        let text = match self.backend.complete(&messages, self.sampling(temperature)) {
            Ok(text) => text,
            Err(e) => {
                error!("request {}: regeneration failed: {e}", request_id.0);
                return EngineResponse::Failed {
                    request_id,
                    error: format!("Failed to regenerate {}: {e}", component.label()),
                };
            }
        };

        match pipeline::recover_component(&text, &current, component) {
            Ok((spec, outcome)) => EngineResponse::Regenerated {
                request_id,
                component,
                spec: Box::new(spec),
                outcome,
                warning: None,
            },
            Err(reason) => {
                warn!("request {}: keeping previous {}: {reason}", request_id.0, component.label());
                EngineResponse::Regenerated {
                    request_id,
                    component,
                    spec: Box::new(current),
                    outcome: Outcome::Fallback,
                    warning: Some(format!("{} not updated: {reason}", component.label())),
                }
            }
        }
    }

    fn suggest_names(&mut self, theme: &str, prompt: &str, count: usize) -> Vec<String> {
        let backend = self.backend.as_ref();
        let query = format!("Theme: {theme}. {prompt}");
        self.names.get_or_fetch(theme, prompt, count, || {
            llm_client::generate_list(backend, &query, count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::llm_client::{ChatMessage, ClientError};
    use crate::model::llm_decode::decode_game_spec;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};

    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String, ClientError>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ChatBackend for ScriptedBackend {
        fn complete(&self, _: &[ChatMessage], _: Sampling) -> Result<String, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ClientError::EmptyResponse))
        }
    }

    fn engine_with(
        replies: Vec<Result<String, ClientError>>,
    ) -> (Engine, Arc<AtomicUsize>, mpsc::Sender<EngineCommand>, mpsc::Receiver<EngineResponse>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = ScriptedBackend {
            replies: Mutex::new(replies.into()),
            calls: Arc::clone(&calls),
        };
        let engine = Engine::with_backend(cmd_rx, resp_tx, AppSettings::default(), Box::new(backend));
        (engine, calls, cmd_tx, resp_rx)
    }

    fn base_spec() -> GameSpec {
        decode_game_spec(&serde_json::json!({"name": "Base", "code": "old();"})).unwrap()
    }

    #[test]
    fn generate_runs_the_pipeline() {
        let (mut engine, _, _, _) = engine_with(vec![Ok(r#"{"name":"Foo","code":"x=1;"}"#.into())]);
        let resp = engine.handle(EngineCommand::Generate {
            request_id: RequestId(1),
            prompt: "foo".into(),
        });

        let Some(EngineResponse::Generated { request_id, recovery }) = resp else {
            panic!("expected Generated");
        };
        assert_eq!(request_id, RequestId(1));
        assert_eq!(recovery.outcome, Outcome::Direct);
        assert_eq!(recovery.spec.name, "Foo");
    }

    #[test]
    fn unusable_output_still_generates_a_spec() {
        let (mut engine, _, _, _) = engine_with(vec![Ok("I cannot help with that.".into())]);
        let resp = engine.handle(EngineCommand::Generate {
            request_id: RequestId(2),
            prompt: "foo".into(),
        });

        let Some(EngineResponse::Generated { recovery, .. }) = resp else {
            panic!("expected Generated");
        };
        assert_eq!(recovery.outcome, Outcome::Fallback);
        assert!(recovery.spec.used_fallback);
    }

    #[test]
    fn transport_errors_propagate() {
        let (mut engine, _, _, _) = engine_with(vec![Err(ClientError::Api {
            status: 429,
            message: "rate limited".into(),
        })]);
        let resp = engine.handle(EngineCommand::Generate {
            request_id: RequestId(3),
            prompt: "foo".into(),
        });

        let Some(EngineResponse::Failed { request_id, error }) = resp else {
            panic!("expected Failed");
        };
        assert_eq!(request_id, RequestId(3));
        assert!(error.contains("429"));
        assert!(error.contains("rate limited"));
    }

    #[test]
    fn regenerate_merges_component() {
        let reply = r#"{"characters":[{"name":"Rogue","type":"player"}]}"#;
        let (mut engine, _, _, _) = engine_with(vec![Ok(reply.into())]);
        let resp = engine.handle(EngineCommand::Regenerate {
            request_id: RequestId(4),
            component: Component::Characters,
            current: Box::new(base_spec()),
            prompt: "heist".into(),
        });

        let Some(EngineResponse::Regenerated { spec, outcome, warning, .. }) = resp else {
            panic!("expected Regenerated");
        };
        assert_eq!(outcome, Outcome::Direct);
        assert_eq!(warning, None);
        assert_eq!(spec.name, "Base");
        assert_eq!(spec.characters[0].name, "Rogue");
    }

    #[test]
    fn failed_regeneration_keeps_previous_spec() {
        let (mut engine, _, _, _) = engine_with(vec![Ok("no json here".into())]);
        let resp = engine.handle(EngineCommand::Regenerate {
            request_id: RequestId(5),
            component: Component::Code,
            current: Box::new(base_spec()),
            prompt: "heist".into(),
        });

        let Some(EngineResponse::Regenerated { spec, outcome, warning, .. }) = resp else {
            panic!("expected Regenerated");
        };
        assert_eq!(outcome, Outcome::Fallback);
        assert_eq!(*spec, base_spec());
        assert!(warning.unwrap().starts_with("Game code not updated"));
    }

    #[test]
    fn suggested_names_are_cached() {
        let (mut engine, calls, _, _) = engine_with(vec![Ok("Imp, Ghoul, Wraith".into())]);
        for id in 0..2 {
            let resp = engine.handle(EngineCommand::SuggestNames {
                request_id: RequestId(id),
                level_index: 0,
                theme: "crypt".into(),
                prompt: "undead".into(),
                count: 3,
            });
            let Some(EngineResponse::NamesSuggested { names, .. }) = resp else {
                panic!("expected NamesSuggested");
            };
            assert_eq!(names, vec!["Imp", "Ghoul", "Wraith"]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn settings_update_has_no_response() {
        let (mut engine, _, _, _) = engine_with(Vec::new());
        let settings = AppSettings {
            model: "local-model".into(),
            ..Default::default()
        };
        assert!(engine.handle(EngineCommand::UpdateSettings(settings)).is_none());
        assert_eq!(engine.settings.model, "local-model");
    }

    #[test]
    fn run_loop_stops_when_ui_hangs_up() {
        let (mut engine, _, cmd_tx, resp_rx) =
            engine_with(vec![Ok(r#"{"name":"Loop","code":"c"}"#.into())]);
        cmd_tx
            .send(EngineCommand::Generate {
                request_id: RequestId(9),
                prompt: "p".into(),
            })
            .unwrap();
        drop(cmd_tx);

        engine.run();

        let resp = resp_rx.recv().unwrap();
        assert_eq!(resp.request_id(), RequestId(9));
    }
}
