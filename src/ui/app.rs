use eframe::egui;
use log::{debug, error, info};
use std::sync::mpsc;
use std::time::Duration;

use crate::engine::engine::Engine;
use crate::engine::export;
use crate::engine::protocol::{EngineCommand, EngineResponse, RequestId};
use crate::model::game_spec::{Component, GameSpec};
use crate::model::message::Message;
use crate::model::recovery::Outcome;
use crate::ui::center_panel::draw_center_panel;
use crate::ui::left_panel::draw_left_panel;
use crate::ui::right_panel::draw_right_panel;
use crate::ui::settings::AppSettings;
use crate::ui::settings_io;

pub const SUGGESTED_ENEMY_COUNT: usize = 5;

/* =========================
   Tabs
   ========================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecTab {
    #[default]
    Overview,
    Characters,
    Items,
    Levels,
    Code,
    RawOutput,
}

impl SpecTab {
    pub const ALL: [SpecTab; 6] = [
        SpecTab::Overview,
        SpecTab::Characters,
        SpecTab::Items,
        SpecTab::Levels,
        SpecTab::Code,
        SpecTab::RawOutput,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SpecTab::Overview => "Overview",
            SpecTab::Characters => "Characters",
            SpecTab::Items => "Items",
            SpecTab::Levels => "Levels",
            SpecTab::Code => "Code",
            SpecTab::RawOutput => "Raw output",
        }
    }
}

/* =========================
   UI State
   ========================= */

pub struct UiState {
    pub input_text: String,
    /// Concept behind the spec on screen; reused for regeneration.
    pub concept: String,

    pub spec: Option<GameSpec>,
    pub outcome: Option<Outcome>,
    pub messages: Vec<Message>,

    pub tab: SpecTab,
    pub settings: AppSettings,
    pub should_auto_scroll: bool,

    latest_request: RequestId,
    pending: Option<RequestId>,
}

impl UiState {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            input_text: String::new(),
            concept: String::new(),
            spec: None,
            outcome: None,
            messages: Vec::new(),
            tab: SpecTab::default(),
            settings,
            should_auto_scroll: false,
            latest_request: RequestId::default(),
            pending: None,
        }
    }

    /// Allocates the id for a new request. Any response carrying an older id
    /// is ignored from now on.
    pub fn issue_request(&mut self) -> RequestId {
        self.latest_request = self.latest_request.next();
        self.pending = Some(self.latest_request);
        self.latest_request
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn push_message(&mut self, msg: Message) {
        self.messages.push(msg);
        self.should_auto_scroll = true;
    }

    pub fn apply_response(&mut self, resp: EngineResponse) {
        let id = resp.request_id();
        if id != self.latest_request {
            debug!("dropping stale response {} (latest {})", id.0, self.latest_request.0);
            return;
        }
        self.pending = None;

        match resp {
            EngineResponse::Generated { recovery, .. } => {
                let spec = recovery.spec;
                let msg = match recovery.outcome {
                    Outcome::Direct => Message::System(format!("Generated \"{}\"", spec.name)),
                    Outcome::Repaired => Message::Warning(format!(
                        "Generated \"{}\" from malformed output that had to be repaired",
                        spec.name
                    )),
                    Outcome::Fallback => Message::Warning(format!(
                        "Showing a fallback prototype: {}",
                        spec.fallback_reason.as_deref().unwrap_or("unknown reason")
                    )),
                };
                self.push_message(msg);
                self.outcome = Some(recovery.outcome);
                self.spec = Some(spec);
            }

            EngineResponse::Regenerated {
                component,
                spec,
                outcome,
                warning,
                ..
            } => {
                match warning {
                    // The previous spec came back unchanged, so its outcome stands.
                    Some(w) => self.push_message(Message::Warning(w)),
                    None => {
                        self.push_message(Message::System(format!(
                            "{} regenerated",
                            component.label()
                        )));
                        self.outcome = Some(outcome);
                    }
                }
                self.spec = Some(*spec);
            }

            EngineResponse::NamesSuggested {
                level_index, names, ..
            } => self.apply_enemy_names(level_index, names),

            EngineResponse::Failed { error, .. } => {
                self.push_message(Message::Error(error));
            }
        }
    }

    fn apply_enemy_names(&mut self, level_index: usize, names: Vec<String>) {
        if names.is_empty() {
            self.push_message(Message::Warning("No enemy names were suggested".into()));
            return;
        }

        let Some(current) = self.spec.as_ref() else {
            return;
        };
        let mut next = current.clone();
        let Some(level) = next.levels.get_mut(level_index) else {
            return;
        };

        level.enemies = names;
        let text = format!("New enemies for {}: {}", level.name, level.enemies.join(", "));
        self.spec = Some(next);
        self.push_message(Message::System(text));
    }
}

/* =========================
   Theme
   ========================= */

#[derive(Clone)]
pub struct Theme {
    pub user: egui::Color32,
    pub system: egui::Color32,
    pub warning: egui::Color32,
    pub error: egui::Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            user: egui::Color32::from_rgb(110, 160, 230),
            system: egui::Color32::from_rgb(170, 170, 170),
            warning: egui::Color32::from_rgb(230, 180, 60),
            error: egui::Color32::from_rgb(230, 90, 80),
        }
    }
}

/* =========================
   App
   ========================= */

pub struct MyApp {
    pub ui: UiState,
    pub theme: Theme,

    cmd_tx: mpsc::Sender<EngineCommand>,
    resp_rx: mpsc::Receiver<EngineResponse>,
}

impl MyApp {
    pub fn new(settings: AppSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let engine_settings = settings.clone();
        std::thread::spawn(move || {
            let mut engine = Engine::new(cmd_rx, resp_tx, engine_settings);
            engine.run();
        });

        Self {
            ui: UiState::new(settings),
            theme: Theme::default(),
            cmd_tx,
            resp_rx,
        }
    }

    pub fn send_command(&self, cmd: EngineCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            error!("engine thread is gone; command dropped");
        }
    }

    pub fn generate(&mut self) {
        let prompt = self.ui.input_text.trim().to_string();
        if prompt.is_empty() {
            return;
        }

        self.ui.push_message(Message::User(prompt.clone()));
        self.ui.concept = prompt.clone();
        let request_id = self.ui.issue_request();
        self.send_command(EngineCommand::Generate { request_id, prompt });
    }

    pub fn regenerate(&mut self, component: Component) {
        let Some(current) = self.ui.spec.clone() else {
            return;
        };

        self.ui.push_message(Message::User(format!("Regenerate {}", component.label())));
        let request_id = self.ui.issue_request();
        self.send_command(EngineCommand::Regenerate {
            request_id,
            component,
            current: Box::new(current),
            prompt: self.ui.concept.clone(),
        });
    }

    pub fn suggest_enemies(&mut self, level_index: usize) {
        let Some(spec) = self.ui.spec.as_ref() else {
            return;
        };
        let Some(level) = spec.levels.get(level_index) else {
            return;
        };

        let theme = spec.theme.clone();
        let prompt = format!(
            "Enemies for the level \"{}\" ({}) in a {} game",
            level.name, level.environment, spec.genre
        );

        let request_id = self.ui.issue_request();
        self.send_command(EngineCommand::SuggestNames {
            request_id,
            level_index,
            theme,
            prompt,
            count: SUGGESTED_ENEMY_COUNT,
        });
    }

    pub fn export_zip(&mut self) {
        let Some(spec) = self.ui.spec.as_ref() else {
            return;
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("Zip archive", &["zip"])
            .set_file_name(export::archive_name(spec))
            .save_file()
        else {
            return;
        };

        let msg = match export::export_to_path(spec, &path) {
            Ok(()) => Message::System(format!("Exported to {}", path.display())),
            Err(e) => {
                error!("export failed: {e:#}");
                Message::Error(format!("Export failed: {e:#}"))
            }
        };
        self.ui.push_message(msg);
    }

    pub fn save_settings(&mut self) {
        let msg = match settings_io::save_settings(&self.ui.settings) {
            Ok(()) => {
                info!("settings saved");
                Message::System("Settings saved".into())
            }
            Err(e) => Message::Error(format!("Could not save settings: {e:#}")),
        };
        self.send_command(EngineCommand::UpdateSettings(self.ui.settings.clone()));
        self.ui.push_message(msg);
    }

    pub fn draw_message(&self, ui: &mut egui::Ui, msg: &Message) {
        let (color, prefix) = match msg {
            Message::User(_) => (self.theme.user, "You: "),
            Message::System(_) => (self.theme.system, ""),
            Message::Warning(_) => (self.theme.warning, "⚠ "),
            Message::Error(_) => (self.theme.error, "❌ "),
        };
        ui.add_space(4.0);
        ui.colored_label(color, format!("{prefix}{}", msg.text()));
    }
}

/* =========================
   egui App
   ========================= */

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        ctx.set_pixels_per_point(self.ui.settings.ui_scale);

        while let Ok(resp) = self.resp_rx.try_recv() {
            self.ui.apply_response(resp);
        }

        draw_left_panel(ctx, self);
        draw_right_panel(ctx, self);
        draw_center_panel(ctx, self);

        self.ui.should_auto_scroll = false;

        // Responses arrive from another thread, so keep polling while waiting.
        if self.ui.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
