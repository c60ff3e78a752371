use eframe::egui;

use super::app::{MyApp, SpecTab, Theme};
use crate::model::game_spec::{Character, GameSpec, Item, Level};
use crate::model::recovery::Outcome;

pub fn draw_center_panel(ctx: &egui::Context, app: &mut MyApp) {
    let input_id = egui::Id::new("prompt_input_box");

    // ---------- Prompt bar ----------
    egui::TopBottomPanel::top("prompt_bar").show(ctx, |ui| {
        let mut generate_now = false;
        let idle = !app.ui.is_busy();

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            let response = ui.add_sized(
                [ui.available_width() - 100.0, 48.0],
                egui::TextEdit::multiline(&mut app.ui.input_text)
                    .id(input_id)
                    .hint_text("Describe a game idea…"),
            );

            // Enter vs Shift+Enter
            if response.has_focus()
                && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift)
            {
                generate_now = true;
            }

            if ui.add_enabled(idle, egui::Button::new("Generate")).clicked() {
                generate_now = true;
            }
            if !idle {
                ui.spinner();
            }
        });
        ui.add_space(4.0);

        if generate_now && idle {
            app.generate();
        }
    });

    // ---------- Spec view ----------
    egui::CentralPanel::default().show(ctx, |ui| {
        let idle = !app.ui.is_busy();
        let Some(spec) = app.ui.spec.as_ref() else {
            ui.centered_and_justified(|ui| {
                ui.label("Describe a game idea and press Generate.");
            });
            return;
        };

        if spec.used_fallback {
            draw_fallback_banner(ui, spec, &app.theme);
        } else if app.ui.outcome == Some(Outcome::Repaired) {
            ui.small("The model output was malformed and has been repaired.");
        }

        ui.horizontal(|ui| {
            for tab in SpecTab::ALL {
                ui.selectable_value(&mut app.ui.tab, tab, tab.label());
            }
        });
        ui.separator();

        let mut suggest_for = None;
        egui::ScrollArea::vertical().show(ui, |ui| match app.ui.tab {
            SpecTab::Overview => draw_overview(ui, spec),
            SpecTab::Characters => spec.characters.iter().for_each(|c| draw_character(ui, c)),
            SpecTab::Items => spec.items.iter().for_each(|i| draw_item(ui, i)),
            SpecTab::Levels => {
                for (index, level) in spec.levels.iter().enumerate() {
                    if draw_level(ui, level, idle) {
                        suggest_for = Some(index);
                    }
                }
            }
            SpecTab::Code => draw_code(ui, spec),
            SpecTab::RawOutput => match spec.raw_model_output.as_deref() {
                Some(raw) => read_only(ui, raw),
                None => {
                    ui.label("No raw output kept for this spec.");
                }
            },
        });

        if let Some(index) = suggest_for {
            app.suggest_enemies(index);
        }
    });
}

fn draw_fallback_banner(ui: &mut egui::Ui, spec: &GameSpec, theme: &Theme) {
    ui.group(|ui| {
        ui.colored_label(
            theme.warning,
            "⚠ The AI output could not be used. Showing a fallback prototype.",
        );
        if let Some(reason) = spec.fallback_reason.as_deref() {
            ui.label(reason);
        }
        ui.small("See the Raw output tab for what the model returned.");
    });
    ui.add_space(6.0);
}

fn draw_overview(ui: &mut egui::Ui, spec: &GameSpec) {
    ui.heading(&spec.name);
    ui.label(&spec.description);
    ui.add_space(6.0);

    egui::Grid::new("overview_grid").num_columns(2).show(ui, |ui| {
        ui.strong("Genre");
        ui.label(&spec.genre);
        ui.end_row();
        ui.strong("Theme");
        ui.label(&spec.theme);
        ui.end_row();
        ui.strong("Difficulty");
        ui.label(spec.difficulty.label());
        ui.end_row();
        ui.strong("Controls");
        ui.label(format!(
            "{} / {} / {}",
            spec.controls.movement, spec.controls.action, spec.controls.special
        ));
        ui.end_row();
    });

    ui.collapsing("Rules", |ui| {
        ui.label(&spec.rules);
    });
    list(ui, "Mechanics", &spec.mechanics);
    list(ui, "Image prompts", &spec.image_prompts);
    list(ui, "Sound prompts", &spec.sound_prompts);
}

fn draw_character(ui: &mut egui::Ui, c: &Character) {
    ui.group(|ui| {
        ui.strong(format!("{} ({})", c.name, c.role));
        if !c.description.is_empty() {
            ui.label(&c.description);
        }
        ui.small(format!(
            "HP {} · ATK {} · DEF {} · SPD {}",
            c.stats.health, c.stats.attack, c.stats.defense, c.stats.speed
        ));
        list(ui, "Abilities", &c.abilities);
    });
}

fn draw_item(ui: &mut egui::Ui, item: &Item) {
    ui.group(|ui| {
        ui.strong(format!("{} [{}]", item.name, item.rarity));
        ui.small(&item.item_type);
        ui.label(&item.description);
        if !item.effect.is_empty() {
            ui.label(format!("Effect: {}", item.effect));
        }
    });
}

/// Returns true when new enemy names were requested for this level.
fn draw_level(ui: &mut egui::Ui, level: &Level, idle: bool) -> bool {
    let mut suggest = false;
    ui.group(|ui| {
        ui.horizontal(|ui| {
            ui.strong(&level.name);
            if !level.environment.is_empty() {
                ui.small(&level.environment);
            }
        });
        ui.label(&level.description);

        list(ui, "Objectives", &level.objectives);
        ui.horizontal(|ui| {
            ui.label(format!("Enemies: {}", display_list(&level.enemies)));
            suggest = ui
                .add_enabled(idle, egui::Button::new("Suggest enemies"))
                .clicked();
        });
        ui.label(format!("Items: {}", display_list(&level.items)));
    });
    suggest
}

fn draw_code(ui: &mut egui::Ui, spec: &GameSpec) {
    read_only(ui, &spec.code);

    ui.collapsing("HTML structure", |ui| read_only(ui, &spec.html_structure));
    ui.collapsing("Styles", |ui| read_only(ui, &spec.styles));
}

fn read_only(ui: &mut egui::Ui, text: &str) {
    let mut text = text;
    ui.add(
        egui::TextEdit::multiline(&mut text)
            .code_editor()
            .desired_width(f32::INFINITY),
    );
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn list(ui: &mut egui::Ui, label: &str, items: &[String]) {
    ui.collapsing(label, |ui| {
        if items.is_empty() {
            ui.label("None");
        } else {
            for i in items {
                ui.label(format!("• {i}"));
            }
        }
    });
}
