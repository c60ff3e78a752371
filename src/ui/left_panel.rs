use eframe::egui;

use super::app::MyApp;
use super::settings::AppSettings;

pub fn draw_left_panel(ctx: &egui::Context, app: &mut MyApp) {
    egui::SidePanel::left("left")
        .resizable(false)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Settings");
            ui.separator();

            let mut save = false;
            egui::ScrollArea::vertical().show(ui, |ui| {
                save = draw_settings(ui, &mut app.ui.settings);
            });

            if save {
                app.save_settings();
            }
        });
}

/// Returns true when the user asked to save.
fn draw_settings(ui: &mut egui::Ui, s: &mut AppSettings) -> bool {
    ui.label("Endpoint");
    ui.text_edit_singleline(&mut s.endpoint);

    ui.label("Model");
    ui.text_edit_singleline(&mut s.model);

    ui.collapsing("API key", |ui| {
        ui.label("Environment variable");
        ui.text_edit_singleline(&mut s.api_key_env);

        ui.label("Inline key (optional)");
        let mut key = s.api_key.clone().unwrap_or_default();
        if ui
            .add(egui::TextEdit::singleline(&mut key).password(true))
            .changed()
        {
            s.api_key = if key.trim().is_empty() { None } else { Some(key) };
        }

        if s.resolve_api_key().is_some() {
            ui.small("Key found");
        } else {
            ui.small("No key set (only local endpoints will work)");
        }
    });

    ui.separator();

    ui.label("Max tokens");
    ui.add(egui::DragValue::new(&mut s.max_tokens).range(256..=32768).speed(64));

    ui.label("Temperature");
    ui.add(egui::Slider::new(&mut s.temperature, 0.0..=1.5));

    ui.label("Top p");
    ui.add(egui::Slider::new(&mut s.top_p, 0.05..=1.0));

    ui.label("Timeout (seconds)");
    ui.add(egui::DragValue::new(&mut s.timeout_secs).range(10..=600));

    ui.separator();

    ui.label("UI Scale");
    ui.add(egui::Slider::new(&mut s.ui_scale, 0.75..=2.0));

    ui.separator();
    ui.button("Save").clicked()
}
