use eframe::egui;

use super::app::MyApp;
use crate::model::game_spec::Component;

pub fn draw_right_panel(ctx: &egui::Context, app: &mut MyApp) {
    egui::SidePanel::right("right")
        .resizable(true)
        .default_width(300.0)
        .min_width(240.0)
        .show(ctx, |ui| {
            let has_spec = app.ui.spec.is_some();
            let idle = !app.ui.is_busy();

            ui.heading("Regenerate");
            let mut regenerate = None;
            for component in Component::ALL {
                if ui
                    .add_enabled(has_spec && idle, egui::Button::new(component.label()))
                    .clicked()
                {
                    regenerate = Some(component);
                }
            }
            if let Some(component) = regenerate {
                app.regenerate(component);
            }

            ui.separator();
            if ui
                .add_enabled(has_spec, egui::Button::new("Export zip…"))
                .clicked()
            {
                app.export_zip();
            }

            ui.separator();
            ui.heading("Activity");

            egui::ScrollArea::vertical()
                .stick_to_bottom(app.ui.should_auto_scroll)
                .show(ui, |ui| {
                    for msg in &app.ui.messages {
                        app.draw_message(ui, msg);
                    }
                });
        });
}
