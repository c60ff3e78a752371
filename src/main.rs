use eframe::egui;
use idea_forge::ui;
use log::info;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = ui::settings_io::load_settings();
    info!("using model {} at {}", settings.model, settings.endpoint);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Idea Forge",
        options,
        Box::new(|_cc| Ok(Box::new(ui::app::MyApp::new(settings)))),
    )
}
