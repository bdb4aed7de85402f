mod app;

use app::UiApp;
use eframe::NativeOptions;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = NativeOptions::default();
    if let Err(e) = eframe::run_native(
        "Image Processor",
        options,
        Box::new(|_cc| Ok(Box::new(UiApp::load()))),
    ) {
        eprintln!("Application stopped with error: {e}");
    }
}
