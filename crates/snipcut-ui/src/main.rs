mod app;
mod paths;
mod surface;
mod widgets;

use eframe::egui;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use snipcut_core::EditorConfig;
use snipcut_media::FfmpegBackend;

fn main() -> eframe::Result {
    init_tracing();

    let Some(config_path) = paths::find_config(std::env::args_os().nth(1).map(Into::into)) else {
        error!("Config is not defined. Exiting...");
        std::process::exit(1);
    };
    let config = match EditorConfig::load(&config_path) {
        Ok(c)  => c,
        Err(e) => {
            error!("{e}");
            error!("Config is not defined. Exiting...");
            std::process::exit(1);
        }
    };
    info!("config ← {}", config_path.display());

    let backend = match FfmpegBackend::new() {
        Ok(b)  => b,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let native_options = eframe::NativeOptions {
        centered: true,
        viewport: egui::ViewportBuilder::default()
            .with_title("SnipCut")
            .with_inner_size([1280.0, 850.0])
            .with_resizable(false),
        ..Default::default()
    };

    eframe::run_native(
        "SnipCut",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::SnipCutApp::new(cc, backend, &config)))),
    )
}

/// `info` by default; `RUST_LOG` overrides.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
