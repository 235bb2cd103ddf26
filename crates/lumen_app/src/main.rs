mod config;
mod scene;
mod viewer;

use std::process::ExitCode;

use lumen_window::{WindowSettings, run_lumen_app};

use crate::{config::ViewerConfig, viewer::Viewer};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => ViewerConfig::load(&path).unwrap_or_else(|err| {
            log::warn!("{}, using defaults", err);
            ViewerConfig::default()
        }),
        None => ViewerConfig::default(),
    };

    let settings = WindowSettings {
        title: "Lumen Viewer".to_string(),
        width: config.width,
        height: config.height,
    };

    match run_lumen_app(Viewer::new(config), settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
