//! overtone - two-voice additive synthesizer in the terminal
//!
//! Run with: cargo run
//!
//! Set `OVERTONE_CONFIG` to a JSON file to override the defaults, and
//! `RUST_LOG` to write a log to `overtone.log`.

mod app;
mod ui;

use color_eyre::eyre::{Result, WrapErr};
use std::{env, fs::File};

use app::App;
use overtone::SynthConfig;

const CONFIG_VAR: &str = "OVERTONE_CONFIG";
const LOG_FILE: &str = "overtone.log";

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging()?;

    let config = load_config()?;
    log::info!(
        "starting with max frequency {} Hz, {:?} overtone gain",
        config.max_frequency,
        config.overtone_gain
    );

    let mut terminal = ratatui::init();
    let result = App::new(config).run(&mut terminal);
    ratatui::restore();
    result
}

/// The terminal owns stdout and stderr, so logs go to a file, and only when asked for
fn init_logging() -> Result<()> {
    if env::var_os("RUST_LOG").is_none() {
        return Ok(());
    }
    let file = File::create(LOG_FILE).wrap_err_with(|| format!("creating {LOG_FILE}"))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn load_config() -> Result<SynthConfig> {
    let Some(path) = env::var_os(CONFIG_VAR) else {
        return Ok(SynthConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("reading config {}", path.to_string_lossy()))?;
    SynthConfig::from_json(&text)
        .wrap_err_with(|| format!("parsing config {}", path.to_string_lossy()))
}
