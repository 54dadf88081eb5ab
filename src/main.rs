mod app;
mod config;
mod pipeline;
mod state;
mod telemetry;
mod tui;
mod ui;

use std::{fs::OpenOptions, io, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{WrapErr, eyre},
};
use tracing_subscriber::{EnvFilter, fmt::writer::BoxMakeWriter};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::parse();
    init_tracing(&config)?;

    if config.once {
        return app::print_once(&config).await;
    }

    let app = app::KillfeedApp::bootstrap(&config);
    app.run().await
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("killfeed=info"))?;

    // the TUI owns stdout, so diagnostics only go to a file unless printing once
    let writer = match &config.trace_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| {
                    format!("could not open trace file {}", path.display())
                })?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None if config.once => BoxMakeWriter::new(io::stderr),
        None => BoxMakeWriter::new(io::sink),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(config.trace_file.is_none())
        .with_writer(writer)
        .compact()
        .try_init()
        .map_err(|err| eyre!(err))?;

    Ok(())
}
