/*
[INPUT]:  CLI arguments, YAML configuration file, TASKDECK_* environment
[OUTPUT]: Terminal to-do client backed by the hosted backend
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags or startup flow
*/

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskdeck_app::tui::{LOG_BUFFER_CAPACITY, LogBuffer, LogWriterFactory, run_tui_with_log};
use taskdeck_app::{AppConfig, Backends};

#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about = "Terminal to-do list on a hosted backend")]
struct Cli {
    /// YAML config; optional when TASKDECK_URL and TASKDECK_API_KEY are set
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    /// Validate configuration and exit
    #[arg(long = "dry-run")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    if args.dry_run {
        init_tracing(&args.log_level)?;
        let config = load_config(&args)?;
        info!(
            url = %config.backend.url,
            table = %config.tasks.table,
            bucket = %config.tasks.bucket,
            realtime = config.tasks.realtime,
            session_path = ?config.session_path(),
            "dry-run requested; configuration validated"
        );
        return Ok(());
    }

    let log_buffer = LogBuffer::handle(LOG_BUFFER_CAPACITY);
    init_tracing_with_buffer(&args.log_level, LogWriterFactory::new(log_buffer.clone()))?;

    let config = load_config(&args)?;
    let backends = Backends::hosted(&config).context("build backend clients")?;
    info!(url = %config.backend.url, "starting taskdeck");

    run_tui_with_log(backends, config.task_settings(), log_buffer)
        .await
        .context("run terminal ui")?;

    info!("taskdeck stopped");
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn init_tracing_with_buffer(log_level: &str, writer: LogWriterFactory) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(args: &Cli) -> Result<AppConfig> {
    AppConfig::load(args.config_path.as_deref()).context("load config")
}
