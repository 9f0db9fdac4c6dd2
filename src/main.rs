use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use houndify::cli::{Cli, Commands};
use houndify::config::Config;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose)?;
    tracing::debug!(version = %houndify::version_string(), "houndify starting");

    match cli.command {
        Commands::Stream {
            ref input,
            sample_rate,
            no_vad,
        } => {
            let config = load_config(&cli)?;
            houndify::app::run_stream_command(config, input, sample_rate, no_vad, cli.quiet)
                .await?;
        }
        Commands::Text { ref query } => {
            let config = load_config(&cli)?;
            houndify::app::run_text_command(config, &query.join(" ")).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "houndify",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-q` shows only errors, `-v` enables
/// debug and `-vv` trace output for this crate.
fn init_logging(quiet: bool, verbose: u8) -> Result<()> {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "houndify=debug,warn",
        (false, _) => "houndify=trace,info",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order (later wins):
/// 1. Config file (--config, else ~/.config/houndify/config.toml if present)
/// 2. Environment variables (HOUNDIFY_*)
/// 3. Credential flags on the command line
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let default_path = Config::default_path()?;
            Config::load_or_default(&default_path)
                .with_context(|| format!("failed to load config from {}", default_path.display()))?
        }
    }
    .with_env_overrides();

    if let Some(id) = &cli.client_id {
        config.credentials.client_id = id.clone();
    }
    if let Some(key) = &cli.client_key {
        config.credentials.client_key = key.clone();
    }
    if let Some(id) = &cli.user_id {
        config.credentials.user_id = id.clone();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}
