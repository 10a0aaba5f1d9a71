// Configuration loading: optional TOML file, VIGIL__ environment, CLI flags

use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use vigil_core::{CoreError, VigilConfig};

const ENV_PREFIX: &str = "VIGIL";
const ENV_SEPARATOR: &str = "__";

/// Command line of the `vigil-server` binary.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "vigil-server", version, about = "AI surveillance video streaming server")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "VIGIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind (overrides the configuration)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides the configuration)
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] CoreError),
}

/// Load, override and validate the service configuration.
///
/// Later sources win: built-in defaults, the TOML file named by `--config`,
/// `VIGIL__SECTION__KEY` environment variables, then `--host`/`--port`.
pub fn load_config(cli: &Cli) -> Result<VigilConfig, ConfigLoadError> {
    load_config_with_env(cli, None)
}

/// Like [`load_config`], reading variables from `env` instead of the process
/// environment when given.
pub fn load_config_with_env(
    cli: &Cli,
    env: Option<HashMap<String, String>>,
) -> Result<VigilConfig, ConfigLoadError> {
    let mut builder = Config::builder();

    if let Some(path) = &cli.config {
        info!("Loading configuration from {:?}", path);
        builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .with_list_parse_key("server.cors_origins")
            .try_parsing(true)
            .source(env),
    );

    // Missing fields fall back to the serde defaults
    let mut config: VigilConfig = builder.build()?.try_deserialize()?;

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    config.validate()?;
    Ok(config)
}
