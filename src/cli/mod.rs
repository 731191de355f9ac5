//! Command-line interface for spansim.
//!
//! Run `spansim` with no arguments to get a console stream of synthetic
//! spans and an HTTP dispatcher on port 8080.

use crate::core::{Config, Result, SinkKind, SpansimError};
use clap::Parser;
use std::path::PathBuf;

/// Observable-operation simulator - synthetic spans on demand
#[derive(Parser, Debug)]
#[command(name = "spansim")]
#[command(version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// HTTP port for the dispatcher
    #[arg(long, env = "SPANSIM_HTTP_PORT")]
    pub http_port: Option<u16>,

    /// Sink selection: console or otlp
    #[arg(long, env = "SPANSIM_SINK")]
    pub sink: Option<String>,

    /// OTLP collector endpoint
    #[arg(long, env = "SPANSIM_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Service name stamped on emitted records
    #[arg(long, env = "SPANSIM_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Base seed for deterministic runs
    #[arg(long, env = "SPANSIM_SEED")]
    pub seed: Option<u64>,

    /// Configuration file path (default: ~/.config/spansim/config.yaml)
    #[arg(short, long, env = "SPANSIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable the background load generator
    #[arg(long, env = "SPANSIM_NO_GENERATOR")]
    pub no_generator: bool,

    /// Enable debug logging
    #[arg(short, long, env = "SPANSIM_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,

    /// Show version information
    #[arg(short = 'V', long = "show-version")]
    pub version: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        use crate::core::config::ConfigBuilder;

        let mut builder = ConfigBuilder::new();

        // 1. Load from config file if specified or default location
        let config_path = if let Some(path) = &self.config {
            path.clone()
        } else {
            let default_path = dirs::config_dir()
                .map(|d| d.join("spansim").join("config.yaml"))
                .unwrap_or_else(|| PathBuf::from("~/.config/spansim/config.yaml"));

            if default_path.exists() {
                default_path
            } else {
                // No config file, use defaults
                return self.build_config_from_args(builder);
            }
        };

        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                builder = builder.from_yaml(&content)?;
                tracing::info!("Loaded configuration from: {:?}", config_path);
            },
            Err(e) if self.config.is_some() => {
                // User explicitly specified a config file that doesn't exist
                return Err(SpansimError::config(format!(
                    "Failed to read config file {:?}: {}",
                    config_path, e
                )));
            },
            Err(_) => {
                tracing::debug!("No config file found at {:?}, using defaults", config_path);
            },
        }

        // 2. Apply CLI overrides
        self.build_config_from_args(builder)
    }

    fn build_config_from_args(
        &self,
        mut builder: crate::core::config::ConfigBuilder,
    ) -> Result<Config> {
        if let Some(port) = self.http_port {
            builder = builder.http_port(port);
        }
        if let Some(sink) = &self.sink {
            let kind = match sink.to_lowercase().as_str() {
                "console" => SinkKind::Console,
                "otlp" => SinkKind::Otlp,
                other => {
                    return Err(SpansimError::config(format!("unknown sink '{}'", other)));
                },
            };
            builder = builder.sink_kind(kind);
        }
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint(endpoint.clone());
        }
        if let Some(name) = &self.service_name {
            builder = builder.service_name(name.clone());
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }

        builder = builder
            .generator_enabled(!self.no_generator)
            .debug(self.debug);

        builder.build()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level =
            std::env::var("SPANSIM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            // Keep stdout clean for the console sink's JSON lines
            .with_writer(std::io::stderr)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| SpansimError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute the spansim application.
pub async fn execute(cli: Cli) -> Result<()> {
    // Handle version flag first
    if cli.version {
        println!("spansim {}", env!("CARGO_PKG_VERSION"));
        println!("Observable-operation simulator");
        return Ok(());
    }

    // Initialize logging
    cli.init_logging()?;

    // Load and validate configuration
    let config = cli.load_config().await?;

    // Handle config validation flag
    if cli.check_config {
        config.validate()?;
        println!("Configuration is valid!");
        println!("  HTTP port: {}", config.server.http_port);
        println!("  Service name: {}", config.simulator.service_name);
        println!("  Sink: {:?}", config.sink.kind);
        println!("  Generator enabled: {}", config.generator.enabled);
        return Ok(());
    }

    let app = crate::Application::new(config)?;
    app.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_cli() -> Cli {
        Cli {
            http_port: None,
            sink: None,
            endpoint: None,
            service_name: None,
            seed: None,
            config: None,
            no_generator: false,
            debug: false,
            check_config: false,
            version: false,
        }
    }

    #[tokio::test]
    async fn test_cli_defaults() {
        let cli = bare_cli();
        let config = cli.build_config_from_args(crate::core::ConfigBuilder::new()).unwrap();
        assert_eq!(config.server.http_port, 8080);
        assert!(config.generator.enabled);
        assert!(!config.debug);
    }

    #[tokio::test]
    async fn test_cli_overrides() {
        let mut cli = bare_cli();
        cli.http_port = Some(9000);
        cli.sink = Some("otlp".to_string());
        cli.seed = Some(7);
        cli.no_generator = true;

        let config = cli.build_config_from_args(crate::core::ConfigBuilder::new()).unwrap();
        assert_eq!(config.server.http_port, 9000);
        assert_eq!(config.sink.kind, SinkKind::Otlp);
        assert_eq!(config.simulator.seed, Some(7));
        assert!(!config.generator.enabled);
    }

    #[tokio::test]
    async fn test_unknown_sink_rejected() {
        let mut cli = bare_cli();
        cli.sink = Some("carrier_pigeon".to_string());
        assert!(cli.build_config_from_args(crate::core::ConfigBuilder::new()).is_err());
    }
}
