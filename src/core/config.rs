//! Configuration management for spansim.
//!
//! This module provides layered configuration handling with:
//! - YAML file support
//! - Environment variable overrides
//! - CLI argument overrides
//! - Validation and defaults

use crate::core::{Result, ServiceName, SpansimError};
use crate::simulator::{PolicyOverride, PolicyTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration for spansim
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP dispatcher configuration
    pub server: ServerConfig,
    /// Simulator policy configuration
    pub simulator: SimulatorConfig,
    /// Telemetry sink configuration
    pub sink: SinkConfig,
    /// Load generator configuration
    pub generator: GeneratorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// HTTP dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the dispatcher listens on
    pub http_port: u16,
    /// Bind address for the dispatcher
    pub bind_address: IpAddr,
}

/// Simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Service name stamped on emitted records
    pub service_name: String,
    /// Base seed for deterministic runs; unset means OS entropy
    pub seed: Option<u64>,
    /// SLO threshold checked by slo_latency probes
    pub slo_threshold_ms: u64,
    /// Kinds removed from the policy table
    pub disabled_kinds: Vec<String>,
    /// Per-kind policy overrides
    pub policies: HashMap<String, PolicyOverride>,
}

/// Which sink receives emitted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// JSON lines on stdout
    Console,
    /// OTLP/GRPC export to a collector
    Otlp,
}

/// Telemetry sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Sink selection
    pub kind: SinkKind,
    /// OTLP collector endpoint, used when kind is otlp
    pub endpoint: String,
}

/// Load generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Whether the background generator runs at all
    pub enabled: bool,
    /// Base interval between generated operations
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Fractional jitter applied to the interval, in [0.0, 1.0)
    pub jitter: f64,
    /// Kinds the generator draws from; empty means every kind in the table
    pub kinds: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Structured (target + thread + line) format for headless runs
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            simulator: SimulatorConfig::default(),
            sink: SinkConfig::default(),
            generator: GeneratorConfig::default(),
            logging: LoggingConfig::default(),
            debug: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_port: 8080,
            bind_address: "0.0.0.0".parse().expect("Valid default IP address"),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            service_name: "spansim".to_string(),
            seed: None,
            slo_threshold_ms: 500,
            disabled_kinds: Vec::new(),
            policies: HashMap::new(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            kind: SinkKind::Console,
            endpoint: "http://localhost:4317".to_string(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            enabled: true,
            interval: Duration::from_secs(1),
            jitter: 0.2,
            kinds: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Builds the policy table this configuration describes
    pub fn policy_table(&self) -> Result<PolicyTable> {
        PolicyTable::new().with_overrides(
            &self.simulator.policies,
            &self.simulator.disabled_kinds,
            self.simulator.slo_threshold_ms,
        )
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.http_port == 0 {
            return Err(SpansimError::config("http_port must be greater than 0"));
        }

        ServiceName::new(self.simulator.service_name.clone())
            .map_err(|e| SpansimError::config(format!("invalid service_name: {}", e)))?;

        // Policy overrides and disabled kinds must produce a valid table
        self.policy_table()?;

        if !(0.0..1.0).contains(&self.generator.jitter) {
            return Err(SpansimError::config(format!(
                "generator jitter must be in [0.0, 1.0), got {}",
                self.generator.jitter
            )));
        }

        if self.generator.interval.is_zero() {
            return Err(SpansimError::config("generator interval must be greater than 0"));
        }

        for kind in &self.generator.kinds {
            kind.parse::<crate::core::OperationKind>()
                .map_err(|_| SpansimError::config(format!("unknown generator kind '{}'", kind)))?;
        }

        if self.sink.kind == SinkKind::Otlp && self.sink.endpoint.is_empty() {
            return Err(SpansimError::config("otlp sink requires an endpoint"));
        }

        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| SpansimError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set HTTP port
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.server.http_port = port;
        self
    }

    /// Set service name
    pub fn service_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.simulator.service_name = name.into();
        self
    }

    /// Set the deterministic seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.simulator.seed = Some(seed);
        self
    }

    /// Set the SLO threshold
    pub fn slo_threshold_ms(mut self, threshold: u64) -> Self {
        self.config.simulator.slo_threshold_ms = threshold;
        self
    }

    /// Select the sink
    pub fn sink_kind(mut self, kind: SinkKind) -> Self {
        self.config.sink.kind = kind;
        self
    }

    /// Set the OTLP endpoint
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.sink.endpoint = endpoint.into();
        self
    }

    /// Enable or disable the load generator
    pub fn generator_enabled(mut self, enabled: bool) -> Self {
        self.config.generator.enabled = enabled;
        self
    }

    /// Set the generator interval
    pub fn generator_interval(mut self, interval: Duration) -> Self {
        self.config.generator.interval = interval;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Watch configuration file for changes
pub struct ConfigWatcher {
    path: PathBuf,
    tx: tokio::sync::watch::Sender<Config>,
    rx: tokio::sync::watch::Receiver<Config>,
}

impl ConfigWatcher {
    /// Create a new configuration watcher
    pub fn new(path: PathBuf, initial: Config) -> Self {
        let (tx, rx) = tokio::sync::watch::channel(initial);
        ConfigWatcher { path, tx, rx }
    }

    /// Get a receiver for configuration updates
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Config> {
        self.rx.clone()
    }

    /// Start watching for configuration changes
    pub async fn watch(self) -> Result<()> {
        use notify::{RecursiveMode, Watcher};
        use std::sync::mpsc::channel;

        let (tx, rx) = channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })
        .map_err(|e| SpansimError::config(format!("Failed to create file watcher: {}", e)))?;

        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|e| SpansimError::config(format!("Failed to watch config file: {}", e)))?;

        tracing::info!("Watching configuration file: {:?}", self.path);

        while let Ok(event) = rx.recv() {
            if matches!(event.kind, notify::EventKind::Modify(_)) {
                tracing::info!("Configuration file changed, reloading...");

                match tokio::fs::read_to_string(&self.path).await {
                    Ok(content) => match serde_yaml::from_str::<Config>(&content) {
                        Ok(mut new_config) => {
                            if let Err(e) = new_config.validate() {
                                tracing::error!("Invalid configuration: {}", e);
                                continue;
                            }

                            // Preserve runtime-only settings
                            new_config.debug = self.tx.borrow().debug;

                            if let Err(e) = self.tx.send(new_config) {
                                tracing::error!("Failed to update configuration: {}", e);
                            }

                            tracing::info!("Configuration reloaded successfully");
                        },
                        Err(e) => {
                            tracing::error!("Failed to parse configuration: {}", e);
                        },
                    },
                    Err(e) => {
                        tracing::error!("Failed to read configuration file: {}", e);
                    },
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_jitter() {
        let mut config = Config::default();
        config.generator.jitter = 1.0;
        assert!(config.validate().is_err());

        config.generator.jitter = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::default();
        config.generator.interval = Duration::from_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .http_port(9090)
            .service_name("trading-sim")
            .seed(42)
            .sink_kind(SinkKind::Otlp)
            .endpoint("http://collector:4317")
            .debug(true)
            .build();

        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.server.http_port, 9090);
        assert_eq!(config.simulator.service_name, "trading-sim");
        assert_eq!(config.simulator.seed, Some(42));
        assert_eq!(config.sink.kind, SinkKind::Otlp);
        assert!(config.debug);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
server:
  http_port: 9191
  bind_address: "127.0.0.1"
simulator:
  service_name: demo-sim
  slo_threshold_ms: 750
  disabled_kinds: [topology]
  policies:
    trade_buy:
      failure_probability: 0.3
sink:
  kind: otlp
  endpoint: "http://otel:4317"
generator:
  enabled: false
  interval: 250ms
  jitter: 0.1
"#;

        let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build().unwrap();

        assert_eq!(config.server.http_port, 9191);
        assert_eq!(config.simulator.service_name, "demo-sim");
        assert_eq!(config.simulator.slo_threshold_ms, 750);
        assert_eq!(config.sink.kind, SinkKind::Otlp);
        assert!(!config.generator.enabled);
        assert_eq!(config.generator.interval, Duration::from_millis(250));

        let table = config.policy_table().unwrap();
        assert!(table.get(crate::core::OperationKind::Topology).is_err());
        let buy = table.get(crate::core::OperationKind::TradeBuy).unwrap();
        assert_eq!(buy.failure_probability, 0.3);
    }

    #[test]
    fn test_config_watcher_exposes_initial_config() {
        let watcher = ConfigWatcher::new(PathBuf::from("spansim.yaml"), Config::default());
        let rx = watcher.subscribe();
        assert_eq!(rx.borrow().server.http_port, 8080);
    }

    #[test]
    fn test_unknown_policy_kind_rejected() {
        let yaml = r#"
simulator:
  policies:
    warp_drive:
      failure_probability: 0.3
"#;
        let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build();
        assert!(config.is_err());
    }
}
