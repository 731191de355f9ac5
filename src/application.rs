//! Main application entry point for spansim.

use crate::core::{Config, Result, ServiceName};
use crate::generator::LoadGenerator;
use crate::server::{self, DispatcherState};
use crate::simulator::{OperationSimulator, Randomness};
use crate::sink::{build_sink, RecordSink};
use std::net::SocketAddr;
use std::sync::Arc;

/// Coordinates the simulator, sink, dispatcher, and load generator.
///
/// The sink is constructed here and torn down here; nothing else owns
/// telemetry lifecycle.
pub struct Application {
    /// The operation simulator
    simulator: Arc<OperationSimulator>,
    /// Destination for emitted records
    sink: Arc<dyn RecordSink>,
    /// Background load generator, when enabled
    generator: Option<Arc<LoadGenerator>>,
    /// Application configuration
    config: Config,
}

impl Application {
    /// Create a new Application with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let randomness = match config.simulator.seed {
            Some(seed) => Randomness::seeded(seed),
            None => Randomness::Entropy,
        };

        let simulator = Arc::new(OperationSimulator::new(
            ServiceName::new(config.simulator.service_name.clone())?,
            config.policy_table()?,
            randomness,
        ));

        let sink = build_sink(&config);

        let generator = if config.generator.enabled {
            Some(Arc::new(LoadGenerator::new(
                Arc::clone(&simulator),
                Arc::clone(&sink),
                &config.generator,
            )?))
        } else {
            None
        };

        Ok(Self {
            simulator,
            sink,
            generator,
            config,
        })
    }

    /// Run the application until the dispatcher exits or Ctrl-C arrives.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            "Starting spansim: service={}, sink={}",
            self.simulator.service_name(),
            self.sink.name()
        );

        let generator_handle = self.generator.as_ref().map(|generator| {
            let generator = Arc::clone(generator);
            tokio::spawn(async move {
                if let Err(e) = generator.run().await {
                    tracing::error!("Load generator error: {}", e);
                }
            })
        });

        let state = DispatcherState {
            simulator: Arc::clone(&self.simulator),
            sink: Arc::clone(&self.sink),
        };
        let addr = SocketAddr::new(self.config.server.bind_address, self.config.server.http_port);

        let shutdown = tokio::signal::ctrl_c();

        tokio::select! {
            result = server::start_server(state, addr) => {
                result?;
            }
            _ = shutdown => {
                tracing::info!("Received shutdown signal, stopping...");
            }
        }

        if let Some(generator) = &self.generator {
            generator.stop();
        }
        if let Some(handle) = generator_handle {
            handle.await?;
        }
        self.sink.shutdown().await?;

        Ok(())
    }

    /// Get a reference to the simulator.
    pub fn simulator(&self) -> &Arc<OperationSimulator> {
        &self.simulator
    }

    /// Get a reference to the sink.
    pub fn sink(&self) -> &Arc<dyn RecordSink> {
        &self.sink
    }

    /// Get a reference to the load generator, if enabled.
    pub fn generator(&self) -> Option<&Arc<LoadGenerator>> {
        self.generator.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigBuilder;

    #[test]
    fn test_application_wiring() {
        let config = ConfigBuilder::new()
            .service_name("wiring-test")
            .seed(1)
            .build()
            .unwrap();
        let app = Application::new(config).unwrap();

        assert_eq!(app.simulator().service_name().as_str(), "wiring-test");
        assert_eq!(app.sink().name(), "console");
        assert!(app.generator().is_some());
    }

    #[test]
    fn test_generator_disabled() {
        let config = ConfigBuilder::new().generator_enabled(false).build().unwrap();
        let app = Application::new(config).unwrap();
        assert!(app.generator().is_none());
    }
}
