//! Background load generator.
//!
//! Repeatedly feeds random operation kinds through the simulate-then-emit
//! path at a fixed or jittered interval. A stop signal takes effect before
//! the next scheduled invocation; in-flight calls never block shutdown
//! because simulated latency is a recorded value, not a sleep.

use crate::core::{GeneratorConfig, OperationKind, OperationRequest, Result};
use crate::simulator::OperationSimulator;
use crate::sink::RecordSink;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Drives the simulator on a background scheduling loop.
pub struct LoadGenerator {
    simulator: Arc<OperationSimulator>,
    sink: Arc<dyn RecordSink>,
    interval: Duration,
    jitter: f64,
    kinds: Vec<OperationKind>,
    shutdown: watch::Sender<bool>,
}

impl LoadGenerator {
    /// Creates a generator. An empty kind list in the config means every
    /// kind currently in the simulator's policy table.
    pub fn new(
        simulator: Arc<OperationSimulator>,
        sink: Arc<dyn RecordSink>,
        config: &GeneratorConfig,
    ) -> Result<Self> {
        let kinds = if config.kinds.is_empty() {
            simulator.policy().kinds()
        } else {
            config
                .kinds
                .iter()
                .map(|k| k.parse())
                .collect::<Result<Vec<_>>>()?
        };

        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            simulator,
            sink,
            interval: config.interval,
            jitter: config.jitter,
            kinds,
            shutdown,
        })
    }

    /// Runs until `stop` is called. One operation per tick.
    pub async fn run(&self) -> Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        tracing::info!(
            "Load generator started: {} kinds, base interval {:?}",
            self.kinds.len(),
            self.interval
        );

        loop {
            tokio::select! {
                _ = sleep(self.next_delay()) => {
                    let kind = self.next_kind();
                    let request = OperationRequest::new(kind);
                    match self.simulator.run(&request) {
                        Ok((_, record)) => {
                            if let Err(e) = self.sink.emit(&record).await {
                                tracing::warn!("Failed to emit generated record: {}", e);
                            }
                        },
                        Err(e) => tracing::warn!("Failed to simulate {}: {}", kind, e),
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                },
            }
        }

        tracing::info!("Load generator stopped");
        Ok(())
    }

    /// Signals the loop to stop before its next invocation.
    pub fn stop(&self) {
        // send_replace delivers even when no receiver is subscribed yet
        self.shutdown.send_replace(true);
    }

    /// True until `stop` has been called.
    pub fn is_running(&self) -> bool {
        !*self.shutdown.borrow()
    }

    fn next_delay(&self) -> Duration {
        if self.jitter <= 0.0 {
            return self.interval;
        }
        let spread = rand::thread_rng().gen_range(-self.jitter..self.jitter);
        self.interval.mul_f64(1.0 + spread)
    }

    fn next_kind(&self) -> OperationKind {
        self.kinds[rand::thread_rng().gen_range(0..self.kinds.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ServiceName;
    use crate::simulator::{PolicyTable, Randomness};
    use crate::sink::MemorySink;

    fn test_generator(interval_ms: u64) -> (Arc<LoadGenerator>, Arc<MemorySink>) {
        let simulator = Arc::new(OperationSimulator::new(
            ServiceName::new("gen-test".to_string()).unwrap(),
            PolicyTable::new(),
            Randomness::seeded(17),
        ));
        let sink = Arc::new(MemorySink::new());
        let config = GeneratorConfig {
            enabled: true,
            interval: Duration::from_millis(interval_ms),
            jitter: 0.0,
            kinds: vec!["service".to_string(), "trade_buy".to_string()],
        };
        let generator =
            Arc::new(LoadGenerator::new(simulator, sink.clone(), &config).unwrap());
        (generator, sink)
    }

    #[tokio::test]
    async fn test_generator_emits_records() {
        let (generator, sink) = test_generator(5);

        let runner = Arc::clone(&generator);
        let handle = tokio::spawn(async move { runner.run().await });

        sleep(Duration::from_millis(60)).await;
        generator.stop();
        handle.await.unwrap().unwrap();

        assert!(!sink.is_empty().await, "generator should have emitted records");
    }

    #[tokio::test]
    async fn test_stop_takes_effect_before_next_tick() {
        let (generator, sink) = test_generator(5);

        let runner = Arc::clone(&generator);
        let handle = tokio::spawn(async move { runner.run().await });

        sleep(Duration::from_millis(40)).await;
        generator.stop();
        handle.await.unwrap().unwrap();
        assert!(!generator.is_running());

        let count_after_stop = sink.len().await;
        sleep(Duration::from_millis(40)).await;
        assert_eq!(sink.len().await, count_after_stop, "no emissions after stop");
    }

    #[tokio::test]
    async fn test_unknown_configured_kind_is_rejected() {
        let simulator = Arc::new(OperationSimulator::new(
            ServiceName::new("gen-test".to_string()).unwrap(),
            PolicyTable::new(),
            Randomness::seeded(1),
        ));
        let sink = Arc::new(MemorySink::new());
        let config = GeneratorConfig {
            enabled: true,
            interval: Duration::from_millis(10),
            jitter: 0.0,
            kinds: vec!["warp_drive".to_string()],
        };
        assert!(LoadGenerator::new(simulator, sink, &config).is_err());
    }
}
