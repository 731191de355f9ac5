//! Spansim - observable-operation simulator.
//!
//! Spansim models units of work ("a trade", "an SLO probe", "a
//! distributed call") as span-equivalent telemetry records with synthetic
//! latency, success/failure outcomes, and structured attributes, then
//! streams them to a console or OTLP sink. It exists to feed tracing
//! backends and dashboards with realistic, controllable traffic.
//!
//! # Features
//!
//! - **Table-driven simulation**: per-kind failure probability and latency
//!   ranges, overridable from YAML
//! - **HTTP dispatcher**: one endpoint per operation kind, outcome mapped
//!   to status codes
//! - **Pluggable sinks**: console JSON lines or OTLP/GRPC export
//! - **Load generator**: jittered background traffic with prompt shutdown
//! - **Deterministic mode**: seedable randomness for reproducible runs
//!
//! # Architecture
//!
//! - `core`: domain models, errors, configuration
//! - `simulator`: the operation simulator and its policy table
//! - `sink`: record emission backends
//! - `server`: HTTP dispatcher
//! - `generator`: background load loop
//!
//! # Example
//!
//! ```no_run
//! use spansim_lib::core::Config;
//! use spansim_lib::Application;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let app = Application::new(config)?;
//!     app.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod application;
pub mod cli;
pub mod core;
pub mod generator;
pub mod server;
pub mod simulator;
pub mod sink;

// Re-export core types for convenience
pub use crate::application::Application;
pub use crate::core::{Config, Result};
