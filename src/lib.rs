//! # visflow: dataflow execution engine for machine-vision pipelines
//!
//! Independent processing stages ("operations") are wired together through
//! typed ports and executed as a graph. Every port exchanges
//! [`Variant`](variant::Variant)s, a tagged envelope that stores small values
//! inline and large ones (matrices, text) in a single heap box. Pause, resume,
//! stop and reconfiguration travel through the same channels as data, as
//! control tags.
//!
//! ## Architecture
//!
//! - **Variant**: type ids, inline/boxed payloads, converter registry
//! - **Operations**: user code behind the [`Operation`](pipeline::Operation) trait
//! - **Processors**: cooperative (`Simple`) or one worker thread (`Threaded`)
//! - **Engine**: graph building, topological start order, supervision
//! - **Communication**: crossbeam channels for operation events
//!
//! ## Configuration
//!
//! Engine defaults and per-operation overrides are loaded from TOML or JSON,
//! see [`config::EngineConfig`].
//!
//! ## Example
//!
//! ```no_run
//! use visflow::config::EngineConfig;
//! use visflow::pipeline::nodes::{CollectorSink, CounterSource, ScaleOperation};
//! use visflow::pipeline::Engine;
//! use std::time::Duration;
//!
//! fn main() -> visflow::Result<()> {
//!     let mut engine = Engine::new(EngineConfig::default());
//!     let sink = CollectorSink::new();
//!     let results = sink.handle();
//!
//!     let source = engine.add_operation("counter", CounterSource::new().with_limit(10))?;
//!     let scale = engine.add_operation("scale", ScaleOperation::new(0.5))?;
//!     let collect = engine.add_operation("collect", sink)?;
//!     engine.connect(source, "output", scale, "input")?;
//!     engine.connect(scale, "output", collect, "input")?;
//!
//!     let events = engine.subscribe();
//!     engine.start()?;
//!     engine.supervise(&events, Duration::from_secs(5))?;
//!     assert_eq!(results.objects().len(), 10);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod variant;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{Result, ResultExt, VisflowError};
pub use pipeline::{Engine, ExecutionError, Operation, OperationState, PipelineError, ProcessContext};
pub use variant::{TypeId, Variant};
