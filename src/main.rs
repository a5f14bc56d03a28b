//! visflow demo - Main Entry Point
//!
//! Builds a small counting pipeline, runs it to completion and logs what the
//! sink received. The first argument names a config file (TOML or JSON).

use anyhow::Context;
use std::path::PathBuf;
use visflow::{
    config::{default_config_path, EngineConfig},
    logging,
    pipeline::{
        nodes::{CollectorRecord, CollectorSink, CompareFunction, ComparisonOperation, CounterSource, ScaleOperation},
        Engine, PropertySet,
    },
};

fn main() -> anyhow::Result<()> {
    let config_path: Option<PathBuf> = std::env::args().nth(1).map(PathBuf::from).or_else(default_config_path);
    let config = match &config_path {
        Some(path) => EngineConfig::load_or_default(path),
        None => EngineConfig::default(),
    };

    let _log_guard = logging::init(&config.logging).context("Failed to initialise logging")?;
    tracing::info!("Starting visflow demo");
    if let Some(path) = &config_path {
        tracing::info!("Config: {:?}", path);
    }

    let timeout = config.engine.wait_timeout();
    let mut engine = Engine::new(config);

    let sink = CollectorSink::new();
    let results = sink.handle();

    let counter = engine.add_operation("counter", CounterSource::new().with_start(1).with_limit(20))?;
    let scale = engine.add_operation("scale", ScaleOperation::new(0.5))?;
    let compare = engine.add_operation("compare", ComparisonOperation::new(CompareFunction::Greater, 4.0))?;
    let collect = engine.add_operation("collect", sink)?;

    engine.connect(counter, "output", scale, "input")?;
    engine.connect(scale, "output", compare, "input0")?;
    engine.connect(compare, "output", collect, "input")?;

    if let Some(op) = engine.operation(scale) {
        op.add_property_set(PropertySet::new("double").with("factor", 2.0f64));
    }

    let events = engine.subscribe();
    engine.start().context("Failed to start engine")?;
    engine.reconfigure("double");
    engine
        .supervise(&events, timeout)
        .context("Pipeline did not complete")?;

    let objects = results.objects();
    let above = objects.iter().filter(|v| v.convert_to(false)).count();
    tracing::info!(
        "Collected {} values, {} above threshold, stream {}",
        objects.len(),
        above,
        if results.count(&CollectorRecord::Stopped) > 0 {
            "finished"
        } else {
            "incomplete"
        }
    );

    Ok(())
}
