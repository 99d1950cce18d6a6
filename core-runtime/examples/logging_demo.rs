//! Logging system demonstration
//!
//! This example shows how to use the logging infrastructure in different modes.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # Compact format
//! cargo run --example logging_demo -- compact
//!
//! # With custom filter
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use core_runtime::events::{EventBus, SessionEvent};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use engine_traits::{MediaHandle, StreamKind};
use std::env;
use tracing::{debug, info, instrument, span, trace, warn, Level};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = if args.len() > 1 {
        match args[1].as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    } else {
        LogFormat::default()
    };

    let filter = args.get(2).cloned();

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_target(true);

    if let Some(f) = filter {
        config = config.with_filter(f);
    }

    init_logging(config).expect("Failed to initialize logging");

    info!("=== Logging System Demo ===");
    info!(format = ?format, "Logging initialized");

    demo_log_levels();
    demo_structured_logging();
    demo_event_bus().await;
    demo_instrumentation().await;

    info!("=== Demo Complete ===");
}

fn demo_log_levels() {
    let span = span!(Level::INFO, "log_levels");
    let _enter = span.enter();

    trace!("This is a TRACE level log");
    debug!("This is a DEBUG level log");
    info!("This is an INFO level log");
    warn!("This is a WARN level log");
}

fn demo_structured_logging() {
    let span = span!(Level::INFO, "structured_logging");
    let _enter = span.enter();

    info!("Simple message without fields");

    info!(
        handle = %MediaHandle::new(),
        left = 0.8,
        right = 0.8,
        "Volume pushed to engine"
    );

    info!(
        active_objects = 3,
        master_level = 0.5,
        "Session snapshot"
    );
}

async fn demo_event_bus() {
    let span = span!(Level::INFO, "event_bus");
    let _enter = span.enter();

    let bus = EventBus::new(16);
    let mut subscriber = bus.subscribe();

    bus.emit(SessionEvent::SessionStarted {
        stream: StreamKind::Music,
    })
    .ok();
    bus.emit(SessionEvent::PlaybackStarted {
        handle: MediaHandle::new(),
    })
    .ok();

    while let Ok(event) = subscriber.try_recv() {
        info!(
            severity = ?event.severity(),
            description = event.description(),
            "Observed session event"
        );
    }
}

#[instrument]
async fn demo_instrumentation() {
    info!("Instrumented function automatically creates spans");

    let levels = [1.0_f32, 0.75, 0.5, 0.25, 0.0];
    apply_ramp(&levels).await;
}

#[instrument(fields(steps = levels.len()))]
async fn apply_ramp(levels: &[f32]) {
    debug!("Applying fade ramp");

    for (idx, level) in levels.iter().enumerate() {
        trace!(step = idx, level, "Ramp step");
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }

    info!("Ramp complete");
}
