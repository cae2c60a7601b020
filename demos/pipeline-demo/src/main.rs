mod cli;

use chrono::Local;
use clap::Parser;
use log::{error, info};
use logweave::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Sink that counts what made it past the filters and echoes it to stdout.
struct EchoSink {
    seen: Arc<AtomicUsize>,
}

impl PluginModule for EchoSink {
    fn descriptor(&self) -> Option<PluginDescriptor> {
        Some(
            PluginDescriptor::new("echo_sink", PluginKind::Sink)
                .with_version(env!("CARGO_PKG_VERSION"))
                .with_description("echoes accepted entries to stdout"),
        )
    }

    fn init(&mut self, config: &PluginConfig) -> i32 {
        info!(
            "echo_sink initialized (prefix: {})",
            config.get_string("prefix", ">>")
        );
        0
    }

    fn process(&mut self, entry: &LogEntry) -> PluginResult {
        self.seen.fetch_add(1, Ordering::Relaxed);
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        println!("[{timestamp}] sink <- {} {}", entry.level, entry.message);
        PluginResult::Ok
    }

    fn shutdown(&mut self) {
        info!("echo_sink shutting down");
    }
}

/// Split `level:message`, defaulting to INFO when no known level prefix is present.
fn parse_message(raw: &str) -> (Severity, &str) {
    match raw.split_once(':') {
        Some((level, message)) if level.parse::<Severity>().is_ok() => {
            (Severity::from_config(level), message.trim_start())
        }
        _ => (Severity::Info, raw),
    }
}

fn main() {
    env_logger::init();
    let args = cli::Args::parse();

    let mut config = match args.config() {
        Some(path) => LoggingConfig::from_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }),
        None => LoggingConfig::default(),
    };

    if let Some(path) = args.log_file() {
        config.log.file = path.display().to_string();
    }
    if let Some(level) = &args.level {
        config.log.level = level.clone();
    }
    config.plugins.paths.extend(args.plugin_dirs.iter().cloned());

    let logger = Logger::from_config(&config);
    let loaded = logger.plugins().scan_and_load();

    let seen = Arc::new(AtomicUsize::new(0));
    if let Err(e) = logger.plugins().register(
        "echo_sink",
        Box::new(EchoSink {
            seen: Arc::clone(&seen),
        }),
    ) {
        error!("Cannot register echo sink: {e}");
    }

    if args.verbose {
        info!("{loaded} plugin(s) loaded from disk");
        for descriptor in logger.plugins().descriptors() {
            info!(
                "  {} v{} [{}] {}",
                descriptor.name, descriptor.version, descriptor.kind, descriptor.description
            );
        }
    }

    for raw in &args.messages {
        let (level, message) = parse_message(raw);
        logger.publish(level, Some(&args.module), message);
    }

    if args.verbose {
        info!(
            "{} of {} message(s) reached the sinks",
            seen.load(Ordering::Relaxed),
            args.messages.len()
        );
    }

    logger.shutdown();
}
