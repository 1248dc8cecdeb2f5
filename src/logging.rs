use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "food_waste=info";
const LOG_FILE: &str = "food-waste.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Human-readable lines on stderr, leaving stdout to command output
    Console,
    /// Daily-rolling file under the log directory; used while the terminal UI owns the screen
    File,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init_logging(target: LogTarget, log_dir: &Path) -> Option<WorkerGuard> {
    match target {
        LogTarget::Console => {
            let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(console_layer)
                .try_init();
            None
        }
        LogTarget::File => {
            if let Err(e) = fs::create_dir_all(log_dir) {
                eprintln!("⚠️  Could not create log directory {}: {}", log_dir.display(), e);
                return None;
            }

            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(file_layer)
                .try_init();
            Some(guard)
        }
    }
}
