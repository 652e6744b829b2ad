/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::env;
use std::sync::Once;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

fn level_from_env() -> Level {
    let log_level = env::var("LOGLEVEL")
        .unwrap_or_else(|_| "INFO".to_string())
        .to_uppercase();

    match log_level.as_str() {
        "DEBUG" => Level::DEBUG,
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Installs a global `tracing` subscriber using the level named by the `LOGLEVEL`
/// environment variable (`INFO` when unset).
///
/// Only the first call in a process has any effect.
pub fn setup_logger() {
    setup_logger_with_level(level_from_env());
}

/// Installs a global `tracing` subscriber with an explicit maximum level.
///
/// Only the first call in a process has any effect; if another subscriber was already
/// installed by the application this is a no-op.
pub fn setup_logger_with_level(level: Level) {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_thread_names(true)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            debug!("Log level set to: {}", level);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logger_is_idempotent() {
        setup_logger();
        setup_logger_with_level(Level::TRACE);
        setup_logger();
    }
}
