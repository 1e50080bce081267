//! Logging initialization
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG` takes precedence over the `-v` count when set.

use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,hyper=debug,tower=debug",
    }
}

pub fn init_logging(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .init();

    debug!("wordflow started with verbosity level: {}", verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), "info");
        assert_eq!(log_level(1), "debug");
        assert_eq!(log_level(2), "trace");
        assert_eq!(log_level(7), "trace,hyper=debug,tower=debug");
    }
}
