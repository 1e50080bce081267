//! Fatal error reporting for the binary

use tracing::error;

use crate::error::{describe_error_code, WordflowError};

/// Print `error` and exit with a code derived from its kind
///
/// With `verbose >= 1` the full source chain is printed as well.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    let exit_code = match error.downcast_ref::<WordflowError>() {
        Some(err) => {
            if verbose >= 1 {
                let code = err.root().code();
                eprintln!("  E{:04}: {}", code, describe_error_code(code));
            }
            err.exit_code()
        }
        None => 1,
    };

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code)
}
