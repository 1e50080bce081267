//! Application-level glue for the binary: logging, fatal errors and
//! component wiring.

pub mod error_handling;
pub mod logging;
pub mod runtime;

pub use error_handling::handle_fatal_error;
pub use logging::init_logging;
pub use runtime::build_executor;
