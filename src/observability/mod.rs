//! Observability module for structured logging.
//!
//! Every crate module logs through `tracing`; this module installs the
//! subscriber applications use when they have none of their own.

pub mod logging;

pub use logging::init_logging;
