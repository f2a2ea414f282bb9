//! Observability setup for Parley binaries.

pub mod tracing_setup;
