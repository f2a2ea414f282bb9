//! Infrastructure layer for Parley.
//!
//! Implements the ports defined in `parley-core`: REST clients for the
//! conversation server and the budget service, and a SQLite store for local
//! preferences. Also loads `config.toml` from the data directory.

pub mod config;
pub mod sqlite;
pub mod sync;
