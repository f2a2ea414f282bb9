//! SQLite storage layer.
//!
//! Local client state backed by SQLite with WAL mode and split read/write
//! connection pools. The conversation log itself lives on the server.

pub mod pool;
pub mod preference;
