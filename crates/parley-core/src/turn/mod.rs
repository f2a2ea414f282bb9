//! Turn view derived from the flat message log.
//!
//! - `projector`: pure log -> turns projection.
//! - `log`: the client's local log copy with an incremental turn index.
//! - `audit`: anomaly detection for logs received from the server.

pub mod audit;
pub mod log;
pub mod projector;

pub use log::MessageLog;
pub use projector::project_turns;
