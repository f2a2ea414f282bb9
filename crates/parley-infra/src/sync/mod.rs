//! REST shims for the remote collaborators.
//!
//! - `client`: shared reqwest client, bearer auth and status mapping.
//! - `wire`: JSON request/response bodies.
//! - `http`: `HttpConversationSync` implementing `ConversationSync`.
//! - `budget`: `HttpBudgetGate` implementing `BudgetGate`.

pub mod budget;
pub mod client;
pub mod http;
pub mod wire;

pub use budget::HttpBudgetGate;
pub use client::RestClient;
pub use http::HttpConversationSync;

#[cfg(test)]
pub(crate) mod test_server;
