//! BudgetGate trait definition.

use parley_types::error::BudgetError;

/// Port to the service that owns the user's point balance.
///
/// The balance is only read here. Charges are applied server-side when a
/// send succeeds; the controller mirrors them locally.
pub trait BudgetGate: Send + Sync {
    /// Current balance in points.
    fn balance(&self) -> impl std::future::Future<Output = Result<u32, BudgetError>> + Send;
}
