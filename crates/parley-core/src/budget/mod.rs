//! Budget gate abstraction for point-metered sends.

pub mod gate;

pub use gate::BudgetGate;
