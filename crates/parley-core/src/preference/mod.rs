//! Local preference persistence (selected boost multiplier per character).

pub mod store;

pub use store::PreferenceStore;
