//! PreferenceStore trait definition.

use parley_types::budget::BoostMultiplier;
use parley_types::conversation::CharacterId;
use parley_types::error::RepositoryError;

/// Repository trait for per-character chat preferences.
///
/// Implementations live in parley-infra (e.g., `SqlitePreferenceStore`).
pub trait PreferenceStore: Send + Sync {
    /// Last selected boost multiplier for a character, if one was saved.
    fn load_boost(
        &self,
        character_id: &CharacterId,
    ) -> impl std::future::Future<Output = Result<Option<BoostMultiplier>, RepositoryError>> + Send;

    /// Persist the selected boost multiplier for a character (upsert).
    fn save_boost(
        &self,
        character_id: &CharacterId,
        boost: BoostMultiplier,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
