//! SQLite preference store implementation.
//!
//! Implements `PreferenceStore` from `parley-core`. One row per character
//! holds the last selected boost multiplier.

use chrono::Utc;
use parley_core::preference::PreferenceStore;
use parley_types::budget::BoostMultiplier;
use parley_types::conversation::CharacterId;
use parley_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `PreferenceStore`.
pub struct SqlitePreferenceStore {
    pool: DatabasePool,
}

impl SqlitePreferenceStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    async fn load_boost(
        &self,
        character_id: &CharacterId,
    ) -> Result<Option<BoostMultiplier>, RepositoryError> {
        let row = sqlx::query("SELECT boost FROM character_preferences WHERE character_id = ?")
            .bind(character_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let factor: f64 = row
            .try_get("boost")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        BoostMultiplier::try_from(factor)
            .map(Some)
            .map_err(|e| RepositoryError::InvalidValue(format!("boost: {e}")))
    }

    async fn save_boost(
        &self,
        character_id: &CharacterId,
        boost: BoostMultiplier,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO character_preferences (character_id, boost, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT (character_id) DO UPDATE SET boost = excluded.boost, updated_at = excluded.updated_at"#,
        )
        .bind(character_id.to_string())
        .bind(boost.factor())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::debug!(character_id = %character_id, %boost, "boost preference saved");
        Ok(())
    }
}
