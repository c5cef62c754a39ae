//! `SettingsStore` trait — JSON values keyed by `(user_id, key)`.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Backend-agnostic settings storage used to persist wizard progress.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch a setting, or `None` if it was never written.
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace a setting.
    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a setting. Returns whether anything was removed.
    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError>;
}
