use crate::database::error::DatabaseError;
use crate::proxy::settings::{ProviderSettings, SettingsStore, BASE_URL_KEY, TOKEN_KEY};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

/// Key/value row of the `api_settings` table
#[derive(Debug, Clone, FromRow)]
pub struct ApiSetting {
    pub key_name: String,
    pub key_value: Option<String>,
}

/// Reads provider credentials from `api_settings`
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the named settings rows
    pub async fn get_settings(&self, keys: &[&str]) -> Result<Vec<ApiSetting>, DatabaseError> {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        sqlx::query_as::<_, ApiSetting>(
            "SELECT key_name, key_value FROM api_settings WHERE key_name = ANY($1)",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn provider_settings(&self) -> Result<ProviderSettings, DatabaseError> {
        let rows = self.get_settings(&[TOKEN_KEY, BASE_URL_KEY]).await?;
        let value_of = |key: &str| {
            rows.iter()
                .find(|row| row.key_name == key)
                .and_then(|row| row.key_value.clone())
        };

        Ok(ProviderSettings {
            token: value_of(TOKEN_KEY),
            base_url: value_of(BASE_URL_KEY),
        })
    }
}
