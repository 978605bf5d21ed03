//! Provider credential lookup for the proxy

use crate::database::error::DatabaseError;
use crate::error::FailureKind;
use crate::proxy::ProxyFailure;
use async_trait::async_trait;
use tracing::error;

pub const TOKEN_KEY: &str = "smeplug_token";
pub const BASE_URL_KEY: &str = "smeplug_base_url";

/// Value shipped in fresh installs until an admin sets a real token
pub const PLACEHOLDER_TOKEN: &str = "YOUR_SMEPLUG_TOKEN_HERE";

/// Provider settings as stored; either value may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

/// Usable provider credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub token: String,
    /// Base URL without a trailing slash
    pub base_url: String,
}

impl ProviderSettings {
    pub fn resolve(&self) -> Result<ProviderCredentials, ProxyFailure> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let (token, base_url) = match (present(&self.token), present(&self.base_url)) {
            (Some(token), Some(base_url)) => (token, base_url),
            _ => {
                return Err(ProxyFailure::new(
                    "API configuration not found",
                    FailureKind::NotConfigured,
                ))
            }
        };

        if token == PLACEHOLDER_TOKEN {
            return Err(ProxyFailure::new(
                "API token not configured. Please update the token in admin settings.",
                FailureKind::NotConfigured,
            ));
        }

        Ok(ProviderCredentials {
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Source of provider settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn provider_settings(&self) -> Result<ProviderSettings, DatabaseError>;
}

/// Fixed settings, for tests and env-configured deployments
#[derive(Debug, Clone, Default)]
pub struct StaticSettingsStore {
    settings: ProviderSettings,
}

impl StaticSettingsStore {
    pub fn new(token: Option<&str>, base_url: Option<&str>) -> Self {
        Self {
            settings: ProviderSettings {
                token: token.map(str::to_string),
                base_url: base_url.map(str::to_string),
            },
        }
    }
}

#[async_trait]
impl SettingsStore for StaticSettingsStore {
    async fn provider_settings(&self) -> Result<ProviderSettings, DatabaseError> {
        Ok(self.settings.clone())
    }
}

/// Load and validate credentials, mapping store errors onto a proxy failure
pub async fn load_credentials(
    store: &dyn SettingsStore,
) -> Result<ProviderCredentials, ProxyFailure> {
    let settings = store.provider_settings().await.map_err(|e| {
        error!("Failed to fetch provider settings: {}", e);
        ProxyFailure::new("Failed to fetch API configuration", FailureKind::NotConfigured)
    })?;
    settings.resolve()
}
