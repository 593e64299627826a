//! Provider directory: who may sign service records, and with which key.
//!
//! The protocol only reads providers. Ownership of the provider set lies
//! with an external directory, reached through [`ProviderDirectory`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a provider. Only `Active` providers may sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderStatus {
    Active,
    Expired,
    Revoked,
    Pending,
}

/// A provider as the directory reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: String,
    /// SPKI PEM or 32-byte hex Ed25519 public key.
    pub public_key_pem: String,
    pub status: ProviderStatus,
    /// Credentials held, matched exactly against the license matrix.
    pub licenses: BTreeSet<String>,
}

impl Provider {
    pub fn is_active(&self) -> bool {
        self.status == ProviderStatus::Active
    }

    pub fn license_list(&self) -> Vec<&str> {
        self.licenses.iter().map(String::as_str).collect()
    }
}

/// Errors from a provider directory.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("provider directory unavailable: {0}")]
    Unavailable(String),
}

/// Resolves provider identifiers.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Look up a provider. `Ok(None)` means the provider is unknown.
    async fn resolve(&self, provider_id: &str) -> Result<Option<Provider>, DirectoryError>;
}

/// A directory held in memory, for embedding hosts and tests.
#[derive(Default)]
pub struct StaticDirectory {
    providers: DashMap<String, Provider>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_provider(self, provider: Provider) -> Self {
        self.insert(provider);
        self
    }

    /// Insert or replace a provider.
    pub fn insert(&self, provider: Provider) {
        self.providers.insert(provider.provider_id.clone(), provider);
    }

    /// Change a provider's status. Returns false if the provider is unknown.
    pub fn set_status(&self, provider_id: &str, status: ProviderStatus) -> bool {
        match self.providers.get_mut(provider_id) {
            Some(mut provider) => {
                provider.status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ProviderDirectory for StaticDirectory {
    async fn resolve(&self, provider_id: &str) -> Result<Option<Provider>, DirectoryError> {
        Ok(self.providers.get(provider_id).map(|p| p.value().clone()))
    }
}
