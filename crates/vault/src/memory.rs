//! In-process vault backend. Default for a single-instance deployment and
//! the backend used throughout the test suites.

use std::collections::HashMap;

use {async_trait::async_trait, tokio::sync::RwLock};

use crate::{SecretVault, SecretVersion, VaultError};

/// Vault backed by a process-local map of version lists.
#[derive(Debug, Default)]
pub struct MemoryVault {
    slots: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions written to a slot so far (0 if never written).
    pub async fn version_count(&self, name: &str) -> u64 {
        self.slots
            .read()
            .await
            .get(name)
            .map(|v| v.len() as u64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl SecretVault for MemoryVault {
    async fn read_latest(&self, name: &str) -> Result<SecretVersion, VaultError> {
        let slots = self.slots.read().await;
        slots
            .get(name)
            .and_then(|versions| {
                versions.last().map(|value| SecretVersion {
                    version: versions.len() as u64,
                    value: value.clone(),
                })
            })
            .ok_or_else(|| VaultError::NotFound(name.to_string()))
    }

    async fn write_new_version(&self, name: &str, value: &str) -> Result<u64, VaultError> {
        let mut slots = self.slots.write().await;
        let versions = slots.entry(name.to_string()).or_default();
        versions.push(value.to_string());
        Ok(versions.len() as u64)
    }
}
