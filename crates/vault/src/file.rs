//! File-based vault backend: one JSON file holding every slot's full
//! version history, written whole on each append and chmod'd 0600 on Unix.

use std::{collections::HashMap, path::PathBuf};

use {async_trait::async_trait, tokio::sync::Mutex, tracing::debug};

use crate::{SecretVault, SecretVersion, VaultError};

/// Vault persisted to a single JSON file.
///
/// The file maps slot names to version arrays (index 0 = version 1). A
/// process-local mutex serializes read-modify-write cycles; the whole file
/// is rewritten on every append, which keeps partially written versions
/// from ever being observable by `read_latest`.
#[derive(Debug)]
pub struct FileVault {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileVault {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, Vec<String>>, VaultError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            // A vault file that does not exist yet simply has no slots.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(VaultError::Unavailable(e.to_string())),
        };
        serde_json::from_str(&raw).map_err(|e| VaultError::Unavailable(e.to_string()))
    }

    fn store(&self, slots: &HashMap<String, Vec<String>>) -> Result<(), VaultError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VaultError::Unavailable(e.to_string()))?;
        }
        let data = serde_json::to_string_pretty(slots)
            .map_err(|e| VaultError::Unavailable(e.to_string()))?;
        std::fs::write(&self.path, &data).map_err(|e| VaultError::Unavailable(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| VaultError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl SecretVault for FileVault {
    async fn read_latest(&self, name: &str) -> Result<SecretVersion, VaultError> {
        let slots = self.load()?;
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
        let _guard = self.write_lock.lock().await;
        let mut slots = self.load()?;
        let versions = slots.entry(name.to_string()).or_default();
        versions.push(value.to_string());
        let version = versions.len() as u64;
        self.store(&slots)?;
        debug!(name, version, "secret version appended");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault_in(dir: &tempfile::TempDir) -> FileVault {
        FileVault::new(dir.path().join("vault.json"))
    }

    #[tokio::test]
    async fn missing_file_reads_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(&dir);
        assert!(matches!(
            vault.read_latest("refresh").await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn versions_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");

        let vault = FileVault::new(path.clone());
        assert_eq!(vault.write_new_version("refresh", "r1").await.unwrap(), 1);
        assert_eq!(vault.write_new_version("refresh", "r2").await.unwrap(), 2);

        let reopened = FileVault::new(path);
        let latest = reopened.read_latest("refresh").await.unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.value, "r2");
    }

    #[tokio::test]
    async fn corrupt_file_is_unavailable_not_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        std::fs::write(&path, "{not json").unwrap();

        let vault = FileVault::new(path);
        assert!(matches!(
            vault.read_latest("refresh").await,
            Err(VaultError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn vault_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let vault = FileVault::new(path.clone());
        vault.write_new_version("refresh", "r1").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
