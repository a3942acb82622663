//! Versioned, append-only storage for durable credentials.
//!
//! A vault holds named slots. Every write to a slot creates a new immutable
//! version; versions are never mutated or deleted, so a failed rotation
//! always leaves the previous version readable and the slot doubles as an
//! audit trail.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use {file::FileVault, memory::MemoryVault};

#[derive(Debug, Error)]
pub enum VaultError {
    /// The named slot has never been written.
    #[error("secret slot {0:?} has no versions")]
    NotFound(String),
    /// The backing store could not be reached or read. Transient.
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

/// One immutable version of a named slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVersion {
    /// Monotonically increasing, starting at 1 for the first write.
    pub version: u64,
    pub value: String,
}

/// Append-only versioned secret storage.
///
/// `read_latest` is linearizable with respect to completed writes: it never
/// observes a half-written version, and always returns the highest version
/// written so far.
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Read the highest version of the named slot.
    async fn read_latest(&self, name: &str) -> Result<SecretVersion, VaultError>;

    /// Append a new version to the named slot and return its version number.
    ///
    /// Safe to retry: a duplicate retry creates an extra version with the
    /// same value, which is harmless. The store never deduplicates.
    async fn write_new_version(&self, name: &str, value: &str) -> Result<u64, VaultError>;
}
