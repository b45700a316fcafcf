use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;

use crate::error::BoxError;

/// Durable key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Durable key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Durable key for the registration token.
pub const REGISTRATION_TOKEN_KEY: &str = "registrationToken";

/// Host-provided durable key-value storage.
///
/// Survives process restarts and is the recovery source for the in-memory
/// access token. Shared by every caller without locking; last write wins.
///
/// # Example
///
/// ```rust,ignore
/// impl TokenStorage for SecureStore {
///     async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
///         Ok(self.keychain.read(key)?)
///     }
///
///     async fn set(&self, key: &str, value: &str) -> Result<(), BoxError> {
///         Ok(self.keychain.write(key, value)?)
///     }
///
///     async fn remove(&self, key: &str) -> Result<(), BoxError> {
///         Ok(self.keychain.delete(key)?)
///     }
/// }
/// ```
pub trait TokenStorage: Send + Sync + 'static {
    /// Read a value. Missing keys (and empty values) are `None`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), BoxError>> + Send;

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Process-local storage, for tests and hosts without a durable store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous read, handy for assertions.
    #[must_use]
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

impl TokenStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        Ok(self.snapshot(key).filter(|v| !v.is_empty()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BoxError> {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), BoxError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
