//! Key/value store port: small string values that survive restarts.

use std::future::Future;

use castkeeper_domain::error::CastkeeperError;

/// Durable string storage keyed by name.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` if the key was never set.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CastkeeperError>> + Send;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str)
    -> impl Future<Output = Result<(), CastkeeperError>> + Send;

    /// Read a value, first storing `default` if the key was never set.
    fn get_or_init(
        &self,
        key: &str,
        default: &str,
    ) -> impl Future<Output = Result<String, CastkeeperError>> + Send {
        async move {
            if let Some(value) = self.get(key).await? {
                return Ok(value);
            }
            self.set(key, default).await?;
            Ok(default.to_string())
        }
    }
}
