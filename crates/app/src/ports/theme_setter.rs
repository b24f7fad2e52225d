//! Theme setter port: apply a frontend theme.

use std::future::Future;

use castkeeper_domain::error::CastkeeperError;
use castkeeper_domain::theme::ThemeMode;

/// Applies a named frontend theme for one appearance mode.
pub trait ThemeSetter: Send + Sync {
    /// Use theme `name` whenever the frontend is in `mode`.
    fn set_theme(
        &self,
        mode: ThemeMode,
        name: &str,
    ) -> impl Future<Output = Result<(), CastkeeperError>> + Send;
}
