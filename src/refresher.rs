use async_trait::async_trait;

use crate::errors::Error;

/// Acquires a new bearer token when the current one is absent or rejected.
///
/// The concrete wire call lives behind this seam; the dispatcher only needs a
/// token back on success, which it installs into the shared credential
/// itself. Implementations report a failed cycle with
/// [`Error::RefreshFailed`].
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, Error>;
}
