//! The backend-neutral registration contract

use crate::config::RegisterConfig;
use crate::error::Result;
use crate::instance::ServiceInstance;
use async_trait::async_trait;

/// Registration repository implemented by every registry backend.
///
/// Required call order: [`init`](Self::init), then
/// [`persist_instance`](Self::persist_instance) zero or more times (in
/// practice once), [`select_instances`](Self::select_instances) freely
/// interleaved, and finally [`close`](Self::close). The repository owns
/// the lifetime of exactly one client handle to the backing registry,
/// opened on first registration and released on close.
///
/// Repositories add no internal synchronization beyond what the
/// lifecycle demands; the underlying registry client must be safe for
/// query-while-heartbeating.
#[async_trait]
pub trait RegisterRepository: Send + Sync {
    /// Store endpoint and backend configuration.
    ///
    /// Never contacts the network; configuration problems surface on
    /// first use. Calling again replaces the previous configuration
    /// wholesale (last write wins).
    async fn init(&self, config: RegisterConfig) -> Result<()>;

    /// Register `instance` with the remote registry.
    ///
    /// Builds a full registry-native descriptor, opens the client
    /// handle on first call, and submits the registration. Failures are
    /// not retried here; the caller owns retry policy.
    async fn persist_instance(&self, instance: ServiceInstance) -> Result<()>;

    /// All instances registered under `service_key`, projected down to
    /// the gateway record shape.
    ///
    /// An unknown key with a live handle is an empty result, not an
    /// error.
    async fn select_instances(&self, service_key: &str) -> Result<Vec<ServiceInstance>>;

    /// Deregister the local instance and release the client handle.
    ///
    /// Terminal: the handle reference is cleared, so a second call is a
    /// caller error and fails.
    async fn close(&self) -> Result<()>;
}
