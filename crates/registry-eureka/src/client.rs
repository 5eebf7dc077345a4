//! Registry client seam
//!
//! The repository never talks to the wire directly; it goes through
//! these traits. A [`RegistryClientFactory`] performs the Configured →
//! Connected transition by opening a session bound to one application's
//! descriptor, and the resulting [`RegistryClient`] owns background
//! lease renewal until shut down. Tests substitute both with in-memory
//! fakes.

use crate::descriptor::InstanceDescriptor;
use async_trait::async_trait;
use std::sync::Arc;
use trellis_registry_api::Result;

/// The application identity a client session is bound to: the full
/// descriptor of the local instance, lease included.
#[derive(Debug, Clone)]
pub struct ApplicationInfo {
    /// Descriptor submitted at registration
    pub descriptor: InstanceDescriptor,
}

impl ApplicationInfo {
    pub fn new(descriptor: InstanceDescriptor) -> Self {
        Self { descriptor }
    }

    /// Application name the session registers under.
    pub fn app_name(&self) -> &str {
        &self.descriptor.app_name
    }

    /// Identity of the local instance within the application.
    pub fn instance_id(&self) -> &str {
        &self.descriptor.instance_id
    }
}

/// An open session with the registry.
///
/// Implementations run their own renewal heartbeat on an internal timer
/// and must stay safe for queries issued concurrently with it.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Instances registered under `app_name`, optionally narrowed to a
    /// virtual address. `secure` selects which VIP namespace the
    /// narrowing applies to; it has no effect when `vip_address` is
    /// `None`.
    async fn instances_of(
        &self,
        vip_address: Option<&str>,
        app_name: &str,
        secure: bool,
    ) -> Result<Vec<InstanceDescriptor>>;

    /// Stop background renewal and deregister. Deterministic: when this
    /// returns, no heartbeat task is running. Called exactly once per
    /// session; the repository enforces that.
    async fn shutdown(&self) -> Result<()>;
}

/// Opens registry client sessions.
///
/// Registration is triggered by session construction; there is no
/// separate register call. The endpoint list is used verbatim,
/// whatever zone the caller imagines itself in.
#[async_trait]
pub trait RegistryClientFactory: Send + Sync {
    async fn connect(
        &self,
        application: ApplicationInfo,
        endpoints: Vec<String>,
    ) -> Result<Arc<dyn RegistryClient>>;
}
