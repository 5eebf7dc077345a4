//! Trellis Registry - Eureka-style backend
//!
//! Implements the [`RegisterRepository`] contract against a
//! Eureka-style service registry:
//!
//! - **EurekaRegisterRepository**: the adapter lifecycle (Idle →
//!   Configured → Connected)
//! - **InstanceDescriptor**: translation between the gateway's minimal
//!   record and the registry's richer instance model
//! - **RegistryClient / RegistryClientFactory**: the seam to the
//!   registry's wire protocol, with an HTTP implementation that owns
//!   lease renewal
//!
//! The registry's replication, expiry, and gossip protocols stay on the
//! other side of the client seam.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod client;
pub mod config;
pub mod descriptor;
pub mod http;
pub mod repository;
pub mod resolver;

// Re-exports
pub use client::{ApplicationInfo, RegistryClient, RegistryClientFactory};
pub use config::{DataCenterInfo, LeaseConfig, LocalInstanceConfig};
pub use descriptor::{InstanceDescriptor, InstanceStatus, LeaseInfo};
pub use http::{HttpClientFactory, HttpRegistryClient};
pub use repository::EurekaRegisterRepository;
pub use resolver::{TemplateVipResolver, VipAddressResolver};

use std::sync::Arc;
use trellis_registry_api::{BackendRegistry, RegisterRepository};

/// Name this backend is selected by.
pub const BACKEND_NAME: &str = "eureka";

/// Install this backend into a lookup table under [`BACKEND_NAME`],
/// composed with its default resolver and HTTP client factory.
pub fn install(backends: &mut BackendRegistry) {
    backends.register(
        BACKEND_NAME,
        Box::new(|| {
            Arc::new(EurekaRegisterRepository::with_defaults()) as Arc<dyn RegisterRepository>
        }),
    );
}
