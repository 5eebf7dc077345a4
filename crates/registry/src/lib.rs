//! Trellis Registry - composition root for registry backends
//!
//! Pulls the backend-neutral contract and the available backends
//! together: [`default_backends`] builds the lookup table the gateway
//! selects its registry from at startup.
//!
//! ```no_run
//! use trellis_registry::{default_backends, RegisterConfig, ServiceInstance};
//!
//! # async fn run() -> trellis_registry::Result<()> {
//! let backends = default_backends();
//! let repository = backends.create("eureka")?;
//!
//! repository
//!     .init(RegisterConfig::new("http://registry:8761/eureka"))
//!     .await?;
//! repository
//!     .persist_instance(ServiceInstance::new("gateway", "10.0.0.7", 9195))
//!     .await?;
//! let peers = repository.select_instances("orders").await?;
//! # drop(peers);
//! repository.close().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub use trellis_registry_api::{
    BackendFactory, BackendRegistry, RegisterConfig, RegisterRepository, RegistryError, Result,
    ServiceInstance,
};
pub use trellis_registry_eureka as eureka;

/// The backend table with every bundled backend installed.
pub fn default_backends() -> BackendRegistry {
    let mut backends = BackendRegistry::new();
    trellis_registry_eureka::install(&mut backends);
    backends
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eureka_is_installed() {
        let backends = default_backends();
        assert!(backends.contains(eureka::BACKEND_NAME));
        assert!(backends.create("eureka").is_ok());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let backends = default_backends();
        assert!(matches!(
            backends.create("zookeeper"),
            Err(RegistryError::Configuration(_))
        ));
    }
}
