//! Gateway-native instance record

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};

/// One running process of a named service, as the gateway sees it.
///
/// This is the minimal record exchanged across the registration
/// contract. Backends translate it to and from their own richer
/// descriptor model; callers only ever deal in identity and address.
/// Immutable once handed to a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Application name the instance is registered under
    pub app_name: String,

    /// IP address or resolvable hostname
    pub host: String,

    /// Listening port
    pub port: u16,
}

impl ServiceInstance {
    /// Create a new instance record.
    pub fn new(app_name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            app_name: app_name.into(),
            host: host.into(),
            port,
        }
    }

    /// Check the record is complete enough to register.
    ///
    /// Ports are `u16`, so the upper bound holds by construction; only
    /// zero is rejected here.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() {
            return Err(RegistryError::Registration(
                "instance has an empty app name".into(),
            ));
        }
        if self.host.is_empty() {
            return Err(RegistryError::Registration(format!(
                "instance `{}` has an empty host",
                self.app_name
            )));
        }
        if self.port == 0 {
            return Err(RegistryError::Registration(format!(
                "instance `{}` has port 0",
                self.app_name
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.app_name, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_instance() {
        let instance = ServiceInstance::new("gateway", "10.0.0.7", 9195);
        assert!(instance.validate().is_ok());
        assert_eq!(instance.to_string(), "gateway@10.0.0.7:9195");
    }

    #[test]
    fn test_empty_fields_rejected() {
        assert!(ServiceInstance::new("", "10.0.0.7", 9195).validate().is_err());
        assert!(ServiceInstance::new("gateway", "", 9195).validate().is_err());
        assert!(ServiceInstance::new("gateway", "10.0.0.7", 0)
            .validate()
            .is_err());
    }
}
