//! Startup-time backend selection
//!
//! Backends are joined through an explicit lookup table built at
//! composition time, keyed by backend name. There is no runtime
//! scanning: a backend that is not registered here does not exist.

use crate::error::{RegistryError, Result};
use crate::repository::RegisterRepository;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory producing a fresh repository for one backend.
pub type BackendFactory = Box<dyn Fn() -> Arc<dyn RegisterRepository> + Send + Sync>;

/// Lookup table of registry backends keyed by name.
#[derive(Default)]
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Install a backend under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: BackendFactory) -> &mut Self {
        self.factories.insert(name.into(), factory);
        self
    }

    /// Instantiate the backend selected by configuration.
    pub fn create(&self, name: &str) -> Result<Arc<dyn RegisterRepository>> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory()),
            None => {
                let mut known: Vec<&str> = self.names();
                known.sort_unstable();
                Err(RegistryError::Configuration(format!(
                    "unknown registry backend `{}` (known: {})",
                    name,
                    known.join(", ")
                )))
            }
        }
    }

    /// Names of all installed backends, in arbitrary order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Whether a backend is installed under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegisterConfig;
    use crate::instance::ServiceInstance;
    use async_trait::async_trait;

    struct NullRepository;

    #[async_trait]
    impl RegisterRepository for NullRepository {
        async fn init(&self, _config: RegisterConfig) -> Result<()> {
            Ok(())
        }

        async fn persist_instance(&self, _instance: ServiceInstance) -> Result<()> {
            Ok(())
        }

        async fn select_instances(&self, _service_key: &str) -> Result<Vec<ServiceInstance>> {
            Ok(Vec::new())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_known_backend() {
        let mut backends = BackendRegistry::new();
        backends.register("null", Box::new(|| Arc::new(NullRepository)));

        assert!(backends.contains("null"));
        let repo = backends.create("null").unwrap();
        repo.init(RegisterConfig::new("http://localhost")).await.unwrap();
        assert!(repo.select_instances("anything").await.unwrap().is_empty());
    }

    #[test]
    fn test_unknown_backend_is_configuration_error() {
        let backends = BackendRegistry::new();
        let err = backends.create("eureka").err().unwrap();
        assert!(matches!(err, RegistryError::Configuration(_)));
    }

    #[test]
    fn test_register_replaces() {
        let mut backends = BackendRegistry::new();
        backends.register("null", Box::new(|| Arc::new(NullRepository)));
        backends.register("null", Box::new(|| Arc::new(NullRepository)));
        assert_eq!(backends.names(), vec!["null"]);
    }
}
