//! Eureka-backed registration repository
//!
//! Owns the adapter lifecycle as an explicit state machine:
//!
//! ```text
//! Idle --init--> Configured --persist_instance--> Connected --close--> Idle
//! ```
//!
//! `init` is pure configuration and never touches the network; the
//! Configured → Connected transition happens inside `persist_instance`,
//! where the client factory opens the session that carries the
//! registration. Exactly one client handle exists between the first
//! successful `persist_instance` and `close`.

use crate::client::{ApplicationInfo, RegistryClient, RegistryClientFactory};
use crate::config::LocalInstanceConfig;
use crate::descriptor::InstanceDescriptor;
use crate::http::HttpClientFactory;
use crate::resolver::{TemplateVipResolver, VipAddressResolver};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use trellis_registry_api::{
    RegisterConfig, RegisterRepository, RegistryError, Result, ServiceInstance,
};

/// Configuration held between `init` and the connect transition.
#[derive(Debug, Clone)]
struct Configured {
    register: RegisterConfig,
    local: LocalInstanceConfig,
}

enum State {
    Idle,
    Configured(Configured),
    Connected {
        config: Configured,
        client: Arc<dyn RegistryClient>,
    },
}

/// Registration repository backed by a Eureka-style registry.
pub struct EurekaRegisterRepository {
    resolver: Arc<dyn VipAddressResolver>,
    factory: Arc<dyn RegistryClientFactory>,
    state: RwLock<State>,
}

impl EurekaRegisterRepository {
    /// Create a repository with explicit collaborators.
    ///
    /// Both are required: the composition root decides how virtual
    /// addresses resolve and how client sessions are opened. Tests pass
    /// fakes here; production code usually wants
    /// [`with_defaults`](Self::with_defaults).
    pub fn new(
        resolver: Arc<dyn VipAddressResolver>,
        factory: Arc<dyn RegistryClientFactory>,
    ) -> Self {
        Self {
            resolver,
            factory,
            state: RwLock::new(State::Idle),
        }
    }

    /// The named default composition: template VIP resolution and the
    /// HTTP client factory.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(TemplateVipResolver),
            Arc::new(HttpClientFactory::new()),
        )
    }
}

impl Default for EurekaRegisterRepository {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl RegisterRepository for EurekaRegisterRepository {
    async fn init(&self, config: RegisterConfig) -> Result<()> {
        let local = LocalInstanceConfig::from_environment().apply_register_config(&config)?;
        let configured = Configured {
            register: config,
            local,
        };

        let mut state = self.state.write().await;
        *state = match std::mem::replace(&mut *state, State::Idle) {
            // reconfiguring an open adapter keeps the handle; the next
            // persist_instance re-registers under the new configuration
            State::Connected { client, .. } => State::Connected {
                config: configured,
                client,
            },
            _ => State::Configured(configured),
        };
        info!("registry backend configured");
        Ok(())
    }

    async fn persist_instance(&self, instance: ServiceInstance) -> Result<()> {
        instance.validate()?;

        let mut state = self.state.write().await;
        let config = match &*state {
            State::Idle => {
                return Err(RegistryError::not_initialized(
                    "persist_instance",
                    "a prior `init`",
                ))
            }
            State::Configured(config) => config.clone(),
            State::Connected { config, .. } => config.clone(),
        };

        let endpoints = config.register.server_urls();
        if endpoints.is_empty() {
            return Err(RegistryError::Configuration(
                "serverLists is empty".into(),
            ));
        }

        // snapshot the environment, then overlay the gateway record:
        // the record's identity and address win over anything local
        let mut local = config.local.clone();
        local.app_name = instance.app_name.clone();
        local.hostname = Some(instance.host.clone());
        local.ip_addr = instance.host.clone();
        local.port = instance.port;

        let descriptor = InstanceDescriptor::from_config(&local, self.resolver.as_ref());
        debug!(
            id = %descriptor.instance_id,
            status = %descriptor.status,
            "built instance descriptor"
        );

        // one handle at a time: re-registration replaces the session
        if let State::Connected { client, .. } = &*state {
            let previous = client.clone();
            if let Err(err) = previous.shutdown().await {
                *state = State::Configured(config);
                return Err(err);
            }
        }

        match self
            .factory
            .connect(ApplicationInfo::new(descriptor), endpoints)
            .await
        {
            Ok(client) => {
                info!(%instance, "instance registered");
                *state = State::Connected { config, client };
                Ok(())
            }
            Err(err) => {
                *state = State::Configured(config);
                Err(err)
            }
        }
    }

    async fn select_instances(&self, service_key: &str) -> Result<Vec<ServiceInstance>> {
        let client = match &*self.state.read().await {
            State::Connected { client, .. } => client.clone(),
            _ => {
                return Err(RegistryError::Query(
                    "no registry client handle established; persist an instance first".into(),
                ))
            }
        };

        // any availability zone, both transports; zone filtering is not
        // exposed by this adapter
        let descriptors = client.instances_of(None, service_key, true).await?;
        let instances: Vec<ServiceInstance> = descriptors
            .iter()
            .map(|d| ServiceInstance::new(d.app_name.clone(), d.host_name.clone(), d.port))
            .collect();
        debug!(service_key, count = instances.len(), "selected instances");
        Ok(instances)
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.write().await;
        match std::mem::replace(&mut *state, State::Idle) {
            State::Connected { client, .. } => {
                // the state is already Idle: close is terminal even if
                // deregistration goes badly, and a fresh `init` is
                // required before the adapter can register again
                client.shutdown().await?;
                info!("registry client released");
                Ok(())
            }
            other => {
                *state = other;
                Err(RegistryError::not_initialized(
                    "close",
                    "a persisted instance",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Factory for lifecycle-error tests; connecting through it is a bug.
    struct UnreachableFactory;

    #[async_trait]
    impl RegistryClientFactory for UnreachableFactory {
        async fn connect(
            &self,
            _application: ApplicationInfo,
            _endpoints: Vec<String>,
        ) -> Result<Arc<dyn RegistryClient>> {
            panic!("connect must not be reached in this test");
        }
    }

    fn repository() -> EurekaRegisterRepository {
        EurekaRegisterRepository::new(Arc::new(TemplateVipResolver), Arc::new(UnreachableFactory))
    }

    #[tokio::test]
    async fn test_persist_without_init() {
        let repo = repository();
        let err = repo
            .persist_instance(ServiceInstance::new("gateway", "10.0.0.7", 9195))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotInitialized { .. }));
    }

    #[tokio::test]
    async fn test_close_without_persist() {
        let repo = repository();
        repo.init(RegisterConfig::new("http://localhost:8761/eureka"))
            .await
            .unwrap();
        let err = repo.close().await.unwrap_err();
        assert!(matches!(err, RegistryError::NotInitialized { .. }));
    }

    #[tokio::test]
    async fn test_select_without_handle_is_query_error() {
        let repo = repository();
        repo.init(RegisterConfig::new("http://localhost:8761/eureka"))
            .await
            .unwrap();
        let err = repo.select_instances("gateway").await.unwrap_err();
        assert!(matches!(err, RegistryError::Query(_)));
    }

    #[tokio::test]
    async fn test_empty_server_lists_surfaces_at_persist() {
        let repo = repository();
        repo.init(RegisterConfig::new("")).await.unwrap();
        let err = repo
            .persist_instance(ServiceInstance::new("gateway", "10.0.0.7", 9195))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_invalid_record_rejected_before_connect() {
        let repo = repository();
        repo.init(RegisterConfig::new("http://localhost:8761/eureka"))
            .await
            .unwrap();
        let err = repo
            .persist_instance(ServiceInstance::new("gateway", "10.0.0.7", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Registration(_)));
    }
}
