//! Eureka backend configuration
//!
//! Two configuration shapes meet here: the gateway's `RegisterConfig`
//! (endpoint list plus extension properties) and the
//! `LocalInstanceConfig` describing the machine and runtime the gateway
//! itself runs on. The latter is what descriptor building reads; it is
//! snapshotted (cloned) at the start of every registration so a
//! background refresh can never race a build in flight.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trellis_registry_api::{RegisterConfig, Result};

/// Extension property: registry namespace.
pub const PROP_NAMESPACE: &str = "namespace";
/// Extension property: seconds between lease renewals.
pub const PROP_LEASE_RENEWAL: &str = "leaseRenewalIntervalInSecs";
/// Extension property: seconds without renewal before the lease expires.
pub const PROP_LEASE_EXPIRATION: &str = "leaseExpirationDurationInSecs";

/// Lease timing submitted with every registration.
///
/// The registry's own expiry protocol consumes these; this backend only
/// carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Seconds between heartbeats
    #[serde(default = "default_renewal_interval")]
    pub renewal_interval_secs: u64,

    /// Seconds without a heartbeat before the registry drops the lease
    #[serde(default = "default_expiration_duration")]
    pub expiration_duration_secs: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            renewal_interval_secs: default_renewal_interval(),
            expiration_duration_secs: default_expiration_duration(),
        }
    }
}

/// Datacenter the local instance runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataCenterInfo {
    /// Plain machine with nothing platform-specific to report
    MyOwn,

    /// Cloud platform that can supply its own instance identity and a
    /// freshly resolved address
    Cloud {
        /// Platform name as reported to the registry
        name: String,

        /// Datacenter-unique instance id, when the platform has one
        instance_id: Option<String>,

        /// Up-to-date address kept by the platform, when it keeps one
        local_address: Option<String>,
    },
}

impl DataCenterInfo {
    /// Name reported to the registry.
    pub fn name(&self) -> &str {
        match self {
            DataCenterInfo::MyOwn => "MyOwn",
            DataCenterInfo::Cloud { name, .. } => name,
        }
    }

    /// The datacenter-unique id, if the platform supplies a non-empty one.
    pub fn unique_id(&self) -> Option<&str> {
        match self {
            DataCenterInfo::MyOwn => None,
            DataCenterInfo::Cloud { instance_id, .. } => {
                instance_id.as_deref().filter(|id| !id.is_empty())
            }
        }
    }

    /// The freshest address the platform knows, if non-empty.
    pub fn refreshed_address(&self) -> Option<&str> {
        match self {
            DataCenterInfo::MyOwn => None,
            DataCenterInfo::Cloud { local_address, .. } => {
                local_address.as_deref().filter(|addr| !addr.is_empty())
            }
        }
    }
}

impl Default for DataCenterInfo {
    fn default() -> Self {
        DataCenterInfo::MyOwn
    }
}

/// Snapshot of the local machine/runtime used to build descriptors.
///
/// Read-only environment as far as the repository is concerned; the
/// surrounding system populates it, `init` merges in the backend
/// extension properties, and every registration clones it before
/// overlaying the gateway's own instance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalInstanceConfig {
    /// Explicitly configured instance id, if any
    pub instance_id: Option<String>,

    /// Configured hostname; `None` falls back to the raw IP
    pub hostname: Option<String>,

    /// Raw IP address, the final address fallback
    pub ip_addr: String,

    /// Application name
    pub app_name: String,

    /// Application group, if any
    pub app_group: Option<String>,

    /// Datacenter descriptor
    #[serde(default)]
    pub data_center: DataCenterInfo,

    /// Insecure listening port
    pub port: u16,

    /// Whether the insecure port is advertised
    #[serde(default = "default_true")]
    pub port_enabled: bool,

    /// Secure listening port
    #[serde(default = "default_secure_port")]
    pub secure_port: u16,

    /// Whether the secure port is advertised
    #[serde(default)]
    pub secure_port_enabled: bool,

    /// Virtual-host-name template, resolved through the VIP resolver.
    /// Empty means "derive from address and port".
    #[serde(default)]
    pub vip_address_template: String,

    /// Secure virtual-host-name template; empty derives from the secure port
    #[serde(default)]
    pub secure_vip_address_template: String,

    /// Home page path
    #[serde(default = "default_home_page_path")]
    pub home_page_url_path: String,

    /// Status page path
    #[serde(default = "default_status_page_path")]
    pub status_page_url_path: String,

    /// Health check path
    #[serde(default = "default_health_check_path")]
    pub health_check_url_path: String,

    /// Auto-scaling-group name, if any
    pub asg_name: Option<String>,

    /// Lease timing
    #[serde(default)]
    pub lease: LeaseConfig,

    /// Arbitrary string metadata; entries with empty values are dropped
    /// at descriptor-build time
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Whether the instance may take traffic the moment it registers.
    /// `true` submits `UP`; `false` submits `STARTING` until a health
    /// check promotes it.
    #[serde(default = "default_true")]
    pub enabled_on_init: bool,

    /// Registry namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for LocalInstanceConfig {
    fn default() -> Self {
        Self {
            instance_id: None,
            hostname: None,
            ip_addr: "127.0.0.1".to_string(),
            app_name: "unknown".to_string(),
            app_group: None,
            data_center: DataCenterInfo::MyOwn,
            port: 80,
            port_enabled: true,
            secure_port: default_secure_port(),
            secure_port_enabled: false,
            vip_address_template: String::new(),
            secure_vip_address_template: String::new(),
            home_page_url_path: default_home_page_path(),
            status_page_url_path: default_status_page_path(),
            health_check_url_path: default_health_check_path(),
            asg_name: None,
            lease: LeaseConfig::default(),
            metadata: HashMap::new(),
            enabled_on_init: true,
            namespace: default_namespace(),
        }
    }
}

impl LocalInstanceConfig {
    /// Build a config from the local environment.
    ///
    /// Reads `TRELLIS_HOSTNAME`, then `HOSTNAME`; everything else takes
    /// the defaults and is expected to be filled in by the caller or by
    /// the instance record at registration time.
    pub fn from_environment() -> Self {
        let hostname = std::env::var("TRELLIS_HOSTNAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .ok()
            .filter(|h| !h.is_empty());

        Self {
            hostname,
            ..Default::default()
        }
    }

    /// Merge the backend extension properties of a `RegisterConfig`.
    pub fn apply_register_config(mut self, config: &RegisterConfig) -> Result<Self> {
        if let Some(namespace) = config.prop(PROP_NAMESPACE) {
            self.namespace = namespace.to_string();
        }
        if let Some(secs) = config.prop_u64(PROP_LEASE_RENEWAL)? {
            self.lease.renewal_interval_secs = secs;
        }
        if let Some(secs) = config.prop_u64(PROP_LEASE_EXPIRATION)? {
            self.lease.expiration_duration_secs = secs;
        }
        Ok(self)
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_secure_port() -> u16 {
    443
}

fn default_home_page_path() -> String {
    "/".to_string()
}

fn default_status_page_path() -> String {
    "/status".to_string()
}

fn default_health_check_path() -> String {
    "/healthcheck".to_string()
}

fn default_namespace() -> String {
    "eureka".to_string()
}

fn default_renewal_interval() -> u64 {
    30
}

fn default_expiration_duration() -> u64 {
    90
}
