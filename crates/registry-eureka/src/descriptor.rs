//! Registry-native instance descriptor and its builder
//!
//! The descriptor is the full representation the registry stores for an
//! instance, as opposed to the gateway's minimal record. It is built
//! fresh for every registration from a [`LocalInstanceConfig`] snapshot
//! and never mutated afterwards; any update means re-registering.

use crate::config::{DataCenterInfo, LeaseConfig, LocalInstanceConfig};
use crate::resolver::VipAddressResolver;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Advertised lifecycle status of a registered instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// Registered but not yet ready for traffic
    Starting,
    /// Ready for traffic
    Up,
    /// Failing and not taking traffic
    Down,
    /// Deliberately withdrawn from routing
    OutOfService,
    /// Status could not be determined
    Unknown,
}

impl InstanceStatus {
    /// Parse the registry's wire form; anything unrecognized maps to
    /// `Unknown` rather than failing the whole response.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "STARTING" => InstanceStatus::Starting,
            "UP" => InstanceStatus::Up,
            "DOWN" => InstanceStatus::Down,
            "OUT_OF_SERVICE" => InstanceStatus::OutOfService,
            _ => InstanceStatus::Unknown,
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceStatus::Starting => "STARTING",
            InstanceStatus::Up => "UP",
            InstanceStatus::Down => "DOWN",
            InstanceStatus::OutOfService => "OUT_OF_SERVICE",
            InstanceStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Lease timing attached to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseInfo {
    /// Seconds between renewals
    pub renewal_interval_secs: u64,

    /// Seconds without renewal before expiry
    pub duration_secs: u64,
}

impl From<LeaseConfig> for LeaseInfo {
    fn from(lease: LeaseConfig) -> Self {
        Self {
            renewal_interval_secs: lease.renewal_interval_secs,
            duration_secs: lease.expiration_duration_secs,
        }
    }
}

/// Full registry-native representation of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    /// Instance identity within the app
    pub instance_id: String,

    /// Application name
    pub app_name: String,

    /// Application group, if any
    pub app_group: Option<String>,

    /// Raw IP address
    pub ip_addr: String,

    /// Resolved hostname / default address
    pub host_name: String,

    /// Insecure port
    pub port: u16,

    /// Whether the insecure port is advertised
    pub port_enabled: bool,

    /// Secure port
    pub secure_port: u16,

    /// Whether the secure port is advertised
    pub secure_port_enabled: bool,

    /// Resolved virtual-host name
    pub vip_address: String,

    /// Resolved secure virtual-host name
    pub secure_vip_address: String,

    /// Absolute home page URL
    pub home_page_url: String,

    /// Absolute status page URL
    pub status_page_url: String,

    /// Absolute health check URL
    pub health_check_url: String,

    /// Absolute health check URL over the secure port, when enabled
    pub secure_health_check_url: Option<String>,

    /// Auto-scaling-group name, if any
    pub asg_name: Option<String>,

    /// Datacenter descriptor
    pub data_center: DataCenterInfo,

    /// Registry namespace
    pub namespace: String,

    /// Lease timing
    pub lease: LeaseInfo,

    /// User metadata; values are never empty (empty entries are dropped
    /// at build time)
    pub metadata: HashMap<String, String>,

    /// Advertised status
    pub status: InstanceStatus,
}

impl InstanceDescriptor {
    /// Translate a local config snapshot into a descriptor.
    ///
    /// Pure apart from a status log line: reads only the snapshot it is
    /// given. Identity and address follow deterministic fallback chains:
    ///
    /// - id: explicit configured id, else datacenter-unique id, else
    ///   hostname, else raw IP; never empty
    /// - address: datacenter-refreshed address, else configured
    ///   hostname, else raw IP; advancing only past null/empty sources
    ///
    /// Metadata values that are empty are dropped: the registry model
    /// distinguishes absence from empty-string, and this backend
    /// normalizes to absence. (`None` values are unrepresentable in the
    /// config's `HashMap<String, String>`, so the empty filter is the
    /// whole rule.)
    pub fn from_config(config: &LocalInstanceConfig, resolver: &dyn VipAddressResolver) -> Self {
        let instance_id = resolve_instance_id(config);
        let address = resolve_address(config);

        // STARTING keeps traffic away until a health check promotes the
        // instance; UP is submitted only when the config opts in.
        let status = if config.enabled_on_init {
            InstanceStatus::Up
        } else {
            InstanceStatus::Starting
        };
        debug!(%status, instance_id = %instance_id, "computed initial instance status");

        let vip_address = if config.vip_address_template.is_empty() {
            format!("{}:{}", address, config.port)
        } else {
            resolver.resolve(&config.vip_address_template, config)
        };
        let secure_vip_address = if config.secure_vip_address_template.is_empty() {
            format!("{}:{}", address, config.secure_port)
        } else {
            resolver.resolve(&config.secure_vip_address_template, config)
        };

        let metadata: HashMap<String, String> = config
            .metadata
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let secure_health_check_url = config.secure_port_enabled.then(|| {
            absolute_url(
                "https",
                &address,
                config.secure_port,
                &config.health_check_url_path,
            )
        });

        Self {
            instance_id,
            app_name: config.app_name.clone(),
            app_group: config.app_group.clone(),
            ip_addr: config.ip_addr.clone(),
            host_name: address.clone(),
            port: config.port,
            port_enabled: config.port_enabled,
            secure_port: config.secure_port,
            secure_port_enabled: config.secure_port_enabled,
            vip_address,
            secure_vip_address,
            home_page_url: absolute_url("http", &address, config.port, &config.home_page_url_path),
            status_page_url: absolute_url(
                "http",
                &address,
                config.port,
                &config.status_page_url_path,
            ),
            health_check_url: absolute_url(
                "http",
                &address,
                config.port,
                &config.health_check_url_path,
            ),
            secure_health_check_url,
            asg_name: config.asg_name.clone(),
            data_center: config.data_center.clone(),
            namespace: config.namespace.clone(),
            lease: config.lease.into(),
            metadata,
            status,
        }
    }
}

/// Identity precedence: explicit config id, datacenter-unique id,
/// hostname, raw IP.
fn resolve_instance_id(config: &LocalInstanceConfig) -> String {
    if let Some(id) = config.instance_id.as_deref().filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    if let Some(id) = config.data_center.unique_id() {
        return id.to_string();
    }
    if let Some(hostname) = config.hostname.as_deref().filter(|h| !h.is_empty()) {
        return hostname.to_string();
    }
    config.ip_addr.clone()
}

/// Address precedence: datacenter-refreshed, configured hostname, raw IP.
fn resolve_address(config: &LocalInstanceConfig) -> String {
    if let Some(address) = config.data_center.refreshed_address() {
        return address.to_string();
    }
    if let Some(hostname) = config.hostname.as_deref().filter(|h| !h.is_empty()) {
        return hostname.to_string();
    }
    config.ip_addr.clone()
}

fn absolute_url(scheme: &str, host: &str, port: u16, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        // already absolute, configured as a full URL
        return path.to_string();
    }
    let sep = if path.starts_with('/') { "" } else { "/" };
    format!("{}://{}:{}{}{}", scheme, host, port, sep, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::TemplateVipResolver;

    fn cloud(instance_id: Option<&str>, local_address: Option<&str>) -> DataCenterInfo {
        DataCenterInfo::Cloud {
            name: "Amazon".to_string(),
            instance_id: instance_id.map(str::to_string),
            local_address: local_address.map(str::to_string),
        }
    }

    fn base_config() -> LocalInstanceConfig {
        LocalInstanceConfig {
            app_name: "gateway".to_string(),
            ip_addr: "10.0.0.7".to_string(),
            port: 9195,
            ..Default::default()
        }
    }

    fn build(config: &LocalInstanceConfig) -> InstanceDescriptor {
        InstanceDescriptor::from_config(config, &TemplateVipResolver)
    }

    #[test]
    fn test_id_precedence_explicit_wins() {
        let mut config = base_config();
        config.instance_id = Some("configured-id".to_string());
        config.data_center = cloud(Some("i-0abc"), None);
        config.hostname = Some("gw-1".to_string());
        assert_eq!(build(&config).instance_id, "configured-id");
    }

    #[test]
    fn test_id_precedence_datacenter_over_hostname() {
        let mut config = base_config();
        config.data_center = cloud(Some("i-0abc"), None);
        config.hostname = Some("gw-1".to_string());
        assert_eq!(build(&config).instance_id, "i-0abc");
    }

    #[test]
    fn test_id_precedence_explicit_over_datacenter() {
        let mut config = base_config();
        config.instance_id = Some("configured-id".to_string());
        config.data_center = cloud(Some("i-0abc"), None);
        assert_eq!(build(&config).instance_id, "configured-id");
    }

    #[test]
    fn test_id_falls_back_to_hostname_then_ip() {
        let mut config = base_config();
        config.hostname = Some("gw-1".to_string());
        assert_eq!(build(&config).instance_id, "gw-1");

        config.hostname = None;
        assert_eq!(build(&config).instance_id, "10.0.0.7");
    }

    #[test]
    fn test_empty_explicit_id_is_absent() {
        let mut config = base_config();
        config.instance_id = Some(String::new());
        config.hostname = Some("gw-1".to_string());
        assert_eq!(build(&config).instance_id, "gw-1");
    }

    #[test]
    fn test_address_refreshed_wins() {
        let mut config = base_config();
        config.data_center = cloud(None, Some("172.16.0.9"));
        config.hostname = Some("gw-1".to_string());
        assert_eq!(build(&config).host_name, "172.16.0.9");
    }

    #[test]
    fn test_address_hostname_when_no_refresh() {
        let mut config = base_config();
        config.data_center = cloud(None, Some(""));
        config.hostname = Some("gw-1".to_string());
        assert_eq!(build(&config).host_name, "gw-1");
    }

    #[test]
    fn test_address_raw_ip_last() {
        let config = base_config();
        assert_eq!(build(&config).host_name, "10.0.0.7");
    }

    #[test]
    fn test_metadata_empty_values_dropped() {
        let mut config = base_config();
        config.metadata.insert("a".to_string(), String::new());
        config.metadata.insert("b".to_string(), "x".to_string());

        let descriptor = build(&config);
        assert_eq!(descriptor.metadata.len(), 1);
        assert_eq!(descriptor.metadata.get("b").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_status_follows_enabled_on_init() {
        let mut config = base_config();
        assert_eq!(build(&config).status, InstanceStatus::Up);

        config.enabled_on_init = false;
        assert_eq!(build(&config).status, InstanceStatus::Starting);
    }

    #[test]
    fn test_vip_derived_when_template_empty() {
        let mut config = base_config();
        config.hostname = Some("gw-1".to_string());
        let descriptor = build(&config);
        assert_eq!(descriptor.vip_address, "gw-1:9195");
        assert_eq!(descriptor.secure_vip_address, "gw-1:443");
    }

    #[test]
    fn test_vip_template_resolved() {
        let mut config = base_config();
        config.vip_address_template = "${appname}.svc.local".to_string();
        assert_eq!(build(&config).vip_address, "gateway.svc.local");
    }

    #[test]
    fn test_urls_and_lease() {
        let mut config = base_config();
        config.hostname = Some("gw-1".to_string());
        config.lease.renewal_interval_secs = 10;
        config.lease.expiration_duration_secs = 40;
        config.secure_port_enabled = true;

        let descriptor = build(&config);
        assert_eq!(descriptor.home_page_url, "http://gw-1:9195/");
        assert_eq!(descriptor.status_page_url, "http://gw-1:9195/status");
        assert_eq!(descriptor.health_check_url, "http://gw-1:9195/healthcheck");
        assert_eq!(
            descriptor.secure_health_check_url.as_deref(),
            Some("https://gw-1:443/healthcheck")
        );
        assert_eq!(descriptor.lease.renewal_interval_secs, 10);
        assert_eq!(descriptor.lease.duration_secs, 40);
    }

    #[test]
    fn test_status_wire_form() {
        assert_eq!(
            serde_json::to_string(&InstanceStatus::OutOfService).unwrap(),
            "\"OUT_OF_SERVICE\""
        );
        assert_eq!(InstanceStatus::OutOfService.to_string(), "OUT_OF_SERVICE");
    }
}
