//! HTTP registry client
//!
//! Default [`RegistryClient`] implementation against the registry's
//! REST surface. Registration happens inside
//! [`HttpClientFactory::connect`]; the resulting client keeps the lease
//! alive with a background heartbeat task until shut down.
//!
//! The registry's replication and expiry protocols are its own business;
//! this module only speaks the instance-facing endpoints:
//! `POST apps/{app}`, `PUT apps/{app}/{id}`, `DELETE apps/{app}/{id}`,
//! `GET apps/{app}`.

use crate::client::{ApplicationInfo, RegistryClient, RegistryClientFactory};
use crate::descriptor::InstanceDescriptor;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trellis_registry_api::{RegistryError, Result};

/// Opens HTTP client sessions.
///
/// Endpoints are tried in configured order; the first one that accepts
/// the registration becomes the session's home and is used for
/// heartbeats, queries, and deregistration.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    timeout: Duration,
}

impl HttpClientFactory {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryClientFactory for HttpClientFactory {
    async fn connect(
        &self,
        application: ApplicationInfo,
        endpoints: Vec<String>,
    ) -> Result<Arc<dyn RegistryClient>> {
        if endpoints.is_empty() {
            return Err(RegistryError::Registration(
                "no registry endpoints to register against".into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| {
                RegistryError::Registration(format!("failed to build http client: {}", err))
            })?;

        let body = wire::RegisterBody {
            instance: wire::WireInstance::from_descriptor(&application.descriptor),
        };
        let app_name = application.app_name().to_string();
        let instance_id = application.instance_id().to_string();

        let mut home = None;
        for endpoint in &endpoints {
            let base = endpoint.trim_end_matches('/').to_string();
            let url = format!("{}/apps/{}", base, app_name);
            match http.post(&url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(endpoint = %base, app = %app_name, instance = %instance_id, "registered with registry");
                    home = Some(base);
                    break;
                }
                Ok(resp) => {
                    warn!(endpoint = %base, status = %resp.status(), "registry rejected registration");
                }
                Err(err) => {
                    warn!(endpoint = %base, error = %err, "registry endpoint unreachable");
                }
            }
        }
        let base_url = home.ok_or_else(|| {
            RegistryError::Registration(format!(
                "none of the {} configured registry endpoints accepted the registration",
                endpoints.len()
            ))
        })?;

        let renewal = Duration::from_secs(
            application
                .descriptor
                .lease
                .renewal_interval_secs
                .max(1),
        );
        let heartbeat_url = format!("{}/apps/{}/{}", base_url, app_name, instance_id);
        let heartbeat = tokio::spawn(heartbeat_loop(http.clone(), heartbeat_url, renewal));

        Ok(Arc::new(HttpRegistryClient {
            http,
            base_url,
            app_name,
            instance_id,
            heartbeat: Mutex::new(Some(heartbeat)),
        }))
    }
}

/// One open HTTP session with the registry.
pub struct HttpRegistryClient {
    http: reqwest::Client,
    base_url: String,
    app_name: String,
    instance_id: String,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl HttpRegistryClient {
    fn instance_url(&self) -> String {
        format!("{}/apps/{}/{}", self.base_url, self.app_name, self.instance_id)
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn instances_of(
        &self,
        vip_address: Option<&str>,
        app_name: &str,
        secure: bool,
    ) -> Result<Vec<InstanceDescriptor>> {
        let url = format!("{}/apps/{}", self.base_url, app_name);
        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| RegistryError::Query(format!("registry query failed: {}", err)))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            // unknown application: nothing registered, not an error
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(RegistryError::Query(format!(
                "registry query for `{}` returned {}",
                app_name,
                resp.status()
            )));
        }

        let payload: wire::ApplicationResponse = resp
            .json()
            .await
            .map_err(|err| RegistryError::Query(format!("malformed registry response: {}", err)))?;

        let mut descriptors: Vec<InstanceDescriptor> = payload
            .application
            .instance
            .into_iter()
            .map(wire::WireInstance::into_descriptor)
            .collect();

        if let Some(vip) = vip_address {
            descriptors.retain(|d| {
                if secure {
                    d.secure_vip_address == vip
                } else {
                    d.vip_address == vip
                }
            });
        }
        debug!(app = %app_name, count = descriptors.len(), "registry query");
        Ok(descriptors)
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(handle) = self.heartbeat.lock().await.take() {
            handle.abort();
            // wait the task out so no renewal PUT is in flight when the
            // deregistration DELETE goes out
            let _ = handle.await;
        }

        // Best-effort deregistration: if the registry is unreachable the
        // lease expires on its own once heartbeats stop.
        match self.http.delete(self.instance_url()).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(app = %self.app_name, instance = %self.instance_id, "deregistered from registry");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "registry rejected deregistration");
            }
            Err(err) => {
                warn!(error = %err, "deregistration failed; lease will expire");
            }
        }
        Ok(())
    }
}

async fn heartbeat_loop(http: reqwest::Client, url: String, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // the registration itself counts as the first renewal
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match http.put(&url).send().await {
            Ok(resp) if resp.status().is_success() => debug!(url = %url, "lease renewed"),
            Ok(resp) => warn!(url = %url, status = %resp.status(), "lease renewal rejected"),
            Err(err) => warn!(url = %url, error = %err, "lease renewal failed"),
        }
    }
}

mod wire {
    //! Wire DTOs for the registry's JSON encoding.
    //!
    //! Ports travel as `{"$": 9195, "@enabled": "true"}` objects and some
    //! servers send `$` as a string, so decoding is lenient where the
    //! encoding in the wild varies.

    use crate::config::DataCenterInfo;
    use crate::descriptor::{InstanceDescriptor, InstanceStatus, LeaseInfo};
    use serde::{Deserialize, Deserializer, Serialize};
    use std::collections::HashMap;

    const DEFAULT_DATA_CENTER_CLASS: &str =
        "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo";
    const AMAZON_DATA_CENTER_CLASS: &str = "com.netflix.appinfo.AmazonInfo";

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct RegisterBody {
        pub instance: WireInstance,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ApplicationResponse {
        pub application: WireApplication,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct WireApplication {
        #[allow(dead_code)]
        pub name: String,
        #[serde(default, deserialize_with = "one_or_many")]
        pub instance: Vec<WireInstance>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct WireInstance {
        pub instance_id: String,
        pub host_name: String,
        pub app: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub app_group_name: Option<String>,
        pub ip_addr: String,
        pub status: String,
        pub port: WirePort,
        pub secure_port: WirePort,
        pub vip_address: String,
        pub secure_vip_address: String,
        pub home_page_url: String,
        pub status_page_url: String,
        pub health_check_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub secure_health_check_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub asg_name: Option<String>,
        pub data_center_info: WireDataCenter,
        pub lease_info: WireLease,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        pub metadata: HashMap<String, String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct WirePort {
        #[serde(rename = "$", deserialize_with = "lenient_u16")]
        pub value: u16,
        #[serde(rename = "@enabled")]
        pub enabled: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct WireDataCenter {
        #[serde(rename = "@class")]
        pub class: String,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct WireLease {
        pub renewal_interval_in_secs: u64,
        pub duration_in_secs: u64,
    }

    impl WireInstance {
        pub fn from_descriptor(d: &InstanceDescriptor) -> Self {
            Self {
                instance_id: d.instance_id.clone(),
                host_name: d.host_name.clone(),
                app: d.app_name.clone(),
                app_group_name: d.app_group.clone(),
                ip_addr: d.ip_addr.clone(),
                status: d.status.to_string(),
                port: WirePort {
                    value: d.port,
                    enabled: d.port_enabled.to_string(),
                },
                secure_port: WirePort {
                    value: d.secure_port,
                    enabled: d.secure_port_enabled.to_string(),
                },
                vip_address: d.vip_address.clone(),
                secure_vip_address: d.secure_vip_address.clone(),
                home_page_url: d.home_page_url.clone(),
                status_page_url: d.status_page_url.clone(),
                health_check_url: d.health_check_url.clone(),
                secure_health_check_url: d.secure_health_check_url.clone(),
                asg_name: d.asg_name.clone(),
                data_center_info: WireDataCenter::from(&d.data_center),
                lease_info: WireLease {
                    renewal_interval_in_secs: d.lease.renewal_interval_secs,
                    duration_in_secs: d.lease.duration_secs,
                },
                metadata: d.metadata.clone(),
            }
        }

        pub fn into_descriptor(self) -> InstanceDescriptor {
            InstanceDescriptor {
                instance_id: self.instance_id,
                app_name: self.app,
                app_group: self.app_group_name,
                ip_addr: self.ip_addr,
                host_name: self.host_name,
                port: self.port.value,
                port_enabled: self.port.enabled == "true",
                secure_port: self.secure_port.value,
                secure_port_enabled: self.secure_port.enabled == "true",
                vip_address: self.vip_address,
                secure_vip_address: self.secure_vip_address,
                home_page_url: self.home_page_url,
                status_page_url: self.status_page_url,
                health_check_url: self.health_check_url,
                secure_health_check_url: self.secure_health_check_url,
                asg_name: self.asg_name,
                data_center: self.data_center_info.into_data_center(),
                // the wire carries no namespace; queries do not need one
                namespace: String::new(),
                lease: LeaseInfo {
                    renewal_interval_secs: self.lease_info.renewal_interval_in_secs,
                    duration_secs: self.lease_info.duration_in_secs,
                },
                metadata: self.metadata,
                status: InstanceStatus::from_wire(&self.status),
            }
        }
    }

    impl From<&DataCenterInfo> for WireDataCenter {
        fn from(dc: &DataCenterInfo) -> Self {
            match dc {
                DataCenterInfo::MyOwn => Self {
                    class: DEFAULT_DATA_CENTER_CLASS.to_string(),
                    name: "MyOwn".to_string(),
                },
                DataCenterInfo::Cloud { name, .. } => Self {
                    class: AMAZON_DATA_CENTER_CLASS.to_string(),
                    name: name.clone(),
                },
            }
        }
    }

    impl WireDataCenter {
        fn into_data_center(self) -> DataCenterInfo {
            if self.name == "MyOwn" {
                DataCenterInfo::MyOwn
            } else {
                DataCenterInfo::Cloud {
                    name: self.name,
                    instance_id: None,
                    local_address: None,
                }
            }
        }
    }

    fn lenient_u16<'de, D>(deserializer: D) -> Result<u16, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u16),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n),
            Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }

    fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<WireInstance>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Many(Vec<WireInstance>),
            One(Box<WireInstance>),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Many(v) => Ok(v),
            Raw::One(one) => Ok(vec![*one]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::wire::*;
    use super::*;
    use crate::config::LocalInstanceConfig;
    use crate::descriptor::InstanceStatus;
    use crate::resolver::TemplateVipResolver;

    fn descriptor() -> InstanceDescriptor {
        let config = LocalInstanceConfig {
            app_name: "gateway".to_string(),
            hostname: Some("gw-1".to_string()),
            ip_addr: "10.0.0.7".to_string(),
            port: 9195,
            ..Default::default()
        };
        InstanceDescriptor::from_config(&config, &TemplateVipResolver)
    }

    #[test]
    fn test_register_body_shape() {
        let body = RegisterBody {
            instance: WireInstance::from_descriptor(&descriptor()),
        };
        let json = serde_json::to_value(&body).unwrap();
        let instance = &json["instance"];

        assert_eq!(instance["app"], "gateway");
        assert_eq!(instance["instanceId"], "gw-1");
        assert_eq!(instance["ipAddr"], "10.0.0.7");
        assert_eq!(instance["status"], "UP");
        assert_eq!(instance["port"]["$"], 9195);
        assert_eq!(instance["port"]["@enabled"], "true");
        assert_eq!(instance["securePort"]["@enabled"], "false");
        assert_eq!(instance["dataCenterInfo"]["name"], "MyOwn");
        assert_eq!(instance["leaseInfo"]["renewalIntervalInSecs"], 30);
        assert_eq!(instance["leaseInfo"]["durationInSecs"], 90);
    }

    #[test]
    fn test_wire_round_trip() {
        let original = descriptor();
        let wire = WireInstance::from_descriptor(&original);
        let json = serde_json::to_string(&wire).unwrap();
        let parsed: WireInstance = serde_json::from_str(&json).unwrap();
        let back = parsed.into_descriptor();

        assert_eq!(back.app_name, original.app_name);
        assert_eq!(back.host_name, original.host_name);
        assert_eq!(back.port, original.port);
        assert_eq!(back.status, original.status);
        assert_eq!(back.lease, original.lease);
    }

    #[test]
    fn test_lenient_port_and_single_instance() {
        let raw = r#"{
            "application": {
                "name": "GATEWAY",
                "instance": {
                    "instanceId": "gw-1",
                    "hostName": "gw-1",
                    "app": "GATEWAY",
                    "ipAddr": "10.0.0.7",
                    "status": "UP",
                    "port": {"$": "9195", "@enabled": "true"},
                    "securePort": {"$": 443, "@enabled": "false"},
                    "vipAddress": "gw-1:9195",
                    "secureVipAddress": "gw-1:443",
                    "homePageUrl": "http://gw-1:9195/",
                    "statusPageUrl": "http://gw-1:9195/status",
                    "healthCheckUrl": "http://gw-1:9195/healthcheck",
                    "dataCenterInfo": {"@class": "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo", "name": "MyOwn"},
                    "leaseInfo": {"renewalIntervalInSecs": 30, "durationInSecs": 90}
                }
            }
        }"#;
        let parsed: ApplicationResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.application.instance.len(), 1);
        assert_eq!(parsed.application.instance[0].port.value, 9195);
    }

    #[test]
    fn test_unknown_status_decodes_as_unknown() {
        assert_eq!(
            InstanceStatus::from_wire("HIBERNATING"),
            InstanceStatus::Unknown
        );
    }
}
