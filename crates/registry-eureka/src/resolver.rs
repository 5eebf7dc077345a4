//! Virtual-address resolution
//!
//! VIP addresses are configured as templates; a resolver turns a
//! template into the concrete virtual-host name submitted with the
//! descriptor. The resolver is a required collaborator of the
//! repository; the composition root picks one, with
//! [`TemplateVipResolver`] as the named default.

use crate::config::LocalInstanceConfig;

/// Resolves a virtual-host-name template into a concrete VIP address.
pub trait VipAddressResolver: Send + Sync {
    /// Resolve `template` against the given local config snapshot.
    fn resolve(&self, template: &str, config: &LocalInstanceConfig) -> String;
}

/// Default resolver in the style of the legacy property-template
/// resolvers: `${key}` placeholders are interpolated from a few
/// well-known fields and then the config metadata. Unknown placeholders
/// are left literal so a misspelled key is visible in the registry
/// rather than silently blanked.
///
/// Well-known keys: `hostname`, `port`, `secure.port`, `appname`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateVipResolver;

impl TemplateVipResolver {
    fn lookup(key: &str, config: &LocalInstanceConfig) -> Option<String> {
        match key {
            "hostname" => Some(
                config
                    .hostname
                    .clone()
                    .unwrap_or_else(|| config.ip_addr.clone()),
            ),
            "port" => Some(config.port.to_string()),
            "secure.port" => Some(config.secure_port.to_string()),
            "appname" => Some(config.app_name.clone()),
            other => config.metadata.get(other).cloned(),
        }
    }
}

impl VipAddressResolver for TemplateVipResolver {
    fn resolve(&self, template: &str, config: &LocalInstanceConfig) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match Self::lookup(key, config) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push_str("${");
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    // unterminated placeholder, keep verbatim
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
