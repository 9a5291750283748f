use lazy_static::lazy_static;
use regex::Regex;

use crate::core::error::MetadataError;
use crate::model::entry::RoutingEntrySpec;
use crate::model::scope::{LabelDefaults, LabelKey, LabelKeys};
use crate::model::service::ServiceSnapshot;

lazy_static! {
    static ref HOSTNAME_REGEX: Regex = Regex::new(
        r"^(\*\.)?[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$"
    ).expect("hostname regex");
}

/// Labels of one service resolved against their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLabels {
    pub hostnames: Vec<String>,
    pub ext_port: u16,
    pub service_port: u16,
}

fn text_label<'a>(service: &'a ServiceSnapshot, keys: &LabelKeys, key: LabelKey) -> Option<&'a str> {
    service.label(&keys.key(key))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn invalid(service: &ServiceSnapshot, key: String, value: &str, reason: &str) -> MetadataError {
    MetadataError::InvalidServiceMetadata {
        service_id: service.id.clone(),
        key,
        value: String::from(value),
        reason: String::from(reason),
    }
}

fn port_label(service: &ServiceSnapshot, keys: &LabelKeys, key: LabelKey, default: u16) -> Result<u16, MetadataError> {
    let Some(raw) = text_label(service, keys, key) else {
        return Ok(default);
    };
    raw.parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| invalid(service, keys.key(key), raw, "port must be in 1..=65535"))
}

/// `true` only when the opt-in label is explicitly set to true.
pub fn is_registered(service: &ServiceSnapshot, keys: &LabelKeys) -> bool {
    text_label(service, keys, LabelKey::Register)
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn resolve_labels(service: &ServiceSnapshot, keys: &LabelKeys, defaults: &LabelDefaults) -> Result<ServiceLabels, MetadataError> {
    let ext_port = port_label(service, keys, LabelKey::ExtPort, defaults.ext_port)?;
    let service_port = port_label(service, keys, LabelKey::ServicePort, defaults.service_port)?;

    let (hostnames, source_key) = match text_label(service, keys, LabelKey::FullName) {
        Some(full_name) => {
            let hostnames = full_name.split(',')
                .map(str::trim)
                .filter(|host| !host.is_empty())
                .map(String::from)
                .collect::<Vec<_>>();
            if hostnames.is_empty() {
                return Err(invalid(service, keys.key(LabelKey::FullName), full_name, "no hostname given"));
            }
            (hostnames, LabelKey::FullName)
        }
        None => {
            let name = text_label(service, keys, LabelKey::Name).unwrap_or(service.name.as_str());
            let domain = text_label(service, keys, LabelKey::Domain).unwrap_or(defaults.domain.as_str());
            (vec![format!("{name}.{domain}")], LabelKey::Name)
        }
    };

    if let Some(bad) = hostnames.iter().find(|host| !HOSTNAME_REGEX.is_match(host)) {
        return Err(invalid(service, keys.key(source_key), bad, "not a valid hostname"));
    }

    Ok(ServiceLabels {
        hostnames,
        ext_port,
        service_port,
    })
}

/// Routing entry of a single service, one port string per hostname in label order.
pub fn derive_entry(service: &ServiceSnapshot, keys: &LabelKeys, defaults: &LabelDefaults) -> Result<RoutingEntrySpec, MetadataError> {
    let labels = resolve_labels(service, keys, defaults)?;
    Ok(RoutingEntrySpec {
        service_id: service.id.clone(),
        ports: labels.hostnames.iter()
            .map(|host| RoutingEntrySpec::port_string(host, labels.ext_port, labels.service_port))
            .collect(),
    })
}
