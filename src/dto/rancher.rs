use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::entry::{LoadBalancerHandle, RoutingEntrySpec};
use crate::model::service::{ServiceSnapshot, ServiceState};

/// Paged collection as returned by every Cattle list endpoint.
#[derive(Debug, Deserialize)]
pub struct CollectionDto<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<PaginationDto>,
}

impl<T> CollectionDto<T> {
    pub fn next_page(&self) -> Option<&str> {
        self.pagination.as_ref()
            .and_then(|pagination| pagination.next.as_deref())
            .filter(|next| !next.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationDto {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfigDto {
    #[serde(default)]
    pub labels: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDto {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub state: Option<ServiceState>,
    #[serde(default)]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub launch_config: Option<LaunchConfigDto>,
    #[serde(default)]
    pub links: HashMap<String, serde_json::Value>,
}

/// Label values are strings on the wire, but booleans and numbers show up in hand written payloads.
fn stringify(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_map(map: HashMap<String, serde_json::Value>) -> HashMap<String, String> {
    map.into_iter()
        .flat_map(|(k, v)| stringify(v).map(|v| (k, v)))
        .collect()
}

impl From<ServiceDto> for ServiceSnapshot {
    fn from(value: ServiceDto) -> Self {
        Self {
            name: value.name.unwrap_or_default(),
            kind: value.kind.unwrap_or_default(),
            state: value.state.unwrap_or_else(|| ServiceState::Other(String::new())),
            environment_id: value.environment_id,
            labels: value.launch_config.map(|lc| string_map(lc.labels)).unwrap_or_default(),
            links: string_map(value.links),
            id: value.id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDto {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<ServiceState>,
}

impl EnvironmentDto {
    pub fn is_removed(&self) -> bool {
        matches!(self.state, Some(ServiceState::Removed))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerServiceDto {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<ServiceState>,
    #[serde(default)]
    pub actions: HashMap<String, String>,
    #[serde(default)]
    pub links: HashMap<String, serde_json::Value>,
}

impl LoadBalancerServiceDto {
    pub fn is_removed(&self) -> bool {
        matches!(self.state, Some(ServiceState::Removed))
    }
}

impl From<LoadBalancerServiceDto> for LoadBalancerHandle {
    fn from(value: LoadBalancerServiceDto) -> Self {
        Self {
            name: value.name.unwrap_or_default(),
            actions: value.actions,
            links: string_map(value.links),
            id: value.id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConsumeMapDto {
    pub consumed_service_id: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub state: Option<ServiceState>,
}

impl From<ServiceConsumeMapDto> for RoutingEntrySpec {
    fn from(value: ServiceConsumeMapDto) -> Self {
        Self {
            service_id: value.consumed_service_id,
            ports: value.ports,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetServiceLinksReqDto<'a> {
    pub service_links: &'a [RoutingEntrySpec],
}
