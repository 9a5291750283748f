use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Routing entries of one service, one `hostname:ext_port=service_port` string per hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingEntrySpec {
    pub service_id: String,
    pub ports: Vec<String>,
}

impl RoutingEntrySpec {
    pub fn port_string(hostname: &str, ext_port: u16, service_port: u16) -> String {
        format!("{hostname}:{ext_port}={service_port}")
    }

    /// The `hostname:ext_port` part of a port string, the key two routes collide on.
    pub fn source_of(port: &str) -> &str {
        port.split_once('=').map(|(source, _)| source).unwrap_or(port)
    }
}

/// Whole desired state of the load balancer, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredEntrySet(Vec<RoutingEntrySpec>);

impl DesiredEntrySet {
    pub fn entries(&self) -> &[RoutingEntrySpec] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ports_count(&self) -> usize {
        self.0.iter().map(|entry| entry.ports.len()).sum()
    }
}

impl From<Vec<RoutingEntrySpec>> for DesiredEntrySet {
    fn from(value: Vec<RoutingEntrySpec>) -> Self {
        Self(value)
    }
}

impl IntoIterator for DesiredEntrySet {
    type Item = RoutingEntrySpec;
    type IntoIter = std::vec::IntoIter<RoutingEntrySpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

pub const SET_SERVICE_LINKS_ACTION: &str = "setservicelinks";

/// Resolved load balancer service object. Never kept across passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerHandle {
    pub id: String,
    pub name: String,
    pub actions: HashMap<String, String>,
    pub links: HashMap<String, String>,
}

impl LoadBalancerHandle {
    pub fn action(&self, name: &str) -> Option<&str> {
        self.actions.get(name).map(String::as_str)
    }
}
