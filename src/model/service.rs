use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceState {
    Active,
    Removed,
    Other(String),
}

impl ServiceState {
    /// States that make a change worth a reconciliation pass.
    pub fn triggers_reconcile(&self) -> bool {
        matches!(self, ServiceState::Active | ServiceState::Removed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceState::Active => "active",
            ServiceState::Removed => "removed",
            ServiceState::Other(state) => state,
        }
    }
}

impl From<&str> for ServiceState {
    fn from(value: &str) -> Self {
        match value {
            "active" => ServiceState::Active,
            "removed" => ServiceState::Removed,
            other => ServiceState::Other(String::from(other)),
        }
    }
}

impl From<String> for ServiceState {
    fn from(value: String) -> Self {
        ServiceState::from(value.as_str())
    }
}

impl From<ServiceState> for String {
    fn from(value: ServiceState) -> Self {
        String::from(value.as_str())
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a platform service as seen in events and catalog listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSnapshot {
    pub id: String,
    pub name: String,
    /// Platform resource type, `service` for plain services.
    pub kind: String,
    pub state: ServiceState,
    pub environment_id: Option<String>,
    pub labels: HashMap<String, String>,
    pub links: HashMap<String, String>,
}

impl ServiceSnapshot {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}
