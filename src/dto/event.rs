use serde::Deserialize;

use crate::dto::rancher::ServiceDto;

pub const PING_EVENT_NAME: &str = "ping";

/// Envelope of a message delivered by the `/subscribe` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub name: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub data: Option<ChangeEventData>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeEventData {
    #[serde(default)]
    pub resource: Option<ServiceDto>,
}

impl ChangeEvent {
    pub fn parse(message: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(message)
    }

    pub fn is_ping(&self) -> bool {
        self.name == PING_EVENT_NAME
    }

    pub fn resource(&self) -> Option<&ServiceDto> {
        self.data.as_ref().and_then(|data| data.resource.as_ref())
    }
}
