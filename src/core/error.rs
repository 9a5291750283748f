use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Transport error - {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected status {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Deserialization error - {0}")]
    Decode(String),
    #[error("Not Found - {0}")]
    NotFound(String),
    #[error("Ambiguous lookup '{name}' - {count} matches")]
    Ambiguous { name: String, count: usize },
    #[error("Concurrent modification - {0}")]
    ConcurrentModification(String),
    #[error("Missing action '{0}'")]
    MissingAction(&'static str),
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Invalid subscription request - {0}")]
    InvalidRequest(String),
    #[error("Websocket connection error - {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),
    #[error("Websocket stream error - {0}")]
    Stream(#[source] tokio_tungstenite::tungstenite::Error),
    #[error("Websocket connection closed")]
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Invalid metadata on service {service_id}: label '{key}' = '{value}' - {reason}")]
    InvalidServiceMetadata {
        service_id: String,
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Catalog unavailable - {0}")]
    CatalogUnavailable(#[source] GatewayError),
    #[error("Load balancer not found - {0}")]
    LoadBalancerNotFound(String),
    #[error("Ambiguous load balancer '{name}' - {count} matches")]
    AmbiguousLoadBalancer { name: String, count: usize },
    #[error("Load balancer update failed - {0}")]
    LoadBalancerUpdateFailed(#[source] GatewayError),
    #[error("Concurrent modification of the load balancer - {0}")]
    ConcurrentModification(String),
    #[error("Context resolution failed - {0}")]
    ContextResolutionFailed(String),
    #[error("Gateway error - {0}")]
    Gateway(#[source] GatewayError),
    #[error("Timeout reached {secs}s")]
    Timeout { secs: u64 },
}

impl ReconcileError {
    pub fn code(&self) -> &'static str {
        match self {
            ReconcileError::CatalogUnavailable(_) => "CATALOG_UNAVAILABLE",
            ReconcileError::LoadBalancerNotFound(_) => "LOAD_BALANCER_NOT_FOUND",
            ReconcileError::AmbiguousLoadBalancer { .. } => "AMBIGUOUS_LOAD_BALANCER",
            ReconcileError::LoadBalancerUpdateFailed(_) => "LOAD_BALANCER_UPDATE_FAILED",
            ReconcileError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            ReconcileError::ContextResolutionFailed(_) => "CONTEXT_RESOLUTION_FAILED",
            ReconcileError::Gateway(_) => "GATEWAY_ERROR",
            ReconcileError::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Maps a failed load balancer lookup.
    pub fn from_resolve(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(target) => ReconcileError::LoadBalancerNotFound(target),
            GatewayError::Ambiguous { name, count } => ReconcileError::AmbiguousLoadBalancer { name, count },
            other => ReconcileError::Gateway(other),
        }
    }

    /// Maps a failed set-links action.
    pub fn from_update(err: GatewayError) -> Self {
        match err {
            GatewayError::ConcurrentModification(body) => ReconcileError::ConcurrentModification(body),
            other => ReconcileError::LoadBalancerUpdateFailed(other),
        }
    }
}
