use async_trait::async_trait;

use crate::core::error::GatewayError;
use crate::model::entry::{DesiredEntrySet, LoadBalancerHandle, RoutingEntrySpec};
use crate::model::scope::LoadBalancerTarget;

/// Control side of the platform API for the target load balancer.
#[async_trait]
pub trait LoadBalancerGateway: Send + Sync {
    /// Looks the load balancer up. Zero matches is `NotFound`, several is `Ambiguous`.
    async fn resolve(&self, target: &LoadBalancerTarget) -> Result<LoadBalancerHandle, GatewayError>;

    /// Replaces every service link of the load balancer with `entries` in one call.
    async fn replace_entries(&self, handle: &LoadBalancerHandle, entries: &DesiredEntrySet) -> Result<(), GatewayError>;

    /// Links currently attached to the load balancer.
    async fn current_entries(&self, handle: &LoadBalancerHandle) -> Result<Vec<RoutingEntrySpec>, GatewayError>;
}
