use async_trait::async_trait;

use crate::core::error::GatewayError;
use crate::dto::rancher::EnvironmentDto;
use crate::model::scope::{CatalogScope, LabelKeys};
use crate::model::service::ServiceSnapshot;
use crate::service::metadata_service::is_registered;

pub const SERVICE_KIND: &str = "service";

/// Read side of the platform API.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Every service in the scope, whatever its labels or state.
    async fn list_services(&self, scope: &CatalogScope) -> Result<Vec<ServiceSnapshot>, GatewayError>;

    async fn environment(&self, environment_id: &str) -> Result<EnvironmentDto, GatewayError>;

    async fn find_environments(&self, name: &str) -> Result<Vec<EnvironmentDto>, GatewayError>;
}

pub fn is_eligible(service: &ServiceSnapshot, keys: &LabelKeys) -> bool {
    service.state.triggers_reconcile()
        && service.kind == SERVICE_KIND
        && is_registered(service, keys)
}

/// Registered services of the scope, in enumeration order.
pub async fn list_eligible_services(
    catalog: &dyn ServiceCatalog,
    scope: &CatalogScope,
    keys: &LabelKeys,
) -> Result<Vec<ServiceSnapshot>, GatewayError> {
    let services = catalog.list_services(scope).await?;
    let total = services.len();
    let eligible = services.into_iter()
        .filter(|service| is_eligible(service, keys))
        .collect::<Vec<_>>();
    log::debug!("{} of {total} services in scope {scope:?} are registered", eligible.len());
    Ok(eligible)
}
