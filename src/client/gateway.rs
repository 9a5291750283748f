use async_trait::async_trait;

use crate::client::rest::RancherClient;
use crate::core::error::GatewayError;
use crate::dto::rancher::{LoadBalancerServiceDto, ServiceConsumeMapDto, SetServiceLinksReqDto};
use crate::model::entry::{DesiredEntrySet, LoadBalancerHandle, RoutingEntrySpec, SET_SERVICE_LINKS_ACTION};
use crate::model::scope::LoadBalancerTarget;
use crate::model::service::ServiceState;
use crate::service::gateway_service::LoadBalancerGateway;

#[async_trait]
impl LoadBalancerGateway for RancherClient {
    async fn resolve(&self, target: &LoadBalancerTarget) -> Result<LoadBalancerHandle, GatewayError> {
        match target {
            LoadBalancerTarget::ById { project_id, id } => {
                let url = self.url(&format!("projects/{project_id}/loadbalancerservices/{id}"));
                let lb: LoadBalancerServiceDto = self.get(&url, &[]).await
                    .map_err(|err| match err {
                        GatewayError::Status { status: 404, .. } => GatewayError::NotFound(target.to_string()),
                        other => other,
                    })?;
                if lb.is_removed() {
                    return Err(GatewayError::NotFound(target.to_string()));
                }
                Ok(lb.into())
            }
            LoadBalancerTarget::ByName { environment_id, name } => {
                let url = self.url(&format!("environments/{environment_id}/loadbalancerservices"));
                let candidates: Vec<LoadBalancerServiceDto> = self.list_all(&url, &[("name", name.as_str())]).await?;
                let mut matches = candidates.into_iter()
                    .filter(|lb| !lb.is_removed() && lb.name.as_deref() == Some(name.as_str()))
                    .collect::<Vec<_>>();
                match matches.len() {
                    0 => Err(GatewayError::NotFound(target.to_string())),
                    1 => Ok(matches.remove(0).into()),
                    count => Err(GatewayError::Ambiguous { name: target.to_string(), count }),
                }
            }
        }
    }

    async fn replace_entries(&self, handle: &LoadBalancerHandle, entries: &DesiredEntrySet) -> Result<(), GatewayError> {
        let action_url = handle.action(SET_SERVICE_LINKS_ACTION)
            .ok_or(GatewayError::MissingAction(SET_SERVICE_LINKS_ACTION))?;
        self.post(action_url, &SetServiceLinksReqDto { service_links: entries.entries() }).await
            .map_err(|err| match err {
                GatewayError::Status { status: 409, body } => GatewayError::ConcurrentModification(body),
                other => other,
            })
    }

    async fn current_entries(&self, handle: &LoadBalancerHandle) -> Result<Vec<RoutingEntrySpec>, GatewayError> {
        let maps: Vec<ServiceConsumeMapDto> = self.list_all(&self.url("serviceconsumemaps"), &[("serviceId", handle.id.as_str())]).await?;
        Ok(maps.into_iter()
            .filter(|map| map.state != Some(ServiceState::Removed))
            .map(RoutingEntrySpec::from)
            .collect())
    }
}
