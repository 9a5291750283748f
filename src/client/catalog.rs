use async_trait::async_trait;

use crate::client::rest::RancherClient;
use crate::core::error::GatewayError;
use crate::dto::rancher::{EnvironmentDto, ServiceDto};
use crate::model::scope::CatalogScope;
use crate::model::service::ServiceSnapshot;
use crate::service::catalog_service::ServiceCatalog;

impl RancherClient {
    async fn environment_services(&self, environment_id: &str) -> Result<Vec<ServiceSnapshot>, GatewayError> {
        let services: Vec<ServiceDto> = self.list_all(&self.url(&format!("environments/{environment_id}/services")), &[]).await?;
        Ok(services.into_iter()
            .map(ServiceSnapshot::from)
            .map(|mut service| {
                service.environment_id.get_or_insert_with(|| String::from(environment_id));
                service
            })
            .collect())
    }
}

#[async_trait]
impl ServiceCatalog for RancherClient {
    async fn list_services(&self, scope: &CatalogScope) -> Result<Vec<ServiceSnapshot>, GatewayError> {
        match scope {
            CatalogScope::Project(project_id) => {
                let services: Vec<ServiceDto> = self.list_all(&self.url(&format!("projects/{project_id}/services")), &[]).await?;
                Ok(services.into_iter().map(ServiceSnapshot::from).collect())
            }
            CatalogScope::Environment(environment_id) => self.environment_services(environment_id).await,
            CatalogScope::AllEnvironments => {
                let environments: Vec<EnvironmentDto> = self.list_all(&self.url("environments"), &[]).await?;
                let mut services = Vec::new();
                for environment in environments.iter().filter(|env| !env.is_removed()) {
                    services.append(&mut self.environment_services(&environment.id).await?);
                }
                Ok(services)
            }
        }
    }

    async fn environment(&self, environment_id: &str) -> Result<EnvironmentDto, GatewayError> {
        self.get(&self.url(&format!("environments/{environment_id}")), &[]).await
            .map_err(|err| match err {
                GatewayError::Status { status: 404, .. } => GatewayError::NotFound(format!("environment {environment_id}")),
                other => other,
            })
    }

    async fn find_environments(&self, name: &str) -> Result<Vec<EnvironmentDto>, GatewayError> {
        let environments: Vec<EnvironmentDto> = self.list_all(&self.url("environments"), &[("name", name)]).await?;
        Ok(environments.into_iter()
            .filter(|env| env.name.as_deref() == Some(name))
            .collect())
    }
}
