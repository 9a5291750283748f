use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::model::scope::{LabelDefaults, LabelKeys, Scope};
use crate::model::service::ServiceState;

pub fn compose_config<'de, CFG: Deserialize<'de>>(external_path: &str, env_prefix: &str) -> Result<CFG, ConfigError> {
    Config::builder()

        // Add in a local configuration file
        .add_source(File::with_name(external_path).required(false))

        // Add in settings from the environment (e.g. LBSYNC_CATTLE_URL)
        .add_source(Environment::with_prefix(env_prefix))

        .build()?
        .try_deserialize()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// Load balancer and services of a single project, load balancer addressed by id
    #[default]
    Project,
    /// Load balancer addressed by stack and service name, services of every environment
    Stack,
    /// Load balancer living in the same stack as the service that changed
    EventStack,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LbSyncConfig {
    pub cattle_url: String,
    pub cattle_access_key: String,
    pub cattle_secret_key: String,

    #[serde(default)]
    pub scope: ScopeMode,
    pub project_id: Option<String>,
    pub load_balancer_id: Option<String>,
    pub stack_name: Option<String>,
    pub load_balancer_name: Option<String>,

    #[serde(default = "default_label_namespace")]
    pub label_namespace: String,
    #[serde(default = "default_watched_resource_type")]
    pub watched_resource_type: String,
    #[serde(default = "default_domain")]
    pub default_domain: String,
    #[serde(default = "default_ext_port")]
    pub default_ext_port: u16,
    #[serde(default = "default_service_port")]
    pub default_service_port: u16,

    #[serde(default = "default_pass_timeout")]
    pub pass_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    pub resync_interval_secs: Option<u64>,

    pub webhook_url: Option<String>,
    #[serde(default = "default_webhook_states")]
    pub webhook_states: String,

    pub address: Option<SocketAddr>,
}

fn default_label_namespace() -> String {
    String::from("rancher.lb.sync")
}

fn default_watched_resource_type() -> String {
    String::from("service")
}

fn default_domain() -> String {
    String::from("foo.com")
}

fn default_ext_port() -> u16 {
    80
}

fn default_service_port() -> u16 {
    3000
}

fn default_pass_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10
}

fn default_webhook_states() -> String {
    String::from("removed")
}

fn required<'a>(value: &'a Option<String>, key: &str, mode: &str) -> Result<&'a str, ConfigError> {
    value.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::Message(format!("'{key}' is required when scope is '{mode}'")))
}

fn positive_secs(secs: u64, key: &str) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Message(format!("'{key}' must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}

impl LbSyncConfig {
    /// Validates the scope related keys and builds the deployment scope.
    pub fn scope(&self) -> Result<Scope, ConfigError> {
        match self.scope {
            ScopeMode::Project => Ok(Scope::Project {
                project_id: required(&self.project_id, "project_id", "project")?.to_owned(),
                load_balancer_id: required(&self.load_balancer_id, "load_balancer_id", "project")?.to_owned(),
            }),
            ScopeMode::Stack => Ok(Scope::Stack {
                stack_name: required(&self.stack_name, "stack_name", "stack")?.to_owned(),
                load_balancer_name: required(&self.load_balancer_name, "load_balancer_name", "stack")?.to_owned(),
            }),
            ScopeMode::EventStack => Ok(Scope::EventStack {
                load_balancer_name: required(&self.load_balancer_name, "load_balancer_name", "event_stack")?.to_owned(),
            }),
        }
    }

    pub fn label_keys(&self) -> Result<LabelKeys, ConfigError> {
        LabelKeys::new(&self.label_namespace)
            .ok_or_else(|| ConfigError::Message(format!("invalid label_namespace '{}'", self.label_namespace)))
    }

    pub fn label_defaults(&self) -> Result<LabelDefaults, ConfigError> {
        if self.default_ext_port == 0 || self.default_service_port == 0 {
            return Err(ConfigError::Message(String::from("default ports must be greater than zero")));
        }
        Ok(LabelDefaults {
            domain: self.default_domain.clone(),
            ext_port: self.default_ext_port,
            service_port: self.default_service_port,
        })
    }

    pub fn pass_timeout(&self) -> Result<Duration, ConfigError> {
        positive_secs(self.pass_timeout_secs, "pass_timeout_secs")
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        positive_secs(self.request_timeout_secs, "request_timeout_secs")
    }

    pub fn resync_interval(&self) -> Option<Duration> {
        self.resync_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn webhook_states(&self) -> Vec<ServiceState> {
        self.webhook_states
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ServiceState::from)
            .collect()
    }
}
