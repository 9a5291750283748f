use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::core::config::LbSyncConfig;
use crate::core::error::ReconcileError;
use crate::dto::event::ChangeEvent;
use crate::dto::status::{PassOutcome, PassReportDto};
use crate::model::entry::{DesiredEntrySet, LoadBalancerHandle, RoutingEntrySpec};
use crate::model::scope::{CatalogScope, LabelDefaults, LabelKeys, LoadBalancerTarget, Scope};
use crate::model::service::{ServiceSnapshot, ServiceState};
use crate::model::trigger::ReconcileTrigger;
use crate::service::catalog_service::{list_eligible_services, ServiceCatalog};
use crate::service::event_filter::trigger_for;
use crate::service::gateway_service::LoadBalancerGateway;
use crate::service::metadata_service::derive_entry;

pub const PASSES_METRIC_NAME: &str = "lbsync_passes_total";
pub const PASS_DURATION_METRIC_NAME: &str = "lbsync_pass_duration_seconds";
pub const DESIRED_ENTRIES_METRIC_NAME: &str = "lbsync_desired_entries";
pub const SKIPPED_SERVICES_METRIC_NAME: &str = "lbsync_skipped_services_total";

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub scope: Scope,
    pub label_keys: LabelKeys,
    pub label_defaults: LabelDefaults,
    pub watched_kind: String,
    pub pass_timeout: Duration,
}

impl ReconcilerSettings {
    pub fn from_config(conf: &LbSyncConfig) -> Result<Self, config::ConfigError> {
        Ok(Self {
            scope: conf.scope()?,
            label_keys: conf.label_keys()?,
            label_defaults: conf.label_defaults()?,
            watched_kind: conf.watched_resource_type.clone(),
            pass_timeout: conf.pass_timeout()?,
        })
    }
}

/// Where one pass reads services from and which load balancer it writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassContext {
    pub catalog: CatalogScope,
    pub target: LoadBalancerTarget,
}

/// Desired set before it is applied.
#[derive(Debug, Clone)]
pub struct DesiredState {
    pub handle: LoadBalancerHandle,
    pub entries: DesiredEntrySet,
    pub skipped_services: usize,
    pub dropped_ports: usize,
}

/// Outcome of an applied pass.
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub load_balancer_id: String,
    pub entries: DesiredEntrySet,
    pub skipped_services: usize,
}

struct Assembly {
    entries: DesiredEntrySet,
    skipped_services: usize,
    dropped_ports: usize,
}

/// Builds the desired entry set out of the catalog snapshot, in catalog order.
///
/// Removed services are left out. A `hostname:ext_port` source claimed by more than one
/// service stays with the smallest service id; the other claims are dropped, as are
/// repeated sources inside one service. Entries left without ports are omitted.
pub fn skipped_pass_line(event: &ChangeEvent) -> String {
    format!("pass outcome={} code=NONE event={}", PassOutcome::Skipped.as_str(), event.name)
}

/// Logs and counts an event that did not qualify for a pass.
pub fn record_skipped(event: &ChangeEvent) {
    log::info!("{}", skipped_pass_line(event));
    metrics::counter!(PASSES_METRIC_NAME, "outcome" => PassOutcome::Skipped.as_str(), "code" => "NONE").increment(1);
}

fn assemble(services: &[ServiceSnapshot], keys: &LabelKeys, defaults: &LabelDefaults) -> Assembly {
    let mut skipped_services = 0;
    let mut seen_services = HashSet::new();
    let mut derived = Vec::new();

    for service in services {
        if service.state == ServiceState::Removed {
            log::debug!("Service {} ({}) is removed, omitting it", service.id, service.name);
            continue;
        }
        if !seen_services.insert(service.id.as_str()) {
            log::debug!("Service {} listed twice, keeping first occurrence", service.id);
            continue;
        }
        match derive_entry(service, keys, defaults) {
            Ok(entry) => derived.push(entry),
            Err(err) => {
                log::warn!("Skipping service {} ({}) - {err}", service.id, service.name);
                skipped_services += 1;
            }
        }
    }

    let mut owners: HashMap<&str, &str> = HashMap::new();
    for entry in &derived {
        for port in &entry.ports {
            let owner = owners.entry(RoutingEntrySpec::source_of(port)).or_insert(entry.service_id.as_str());
            if entry.service_id.as_str() < *owner {
                *owner = entry.service_id.as_str();
            }
        }
    }

    let mut dropped_ports = 0;
    let mut entries = Vec::with_capacity(derived.len());
    for entry in &derived {
        let mut sources = HashSet::new();
        let mut ports = Vec::with_capacity(entry.ports.len());
        for port in &entry.ports {
            let source = RoutingEntrySpec::source_of(port);
            let owner = owners.get(source).copied().unwrap_or(entry.service_id.as_str());
            if owner != entry.service_id {
                log::warn!("Route {source} of service {} is already claimed by service {owner}, dropping it", entry.service_id);
                dropped_ports += 1;
            } else if !sources.insert(source) {
                log::warn!("Route {source} is repeated on service {}, dropping duplicate", entry.service_id);
                dropped_ports += 1;
            } else {
                ports.push(port.clone());
            }
        }
        if !ports.is_empty() {
            entries.push(RoutingEntrySpec {
                service_id: entry.service_id.clone(),
                ports,
            });
        }
    }

    Assembly {
        entries: entries.into(),
        skipped_services,
        dropped_ports,
    }
}

pub struct Reconciler {
    catalog: Arc<dyn ServiceCatalog>,
    gateway: Arc<dyn LoadBalancerGateway>,
    settings: ReconcilerSettings,
    pass_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        catalog: Arc<dyn ServiceCatalog>,
        gateway: Arc<dyn LoadBalancerGateway>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            catalog,
            gateway,
            settings,
            pass_lock: Mutex::new(()),
        }
    }

    /// Filters the event and runs a pass when it qualifies. Ignored events are a successful no-op.
    pub async fn handle_event(&self, event: &ChangeEvent) -> Result<Option<PassSummary>, ReconcileError> {
        match trigger_for(event, &self.settings.watched_kind) {
            Some(trigger) => self.reconcile(&trigger).await.map(Some),
            None => {
                record_skipped(event);
                Ok(None)
            }
        }
    }

    /// Recomputes the desired set from scratch and replaces the load balancer links with it.
    pub async fn reconcile(&self, trigger: &ReconcileTrigger) -> Result<PassSummary, ReconcileError> {
        let _guard = self.pass_lock.lock().await;
        let started = Instant::now();
        let result = self.with_deadline(self.apply_pass(trigger)).await;
        let elapsed = started.elapsed();

        metrics::histogram!(PASS_DURATION_METRIC_NAME).record(elapsed.as_secs_f64());
        match &result {
            Ok(summary) => {
                log::info!(
                    "pass outcome={} code=NONE trigger={trigger} load_balancer={} entries={} skipped_services={} elapsed_ms={}",
                    PassOutcome::Success.as_str(),
                    summary.load_balancer_id,
                    summary.entries.len(),
                    summary.skipped_services,
                    elapsed.as_millis(),
                );
                metrics::counter!(PASSES_METRIC_NAME, "outcome" => PassOutcome::Success.as_str(), "code" => "NONE").increment(1);
                metrics::gauge!(DESIRED_ENTRIES_METRIC_NAME).set(summary.entries.len() as f64);
                metrics::counter!(SKIPPED_SERVICES_METRIC_NAME).increment(summary.skipped_services as u64);
            }
            Err(err) => {
                log::error!(
                    "pass outcome={} code={} trigger={trigger} elapsed_ms={} - {err}",
                    PassOutcome::Failed.as_str(),
                    err.code(),
                    elapsed.as_millis(),
                );
                metrics::counter!(PASSES_METRIC_NAME, "outcome" => PassOutcome::Failed.as_str(), "code" => err.code()).increment(1);
            }
        }
        result
    }

    /// Runs a pass and turns its result into a report.
    pub async fn reconcile_with_report(&self, trigger: &ReconcileTrigger) -> (Result<PassSummary, ReconcileError>, PassReportDto) {
        let started = Instant::now();
        let result = self.reconcile(trigger).await;
        let elapsed_ms = started.elapsed().as_millis();
        let report = match &result {
            Ok(summary) => PassReportDto {
                trigger: Some(trigger.clone()),
                outcome: PassOutcome::Success,
                code: None,
                message: None,
                entries: summary.entries.len(),
                skipped_services: summary.skipped_services,
                elapsed_ms,
                finished_at: Utc::now(),
            },
            Err(err) => PassReportDto {
                trigger: Some(trigger.clone()),
                outcome: PassOutcome::Failed,
                code: Some(String::from(err.code())),
                message: Some(err.to_string()),
                entries: 0,
                skipped_services: 0,
                elapsed_ms,
                finished_at: Utc::now(),
            },
        };
        (result, report)
    }

    /// Computes what a pass would apply without touching the load balancer.
    pub async fn desired_state(&self, trigger: &ReconcileTrigger) -> Result<DesiredState, ReconcileError> {
        self.with_deadline(self.compute(trigger)).await
    }

    /// Links currently attached to the load balancer of the scope.
    pub async fn current_entries(&self, trigger: &ReconcileTrigger) -> Result<Vec<RoutingEntrySpec>, ReconcileError> {
        self.with_deadline(async {
            let context = self.resolve_context(trigger).await?;
            let handle = self.gateway.resolve(&context.target).await
                .map_err(ReconcileError::from_resolve)?;
            self.gateway.current_entries(&handle).await
                .map_err(ReconcileError::Gateway)
        }).await
    }

    async fn with_deadline<T>(&self, fut: impl std::future::Future<Output = Result<T, ReconcileError>>) -> Result<T, ReconcileError> {
        tokio::time::timeout(self.settings.pass_timeout, fut)
            .await
            .unwrap_or(Err(ReconcileError::Timeout { secs: self.settings.pass_timeout.as_secs() }))
    }

    async fn apply_pass(&self, trigger: &ReconcileTrigger) -> Result<PassSummary, ReconcileError> {
        let desired = self.compute(trigger).await?;
        log::debug!(
            "Replacing links of load balancer {} with {} entries ({} ports, {} dropped)",
            desired.handle.id,
            desired.entries.len(),
            desired.entries.ports_count(),
            desired.dropped_ports,
        );
        self.gateway.replace_entries(&desired.handle, &desired.entries).await
            .map_err(ReconcileError::from_update)?;
        Ok(PassSummary {
            load_balancer_id: desired.handle.id,
            entries: desired.entries,
            skipped_services: desired.skipped_services,
        })
    }

    async fn compute(&self, trigger: &ReconcileTrigger) -> Result<DesiredState, ReconcileError> {
        let context = self.resolve_context(trigger).await?;
        let handle = self.gateway.resolve(&context.target).await
            .map_err(ReconcileError::from_resolve)?;
        let services = list_eligible_services(self.catalog.as_ref(), &context.catalog, &self.settings.label_keys).await
            .map_err(ReconcileError::CatalogUnavailable)?;
        let assembly = assemble(&services, &self.settings.label_keys, &self.settings.label_defaults);
        Ok(DesiredState {
            handle,
            entries: assembly.entries,
            skipped_services: assembly.skipped_services,
            dropped_ports: assembly.dropped_ports,
        })
    }

    async fn resolve_context(&self, trigger: &ReconcileTrigger) -> Result<PassContext, ReconcileError> {
        match &self.settings.scope {
            Scope::Project { project_id, load_balancer_id } => Ok(PassContext {
                catalog: CatalogScope::Project(project_id.clone()),
                target: LoadBalancerTarget::ById {
                    project_id: project_id.clone(),
                    id: load_balancer_id.clone(),
                },
            }),
            Scope::Stack { stack_name, load_balancer_name } => {
                let stacks = self.catalog.find_environments(stack_name).await
                    .map_err(|err| ReconcileError::ContextResolutionFailed(format!("lookup of stack '{stack_name}' - {err}")))?;
                let mut live = stacks.into_iter().filter(|env| !env.is_removed());
                let stack = match (live.next(), live.next()) {
                    (Some(stack), None) => stack,
                    (None, _) => return Err(ReconcileError::ContextResolutionFailed(format!("stack '{stack_name}' not found"))),
                    (Some(_), Some(_)) => return Err(ReconcileError::ContextResolutionFailed(format!("several stacks named '{stack_name}'"))),
                };
                Ok(PassContext {
                    catalog: CatalogScope::AllEnvironments,
                    target: LoadBalancerTarget::ByName {
                        environment_id: stack.id,
                        name: load_balancer_name.clone(),
                    },
                })
            }
            Scope::EventStack { load_balancer_name } => {
                let Some(environment_id) = trigger.environment_id.as_deref() else {
                    return Err(ReconcileError::ContextResolutionFailed(format!("trigger {trigger} carries no environment")));
                };
                let environment = self.catalog.environment(environment_id).await
                    .map_err(|err| ReconcileError::ContextResolutionFailed(format!("lookup of environment {environment_id} - {err}")))?;
                if environment.is_removed() {
                    return Err(ReconcileError::ContextResolutionFailed(format!("environment {environment_id} is removed")));
                }
                Ok(PassContext {
                    catalog: CatalogScope::Environment(environment.id.clone()),
                    target: LoadBalancerTarget::ByName {
                        environment_id: environment.id,
                        name: load_balancer_name.clone(),
                    },
                })
            }
        }
    }
}
