use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lb_sync::core::error::{GatewayError, ReconcileError};
use lb_sync::dto::event::ChangeEvent;
use lb_sync::dto::status::PassOutcome;
use lb_sync::dto::rancher::EnvironmentDto;
use lb_sync::model::entry::{DesiredEntrySet, LoadBalancerHandle, RoutingEntrySpec, SET_SERVICE_LINKS_ACTION};
use lb_sync::model::scope::{CatalogScope, LabelDefaults, LabelKeys, LoadBalancerTarget, Scope};
use lb_sync::model::service::{ServiceSnapshot, ServiceState};
use lb_sync::model::trigger::ReconcileTrigger;
use lb_sync::service::catalog_service::ServiceCatalog;
use lb_sync::service::gateway_service::LoadBalancerGateway;
use lb_sync::service::queue_service::PassQueue;
use lb_sync::service::reconciler_service::{Reconciler, ReconcilerSettings};
use lb_sync::service::worker_service::{drain_worker, PassWorker, StatusBoard};

#[derive(Default)]
struct FakeCatalog {
    services: Vec<ServiceSnapshot>,
    environments: Vec<EnvironmentDto>,
    failure: Option<u16>,
    hang: bool,
    scopes: Mutex<Vec<CatalogScope>>,
}

#[async_trait]
impl ServiceCatalog for FakeCatalog {
    async fn list_services(&self, scope: &CatalogScope) -> Result<Vec<ServiceSnapshot>, GatewayError> {
        self.scopes.lock().unwrap().push(scope.clone());
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(status) = self.failure {
            return Err(GatewayError::Status { status, body: String::from("catalog down") });
        }
        Ok(self.services.clone())
    }

    async fn environment(&self, environment_id: &str) -> Result<EnvironmentDto, GatewayError> {
        self.environments.iter()
            .find(|env| env.id == environment_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(String::from(environment_id)))
    }

    async fn find_environments(&self, name: &str) -> Result<Vec<EnvironmentDto>, GatewayError> {
        Ok(self.environments.iter()
            .filter(|env| env.name.as_deref() == Some(name))
            .cloned()
            .collect())
    }
}

struct FakeGateway {
    load_balancers: Vec<(LoadBalancerTarget, LoadBalancerHandle)>,
    ambiguous: bool,
    conflict: bool,
    replaced: Mutex<Vec<DesiredEntrySet>>,
}

impl FakeGateway {
    fn with(target: LoadBalancerTarget) -> Self {
        Self {
            load_balancers: vec![(target, handle("1s100"))],
            ambiguous: false,
            conflict: false,
            replaced: Mutex::new(Vec::new()),
        }
    }

    fn replaced(&self) -> Vec<DesiredEntrySet> {
        self.replaced.lock().unwrap().clone()
    }
}

#[async_trait]
impl LoadBalancerGateway for FakeGateway {
    async fn resolve(&self, target: &LoadBalancerTarget) -> Result<LoadBalancerHandle, GatewayError> {
        if self.ambiguous {
            return Err(GatewayError::Ambiguous { name: target.to_string(), count: 2 });
        }
        self.load_balancers.iter()
            .find(|(known, _)| known == target)
            .map(|(_, handle)| handle.clone())
            .ok_or_else(|| GatewayError::NotFound(target.to_string()))
    }

    async fn replace_entries(&self, _handle: &LoadBalancerHandle, entries: &DesiredEntrySet) -> Result<(), GatewayError> {
        if self.conflict {
            return Err(GatewayError::ConcurrentModification(String::from("stale")));
        }
        self.replaced.lock().unwrap().push(entries.clone());
        Ok(())
    }

    async fn current_entries(&self, _handle: &LoadBalancerHandle) -> Result<Vec<RoutingEntrySpec>, GatewayError> {
        Ok(self.replaced().last()
            .map(|set| set.entries().to_vec())
            .unwrap_or_default())
    }
}

fn handle(id: &str) -> LoadBalancerHandle {
    LoadBalancerHandle {
        id: String::from(id),
        name: String::from("lb"),
        actions: HashMap::from([(String::from(SET_SERVICE_LINKS_ACTION), format!("http://cattle/v1/loadbalancerservices/{id}/?action=setservicelinks"))]),
        links: HashMap::new(),
    }
}

fn service(id: &str, name: &str, labels: &[(&str, &str)]) -> ServiceSnapshot {
    ServiceSnapshot {
        id: String::from(id),
        name: String::from(name),
        kind: String::from("service"),
        state: ServiceState::Active,
        environment_id: Some(String::from("1e1")),
        labels: labels.iter().map(|(k, v)| (String::from(*k), String::from(*v))).collect(),
        links: HashMap::new(),
    }
}

fn registered(id: &str, name: &str, labels: &[(&str, &str)]) -> ServiceSnapshot {
    let mut svc = service(id, name, labels);
    svc.labels.insert(String::from("rancher.lb.sync.register"), String::from("true"));
    svc
}

fn environment(id: &str, name: &str) -> EnvironmentDto {
    EnvironmentDto {
        id: String::from(id),
        name: Some(String::from(name)),
        state: Some(ServiceState::Active),
    }
}

fn project_target() -> LoadBalancerTarget {
    LoadBalancerTarget::ById { project_id: String::from("1a5"), id: String::from("1s100") }
}

fn settings(scope: Scope) -> ReconcilerSettings {
    ReconcilerSettings {
        scope,
        label_keys: LabelKeys::default(),
        label_defaults: LabelDefaults::default(),
        watched_kind: String::from("service"),
        pass_timeout: Duration::from_secs(5),
    }
}

fn project_scope() -> Scope {
    Scope::Project { project_id: String::from("1a5"), load_balancer_id: String::from("1s100") }
}

fn reconciler(catalog: Arc<FakeCatalog>, gateway: Arc<FakeGateway>, scope: Scope) -> Reconciler {
    Reconciler::new(catalog, gateway, settings(scope))
}

#[tokio::test]
async fn single_service_with_port_override() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1svc", "web", &[("rancher.lb.sync.ext_port", "8080")])],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog.clone(), gateway.clone(), project_scope());

    let summary = reconciler.reconcile(&ReconcileTrigger::startup()).await.expect("pass failed");
    assert_eq!(summary.load_balancer_id, "1s100");
    assert_eq!(summary.entries.entries(), &[RoutingEntrySpec {
        service_id: String::from("1svc"),
        ports: vec![String::from("web.foo.com:8080=3000")],
    }]);
    assert_eq!(*catalog.scopes.lock().unwrap(), vec![CatalogScope::Project(String::from("1a5"))]);
}

#[tokio::test]
async fn repeated_passes_apply_the_same_set() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![
            registered("1s1", "web", &[]),
            registered("1s2", "api", &[("rancher.lb.sync.domain", "example.org")]),
        ],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    reconciler.reconcile(&ReconcileTrigger::startup()).await.expect("first pass failed");
    reconciler.reconcile(&ReconcileTrigger::resync()).await.expect("second pass failed");

    let replaced = gateway.replaced();
    assert_eq!(replaced.len(), 2);
    assert_eq!(replaced[0], replaced[1]);
}

#[tokio::test]
async fn unregistered_services_are_never_linked() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![
            service("1s1", "plain", &[]),
            service("1s2", "opted-out", &[("rancher.lb.sync.register", "false")]),
            registered("1s3", "web", &[]),
        ],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    reconciler.reconcile(&ReconcileTrigger::startup()).await.expect("pass failed");
    let replaced = gateway.replaced();
    let ids = replaced[0].entries().iter().map(|e| e.service_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["1s3"]);
}

#[tokio::test]
async fn full_name_hosts_map_to_one_port_each() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[("rancher.lb.sync.full_name", "a.example.org, b.example.org,*.c.example.org")])],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    let summary = reconciler.reconcile(&ReconcileTrigger::manual()).await.expect("pass failed");
    assert_eq!(summary.entries.entries()[0].ports, vec![
        String::from("a.example.org:80=3000"),
        String::from("b.example.org:80=3000"),
        String::from("*.c.example.org:80=3000"),
    ]);
}

#[tokio::test]
async fn empty_catalog_clears_the_load_balancer() {
    let catalog = Arc::new(FakeCatalog::default());
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    let summary = reconciler.reconcile(&ReconcileTrigger::startup()).await.expect("pass failed");
    assert!(summary.entries.is_empty());
    let replaced = gateway.replaced();
    assert_eq!(replaced.len(), 1);
    assert!(replaced[0].is_empty());
}

#[tokio::test]
async fn catalog_failure_leaves_the_load_balancer_untouched() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        failure: Some(500),
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    let err = reconciler.reconcile(&ReconcileTrigger::startup()).await.expect_err("pass succeeded");
    assert!(matches!(err, ReconcileError::CatalogUnavailable(GatewayError::Status { status: 500, .. })));
    assert_eq!(err.code(), "CATALOG_UNAVAILABLE");
    assert!(gateway.replaced().is_empty());
}

#[tokio::test]
async fn invalid_metadata_skips_only_that_service() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![
            registered("1s1", "web", &[]),
            registered("1s2", "broken", &[("rancher.lb.sync.ext_port", "http")]),
            registered("1s3", "api", &[]),
        ],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    let (result, report) = reconciler.reconcile_with_report(&ReconcileTrigger::startup()).await;
    let summary = result.expect("pass failed");
    assert_eq!(summary.entries.len(), 2);
    assert_eq!(summary.skipped_services, 1);
    assert_eq!(report.entries, 2);
    assert_eq!(report.skipped_services, 1);
    assert!(report.code.is_none());
}

#[tokio::test]
async fn missing_load_balancer_fails_the_pass() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(LoadBalancerTarget::ById { project_id: String::from("1a5"), id: String::from("1s999") }));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    let (result, report) = reconciler.reconcile_with_report(&ReconcileTrigger::startup()).await;
    assert!(matches!(result, Err(ReconcileError::LoadBalancerNotFound(_))));
    assert_eq!(report.code.as_deref(), Some("LOAD_BALANCER_NOT_FOUND"));
    assert!(gateway.replaced().is_empty());
}

#[tokio::test]
async fn stack_scope_resolves_load_balancer_by_name() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        environments: vec![environment("1e1", "frontend"), environment("1e2", "backend")],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(LoadBalancerTarget::ByName { environment_id: String::from("1e1"), name: String::from("public-lb") }));
    let scope = Scope::Stack { stack_name: String::from("frontend"), load_balancer_name: String::from("public-lb") };
    let reconciler = reconciler(catalog.clone(), gateway.clone(), scope);

    reconciler.reconcile(&ReconcileTrigger::startup()).await.expect("pass failed");
    assert_eq!(gateway.replaced().len(), 1);
    assert_eq!(*catalog.scopes.lock().unwrap(), vec![CatalogScope::AllEnvironments]);
}

#[tokio::test]
async fn ambiguous_load_balancer_fails_the_pass() {
    let catalog = Arc::new(FakeCatalog {
        environments: vec![environment("1e1", "frontend")],
        ..Default::default()
    });
    let mut gateway = FakeGateway::with(project_target());
    gateway.ambiguous = true;
    let gateway = Arc::new(gateway);
    let scope = Scope::Stack { stack_name: String::from("frontend"), load_balancer_name: String::from("public-lb") };
    let reconciler = reconciler(catalog, gateway.clone(), scope);

    let err = reconciler.reconcile(&ReconcileTrigger::startup()).await.expect_err("pass succeeded");
    assert!(matches!(err, ReconcileError::AmbiguousLoadBalancer { count: 2, .. }));
    assert!(gateway.replaced().is_empty());
}

#[tokio::test]
async fn unknown_stack_fails_context_resolution() {
    let catalog = Arc::new(FakeCatalog {
        environments: vec![environment("1e1", "frontend"), environment("1e2", "frontend")],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));

    let missing = Scope::Stack { stack_name: String::from("nope"), load_balancer_name: String::from("lb") };
    let err = reconciler(catalog.clone(), gateway.clone(), missing)
        .reconcile(&ReconcileTrigger::startup()).await.expect_err("pass succeeded");
    assert_eq!(err.code(), "CONTEXT_RESOLUTION_FAILED");

    let duplicated = Scope::Stack { stack_name: String::from("frontend"), load_balancer_name: String::from("lb") };
    let err = reconciler(catalog, gateway, duplicated)
        .reconcile(&ReconcileTrigger::startup()).await.expect_err("pass succeeded");
    assert_eq!(err.code(), "CONTEXT_RESOLUTION_FAILED");
}

#[tokio::test]
async fn event_stack_scope_uses_the_trigger_environment() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        environments: vec![environment("1e7", "shop")],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(LoadBalancerTarget::ByName { environment_id: String::from("1e7"), name: String::from("lb") }));
    let scope = Scope::EventStack { load_balancer_name: String::from("lb") };
    let reconciler = reconciler(catalog.clone(), gateway.clone(), scope);

    let err = reconciler.reconcile(&ReconcileTrigger::startup()).await.expect_err("pass without environment succeeded");
    assert!(matches!(err, ReconcileError::ContextResolutionFailed(_)));
    assert!(gateway.replaced().is_empty());

    let trigger = ReconcileTrigger::event(ServiceState::Active, Some(String::from("1e7")));
    reconciler.reconcile(&trigger).await.expect("pass failed");
    assert_eq!(gateway.replaced().len(), 1);
    assert_eq!(*catalog.scopes.lock().unwrap(), vec![CatalogScope::Environment(String::from("1e7"))]);
}

#[tokio::test(start_paused = true)]
async fn pass_deadline_expires_before_any_write() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        hang: true,
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    let err = reconciler.reconcile(&ReconcileTrigger::startup()).await.expect_err("pass succeeded");
    assert!(matches!(err, ReconcileError::Timeout { secs: 5 }));
    assert!(gateway.replaced().is_empty());
}

#[tokio::test]
async fn concurrent_modification_is_reported() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        ..Default::default()
    });
    let mut gateway = FakeGateway::with(project_target());
    gateway.conflict = true;
    let reconciler = reconciler(catalog, Arc::new(gateway), project_scope());

    let err = reconciler.reconcile(&ReconcileTrigger::startup()).await.expect_err("pass succeeded");
    assert_eq!(err.code(), "CONCURRENT_MODIFICATION");
}

#[tokio::test]
async fn preview_and_current_entries_do_not_write() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    let desired = reconciler.desired_state(&ReconcileTrigger::manual()).await.expect("preview failed");
    assert_eq!(desired.entries.len(), 1);
    assert!(reconciler.current_entries(&ReconcileTrigger::manual()).await.expect("listing failed").is_empty());
    assert!(gateway.replaced().is_empty());
}

#[tokio::test]
async fn handle_event_filters_before_reconciling() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = reconciler(catalog, gateway.clone(), project_scope());

    let ping = ChangeEvent::parse(r#"{"name":"ping"}"#).unwrap();
    assert!(reconciler.handle_event(&ping).await.unwrap().is_none());

    let container = ChangeEvent::parse(r#"{"name":"resource.change","resourceType":"container","data":{"resource":{"id":"1i3","state":"active"}}}"#).unwrap();
    assert!(reconciler.handle_event(&container).await.unwrap().is_none());

    let activating = ChangeEvent::parse(r#"{"name":"resource.change","resourceType":"service","data":{"resource":{"id":"1s1","state":"activating"}}}"#).unwrap();
    assert!(reconciler.handle_event(&activating).await.unwrap().is_none());
    assert!(gateway.replaced().is_empty());

    let removed = ChangeEvent::parse(r#"{"name":"resource.change","resourceType":"service","data":{"resource":{"id":"1s2","state":"removed"}}}"#).unwrap();
    let summary = reconciler.handle_event(&removed).await.unwrap().expect("removal did not trigger a pass");
    assert_eq!(summary.entries.len(), 1);
    assert_eq!(gateway.replaced().len(), 1);
}

#[tokio::test]
async fn worker_drains_queue_and_publishes_reports() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = Arc::new(reconciler(catalog, gateway.clone(), project_scope()));

    let queue = PassQueue::new();
    let status: StatusBoard = Arc::new(RwLock::new(None));
    queue.push(ReconcileTrigger::startup());
    queue.push(ReconcileTrigger::manual());
    queue.close();

    PassWorker::new(queue, reconciler, None, status.clone()).run().await;

    assert_eq!(gateway.replaced().len(), 2);
    let report = status.read().await.clone().expect("missing report");
    assert_eq!(report.outcome, PassOutcome::Success);
    assert_eq!(report.trigger, Some(ReconcileTrigger::manual()));
    assert_eq!(report.entries, 1);
}

#[tokio::test]
async fn shutdown_drains_pending_passes() {
    let catalog = Arc::new(FakeCatalog {
        services: vec![registered("1s1", "web", &[])],
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let reconciler = Arc::new(reconciler(catalog, gateway.clone(), project_scope()));

    let queue = PassQueue::new();
    let status: StatusBoard = Arc::new(RwLock::new(None));
    let worker = tokio::spawn(PassWorker::new(queue.clone(), reconciler, None, status.clone()).run());
    queue.push(ReconcileTrigger::startup());
    queue.push(ReconcileTrigger::resync());
    queue.push(ReconcileTrigger::manual());

    assert!(drain_worker(&queue, worker, Duration::from_secs(5)).await);
    assert_eq!(gateway.replaced().len(), 3);
    assert!(queue.is_empty());
    let report = status.read().await.clone().expect("missing report");
    assert_eq!(report.trigger, Some(ReconcileTrigger::manual()));
}

#[tokio::test(start_paused = true)]
async fn shutdown_drain_is_bounded() {
    let catalog = Arc::new(FakeCatalog {
        hang: true,
        ..Default::default()
    });
    let gateway = Arc::new(FakeGateway::with(project_target()));
    let mut settings = settings(project_scope());
    settings.pass_timeout = Duration::from_secs(60);
    let reconciler = Arc::new(Reconciler::new(catalog, gateway.clone(), settings));

    let queue = PassQueue::new();
    let status: StatusBoard = Arc::new(RwLock::new(None));
    let worker = tokio::spawn(PassWorker::new(queue.clone(), reconciler, None, status).run());
    queue.push(ReconcileTrigger::startup());
    queue.push(ReconcileTrigger::manual());

    assert!(!drain_worker(&queue, worker, Duration::from_secs(5)).await);
    assert!(gateway.replaced().is_empty());
}
