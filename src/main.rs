use std::future::ready;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use futures::TryFutureExt;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::sync::RwLock;
use tokio::try_join;

use lb_sync::client::RancherClient;
use lb_sync::core::config::{compose_config, LbSyncConfig};
use lb_sync::model::trigger::ReconcileTrigger;
use lb_sync::service::queue_service::PassQueue;
use lb_sync::service::reconciler_service::{Reconciler, ReconcilerSettings, PASS_DURATION_METRIC_NAME};
use lb_sync::service::webhook_service::WebhookNotifier;
use lb_sync::service::worker_service::{drain_worker, PassWorker, StatusBoard};
use lb_sync::subscription::run_resync;
use lb_sync::subscription::websocket::EventSubscription;

use crate::state::SyncState;

mod http;
mod state;

fn setup_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(String::from(PASS_DURATION_METRIC_NAME)),
            EXPONENTIAL_SECONDS,
        )?
        .install_recorder()?;
    Ok(handle)
}

async fn serve_management(address: Option<SocketAddr>, state: SyncState, recorder_handle: PrometheusHandle) -> anyhow::Result<()> {
    let Some(address) = address else {
        log::info!("No management address configured, http endpoints disabled");
        return Ok(());
    };

    let app = Router::new()
        .route("/healthz", get(http::sync::healthz_handler))
        .route("/status", get(http::sync::status_handler))
        .route("/sync", post(http::sync::sync_handler))
        .route("/metrics", get(move || ready(recorder_handle.render())))
        .with_state(state);

    log::info!("Management endpoints listening on {address}");
    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let app_config: LbSyncConfig =
        compose_config("lbsync", "lbsync").context("Error loading configuration")?;

    let settings = ReconcilerSettings::from_config(&app_config).context("Invalid configuration")?;
    let client = Arc::new(RancherClient::new(
        &app_config.cattle_url,
        &app_config.cattle_access_key,
        &app_config.cattle_secret_key,
        app_config.request_timeout().context("Invalid configuration")?,
    ).context("Error building cattle client")?);
    let event_scoped = settings.scope.requires_event_context();
    let drain_bound = settings.pass_timeout;
    let reconciler = Arc::new(Reconciler::new(client.clone(), client.clone(), settings));

    let queue = PassQueue::new();
    let status: StatusBoard = Arc::new(RwLock::new(None));
    let webhook = app_config.webhook_url.as_deref()
        .map(|url| WebhookNotifier::new(client.http(), url, app_config.webhook_states()));

    let recorder_handle = setup_metrics_recorder().context("Error installing metrics recorder")?;

    let resync_interval = if event_scoped {
        log::warn!("Scope '{:?}' resolves the load balancer from events only, startup and periodic passes are disabled", app_config.scope);
        None
    } else {
        queue.push(ReconcileTrigger::startup());
        app_config.resync_interval()
    };

    let subscription = EventSubscription::from_config(&app_config);
    let worker = tokio::spawn(PassWorker::new(queue.clone(), reconciler, webhook, status.clone()).run());
    let state = SyncState::new(queue.clone(), status);

    let services = async {
        try_join!(
            subscription.run(queue.clone())
                .map_err(anyhow::Error::from),
            async {
                if let Some(period) = resync_interval {
                    run_resync(queue.clone(), period).await;
                }
                Ok::<_, anyhow::Error>(())
            },
            serve_management(app_config.address, state, recorder_handle),
        )
    };

    tokio::select! {
        res = services => {
            res.context("Synchronizer stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutdown requested, draining pending passes");
            if drain_worker(&queue, worker, drain_bound).await {
                log::info!("Pending passes drained");
            }
        }
    }
    Ok(())
}
