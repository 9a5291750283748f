use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use lb_sync::client::RancherClient;
use lb_sync::core::config::{compose_config, LbSyncConfig};
use lb_sync::dto::status::PassOutcome;
use lb_sync::model::entry::{DesiredEntrySet, RoutingEntrySpec};
use lb_sync::model::trigger::ReconcileTrigger;
use lb_sync::service::reconciler_service::{Reconciler, ReconcilerSettings};

use crate::args::{Commands, LbSyncCtlArgs};
use crate::command::execute_command;

mod args;
mod command;

fn build_reconciler(config_path: &str) -> anyhow::Result<Reconciler> {
    let app_config: LbSyncConfig =
        compose_config(config_path, "lbsync").context("Error loading configuration")?;
    let settings = ReconcilerSettings::from_config(&app_config).context("Invalid configuration")?;
    let client = Arc::new(RancherClient::new(
        &app_config.cattle_url,
        &app_config.cattle_access_key,
        &app_config.cattle_secret_key,
        app_config.request_timeout().context("Invalid configuration")?,
    ).context("Error building cattle client")?);
    Ok(Reconciler::new(client.clone(), client, settings))
}

async fn preview(reconciler: &Reconciler, trigger: &ReconcileTrigger) -> anyhow::Result<DesiredEntrySet> {
    let desired = reconciler.desired_state(trigger).await?;
    log::info!(
        "Load balancer {} would receive {} entries ({} services skipped, {} ports dropped)",
        desired.handle.id,
        desired.entries.len(),
        desired.skipped_services,
        desired.dropped_ports,
    );
    Ok(desired.entries)
}

async fn current_entries(reconciler: &Reconciler, trigger: &ReconcileTrigger) -> anyhow::Result<Vec<RoutingEntrySpec>> {
    Ok(reconciler.current_entries(trigger).await?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let args: LbSyncCtlArgs = LbSyncCtlArgs::parse();

    let reconciler = build_reconciler(&args.config)?;
    let trigger = ReconcileTrigger {
        environment_id: args.environment,
        ..ReconcileTrigger::manual()
    };

    let succeeded = match args.subcommand {
        Commands::Preview => {
            execute_command(
                args.out_format,
                || preview(&reconciler, &trigger),
            ).await
        }
        Commands::Sync => {
            let (_, report) = reconciler.reconcile_with_report(&trigger).await;
            let passed = report.outcome == PassOutcome::Success;
            execute_command(
                args.out_format,
                || async move { Ok(report) },
            ).await && passed
        }
        Commands::Entries => {
            execute_command(
                args.out_format,
                || current_entries(&reconciler, &trigger),
            ).await
        }
    };

    Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
