use std::time::Duration;

use storybox_core::fetch::{Fetch, FetchRequest, HttpFetcher};
use storybox_core::{Connectivity, DrainOutcome, DrainReport, Outbox};

use crate::commands::common::{action_to_list_item, format_action_lines, ActionListItem};
use crate::context::AppContext;
use crate::error::CliError;

pub async fn run_outbox(context: &AppContext, all: bool, as_json: bool) -> Result<(), CliError> {
    let outbox = Outbox::new(context.store("outbox")?.clone());
    let actions = if all {
        outbox.all().await?
    } else {
        outbox.pending().await?
    };

    if as_json {
        let items = actions
            .iter()
            .map(action_to_list_item)
            .collect::<Vec<ActionListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if actions.is_empty() {
        println!("Outbox is empty.");
        return Ok(());
    }
    for line in format_action_lines(&actions) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_sync(context: &AppContext) -> Result<(), CliError> {
    let engine = context.sync_engine("sync")?;
    match engine.drain().await? {
        DrainOutcome::AlreadyDraining => println!("A sync is already running"),
        DrainOutcome::Completed(report) => println!("{}", format_drain_report(&report)),
    }
    Ok(())
}

pub fn format_drain_report(report: &DrainReport) -> String {
    if report.attempted == 0 && report.skipped == 0 && !report.aborted_offline {
        return "Nothing to sync".to_string();
    }

    let mut summary = format!(
        "Synced {} of {} actions",
        report.synced, report.attempted
    );
    if report.skipped > 0 {
        summary.push_str(&format!(", skipped {}", report.skipped));
    }
    if report.aborted_offline {
        summary.push_str(", stopped early: connection lost");
    }
    for (id, reason) in &report.failed {
        summary.push_str(&format!("\n  #{id} still pending: {reason}"));
    }
    summary
}

/// Check the API on an interval and drain whenever connectivity returns.
///
/// Runs until interrupted.
pub async fn run_watch(context: &AppContext, interval_secs: u64) -> Result<(), CliError> {
    let engine = context.sync_engine("watch")?;
    let interval = Duration::from_secs(interval_secs.max(1));
    let base_url = context.config.api_base_url.clone();
    let connectivity = context.connectivity.clone();
    let watcher = connectivity.subscribe();

    println!(
        "Watching {base_url} every {}s (Ctrl-C to stop)",
        interval.as_secs()
    );

    tokio::select! {
        () = engine.run(watcher, Some(interval)) => {}
        () = poll_loop(context.http(), &base_url, &connectivity, interval) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            println!("Stopped");
        }
    }
    Ok(())
}

async fn poll_loop(
    http: &HttpFetcher,
    url: &str,
    connectivity: &Connectivity,
    interval: Duration,
) {
    loop {
        connectivity.set_online(is_reachable(http, url).await);
        tokio::time::sleep(interval).await;
    }
}

/// Any HTTP answer counts as online; only transport failures are offline
pub async fn is_reachable(http: &HttpFetcher, url: &str) -> bool {
    match http.fetch(&FetchRequest::get(url)).await {
        Ok(_) => true,
        Err(error) => {
            tracing::debug!("Connectivity check failed: {}", error);
            false
        }
    }
}
