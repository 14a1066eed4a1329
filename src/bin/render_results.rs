//! Utility to render a saved assessment snapshot and optionally download its report.
//!
//! Usage: `render_results <snapshot.json> [--download]`

use anyhow::Context;
use ayursutra_results::config::Config;
use ayursutra_results::controller::{ReportController, TriggerRejected};
use ayursutra_results::models::{AssessmentSnapshot, DownloadState};
use ayursutra_results::navigation::NavigationGuard;
use ayursutra_results::store::AssessmentStore;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ayursutra_results=info".into()),
        )
        .init();

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .context("usage: render_results <snapshot.json> [--download]")?;
    let download = args.any(|arg| arg == "--download");

    let config = Config::from_env()?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path))?;
    let assessment: AssessmentSnapshot =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a valid snapshot", path))?;

    let store = AssessmentStore::new();
    store.replace(assessment)?;

    let guard = NavigationGuard::new(config.assessment_entry_point.clone());
    println!("{}", guard.enter(&store.read()));

    if !download {
        return Ok(());
    }

    let controller = ReportController::from_config(store, &config)?;
    match controller.trigger().await {
        Ok(DownloadState::Succeeded { report, .. }) => {
            println!();
            println!("Report saved to {}", report.path.display());
        }
        Ok(DownloadState::Failed { reason, .. }) => anyhow::bail!("Error: {}", reason),
        Ok(other) => anyhow::bail!("unexpected download state: {:?}", other),
        Err(TriggerRejected::NoAssessment) => {
            println!();
            println!("Nothing to download: complete the assessment first.");
        }
        Err(TriggerRejected::InFlight) => anyhow::bail!("a download is already in progress"),
    }

    Ok(())
}
