//! Offline failover drill
//!
//! Sends requests through a [`Warden`] on a manual clock against two
//! simulated providers. The primary is down for the first `outage`
//! requests; the report shows which tier served each request, how the
//! primary's circuit moved and what the spend windows look like.

use crate::args::DrillArgs;
use crate::console::CliConsole;
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use warden_core::failover::FailoverEvent;
use warden_core::{
    Admission, CircuitState, FailoverOptions, HealthSnapshot, ManualClock, RateLimitConfig,
    SpendRecord, SpendingStatus, UpstreamError, Warden, WardenConfig,
};

const DRILL_START_MS: u64 = 1_700_000_000_000;
const DRILL_CALLER: &str = "user:drill";

#[derive(Debug, Serialize)]
pub struct DrillRow {
    pub request: u32,
    pub at_secs: u64,
    /// Provider that served the request, if any
    pub served_by: Option<String>,
    pub used_fallback: bool,
    pub primary_circuit: CircuitState,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DrillReport {
    pub rows: Vec<DrillRow>,
    pub health: BTreeMap<String, HealthSnapshot>,
    pub spending: SpendingStatus,
    pub events: Vec<FailoverEvent>,
}

/// Run the drill and print its report
pub async fn run(config: WardenConfig, args: &DrillArgs) -> anyhow::Result<()> {
    let report = simulate(config, args).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let console = CliConsole::new();
    console.print_header("Requests");
    for row in &report.rows {
        let served = match (&row.served_by, row.used_fallback) {
            (Some(name), false) => name.green().to_string(),
            (Some(name), true) => format!("{} (fallback)", name).yellow().to_string(),
            (None, _) => "rejected".red().to_string(),
        };
        println!(
            "  #{:<3} t+{:>4}s  {:<28} primary circuit: {}{}",
            row.request,
            row.at_secs,
            served,
            row.primary_circuit,
            row.note
                .as_deref()
                .map(|note| format!("  ({})", note))
                .unwrap_or_default()
        );
    }

    console.print_header("Provider health");
    for (provider, health) in &report.health {
        let line = format!(
            "{}: {} (failures {}, total {})",
            provider, health.state, health.failures, health.total_failures
        );
        if health.healthy {
            console.success(&line);
        } else {
            console.warn(&line);
        }
    }

    console.print_header("Spending");
    for (name, window) in [("hourly", &report.spending.hourly), ("daily", &report.spending.daily)] {
        console.info(&format!(
            "{}: ${:.2} of ${:.2} ({:.0}%, {:?})",
            name,
            window.spent,
            window.limit,
            window.percentage * 100.0,
            window.status
        ));
    }
    console.info(&format!("failovers recorded: {}", report.events.len()));
    Ok(())
}

/// Drive the simulated traffic and collect the report
pub async fn simulate(config: WardenConfig, args: &DrillArgs) -> anyhow::Result<DrillReport> {
    tracing::info!(
        requests = args.requests,
        outage = args.outage,
        interval_secs = args.interval_secs,
        "Starting failover drill"
    );
    let clock = ManualClock::new(DRILL_START_MS);
    let warden = Warden::from_config(config, Arc::new(clock.clone()), None)?;
    let limiter = warden.create_rate_limiter(RateLimitConfig::api())?;
    let primary = warden
        .config()
        .failover
        .providers
        .first()
        .cloned()
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(args.requests as usize);
    for request in 0..args.requests {
        let at_secs = u64::from(request) * args.interval_secs;
        let mut row = DrillRow {
            request,
            at_secs,
            served_by: None,
            used_fallback: false,
            primary_circuit: CircuitState::Closed,
            note: None,
        };

        match warden.admit(&limiter, DRILL_CALLER).await {
            Admission::Allowed { .. } => {
                let primary_down = request < args.outage;
                let result = warden
                    .failover()
                    .execute_with_failover(
                        || async move {
                            if primary_down {
                                Err(UpstreamError::with_status(503, "503 Service Unavailable"))
                            } else {
                                Ok(())
                            }
                        },
                        || async { Ok(()) },
                        FailoverOptions::new(),
                    )
                    .await;

                match result {
                    Ok(outcome) => {
                        warden
                            .spending()
                            .record_spending(&SpendRecord::new(
                                args.cost_usd,
                                outcome.provider_name.clone(),
                                "drill-model",
                            ))
                            .await;
                        row.used_fallback = outcome.used_fallback;
                        row.served_by = Some(outcome.provider_name);
                    }
                    Err(error) => row.note = Some(error.to_string()),
                }
            }
            Admission::RateLimited { retry_after_ms, .. } => {
                row.note = Some(format!("rate limited, retry in {}ms", retry_after_ms));
            }
            Admission::SpendingBlocked { window, .. } => {
                row.note = Some(format!("{} spend limit reached", window));
            }
        }

        row.primary_circuit = warden.breaker().state(&primary);
        tracing::debug!(
            request,
            served_by = ?row.served_by,
            primary_circuit = %row.primary_circuit,
            "Drill request finished"
        );
        rows.push(row);
        clock.advance(Duration::from_secs(args.interval_secs));
    }

    Ok(DrillReport {
        rows,
        health: warden.breaker().provider_health(),
        spending: warden.spending().spending_status().await,
        events: warden.failover().recent_events(),
    })
}
