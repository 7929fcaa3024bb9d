//! Drives a scheduler against the simulated medium for a whole scenario.

use std::ops::ControlFlow;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use pacer_transport::stats::SchedulerStats;
use pacer_transport::Scheduler;

use crate::log::TickRecord;
use crate::medium::{LossyMedium, MediumStats};
use crate::scenario::{Scenario, ScenarioConfig};

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub seed: u64,
    pub ticks: u64,
    pub packets_generated: u64,
    pub scheduler: SchedulerStats,
    pub medium: MediumStats,
    pub queued_at_end: usize,
    pub in_flight_at_end: usize,
}

/// Run `cfg.ticks` ticks without keeping a tick log.
pub fn run(cfg: &ScenarioConfig) -> Result<SimReport> {
    run_with(cfg, |_| Ok(ControlFlow::Continue(())))
}

/// Run `cfg.ticks` ticks and keep every [`TickRecord`] in memory.
pub fn record(cfg: &ScenarioConfig) -> Result<(SimReport, Vec<TickRecord>)> {
    let mut records = Vec::new();
    let report = run_with(cfg, |record| {
        records.push(record);
        Ok(ControlFlow::Continue(()))
    })?;
    Ok((report, records))
}

/// Run up to `cfg.ticks` ticks, handing each tick's record to `on_tick`.
///
/// Each tick's arrivals are the acks the medium has due, followed by the
/// packets the scenario generates. Whatever the scheduler sends is handed
/// to the medium on the same tick. The run ends early when `on_tick`
/// returns `Break`, and fails as soon as it returns an error.
pub fn run_with<F>(cfg: &ScenarioConfig, mut on_tick: F) -> Result<SimReport>
where
    F: FnMut(TickRecord) -> Result<ControlFlow<()>>,
{
    let mut scheduler = Scheduler::with_config(cfg.scheduler.clone());
    let mut scenario = Scenario::new(cfg.traffic.clone(), cfg.seed);
    // Separate stream so loss decisions don't shift when traffic changes.
    let mut medium = LossyMedium::new(
        cfg.seed.wrapping_add(1),
        cfg.medium.loss_percent,
        cfg.medium.ack_delay,
    );

    info!(
        seed = cfg.seed,
        ticks = cfg.ticks,
        loss_percent = cfg.medium.loss_percent,
        ack_delay = cfg.medium.ack_delay,
        "simulation starting"
    );

    for _ in 0..cfg.ticks {
        let now = scheduler.clock() + 1;
        let mut arrivals = medium.deliver(now);
        arrivals.extend(scenario.arrivals());

        let outcome = scheduler.tick(arrivals.clone())?;
        medium.transmit(now, &outcome.sent);

        if !outcome.sent.is_empty() || !outcome.acked.is_empty() {
            debug!(
                tick = now,
                sent = outcome.sent.len(),
                acked = outcome.acked.len(),
                queued = scheduler.queue_len(),
                in_flight = scheduler.in_flight_len(),
                "tick"
            );
        }
        if on_tick(TickRecord::new(now, arrivals, &outcome))?.is_break() {
            debug!(tick = now, "run stopped by caller");
            break;
        }
    }

    let report = SimReport {
        seed: cfg.seed,
        ticks: scheduler.clock(),
        packets_generated: scenario.generated(),
        scheduler: scheduler.stats().clone(),
        medium: medium.stats().clone(),
        queued_at_end: scheduler.queue_len(),
        in_flight_at_end: scheduler.in_flight_len(),
    };

    info!(
        sent = report.scheduler.packets_sent,
        retransmissions = report.scheduler.retransmissions,
        timeouts = report.scheduler.timeouts,
        acked = report.scheduler.acks_matched,
        queued = report.queued_at_end,
        in_flight = report.in_flight_at_end,
        "simulation finished"
    );

    Ok(report)
}
