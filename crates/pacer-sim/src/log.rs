//! Tick log.
//!
//! The scheduler keeps no durable state, but it is deterministic: replaying
//! the same arrivals tick by tick rebuilds the same queue and in-flight
//! table. A [`TickRecord`] per tick, stored as JSON lines, is therefore
//! enough to reconstruct a scheduler after the fact.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use pacer_transport::config::SchedulerConfig;
use pacer_transport::{Packet, Scheduler, Tick, TickOutcome};

/// Inputs and outputs of a single tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: Tick,
    pub arrivals: Vec<Packet>,
    pub sent: Vec<Packet>,
    pub acked: Vec<Packet>,
}

impl TickRecord {
    pub fn new(tick: Tick, arrivals: Vec<Packet>, outcome: &TickOutcome) -> Self {
        Self {
            tick,
            arrivals,
            sent: outcome.sent.clone(),
            acked: outcome.acked.clone(),
        }
    }
}

/// Append one record as a single JSON line.
pub fn write_record<W: Write>(w: &mut W, record: &TickRecord) -> Result<()> {
    serde_json::to_writer(&mut *w, record)?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write records as one JSON object per line.
pub fn write_jsonl<W: Write>(mut w: W, records: &[TickRecord]) -> Result<()> {
    for record in records {
        write_record(&mut w, record)?;
    }
    w.flush()?;
    Ok(())
}

/// Read records written by [`write_jsonl`]. Blank lines are skipped.
pub fn read_jsonl<R: BufRead>(r: R) -> Result<Vec<TickRecord>> {
    let mut records = Vec::new();
    for (idx, line) in r.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: TickRecord = serde_json::from_str(&line)
            .with_context(|| format!("bad tick record on line {}", idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Rebuild a scheduler by replaying `records` from tick 1.
///
/// Fails if the log skips a tick or if the replayed outcome of any tick
/// differs from the one recorded.
pub fn replay(config: SchedulerConfig, records: &[TickRecord]) -> Result<Scheduler> {
    let mut scheduler = Scheduler::with_config(config);
    for record in records {
        let expected = scheduler.clock() + 1;
        ensure!(
            record.tick == expected,
            "tick log out of order: expected tick {}, found {}",
            expected,
            record.tick
        );

        let outcome = scheduler
            .tick(record.arrivals.clone())
            .with_context(|| format!("replaying tick {}", record.tick))?;
        ensure!(
            outcome.sent == record.sent,
            "tick {}: replay sent {:?}, log says {:?}",
            record.tick,
            outcome.sent,
            record.sent
        );
        ensure!(
            outcome.acked == record.acked,
            "tick {}: replay acked {} packets, log says {}",
            record.tick,
            outcome.acked.len(),
            record.acked.len()
        );
    }
    Ok(scheduler)
}
