//! # pacer-sim
//!
//! Runs a scheduler scenario against a simulated lossy medium and prints
//! the resulting statistics as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: 1000 ticks, 10% loss, seed 1
//! pacer-sim
//!
//! # Scenario file with overrides, tick log written as JSON lines
//! pacer-sim --config scenario.toml --ticks 5000 --seed 7 --log ticks.jsonl
//!
//! # Check that a log replays to the same outcomes
//! pacer-sim --config scenario.toml --replay ticks.jsonl
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pacer_sim::log::{read_jsonl, replay, write_record};
use pacer_sim::runner::{run, run_with};
use pacer_sim::scenario::ScenarioConfig;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    ticks: Option<u64>,
    seed: Option<u64>,
    log: Option<PathBuf>,
    replay: Option<PathBuf>,
}

fn main() -> Result<()> {
    // ── Logging ─────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    // ── Parse CLI ───────────────────────────────────────────────
    let args = parse_args()?;

    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            ScenarioConfig::from_toml_str(&text)?
        }
        None => ScenarioConfig::default(),
    };
    if let Some(ticks) = args.ticks {
        cfg.ticks = ticks;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }

    // ── Replay ──────────────────────────────────────────────────
    if let Some(path) = &args.replay {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let records = read_jsonl(BufReader::new(file))?;
        let scheduler = replay(cfg.scheduler.clone(), &records)?;
        tracing::info!(
            ticks = scheduler.clock(),
            queued = scheduler.queue_len(),
            in_flight = scheduler.in_flight_len(),
            "replay matched log"
        );
        println!("{}", serde_json::to_string_pretty(scheduler.stats())?);
        return Ok(());
    }

    // ── Run ─────────────────────────────────────────────────────
    let report = match &args.log {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut w = BufWriter::new(file);
            let mut written = 0u64;
            let report = run_with(&cfg, |record| {
                write_record(&mut w, &record)?;
                written += 1;
                Ok(ControlFlow::Continue(()))
            })?;
            w.flush()?;
            tracing::info!(path = %path.display(), records = written, "tick log written");
            report
        }
        None => run(&cfg)?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_args() -> Result<Args> {
    let mut out = Args::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => out.config = Some(next_value(&mut args, "--config")?.into()),
            "--ticks" => out.ticks = Some(next_value(&mut args, "--ticks")?.parse()?),
            "--seed" => out.seed = Some(next_value(&mut args, "--seed")?.parse()?),
            "--log" => out.log = Some(next_value(&mut args, "--log")?.into()),
            "--replay" => out.replay = Some(next_value(&mut args, "--replay")?.into()),
            "-h" | "--help" => {
                println!(
                    "usage: pacer-sim [--config FILE] [--ticks N] [--seed S] [--log FILE] [--replay FILE]"
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument {other:?}"),
        }
    }

    Ok(out)
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("missing value for {flag}"))
}
