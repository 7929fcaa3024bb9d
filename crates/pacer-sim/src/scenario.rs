use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;
use serde::Deserialize;

use pacer_transport::config::{SchedulerConfig, SchedulerConfigInput};
use pacer_transport::{Packet, PacketKind};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScenarioConfigInput {
    pub seed: Option<u64>,
    pub ticks: Option<u64>,
    pub traffic: TrafficConfigInput,
    pub medium: MediumConfigInput,
    pub scheduler: SchedulerConfigInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrafficConfigInput {
    pub arrival_percent: Option<f64>,
    pub max_arrivals_per_tick: Option<usize>,
    pub min_tolerance: Option<u64>,
    pub max_tolerance: Option<u64>,
    pub kinds: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediumConfigInput {
    pub loss_percent: Option<f64>,
    pub ack_delay: Option<u64>,
}

/// Packet source parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficConfig {
    /// Chance per arrival slot that a data packet shows up.
    pub arrival_percent: f64,
    pub max_arrivals_per_tick: usize,
    pub min_tolerance: u64,
    pub max_tolerance: u64,
    pub kinds: Vec<PacketKind>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            arrival_percent: 60.0,
            max_arrivals_per_tick: 1,
            min_tolerance: 2,
            max_tolerance: 8,
            kinds: PacketKind::DATA.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediumConfig {
    pub loss_percent: f64,
    pub ack_delay: u64,
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            loss_percent: 10.0,
            ack_delay: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub ticks: u64,
    pub traffic: TrafficConfig,
    pub medium: MediumConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            ticks: 1_000,
            traffic: TrafficConfig::default(),
            medium: MediumConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ScenarioConfigInput {
    pub fn resolve(self) -> Result<ScenarioConfig> {
        let defaults = ScenarioConfig::default();
        let scheduler = self.scheduler.resolve()?;

        // Every generated kind must be priceable by the scheduler, or the
        // first tick carrying one fails.
        let kinds = match self.traffic.kinds {
            None => defaults
                .traffic
                .kinds
                .into_iter()
                .filter(|kind| scheduler.costs.cost(*kind).is_ok())
                .collect(),
            Some(names) => {
                let mut kinds = Vec::with_capacity(names.len());
                for name in names {
                    let kind: PacketKind = name.parse()?;
                    if kind == PacketKind::Ack {
                        bail!("traffic kinds must be data kinds, got {kind}");
                    }
                    if scheduler.costs.cost(kind).is_err() {
                        bail!("traffic kind {kind} is disabled in the scheduler config");
                    }
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                kinds
            }
        };
        if kinds.is_empty() {
            bail!("traffic needs at least one enabled packet kind");
        }

        let min_tolerance = self
            .traffic
            .min_tolerance
            .unwrap_or(defaults.traffic.min_tolerance);
        let max_tolerance = self
            .traffic
            .max_tolerance
            .unwrap_or(defaults.traffic.max_tolerance)
            .max(min_tolerance);

        let traffic = TrafficConfig {
            arrival_percent: self
                .traffic
                .arrival_percent
                .unwrap_or(defaults.traffic.arrival_percent)
                .clamp(0.0, 100.0),
            max_arrivals_per_tick: self
                .traffic
                .max_arrivals_per_tick
                .unwrap_or(defaults.traffic.max_arrivals_per_tick),
            min_tolerance,
            max_tolerance,
            kinds,
        };

        let medium = MediumConfig {
            loss_percent: self
                .medium
                .loss_percent
                .unwrap_or(defaults.medium.loss_percent)
                .clamp(0.0, 100.0),
            ack_delay: self
                .medium
                .ack_delay
                .unwrap_or(defaults.medium.ack_delay)
                .max(1),
        };

        Ok(ScenarioConfig {
            seed: self.seed.unwrap_or(defaults.seed),
            ticks: self.ticks.unwrap_or(defaults.ticks),
            traffic,
            medium,
            scheduler,
        })
    }
}

impl ScenarioConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(ScenarioConfig::default());
        }
        let parsed: ScenarioConfigInput =
            toml::from_str(input).context("invalid scenario TOML")?;
        parsed.resolve()
    }
}

/// Seeded packet source.
///
/// Given the same [`TrafficConfig`] and seed, produces the same arrivals
/// tick for tick. Packet ids count up from 1 and are never reused.
#[derive(Debug)]
pub struct Scenario {
    cfg: TrafficConfig,
    rng: StdRng,
    next_id: u64,
}

impl Scenario {
    pub fn new(cfg: TrafficConfig, seed: u64) -> Self {
        Self {
            cfg,
            rng: StdRng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Data packets arriving on the next tick.
    pub fn arrivals(&mut self) -> Vec<Packet> {
        let p = self.cfg.arrival_percent / 100.0;
        let mut out = Vec::new();
        for _ in 0..self.cfg.max_arrivals_per_tick {
            if self.rng.random::<f64>() >= p {
                continue;
            }
            let kind = self.cfg.kinds[self.rng.random_range(0..self.cfg.kinds.len())];
            let tolerance = self
                .rng
                .random_range(self.cfg.min_tolerance..=self.cfg.max_tolerance);
            out.push(Packet::data(self.next_id, kind, tolerance));
            self.next_id += 1;
        }
        out
    }

    /// Number of data packets generated so far.
    pub fn generated(&self) -> u64 {
        self.next_id - 1
    }
}
