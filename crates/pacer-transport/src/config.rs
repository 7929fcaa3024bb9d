use serde::Deserialize;

use crate::error::{Result, SchedulerError};
use crate::packet::{CostTable, PacketKind};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulerConfigInput {
    pub version: u32,
    pub queue: QueueConfigInput,
    pub costs: CostConfigInput,
    pub disabled_kinds: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueConfigInput {
    pub initial_capacity: Option<usize>,
}

/// Only data kinds can be priced; `ack` or a misspelled kind is an error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostConfigInput {
    pub text: Option<u64>,
    pub picture: Option<u64>,
    pub audio: Option<u64>,
    pub video: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub version: u32,
    /// Pre-allocation hint for the priority queue.
    pub queue_capacity: usize,
    pub costs: CostTable,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            queue_capacity: 16,
            costs: CostTable::default(),
        }
    }
}

impl SchedulerConfigInput {
    pub fn resolve(self) -> Result<SchedulerConfig> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(SchedulerError::Config(format!(
                "unsupported config version {}",
                version
            )));
        }

        let defaults = CostTable::default();
        let mut costs = CostTable {
            text: self.costs.text.or(defaults.text),
            picture: self.costs.picture.or(defaults.picture),
            audio: self.costs.audio.or(defaults.audio),
            video: self.costs.video.or(defaults.video),
        };

        for name in &self.disabled_kinds {
            let kind: PacketKind = name
                .parse()
                .map_err(|e: SchedulerError| SchedulerError::Config(e.to_string()))?;
            match costs.slot_mut(kind) {
                Some(slot) => *slot = None,
                None => {
                    return Err(SchedulerError::Config(format!(
                        "{kind} is not a data kind and cannot be disabled"
                    )))
                }
            }
        }

        Ok(SchedulerConfig {
            version,
            queue_capacity: self
                .queue
                .initial_capacity
                .unwrap_or(SchedulerConfig::default().queue_capacity),
            costs,
        })
    }
}

impl SchedulerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(SchedulerConfig::default());
        }
        let parsed: SchedulerConfigInput = toml::from_str(input)
            .map_err(|e| SchedulerError::Config(format!("invalid config TOML: {}", e)))?;
        parsed.resolve()
    }
}
