//! # Packet Model
//!
//! Packets handed to the scheduler by the packet source, and the
//! processing-cost table that turns them into urgency scores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchedulerError};

/// Logical time step counter.
pub type Tick = u64;

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Packet identifier. Acks refer to the data packet they acknowledge by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketId(pub u64);

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Kind ───────────────────────────────────────────────────────────────────

/// Packet content classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketKind {
    Text,
    Picture,
    Audio,
    Video,
    /// Acknowledgment control signal. Never queued.
    Ack,
}

impl PacketKind {
    /// Every kind that carries data.
    pub const DATA: [PacketKind; 4] = [
        PacketKind::Text,
        PacketKind::Picture,
        PacketKind::Audio,
        PacketKind::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PacketKind::Text => "text",
            PacketKind::Picture => "picture",
            PacketKind::Audio => "audio",
            PacketKind::Video => "video",
            PacketKind::Ack => "ack",
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PacketKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(PacketKind::Text),
            "picture" => Ok(PacketKind::Picture),
            "audio" => Ok(PacketKind::Audio),
            "video" => Ok(PacketKind::Video),
            "ack" => Ok(PacketKind::Ack),
            other => Err(SchedulerError::InvalidInput(format!(
                "unknown packet kind {other:?}"
            ))),
        }
    }
}

// ─── Packet ─────────────────────────────────────────────────────────────────

/// A packet as produced by the packet source. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub id: PacketId,
    pub kind: PacketKind,
    /// Ticks to wait for an ack before the transmission counts as lost.
    pub ack_tolerance: u64,
}

impl Packet {
    pub fn data(id: u64, kind: PacketKind, ack_tolerance: u64) -> Self {
        Packet {
            id: PacketId(id),
            kind,
            ack_tolerance,
        }
    }

    /// Ack for the data packet with the given id.
    pub fn ack(id: PacketId) -> Self {
        Packet {
            id,
            kind: PacketKind::Ack,
            ack_tolerance: 0,
        }
    }

    pub fn is_ack(&self) -> bool {
        self.kind == PacketKind::Ack
    }
}

// ─── Cost Table ─────────────────────────────────────────────────────────────

/// Processing cost per data kind.
///
/// `None` marks a kind outside the table; asking for its cost fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostTable {
    pub text: Option<u64>,
    pub picture: Option<u64>,
    pub audio: Option<u64>,
    pub video: Option<u64>,
}

impl Default for CostTable {
    fn default() -> Self {
        CostTable {
            text: Some(1),
            picture: Some(2),
            audio: Some(3),
            video: Some(4),
        }
    }
}

impl CostTable {
    /// Processing cost for `kind`.
    pub fn cost(&self, kind: PacketKind) -> Result<u64> {
        let cost = match kind {
            PacketKind::Text => self.text,
            PacketKind::Picture => self.picture,
            PacketKind::Audio => self.audio,
            PacketKind::Video => self.video,
            PacketKind::Ack => None,
        };
        cost.ok_or_else(|| {
            SchedulerError::InvalidInput(format!("no processing cost for packet kind {kind}"))
        })
    }

    pub(crate) fn slot_mut(&mut self, kind: PacketKind) -> Option<&mut Option<u64>> {
        match kind {
            PacketKind::Text => Some(&mut self.text),
            PacketKind::Picture => Some(&mut self.picture),
            PacketKind::Audio => Some(&mut self.audio),
            PacketKind::Video => Some(&mut self.video),
            PacketKind::Ack => None,
        }
    }

    /// Stored heap priority for `packet`: the negated sum of processing cost
    /// and ack tolerance, so cheaper and tighter packets come out first.
    pub fn urgency(&self, packet: &Packet) -> Result<i64> {
        let cost = self.cost(packet.kind)?.saturating_add(packet.ack_tolerance);
        let cost = i64::try_from(cost).map_err(|_| {
            SchedulerError::InvalidInput(format!(
                "packet {} cost {cost} out of range",
                packet.id
            ))
        })?;
        Ok(-cost)
    }
}
