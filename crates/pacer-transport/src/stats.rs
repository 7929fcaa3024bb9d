//! # Scheduler Statistics
//!
//! Counters maintained by the scheduler across ticks. Serializable so the
//! simulator can dump them as JSON.

use serde::Serialize;

/// Aggregate scheduler-side statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Ticks processed.
    pub ticks: u64,
    /// Data packets inserted into the queue (first submissions only).
    pub packets_enqueued: u64,
    /// Transmissions, including retransmissions.
    pub packets_sent: u64,
    /// Transmissions of a packet that had previously timed out.
    pub retransmissions: u64,
    /// In-flight entries that exceeded their ack tolerance.
    pub timeouts: u64,
    /// Ack packets seen.
    pub acks_received: u64,
    /// Acks that cleared an in-flight entry.
    pub acks_matched: u64,
    /// Acks for ids not in flight.
    pub acks_unmatched: u64,
    /// Deepest the queue has been at the end of a tick.
    pub max_queue_depth: usize,
}

impl SchedulerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of transmissions that were acknowledged.
    pub fn ack_ratio(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.acks_matched as f64 / self.packets_sent as f64
        }
    }

    /// Retransmission overhead ratio.
    pub fn retransmit_ratio(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.retransmissions as f64 / self.packets_sent as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_zero_when_idle() {
        let stats = SchedulerStats::new();
        assert_eq!(stats.ack_ratio(), 0.0);
        assert_eq!(stats.retransmit_ratio(), 0.0);
    }

    #[test]
    fn ratios() {
        let stats = SchedulerStats {
            packets_sent: 10,
            acks_matched: 8,
            retransmissions: 2,
            ..Default::default()
        };
        assert!((stats.ack_ratio() - 0.8).abs() < f64::EPSILON);
        assert!((stats.retransmit_ratio() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_to_json() {
        let stats = SchedulerStats {
            ticks: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["ticks"], 3);
        assert_eq!(json["packets_sent"], 0);
    }
}
