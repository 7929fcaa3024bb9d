//! Simulated transmission medium.
//!
//! Consumes what the scheduler sends and, unless the transmission is lost,
//! hands an ack for it back a fixed number of ticks later. Loss decisions
//! come from a seeded RNG so runs are reproducible.

use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;

use pacer_transport::{Packet, PacketId, Tick};

/// Medium-side counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediumStats {
    pub transmissions: u64,
    pub dropped: u64,
    pub acks_delivered: u64,
}

#[derive(Debug)]
pub struct LossyMedium {
    rng: StdRng,
    /// Probability in 0.0..=1.0 that a transmission (and so its ack) is lost.
    loss: f64,
    /// Ticks between a transmission and its ack showing up as an arrival.
    ack_delay: u64,
    pending: BTreeMap<Tick, Vec<PacketId>>,
    stats: MediumStats,
}

impl LossyMedium {
    /// `loss_percent` is clamped to 0..=100; `ack_delay` to at least one tick.
    pub fn new(seed: u64, loss_percent: f64, ack_delay: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            loss: (loss_percent / 100.0).clamp(0.0, 1.0),
            ack_delay: ack_delay.max(1),
            pending: BTreeMap::new(),
            stats: MediumStats::default(),
        }
    }

    /// Accept the packets sent on tick `now`.
    pub fn transmit(&mut self, now: Tick, sent: &[Packet]) {
        for pkt in sent {
            self.stats.transmissions += 1;
            if self.rng.random::<f64>() < self.loss {
                self.stats.dropped += 1;
                tracing::trace!(id = %pkt.id, tick = now, "medium dropped transmission");
                continue;
            }
            // A delay past the end of time parks the ack on the last tick.
            self.pending
                .entry(now.saturating_add(self.ack_delay))
                .or_default()
                .push(pkt.id);
        }
    }

    /// Acks due on or before tick `now`, oldest first.
    pub fn deliver(&mut self, now: Tick) -> Vec<Packet> {
        let later = match now.checked_add(1) {
            Some(next) => self.pending.split_off(&next),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.pending, later);
        let acks: Vec<Packet> = due.into_values().flatten().map(Packet::ack).collect();
        self.stats.acks_delivered += acks.len() as u64;
        acks
    }

    /// Acks scheduled but not yet delivered.
    pub fn pending_acks(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn stats(&self) -> &MediumStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_transport::PacketKind;

    fn pkt(id: u64) -> Packet {
        Packet::data(id, PacketKind::Text, 3)
    }

    #[test]
    fn lossless_acks_arrive_after_delay() {
        let mut m = LossyMedium::new(1, 0.0, 2);
        m.transmit(5, &[pkt(1)]);
        assert!(m.deliver(6).is_empty());
        let acks = m.deliver(7);
        assert_eq!(acks, vec![Packet::ack(PacketId(1))]);
        assert!(m.deliver(8).is_empty());
        assert_eq!(m.stats().acks_delivered, 1);
    }

    #[test]
    fn total_loss_delivers_nothing() {
        let mut m = LossyMedium::new(1, 100.0, 1);
        for i in 0..50 {
            m.transmit(i, &[pkt(i)]);
        }
        assert!(m.deliver(1_000).is_empty());
        assert_eq!(m.stats().dropped, 50);
    }

    #[test]
    fn overdue_acks_are_flushed_together() {
        let mut m = LossyMedium::new(1, 0.0, 1);
        m.transmit(1, &[pkt(1)]);
        m.transmit(2, &[pkt(2)]);
        let acks = m.deliver(10);
        assert_eq!(acks.len(), 2);
        assert_eq!(acks[0].id, PacketId(1));
        assert_eq!(m.pending_acks(), 0);
    }

    #[test]
    fn zero_delay_is_clamped() {
        let mut m = LossyMedium::new(1, 0.0, 0);
        m.transmit(3, &[pkt(1)]);
        assert!(m.deliver(3).is_empty());
        assert_eq!(m.deliver(4).len(), 1);
    }

    #[test]
    fn huge_delay_saturates_instead_of_overflowing() {
        let mut m = LossyMedium::new(1, 0.0, u64::MAX);
        m.transmit(5, &[pkt(1)]);
        m.transmit(u64::MAX - 1, &[pkt(2)]);
        assert!(m.deliver(1_000_000).is_empty());
        assert!(m.deliver(u64::MAX - 1).is_empty());
        assert_eq!(m.pending_acks(), 2);
        let acks = m.deliver(u64::MAX);
        assert_eq!(acks.len(), 2);
        assert_eq!(m.pending_acks(), 0);
    }

    #[test]
    fn same_seed_same_losses() {
        let run = |seed| {
            let mut m = LossyMedium::new(seed, 40.0, 1);
            for i in 0..200 {
                m.transmit(i, &[pkt(i)]);
            }
            m.stats().clone()
        };
        assert_eq!(run(9), run(9));
    }
}
