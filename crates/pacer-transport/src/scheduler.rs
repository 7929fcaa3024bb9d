//! # Transmission Scheduler
//!
//! Pure logic, no I/O and no clock. The caller drives it one logical tick at
//! a time with whatever arrived since the previous tick; the scheduler
//! answers with what it transmitted and which acks it consumed.
//!
//! ## Tick order
//!
//! 1. **Clock**: advance by one tick
//! 2. **Arrivals**: acks clear in-flight entries, data packets are queued by urgency
//! 3. **Transmit**: at most one packet leaves per tick
//! 4. **Timeout scan**: unacked transmissions past their tolerance are requeued
//!
//! Step 2 finishes before step 3 starts, so an ack can never match a packet
//! sent later in the same tick. Retries are unbounded: a packet whose acks
//! keep getting lost is resubmitted every time its tolerance runs out.

use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::packet::{CostTable, Packet, PacketId, Tick};
use crate::queue::PriorityQueue;
use crate::stats::SchedulerStats;

// ─── In-Flight Entry ────────────────────────────────────────────────────────

/// A transmitted packet awaiting its ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightEntry {
    pub sent_at: Tick,
    /// Queue priority the packet was sent at; reused when it times out.
    pub priority: i64,
    pub packet: Packet,
}

impl InFlightEntry {
    /// Whether the entry has waited longer than its ack tolerance at `now`.
    pub fn is_expired(&self, now: Tick) -> bool {
        now.saturating_sub(self.sent_at) > self.packet.ack_tolerance
    }
}

// ─── Tick Outcome ───────────────────────────────────────────────────────────

/// Result of one [`Scheduler::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Packets read this tick. Always empty; the slot has no semantics yet.
    pub read: Vec<Packet>,
    /// Packets transmitted this tick (zero or one).
    pub sent: Vec<Packet>,
    /// Ack packets received this tick, in arrival order.
    pub acked: Vec<Packet>,
}

// ─── Scheduler ──────────────────────────────────────────────────────────────

/// Tick-driven transmission scheduler.
#[derive(Debug)]
pub struct Scheduler {
    clock: Tick,
    queue: PriorityQueue<Packet>,
    /// Insertion-ordered so the timeout scan requeues deterministically.
    in_flight: IndexMap<PacketId, InFlightEntry>,
    /// Ids requeued by the timeout scan and not yet sent again.
    timed_out: HashSet<PacketId>,
    costs: CostTable,
    stats: SchedulerStats,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Scheduler {
            clock: 0,
            queue: PriorityQueue::with_capacity(config.queue_capacity),
            in_flight: IndexMap::new(),
            timed_out: HashSet::new(),
            costs: config.costs,
            stats: SchedulerStats::default(),
        }
    }

    /// Run one tick.
    ///
    /// Every data arrival is priced before any state changes: if one of them
    /// has a kind outside the cost table the tick fails with
    /// [`SchedulerError::InvalidInput`](crate::error::SchedulerError::InvalidInput)
    /// and the scheduler is left exactly as it was.
    pub fn tick(&mut self, arrivals: Vec<Packet>) -> Result<TickOutcome> {
        let mut priced = Vec::with_capacity(arrivals.len());
        for pkt in arrivals {
            let urgency = if pkt.is_ack() {
                None
            } else {
                Some(self.costs.urgency(&pkt)?)
            };
            priced.push((pkt, urgency));
        }

        self.clock += 1;
        self.stats.ticks += 1;
        let mut outcome = TickOutcome::default();

        for (pkt, urgency) in priced {
            match urgency {
                None => {
                    self.on_ack(&pkt);
                    outcome.acked.push(pkt);
                }
                Some(priority) => {
                    trace!(id = %pkt.id, kind = %pkt.kind, priority, "enqueue");
                    self.queue.insert(pkt, priority);
                    self.stats.packets_enqueued += 1;
                }
            }
        }

        if let Some(entry) = self.queue.extract_max_entry() {
            self.transmit(&entry.value, entry.priority);
            outcome.sent.push(entry.value);
        }

        self.requeue_expired();

        self.stats.max_queue_depth = self.stats.max_queue_depth.max(self.queue.len());
        Ok(outcome)
    }

    fn on_ack(&mut self, ack: &Packet) {
        self.stats.acks_received += 1;
        if let Some(entry) = self.in_flight.shift_remove(&ack.id) {
            self.stats.acks_matched += 1;
            debug!(
                id = %ack.id,
                rtt_ticks = self.clock - entry.sent_at,
                "ack cleared in-flight entry"
            );
        } else {
            self.stats.acks_unmatched += 1;
            trace!(id = %ack.id, "ack for id not in flight");
        }
    }

    fn transmit(&mut self, pkt: &Packet, priority: i64) {
        let retransmit = self.timed_out.remove(&pkt.id);
        if retransmit {
            self.stats.retransmissions += 1;
        }
        self.stats.packets_sent += 1;
        debug!(
            id = %pkt.id,
            kind = %pkt.kind,
            tick = self.clock,
            retransmit,
            "transmit"
        );
        self.in_flight.insert(
            pkt.id,
            InFlightEntry {
                sent_at: self.clock,
                priority,
                packet: pkt.clone(),
            },
        );
    }

    /// Infallible: a requeued packet keeps the priority it was sent at, which
    /// is what pricing it again would give since its tolerance never changes.
    fn requeue_expired(&mut self) {
        let now = self.clock;
        let mut expired = Vec::new();
        self.in_flight.retain(|_, entry| {
            if entry.is_expired(now) {
                expired.push((entry.packet.clone(), entry.priority));
                false
            } else {
                true
            }
        });

        for (pkt, priority) in expired {
            debug!(id = %pkt.id, tick = now, priority, "ack timeout, requeue");
            self.stats.timeouts += 1;
            self.timed_out.insert(pkt.id);
            self.queue.insert(pkt, priority);
        }
    }

    /// Current tick. Zero before the first call to [`tick`](Self::tick).
    pub fn clock(&self) -> Tick {
        self.clock
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn in_flight(&self, id: PacketId) -> Option<&InFlightEntry> {
        self.in_flight.get(&id)
    }

    /// In-flight ids in table order.
    pub fn in_flight_ids(&self) -> impl Iterator<Item = PacketId> + '_ {
        self.in_flight.keys().copied()
    }

    pub fn costs(&self) -> &CostTable {
        &self.costs
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;
    use crate::packet::PacketKind;

    fn text(id: u64, tol: u64) -> Packet {
        Packet::data(id, PacketKind::Text, tol)
    }

    fn ack(id: u64) -> Packet {
        Packet::ack(PacketId(id))
    }

    // ─── Basics ─────────────────────────────────────────────────────────

    #[test]
    fn idle_tick_advances_clock() {
        let mut s = Scheduler::new();
        let out = s.tick(vec![]).unwrap();
        assert_eq!(out, TickOutcome::default());
        assert_eq!(s.clock(), 1);
        assert_eq!(s.stats().ticks, 1);
    }

    #[test]
    fn single_packet_sent_and_tracked() {
        let mut s = Scheduler::new();
        let out = s.tick(vec![text(1, 5)]).unwrap();
        assert_eq!(out.sent, vec![text(1, 5)]);
        assert!(out.read.is_empty());
        assert!(out.acked.is_empty());

        let entry = s.in_flight(PacketId(1)).unwrap();
        assert_eq!(entry.sent_at, 1);
        assert_eq!(s.queue_len(), 0);
    }

    #[test]
    fn one_send_per_tick() {
        let mut s = Scheduler::new();
        let burst: Vec<_> = (0..5).map(|i| text(i, 10)).collect();
        let out = s.tick(burst).unwrap();
        assert_eq!(out.sent.len(), 1);
        assert_eq!(s.queue_len(), 4);

        for _ in 0..4 {
            assert_eq!(s.tick(vec![]).unwrap().sent.len(), 1);
        }
        assert_eq!(s.tick(vec![]).unwrap().sent.len(), 0);
        assert_eq!(s.in_flight_len(), 5);
    }

    #[test]
    fn cheapest_packet_goes_first() {
        let mut s = Scheduler::new();
        let video = Packet::data(1, PacketKind::Video, 2); // cost 6
        let picture = Packet::data(2, PacketKind::Picture, 1); // cost 3
        let audio = Packet::data(3, PacketKind::Audio, 1); // cost 4
        let out = s.tick(vec![video.clone(), picture.clone(), audio.clone()]).unwrap();
        assert_eq!(out.sent, vec![picture]);
        assert_eq!(s.tick(vec![]).unwrap().sent, vec![audio]);
        assert_eq!(s.tick(vec![]).unwrap().sent, vec![video]);
    }

    // ─── Acks ───────────────────────────────────────────────────────────

    #[test]
    fn ack_clears_in_flight() {
        let mut s = Scheduler::new();
        s.tick(vec![text(1, 5)]).unwrap();
        let out = s.tick(vec![ack(1)]).unwrap();
        assert_eq!(out.acked, vec![ack(1)]);
        assert!(out.sent.is_empty());
        assert_eq!(s.in_flight_len(), 0);
        assert_eq!(s.stats().acks_matched, 1);
    }

    #[test]
    fn unknown_ack_is_noop() {
        let mut s = Scheduler::new();
        let out = s.tick(vec![ack(42), ack(42)]).unwrap();
        assert_eq!(out.acked.len(), 2);
        assert_eq!(s.stats().acks_unmatched, 2);
        assert_eq!(s.queue_len(), 0);
    }

    #[test]
    fn same_tick_ack_does_not_match_new_send() {
        let mut s = Scheduler::new();
        // Ack is processed before the packet is transmitted.
        let out = s.tick(vec![ack(1), text(1, 5)]).unwrap();
        assert_eq!(out.sent, vec![text(1, 5)]);
        assert_eq!(out.acked, vec![ack(1)]);
        assert!(s.in_flight(PacketId(1)).is_some());
    }

    #[test]
    fn acks_are_never_queued() {
        let mut s = Scheduler::new();
        s.tick(vec![ack(1), ack(2), ack(3)]).unwrap();
        assert_eq!(s.queue_len(), 0);
        assert_eq!(s.stats().packets_enqueued, 0);
    }

    // ─── Timeouts ───────────────────────────────────────────────────────

    #[test]
    fn timeout_requeues_after_tolerance() {
        let mut s = Scheduler::new();
        let pkt = text(1, 5);
        assert_eq!(s.tick(vec![pkt.clone()]).unwrap().sent, vec![pkt.clone()]);

        // Ticks 2..=6: elapsed 1..=5, not past tolerance.
        for _ in 2..=6 {
            assert!(s.tick(vec![]).unwrap().sent.is_empty());
            assert!(s.in_flight(PacketId(1)).is_some());
        }

        // Tick 7: elapsed 6 > 5, requeued after the transmit step.
        let out = s.tick(vec![]).unwrap();
        assert!(out.sent.is_empty());
        assert!(s.in_flight(PacketId(1)).is_none());
        assert_eq!(s.queue_len(), 1);
        assert_eq!(s.stats().timeouts, 1);

        // Tick 8: retransmitted.
        let out = s.tick(vec![]).unwrap();
        assert_eq!(out.sent, vec![pkt]);
        assert_eq!(s.in_flight(PacketId(1)).unwrap().sent_at, 8);
        assert_eq!(s.stats().retransmissions, 1);
    }

    #[test]
    fn timed_out_packet_keeps_send_priority() {
        let mut s = Scheduler::new();
        let pkt = Packet::data(1, PacketKind::Audio, 0);
        let urgency = s.costs().urgency(&pkt).unwrap();
        s.tick(vec![pkt]).unwrap();
        assert_eq!(s.in_flight(PacketId(1)).unwrap().priority, urgency);

        s.tick(vec![]).unwrap();
        assert!(s.in_flight(PacketId(1)).is_none());
        assert_eq!(s.queue.peek_priority(), Some(urgency));
        assert_eq!(s.stats().timeouts, 1);
    }

    #[test]
    fn zero_tolerance_times_out_next_tick() {
        let mut s = Scheduler::new();
        s.tick(vec![text(1, 0)]).unwrap();
        // Elapsed 0 on the send tick: not expired yet.
        assert!(s.in_flight(PacketId(1)).is_some());
        let out = s.tick(vec![]).unwrap();
        assert!(out.sent.is_empty());
        assert_eq!(s.queue_len(), 1);
        assert_eq!(s.tick(vec![]).unwrap().sent, vec![text(1, 0)]);
    }

    #[test]
    fn late_ack_after_requeue_is_unmatched() {
        let mut s = Scheduler::new();
        s.tick(vec![text(1, 0)]).unwrap();
        s.tick(vec![]).unwrap(); // requeued
        let out = s.tick(vec![ack(1)]).unwrap();
        // The ack arrives before the resend, so it matches nothing.
        assert_eq!(out.sent, vec![text(1, 0)]);
        assert_eq!(s.stats().acks_unmatched, 1);
        assert!(s.in_flight(PacketId(1)).is_some());
    }

    #[test]
    fn retries_are_unbounded() {
        let mut s = Scheduler::new();
        s.tick(vec![text(1, 1)]).unwrap();
        let mut sends = 1;
        for _ in 0..30 {
            sends += s.tick(vec![]).unwrap().sent.len();
        }
        // Sent at t, expires at t+2, resent at t+3.
        assert_eq!(sends, 11);
        assert_eq!(s.stats().retransmissions, 10);
    }

    #[test]
    fn only_expired_entries_are_requeued() {
        let mut s = Scheduler::new();
        // Same kind and tolerance → same priority.
        s.tick(vec![text(1, 0), text(2, 0)]).unwrap();
        s.tick(vec![]).unwrap();
        let ids: Vec<_> = s.in_flight_ids().collect();
        assert_eq!(ids, vec![PacketId(2)]);
        assert_eq!(s.queue_len(), 1);
    }

    // ─── Errors ─────────────────────────────────────────────────────────

    #[test]
    fn kind_outside_cost_table_fails_without_mutation() {
        let config = SchedulerConfig {
            costs: CostTable {
                video: None,
                ..CostTable::default()
            },
            ..SchedulerConfig::default()
        };
        let mut s = Scheduler::with_config(config);
        s.tick(vec![text(1, 3)]).unwrap();

        let err = s
            .tick(vec![ack(1), Packet::data(2, PacketKind::Video, 1)])
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInput(_)));
        assert_eq!(s.clock(), 1);
        assert!(s.in_flight(PacketId(1)).is_some());
        assert_eq!(s.stats().acks_received, 0);
    }
}
