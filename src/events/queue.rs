//! Durable, time-ordered queue of deferred state transitions.
//!
//! Events are immutable once scheduled apart from their claim and the
//! `processed` flag. A worker claims due events in one step, runs their
//! handlers, and marks each processed; a claim left behind by a crashed
//! worker expires after the lease and the event becomes claimable again.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::data::UnitType;
use crate::model::{AttackId, EventId, Resources, Timestamp, UnitCount, VillageId};

/// Kind-specific arguments of an event. The tag doubles as the event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    ConstructionComplete {
        slot: u8,
    },
    FieldComplete {
        slot: u8,
    },
    TrainingComplete {
        unit: UnitType,
        quantity: u32,
    },
    AttackResolve {
        attack: AttackId,
    },
    /// One trip home from `from`. Targets the owning village and names
    /// exactly the units and loot of this trip.
    TroopsReturn {
        from: VillageId,
        arrives_at: Timestamp,
        units: Vec<UnitCount>,
        plunder: Resources,
    },
    TradeArrive {
        from: VillageId,
        resources: Resources,
        merchants: u32,
    },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::ConstructionComplete { .. } => "construction_complete",
            EventPayload::FieldComplete { .. } => "field_complete",
            EventPayload::TrainingComplete { .. } => "training_complete",
            EventPayload::AttackResolve { .. } => "attack_resolve",
            EventPayload::TroopsReturn { .. } => "troops_return",
            EventPayload::TradeArrive { .. } => "trade_arrive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub worker: u64,
    pub claimed_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// The village the event acts on.
    pub village: VillageId,
    #[serde(flatten)]
    pub payload: EventPayload,
    pub scheduled_for: Timestamp,
    pub processed: bool,
    pub claim: Option<Claim>,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    fn claimable(&self, now: Timestamp, lease: Duration) -> bool {
        !self.processed
            && self.scheduled_for <= now
            && self.claim.map_or(true, |c| c.claimed_at + lease <= now)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventQueue {
    next_id: EventId,
    events: BTreeMap<EventId, Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists a new event due at `when`.
    pub fn schedule(&mut self, village: VillageId, payload: EventPayload, when: Timestamp) -> EventId {
        self.next_id += 1;
        let id = self.next_id;
        tracing::debug!(id, village, kind = payload.kind(), %when, "scheduled event");
        self.events.insert(
            id,
            Event {
                id,
                village,
                payload,
                scheduled_for: when,
                processed: false,
                claim: None,
            },
        );
        id
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    /// Claims every due, unprocessed event not held under a live lease.
    ///
    /// Returned in `(scheduled_for, id)` order.
    pub fn claim_due(&mut self, now: Timestamp, worker: u64, lease: Duration) -> Vec<Event> {
        let mut due: Vec<&mut Event> = self
            .events
            .values_mut()
            .filter(|e| e.claimable(now, lease))
            .collect();
        due.sort_by_key(|e| (e.scheduled_for, e.id));
        due.into_iter()
            .map(|e| {
                e.claim = Some(Claim { worker, claimed_at: now });
                e.clone()
            })
            .collect()
    }

    pub fn is_claimed_by(&self, id: EventId, worker: u64) -> bool {
        self.events
            .get(&id)
            .is_some_and(|e| !e.processed && e.claim.is_some_and(|c| c.worker == worker))
    }

    /// Drops `worker`'s claim so the next poll retries the event.
    pub fn release(&mut self, id: EventId, worker: u64) -> bool {
        match self.events.get_mut(&id) {
            Some(e) if e.claim.is_some_and(|c| c.worker == worker) => {
                e.claim = None;
                true
            }
            _ => false,
        }
    }

    pub fn mark_processed(&mut self, id: EventId) -> bool {
        match self.events.get_mut(&id) {
            Some(e) if !e.processed => {
                e.processed = true;
                true
            }
            _ => false,
        }
    }

    /// Deletes a pending event. Fails once it is claimed or processed.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let cancellable = self
            .events
            .get(&id)
            .is_some_and(|e| !e.processed && e.claim.is_none());
        if cancellable {
            self.events.remove(&id);
        }
        cancellable
    }

    /// Unprocessed events targeting `village`, earliest first.
    pub fn pending_for(&self, village: VillageId) -> Vec<&Event> {
        let mut pending: Vec<&Event> = self
            .events
            .values()
            .filter(|e| !e.processed && e.village == village)
            .collect();
        pending.sort_by_key(|e| (e.scheduled_for, e.id));
        pending
    }

    pub fn pending(&self) -> impl Iterator<Item = &Event> {
        self.events.values().filter(|e| !e.processed)
    }

    /// Earliest due time among unprocessed events.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.pending().map(|e| e.scheduled_for).min()
    }

    /// Removes processed events, returning how many were dropped.
    pub fn purge_processed(&mut self) -> usize {
        let before = self.events.len();
        self.events.retain(|_, e| !e.processed);
        before - self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hours, t0};

    fn lease() -> Duration {
        Duration::minutes(5)
    }

    #[test]
    fn claims_due_events_in_time_order() {
        let mut q = EventQueue::new();
        let late = q.schedule(1, EventPayload::AttackResolve { attack: 1 }, t0() + hours(2));
        let early = q.schedule(1, EventPayload::FieldComplete { slot: 3 }, t0() + hours(1));
        let future = q.schedule(1, EventPayload::FieldComplete { slot: 4 }, t0() + hours(9));

        let claimed = q.claim_due(t0() + hours(3), 7, lease());
        let ids: Vec<_> = claimed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![early, late]);
        assert!(q.is_claimed_by(early, 7));
        assert!(!q.is_claimed_by(future, 7));
    }

    #[test]
    fn ties_break_on_id() {
        let mut q = EventQueue::new();
        let a = q.schedule(1, EventPayload::FieldComplete { slot: 1 }, t0());
        let b = q.schedule(2, EventPayload::FieldComplete { slot: 1 }, t0());
        let ids: Vec<_> = q.claim_due(t0(), 1, lease()).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn claimed_events_are_not_claimed_twice_until_the_lease_expires() {
        let mut q = EventQueue::new();
        let id = q.schedule(1, EventPayload::AttackResolve { attack: 1 }, t0());
        assert_eq!(q.claim_due(t0(), 1, lease()).len(), 1);
        assert!(q.claim_due(t0() + Duration::minutes(1), 2, lease()).is_empty());

        let reclaimed = q.claim_due(t0() + Duration::minutes(5), 2, lease());
        assert_eq!(reclaimed.len(), 1);
        assert!(q.is_claimed_by(id, 2));
        assert!(!q.is_claimed_by(id, 1));
    }

    #[test]
    fn released_events_are_retried() {
        let mut q = EventQueue::new();
        let id = q.schedule(1, EventPayload::AttackResolve { attack: 1 }, t0());
        q.claim_due(t0(), 1, lease());
        assert!(!q.release(id, 2));
        assert!(q.release(id, 1));
        assert_eq!(q.claim_due(t0(), 1, lease()).len(), 1);
    }

    #[test]
    fn processed_events_are_never_claimed() {
        let mut q = EventQueue::new();
        let id = q.schedule(1, EventPayload::AttackResolve { attack: 1 }, t0());
        q.claim_due(t0(), 1, lease());
        assert!(q.mark_processed(id));
        assert!(!q.mark_processed(id));
        assert!(q.claim_due(t0() + hours(1), 1, lease()).is_empty());
        assert_eq!(q.purge_processed(), 1);
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_only_before_claim() {
        let mut q = EventQueue::new();
        let a = q.schedule(1, EventPayload::FieldComplete { slot: 1 }, t0() + hours(1));
        let b = q.schedule(1, EventPayload::FieldComplete { slot: 2 }, t0());
        q.claim_due(t0(), 1, lease());
        assert!(q.cancel(a));
        assert!(q.get(a).is_none());
        assert!(!q.cancel(b));
    }

    #[test]
    fn payload_is_tagged_by_kind() {
        let mut q = EventQueue::new();
        let id = q.schedule(4, EventPayload::TrainingComplete { unit: UnitType::Phalanx, quantity: 3 }, t0());
        let json = serde_json::to_value(q.get(id).unwrap()).unwrap();
        assert_eq!(json["kind"], "training_complete");
        assert_eq!(json["unit"], "phalanx");
        assert_eq!(json["quantity"], 3);
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(&back, q.get(id).unwrap());
    }

    #[test]
    fn pending_for_lists_a_village_in_order() {
        let mut q = EventQueue::new();
        q.schedule(1, EventPayload::FieldComplete { slot: 1 }, t0() + hours(2));
        q.schedule(2, EventPayload::FieldComplete { slot: 1 }, t0());
        q.schedule(1, EventPayload::FieldComplete { slot: 2 }, t0() + hours(1));
        let pending = q.pending_for(1);
        assert_eq!(pending.len(), 2);
        assert!(pending[0].scheduled_for < pending[1].scheduled_for);
        assert_eq!(q.next_due(), Some(t0()));
    }
}
