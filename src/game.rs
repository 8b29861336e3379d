//! Client-facing façade.
//!
//! Holds the store, clock and notification sink, and runs each client
//! action as a single store transaction. Notifications for an action are
//! sent only after its transaction commits.

use std::sync::Arc;

use serde_json::json;

use crate::clock::Clock;
use crate::config::GameConfig;
use crate::construction::{self, UpgradeOrder};
use crate::data::{Structure, Tribe, UnitType};
use crate::error::GameResult;
use crate::events::{Dispatcher, Event};
use crate::ledger::{self, ResourceSnapshot};
use crate::military::{self, Homecoming, Movement, TrainingOrder};
use crate::model::{
    AttackKind, BattleReport, Coordinates, OasisBonus, OasisId, Player, PlayerId, ResourceKind,
    Resources, SlotRef, Timestamp, UnitCount, Village, VillageId,
};
use crate::notify::Notifier;
use crate::settlement;
use crate::store::Store;
use crate::trade::{self, Shipment};

pub struct Game<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    config: GameConfig,
}

impl<S: Store> Game<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>, config: GameConfig) -> Self {
        Game {
            store,
            clock,
            notifier,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// A dispatcher sharing this game's store, clock and notifier.
    pub fn dispatcher(&self, worker: u64) -> Dispatcher<S> {
        Dispatcher::new(self.store.clone(), self.clock.clone(), self.notifier.clone(), worker)
            .with_lease(self.config.claim_lease())
            .with_speed(self.config.speed)
            .with_interval(self.config.poll_interval())
    }

    pub fn register_player(&self, name: &str, tribe: Tribe) -> GameResult<Player> {
        self.store
            .transaction(|world| settlement::register_player(world, name, tribe))
    }

    pub fn found_village(&self, owner: PlayerId, name: &str, coordinates: Coordinates) -> GameResult<VillageId> {
        let now = self.now();
        self.store
            .transaction(|world| settlement::found_village(world, owner, name, coordinates, now))
    }

    pub fn village(&self, id: VillageId) -> GameResult<Village> {
        self.store.read(|world| world.village(id).cloned())?
    }

    pub fn resources(&self, id: VillageId) -> GameResult<ResourceSnapshot> {
        let now = self.now();
        self.store.read(|world| ledger::compute_current(world, id, now))?
    }

    /// Snapshots of every village, computed in parallel.
    pub fn all_resources(&self) -> GameResult<Vec<ResourceSnapshot>> {
        let now = self.now();
        self.store.read(|world| ledger::compute_all(world, now))?
    }

    pub fn start_upgrade(&self, village: VillageId, slot: SlotRef) -> GameResult<UpgradeOrder> {
        let now = self.now();
        self.store.transaction(|world| {
            construction::start_upgrade(world, village, slot, now, self.config.speed)
        })
    }

    pub fn start_construction(&self, village: VillageId, slot: u8, structure: Structure) -> GameResult<UpgradeOrder> {
        let now = self.now();
        self.store.transaction(|world| {
            construction::start_construction(world, village, slot, structure, now, self.config.speed)
        })
    }

    pub fn cancel_upgrade(&self, village: VillageId, slot: SlotRef) -> GameResult<Resources> {
        let now = self.now();
        self.store.transaction(|world| {
            construction::cancel_upgrade(world, village, slot, now, self.config.speed)
        })
    }

    pub fn train(&self, village: VillageId, unit: UnitType, quantity: u32) -> GameResult<TrainingOrder> {
        let now = self.now();
        self.store
            .transaction(|world| military::train(world, village, unit, quantity, now, self.config.speed))
    }

    pub fn send_troops(
        &self,
        from: VillageId,
        to: VillageId,
        kind: AttackKind,
        manifest: &[UnitCount],
    ) -> GameResult<Movement> {
        let now = self.now();
        let movement = self.store.transaction(|world| {
            military::send_troops(world, from, to, kind, manifest, now, self.config.speed)
        })?;
        self.notifier.notify_village(
            to,
            "incoming_troops",
            &json!({ "attack": movement.attack, "from": from, "kind": kind, "arrives_at": movement.arrives_at }),
        );
        Ok(movement)
    }

    pub fn send_resources(&self, from: VillageId, to: VillageId, resources: Resources) -> GameResult<Shipment> {
        let now = self.now();
        let shipment = self.store.transaction(|world| {
            trade::send_resources(world, from, to, resources, now, self.config.speed)
        })?;
        self.notifier.notify_village(
            to,
            "incoming_merchants",
            &json!({ "from": from, "resources": resources, "arrives_at": shipment.arrives_at }),
        );
        Ok(shipment)
    }

    pub fn recall_reinforcements(&self, host: VillageId, owner: VillageId) -> GameResult<Homecoming> {
        let now = self.now();
        self.store.transaction(|world| {
            military::recall_reinforcements(world, host, owner, now, self.config.speed)
        })
    }

    pub fn release_trapped(&self, host: VillageId) -> GameResult<Vec<Homecoming>> {
        let now = self.now();
        let released = self
            .store
            .transaction(|world| military::release_trapped(world, host, now, self.config.speed))?;
        for homecoming in &released {
            self.notifier.notify_village(
                homecoming.owner,
                "troops_released",
                &json!({ "from": host, "units": homecoming.units, "arrives_at": homecoming.arrives_at }),
            );
        }
        Ok(released)
    }

    pub fn destroy_trapped(&self, host: VillageId) -> GameResult<Vec<UnitCount>> {
        self.store
            .transaction(|world| military::destroy_trapped(world, host))
    }

    pub fn create_oasis(&self, coordinates: Coordinates, bonuses: Vec<OasisBonus>) -> GameResult<OasisId> {
        self.store
            .transaction(|world| settlement::create_oasis(world, coordinates, bonuses))
    }

    pub fn claim_oasis(&self, village: VillageId, oasis: OasisId) -> GameResult<()> {
        let now = self.now();
        self.store
            .transaction(|world| settlement::claim_oasis(world, village, oasis, now))
    }

    pub fn grant_boost(&self, player: PlayerId, resource: ResourceKind, percent: u32, until: Timestamp) -> GameResult<()> {
        let now = self.now();
        self.store
            .transaction(|world| settlement::grant_boost(world, player, resource, percent, until, now))
    }

    pub fn grant_queue_entitlement(&self, player: PlayerId, until: Timestamp) -> GameResult<()> {
        self.store
            .transaction(|world| settlement::grant_queue_entitlement(world, player, until))
    }

    pub fn reports(&self, village: VillageId) -> GameResult<Vec<BattleReport>> {
        self.store.read(|world| {
            world.village(village)?;
            Ok(world.reports_for(village).into_iter().cloned().collect())
        })?
    }

    pub fn pending_events(&self, village: VillageId) -> GameResult<Vec<Event>> {
        self.store.read(|world| {
            world.village(village)?;
            Ok(world.events.pending_for(village).into_iter().cloned().collect())
        })?
    }
}
