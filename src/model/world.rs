//! The persisted world: every entity table the core reads and mutates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attack::{Attack, BattleReport};
use super::troop::Garrison;
use super::village::{Coordinates, Oasis, Player, Village};
use super::{AttackId, OasisId, PlayerId, VillageId};
use crate::error::{GameError, GameResult};
use crate::events::EventQueue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    next_id: u64,
    pub players: BTreeMap<PlayerId, Player>,
    pub villages: BTreeMap<VillageId, Village>,
    pub oases: BTreeMap<OasisId, Oasis>,
    pub troops: Garrison,
    pub attacks: BTreeMap<AttackId, Attack>,
    pub reports: Vec<BattleReport>,
    pub events: EventQueue,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh id for players, villages, slots, oases, attacks and reports.
    pub fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn player(&self, id: PlayerId) -> GameResult<&Player> {
        self.players
            .get(&id)
            .ok_or(GameError::not_found("player", id))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> GameResult<&mut Player> {
        self.players
            .get_mut(&id)
            .ok_or(GameError::not_found("player", id))
    }

    pub fn village(&self, id: VillageId) -> GameResult<&Village> {
        self.villages
            .get(&id)
            .ok_or(GameError::not_found("village", id))
    }

    pub fn village_mut(&mut self, id: VillageId) -> GameResult<&mut Village> {
        self.villages
            .get_mut(&id)
            .ok_or(GameError::not_found("village", id))
    }

    pub fn attack(&self, id: AttackId) -> GameResult<&Attack> {
        self.attacks
            .get(&id)
            .ok_or(GameError::not_found("attack", id))
    }

    pub fn attack_mut(&mut self, id: AttackId) -> GameResult<&mut Attack> {
        self.attacks
            .get_mut(&id)
            .ok_or(GameError::not_found("attack", id))
    }

    pub fn oasis_mut(&mut self, id: OasisId) -> GameResult<&mut Oasis> {
        self.oases
            .get_mut(&id)
            .ok_or(GameError::not_found("oasis", id))
    }

    pub fn village_at(&self, coordinates: Coordinates) -> Option<VillageId> {
        self.villages
            .values()
            .find(|v| v.coordinates == coordinates)
            .map(|v| v.id)
    }

    /// Oases owned by `village`, in id order.
    pub fn oases_of(&self, village: VillageId) -> impl Iterator<Item = &Oasis> {
        self.oases
            .values()
            .filter(move |o| o.owner == Some(village))
    }

    /// Reports in which `village` took part, oldest first.
    pub fn reports_for(&self, village: VillageId) -> Vec<&BattleReport> {
        self.reports
            .iter()
            .filter(|r| r.attacker == village || r.defender == village)
            .collect()
    }
}
