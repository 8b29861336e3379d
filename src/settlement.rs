//! Players, villages, bonus tiles, and purchased perks.

use crate::data::Tribe;
use crate::error::{GameError, GameResult};
use crate::ledger;
use crate::model::{
    Coordinates, Oasis, OasisBonus, OasisId, Player, PlayerId, ProductionBoost, ResourceKind,
    Timestamp, Village, VillageId, World,
};

pub fn register_player(world: &mut World, name: &str, tribe: Tribe) -> GameResult<Player> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::invalid("player name is empty"));
    }
    let id = world.allocate_id();
    let player = Player::new(id, name.to_string(), tribe);
    world.players.insert(id, player.clone());
    tracing::info!(player = id, name, ?tribe, "player registered");
    Ok(player)
}

/// Founds a village for `owner` on a free map position.
pub fn found_village(
    world: &mut World,
    owner: PlayerId,
    name: &str,
    coordinates: Coordinates,
    now: Timestamp,
) -> GameResult<VillageId> {
    let tribe = world.player(owner)?.tribe;
    let taken = world.village_at(coordinates).is_some()
        || world.oases.values().any(|o| o.coordinates == coordinates);
    if taken {
        return Err(GameError::invalid(format!(
            "({}, {}) is already occupied",
            coordinates.x, coordinates.y
        )));
    }
    let id = world.allocate_id();
    let village = Village::found(id, owner, name.to_string(), coordinates, tribe, now, || {
        world.allocate_id()
    });
    world.villages.insert(id, village);
    tracing::info!(village = id, owner, x = coordinates.x, y = coordinates.y, "village founded");
    Ok(id)
}

/// Places an unowned bonus tile on the map.
pub fn create_oasis(world: &mut World, coordinates: Coordinates, bonuses: Vec<OasisBonus>) -> GameResult<OasisId> {
    let taken = world.village_at(coordinates).is_some()
        || world.oases.values().any(|o| o.coordinates == coordinates);
    if taken {
        return Err(GameError::invalid("position is occupied"));
    }
    let id = world.allocate_id();
    world.oases.insert(
        id,
        Oasis {
            id,
            coordinates,
            owner: None,
            bonuses,
        },
    );
    Ok(id)
}

/// Gives a free oasis to `village`. Production is settled first so the
/// bonus only applies from `now`.
pub fn claim_oasis(world: &mut World, village: VillageId, oasis: OasisId, now: Timestamp) -> GameResult<()> {
    world.village(village)?;
    match world.oases.get(&oasis).map(|o| o.owner) {
        None => return Err(GameError::not_found("oasis", oasis)),
        Some(Some(owner)) if owner == village => return Err(GameError::invalid("oasis already owned")),
        Some(Some(_)) => return Err(GameError::invalid("oasis belongs to another village")),
        Some(None) => {}
    }
    ledger::commit(world, village, now)?;
    world.oasis_mut(oasis)?.owner = Some(village);
    tracing::info!(village, oasis, "oasis claimed");
    Ok(())
}

/// Adds a production boost for every village of `player` until `until`.
pub fn grant_boost(
    world: &mut World,
    player: PlayerId,
    resource: ResourceKind,
    percent: u32,
    until: Timestamp,
    now: Timestamp,
) -> GameResult<()> {
    if until <= now || percent == 0 {
        return Err(GameError::invalid("boost must be positive and end in the future"));
    }
    world.player(player)?;
    settle_player(world, player, now)?;
    world.player_mut(player)?.boosts.push(ProductionBoost {
        resource,
        percent,
        expires_at: until,
    });
    tracing::info!(player, ?resource, percent, %until, "boost granted");
    Ok(())
}

pub fn grant_queue_entitlement(world: &mut World, player: PlayerId, until: Timestamp) -> GameResult<()> {
    let p = world.player_mut(player)?;
    p.queue_entitlement_until = Some(p.queue_entitlement_until.map_or(until, |u| u.max(until)));
    tracing::info!(player, %until, "queue entitlement granted");
    Ok(())
}

fn settle_player(world: &mut World, player: PlayerId, now: Timestamp) -> GameResult<()> {
    let villages: Vec<VillageId> = world
        .villages
        .values()
        .filter(|v| v.owner == player)
        .map(|v| v.id)
        .collect();
    for id in villages {
        ledger::commit(world, id, now)?;
    }
    Ok(())
}
