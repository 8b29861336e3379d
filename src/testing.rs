//! Fixtures shared by the unit tests.

use chrono::{TimeZone, Utc};

use crate::data::Tribe;
use crate::model::{Coordinates, Player, Timestamp, Village, VillageId, World};

pub(crate) fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub(crate) fn hours(n: i64) -> chrono::Duration {
    chrono::Duration::hours(n)
}

/// Adds a player with one freshly founded village at `coordinates`.
pub(crate) fn add_village(world: &mut World, tribe: Tribe, coordinates: Coordinates) -> VillageId {
    let player_id = world.allocate_id();
    world
        .players
        .insert(player_id, Player::new(player_id, format!("p{player_id}"), tribe));
    let village_id = world.allocate_id();
    let village = Village::found(
        village_id,
        player_id,
        format!("v{village_id}"),
        coordinates,
        tribe,
        t0(),
        || world.allocate_id(),
    );
    world.villages.insert(village_id, village);
    village_id
}

pub(crate) fn world_with_village(tribe: Tribe) -> (World, VillageId) {
    let mut world = World::new();
    let id = add_village(&mut world, tribe, Coordinates::new(0, 0));
    (world, id)
}
