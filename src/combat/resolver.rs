//! Battle resolution.
//!
//! A pure function of two rosters, the movement kind, the defender's wall
//! multiplier, and the attacker's morale. Offence is split into infantry
//! and cavalry shares, and defenders answer each share with the matching
//! defence value. The stronger side wins (ties go to the defender); the
//! loser is wiped out and the winner loses `(weaker / stronger)^1.5` of
//! every group, with raid and rout adjustments on top.

use serde::Serialize;

use crate::data::UnitType;
use crate::model::{AttackKind, VillageId};

/// Exponent applied to the strength ratio to get the winner's loss ratio.
pub const LOSS_EXPONENT: f64 = 1.5;
/// Raiders retreat early and lose this fraction of what an attack would.
pub const RAID_LOSS_FACTOR: f64 = 0.8;
/// Offence/defence ratio at or above which the defender is routed.
pub const ROUT_RATIO: f64 = 20.0;
/// Offence/defence ratio at or below which the attacker is routed.
pub const ROUTED_ATTACKER_RATIO: f64 = 0.05;
/// Loss ratio of the winner in a rout.
pub const ROUT_WINNER_LOSS: f64 = 0.01;
/// Lower bound on either strength when checking for a rout.
const STRENGTH_FLOOR: f64 = 0.1;

/// One group taking part in a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Squad {
    /// The village the troops belong to.
    pub owner: VillageId,
    pub unit: UnitType,
    pub quantity: u32,
}

impl Squad {
    pub const fn new(owner: VillageId, unit: UnitType, quantity: u32) -> Self {
        Squad { owner, unit, quantity }
    }
}

/// Everything the caller needs to apply a battle to the world.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleOutcome {
    pub attacker_wins: bool,
    pub offense: f64,
    pub defense: f64,
    pub attacker_loss_ratio: f64,
    pub defender_loss_ratio: f64,
    /// Groups that lost at least one unit.
    pub attacker_losses: Vec<Squad>,
    pub defender_losses: Vec<Squad>,
    /// Groups with at least one survivor.
    pub surviving_attackers: Vec<Squad>,
    pub surviving_defenders: Vec<Squad>,
}

fn attack_value(unit: UnitType, kind: AttackKind) -> f64 {
    let info = unit.info();
    let value = if kind == AttackKind::Scout { info.scouting } else { info.attack };
    f64::from(value)
}

fn defense_values(unit: UnitType, kind: AttackKind) -> (f64, f64) {
    let info = unit.info();
    if kind == AttackKind::Scout {
        let v = f64::from(info.scouting);
        (v, v)
    } else {
        (f64::from(info.defense_infantry), f64::from(info.defense_cavalry))
    }
}

/// Resolves a battle between `attackers` and `defenders`.
pub fn resolve(
    attackers: &[Squad],
    defenders: &[Squad],
    kind: AttackKind,
    wall_multiplier: f64,
    morale: f64,
) -> BattleOutcome {
    let mut offense = 0.0;
    let mut infantry_offense = 0.0;
    let mut cavalry_offense = 0.0;
    for squad in attackers {
        let power = attack_value(squad.unit, kind) * f64::from(squad.quantity) * morale;
        offense += power;
        if squad.unit.is_cavalry() {
            cavalry_offense += power;
        } else {
            infantry_offense += power;
        }
    }

    if defenders.iter().all(|s| s.quantity == 0) {
        return BattleOutcome {
            attacker_wins: true,
            offense,
            defense: 0.0,
            attacker_loss_ratio: 0.0,
            defender_loss_ratio: 0.0,
            attacker_losses: Vec::new(),
            defender_losses: Vec::new(),
            surviving_attackers: survivors(attackers, 0.0),
            surviving_defenders: Vec::new(),
        };
    }

    let (infantry_ratio, cavalry_ratio) = if offense > 0.0 {
        (infantry_offense / offense, cavalry_offense / offense)
    } else {
        (0.5, 0.5)
    };

    let mut defense = 0.0;
    for squad in defenders {
        let (vs_infantry, vs_cavalry) = defense_values(squad.unit, kind);
        defense += (vs_infantry * infantry_ratio + vs_cavalry * cavalry_ratio)
            * f64::from(squad.quantity)
            * wall_multiplier;
    }

    let attacker_wins = offense > defense;
    let (mut attacker_loss_ratio, mut defender_loss_ratio) = if attacker_wins {
        (winner_loss_ratio(defense, offense), 1.0)
    } else {
        (1.0, winner_loss_ratio(offense, defense))
    };

    if kind == AttackKind::Raid {
        attacker_loss_ratio *= RAID_LOSS_FACTOR;
    }

    let strength_ratio = offense.max(STRENGTH_FLOOR) / defense.max(STRENGTH_FLOOR);
    if strength_ratio >= ROUT_RATIO {
        attacker_loss_ratio = ROUT_WINNER_LOSS;
        defender_loss_ratio = 1.0;
    } else if strength_ratio <= ROUTED_ATTACKER_RATIO {
        attacker_loss_ratio = 1.0;
        defender_loss_ratio = ROUT_WINNER_LOSS;
    }

    BattleOutcome {
        attacker_wins,
        offense,
        defense,
        attacker_loss_ratio,
        defender_loss_ratio,
        attacker_losses: losses(attackers, attacker_loss_ratio),
        defender_losses: losses(defenders, defender_loss_ratio),
        surviving_attackers: survivors(attackers, attacker_loss_ratio),
        surviving_defenders: survivors(defenders, defender_loss_ratio),
    }
}

fn winner_loss_ratio(weaker: f64, stronger: f64) -> f64 {
    if stronger <= 0.0 {
        return 0.0;
    }
    (weaker / stronger).powf(LOSS_EXPONENT)
}

fn lost(quantity: u32, ratio: f64) -> u32 {
    let raw = (f64::from(quantity) * ratio).floor();
    (raw as u32).min(quantity)
}

fn losses(squads: &[Squad], ratio: f64) -> Vec<Squad> {
    squads
        .iter()
        .map(|s| Squad { quantity: lost(s.quantity, ratio), ..*s })
        .filter(|s| s.quantity > 0)
        .collect()
}

fn survivors(squads: &[Squad], ratio: f64) -> Vec<Squad> {
    squads
        .iter()
        .map(|s| Squad { quantity: s.quantity - lost(s.quantity, ratio), ..*s })
        .filter(|s| s.quantity > 0)
        .collect()
}
