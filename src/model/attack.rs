//! Troop movements between villages and the reports they leave behind.

use serde::{Deserialize, Serialize};

use super::resources::Resources;
use super::troop::{TroopStatus, UnitCount};
use super::{AttackId, ReportId, Timestamp, VillageId};

/// What a movement intends to do on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Attack,
    Raid,
    Scout,
    Reinforcement,
    Conquest,
}

impl AttackKind {
    pub fn from_name(s: &str) -> Option<AttackKind> {
        match s {
            "attack" => Some(AttackKind::Attack),
            "raid" => Some(AttackKind::Raid),
            "scout" => Some(AttackKind::Scout),
            "reinforcement" | "reinforce" => Some(AttackKind::Reinforcement),
            "conquest" => Some(AttackKind::Conquest),
            _ => None,
        }
    }

    /// Status of the troops while they are on the way.
    pub const fn travelling_status(self) -> TroopStatus {
        match self {
            AttackKind::Reinforcement => TroopStatus::Reinforcing,
            _ => TroopStatus::Attacking,
        }
    }

    /// Whether a victorious movement of this kind carries resources home.
    pub const fn plunders(self) -> bool {
        matches!(self, AttackKind::Attack | AttackKind::Raid | AttackKind::Conquest)
    }

    /// Whether arriving troops can fall into the defender's traps.
    pub const fn can_be_trapped(self) -> bool {
        matches!(self, AttackKind::Attack | AttackKind::Raid | AttackKind::Conquest)
    }
}

/// A movement from one village to another, resolved exactly once on arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub id: AttackId,
    pub attacker: VillageId,
    pub defender: VillageId,
    pub kind: AttackKind,
    pub manifest: Vec<UnitCount>,
    pub resolved: bool,
    pub sent_at: Timestamp,
    pub arrives_at: Timestamp,
}

impl Attack {
    /// Adds more troops to the manifest, merging counts per unit type.
    pub fn merge_manifest(&mut self, extra: &[UnitCount]) {
        for add in extra {
            match self.manifest.iter_mut().find(|m| m.unit == add.unit) {
                Some(entry) => entry.quantity += add.quantity,
                None => self.manifest.push(*add),
            }
        }
    }
}

/// What a successful scout learns about the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutIntel {
    pub resources: Resources,
    pub troops: Vec<UnitCount>,
}

/// Loyalty change caused by chiefs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyChange {
    pub before: u8,
    pub after: u8,
    pub conquered: bool,
}

/// Outcome of a resolved movement, kept for both parties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    pub id: ReportId,
    pub attack: AttackId,
    pub kind: AttackKind,
    pub attacker: VillageId,
    pub defender: VillageId,
    pub occurred_at: Timestamp,
    pub attacker_wins: bool,
    pub attackers: Vec<UnitCount>,
    pub attacker_losses: Vec<UnitCount>,
    pub defenders: Vec<UnitCount>,
    pub defender_losses: Vec<UnitCount>,
    pub trapped: Vec<UnitCount>,
    pub plunder: Resources,
    pub loyalty: Option<LoyaltyChange>,
    pub intel: Option<ScoutIntel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnitType;
    use chrono::{TimeZone, Utc};

    #[test]
    fn merge_manifest_sums_counts() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut attack = Attack {
            id: 1,
            attacker: 1,
            defender: 2,
            kind: AttackKind::Raid,
            manifest: vec![UnitCount::new(UnitType::Clubswinger, 10)],
            resolved: false,
            sent_at: at,
            arrives_at: at,
        };
        attack.merge_manifest(&[
            UnitCount::new(UnitType::Clubswinger, 5),
            UnitCount::new(UnitType::Paladin, 2),
        ]);
        assert_eq!(
            attack.manifest,
            vec![
                UnitCount::new(UnitType::Clubswinger, 15),
                UnitCount::new(UnitType::Paladin, 2)
            ]
        );
    }

    #[test]
    fn only_hostile_kinds_plunder() {
        assert!(AttackKind::Raid.plunders());
        assert!(!AttackKind::Scout.plunders());
        assert!(!AttackKind::Reinforcement.plunders());
        assert_eq!(AttackKind::Reinforcement.travelling_status(), TroopStatus::Reinforcing);
    }
}
