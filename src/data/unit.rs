//! Unit types and their combat, logistics, and training statistics.

use serde::{Deserialize, Serialize};

use super::structure::Structure;
use super::tribe::Tribe;
use crate::model::Resources;

/// Combat classification used to split offence and to apply upkeep discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    Infantry,
    Cavalry,
}

/// A trainable unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum UnitType {
    Legionnaire = 0,
    Praetorian = 1,
    Imperian = 2,
    EquitesLegati = 3,
    EquitesImperatoris = 4,
    EquitesCaesaris = 5,
    Senator = 6,
    Clubswinger = 7,
    Spearman = 8,
    Axeman = 9,
    Scout = 10,
    Paladin = 11,
    TeutonicKnight = 12,
    Chief = 13,
    Phalanx = 14,
    Swordsman = 15,
    Pathfinder = 16,
    TheutatesThunder = 17,
    Druidrider = 18,
    Haeduan = 19,
    Chieftain = 20,
}

pub const UNIT_COUNT: usize = 21;

pub const ALL_UNITS: [UnitType; UNIT_COUNT] = [
    UnitType::Legionnaire,
    UnitType::Praetorian,
    UnitType::Imperian,
    UnitType::EquitesLegati,
    UnitType::EquitesImperatoris,
    UnitType::EquitesCaesaris,
    UnitType::Senator,
    UnitType::Clubswinger,
    UnitType::Spearman,
    UnitType::Axeman,
    UnitType::Scout,
    UnitType::Paladin,
    UnitType::TeutonicKnight,
    UnitType::Chief,
    UnitType::Phalanx,
    UnitType::Swordsman,
    UnitType::Pathfinder,
    UnitType::TheutatesThunder,
    UnitType::Druidrider,
    UnitType::Haeduan,
    UnitType::Chieftain,
];

/// Static statistics for a unit type.
#[derive(Debug, Clone, Copy)]
pub struct UnitInfo {
    pub name: &'static str,
    pub tribe: Tribe,
    pub class: UnitClass,
    pub attack: u32,
    pub defense_infantry: u32,
    pub defense_cavalry: u32,
    /// Attack and defence used on scouting missions; zero for non-scouts.
    pub scouting: u32,
    /// Fields per hour.
    pub speed: f64,
    pub carry: u64,
    pub upkeep: u32,
    pub training_secs: f64,
    pub cost: Resources,
    /// Chiefs lower the loyalty of conquered villages.
    pub chief: bool,
    pub trained_in: Structure,
}

#[allow(clippy::too_many_arguments)]
const fn unit(
    name: &'static str,
    tribe: Tribe,
    class: UnitClass,
    (attack, defense_infantry, defense_cavalry): (u32, u32, u32),
    scouting: u32,
    speed: f64,
    carry: u64,
    upkeep: u32,
    training_secs: f64,
    cost: Resources,
) -> UnitInfo {
    let trained_in = match class {
        UnitClass::Infantry => Structure::Barracks,
        UnitClass::Cavalry => Structure::Stable,
    };
    UnitInfo {
        name,
        tribe,
        class,
        attack,
        defense_infantry,
        defense_cavalry,
        scouting,
        speed,
        carry,
        upkeep,
        training_secs,
        cost,
        chief: false,
        trained_in,
    }
}

const fn chief(info: UnitInfo) -> UnitInfo {
    UnitInfo {
        chief: true,
        trained_in: Structure::Residence,
        ..info
    }
}

use Tribe::{Gaul, Roman, Teuton};
use UnitClass::{Cavalry, Infantry};

/// Unit table indexed by `UnitType as usize`.
pub const UNIT_INFO: [UnitInfo; UNIT_COUNT] = [
    unit("legionnaire", Roman, Infantry, (40, 35, 50), 0, 6.0, 50, 1, 1600.0, Resources::new(120, 100, 150, 30)),
    unit("praetorian", Roman, Infantry, (30, 65, 35), 0, 5.0, 20, 1, 1760.0, Resources::new(100, 130, 160, 70)),
    unit("imperian", Roman, Infantry, (70, 40, 25), 0, 7.0, 50, 1, 1920.0, Resources::new(150, 160, 210, 80)),
    unit("equites_legati", Roman, Cavalry, (0, 20, 10), 20, 16.0, 0, 2, 1360.0, Resources::new(140, 160, 20, 40)),
    unit("equites_imperatoris", Roman, Cavalry, (120, 65, 50), 0, 14.0, 100, 3, 2640.0, Resources::new(550, 440, 320, 100)),
    unit("equites_caesaris", Roman, Cavalry, (180, 80, 105), 0, 10.0, 70, 4, 3520.0, Resources::new(550, 640, 800, 180)),
    chief(unit("senator", Roman, Infantry, (50, 40, 30), 0, 4.0, 0, 5, 90700.0, Resources::new(30750, 27200, 45000, 37500))),
    unit("clubswinger", Teuton, Infantry, (40, 20, 5), 0, 7.0, 60, 1, 720.0, Resources::new(95, 75, 40, 40)),
    unit("spearman", Teuton, Infantry, (10, 35, 60), 0, 7.0, 40, 1, 1120.0, Resources::new(145, 70, 85, 40)),
    unit("axeman", Teuton, Infantry, (60, 30, 30), 0, 6.0, 50, 1, 1200.0, Resources::new(130, 120, 170, 70)),
    unit("scout", Teuton, Infantry, (0, 10, 5), 20, 9.0, 0, 1, 1120.0, Resources::new(160, 100, 50, 50)),
    unit("paladin", Teuton, Cavalry, (55, 100, 40), 0, 10.0, 110, 2, 2400.0, Resources::new(370, 270, 290, 75)),
    unit("teutonic_knight", Teuton, Cavalry, (150, 50, 75), 0, 9.0, 80, 3, 2960.0, Resources::new(450, 515, 480, 80)),
    chief(unit("chief", Teuton, Infantry, (40, 60, 40), 0, 4.0, 0, 4, 70500.0, Resources::new(35500, 26600, 25000, 27200))),
    unit("phalanx", Gaul, Infantry, (15, 40, 50), 0, 7.0, 35, 1, 1040.0, Resources::new(100, 130, 55, 30)),
    unit("swordsman", Gaul, Infantry, (65, 35, 20), 0, 6.0, 45, 1, 1440.0, Resources::new(140, 150, 185, 60)),
    unit("pathfinder", Gaul, Cavalry, (0, 20, 10), 20, 17.0, 0, 2, 1360.0, Resources::new(170, 150, 20, 40)),
    unit("theutates_thunder", Gaul, Cavalry, (100, 25, 40), 0, 19.0, 75, 2, 2480.0, Resources::new(350, 450, 230, 60)),
    unit("druidrider", Gaul, Cavalry, (45, 115, 55), 0, 16.0, 35, 2, 2560.0, Resources::new(360, 330, 280, 120)),
    unit("haeduan", Gaul, Cavalry, (140, 60, 165), 0, 13.0, 65, 3, 3120.0, Resources::new(500, 620, 675, 170)),
    chief(unit("chieftain", Gaul, Infantry, (40, 50, 50), 0, 5.0, 0, 4, 90700.0, Resources::new(30750, 45400, 31000, 37500))),
];

/// Residence level required before chiefs can be trained.
pub const CHIEF_RESIDENCE_LEVEL: u8 = 10;

impl UnitType {
    pub const fn info(self) -> &'static UnitInfo {
        &UNIT_INFO[self as usize]
    }

    pub const fn is_cavalry(self) -> bool {
        matches!(self.info().class, UnitClass::Cavalry)
    }

    pub const fn is_scout(self) -> bool {
        self.info().scouting > 0
    }

    /// Parses a unit type from its snake_case name.
    pub fn from_name(s: &str) -> Option<UnitType> {
        ALL_UNITS.iter().copied().find(|u| u.info().name == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_in_discriminant_order() {
        for (i, unit) in ALL_UNITS.iter().enumerate() {
            assert_eq!(*unit as usize, i);
            assert_eq!(UnitType::from_name(unit.info().name), Some(*unit));
        }
    }

    #[test]
    fn every_tribe_has_one_chief_and_one_scout() {
        for tribe in crate::data::ALL_TRIBES {
            let units: Vec<_> = ALL_UNITS.iter().filter(|u| u.info().tribe == tribe).collect();
            assert_eq!(units.len(), 7);
            assert_eq!(units.iter().filter(|u| u.info().chief).count(), 1);
            assert_eq!(units.iter().filter(|u| u.is_scout()).count(), 1);
        }
    }

    #[test]
    fn training_building_follows_class() {
        assert_eq!(UnitType::Legionnaire.info().trained_in, Structure::Barracks);
        assert_eq!(UnitType::Haeduan.info().trained_in, Structure::Stable);
        assert_eq!(UnitType::Senator.info().trained_in, Structure::Residence);
        assert!(UnitType::Paladin.is_cavalry());
        assert!(!UnitType::Scout.is_cavalry());
    }
}
