//! The four resources and quantity arithmetic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four village resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Wood,
    Clay,
    Iron,
    Crop,
}

pub const ALL_RESOURCES: [ResourceKind; 4] = [
    ResourceKind::Wood,
    ResourceKind::Clay,
    ResourceKind::Iron,
    ResourceKind::Crop,
];

impl ResourceKind {
    pub fn from_name(s: &str) -> Option<ResourceKind> {
        match s {
            "wood" => Some(ResourceKind::Wood),
            "clay" => Some(ResourceKind::Clay),
            "iron" => Some(ResourceKind::Iron),
            "crop" => Some(ResourceKind::Crop),
            _ => None,
        }
    }
}

/// Whole quantities of all four resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources {
    pub wood: u64,
    pub clay: u64,
    pub iron: u64,
    pub crop: u64,
}

impl Resources {
    pub const ZERO: Resources = Resources::new(0, 0, 0, 0);

    pub const fn new(wood: u64, clay: u64, iron: u64, crop: u64) -> Self {
        Resources { wood, clay, iron, crop }
    }

    pub fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Wood => self.wood,
            ResourceKind::Clay => self.clay,
            ResourceKind::Iron => self.iron,
            ResourceKind::Crop => self.crop,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Clay => &mut self.clay,
            ResourceKind::Iron => &mut self.iron,
            ResourceKind::Crop => &mut self.crop,
        }
    }

    /// Sum of all four, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.wood
            .saturating_add(self.clay)
            .saturating_add(self.iron)
            .saturating_add(self.crop)
    }

    pub fn is_zero(&self) -> bool {
        *self == Resources::ZERO
    }

    /// True when every quantity in `self` is at least the one in `other`.
    pub fn covers(&self, other: &Resources) -> bool {
        ALL_RESOURCES.iter().all(|&k| self.get(k) >= other.get(k))
    }

    /// Multiplies every quantity by `factor`, flooring the result.
    pub fn scaled(&self, factor: f64) -> Resources {
        Resources::from_fn(|k| (self.get(k) as f64 * factor).floor() as u64)
    }

    pub fn times(&self, n: u64) -> Resources {
        Resources::from_fn(|k| self.get(k).saturating_mul(n))
    }

    pub fn saturating_sub(&self, other: &Resources) -> Resources {
        Resources::from_fn(|k| self.get(k).saturating_sub(other.get(k)))
    }

    pub fn plus(&self, other: &Resources) -> Resources {
        Resources::from_fn(|k| self.get(k).saturating_add(other.get(k)))
    }

    pub fn from_fn(mut f: impl FnMut(ResourceKind) -> u64) -> Resources {
        Resources::new(
            f(ResourceKind::Wood),
            f(ResourceKind::Clay),
            f(ResourceKind::Iron),
            f(ResourceKind::Crop),
        )
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wood {} clay {} iron {} crop {}",
            self.wood, self.clay, self.iron, self.crop
        )
    }
}
