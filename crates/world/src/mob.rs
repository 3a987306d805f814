//! Mobs: non-player entities.

use std::any::Any;
use std::ptr;

use mdinspect_core::{object, receiver, reflect_enum, Class, Method, Reflect, BOOLEAN, STRING};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityBase, ENTITY};
use crate::world::Location;

static MOB_SUPERS: [&Class; 1] = [&ENTITY];
/// Runtime class of [`Mob`].
pub static MOB: Class = Class::new("Mob", "world::Mob")
    .extends(&MOB_SUPERS)
    .with_methods(mob_methods);

/// Types of mobs that can spawn in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MobType {
    /// Passive farm animal.
    Pig,
    /// Passive farm animal.
    Cow,
    /// Passive farm animal.
    Sheep,
    /// Passive farm animal.
    Chicken,
    /// Trader.
    Villager,
    /// Undead melee.
    Zombie,
    /// Undead archer.
    Skeleton,
    /// Climber.
    Spider,
    /// Explodes.
    Creeper,
    /// Nether, ranged.
    Blaze,
    /// Nether, flying.
    Ghast,
}

reflect_enum!(MobType, MOB_TYPE, "MobType", "world::MobType", {
    Pig => "PIG",
    Cow => "COW",
    Sheep => "SHEEP",
    Chicken => "CHICKEN",
    Villager => "VILLAGER",
    Zombie => "ZOMBIE",
    Skeleton => "SKELETON",
    Spider => "SPIDER",
    Creeper => "CREEPER",
    Blaze => "BLAZE",
    Ghast => "GHAST",
});

impl MobType {
    /// Lowercase name, also used as the entity name.
    pub const fn as_str(self) -> &'static str {
        match self {
            MobType::Pig => "pig",
            MobType::Cow => "cow",
            MobType::Sheep => "sheep",
            MobType::Chicken => "chicken",
            MobType::Villager => "villager",
            MobType::Zombie => "zombie",
            MobType::Skeleton => "skeleton",
            MobType::Spider => "spider",
            MobType::Creeper => "creeper",
            MobType::Blaze => "blaze",
            MobType::Ghast => "ghast",
        }
    }

    /// Whether the mob attacks players.
    pub fn is_hostile(self) -> bool {
        matches!(
            self,
            MobType::Zombie
                | MobType::Skeleton
                | MobType::Spider
                | MobType::Creeper
                | MobType::Blaze
                | MobType::Ghast
        )
    }

    /// Health at spawn.
    pub fn max_health(self) -> f64 {
        match self {
            MobType::Pig | MobType::Cow | MobType::Ghast => 10.0,
            MobType::Sheep => 8.0,
            MobType::Chicken => 4.0,
            MobType::Spider => 16.0,
            MobType::Villager | MobType::Zombie | MobType::Skeleton | MobType::Creeper | MobType::Blaze => 20.0,
        }
    }
}

/// A mob instance in the world.
#[derive(Debug)]
pub struct Mob {
    base: EntityBase,
    kind: MobType,
}

impl Mob {
    /// Create a new mob at full health.
    pub fn new(id: u32, kind: MobType, location: Location) -> Self {
        Self {
            base: EntityBase::new(id, kind.as_str(), location, kind.max_health()),
            kind,
        }
    }

    /// Entity state.
    pub fn base(&self) -> &EntityBase {
        &self.base
    }

    /// Type of mob.
    pub fn kind(&self) -> MobType {
        self.kind
    }
}

impl Reflect for Mob {
    fn class(&self) -> &'static Class {
        &MOB
    }

    fn upcast(&self, class: &'static Class) -> Option<&dyn Any> {
        if ptr::eq(class, &MOB) {
            Some(self)
        } else if ptr::eq(class, &ENTITY) {
            Some(&self.base)
        } else {
            None
        }
    }

    fn to_text(&self) -> String {
        format!("Mob({}#{})", self.kind.as_str(), self.base.id())
    }
}

fn mob_methods() -> Vec<Method> {
    vec![
        Method::new(&MOB, "getMobType", |recv, _| Ok(Some(object(receiver::<Mob>(recv, &MOB)?.kind()))))
            .returns(&MOB_TYPE),
        Method::new(&MOB, "isHostile", |recv, _| {
            Ok(Some(object(receiver::<Mob>(recv, &MOB)?.kind().is_hostile())))
        })
        .returns(&BOOLEAN),
        Method::new(&MOB, "getCustomName", |_, _| Ok(None)).returns(&STRING),
    ]
}
