//! Entities and players.
//!
//! Every entity embeds an [`EntityBase`]; the `Entity` interface methods
//! operate on that part, which concrete entities expose through
//! [`Reflect::upcast`].

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::ptr;
use std::rc::Rc;

use anyhow::anyhow;
use mdinspect_core::{
    arg, object, receiver, reflect_enum, ArrayList, Class, Method, Object, Reflect, BOOLEAN,
    DOUBLE, INT, LIST, STRING,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::inventory::{Inventory, INVENTORY};
use crate::world::{Location, LOCATION, WORLD};

/// Interface implemented by everything that lives in a world.
pub static ENTITY: Class = Class::interface("Entity", "world::Entity").with_methods(entity_methods);
static PLAYER_SUPERS: [&Class; 1] = [&ENTITY];
/// Runtime class of [`Player`].
pub static PLAYER: Class = Class::new("Player", "world::Player")
    .extends(&PLAYER_SUPERS)
    .with_methods(player_methods);

/// How a player interacts with the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// Survival.
    #[default]
    Survival,
    /// Creative.
    Creative,
    /// Adventure.
    Adventure,
    /// Spectator.
    Spectator,
}

reflect_enum!(GameMode, GAME_MODE, "GameMode", "world::GameMode", {
    Survival => "SURVIVAL",
    Creative => "CREATIVE",
    Adventure => "ADVENTURE",
    Spectator => "SPECTATOR",
});

/// State shared by every entity.
#[derive(Debug)]
pub struct EntityBase {
    id: u32,
    name: String,
    location: RefCell<Location>,
    health: Cell<f64>,
    max_health: f64,
}

impl EntityBase {
    /// New entity at full health.
    pub fn new(id: u32, name: impl Into<String>, location: Location, max_health: f64) -> Self {
        Self {
            id,
            name: name.into(),
            location: RefCell::new(location),
            health: Cell::new(max_health),
            max_health,
        }
    }

    /// Server-unique entity id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current location.
    pub fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    /// Move the entity.
    pub fn teleport(&self, to: Location) -> bool {
        if to.world().is_none() {
            return false;
        }
        *self.location.borrow_mut() = to;
        true
    }

    /// Current health.
    pub fn health(&self) -> f64 {
        self.health.get()
    }

    /// Maximum health.
    pub fn max_health(&self) -> f64 {
        self.max_health
    }

    /// Set health, which must lie within `0..=max_health`.
    pub fn set_health(&self, health: f64) -> anyhow::Result<()> {
        if !(0.0..=self.max_health).contains(&health) {
            return Err(anyhow!("health {health} is outside 0..={}", self.max_health));
        }
        self.health.set(health);
        Ok(())
    }

    /// Whether the entity has no health left.
    pub fn is_dead(&self) -> bool {
        self.health.get() <= 0.0
    }
}

/// A connected player.
#[derive(Debug)]
pub struct Player {
    base: EntityBase,
    address: String,
    game_mode: Cell<GameMode>,
    level: Cell<i32>,
    inventory: Rc<Inventory>,
    messages: RefCell<Vec<String>>,
}

impl Player {
    /// Maximum health of a player.
    pub const MAX_HEALTH: f64 = 20.0;

    /// A player at `location` with an empty inventory.
    pub fn new(id: u32, name: impl Into<String>, location: Location) -> Self {
        let name = name.into();
        Self {
            address: format!("127.0.0.1:{}", 50_000 + id),
            base: EntityBase::new(id, name, location, Self::MAX_HEALTH),
            game_mode: Cell::new(GameMode::Survival),
            level: Cell::new(0),
            inventory: Rc::new(Inventory::new()),
            messages: RefCell::new(Vec::new()),
        }
    }

    /// Entity state.
    pub fn base(&self) -> &EntityBase {
        &self.base
    }

    /// Player name.
    pub fn name(&self) -> &str {
        self.base.name()
    }

    /// Current game mode.
    pub fn game_mode(&self) -> GameMode {
        self.game_mode.get()
    }

    /// Change the game mode.
    pub fn set_game_mode(&self, mode: GameMode) {
        self.game_mode.set(mode);
    }

    /// Experience level.
    pub fn level(&self) -> i32 {
        self.level.get()
    }

    /// Set the experience level.
    pub fn set_level(&self, level: i32) {
        self.level.set(level.max(0));
    }

    /// Shared handle to the inventory.
    pub fn inventory(&self) -> &Rc<Inventory> {
        &self.inventory
    }

    /// Deliver a chat message.
    pub fn send_message(&self, message: impl Into<String>) {
        let message = message.into();
        info!(player = %self.name(), %message, "message delivered");
        self.messages.borrow_mut().push(message);
    }

    /// Messages delivered so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Reflect for Player {
    fn class(&self) -> &'static Class {
        &PLAYER
    }

    fn upcast(&self, class: &'static Class) -> Option<&dyn Any> {
        if ptr::eq(class, &PLAYER) {
            Some(self)
        } else if ptr::eq(class, &ENTITY) {
            Some(&self.base)
        } else {
            None
        }
    }

    fn to_text(&self) -> String {
        format!("Player({})", self.name())
    }
}

fn entity(recv: &Object) -> anyhow::Result<&EntityBase> {
    receiver::<EntityBase>(recv, &ENTITY)
}

fn entity_methods() -> Vec<Method> {
    vec![
        Method::new(&ENTITY, "getEntityId", |recv, _| Ok(Some(object(entity(recv)?.id() as i32)))).returns(&INT),
        Method::new(&ENTITY, "getName", |recv, _| Ok(Some(object(entity(recv)?.name().to_string()))))
            .returns(&STRING),
        Method::new(&ENTITY, "getLocation", |recv, _| Ok(Some(object(entity(recv)?.location()))))
            .returns(&LOCATION),
        Method::new(&ENTITY, "getWorld", |recv, _| {
            let world: Object = entity(recv)?
                .location()
                .world()
                .ok_or_else(|| anyhow!("world is unloaded"))?;
            Ok(Some(world))
        })
        .returns(&WORLD),
        Method::new(&ENTITY, "teleport", |recv, args| {
            let to = arg::<Location>(args, 0, &LOCATION)?.clone();
            Ok(Some(object(entity(recv)?.teleport(to))))
        })
        .params(&[&LOCATION])
        .returns(&BOOLEAN),
        Method::new(&ENTITY, "getHealth", |recv, _| Ok(Some(object(entity(recv)?.health())))).returns(&DOUBLE),
        Method::new(&ENTITY, "getMaxHealth", |recv, _| Ok(Some(object(entity(recv)?.max_health()))))
            .returns(&DOUBLE),
        Method::new(&ENTITY, "setHealth", |recv, args| {
            entity(recv)?.set_health(*arg::<f64>(args, 0, &DOUBLE)?)?;
            Ok(None)
        })
        .params(&[&DOUBLE]),
        Method::new(&ENTITY, "isDead", |recv, _| Ok(Some(object(entity(recv)?.is_dead())))).returns(&BOOLEAN),
    ]
}

fn player_methods() -> Vec<Method> {
    vec![
        Method::new(&PLAYER, "getGameMode", |recv, _| {
            Ok(Some(object(receiver::<Player>(recv, &PLAYER)?.game_mode())))
        })
        .returns(&GAME_MODE),
        Method::new(&PLAYER, "setGameMode", |recv, args| {
            let mode = *arg::<GameMode>(args, 0, &GAME_MODE)?;
            receiver::<Player>(recv, &PLAYER)?.set_game_mode(mode);
            Ok(None)
        })
        .params(&[&GAME_MODE]),
        Method::new(&PLAYER, "getLevel", |recv, _| Ok(Some(object(receiver::<Player>(recv, &PLAYER)?.level()))))
            .returns(&INT),
        Method::new(&PLAYER, "setLevel", |recv, args| {
            receiver::<Player>(recv, &PLAYER)?.set_level(*arg::<i32>(args, 0, &INT)?);
            Ok(None)
        })
        .params(&[&INT]),
        Method::new(&PLAYER, "getInventory", |recv, _| {
            let inventory: Object = receiver::<Player>(recv, &PLAYER)?.inventory().clone();
            Ok(Some(inventory))
        })
        .returns(&INVENTORY),
        Method::new(&PLAYER, "sendMessage", |recv, args| {
            let message = arg::<String>(args, 0, &STRING)?;
            receiver::<Player>(recv, &PLAYER)?.send_message(message.as_str());
            Ok(None)
        })
        .params(&[&STRING]),
        Method::new(&PLAYER, "getMessages", |recv, _| {
            let messages = receiver::<Player>(recv, &PLAYER)?.messages();
            Ok(Some(object(ArrayList::of(messages.into_iter().map(object)))))
        })
        .returns(&LIST),
        Method::new(&PLAYER, "getAddress", |recv, _| {
            Ok(Some(object(receiver::<Player>(recv, &PLAYER)?.address.clone())))
        })
        .returns(&STRING)
        .internal(),
    ]
}
