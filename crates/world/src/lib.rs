#![warn(missing_docs)]
//! A small in-memory game server to inspect: worlds made of blocks, players
//! with inventories and mobs, each exposed through reflectable classes.
//!
//! [`register_world_handlers`] teaches a
//! [`HandlerRegistry`](mdinspect_engine::HandlerRegistry) to read and print
//! these objects in commands.

mod coords;
mod entity;
mod handlers;
mod inventory;
mod mob;
mod server;
mod snapshot;
mod weather;
mod world;

pub use coords::{BlockCoordArg, CoordArg};
pub use entity::{EntityBase, GameMode, Player, ENTITY, GAME_MODE, PLAYER};
pub use handlers::{
    register_world_handlers, BlockHandler, EntityHandler, ItemStackHandler, LocationHandler,
    PlayerHandler, WorldHandler, ENTITY_ID_PREFIX, ITEM_COUNT_SEPARATOR,
};
pub use inventory::{
    Inventory, ItemStack, Material, DEFAULT_STACK_SIZE, INVENTORY, INVENTORY_SIZE, ITEM_STACK, MATERIAL,
};
pub use mob::{Mob, MobType, MOB, MOB_TYPE};
pub use server::{Server, SERVER, SERVER_VERSION};
pub use snapshot::{BlockFill, ItemSnapshot, MobSnapshot, PlayerSnapshot, ServerSnapshot, WorldSnapshot};
pub use weather::{WeatherState, WEATHER_STATE};
pub use world::{Block, Location, World, BLOCK, LOCATION, MAX_HEIGHT, MIN_HEIGHT, TICKS_PER_DAY, WORLD};
