//! Worlds and the positions inside them.
//!
//! A [`World`] owns its block grid, its mobs and its clock. [`Location`] and
//! [`Block`] are cheap value handles that point back at their world weakly,
//! so they stay valid to hold after the world is unloaded and simply report
//! it as gone.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use anyhow::anyhow;
use mdinspect_core::{
    arg, object, receiver, ArrayList, Class, Method, Object, Reflect, Value, BOOLEAN, DOUBLE, INT,
    LIST, LONG, STRING,
};
use tracing::debug;

use crate::entity::Player;
use crate::inventory::{Material, MATERIAL};
use crate::mob::{Mob, MobType, MOB, MOB_TYPE};
use crate::server::Server;
use crate::weather::{WeatherState, WEATHER_STATE};

/// Ticks per in-game day.
pub const TICKS_PER_DAY: u64 = 24_000;

/// Lowest buildable block height.
pub const MIN_HEIGHT: i32 = 0;

/// Highest buildable block height (exclusive).
pub const MAX_HEIGHT: i32 = 256;

/// Runtime class of [`World`].
pub static WORLD: Class = Class::new("World", "world::World").with_methods(world_methods);
/// Runtime class of [`Location`].
pub static LOCATION: Class = Class::new("Location", "world::Location").with_methods(location_methods);
/// Runtime class of [`Block`].
pub static BLOCK: Class = Class::new("Block", "world::Block").with_methods(block_methods);

/// A loaded world.
#[derive(Debug)]
pub struct World {
    name: String,
    seed: u64,
    time: Cell<u64>,
    weather: Cell<WeatherState>,
    spawn: Cell<(f64, f64, f64)>,
    blocks: RefCell<HashMap<(i32, i32, i32), Material>>,
    mobs: RefCell<Vec<Rc<Mob>>>,
    server: Weak<Server>,
    me: Weak<World>,
}

impl World {
    /// Create an empty world owned by `server`.
    pub fn new(name: impl Into<String>, seed: u64, server: Weak<Server>) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|me| Self {
            name,
            seed,
            time: Cell::new(0),
            weather: Cell::new(WeatherState::Clear),
            spawn: Cell::new((0.5, 64.0, 0.5)),
            blocks: RefCell::new(HashMap::new()),
            mobs: RefCell::new(Vec::new()),
            server,
            me: me.clone(),
        })
    }

    /// World name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generation seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current tick of the day clock.
    pub fn time(&self) -> u64 {
        self.time.get()
    }

    /// Set the day clock.
    pub fn set_time(&self, tick: u64) {
        self.time.set(tick);
    }

    /// Whether the sun is up.
    pub fn is_day_time(&self) -> bool {
        self.time.get() % TICKS_PER_DAY < TICKS_PER_DAY / 2
    }

    /// Current weather.
    pub fn weather(&self) -> WeatherState {
        self.weather.get()
    }

    /// Change the weather.
    pub fn set_weather(&self, state: WeatherState) {
        debug!(world = %self.name, ?state, "weather changed");
        self.weather.set(state);
    }

    /// Material at a block position; unset positions are air.
    pub fn block_type(&self, x: i32, y: i32, z: i32) -> Material {
        self.blocks.borrow().get(&(x, y, z)).copied().unwrap_or_default()
    }

    /// Place a material. Fails outside the buildable height range.
    pub fn set_block_type(&self, x: i32, y: i32, z: i32, material: Material) -> anyhow::Result<()> {
        if !(MIN_HEIGHT..MAX_HEIGHT).contains(&y) {
            return Err(anyhow!("y={y} is outside {MIN_HEIGHT}..{MAX_HEIGHT}"));
        }
        if !material.is_block() {
            return Err(anyhow!("{material:?} cannot be placed"));
        }
        let mut blocks = self.blocks.borrow_mut();
        if material.is_air() {
            blocks.remove(&(x, y, z));
        } else {
            blocks.insert((x, y, z), material);
        }
        Ok(())
    }

    /// Height of the topmost non-air block in a column.
    pub fn highest_block_y(&self, x: i32, z: i32) -> Option<i32> {
        self.blocks
            .borrow()
            .keys()
            .filter(|(bx, _, bz)| *bx == x && *bz == z)
            .map(|(_, y, _)| *y)
            .max()
    }

    /// Handle to the block at a position.
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Block {
        Block {
            world: self.me.clone(),
            x,
            y,
            z,
        }
    }

    /// Where players spawn.
    pub fn spawn_location(&self) -> Location {
        let (x, y, z) = self.spawn.get();
        Location {
            world: self.me.clone(),
            x,
            y,
            z,
        }
    }

    /// Move the spawn point.
    pub fn set_spawn(&self, x: f64, y: f64, z: f64) {
        self.spawn.set((x, y, z));
    }

    /// A location in this world.
    pub fn location(&self, x: f64, y: f64, z: f64) -> Location {
        Location {
            world: self.me.clone(),
            x,
            y,
            z,
        }
    }

    /// Online players currently standing in this world.
    pub fn players(&self) -> Vec<Rc<Player>> {
        let Some(server) = self.server.upgrade() else {
            return Vec::new();
        };
        server
            .online_players()
            .into_iter()
            .filter(|player| player.base().location().is_in(self))
            .collect()
    }

    /// Mobs living in this world.
    pub fn mobs(&self) -> Vec<Rc<Mob>> {
        self.mobs.borrow().clone()
    }

    /// Spawn a mob at `location`, which must be in this world.
    pub fn spawn_mob(&self, kind: MobType, location: Location) -> anyhow::Result<Rc<Mob>> {
        if !location.is_in(self) {
            return Err(anyhow!("location is not in world {}", self.name));
        }
        let id = self
            .server
            .upgrade()
            .map_or(0, |server| server.allocate_entity_id());
        let mob = Rc::new(Mob::new(id, kind, location));
        debug!(world = %self.name, id, ?kind, "spawned mob");
        self.mobs.borrow_mut().push(Rc::clone(&mob));
        Ok(mob)
    }

    /// Server this world belongs to.
    pub fn server(&self) -> Option<Rc<Server>> {
        self.server.upgrade()
    }
}

impl Reflect for World {
    fn class(&self) -> &'static Class {
        &WORLD
    }

    fn to_text(&self) -> String {
        format!("World({})", self.name)
    }
}

/// A point in a world.
#[derive(Debug, Clone)]
pub struct Location {
    world: Weak<World>,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Location {
    /// A location in `world`.
    pub fn new(world: &Rc<World>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: Rc::downgrade(world),
            x,
            y,
            z,
        }
    }

    /// The world, if still loaded.
    pub fn world(&self) -> Option<Rc<World>> {
        self.world.upgrade()
    }

    /// Name of the world, or `<unloaded>`.
    pub fn world_name(&self) -> String {
        self.world()
            .map_or_else(|| "<unloaded>".to_string(), |world| world.name().to_string())
    }

    /// Whether this location lies in `world`.
    pub fn is_in(&self, world: &World) -> bool {
        std::ptr::eq(self.world.as_ptr(), world)
    }

    /// Floored block coordinates.
    pub fn block_coords(&self) -> (i32, i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32, self.z.floor() as i32)
    }

    /// The block containing this location.
    pub fn block(&self) -> Block {
        let (x, y, z) = self.block_coords();
        Block {
            world: self.world.clone(),
            x,
            y,
            z,
        }
    }

    /// This location moved by an offset.
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            world: self.world.clone(),
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Euclidean distance; locations must share a world.
    pub fn distance(&self, other: &Location) -> anyhow::Result<f64> {
        if !Weak::ptr_eq(&self.world, &other.world) {
            return Err(anyhow!(
                "cannot measure distance between {} and {}",
                self.world_name(),
                other.world_name()
            ));
        }
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        Ok((dx * dx + dy * dy + dz * dz).sqrt())
    }
}

impl Reflect for Location {
    fn class(&self) -> &'static Class {
        &LOCATION
    }

    fn to_text(&self) -> String {
        format!("{}@{:.2},{:.2},{:.2}", self.world_name(), self.x, self.y, self.z)
    }
}

/// Handle to one block position in a world.
#[derive(Debug, Clone)]
pub struct Block {
    world: Weak<World>,
    /// Block X.
    pub x: i32,
    /// Block Y.
    pub y: i32,
    /// Block Z.
    pub z: i32,
}

impl Block {
    /// The world, if still loaded.
    pub fn world(&self) -> Option<Rc<World>> {
        self.world.upgrade()
    }

    /// Current material; air when the world is gone.
    pub fn material(&self) -> Material {
        self.world()
            .map(|world| world.block_type(self.x, self.y, self.z))
            .unwrap_or_default()
    }

    /// Change the material.
    pub fn set_material(&self, material: Material) -> anyhow::Result<()> {
        let world = self.world().ok_or_else(|| anyhow!("world is unloaded"))?;
        world.set_block_type(self.x, self.y, self.z, material)
    }

    /// Location of the block's lower corner.
    pub fn location(&self) -> Location {
        Location {
            world: self.world.clone(),
            x: f64::from(self.x),
            y: f64::from(self.y),
            z: f64::from(self.z),
        }
    }

    /// Neighbouring block at an offset.
    pub fn relative(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            world: self.world.clone(),
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    /// Name of the world, or `<unloaded>`.
    pub fn world_name(&self) -> String {
        self.location().world_name()
    }
}

impl Reflect for Block {
    fn class(&self) -> &'static Class {
        &BLOCK
    }

    fn to_text(&self) -> String {
        format!("{:?}@{},{},{}", self.material(), self.x, self.y, self.z)
    }
}

fn loaded(world: Option<Rc<World>>) -> anyhow::Result<Object> {
    let world: Object = world.ok_or_else(|| anyhow!("world is unloaded"))?;
    Ok(world)
}

fn int_arg(args: &[Value], index: usize) -> anyhow::Result<i32> {
    Ok(*arg::<i32>(args, index, &INT)?)
}

fn double_arg(args: &[Value], index: usize) -> anyhow::Result<f64> {
    Ok(*arg::<f64>(args, index, &DOUBLE)?)
}

fn world_methods() -> Vec<Method> {
    vec![
        Method::new(&WORLD, "getName", |recv, _| {
            Ok(Some(object(receiver::<World>(recv, &WORLD)?.name().to_string())))
        })
        .returns(&STRING),
        Method::new(&WORLD, "getSeed", |recv, _| {
            Ok(Some(object(receiver::<World>(recv, &WORLD)?.seed() as i64)))
        })
        .returns(&LONG)
        .internal(),
        Method::new(&WORLD, "getTime", |recv, _| {
            Ok(Some(object(receiver::<World>(recv, &WORLD)?.time() as i64)))
        })
        .returns(&LONG),
        Method::new(&WORLD, "setTime", |recv, args| {
            let tick = *arg::<i64>(args, 0, &LONG)?;
            let tick = u64::try_from(tick).map_err(|_| anyhow!("time must not be negative"))?;
            receiver::<World>(recv, &WORLD)?.set_time(tick);
            Ok(None)
        })
        .params(&[&LONG]),
        Method::new(&WORLD, "isDayTime", |recv, _| {
            Ok(Some(object(receiver::<World>(recv, &WORLD)?.is_day_time())))
        })
        .returns(&BOOLEAN),
        Method::new(&WORLD, "getWeather", |recv, _| {
            Ok(Some(object(receiver::<World>(recv, &WORLD)?.weather())))
        })
        .returns(&WEATHER_STATE),
        Method::new(&WORLD, "setWeather", |recv, args| {
            let state = *arg::<WeatherState>(args, 0, &WEATHER_STATE)?;
            receiver::<World>(recv, &WORLD)?.set_weather(state);
            Ok(None)
        })
        .params(&[&WEATHER_STATE]),
        Method::new(&WORLD, "getBlockAt", |recv, args| {
            let world = receiver::<World>(recv, &WORLD)?;
            let block = world.block_at(int_arg(args, 0)?, int_arg(args, 1)?, int_arg(args, 2)?);
            Ok(Some(object(block)))
        })
        .params(&[&INT, &INT, &INT])
        .returns(&BLOCK),
        Method::new(&WORLD, "getBlockAt", |recv, args| {
            let world = receiver::<World>(recv, &WORLD)?;
            let location = arg::<Location>(args, 0, &LOCATION)?;
            if !location.is_in(world) {
                return Err(anyhow!("location is in {}", location.world_name()));
            }
            Ok(Some(object(location.block())))
        })
        .params(&[&LOCATION])
        .returns(&BLOCK),
        Method::new(&WORLD, "getHighestBlockYAt", |recv, args| {
            let world = receiver::<World>(recv, &WORLD)?;
            let y = world.highest_block_y(int_arg(args, 0)?, int_arg(args, 1)?);
            Ok(Some(object(y.unwrap_or(MIN_HEIGHT))))
        })
        .params(&[&INT, &INT])
        .returns(&INT),
        Method::new(&WORLD, "getSpawnLocation", |recv, _| {
            Ok(Some(object(receiver::<World>(recv, &WORLD)?.spawn_location())))
        })
        .returns(&LOCATION),
        Method::new(&WORLD, "getPlayers", |recv, _| {
            let players = receiver::<World>(recv, &WORLD)?.players();
            Ok(Some(object(ArrayList::of(players.into_iter().map(|p| p as Object)))))
        })
        .returns(&LIST),
        Method::new(&WORLD, "getEntities", |recv, _| {
            let world = receiver::<World>(recv, &WORLD)?;
            let players = world.players().into_iter().map(|p| p as Object);
            let mobs = world.mobs().into_iter().map(|m| m as Object);
            Ok(Some(object(ArrayList::of(players.chain(mobs)))))
        })
        .returns(&LIST),
        Method::new(&WORLD, "spawnMob", |recv, args| {
            let world = receiver::<World>(recv, &WORLD)?;
            let kind = *arg::<MobType>(args, 0, &MOB_TYPE)?;
            let location = arg::<Location>(args, 1, &LOCATION)?.clone();
            Ok(Some(world.spawn_mob(kind, location)? as Object))
        })
        .params(&[&MOB_TYPE, &LOCATION])
        .returns(&MOB),
    ]
}

fn location_methods() -> Vec<Method> {
    vec![
        Method::new(&LOCATION, "getX", |recv, _| Ok(Some(object(receiver::<Location>(recv, &LOCATION)?.x))))
            .returns(&DOUBLE),
        Method::new(&LOCATION, "getY", |recv, _| Ok(Some(object(receiver::<Location>(recv, &LOCATION)?.y))))
            .returns(&DOUBLE),
        Method::new(&LOCATION, "getZ", |recv, _| Ok(Some(object(receiver::<Location>(recv, &LOCATION)?.z))))
            .returns(&DOUBLE),
        Method::new(&LOCATION, "getBlockX", |recv, _| {
            Ok(Some(object(receiver::<Location>(recv, &LOCATION)?.block_coords().0)))
        })
        .returns(&INT),
        Method::new(&LOCATION, "getBlockY", |recv, _| {
            Ok(Some(object(receiver::<Location>(recv, &LOCATION)?.block_coords().1)))
        })
        .returns(&INT),
        Method::new(&LOCATION, "getBlockZ", |recv, _| {
            Ok(Some(object(receiver::<Location>(recv, &LOCATION)?.block_coords().2)))
        })
        .returns(&INT),
        Method::new(&LOCATION, "getWorld", |recv, _| {
            Ok(Some(loaded(receiver::<Location>(recv, &LOCATION)?.world())?))
        })
        .returns(&WORLD),
        Method::new(&LOCATION, "getBlock", |recv, _| {
            Ok(Some(object(receiver::<Location>(recv, &LOCATION)?.block())))
        })
        .returns(&BLOCK),
        Method::new(&LOCATION, "add", |recv, args| {
            let location = receiver::<Location>(recv, &LOCATION)?;
            let moved = location.offset(double_arg(args, 0)?, double_arg(args, 1)?, double_arg(args, 2)?);
            Ok(Some(object(moved)))
        })
        .params(&[&DOUBLE, &DOUBLE, &DOUBLE])
        .returns(&LOCATION),
        Method::new(&LOCATION, "distance", |recv, args| {
            let location = receiver::<Location>(recv, &LOCATION)?;
            let other = arg::<Location>(args, 0, &LOCATION)?;
            Ok(Some(object(location.distance(other)?)))
        })
        .params(&[&LOCATION])
        .returns(&DOUBLE),
    ]
}

fn block_methods() -> Vec<Method> {
    vec![
        Method::new(&BLOCK, "getType", |recv, _| {
            Ok(Some(object(receiver::<Block>(recv, &BLOCK)?.material())))
        })
        .returns(&MATERIAL),
        Method::new(&BLOCK, "setType", |recv, args| {
            let material = *arg::<Material>(args, 0, &MATERIAL)?;
            receiver::<Block>(recv, &BLOCK)?.set_material(material)?;
            Ok(None)
        })
        .params(&[&MATERIAL]),
        Method::new(&BLOCK, "getX", |recv, _| Ok(Some(object(receiver::<Block>(recv, &BLOCK)?.x)))).returns(&INT),
        Method::new(&BLOCK, "getY", |recv, _| Ok(Some(object(receiver::<Block>(recv, &BLOCK)?.y)))).returns(&INT),
        Method::new(&BLOCK, "getZ", |recv, _| Ok(Some(object(receiver::<Block>(recv, &BLOCK)?.z)))).returns(&INT),
        Method::new(&BLOCK, "getWorld", |recv, _| {
            Ok(Some(loaded(receiver::<Block>(recv, &BLOCK)?.world())?))
        })
        .returns(&WORLD),
        Method::new(&BLOCK, "getLocation", |recv, _| {
            Ok(Some(object(receiver::<Block>(recv, &BLOCK)?.location())))
        })
        .returns(&LOCATION),
        Method::new(&BLOCK, "getRelative", |recv, args| {
            let block = receiver::<Block>(recv, &BLOCK)?;
            Ok(Some(object(block.relative(int_arg(args, 0)?, int_arg(args, 1)?, int_arg(args, 2)?))))
        })
        .params(&[&INT, &INT, &INT])
        .returns(&BLOCK),
        Method::new(&BLOCK, "isEmpty", |recv, _| {
            Ok(Some(object(receiver::<Block>(recv, &BLOCK)?.material().is_air())))
        })
        .returns(&BOOLEAN),
    ]
}
