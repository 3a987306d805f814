//! The server: root object owning worlds and players.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use anyhow::{anyhow, bail};
use mdinspect_core::{arg, object, receiver, ArrayList, Class, Method, Object, Reflect, INT, LIST, LONG, STRING};
use tracing::{debug, info};

use crate::entity::{Player, PLAYER};
use crate::snapshot::ServerSnapshot;
use crate::world::{Location, World, WORLD};

/// Runtime class of [`Server`].
pub static SERVER: Class = Class::new("Server", "world::Server").with_methods(server_methods);

/// Version string reported by the server.
pub const SERVER_VERSION: &str = concat!("mdinspect ", env!("CARGO_PKG_VERSION"));

/// Owns the loaded worlds and the online players.
#[derive(Debug)]
pub struct Server {
    name: String,
    max_players: u32,
    tick: Cell<u64>,
    next_entity_id: Cell<u32>,
    worlds: RefCell<Vec<Rc<World>>>,
    players: RefCell<Vec<Rc<Player>>>,
    me: Weak<Server>,
}

impl Server {
    /// An empty server.
    pub fn new(name: impl Into<String>, max_players: u32) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|me| Self {
            name,
            max_players,
            tick: Cell::new(0),
            next_entity_id: Cell::new(1),
            worlds: RefCell::new(Vec::new()),
            players: RefCell::new(Vec::new()),
            me: me.clone(),
        })
    }

    /// Build a server from a snapshot.
    pub fn from_snapshot(snapshot: &ServerSnapshot) -> anyhow::Result<Rc<Self>> {
        let server = Self::new(snapshot.name.clone(), snapshot.max_players);
        for spec in &snapshot.worlds {
            let world = server.create_world(spec.name.clone(), spec.seed)?;
            world.set_time(spec.time);
            world.set_weather(spec.weather);
            if let Some([x, y, z]) = spec.spawn {
                world.set_spawn(x, y, z);
            }
            for fill in &spec.fills {
                let (lo, hi) = corners(fill.from, fill.to);
                for x in lo[0]..=hi[0] {
                    for y in lo[1]..=hi[1] {
                        for z in lo[2]..=hi[2] {
                            world.set_block_type(x, y, z, fill.material)?;
                        }
                    }
                }
            }
            for mob in &spec.mobs {
                let [x, y, z] = mob.pos;
                world.spawn_mob(mob.kind, world.location(x, y, z))?;
            }
        }
        for spec in &snapshot.players {
            let world = if spec.world.is_empty() {
                server.default_world()
            } else {
                server.world(&spec.world)
            }
            .ok_or_else(|| anyhow!("player {} is in unknown world {:?}", spec.name, spec.world))?;
            let location = match spec.pos {
                Some([x, y, z]) => world.location(x, y, z),
                None => world.spawn_location(),
            };
            let player = server.join(spec.name.clone(), location)?;
            player.set_game_mode(spec.game_mode);
            player.set_level(spec.level);
            for item in &spec.items {
                player.inventory().add_item(item.material, item.count);
            }
        }
        info!(
            worlds = server.worlds().len(),
            players = server.online_players().len(),
            "server loaded"
        );
        Ok(server)
    }

    /// The built-in sample server.
    pub fn sample() -> anyhow::Result<Rc<Self>> {
        Self::from_snapshot(&ServerSnapshot::sample())
    }

    /// Server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Player slots.
    pub fn max_players(&self) -> u32 {
        self.max_players
    }

    /// Ticks since start.
    pub fn tick(&self) -> u64 {
        self.tick.get()
    }

    /// Advance the clock of the server and every world.
    pub fn advance(&self, ticks: u64) {
        self.tick.set(self.tick.get().saturating_add(ticks));
        for world in self.worlds.borrow().iter() {
            world.set_time(world.time().saturating_add(ticks));
        }
    }

    /// Next free entity id.
    pub fn allocate_entity_id(&self) -> u32 {
        let id = self.next_entity_id.get();
        self.next_entity_id.set(id.wrapping_add(1));
        id
    }

    /// Load a new, empty world.
    pub fn create_world(&self, name: impl Into<String>, seed: u64) -> anyhow::Result<Rc<World>> {
        let name = name.into();
        if self.world(&name).is_some() {
            bail!("world {name} already exists");
        }
        let world = World::new(name, seed, self.me.clone());
        debug!(world = world.name(), "world created");
        self.worlds.borrow_mut().push(Rc::clone(&world));
        Ok(world)
    }

    /// Loaded worlds in load order.
    pub fn worlds(&self) -> Vec<Rc<World>> {
        self.worlds.borrow().clone()
    }

    /// The first loaded world.
    pub fn default_world(&self) -> Option<Rc<World>> {
        self.worlds.borrow().first().cloned()
    }

    /// World by name, ignoring ASCII case.
    pub fn world(&self, name: &str) -> Option<Rc<World>> {
        self.worlds
            .borrow()
            .iter()
            .find(|world| world.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Connect a player.
    pub fn join(&self, name: impl Into<String>, location: Location) -> anyhow::Result<Rc<Player>> {
        let name = name.into();
        if self.player(&name).is_some() {
            bail!("player {name} is already online");
        }
        if self.players.borrow().len() >= self.max_players as usize {
            bail!("server is full");
        }
        let player = Rc::new(Player::new(self.allocate_entity_id(), name, location));
        info!(player = player.name(), "player joined");
        self.players.borrow_mut().push(Rc::clone(&player));
        Ok(player)
    }

    /// Online player by name, ignoring ASCII case.
    pub fn player(&self, name: &str) -> Option<Rc<Player>> {
        self.players
            .borrow()
            .iter()
            .find(|player| player.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Online players in join order.
    pub fn online_players(&self) -> Vec<Rc<Player>> {
        self.players.borrow().clone()
    }

    /// Send a message to every online player. Returns how many received it.
    pub fn broadcast(&self, message: &str) -> usize {
        let players = self.online_players();
        for player in &players {
            player.send_message(message);
        }
        players.len()
    }
}

impl Reflect for Server {
    fn class(&self) -> &'static Class {
        &SERVER
    }

    fn to_text(&self) -> String {
        format!("Server({})", self.name)
    }
}

fn corners(a: [i32; 3], b: [i32; 3]) -> ([i32; 3], [i32; 3]) {
    (
        [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
        [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
    )
}

fn server_methods() -> Vec<Method> {
    vec![
        Method::new(&SERVER, "getName", |recv, _| {
            Ok(Some(object(receiver::<Server>(recv, &SERVER)?.name().to_string())))
        })
        .returns(&STRING),
        Method::new(&SERVER, "getVersion", |_, _| Ok(Some(object(SERVER_VERSION.to_string())))).returns(&STRING),
        Method::new(&SERVER, "getMaxPlayers", |recv, _| {
            Ok(Some(object(receiver::<Server>(recv, &SERVER)?.max_players() as i32)))
        })
        .returns(&INT),
        Method::new(&SERVER, "getTick", |recv, _| {
            Ok(Some(object(receiver::<Server>(recv, &SERVER)?.tick() as i64)))
        })
        .returns(&LONG),
        Method::new(&SERVER, "getWorlds", |recv, _| {
            let worlds = receiver::<Server>(recv, &SERVER)?.worlds();
            Ok(Some(object(ArrayList::of(worlds.into_iter().map(|w| w as Object)))))
        })
        .returns(&LIST),
        Method::new(&SERVER, "getWorld", |recv, args| {
            let name = arg::<String>(args, 0, &STRING)?;
            let world = receiver::<Server>(recv, &SERVER)?.world(name);
            Ok(world.map(|w| w as Object))
        })
        .params(&[&STRING])
        .returns(&WORLD),
        Method::new(&SERVER, "getPlayer", |recv, args| {
            let name = arg::<String>(args, 0, &STRING)?;
            let player = receiver::<Server>(recv, &SERVER)?.player(name);
            Ok(player.map(|p| p as Object))
        })
        .params(&[&STRING])
        .returns(&PLAYER),
        Method::new(&SERVER, "getOnlinePlayers", |recv, _| {
            let players = receiver::<Server>(recv, &SERVER)?.online_players();
            Ok(Some(object(ArrayList::of(players.into_iter().map(|p| p as Object)))))
        })
        .returns(&LIST),
        Method::new(&SERVER, "broadcast", |recv, args| {
            let message = arg::<String>(args, 0, &STRING)?;
            let delivered = receiver::<Server>(recv, &SERVER)?.broadcast(message);
            Ok(Some(object(delivered as i32)))
        })
        .params(&[&STRING])
        .returns(&INT),
        Method::new(&SERVER, "advance", |recv, args| {
            let ticks = *arg::<i64>(args, 0, &LONG)?;
            let ticks = u64::try_from(ticks).map_err(|_| anyhow!("ticks must not be negative"))?;
            receiver::<Server>(recv, &SERVER)?.advance(ticks);
            Ok(None)
        })
        .params(&[&LONG]),
        Method::new(&SERVER, "getNextEntityId", |recv, _| {
            Ok(Some(object(receiver::<Server>(recv, &SERVER)?.next_entity_id.get() as i32)))
        })
        .returns(&INT)
        .internal(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Material;

    #[test]
    fn sample_server_is_populated() {
        let server = Server::sample().unwrap();
        assert_eq!(server.worlds().len(), 2);
        assert_eq!(server.online_players().len(), 2);
        let overworld = server.world("OVERWORLD").expect("world");
        assert_eq!(overworld.block_type(0, 64, 0), Material::GrassBlock);
        assert_eq!(overworld.highest_block_y(3, -3), Some(68));
        assert_eq!(overworld.players().len(), 1);
        assert_eq!(overworld.mobs().len(), 2);
        let alice = server.player("Alice").expect("player");
        assert_eq!(alice.inventory().count_item(Material::Diamond), 3);
    }

    #[test]
    fn entity_ids_are_unique() {
        let server = Server::sample().unwrap();
        let mut ids: Vec<u32> = server.online_players().iter().map(|p| p.base().id()).collect();
        for world in server.worlds() {
            ids.extend(world.mobs().iter().map(|m| m.base().id()));
        }
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let server = Server::new("s", 1);
        let world = server.create_world("w", 0).unwrap();
        assert!(server.create_world("W", 0).is_err());
        server.join("eve", world.spawn_location()).unwrap();
        assert!(server.join("EVE", world.spawn_location()).is_err());
        assert!(server.join("frank", world.spawn_location()).is_err());
    }

    #[test]
    fn advance_moves_every_clock() {
        let server = Server::sample().unwrap();
        server.advance(100);
        assert_eq!(server.tick(), 100);
        assert_eq!(server.world("overworld").map(|w| w.time()), Some(6_100));
    }

    #[test]
    fn broadcast_reaches_everyone() {
        let server = Server::sample().unwrap();
        assert_eq!(server.broadcast("hello"), 2);
        assert_eq!(server.player("bob").map(|p| p.messages()), Some(vec!["hello".to_string()]));
    }
}
