//! Converters between command tokens and world objects.
//!
//! Coordinates accept `~` offsets, resolved against the location of the
//! command sender's subject when it is an entity.

use std::rc::Rc;

use mdinspect_core::{view, Class, Object, Value};
use mdinspect_engine::{
    Handler, HandlerRegistry, InputContext, InputHandler, OutputHandler, ParseError,
};
use tracing::debug;

use crate::coords::{BlockCoordArg, CoordArg};
use crate::entity::{EntityBase, Player, ENTITY, PLAYER};
use crate::inventory::{Inventory, ItemStack, Material, INVENTORY, ITEM_STACK, MATERIAL};
use crate::server::{Server, SERVER};
use crate::world::{Block, Location, World, BLOCK, LOCATION, WORLD};

/// Separator between a material and a count in item literals (`stone:3`).
pub const ITEM_COUNT_SEPARATOR: char = ':';

/// Prefix selecting an entity by id (`#12`).
pub const ENTITY_ID_PREFIX: char = '#';

fn sender_location(cx: &InputContext<'_>) -> Option<Location> {
    let subject = cx.sender?.subject()?;
    view::<EntityBase>(&subject, &ENTITY).map(EntityBase::location)
}

/// Resolves worlds by name.
pub struct WorldHandler {
    server: Rc<Server>,
}

impl InputHandler for WorldHandler {
    fn relevant_class(&self) -> &'static Class {
        &WORLD
    }

    fn instantiate(&self, arg: &str, target: &'static Class, _cx: &InputContext<'_>) -> anyhow::Result<Value> {
        let world: Object = self.server.world(arg.trim()).ok_or_else(|| {
            let names: Vec<String> = self.server.worlds().iter().map(|w| w.name().to_string()).collect();
            ParseError::new(arg, target, format!("no world named that; loaded: {}", names.join(", ")))
        })?;
        Ok(Some(world))
    }
}

/// Resolves online players by name.
pub struct PlayerHandler {
    server: Rc<Server>,
}

impl InputHandler for PlayerHandler {
    fn relevant_class(&self) -> &'static Class {
        &PLAYER
    }

    fn instantiate(&self, arg: &str, target: &'static Class, _cx: &InputContext<'_>) -> anyhow::Result<Value> {
        let player: Object = self
            .server
            .player(arg.trim())
            .ok_or_else(|| ParseError::new(arg, target, "no such player online"))?;
        Ok(Some(player))
    }
}

/// Resolves any entity by `#id` or player name. Serves every entity subtype.
pub struct EntityHandler {
    server: Rc<Server>,
}

impl EntityHandler {
    fn find(&self, arg: &str) -> Option<Object> {
        let arg = arg.trim();
        if let Some(id) = arg.strip_prefix(ENTITY_ID_PREFIX) {
            let id: u32 = id.parse().ok()?;
            if let Some(player) = self.server.online_players().into_iter().find(|p| p.base().id() == id) {
                return Some(player as Object);
            }
            return self
                .server
                .worlds()
                .iter()
                .flat_map(|world| world.mobs())
                .find(|mob| mob.base().id() == id)
                .map(|mob| mob as Object);
        }
        self.server.player(arg).map(|player| player as Object)
    }
}

impl InputHandler for EntityHandler {
    fn relevant_class(&self) -> &'static Class {
        &ENTITY
    }

    fn is_polymorphic(&self) -> bool {
        true
    }

    fn instantiate(&self, arg: &str, target: &'static Class, _cx: &InputContext<'_>) -> anyhow::Result<Value> {
        let entity = self
            .find(arg)
            .ok_or_else(|| ParseError::new(arg, target, "no entity with that id or name"))?;
        if !entity.class().is_a(target) {
            return Err(ParseError::new(arg, target, format!("entity is a {}", entity.class())).into());
        }
        Ok(Some(entity))
    }
}

/// Splits `[world,]x,y,z`, returning the world and the three coordinate tokens.
fn split_position<'a>(
    server: &Server,
    arg: &'a str,
    target: &'static Class,
    here: Option<&Location>,
) -> Result<(Rc<World>, [&'a str; 3]), ParseError> {
    let parts: Vec<&str> = arg.split(',').map(str::trim).collect();
    let (world, coords) = match parts.as_slice() {
        [x, y, z] => {
            let world = here.and_then(Location::world).or_else(|| server.default_world());
            (world, [*x, *y, *z])
        }
        [name, x, y, z] => (server.world(name), [*x, *y, *z]),
        _ => return Err(ParseError::new(arg, target, "expected [world,]x,y,z")),
    };
    let world = world.ok_or_else(|| ParseError::new(arg, target, "unknown world"))?;
    Ok((world, coords))
}

/// Parses `[world,]x,y,z` into a [`Location`].
pub struct LocationHandler {
    server: Rc<Server>,
}

impl InputHandler for LocationHandler {
    fn relevant_class(&self) -> &'static Class {
        &LOCATION
    }

    fn instantiate(&self, arg: &str, target: &'static Class, cx: &InputContext<'_>) -> anyhow::Result<Value> {
        let here = sender_location(cx);
        let (world, [x, y, z]) = split_position(&self.server, arg, target, here.as_ref())?;
        let coords = [CoordArg::parse(x, target)?, CoordArg::parse(y, target)?, CoordArg::parse(z, target)?];
        let base = match &here {
            Some(loc) => [loc.x, loc.y, loc.z],
            None if coords.iter().any(|c| c.is_relative()) => {
                return Err(ParseError::new(arg, target, "relative coordinates need a sender in the world").into());
            }
            None => [0.0; 3],
        };
        let location = world.location(
            coords[0].resolve(base[0]),
            coords[1].resolve(base[1]),
            coords[2].resolve(base[2]),
        );
        let location: Object = Rc::new(location);
        Ok(Some(location))
    }
}

/// Parses `[world,]x,y,z` into a [`Block`].
pub struct BlockHandler {
    server: Rc<Server>,
}

impl InputHandler for BlockHandler {
    fn relevant_class(&self) -> &'static Class {
        &BLOCK
    }

    fn instantiate(&self, arg: &str, target: &'static Class, cx: &InputContext<'_>) -> anyhow::Result<Value> {
        let here = sender_location(cx);
        let (world, [x, y, z]) = split_position(&self.server, arg, target, here.as_ref())?;
        let coords = [
            BlockCoordArg::parse(x, target)?,
            BlockCoordArg::parse(y, target)?,
            BlockCoordArg::parse(z, target)?,
        ];
        let base = match &here {
            Some(loc) => {
                let (bx, by, bz) = loc.block_coords();
                [bx, by, bz]
            }
            None if coords.iter().any(|c| c.is_relative()) => {
                return Err(ParseError::new(arg, target, "relative coordinates need a sender in the world").into());
            }
            None => [0; 3],
        };
        let block = world.block_at(
            coords[0].resolve(base[0]),
            coords[1].resolve(base[1]),
            coords[2].resolve(base[2]),
        );
        let block: Object = Rc::new(block);
        Ok(Some(block))
    }
}

/// Parses `material[:count]` into an [`ItemStack`]. The material goes back
/// through the registry.
pub struct ItemStackHandler;

impl InputHandler for ItemStackHandler {
    fn relevant_class(&self) -> &'static Class {
        &ITEM_STACK
    }

    fn instantiate(&self, arg: &str, target: &'static Class, cx: &InputContext<'_>) -> anyhow::Result<Value> {
        let (name, count) = match arg.split_once(ITEM_COUNT_SEPARATOR) {
            Some((name, count)) => {
                let count = count
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .filter(|c| *c > 0)
                    .ok_or_else(|| ParseError::new(arg, target, "count must be 1..=255"))?;
                (name, count)
            }
            None => (arg, 1),
        };
        let material = cx
            .instantiate(&MATERIAL, name.trim())?
            .ok_or_else(|| ParseError::new(arg, target, "material must not be null"))?;
        let material = *view::<Material>(&material, &MATERIAL)
            .ok_or_else(|| ParseError::new(arg, target, "not a material"))?;
        let stack: Object = Rc::new(ItemStack::new(material, count));
        Ok(Some(stack))
    }
}

/// Output handler backed by a plain function.
struct Formatter {
    class: &'static Class,
    render: fn(&Object, &HandlerRegistry) -> Option<String>,
}

impl OutputHandler for Formatter {
    fn relevant_class(&self) -> &'static Class {
        self.class
    }

    fn format(&self, value: &Object, registry: &HandlerRegistry) -> String {
        (self.render)(value, registry).unwrap_or_else(|| value.to_text())
    }
}

fn format_location(location: &Location) -> String {
    format!(
        "{} @ {:.2}, {:.2}, {:.2}",
        location.world_name(),
        location.x,
        location.y,
        location.z
    )
}

fn format_player(value: &Object, _: &HandlerRegistry) -> Option<String> {
    let player = view::<Player>(value, &PLAYER)?;
    let base = player.base();
    Some(format!(
        "{} [{:?}] level {} at {} ({:.1}/{:.1} hp)",
        player.name(),
        player.game_mode(),
        player.level(),
        format_location(&base.location()),
        base.health(),
        base.max_health()
    ))
}

fn format_entity(value: &Object, _: &HandlerRegistry) -> Option<String> {
    let base = view::<EntityBase>(value, &ENTITY)?;
    Some(format!(
        "{}#{} at {} ({:.1}/{:.1} hp)",
        base.name(),
        base.id(),
        format_location(&base.location()),
        base.health(),
        base.max_health()
    ))
}

fn format_location_value(value: &Object, _: &HandlerRegistry) -> Option<String> {
    view::<Location>(value, &LOCATION).map(format_location)
}

fn format_block(value: &Object, registry: &HandlerRegistry) -> Option<String> {
    let block = view::<Block>(value, &BLOCK)?;
    let material = registry.format_object(&(Rc::new(block.material()) as Object));
    Some(format!("{material} at {} {}, {}, {}", block.world_name(), block.x, block.y, block.z))
}

fn format_item_stack(value: &Object, registry: &HandlerRegistry) -> Option<String> {
    let stack = view::<ItemStack>(value, &ITEM_STACK)?;
    let material = registry.format_object(&(Rc::new(stack.material()) as Object));
    Some(format!("{}x {material}", stack.count()))
}

fn format_inventory(value: &Object, registry: &HandlerRegistry) -> Option<String> {
    let inventory = view::<Inventory>(value, &INVENTORY)?;
    let slots: Vec<String> = inventory
        .contents()
        .into_iter()
        .map(|(slot, stack)| format!("{slot}: {}", registry.format_object(&(stack as Object))))
        .collect();
    Some(format!("{{{}}}", slots.join(", ")))
}

fn format_world(value: &Object, registry: &HandlerRegistry) -> Option<String> {
    let world = view::<World>(value, &WORLD)?;
    let weather = registry.format_object(&(Rc::new(world.weather()) as Object));
    Some(format!("{} ({weather}, time {})", world.name(), world.time()))
}

fn format_server(value: &Object, _: &HandlerRegistry) -> Option<String> {
    let server = view::<Server>(value, &SERVER)?;
    Some(format!(
        "{} ({} worlds, {}/{} players)",
        server.name(),
        server.worlds().len(),
        server.online_players().len(),
        server.max_players()
    ))
}

/// Register the world converters. Returns how many were accepted.
///
/// Output order matters: the player formatter precedes the generic entity one.
pub fn register_world_handlers(registry: &mut HandlerRegistry, server: &Rc<Server>) -> usize {
    let formatter = |class: &'static Class, render: fn(&Object, &HandlerRegistry) -> Option<String>| {
        Handler::output(Formatter { class, render })
    };
    let handlers = [
        Handler::input(WorldHandler {
            server: Rc::clone(server),
        }),
        Handler::input(PlayerHandler {
            server: Rc::clone(server),
        }),
        Handler::input(EntityHandler {
            server: Rc::clone(server),
        }),
        Handler::input(LocationHandler {
            server: Rc::clone(server),
        }),
        Handler::input(BlockHandler {
            server: Rc::clone(server),
        }),
        Handler::input(ItemStackHandler),
        formatter(&PLAYER, format_player),
        formatter(&ENTITY, format_entity),
        formatter(&LOCATION, format_location_value),
        formatter(&BLOCK, format_block),
        formatter(&ITEM_STACK, format_item_stack),
        formatter(&INVENTORY, format_inventory),
        formatter(&WORLD, format_world),
        formatter(&SERVER, format_server),
    ];
    let total = handlers.len();
    let accepted = handlers.into_iter().filter(|h| registry.register(h.clone())).count();
    debug!(accepted, total, "registered world handlers");
    accepted
}
