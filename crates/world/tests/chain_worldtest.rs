//! Chains walked against the sample server.
//!
//! Validates:
//! - Navigation through servers, worlds, players and blocks
//! - World literals (players, materials, locations) in argument position
//! - `~` coordinates relative to the sending player
//! - Internal methods are gated by the access policy

use std::rc::Rc;

use mdinspect_core::{view, InvokeError, Object, Value};
use mdinspect_engine::{
    AccessPolicy, ChainInterpreter, ChainResult, ChainResultKind, CommandSender, ConsoleSender,
    HandlerRegistry, MethodIndexCache,
};
use mdinspect_world::{register_world_handlers, Block, Material, Player, Server, BLOCK};
use proptest::prelude::*;

struct AsPlayer(Rc<Player>);

impl CommandSender for AsPlayer {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn subject(&self) -> Value {
        Some(self.0.clone() as Object)
    }
}

struct Harness {
    server: Rc<Server>,
    registry: HandlerRegistry,
    methods: MethodIndexCache,
}

impl Harness {
    fn new() -> Self {
        let server = Server::sample().expect("sample server");
        let mut registry = HandlerRegistry::with_builtins();
        register_world_handlers(&mut registry, &server);
        Self {
            server,
            registry,
            methods: MethodIndexCache::new(),
        }
    }

    fn start(&self) -> Value {
        Some(self.server.clone() as Object)
    }

    fn run_with(&self, access: &AccessPolicy, tokens: &[&str], sender: &dyn CommandSender) -> ChainResult {
        ChainInterpreter::new(&self.registry, &self.methods, access).run(tokens, self.start(), Some(sender))
    }

    fn run(&self, tokens: &[&str]) -> ChainResult {
        self.run_with(&AccessPolicy::exported_only(), tokens, &ConsoleSender)
    }

    fn text(&self, result: ChainResult) -> String {
        let kind = result.kind();
        let value = result
            .into_value()
            .unwrap_or_else(|| panic!("expected success, got {kind}"));
        self.registry.format(&value).unwrap_or_default()
    }
}

#[test]
fn walks_from_server_to_block_material() {
    let harness = Harness::new();
    let result = harness.run(&[
        "getWorld(String)",
        "world_nether",
        "getBlockAt(int,int,int)",
        "0",
        "39",
        "0",
        "getType()",
    ]);
    assert_eq!(harness.text(result), "NETHERRACK");
}

#[test]
fn player_block_below_is_grass() {
    let harness = Harness::new();
    let result = harness.run(&[
        "getPlayer(String)",
        "alice",
        "getLocation()",
        "getBlock()",
        "getRelative(int,int,int)",
        "0",
        "-1",
        "0",
        "getType()",
    ]);
    assert_eq!(harness.text(result), "GRASS_BLOCK");
}

#[test]
fn enum_arguments_are_read_by_name() {
    let harness = Harness::new();
    let result = harness.run(&["getPlayer(String)", "alice", "getInventory()", "count(Material)", "diamond"]);
    assert_eq!(harness.text(result), "3");

    let result = harness.run(&["getPlayer(String)", "alice", "getInventory()", "count(Material)", "cheese"]);
    assert_eq!(result.kind(), ChainResultKind::InputError);
    assert!(result.reason().unwrap_or_default().contains("cheese"));
}

#[test]
fn world_objects_can_be_arguments() {
    let harness = Harness::new();
    let result = harness.run(&[
        "getWorld(String)",
        "overworld",
        "getBlockAt(Location)",
        "overworld,3.2,66.9,-2.5",
        "getType()",
    ]);
    assert_eq!(harness.text(result), "OAK_LOG");

    let result = harness.run(&[
        "getPlayer(String)",
        "alice",
        "getInventory()",
        "addItem(ItemStack)",
        "sand:10",
    ]);
    assert_eq!(harness.text(result), "0");
    assert_eq!(
        harness.server.player("alice").map(|p| p.inventory().count_item(Material::Sand)),
        Some(10)
    );
}

#[test]
fn relative_teleport_moves_the_sender() {
    let harness = Harness::new();
    let bob = harness.server.player("bob").expect("bob");
    let sender = AsPlayer(Rc::clone(&bob));
    let result = harness.run_with(
        &AccessPolicy::exported_only(),
        &["getPlayer(String)", "bob", "teleport(Location)", "~,~5,~"],
        &sender,
    );
    assert_eq!(harness.text(result), "true");
    assert_eq!(bob.base().location().y, 45.0);
    assert_eq!(bob.base().location().world_name(), "world_nether");
}

#[test]
fn missing_results_are_classified() {
    let harness = Harness::new();
    let result = harness.run(&["getPlayer(String)", "mallory", "getName()"]);
    assert_eq!(result.kind(), ChainResultKind::NullReference);

    let result = harness.run(&["getWorld(String)", "overworld", "teleport(Location)", "0,0,0"]);
    assert_eq!(result.kind(), ChainResultKind::UnknownReference);
}

#[test]
fn internal_methods_need_an_allowed_class() {
    let harness = Harness::new();
    let tokens = ["getWorld(String)", "overworld", "getSeed()"];

    let denied = harness.run(&tokens);
    assert_eq!(denied.kind(), ChainResultKind::UnhandledException);
    assert!(matches!(
        denied.cause().and_then(|c| c.downcast_ref::<InvokeError>()),
        Some(InvokeError::IllegalAccess { .. })
    ));

    let allowed = harness.run_with(&AccessPolicy::allow(["world::World"]), &tokens, &ConsoleSender);
    assert_eq!(harness.text(allowed), "42");

    let trusted = harness.run_with(&AccessPolicy::Trusted, &["getNextEntityId()"], &ConsoleSender);
    assert!(trusted.is_success());
}

#[test]
fn failing_method_body_is_unhandled_exception() {
    let harness = Harness::new();
    let result = harness.run(&["getPlayer(String)", "alice", "setHealth(double)", "99"]);
    assert_eq!(result.kind(), ChainResultKind::UnhandledException);
    assert!(result.cause().map(|c| c.to_string()).unwrap_or_default().contains("outside"));
}

proptest! {
    /// Property: Blocks set through a chain read back through a chain
    ///
    /// Any material placed at any in-range block comes back from `getType`.
    #[test]
    fn set_type_then_get_type(
        x in -16i32..16,
        y in 0i32..200,
        z in -16i32..16,
        material in prop_oneof![
            Just("stone"),
            Just("sand"),
            Just("water"),
            Just("oak_log"),
            Just("air"),
        ],
    ) {
        let harness = Harness::new();
        let (xs, ys, zs) = (x.to_string(), y.to_string(), z.to_string());
        let at = ["getWorld(String)", "overworld", "getBlockAt(int,int,int)", xs.as_str(), ys.as_str(), zs.as_str()];

        let mut set = at.to_vec();
        set.extend(["setType(Material)", material]);
        prop_assert!(harness.run(&set).is_success());

        let mut get = at.to_vec();
        get.push("getType()");
        prop_assert_eq!(harness.text(harness.run(&get)), material.to_ascii_uppercase());
    }

    /// Property: Relative block coordinates land next to the sender
    #[test]
    fn relative_block_offsets(dx in -3i32..=3, dy in -3i32..=3, dz in -3i32..=3) {
        let harness = Harness::new();
        let alice = harness.server.player("alice").expect("alice");
        let sender = AsPlayer(Rc::clone(&alice));
        let literal = format!("~{dx},~{dy},~{dz}");
        let block = harness
            .registry
            .instantiate(&BLOCK, &literal, Some(&sender))
            .expect("block literal");
        let block = block.expect("non-null");
        let block = view::<Block>(&block, &BLOCK).expect("block");
        let (bx, by, bz) = alice.base().location().block_coords();
        prop_assert_eq!((block.x, block.y, block.z), (bx + dx, by + dy, bz + dz));
    }
}
