//! Serializable description of a server, used to seed the inspected world.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::entity::GameMode;
use crate::inventory::Material;
use crate::mob::MobType;
use crate::weather::WeatherState;

/// Whole-server snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSnapshot {
    /// Server name.
    pub name: String,
    /// Player slots.
    pub max_players: u32,
    /// Worlds, in load order. The first one is the default world.
    pub worlds: Vec<WorldSnapshot>,
    /// Online players.
    pub players: Vec<PlayerSnapshot>,
}

impl Default for ServerSnapshot {
    fn default() -> Self {
        Self {
            name: "mdinspect".to_string(),
            max_players: 20,
            worlds: Vec::new(),
            players: Vec::new(),
        }
    }
}

/// One world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorldSnapshot {
    /// World name.
    pub name: String,
    /// Generation seed.
    pub seed: u64,
    /// Day clock tick.
    pub time: u64,
    /// Weather.
    pub weather: WeatherState,
    /// Spawn point; the origin when absent.
    pub spawn: Option<[f64; 3]>,
    /// Cuboids of blocks, applied in order.
    pub fills: Vec<BlockFill>,
    /// Mobs.
    pub mobs: Vec<MobSnapshot>,
}

/// Inclusive cuboid of one material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockFill {
    /// One corner.
    pub from: [i32; 3],
    /// Opposite corner.
    pub to: [i32; 3],
    /// Material to place.
    pub material: Material,
}

/// One mob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MobSnapshot {
    /// Mob type.
    pub kind: MobType,
    /// Position.
    pub pos: [f64; 3],
}

/// One player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlayerSnapshot {
    /// Player name.
    pub name: String,
    /// World name; the first world when empty.
    pub world: String,
    /// Position; the world spawn when absent.
    pub pos: Option<[f64; 3]>,
    /// Game mode.
    pub game_mode: GameMode,
    /// Experience level.
    pub level: i32,
    /// Inventory contents, added in order.
    pub items: Vec<ItemSnapshot>,
}

/// Items given to a player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Item type.
    pub material: Material,
    /// Number of items.
    pub count: u8,
}

impl ServerSnapshot {
    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid server snapshot")
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Render as pretty JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A small two-world server with two players.
    pub fn sample() -> Self {
        Self {
            name: "mdinspect".to_string(),
            max_players: 20,
            worlds: vec![
                WorldSnapshot {
                    name: "overworld".to_string(),
                    seed: 42,
                    time: 6_000,
                    weather: WeatherState::Clear,
                    spawn: Some([0.5, 65.0, 0.5]),
                    fills: vec![
                        BlockFill {
                            from: [-4, 60, -4],
                            to: [4, 62, 4],
                            material: Material::Stone,
                        },
                        BlockFill {
                            from: [-4, 63, -4],
                            to: [4, 63, 4],
                            material: Material::Dirt,
                        },
                        BlockFill {
                            from: [-4, 64, -4],
                            to: [4, 64, 4],
                            material: Material::GrassBlock,
                        },
                        BlockFill {
                            from: [3, 65, -3],
                            to: [3, 68, -3],
                            material: Material::OakLog,
                        },
                    ],
                    mobs: vec![
                        MobSnapshot {
                            kind: MobType::Zombie,
                            pos: [4.5, 65.0, 4.5],
                        },
                        MobSnapshot {
                            kind: MobType::Pig,
                            pos: [-3.5, 65.0, 2.5],
                        },
                    ],
                },
                WorldSnapshot {
                    name: "world_nether".to_string(),
                    seed: 42,
                    time: 18_000,
                    weather: WeatherState::Clear,
                    spawn: Some([0.5, 40.0, 0.5]),
                    fills: vec![BlockFill {
                        from: [-3, 36, -3],
                        to: [3, 39, 3],
                        material: Material::Netherrack,
                    }],
                    mobs: vec![MobSnapshot {
                        kind: MobType::Blaze,
                        pos: [2.5, 40.0, 2.5],
                    }],
                },
            ],
            players: vec![
                PlayerSnapshot {
                    name: "alice".to_string(),
                    world: "overworld".to_string(),
                    pos: None,
                    game_mode: GameMode::Survival,
                    level: 12,
                    items: vec![
                        ItemSnapshot {
                            material: Material::Stone,
                            count: 64,
                        },
                        ItemSnapshot {
                            material: Material::Dirt,
                            count: 12,
                        },
                        ItemSnapshot {
                            material: Material::Diamond,
                            count: 3,
                        },
                        ItemSnapshot {
                            material: Material::DiamondSword,
                            count: 1,
                        },
                    ],
                },
                PlayerSnapshot {
                    name: "bob".to_string(),
                    world: "world_nether".to_string(),
                    pos: Some([1.5, 40.0, -2.5]),
                    game_mode: GameMode::Creative,
                    level: 3,
                    items: vec![
                        ItemSnapshot {
                            material: Material::EnderPearl,
                            count: 16,
                        },
                        ItemSnapshot {
                            material: Material::OakLog,
                            count: 20,
                        },
                    ],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_survives_json() {
        let sample = ServerSnapshot::sample();
        let json = sample.to_json().unwrap();
        assert!(json.contains("\"GRASS_BLOCK\""));
        assert_eq!(ServerSnapshot::from_json(&json).unwrap(), sample);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let snapshot = ServerSnapshot::from_json(r#"{"worlds":[{"name":"flat"}]}"#).unwrap();
        assert_eq!(snapshot.name, "mdinspect");
        assert_eq!(snapshot.worlds[0].weather, WeatherState::Clear);
        assert!(snapshot.players.is_empty());
    }

    #[test]
    fn unknown_materials_are_rejected() {
        let json = r#"{"worlds":[{"name":"w","fills":[{"from":[0,0,0],"to":[0,0,0],"material":"CHEESE"}]}]}"#;
        assert!(ServerSnapshot::from_json(json).is_err());
    }
}
