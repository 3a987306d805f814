use anyhow::Result;
use mdinspect_engine::AccessPolicy;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/inspect.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Default tracing filter; `RUST_LOG` wins when set.
    pub log_level: String,
    /// Allow every internal method.
    pub trusted: bool,
    /// Class paths whose internal methods may be called when not trusted.
    pub allowed_classes: Vec<String>,
    /// Formatted results longer than this are cut. Zero disables the limit.
    pub max_output_chars: usize,
    pub prompt: String,
    /// Server snapshot to load instead of the built-in sample.
    pub world: Option<PathBuf>,
    /// Player the console acts as, resolving `self` and `~` coordinates.
    pub player: Option<String>,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            trusted: false,
            allowed_classes: Vec::new(),
            max_output_chars: 2_000,
            prompt: "> ".to_string(),
            world: None,
            player: None,
        }
    }
}

impl InspectConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<InspectConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    InspectConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH) || err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!("Inspect config not found at {}. Using defaults", path.display());
                }
                InspectConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn access_policy(&self) -> AccessPolicy {
        if self.trusted {
            AccessPolicy::Trusted
        } else {
            AccessPolicy::allow(self.allowed_classes.iter().cloned())
        }
    }

    /// Cut `text` to `max_output_chars` characters.
    pub fn truncate(&self, text: String) -> String {
        if self.max_output_chars == 0 || text.chars().count() <= self.max_output_chars {
            return text;
        }
        let mut cut: String = text.chars().take(self.max_output_chars).collect();
        cut.push_str("... (truncated)");
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mdinspect-{}-{name}", std::process::id()))
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = InspectConfig::load_from_path(&temp_path("absent.toml"));
        assert_eq!(cfg, InspectConfig::default());
        assert_eq!(cfg.access_policy(), AccessPolicy::exported_only());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_path("partial.toml");
        fs::write(&path, "trusted = true\nprompt = \"$ \"\n").unwrap();
        let cfg = InspectConfig::load_from_path(&path);
        let _ = fs::remove_file(&path);
        assert!(cfg.access_policy().is_trusted());
        assert_eq!(cfg.prompt, "$ ");
        assert_eq!(cfg.max_output_chars, 2_000);
    }

    #[test]
    fn malformed_file_falls_back() {
        let path = temp_path("broken.toml");
        fs::write(&path, "trusted = \"maybe\"").unwrap();
        let cfg = InspectConfig::load_from_path(&path);
        let _ = fs::remove_file(&path);
        assert_eq!(cfg, InspectConfig::default());
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("saved/inspect.toml");
        let cfg = InspectConfig {
            allowed_classes: vec!["world::World".to_string()],
            player: Some("alice".to_string()),
            ..InspectConfig::default()
        };
        cfg.save_to_path(&path).unwrap();
        let loaded = InspectConfig::load_from_path(&path);
        let _ = fs::remove_dir_all(path.parent().unwrap());
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn truncation_counts_characters() {
        let cfg = InspectConfig {
            max_output_chars: 3,
            ..InspectConfig::default()
        };
        assert_eq!(cfg.truncate("abc".to_string()), "abc");
        assert_eq!(cfg.truncate("äbcd".to_string()), "äbc... (truncated)");
    }
}
