use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::VecDeque, fs, path::Path};

#[derive(Debug, Deserialize)]
struct CommandScriptFile {
    steps: Vec<CommandScriptStep>,
}

/// One scripted command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandScriptStep {
    pub command: String,
    /// Player issuing the command; the console when absent.
    #[serde(default)]
    pub player: Option<String>,
}

/// Commands replayed in file order.
///
/// Scripts are a JSON object holding a list of `{command, player?}` steps.
#[derive(Debug)]
pub struct CommandScript {
    pending: VecDeque<CommandScriptStep>,
}

impl CommandScript {
    /// Load a command script from a JSON file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))?;
        Self::from_str(&contents)
    }

    /// Load a command script from an in-memory JSON string.
    pub fn from_str(contents: &str) -> Result<Self> {
        let file: CommandScriptFile = serde_json::from_str(contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("command script contains no steps");
        }

        let mut pending = VecDeque::with_capacity(file.steps.len());
        for (index, step) in file.steps.into_iter().enumerate() {
            let command = step.command.trim().to_string();
            if command.is_empty() {
                anyhow::bail!("command script step {index} is empty");
            }
            pending.push_back(CommandScriptStep {
                command,
                player: step.player.filter(|p| !p.trim().is_empty()),
            });
        }

        Ok(Self { pending })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Iterator for CommandScript {
    type Item = CommandScriptStep;

    fn next(&mut self) -> Option<Self::Item> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_script_rejects_empty_commands() {
        let json = r#"{"steps": [{"command": "/help"}, {"command": "   "}]}"#;
        let err = CommandScript::from_str(json).unwrap_err();
        assert!(err.to_string().contains("step 1"), "unexpected error: {err:#}");
        assert!(CommandScript::from_str(r#"{"steps": []}"#).is_err());
    }

    #[test]
    fn command_script_yields_in_order() {
        let json = r#"{
            "steps": [
                {"command": "/inspect server"},
                {"command": " /chain self getLevel ", "player": "alice"},
                {"command": "/help", "player": ""}
            ]
        }"#;
        let mut script = CommandScript::from_str(json).expect("script should parse");
        assert_eq!(script.len(), 3);
        assert_eq!(
            script.next(),
            Some(CommandScriptStep {
                command: "/inspect server".to_string(),
                player: None,
            })
        );
        assert_eq!(
            script.next().map(|s| (s.command, s.player)),
            Some(("/chain self getLevel".to_string(), Some("alice".to_string())))
        );
        assert_eq!(script.next().and_then(|s| s.player), None);
        assert!(script.is_finished());
    }
}
