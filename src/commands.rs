use std::fmt;
use std::rc::Rc;

use mdinspect_core::{Class, Object, Value};
use mdinspect_engine::{ChainResult, CommandSender, InputError};
use mdinspect_world::{Player, BLOCK, ENTITY, PLAYER, WORLD};
use thiserror::Error;
use tracing::{error, warn};

use crate::config::InspectConfig;
use crate::plugin::DebugPlugin;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A player issuing commands. Its entity is `self` and anchors `~` coordinates.
pub struct PlayerSender {
    player: Rc<Player>,
}

impl PlayerSender {
    pub fn new(player: Rc<Player>) -> Self {
        Self { player }
    }
}

impl CommandSender for PlayerSender {
    fn name(&self) -> &str {
        self.player.name()
    }

    fn subject(&self) -> Value {
        Some(self.player.clone() as Object)
    }
}

/// Object a command starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The sender's own in-world object.
    Sender,
    Server,
    Player(String),
    World(String),
    /// `#id` or a player name.
    Entity(String),
    /// `[world,]x,y,z`.
    Block(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => f.write_str("self"),
            Self::Server => f.write_str("server"),
            Self::Player(name) => write!(f, "player:{name}"),
            Self::World(name) => write!(f, "world:{name}"),
            Self::Entity(key) => write!(f, "entity:{key}"),
            Self::Block(pos) => write!(f, "block:{pos}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectCommand {
    Help,
    Chain { target: Target, tokens: Vec<String> },
    Methods { target: Target, prefix: Option<String> },
    Inspect { target: Target },
    /// Disable then enable the plugin, dropping cached method indices.
    Reload,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub lines: Vec<String>,
}

impl CommandOutput {
    fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
        }
    }
}

pub fn help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  /chain <target> [method args...]...  walk methods starting at target".to_string(),
        "    methods are named by signature, e.g. getName() or getBlockAt(int,int,int)".to_string(),
        "  /methods <target> [prefix]           list callable signatures".to_string(),
        "  /inspect <target>                    print target and its class".to_string(),
        "  /reload                              re-register converters".to_string(),
        "  /help".to_string(),
        "Targets: self, server, player:<name>, world:<name>, entity:<#id|name>, block:[world,]x,y,z"
            .to_string(),
        "Quote arguments containing spaces; \\null\\ passes null.".to_string(),
    ]
}

/// Split a command line on whitespace. Double quotes group words into one token.
pub fn split_tokens(input: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for ch in input.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if quoted {
        return Err(CommandError::new("Unterminated quote"));
    }
    if pending {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_target(token: &str) -> Result<Target, CommandError> {
    let lower = token.to_ascii_lowercase();
    match lower.as_str() {
        "self" | "me" => return Ok(Target::Sender),
        "server" => return Ok(Target::Server),
        _ => {}
    }
    let (kind, rest) = token
        .split_once(':')
        .ok_or_else(|| CommandError::new(format!("Unknown target: {token}")))?;
    if rest.is_empty() {
        return Err(CommandError::new(format!("Missing value for target {kind}:")));
    }
    let rest = rest.to_string();
    match kind.to_ascii_lowercase().as_str() {
        "player" | "p" => Ok(Target::Player(rest)),
        "world" | "w" => Ok(Target::World(rest)),
        "entity" | "e" => Ok(Target::Entity(rest)),
        "block" | "b" => Ok(Target::Block(rest)),
        _ => Err(CommandError::new(format!("Unknown target kind: {kind}"))),
    }
}

pub fn parse_command(input: &str) -> Result<InspectCommand, CommandError> {
    let input = input.trim();
    let input = input.strip_prefix('/').unwrap_or(input).trim();
    let mut tokens = split_tokens(input)?.into_iter();
    let Some(cmd) = tokens.next() else {
        return Ok(InspectCommand::Help);
    };
    let cmd = cmd.to_ascii_lowercase();
    let args: Vec<String> = tokens.collect();

    match cmd.as_str() {
        "help" | "?" => Ok(InspectCommand::Help),
        "chain" | "c" => {
            let (first, rest) = args
                .split_first()
                .ok_or_else(|| CommandError::new("Usage: /chain <target> [tokens...]"))?;
            Ok(InspectCommand::Chain {
                target: parse_target(first)?,
                tokens: rest.to_vec(),
            })
        }
        "methods" | "m" => match args.as_slice() {
            [target] => Ok(InspectCommand::Methods {
                target: parse_target(target)?,
                prefix: None,
            }),
            [target, prefix] => Ok(InspectCommand::Methods {
                target: parse_target(target)?,
                prefix: Some(prefix.clone()),
            }),
            _ => Err(CommandError::new("Usage: /methods <target> [prefix]")),
        },
        "inspect" | "i" => match args.as_slice() {
            [target] => Ok(InspectCommand::Inspect {
                target: parse_target(target)?,
            }),
            _ => Err(CommandError::new("Usage: /inspect <target>")),
        },
        "reload" => Ok(InspectCommand::Reload),
        _ => Err(CommandError::new(format!("Unknown command: {cmd}. Try /help"))),
    }
}

fn resolve_target(
    plugin: &DebugPlugin,
    sender: &dyn CommandSender,
    target: &Target,
) -> Result<Object, CommandError> {
    let lookup = |class: &'static Class, literal: &str| -> Result<Value, InputError> {
        plugin.registry().instantiate(class, literal, Some(sender))
    };
    let value = match target {
        Target::Sender => Ok(sender.subject()),
        Target::Server => Ok(Some(plugin.server().clone() as Object)),
        Target::Player(name) => lookup(&PLAYER, name),
        Target::World(name) => lookup(&WORLD, name),
        Target::Entity(key) => lookup(&ENTITY, key),
        Target::Block(pos) => lookup(&BLOCK, pos),
    }
    .map_err(|err| CommandError::new(format!("Invalid target {target}: {err}")))?;
    value.ok_or_else(|| CommandError::new(format!("Target {target} is null for {}", sender.name())))
}

/// Run `cmd` for `sender`. Errors are reported as output lines.
pub fn execute_command(
    plugin: &mut DebugPlugin,
    config: &InspectConfig,
    sender: &dyn CommandSender,
    cmd: InspectCommand,
) -> CommandOutput {
    if !plugin.is_enabled() && cmd != InspectCommand::Reload && cmd != InspectCommand::Help {
        return CommandOutput::line("Error: debug plugin is disabled");
    }
    match cmd {
        InspectCommand::Help => CommandOutput {
            lines: help_lines(),
        },
        InspectCommand::Reload => {
            plugin.disable();
            plugin.enable();
            CommandOutput::line("Reloaded")
        }
        InspectCommand::Inspect { target } => match resolve_target(plugin, sender, &target) {
            Ok(object) => CommandOutput {
                lines: vec![
                    config.truncate(plugin.registry().format_object(&object)),
                    format!("class {}", object.class().path()),
                ],
            },
            Err(err) => CommandOutput::line(format!("Error: {err}")),
        },
        InspectCommand::Methods { target, prefix } => match resolve_target(plugin, sender, &target) {
            Ok(object) => {
                let index = plugin.methods().index_for(object.class());
                let signatures = match &prefix {
                    Some(prefix) => index.matching_prefix(prefix),
                    None => index.signatures(),
                };
                if signatures.is_empty() {
                    return CommandOutput::line(format!("No methods on {}", object.class().simple_name()));
                }
                CommandOutput {
                    lines: signatures.into_iter().map(str::to_string).collect(),
                }
            }
            Err(err) => CommandOutput::line(format!("Error: {err}")),
        },
        InspectCommand::Chain { target, tokens } => {
            let start = match resolve_target(plugin, sender, &target) {
                Ok(object) => object,
                Err(err) => return CommandOutput::line(format!("Error: {err}")),
            };
            let result = plugin.interpreter().run(&tokens, Some(start), Some(sender));
            report(plugin, config, &target, result)
        }
    }
}

fn report(plugin: &DebugPlugin, config: &InspectConfig, target: &Target, result: ChainResult) -> CommandOutput {
    let kind = result.kind();
    if let Some(cause) = result.cause() {
        error!(%target, %kind, "chain failed: {cause:#}");
    } else if !result.is_success() {
        warn!(%target, %kind, reason = result.reason().unwrap_or_default(), "chain stopped");
    }
    match result {
        ChainResult::Success(value) => match plugin.registry().format(&value) {
            Some(text) => CommandOutput::line(config.truncate(text)),
            None => CommandOutput::default(),
        },
        other => CommandOutput::line(format!("{kind}: {}", other.reason().unwrap_or_default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdinspect_engine::{AccessPolicy, ConsoleSender};
    use mdinspect_world::Server;

    fn plugin() -> DebugPlugin {
        let mut plugin = DebugPlugin::new(Server::sample().unwrap(), AccessPolicy::default());
        plugin.enable();
        plugin
    }

    fn run(plugin: &mut DebugPlugin, sender: &dyn CommandSender, input: &str) -> Vec<String> {
        let cmd = parse_command(input).unwrap();
        execute_command(plugin, &InspectConfig::default(), sender, cmd).lines
    }

    #[test]
    fn tokens_respect_quotes() {
        assert_eq!(
            split_tokens(r#"chain self sendMessage(String) "hello there"  x"#).unwrap(),
            vec!["chain", "self", "sendMessage(String)", "hello there", "x"]
        );
        assert_eq!(split_tokens(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
        assert!(split_tokens(r#"a "b"#).is_err());
    }

    #[test]
    fn parse_targets_and_usage() {
        assert_eq!(parse_command("").unwrap(), InspectCommand::Help);
        assert_eq!(
            parse_command("/chain player:alice getLevel()").unwrap(),
            InspectCommand::Chain {
                target: Target::Player("alice".to_string()),
                tokens: vec!["getLevel()".to_string()],
            }
        );
        assert_eq!(
            parse_command("/m server get").unwrap(),
            InspectCommand::Methods {
                target: Target::Server,
                prefix: Some("get".to_string()),
            }
        );
        assert!(parse_command("/chain").is_err());
        assert!(parse_command("/inspect moon:1").is_err());
        assert!(parse_command("/fly").is_err());
    }

    #[test]
    fn chain_prints_formatted_value() {
        let mut plugin = plugin();
        let lines = run(
            &mut plugin,
            &ConsoleSender,
            "/chain world:overworld getBlockAt(int,int,int) 0 64 0 getType()",
        );
        assert_eq!(lines, vec!["GRASS_BLOCK"]);
        let lines = run(&mut plugin, &ConsoleSender, "/chain player:alice setLevel(int) 30");
        assert!(lines.is_empty());
        assert_eq!(plugin.server().player("alice").map(|p| p.level()), Some(30));
    }

    #[test]
    fn chain_failures_are_reported() {
        let mut plugin = plugin();
        let lines = run(&mut plugin, &ConsoleSender, "/chain server fly");
        assert_eq!(lines, vec!["unknown reference: unknown method fly for Server"]);
        let lines = run(&mut plugin, &ConsoleSender, "/chain server getWorld(String)");
        assert!(lines[0].starts_with("argument mismatch"));
        let lines = run(&mut plugin, &ConsoleSender, "/chain self getName()");
        assert_eq!(lines, vec!["Error: Target self is null for console"]);
    }

    #[test]
    fn raised_exceptions_stay_generic() {
        let mut plugin = plugin();
        let lines = run(&mut plugin, &ConsoleSender, "/chain player:alice setHealth(double) 99");
        assert_eq!(
            lines,
            vec!["unhandled exception: setHealth(double) raised an exception"]
        );
    }

    #[test]
    fn self_target_uses_sender() {
        let mut plugin = plugin();
        let bob = plugin.server().player("bob").unwrap();
        let sender = PlayerSender::new(Rc::clone(&bob));
        let lines = run(&mut plugin, &sender, r#"/chain self sendMessage(String) "hi bob""#);
        assert!(lines.is_empty());
        assert_eq!(bob.messages(), vec!["hi bob".to_string()]);
        let lines = run(&mut plugin, &sender, "/inspect block:~,~-1,~");
        assert_eq!(lines[1], "class world::Block");
    }

    #[test]
    fn methods_lists_inherited_signatures() {
        let mut plugin = plugin();
        let lines = run(&mut plugin, &ConsoleSender, "/methods player:alice getH");
        assert_eq!(lines, vec!["getHealth()"]);
        let lines = run(&mut plugin, &ConsoleSender, "/methods entity:#1");
        assert!(lines.contains(&"teleport(Location)".to_string()));
    }

    #[test]
    fn disabled_plugin_refuses_until_reload() {
        let mut plugin = plugin();
        plugin.disable();
        let lines = run(&mut plugin, &ConsoleSender, "/inspect server");
        assert_eq!(lines, vec!["Error: debug plugin is disabled"]);
        assert_eq!(run(&mut plugin, &ConsoleSender, "/reload"), vec!["Reloaded"]);
        let lines = run(&mut plugin, &ConsoleSender, "/inspect server");
        assert_eq!(lines[0], "mdinspect (2 worlds, 2/20 players)");
    }
}
