//! mdinspect - reflective command chains over a live game server
//!
//! Console front end: loads a server, enables the debug plugin and runs
//! `/chain`, `/methods` and `/inspect` commands from stdin or a script.

mod command_script;
mod commands;
mod config;
mod plugin;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use command_script::CommandScript;
use commands::{execute_command, parse_command, PlayerSender};
use config::InspectConfig;
use mdinspect_engine::{CommandSender, ConsoleSender};
use mdinspect_world::{Server, ServerSnapshot};
use plugin::DebugPlugin;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Walk method chains over a running game server", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// JSON command script to replay instead of reading stdin
    #[arg(long)]
    script: Option<PathBuf>,
    /// Allow calling internal methods on every class
    #[arg(long)]
    trusted: bool,
    /// Server snapshot (JSON) to load instead of the built-in sample
    #[arg(long)]
    world: Option<PathBuf>,
    /// Act as this online player instead of the console
    #[arg(long)]
    player: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = InspectConfig::load_from_path(&cli.config);
    if cli.trusted {
        config.trusted = true;
    }
    if cli.world.is_some() {
        config.world = cli.world.clone();
    }
    if cli.player.is_some() {
        config.player = cli.player.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    info!("Starting mdinspect v{}", env!("CARGO_PKG_VERSION"));

    let server = match &config.world {
        Some(path) => {
            let snapshot = ServerSnapshot::load(path)?;
            Server::from_snapshot(&snapshot).with_context(|| format!("loading {}", path.display()))?
        }
        None => Server::sample()?,
    };

    let mut plugin = DebugPlugin::new(Rc::clone(&server), config.access_policy());
    plugin.enable();

    let console = sender_for(&server, config.player.as_deref())?;
    match &cli.script {
        Some(path) => run_script(&mut plugin, &config, path)?,
        None => run_repl(&mut plugin, &config, console.as_ref())?,
    }

    plugin.disable();
    Ok(())
}

fn sender_for(server: &Server, player: Option<&str>) -> Result<Box<dyn CommandSender>> {
    match player {
        Some(name) => {
            let player = server
                .player(name)
                .with_context(|| format!("player {name} is not online"))?;
            Ok(Box::new(PlayerSender::new(player)))
        }
        None => Ok(Box::new(ConsoleSender)),
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn run_line(plugin: &mut DebugPlugin, config: &InspectConfig, sender: &dyn CommandSender, line: &str) {
    match parse_command(line) {
        Ok(cmd) => print_lines(&execute_command(plugin, config, sender, cmd).lines),
        Err(err) => println!("Error: {err}"),
    }
}

fn run_script(plugin: &mut DebugPlugin, config: &InspectConfig, path: &std::path::Path) -> Result<()> {
    let script = CommandScript::from_path(path)?;
    info!(steps = script.len(), path = %path.display(), "replaying command script");
    let server = Rc::clone(plugin.server());
    let default = config.player.as_deref();
    for step in script {
        let sender = match sender_for(&server, step.player.as_deref().or(default)) {
            Ok(sender) => sender,
            Err(err) => {
                warn!("skipping {:?}: {err:#}", step.command);
                println!("Error: {err:#}");
                continue;
            }
        };
        println!("{}{}", config.prompt, step.command);
        run_line(plugin, config, sender.as_ref(), &step.command);
    }
    Ok(())
}

fn run_repl(plugin: &mut DebugPlugin, config: &InspectConfig, sender: &dyn CommandSender) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", config.prompt);
        io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit" | "/quit" | "/exit") {
            break;
        }
        run_line(plugin, config, sender, line);
    }
    Ok(())
}
