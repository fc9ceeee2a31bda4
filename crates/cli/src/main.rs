use std::{
    io::{self, Write},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use automation_engine::{ConsoleOutput, DispatchOutcome, InteractiveConsole, Session, WELCOME_LINES};
use automation_registry::{CapabilityRegistry, config};
use automation_types::ConfigTree;
use automation_util::expand_tilde;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Browse configured APIs, sync one and call its operations from a line console.
#[derive(Parser, Debug)]
#[command(name = "automation", version, about)]
struct Args {
    /// Configuration document (JSON, or YAML by extension). Defaults to
    /// $AUTOMATION_CONFIG_PATH, then config/apis.json
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the interactive console (default)
    Console,
    /// Run console commands in order and exit
    Run {
        /// One console command per argument, e.g. "select api Example"
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Print the operation catalog of a configured API
    Operations { api: String },
    /// Print the loaded configuration tree as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let Args { config: config_arg, command } = Args::parse();

    let config_path = config_arg.map(|path| expand_tilde(&path)).unwrap_or_else(config::default_config_path);
    let tree = Arc::new(config::load(&config_path));
    let mut registry = CapabilityRegistry::new();
    automation_api::register_builtin_apis(&mut registry);
    debug!(apis = ?registry.api_names(), "registry ready");

    let session = Session::new(Arc::new(registry), Arc::clone(&tree));
    match command.unwrap_or(Command::Console) {
        Command::Console => run_console(session).await,
        Command::Run { commands } => run_script(session, &commands).await,
        Command::Operations { api } => print_operations(&session, &api),
        Command::Config => print_config(&tree, &config_path),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Console sink writing to stdout.
struct StdoutOutput;

impl ConsoleOutput for StdoutOutput {
    fn append_output(&mut self, line: &str) {
        println!("{line}");
    }

    fn clear(&mut self) {
        print!("\x1b[2J\x1b[H");
        let _ = io::stdout().flush();
    }
}

async fn run_console(mut session: Session) -> Result<()> {
    let mut console = InteractiveConsole::new();
    let mut output = StdoutOutput;
    for line in WELCOME_LINES {
        output.append_output(line);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read console input")? else {
                    break;
                };
                // The prompt already shows the command, so dispatch without echoing it.
                let command = line.trim();
                if !command.is_empty() && console.dispatch(command, &mut session, &mut output) == DispatchOutcome::Exit {
                    break;
                }
            }
            completion = console.sync_finished() => {
                println!();
                console.apply_sync(completion, &mut session, &mut output);
            }
        }
        prompt()?;
    }
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush().context("flush prompt")
}

/// Runs the commands in order. A sync is awaited before the next command so
/// later commands see its binding.
async fn run_script(mut session: Session, commands: &[String]) -> Result<()> {
    let mut console = InteractiveConsole::new();
    let mut output = StdoutOutput;
    for command in commands {
        if console.submit(command, &mut session, &mut output) == DispatchOutcome::Exit {
            break;
        }
        if console.syncing().is_some() {
            let completion = console.sync_finished().await;
            console.apply_sync(completion, &mut session, &mut output);
        }
    }
    Ok(())
}

fn print_operations(session: &Session, api: &str) -> Result<()> {
    let operations = session.operation_descriptors_for(api);
    if operations.is_empty() {
        bail!("no operations available for '{api}'");
    }
    for operation in operations {
        match operation.summary {
            Some(summary) => println!("{}\t{}\t{}", operation.display_name, operation.id, summary),
            None => println!("{}\t{}", operation.display_name, operation.id),
        }
    }
    Ok(())
}

fn print_config(tree: &ConfigTree, path: &Path) -> Result<()> {
    if tree.is_empty() {
        warn!(path = %path.display(), "configuration is empty");
    }
    println!("{}", serde_json::to_string_pretty(tree)?);
    Ok(())
}
