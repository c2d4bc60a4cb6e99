//! Binary entrypoint for `guard`: evaluate, inspect, and reload Guardfiles.
use std::{
    io::{self, BufRead},
    path::PathBuf,
    process,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use guardfile::{
    Identity, InteractorSettings, Lifecycle, LoadOptions, LoadState, LogNotifier, Registry,
    ScopeSettings, SearchPaths, TracingUi, describe, summary,
};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*};

/// Runner that logs plugin lifecycle tasks.
mod runner;

use crate::runner::LogRunner;

#[derive(Parser, Debug)]
#[command(
    name = "guard",
    about = "Evaluate Guardfiles and drive plugin reloads",
    version
)]
/// Command-line interface for the `guard` binary.
struct Cli {
    /// Subcommand; defaults to `start`.
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the Guardfile (defaults to ./Guardfile, then ~/.Guardfile)
    #[arg(long, short = 'G', value_name = "PATH")]
    guardfile: Option<PathBuf>,

    /// Only run the given plugin (repeatable)
    #[arg(long = "plugin", short = 'P', value_name = "NAME")]
    plugins: Vec<String>,

    /// Only run plugins in the given group (repeatable)
    #[arg(long = "group", short = 'g', value_name = "NAME")]
    groups: Vec<String>,

    /// Disable notifications
    #[arg(long)]
    no_notify: bool,

    /// Disable the interactive console
    #[arg(long)]
    no_interactions: bool,

    /// Logging controls
    #[command(flatten)]
    log: logging::LogArgs,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Evaluate the Guardfile and exit.
    Check {
        /// Dump the evaluated registry as JSON to stdout
        #[arg(long)]
        dump: bool,
    },
    /// Show groups, plugins, and their options.
    Show,
    /// Load, start plugins, and reload whenever `reload` is read from stdin.
    Start,
}

impl Cli {
    /// Command-line scope from `--plugin` and `--group`.
    fn scope(&self) -> ScopeSettings {
        ScopeSettings {
            plugins: self.plugins.iter().map(Identity::sym).collect(),
            groups: self.groups.iter().map(Identity::sym).collect(),
        }
    }

    /// Load inputs from `--guardfile` and the environment.
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            contents: None,
            guardfile: self.guardfile.clone(),
            search: SearchPaths::from_env(),
        }
    }

    /// A lifecycle controller wired to the default collaborators.
    fn lifecycle(&self) -> Lifecycle {
        let mut registry = Registry::with_scope(self.scope());
        if self.no_interactions {
            registry.set_interactor(InteractorSettings {
                enabled: false,
                ..InteractorSettings::default()
            });
        }
        Lifecycle::new(
            registry,
            Arc::new(TracingUi::new()),
            Box::new(LogNotifier::new(!self.no_notify)),
            Box::new(LogRunner),
            self.load_options(),
        )
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(cli.log.env_filter())
        .with(fmt::layer().without_time())
        .try_init()
        .ok();

    let mut lifecycle = cli.lifecycle();
    if !load(&mut lifecycle) {
        process::exit(1);
    }

    match cli.command.unwrap_or(Command::Start) {
        Command::Check { dump } => {
            if dump {
                match serde_json::to_string_pretty(&summary(lifecycle.registry())) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Failed to serialize Guardfile: {e}");
                        process::exit(1);
                    }
                }
            }
        }
        Command::Show => print!("{}", describe(lifecycle.registry())),
        Command::Start => {
            lifecycle.start();
            run_console(&mut lifecycle);
            lifecycle.stop();
        }
    }
}

/// Load the Guardfile; `false` when the load failed or declared no plugins.
fn load(lifecycle: &mut Lifecycle) -> bool {
    // Failures are already reported through the UI.
    let _ignored = lifecycle.load();
    lifecycle.state() != LoadState::Failed
}

/// Read commands from stdin until EOF or `quit`.
fn run_console(lifecycle: &mut Lifecycle) {
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("stdin: {}", e);
                break;
            }
        };
        match line.trim() {
            "" => {}
            "reload" => {
                // Failures are reported through the UI; keep running with whatever loaded.
                let _ignored = lifecycle.reload();
            }
            "show" => print!("{}", describe(lifecycle.registry())),
            "quit" | "exit" => break,
            other => debug!(command = other, "unknown console command"),
        }
    }
}
