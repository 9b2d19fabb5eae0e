mod api;
mod cli;
mod settings;
mod tui;

use anyhow::Result;
use clap::Parser; // needed for Cli::parse()
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::commands::{open_repo, run_cli};
use cli::opts::{Cli, Command};
use tui::app::TuiApp;

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(matches!(args.cmd, Command::Tui));

    let mut cfg = settings::load_config(args.config.as_deref())?;
    if let Some(store) = args.store {
        cfg.store = store;
    }
    if let Some(p) = args.db_path.clone() {
        cfg.db_path = Some(p);
    }

    match &args.cmd {
        // Run TUI on its own thread/runtime (no nested Tokio)
        Command::Tui => {
            let rt = Arc::new(Runtime::new()?);
            let repo = rt.block_on(open_repo(&cfg))?;
            let mut app = TuiApp::new(repo, cfg.scheduler(), rt);
            app.run()
        }
        // Everything else uses a single runtime here
        _ => {
            let rt = Runtime::new()?;
            rt.block_on(run_cli(args, cfg))
        }
    }
}

/// Logs go to stderr so command output on stdout stays pipeable. The TUI
/// owns the terminal, so it only gets warnings unless RUST_LOG says otherwise.
fn init_tracing(quiet: bool) {
    let default = if quiet {
        "warn"
    } else {
        "jyutcard=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
