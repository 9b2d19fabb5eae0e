use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Json,
    Sqlite,
    Memory,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "jyutcard", version, about = "Cantonese vocabulary review (CLI/TUI/API)")]
pub struct Cli {
    /// Storage backend (overrides the configured one)
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    /// SQLite DB path when --store sqlite (defaults to app data dir)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Extra config file layered over the defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Card operations
    #[command(subcommand)]
    Card(CardCmd),
    /// Print the cards due for review
    Due(DueCmd),
    /// Review loop
    Review(ReviewCmd),
    /// Totals, due count and proficiency histogram
    Stats,
    /// Export cards
    #[command(subcommand)]
    Export(ExportCmd),
    /// Import cards
    #[command(subcommand)]
    Import(ImportCmd),
    /// Launch Terminal UI
    Tui,
    /// Launch Axum HTTP API
    Api(ApiCmd),
}

#[derive(Debug, Subcommand, Clone)]
pub enum CardCmd {
    Add(CardAdd),
    List {
        /// Substring match on english, cantonese or jyutping
        #[arg(long)]
        query: Option<String>,
        /// Only cards at this proficiency level
        #[arg(long)]
        level: Option<i64>,
    },
    Rm {
        card_id: String,
    },
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    #[arg(long)]
    pub english: String,
    #[arg(long)]
    pub cantonese: String,
    #[arg(long)]
    pub jyutping: String,
    /// Starting proficiency, clamped to 1..=5
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub proficiency: i64,
}

#[derive(Debug, Args, Clone)]
pub struct DueCmd {
    /// Reference instant (RFC 3339), defaults to now
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ReviewCmd {
    /// Stop after this many reviews
    #[arg(long, default_value_t = 50)]
    pub max: usize,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ExportCmd {
    Json { path: PathBuf },
    Csv { path: PathBuf },
}

#[derive(Debug, Subcommand, Clone)]
pub enum ImportCmd {
    Json { path: PathBuf },
    Csv { path: PathBuf },
}

#[derive(Debug, Args, Clone)]
pub struct ApiCmd {
    /// Bind address (host:port), overrides api.addr
    #[arg(long)]
    pub addr: Option<String>,
}
