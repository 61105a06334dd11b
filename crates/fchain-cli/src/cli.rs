use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fchain",
    about = "fchain: append-only, hash-linked file ingestion ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file; environment and flags override it
    #[arg(short, long, global = true, env = "FCHAIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding uploaded files (and chain.json by default)
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,

    /// Chain file path
    #[arg(long, global = true)]
    pub chain_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP ingestion server
    Serve(ServeArgs),
    /// Verify chain file integrity
    Verify(VerifyArgs),
    /// Show recorded blocks
    Log(LogArgs),
    /// Ingest a local file (do not run against a chain a live server owns)
    Ingest(IngestArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct LogArgs {
    /// Show only the most recent N blocks
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct IngestArgs {
    pub path: PathBuf,
    /// Name to record instead of the file's own name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub external_ref: Option<String>,
}
