use anyhow::{bail, Context};
use colored::Colorize;
use fchain_ingest::{Block, IngestService, ValidationReport};
use fchain_ledger::{ChainPersistence, ChainValidator, JsonChainFile};
use fchain_server::{FchainServer, ServerConfig};
use tracing::{debug, info, warn};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Verify(_) => cmd_verify(&config, cli.format),
        Command::Log(args) => cmd_log(&config, &args, cli.format),
        Command::Ingest(args) => cmd_ingest(&config, args, cli.format).await,
    }
}

/// Defaults, then the config file, then environment, then global flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    config.apply_env()?;
    if let Some(dir) = &cli.storage_dir {
        config.storage_dir = dir.clone();
    }
    if let Some(file) = &cli.chain_file {
        config.chain_file = Some(file.clone());
    }
    Ok(config)
}

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(max) = args.max_upload_bytes {
        config.max_upload_bytes = max;
    }
    if let Some(secs) = args.request_timeout_secs {
        config.request_timeout_secs = secs;
    }
    FchainServer::new(config).serve().await?;
    Ok(())
}

fn load_chain(config: &ServerConfig) -> anyhow::Result<Vec<Block>> {
    let file = JsonChainFile::new(config.chain_path());
    debug!(chain = %file.location(), "loading chain file");
    file.load()
        .with_context(|| format!("reading chain file {}", file.location()))
}

fn cmd_verify(config: &ServerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let blocks = load_chain(config)?;
    let report = ChainValidator::validate(&blocks);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    if !report.is_valid() {
        warn!(violations = report.violations.len(), "chain verification failed");
        bail!("chain verification failed: {} violation(s)", report.violations.len());
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    let head = report
        .head
        .map(|h| h.short_hex())
        .unwrap_or_else(|| "(empty)".into());
    if report.is_valid() {
        println!(
            "{} Chain intact: {} blocks, head {}",
            "✓".green().bold(),
            report.block_count.to_string().bold(),
            head.yellow()
        );
        return;
    }
    println!(
        "{} Chain damaged: {} blocks, {} violation(s)",
        "✗".red().bold(),
        report.block_count.to_string().bold(),
        report.violations.len().to_string().red()
    );
    for v in &report.violations {
        println!("  {} {}", format!("#{}", v.index).yellow(), v.description);
    }
}

fn cmd_log(config: &ServerConfig, args: &LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let blocks = load_chain(config)?;
    let skip = args
        .limit
        .map(|n| blocks.len().saturating_sub(n))
        .unwrap_or(0);
    let shown = &blocks[skip..];

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }
    if shown.is_empty() {
        println!("Chain is empty.");
        return Ok(());
    }

    for block in shown.iter().rev() {
        if args.oneline {
            println!(
                "{} {} {}",
                format!("#{}", block.index).yellow(),
                block.hash.short_hex().dimmed(),
                block.file_name
            );
            continue;
        }
        println!(
            "{}  {}",
            format!("#{}", block.index).yellow().bold(),
            block.hash.to_string().dimmed()
        );
        println!("  File:    {}", block.file_name.bold());
        println!("  Time:    {}", block.timestamp.to_rfc3339());
        println!("  Digest:  {}", block.file_digest.to_string().cyan());
        println!("  Stored:  {}", block.storage_path);
        if let Some(external) = &block.external_ref {
            println!("  Ref:     {}", external.blue());
        }
        println!();
    }
    Ok(())
}

async fn cmd_ingest(
    config: &ServerConfig,
    args: IngestArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => args
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", args.path.display()))?,
    };
    let file = tokio::fs::File::open(&args.path)
        .await
        .with_context(|| format!("opening {}", args.path.display()))?;

    let service = IngestService::open(config.ingest_config())?;
    let block = service.handle_upload(&name, file, args.external_ref).await?;
    info!(index = block.index, source = %args.path.display(), "file ingested");

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&block)?),
        OutputFormat::Text => {
            println!(
                "{} Ingested {} as block {}",
                "✓".green().bold(),
                block.file_name.bold(),
                format!("#{}", block.index).yellow()
            );
            println!("  Hash:   {}", block.hash.to_string().dimmed());
            println!("  Digest: {}", block.file_digest.to_string().cyan());
        }
    }
    Ok(())
}
