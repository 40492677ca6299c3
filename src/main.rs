use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod batch;
mod config;
mod error;
mod io;
mod nodes;
mod paste;
mod render;
mod split;
mod sync;
mod table;
mod tana;
mod util;
use crate::render as render_mod;
use anyhow::Context as _;
use error::SyncError;
use sync::Pacer as _;
use std::time::Duration;

/// Stand-in remote id used when estimating without creating a schema.
const PLACEHOLDER_ID: &str = "xxxxxxxxxxxx";

#[derive(Parser, Debug, Clone)]
#[command(name = "csv2tana", version, about = "Convert CSV files to Tana Paste or upload them to Tana", long_about = None)]
struct Cli {
    /// Active profile name
    #[arg(short = 'p', long = "profile", global = true)]
    profile: Option<String>,

    /// Output JSON instead of human-readable text
    #[arg(long = "json", global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Timeout (seconds) for network requests
    #[arg(long = "timeout", global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Write default settings to the config file
    Init(InitArgs),

    /// Convert a CSV file to Tana Paste text (.txt, or .zip when split)
    Convert(ConvertArgs),

    /// Predict the number of upload requests without sending anything
    Estimate(EstimateArgs),

    /// Create fields and supertag, then upload every row to the Tana inbox
    Sync(SyncArgs),
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// CSV file; the first column becomes the supertag
    #[arg(long)]
    file: PathBuf,
    /// Split multi-item cells on this string (e.g. ",")
    #[arg(long)]
    delimiter: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct InitArgs {
    /// Profile name to create or update (default: "default")
    #[arg(long, default_value = "default")]
    profile: String,
    /// Tana input API endpoint
    #[arg(long)]
    endpoint: Option<String>,
    /// Default delimiter for multi-item cells
    #[arg(long)]
    delimiter: Option<String>,
    /// Milliseconds to wait before each API request (minimum 1000)
    #[arg(long = "request-delay-ms")]
    request_delay_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
struct ConvertArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Maximum characters per output file
    #[arg(long = "max-chars")]
    max_chars: Option<usize>,
    /// Output path without extension
    #[arg(long, default_value = io::DEFAULT_OUTPUT_STEM)]
    output: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct EstimateArgs {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Args, Debug, Clone)]
struct SyncArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Tana API token (defaults to TANA_API_TOKEN)
    #[arg(long)]
    token: Option<String>,
    /// Override the Tana input API endpoint
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(Debug, Clone)]
struct GlobalOpts {
    profile: Option<String>,
    json: bool,
    timeout_secs: Option<u64>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Cli {
        profile,
        json,
        verbose,
        timeout_secs,
        command,
    } = cli;

    init_logging(verbose);

    let globals = GlobalOpts {
        profile,
        json,
        timeout_secs,
    };

    let result = match command {
        Commands::Init(args) => cmd_init(&globals, args),
        Commands::Convert(args) => cmd_convert(&globals, args),
        Commands::Estimate(args) => cmd_estimate(&globals, args),
        Commands::Sync(args) => cmd_sync(&globals, args).await,
    };

    if let Err(e) = result {
        if globals.json {
            let (code, hint) = classify_error(&e);
            let msg = format!("{:#}", e);
            render_mod::print_json_error(&code, &msg, hint.as_deref());
        } else {
            eprintln!("error: {:#}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn classify_error(e: &anyhow::Error) -> (String, Option<String>) {
    if let Some(err) = e.chain().find_map(|c| c.downcast_ref::<SyncError>()) {
        return (err.code().to_string(), err.hint().map(str::to_string));
    }
    let msg = format!("{:#}", e).to_lowercase();
    if msg.contains("file not found") {
        return ("file_not_found".to_string(), Some("check the file path".to_string()));
    }
    if msg.contains("empty input") {
        return ("missing_input".to_string(), None);
    }
    if msg.contains("invalid") {
        return ("invalid_args".to_string(), None);
    }
    if msg.contains("timed out") || msg.contains("timeout") {
        return ("timeout".to_string(), Some("try increasing --timeout or check network".to_string()));
    }
    if msg.contains("network") || msg.contains("dns") || msg.contains("connection refused") {
        return ("network_error".to_string(), None);
    }
    if msg.contains("failed to parse") || msg.contains("parsing csv") {
        return ("parse_error".to_string(), None);
    }
    ("unknown".to_string(), None)
}

fn settings_for(
    globals: &GlobalOpts,
    input: &InputArgs,
    endpoint: Option<&str>,
    max_paste_chars: Option<usize>,
) -> anyhow::Result<config::EffectiveSettings> {
    config::resolve_effective_settings(&config::Overrides {
        profile: globals.profile.as_deref(),
        endpoint,
        delimiter: input.delimiter.as_deref(),
        max_paste_chars,
    })
}

fn cmd_init(_globals: &GlobalOpts, args: InitArgs) -> anyhow::Result<()> {
    use config::{load_config_if_exists, write_config, Profile};

    let path = config::default_config_path()?;
    let mut cfg = load_config_if_exists(&path)?.unwrap_or_default();

    let prof = cfg
        .profiles
        .entry(args.profile.clone())
        .or_insert_with(Profile::default);
    if let Some(e) = args.endpoint { prof.endpoint = Some(e); }
    prof.endpoint.get_or_insert_with(|| tana::DEFAULT_ENDPOINT.to_string());
    if let Some(d) = args.delimiter { prof.delimiter = Some(d); }
    if let Some(ms) = args.request_delay_ms {
        if ms < sync::MIN_REQUEST_INTERVAL.as_millis() as u64 {
            anyhow::bail!("invalid --request-delay-ms: must be at least {}", sync::MIN_REQUEST_INTERVAL.as_millis());
        }
        prof.request_delay_ms = Some(ms);
    }
    prof.max_nodes_per_batch.get_or_insert(batch::DEFAULT_MAX_NODES);
    prof.max_payload_chars.get_or_insert(batch::DEFAULT_MAX_PAYLOAD_CHARS);
    if cfg.default_profile.is_none() { cfg.default_profile = Some(args.profile); }

    write_config(&path, &cfg)?;
    println!("config written: {}", path.display());
    Ok(())
}

fn cmd_convert(globals: &GlobalOpts, args: ConvertArgs) -> anyhow::Result<()> {
    let eff = settings_for(globals, &args.input, None, args.max_chars)?;
    let table = table::read_csv(&args.input.file)?;
    if table.is_empty() {
        anyhow::bail!("empty input: {} has no rows", args.input.file.display());
    }

    let text = paste::format_table(&table, eff.delimiter.as_deref());
    let units = split::split_paste(&text, eff.max_paste_chars);
    let path = io::write_units(&units, &args.output)?;
    log::info!("converted {} row(s) into {} unit(s)", table.len(), units.len());

    if globals.json {
        #[derive(serde::Serialize)]
        struct Out<'a> { path: String, rows: usize, units: usize, chars: usize, delimiter: Option<&'a str> }
        let out = Out {
            path: path.display().to_string(),
            rows: table.len(),
            units: units.len(),
            chars: text.chars().count(),
            delimiter: eff.delimiter.as_deref(),
        };
        render_mod::print_json(&out);
    } else {
        println!("wrote {} row(s) in {} file(s): {}", table.len(), units.len(), path.display());
    }
    Ok(())
}

fn cmd_estimate(globals: &GlobalOpts, args: EstimateArgs) -> anyhow::Result<()> {
    let eff = settings_for(globals, &args.input, None, None)?;
    let table = table::read_csv(&args.input.file)?;

    let fields: nodes::FieldMap = table
        .field_columns()
        .map(|(idx, _)| (idx, PLACEHOLDER_ID.to_string()))
        .collect();
    let api_nodes = nodes::build_nodes(&table, PLACEHOLDER_ID, &fields, eff.delimiter.as_deref());
    let est = batch::estimate_batches(&api_nodes, eff.limits);
    let requests = sync::request_count(&table, &est);
    let pacer = sync::FixedDelay::new(eff.request_delay, eff.schema_delay);
    let schema_steps = requests - est.batches;
    let eta = pacer.estimate(requests, schema_steps);

    if globals.json {
        #[derive(serde::Serialize)]
        struct Out { nodes: usize, batches: usize, oversized: usize, requests: usize, eta_secs: u64 }
        let out = Out { nodes: est.nodes, batches: est.batches, oversized: est.oversized, requests, eta_secs: eta.as_secs() };
        render_mod::print_json(&out);
    } else {
        println!("rows: {}", est.nodes);
        println!("batches: {} (max {} nodes / {} chars each)", est.batches, eff.limits.max_nodes, eff.limits.max_chars);
        if est.oversized > 0 {
            println!("too large to upload: {}", est.oversized);
        }
        println!("requests: {}", requests);
        println!("estimated time: {}", util::format_duration(eta));
    }
    Ok(())
}

async fn cmd_sync(globals: &GlobalOpts, args: SyncArgs) -> anyhow::Result<()> {
    let eff = settings_for(globals, &args.input, args.endpoint.as_deref(), None)?;
    let token = tana::resolve_token(args.token.as_deref())?;
    let table = table::read_csv(&args.input.file)?;
    if table.is_empty() {
        anyhow::bail!("empty input: {} has no rows", args.input.file.display());
    }

    let client = tana::TanaClient::new_with_timeout(
        &eff.endpoint,
        &token,
        Duration::from_secs(globals.timeout_secs.unwrap_or(60)),
    )?;
    let pacer = sync::FixedDelay::new(eff.request_delay, eff.schema_delay);
    let driver = sync::SyncDriver::new(&client, &pacer, eff.limits);
    log::info!("syncing {} row(s) to {}", table.len(), eff.endpoint);

    let json = globals.json;
    let report = driver
        .run(&table, eff.delimiter.as_deref(), &mut |event| render_mod::print_event(event, json))
        .await
        .context("sync aborted")?;

    if json {
        render_mod::print_json(&report);
    } else {
        println!(
            "uploaded {} node(s) in {} batch(es) with supertag {}",
            report.nodes_sent, report.batches_sent, report.supertag_id
        );
        if !report.dropped.is_empty() {
            println!("skipped {} row(s) too large for a single request", report.dropped.len());
        }
    }
    Ok(())
}
