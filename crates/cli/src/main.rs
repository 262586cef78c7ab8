use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nexus_library::{Library, LibraryConfig, ListingOrder, PrimarySource, RebuildPolicy};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

mod convert;
mod doctor;
mod http_api;

use http_api::HttpState;

const DEFAULT_PORT: &str = "3000";

#[derive(Parser)]
#[command(name = "narrative-nexus")]
#[command(about = "Discover and serve precomputed book analysis artifacts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Library root (overrides NEXUS_LIBRARY_PATH and the config file)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data source required for an entry to be listed (metadata|dashboard|either)
    #[arg(long, global = true)]
    primary: Option<PrimarySource>,

    /// Catalog rebuild policy (on-request|on-every-listing)
    #[arg(long, global = true)]
    rebuild: Option<RebuildPolicy>,

    /// Listing order (scan|alphabetical)
    #[arg(long, global = true)]
    order: Option<ListingOrder>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the library over HTTP
    Serve(ServeArgs),

    /// Build the catalog once and print the listing as JSON
    Scan(ScanArgs),

    /// Resolve one resource and print its payload
    Fetch(FetchArgs),

    /// Combine per-chapter external/internal analysis dumps into chapter files
    ConvertChapters(ConvertArgs),

    /// Check the library root and report what each entry directory contributes
    Doctor(DoctorArgs),

    /// Print the JSON Schema of the HTTP wire types
    Schema,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind (default 0.0.0.0:$PORT, or port 3000)
    #[arg(long)]
    bind: Option<String>,

    /// Do not add permissive CORS headers
    #[arg(long)]
    no_cors: bool,
}

#[derive(Args)]
struct ScanArgs {
    /// Include scan statistics and warnings in the output
    #[arg(long)]
    stats: bool,
}

#[derive(Args)]
struct FetchArgs {
    /// Entry identifier (directory name)
    book: String,

    /// Resource kind: dashboard, graph:<name>, chapter:<name>, or a bare graph name
    kind: String,

    /// Narrow the payload to one chapter
    #[arg(long)]
    chapter: Option<String>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Directory holding Chapter_<n>_external.json / Chapter_<n>_internal.json
    source: PathBuf,

    /// Output directory (default: <source>/chapters)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DoctorArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON output
    let json_output = match &cli.command {
        Commands::Scan(_) | Commands::Fetch(_) | Commands::Schema => true,
        Commands::ConvertChapters(args) => args.json,
        Commands::Doctor(args) => args.json,
        Commands::Serve(_) => false,
    };
    if json_output && !cli.verbose {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Serve(ref args) => {
            let config = library_config(&cli)?;
            serve(args, config).await?;
        }
        Commands::Scan(ref args) => {
            let config = library_config(&cli)?;
            scan(args, config).await?;
        }
        Commands::Fetch(ref args) => {
            let config = library_config(&cli)?;
            fetch(args, config).await?;
        }
        Commands::ConvertChapters(ref args) => {
            let report = convert::convert_chapters(&args.source, args.output.as_deref())?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Converted {} chapter(s) into {}",
                    report.converted.len(),
                    report.output_dir.display()
                );
                for skipped in &report.skipped {
                    println!("Skipped chapter {}: {}", skipped.chapter, skipped.reason);
                }
            }
        }
        Commands::Doctor(ref args) => {
            let config = library_config(&cli)?;
            let report = doctor::run(&config).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", doctor::render(&report));
            }
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&nexus_protocol::api_schema()?)?);
        }
    }

    Ok(())
}

/// Resolve configuration: flags, then environment, then config file, then
/// defaults.
fn library_config(cli: &Cli) -> Result<LibraryConfig> {
    let mut config = match &cli.config {
        Some(path) => LibraryConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LibraryConfig::default(),
    };

    if let Some(root) = cli
        .library
        .clone()
        .or_else(|| env::var_os("NEXUS_LIBRARY_PATH").map(PathBuf::from))
    {
        config.root = root;
    }
    if let Some(primary) = cli.primary {
        config.primary = primary;
    }
    if let Some(rebuild) = cli.rebuild {
        config.rebuild = rebuild;
    }
    if let Some(order) = cli.order {
        config.order = order;
    }

    config.validate()?;
    log::debug!("Library config: {config:?}");
    Ok(config)
}

async fn serve(args: &ServeArgs, config: LibraryConfig) -> Result<()> {
    let bind = args.bind.clone().unwrap_or_else(|| {
        let port = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        format!("0.0.0.0:{port}")
    });
    let environment = env::var("NEXUS_ENV").unwrap_or_else(|_| "development".to_string());

    let library = Library::open(config)
        .await
        .context("Failed to build the library catalog")?;
    let state = Arc::new(HttpState {
        library: Arc::new(library),
        environment: environment.clone(),
    });
    let app = http_api::router(state, !args.no_cors);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    println!("Narrative Nexus API on http://{bind}/api ({environment})");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn scan(args: &ScanArgs, config: LibraryConfig) -> Result<()> {
    let order = config.order;
    let library = Library::new(config);
    let stats = library.rebuild().await?;
    let books = library.list_entries_ordered(order).await;

    let output = if args.stats {
        json!({ "books": books, "stats": stats })
    } else {
        serde_json::to_value(&books)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn fetch(args: &FetchArgs, config: LibraryConfig) -> Result<()> {
    let library = Library::open(config).await?;
    let payload = library
        .fetch_resource(&args.book, &args.kind, args.chapter.as_deref())
        .await?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
