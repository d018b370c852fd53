use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subsro::types::DEFAULT_BASE_URL;
use subsro::{
    ArchiveExtractor, ContentType, MatchContext, SearchRequest, Subsro, SubsroError,
    SubsroOptions, SubsroResult,
};

#[derive(Parser)]
#[command(name = "subsro")]
#[command(version, about = "Search and download Romanian subtitles from subs.ro")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// subs.ro API key
    #[arg(long, env = "SUBSRO_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    timeout: u64,

    /// Custom User-Agent string
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Proxy URL (http://proxy:port)
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Search the catalog for subtitles
    Search(SearchArgs),
    /// Download a subtitle by the identifier printed by `search`
    Fetch(FetchArgs),
    /// Pick a subtitle out of a local ZIP or RAR archive
    Extract(ExtractArgs),
    /// Show the download quota of the API key
    Quota,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Movie or series title
    #[arg(value_name = "TITLE")]
    title: Option<String>,

    /// IMDb id (e.g. tt0133093)
    #[arg(long)]
    imdb: Option<String>,

    /// TMDb id
    #[arg(long)]
    tmdb: Option<String>,

    /// Language code (e.g. ro, en, rum)
    #[arg(short, long, default_value = "ro")]
    language: String,

    /// Season number; together with --episode searches for an episode
    #[arg(short, long)]
    season: Option<u32>,

    /// Episode number
    #[arg(short, long)]
    episode: Option<u32>,

    /// Path of the media file, used to pick the right file from archives
    #[arg(short, long)]
    media_path: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct FetchArgs {
    /// Subtitle identifier (subsro-{id}-{lang}[-locator])
    #[arg(value_name = "ID")]
    identifier: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Archive file
    #[arg(value_name = "ARCHIVE")]
    archive: PathBuf,

    /// Episode number to select
    #[arg(short, long, conflicts_with = "media_file")]
    episode: Option<u32>,

    /// Media file name to select against
    #[arg(short, long)]
    media_file: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output file path (default: the subtitle's own file name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output directory (default: current directory)
    #[arg(short = 'D', long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite existing files
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(&cli).await {
        match e.downcast_ref::<SubsroError>() {
            Some(error) => handle_error(error),
            None => eprintln!("❌ Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    if cancels_on_interrupt(&cli.command) {
        spawn_interrupt_handler(cancel.clone());
    }

    match &cli.command {
        Command::Search(args) => search(cli, args).await,
        Command::Fetch(args) => fetch(cli, args, &cancel).await,
        Command::Extract(args) => extract(args, &cancel).await,
        Command::Quota => quota(cli).await,
    }
}

/// Commands that observe the cancellation token. The others keep the default
/// Ctrl-C behaviour, which ends the process.
fn cancels_on_interrupt(command: &Command) -> bool {
    matches!(command, Command::Fetch(_) | Command::Extract(_))
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "subsro_cli=debug,subsro=debug".into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "subsro_cli=info,subsro=info".into())
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();
}

/// Cancel in-flight work on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
}

/// Build SubsroOptions from CLI arguments
fn build_options(cli: &Cli) -> SubsroOptions {
    let mut options = SubsroOptions::new()
        .base_url(&cli.base_url)
        .timeout(cli.timeout);

    if let Some(api_key) = &cli.api_key {
        options = options.api_key(api_key);
    }

    if let Some(user_agent) = &cli.user_agent {
        options = options.user_agent(user_agent);
    }

    if let Some(proxy) = &cli.proxy {
        options = options.proxy(proxy);
    }

    options
}

fn build_request(args: &SearchArgs) -> SearchRequest {
    let title = args.title.clone().unwrap_or_default();

    let mut request = match (args.season, args.episode) {
        (Some(season), Some(episode)) => {
            SearchRequest::episode(title, season, episode, args.language.as_str())
        }
        (Some(season), None) => SearchRequest {
            media_name: title.clone(),
            content_type: Some(ContentType::Episode),
            language: args.language.clone(),
            series_name: Some(title),
            season: Some(season),
            ..Default::default()
        },
        _ => SearchRequest::movie(title, args.language.as_str()),
    };

    if let Some(imdb) = &args.imdb {
        request = request.with_imdb_id(imdb);
    }
    if let Some(tmdb) = &args.tmdb {
        request = request.with_tmdb_id(tmdb);
    }
    if let Some(media_path) = &args.media_path {
        request = request.with_media_path(media_path);
    }

    request
}

/// Search the catalog and print the hits
async fn search(cli: &Cli, args: &SearchArgs) -> anyhow::Result<()> {
    if args.title.is_none() && args.imdb.is_none() && args.tmdb.is_none() {
        bail!("Provide a title, --imdb or --tmdb");
    }

    let provider = Subsro::new(build_options(cli))?;
    let results = provider.search(&build_request(args)).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No subtitles found.");
        return Ok(());
    }

    println!(
        "{:<40} {:<6} {:<40} {:<10}",
        "ID", "Lang", "Name", "Created"
    );
    println!("{}", "─".repeat(100));

    for result in &results {
        println!(
            "{:<40} {:<6} {:<40} {:<10}",
            truncate(&result.id, 40),
            result.language,
            truncate(&result.display_name, 40),
            result.created_at.as_deref().unwrap_or("-")
        );
    }

    info!("Found {} subtitles", results.len());
    Ok(())
}

/// Download the subtitle behind an identifier
async fn fetch(cli: &Cli, args: &FetchArgs, cancel: &CancellationToken) -> anyhow::Result<()> {
    let provider = Subsro::new(build_options(cli))?;

    let Some(download) = provider.fetch(&args.identifier, cancel).await? else {
        bail!("No subtitle found for {}", args.identifier);
    };

    let output_path = determine_output_path(&args.output, &download.file_name);
    write_subtitle_file(&output_path, &download.content, args.output.force).await?;

    println!(
        "Saved {} subtitle ({}) to: {}",
        download.format,
        download.language,
        output_path.display()
    );
    info!("Wrote {} bytes", download.content.len());
    Ok(())
}

fn match_context(args: &ExtractArgs) -> Option<MatchContext> {
    match (args.episode, &args.media_file) {
        (Some(episode_number), _) => Some(MatchContext::Episode { episode_number }),
        (None, Some(media_file)) => Some(MatchContext::Movie {
            media_file_name: media_file.clone(),
        }),
        (None, None) => None,
    }
}

/// Select a subtitle out of a local archive
async fn extract(args: &ExtractArgs, cancel: &CancellationToken) -> anyhow::Result<()> {
    let bytes = fs::read(&args.archive)
        .await
        .with_context(|| format!("Failed to read {}", args.archive.display()))?;
    debug!("Read {} bytes from {}", bytes.len(), args.archive.display());

    let context = match_context(args);
    let token = cancel.clone();
    let file = tokio::task::spawn_blocking(move || {
        ArchiveExtractor::new().extract(&bytes, context.as_ref(), &token)
    })
    .await
    .context("Extraction task failed")??;

    let Some(file) = file else {
        bail!("No matching subtitle in {}", args.archive.display());
    };

    let output_path = determine_output_path(&args.output, &file.file_name);
    write_subtitle_file(&output_path, &file.content, args.output.force).await?;

    println!(
        "Extracted {} to: {}",
        file.file_name,
        output_path.display()
    );
    Ok(())
}

/// Show the quota of the configured API key
async fn quota(cli: &Cli) -> anyhow::Result<()> {
    let provider = Subsro::new(build_options(cli))?;
    let quota = provider.quota().await?;

    println!("Quota type: {}", quota.quota_type.as_deref().unwrap_or("-"));
    println!("Total:      {}", quota.total_quota);
    println!("Used:       {}", quota.used_quota);
    println!("Remaining:  {}", quota.remaining_quota);
    Ok(())
}

/// Determine the output file path
fn determine_output_path(output: &OutputArgs, file_name: &str) -> PathBuf {
    if let Some(path) = &output.output {
        return path.clone();
    }

    // Archive entries may carry directories; never write outside the target dir
    let file_name = Path::new(file_name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("subtitle.srt"));

    match &output.output_dir {
        Some(dir) => dir.join(file_name),
        None => file_name,
    }
}

/// Write subtitle content to file
async fn write_subtitle_file(path: &Path, content: &[u8], force: bool) -> SubsroResult<()> {
    if path.exists() && !force {
        return Err(SubsroError::FileSystem {
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!(
                    "File already exists: {}. Use --force to overwrite.",
                    path.display()
                ),
            ),
        });
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).await?;
    }

    fs::write(path, content).await?;

    debug!("Written {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Handle provider errors with user-friendly messages
fn handle_error(error: &SubsroError) {
    match error {
        SubsroError::Configuration { message } => {
            eprintln!("❌ Configuration error: {}", message);
            eprintln!("   Set SUBSRO_API_KEY or pass --api-key.");
        }
        SubsroError::Unauthorized => {
            eprintln!("❌ The API key was rejected");
            eprintln!("   Check the key in your subs.ro account settings.");
        }
        SubsroError::RateLimited => {
            eprintln!("❌ Rate limited by subs.ro");
            eprintln!("   Your download quota may be exhausted. Run `subsro quota`.");
        }
        SubsroError::NotFound { id } => {
            eprintln!("❌ Subtitle not found: {}", id);
        }
        SubsroError::InvalidIdentifier { identifier } => {
            eprintln!("❌ Invalid subtitle identifier: {}", identifier);
            eprintln!("   Use an id printed by `subsro search`.");
        }
        SubsroError::Cancelled => {
            eprintln!("❌ Cancelled");
        }
        SubsroError::Network { source } => {
            eprintln!("❌ Network error: {}", source);
            eprintln!("   Check your internet connection and try again.");
        }
        _ => {
            eprintln!("❌ Error: {}", error);
        }
    }
}

/// Truncate string to specified length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
