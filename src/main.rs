use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, trace};

use matchdoc::builders::fixtures::FixtureRow;
use matchdoc::cache::{ArtifactCache, CommandSource, DatasetSource, DirectorySource, FileBackend};
use matchdoc::config::{load_pages, load_settings, Settings};
use matchdoc::host::LocalHost;
use matchdoc::pipeline::TemplateSource;
use matchdoc::{Field, MatchHeader, ParameterSet, ReportError, ReportGenerator, ReportRequest};

/// Assemble match reports from page templates and cached datasets
#[derive(Parser)]
#[command(name = "matchdoc")]
#[command(about = "Match report assembly - templates in, one PDF out", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the settings file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ParamArgs {
    /// Analysing team
    #[arg(long)]
    team: String,

    /// Upcoming opponent
    #[arg(long)]
    rival: String,

    #[arg(long)]
    competition: String,

    /// Venue from the rival's perspective (home or away)
    #[arg(long)]
    field: String,

    /// Season label, e.g. 2025-2026
    #[arg(long)]
    season: String,

    /// Number of recent matches the statistics cover
    #[arg(long)]
    sample_size: u32,
}

impl ParamArgs {
    fn to_params(&self) -> anyhow::Result<ParameterSet> {
        let field: Field = self.field.parse()?;
        Ok(ParameterSet::new(
            &self.team,
            &self.rival,
            &self.competition,
            field,
            &self.season,
            self.sample_size,
        )?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the merged report PDF
    Generate {
        #[command(flatten)]
        params: ParamArgs,

        /// Template archive (.zip) or directory
        #[arg(long)]
        templates: PathBuf,

        /// Page configuration (YAML or JSON)
        #[arg(long)]
        pages: PathBuf,

        /// Output PDF path
        #[arg(short, long, default_value = "report.pdf")]
        out: PathBuf,

        /// Directory holding precomputed datasets, used instead of the data command
        #[arg(long)]
        data_dir: Option<PathBuf>,

        #[arg(long)]
        matchday: Option<u32>,

        /// Short rival code shown in the header, e.g. CHA
        #[arg(long)]
        rival_code: Option<String>,

        /// Match date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Kick-off time (HH:MM)
        #[arg(long)]
        time: Option<String>,

        /// Stadium name
        #[arg(long)]
        venue: Option<String>,

        /// Literal header line; overrides --matchday and friends
        #[arg(long)]
        header: Option<String>,

        /// Literal long header line
        #[arg(long)]
        header_full: Option<String>,

        /// Chronological index of the upcoming fixture in the season
        #[arg(long)]
        fixture_index: Option<u32>,

        /// JSON file with the rival's recent fixtures, newest first
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Rival badge image
        #[arg(long)]
        rival_badge: Option<PathBuf>,

        /// Analysing team badge image
        #[arg(long)]
        base_badge: Option<PathBuf>,
    },
    /// Print the fingerprint and cache namespace of a parameter set
    Fingerprint {
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Inspect or prune the dataset cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Check a page configuration without rendering anything
    ValidatePages {
        /// Page configuration (YAML or JSON)
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// List cached entries
    List,
    /// Remove entries the eviction policy no longer admits
    Prune,
    /// Remove the entry of one namespace
    Remove {
        namespace: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref()).await;

    // -v wins over the configured level
    let log_level = match cli.verbose {
        0 => settings
            .as_ref()
            .ok()
            .and_then(|s| s.log_level.clone())
            .unwrap_or_else(|| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_line_number(cli.verbose >= 3)
        .with_writer(std::io::stderr)
        .init();

    debug!("matchdoc started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = run(cli, settings).await;

    if let Err(e) = result {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<ReportError>()
            .map(ReportError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli, settings: matchdoc::Result<Settings>) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            params,
            templates,
            pages,
            out,
            data_dir,
            matchday,
            rival_code,
            date,
            time,
            venue,
            header,
            header_full,
            fixture_index,
            fixtures,
            rival_badge,
            base_badge,
        } => {
            let settings = settings?;
            let params = params.to_params()?;
            let mut request = ReportRequest::new(params, TemplateSource::from_path(templates));

            request = match (header, matchday) {
                (Some(header), _) => request.with_headers(header, header_full.unwrap_or_default()),
                (None, Some(matchday)) => request.with_match_header(&MatchHeader {
                    matchday,
                    rival_code: rival_code.unwrap_or_default(),
                    date: date.unwrap_or_default(),
                    time: time.unwrap_or_default(),
                    venue: venue.unwrap_or_default(),
                }),
                (None, None) => request.with_headers(String::new(), header_full.unwrap_or_default()),
            };
            request.fixture_index = fixture_index;
            if let Some(path) = fixtures {
                request.fixtures = read_fixtures(&path).await?;
            }
            request.rival_badge = read_optional(rival_badge.as_deref()).await?;
            request.base_badge = read_optional(base_badge.as_deref()).await?;

            run_generate(&settings, request, &pages, data_dir, &out).await
        }
        Commands::Fingerprint { params } => {
            let params = params.to_params()?;
            println!("{}", params.fingerprint());
            println!("{}", params.namespace());
            Ok(())
        }
        Commands::Cache { command } => {
            let settings = settings?;
            run_cache_command(&settings, command).await
        }
        Commands::ValidatePages { path } => {
            let pages = load_pages(&path).await?;
            let warnings = pages.warnings();
            for warning in &warnings {
                println!("warning: {}", warning);
            }
            println!(
                "{} pages, {} warnings",
                pages.pages.len(),
                warnings.len()
            );
            Ok(())
        }
    }
}

async fn run_generate(
    settings: &Settings,
    request: ReportRequest,
    pages: &Path,
    data_dir: Option<PathBuf>,
    out: &Path,
) -> anyhow::Result<()> {
    let pages = load_pages(pages).await?;
    let cache = open_cache(settings, data_dir).await?;

    let entry = cache.resolve(&request.params).await?;
    info!(
        "Using datasets {} ({})",
        entry.namespace(),
        entry.fingerprint().short(12)
    );

    let generator = ReportGenerator::with_settings(Arc::new(LocalHost::new()), pages, settings);
    let report = generator.generate(&request, &entry.artifacts).await?;

    tokio::fs::write(out, &report.pdf)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("Wrote {} pages to {}", report.pages.len(), out.display());
    for template in &report.missing_templates {
        println!("missing template: {}", template);
    }
    for page in &report.failed_pages {
        println!("failed page: {}", page);
    }
    Ok(())
}

async fn open_cache(settings: &Settings, data_dir: Option<PathBuf>) -> anyhow::Result<ArtifactCache> {
    let source: Arc<dyn DatasetSource> = match (data_dir, settings.data_command.as_deref()) {
        (Some(dir), _) => Arc::new(DirectorySource::new(dir)),
        (None, Some(line)) => Arc::new(
            CommandSource::from_command_line(line)
                .ok_or_else(|| anyhow!("data_command is empty"))?,
        ),
        (None, None) => {
            return Err(ReportError::config(
                "no dataset source: pass --data-dir or set data_command",
            )
            .into())
        }
    };

    let backend = FileBackend::new(settings.cache_dir.clone())
        .await
        .map_err(ReportError::from)?;
    Ok(ArtifactCache::new(Arc::new(backend), source)
        .with_eviction(settings.eviction.clone())
        .with_source_retry(settings.source_retry.clone()))
}

async fn run_cache_command(settings: &Settings, command: CacheCommands) -> anyhow::Result<()> {
    let backend = FileBackend::new(settings.cache_dir.clone())
        .await
        .map_err(ReportError::from)?;
    // Listing and pruning never compute datasets
    let source = Arc::new(DirectorySource::new(settings.cache_dir.clone()));
    let cache = ArtifactCache::new(Arc::new(backend), source).with_eviction(settings.eviction.clone());

    match command {
        CacheCommands::List => {
            let entries = cache.list().await?;
            if entries.is_empty() {
                println!("No cached entries in {}", settings.cache_dir.display());
            }
            for entry in entries {
                println!(
                    "{}  {}  {}",
                    entry.namespace,
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.parameters
                );
            }
        }
        CacheCommands::Prune => {
            let removed = cache.prune().await?;
            println!("Removed {} entries", removed.len());
        }
        CacheCommands::Remove { namespace } => {
            if cache.remove(&namespace).await? {
                println!("Removed {}", namespace);
            } else {
                println!("No entry named {}", namespace);
            }
        }
    }
    Ok(())
}

async fn read_fixtures(path: &Path) -> anyhow::Result<Vec<FixtureRow>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read fixtures from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid fixtures file {}", path.display()))
}

async fn read_optional(path: Option<&Path>) -> anyhow::Result<Option<Vec<u8>>> {
    match path {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Some(bytes))
        }
        None => Ok(None),
    }
}
