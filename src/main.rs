use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zipfolio::ai::ConsentGate;
use zipfolio::config::ConfigLoader;
use zipfolio::gitx::SubprocessGit;
use zipfolio::store::Repository;
use zipfolio::{
    CancellationToken, Config, ContentStore, Database, IngestEngine, OpenAiProvider, Pipeline,
    SqliteRepository,
};

#[derive(Parser)]
#[command(name = "zipfolio")]
#[command(
    version,
    about = "Turn archives of your coding work into an analysed, ranked portfolio"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, help = "Path to a config file (overrides discovery)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Enable debug logging")]
    verbose: bool,

    #[arg(long, short, help = "Errors only")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a ZIP archive of coding work
    Ingest {
        /// Path to the archive
        archive: PathBuf,
        /// Append a discovered project to an existing one: name=project_id
        #[arg(long = "map", value_parser = parse_mapping)]
        mappings: Vec<(String, i64)>,
    },

    /// Analyse ingested projects (all of them, or a selection)
    Analyze {
        /// Specific project ids; analyses every project when omitted
        #[arg(long)]
        project: Vec<i64>,
        /// Re-analyse even when the fingerprint is unchanged
        #[arg(long)]
        force: bool,
        /// Worker pool size for the batch
        #[arg(long, short, default_value = "1")]
        jobs: usize,
    },

    /// Generate resume bullets for a project
    Bullets {
        project_id: i64,
        #[arg(long, default_value = "6")]
        max: usize,
        /// Skip the LLM even when consented and configured
        #[arg(long = "no-ai")]
        no_ai: bool,
    },

    /// List projects with ranks and scores
    Projects {
        #[arg(long, short, default_value = "text", help = "Output: text, json")]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the merged effective configuration
    Show {
        #[arg(long, short, default_value = "toml", help = "Output: toml, json")]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize the global config instead")]
        global: bool,
        #[arg(long, help = "Overwrite an existing config")]
        force: bool,
    },
}

fn parse_mapping(raw: &str) -> Result<(String, i64), String> {
    let (name, id) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=project_id, got '{}'", raw))?;
    let id: i64 = id
        .parse()
        .map_err(|_| format!("'{}' is not a project id", id))?;
    Ok((name.to_string(), id))
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    match cli.command {
        // Config management never touches the store or database.
        Commands::Config { action } => handle_config(action, &config),
        command => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(dispatch(command, config))
        }
    }
}

fn handle_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show { format } => {
            println!("{}", ConfigLoader::render(config, format == "json")?);
        }
        ConfigAction::Path => {
            ConfigLoader::show_paths();
        }
        ConfigAction::Init { global, force } => {
            let path = if global {
                ConfigLoader::init_global(force)?
            } else {
                ConfigLoader::init_project(force)?
            };
            println!("Initialized configuration: {}", path.display());
        }
    }
    Ok(())
}

async fn dispatch(command: Commands, config: Config) -> anyhow::Result<()> {
    let store = Arc::new(ContentStore::new(&config.storage.objects_dir)?);
    let database = Arc::new(Database::open(&config.storage.database_path)?);
    let repository = Arc::new(SqliteRepository::new(database));

    match command {
        Commands::Ingest { archive, mappings } => {
            let gate = ConsentGate::load(repository.as_ref(), false)?;
            let engine = IngestEngine::new(
                &store,
                repository.as_ref(),
                config.ingest.max_archive_bytes,
            );
            let mapping: HashMap<String, i64> = mappings.into_iter().collect();
            let report = engine.ingest(&archive, &mapping, gate.ignore_patterns())?;

            for (id, name) in &report.created {
                println!("Created project {} ({})", name, id);
            }
            for (id, count) in &report.appended {
                println!("Appended {} changed file(s) to project {}", count, id);
            }
        }
        Commands::Analyze {
            project,
            force,
            jobs,
        } => {
            let mut config = config;
            config.analysis.worker_pool = jobs.max(1);
            let pipeline = build_pipeline(store, repository.clone(), config)?;

            let ids = if project.is_empty() {
                repository.list_projects()?.iter().map(|p| p.id).collect()
            } else {
                project
            };
            let token = CancellationToken::new();
            let analyses = pipeline.analyse_batch(&ids, force, &token).await?;
            for analysis in &analyses {
                println!(
                    "{}: {} / {} (score {:.1}, role {})",
                    analysis.project_path,
                    analysis.language.as_deref().unwrap_or("unknown"),
                    analysis.framework.as_deref().unwrap_or("-"),
                    analysis.score,
                    analysis.role
                );
            }
        }
        Commands::Bullets {
            project_id,
            max,
            no_ai,
        } => {
            let pipeline = build_pipeline(store, repository, config)?;
            let token = CancellationToken::new();
            let analysis = pipeline
                .generate_bullets(project_id, max, !no_ai, &token)
                .await?;
            println!("Source: {}", analysis.resume_bullet_source.as_str());
            for bullet in &analysis.resume_bullets {
                println!("- {}", bullet);
            }
        }
        Commands::Projects { format } => {
            let projects = repository.list_projects()?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else {
                for project in projects {
                    println!(
                        "#{:<3} {:<24} {:<12} score {:>6}  {}",
                        project
                            .importance_rank
                            .map(|r| r.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        project.name,
                        project.language.as_deref().unwrap_or("unknown"),
                        project
                            .importance_score
                            .map(|s| format!("{:.1}", s))
                            .unwrap_or_else(|| "-".to_string()),
                        project.role
                    );
                }
            }
        }
        Commands::Config { .. } => unreachable!("handled before dispatch"),
    }

    Ok(())
}

fn build_pipeline(
    store: Arc<ContentStore>,
    repository: Arc<SqliteRepository>,
    config: Config,
) -> anyhow::Result<Pipeline> {
    let provider = if config.llm.is_configured() {
        match OpenAiProvider::new(&config.llm) {
            Ok(provider) => Some(Arc::new(provider) as zipfolio::ai::SharedProvider),
            Err(e) => {
                tracing::warn!("LLM provider unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    Ok(Pipeline::new(
        store,
        repository,
        Arc::new(SubprocessGit::default()),
        provider,
        config,
    ))
}
