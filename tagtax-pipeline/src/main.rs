//! tagtax-pipeline - tag taxonomy batch pipeline
//!
//! Every stage is a subcommand; `run` executes a numbered range of them,
//! each in its own process, and exits with the first failing stage's status.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tagtax_common::config::{
    default_config_file_path, write_toml_config, LoggingConfig, RootFolderInitializer,
    RootFolderResolver, TomlConfig,
};
use tagtax_common::expansion::TagExpander;
use tagtax_pipeline::blacklist::apply_candidates;
use tagtax_pipeline::classifier::{Classifier, HttpClassifier};
use tagtax_pipeline::orchestrator::{PipelineOrchestrator, StageRange, SubprocessLauncher};
use tagtax_pipeline::stages::{run_stage, Stage, StageContext};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MODULE_NAME: &str = "tagtax-pipeline";

/// Command-line arguments for tagtax-pipeline
#[derive(Parser, Debug)]
#[command(name = "tagtax-pipeline")]
#[command(about = "Build a genre taxonomy and tag expansion mapping from free-text tags")]
#[command(version)]
struct Cli {
    /// Data root folder holding entity metadata and every ledger
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <config_dir>/tagtax/tagtax-pipeline.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an inclusive range of stages, each as a separate process
    Run {
        /// First stage number (default 1)
        #[arg(long, allow_negative_numbers = true)]
        from: Option<i64>,
        /// Last stage number (default: last stage)
        #[arg(long, allow_negative_numbers = true)]
        to: Option<i64>,
    },
    /// List the numbered stages
    Stages,
    /// 1. Harvest and blacklist-filter tags from entity metadata
    Collect,
    /// 2. Group raw tags into per-tag statistics
    Aggregate,
    /// 3. Split each tag into style / descriptor / invalid parts
    Interpret(LimitArgs),
    /// 4. Merge manual overrides, bucket tags, list blacklist candidates
    Postprocess,
    /// 5. Aggregate style parts into per-style statistics
    HarvestStyles,
    /// 6. Keep, alias or reject each raw style
    Canonicalize(LimitArgs),
    /// 7. Classify each canonical style as genre or subgenre
    ClassifyHierarchy(LimitArgs),
    /// 8. Build taxonomy, genre summary and tag-to-style map
    FinalizeTaxonomy,
    /// 9. Write the final tag expansion mapping
    CompileMapping,
    /// Add every reviewed blacklist candidate to the blacklist file
    ApplyBlacklistCandidates,
    /// Print the expansion terms for a tag
    Expand {
        /// Tag text, normalized before lookup
        tag: String,
    },
    /// Write a default config file
    InitConfig {
        /// Target path (default: <config_dir>/tagtax/tagtax-pipeline.toml)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug)]
struct LimitArgs {
    /// Process at most this many pending units in this run
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TomlConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::load_for_module(MODULE_NAME),
    };
    config.classifier.apply_env_overrides();

    init_tracing(&config.logging)?;

    info!(
        "Starting {} v{} [{}] built {} ({})",
        MODULE_NAME,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Step 1: Resolve root folder
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(cli.root_folder.clone())
        .with_config_file(cli.config.clone())
        .resolve();

    // Step 2: Create root folder directory if missing
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let paths = initializer.ledger_paths(&config.collector);
    let ctx = StageContext::new(paths, config);

    match cli.command {
        Command::Collect => run_single_stage(Stage::Collect, &ctx, None).await,
        Command::Aggregate => run_single_stage(Stage::Aggregate, &ctx, None).await,
        Command::Interpret(args) => run_single_stage(Stage::Interpret, &ctx, args.limit).await,
        Command::Postprocess => run_single_stage(Stage::Postprocess, &ctx, None).await,
        Command::HarvestStyles => run_single_stage(Stage::HarvestStyles, &ctx, None).await,
        Command::Canonicalize(args) => {
            run_single_stage(Stage::Canonicalize, &ctx, args.limit).await
        }
        Command::ClassifyHierarchy(args) => {
            run_single_stage(Stage::ClassifyHierarchy, &ctx, args.limit).await
        }
        Command::FinalizeTaxonomy => run_single_stage(Stage::FinalizeTaxonomy, &ctx, None).await,
        Command::CompileMapping => run_single_stage(Stage::CompileMapping, &ctx, None).await,
        Command::Run { from, to } => {
            let range = match StageRange::new(from, to) {
                Ok(range) => range,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            };

            let launcher = SubprocessLauncher::current_exe()
                .context("Failed to locate the pipeline executable")?
                .with_root_folder(Some(initializer.root_folder().to_path_buf()))
                .with_config(cli.config.clone());
            let outcome = PipelineOrchestrator::new(launcher).run(range).await?;
            Ok(exit_code(outcome.exit_code()))
        }
        Command::Stages => {
            for stage in Stage::ALL {
                let kind = if stage.is_resumable() { "resumable" } else { "rewrite" };
                println!(
                    "{:>2}  {:<20} {:<10} {}",
                    stage.number(),
                    stage.name(),
                    kind,
                    stage.description()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::ApplyBlacklistCandidates => {
            let paths = &ctx.paths;
            let update = apply_candidates(&paths.blacklist(), &paths.blacklist_candidates())
                .context("Failed to apply blacklist candidates")?;
            println!(
                "{} candidates, {} added, {} blacklisted tags total",
                update.candidates, update.added, update.total
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Expand { tag } => {
            let expander = TagExpander::load(&ctx.paths.final_mapping())
                .context("Failed to load the tag mapping; run compile-mapping first")?;
            for term in expander.expand(&tag) {
                println!("{}", term);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::InitConfig { path, force } => {
            let target = match path {
                Some(path) => path,
                None => default_config_file_path(MODULE_NAME)?,
            };
            init_config(&target, force)?;
            println!("Wrote {}", target.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_single_stage(
    stage: Stage,
    ctx: &StageContext,
    limit: Option<usize>,
) -> Result<ExitCode> {
    let classifier = if stage.needs_classifier() {
        let client = HttpClassifier::new(&ctx.config.classifier)
            .context("Failed to create classification service client")?;
        info!("Classification service: {} ({})", client.endpoint(), client.model());
        Some(client)
    } else {
        None
    };

    let report = run_stage(
        stage,
        ctx,
        classifier.as_ref().map(|c| c as &dyn Classifier),
        limit,
    )
    .await
    .with_context(|| format!("Stage {} failed", stage))?;

    println!("{}: {}", stage, report.display_string());
    Ok(ExitCode::SUCCESS)
}

fn init_config(target: &Path, force: bool) -> Result<()> {
    if target.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", target.display());
    }
    write_toml_config(&TomlConfig::default(), target)
        .with_context(|| format!("Failed to write {}", target.display()))
}

/// RUST_LOG wins over the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,tagtax_pipeline={0},tagtax_common={0}",
            logging.level
        ))
    });

    let file_layer = match &logging.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn exit_code(code: i32) -> ExitCode {
    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(u8::try_from(code).unwrap_or(1).max(1))
    }
}
