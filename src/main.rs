//! Command line entry point for the bracket progression engine
//!
//! Validates progression graphs, materializes tournaments from snapshots and
//! runs the post-tournament rating pass, reading and writing JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bracket_progression::config::{validate_config, AppConfig};
use bracket_progression::progression::{validated_brackets, ProgressionError};
use bracket_progression::rating::{
    InMemoryRatingStorage, RatingSnapshot, RatingUpdater, SeedingSkillType, SummaryInput,
};
use bracket_progression::standings::calculate_spr;
use bracket_progression::utils::current_timestamp;
use bracket_progression::{
    FinishedMatch, InputBracket, Standing, TeamId, TournamentEngine, TournamentSnapshot,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info};

/// Bracket Progression - multi-bracket tournament engine
#[derive(Parser)]
#[command(
    name = "bracket-progression",
    version,
    about = "Validate bracket progressions, compute standings and update ratings",
    long_about = "Bracket Progression validates organizer-authored multi-bracket progressions, \
                 derives the teams, seeding and standings of every bracket from a tournament \
                 snapshot, and updates Weng-Lin (OpenSkill) ratings from finished matches."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        global = true,
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        global = true,
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, global = true, help = "Enable debug mode with verbose logging")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate an editable progression and print its parsed form
    Validate {
        /// JSON array of editable brackets
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Build a tournament snapshot and print bracket readiness and standings
    Standings {
        /// JSON tournament snapshot
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// Evaluate as of this time (RFC 3339) instead of now
        #[arg(long, value_name = "TIME")]
        now: Option<DateTime<Utc>>,
    },

    /// Run the rating pass over finished matches and print the summary
    Summarize {
        /// JSON tournament snapshot
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// JSON array of finished matches, oldest first
        #[arg(value_name = "RESULTS")]
        results: PathBuf,

        /// JSON file with current ratings
        #[arg(long, value_name = "FILE")]
        ratings: Option<PathBuf>,

        /// Seed for roster tie-breaks
        #[arg(long, value_name = "N")]
        seed: Option<u64>,

        /// Seeding rating pool this tournament counts for
        #[arg(long, value_enum)]
        seeding_skill: Option<SeedingSkillArg>,

        /// Only produce placement rows
        #[arg(long)]
        no_seasonal_stats: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SeedingSkillArg {
    Ranked,
    Unranked,
}

impl From<SeedingSkillArg> for SeedingSkillType {
    fn from(arg: SeedingSkillArg) -> Self {
        match arg {
            SeedingSkillArg::Ranked => SeedingSkillType::Ranked,
            SeedingSkillArg::Unranked => SeedingSkillType::Unranked,
        }
    }
}

/// Per-bracket view printed by `standings`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BracketReport<'a> {
    idx: usize,
    name: &'a str,
    preview: bool,
    can_be_started: bool,
    is_finals: bool,
    is_underground: bool,
    seeding: &'a [TeamId],
    teams_pending_check_in: &'a [TeamId],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StandingReport {
    #[serde(flatten)]
    standing: Standing,
    seed: Option<u32>,
    spr: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TournamentReport<'a> {
    brackets: Vec<BracketReport<'a>>,
    can_finalize: bool,
    standings: Vec<StandingReport>,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    validate_config(&config)?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn validate(file: &Path) -> Result<bool> {
    let input: Vec<InputBracket> = read_json(file)?;

    match validated_brackets(&input) {
        Ok(parsed) => {
            info!("Progression with {} brackets is valid", parsed.len());
            print_json(&parsed)?;
            Ok(true)
        }
        Err(ProgressionError::Invalid(validation_error)) => {
            error!("Invalid progression: {}", validation_error);
            print_json(&validation_error)?;
            Ok(false)
        }
        Err(e) => {
            error!("Invalid progression: {}", e);
            Ok(false)
        }
    }
}

fn standings(config: &AppConfig, snapshot: &Path, now: Option<DateTime<Utc>>) -> Result<()> {
    let snapshot: TournamentSnapshot = read_json(snapshot)?;
    let now = now.unwrap_or_else(current_timestamp);
    debug!("Evaluating tournament {} as of {}", snapshot.id, now);

    let tournament = TournamentEngine::new(config.tournament.clone()).build(&snapshot, now)?;
    let standings = tournament.standings();

    let report = TournamentReport {
        brackets: tournament
            .brackets
            .iter()
            .map(|bracket| BracketReport {
                idx: bracket.idx,
                name: &bracket.name,
                preview: bracket.preview,
                can_be_started: bracket.can_be_started,
                is_finals: bracket.is_finals,
                is_underground: bracket.is_underground,
                seeding: &bracket.seeding,
                teams_pending_check_in: &bracket.teams_pending_check_in,
            })
            .collect(),
        can_finalize: tournament.can_finalize(),
        standings: standings
            .iter()
            .map(|standing| {
                let seed = tournament
                    .team_by_id(standing.team_id)
                    .and_then(|team| team.seed);
                StandingReport {
                    standing: standing.clone(),
                    seed,
                    spr: seed.map_or(0, |seed| calculate_spr(&standings, standing.team_id, seed)),
                }
            })
            .collect(),
    };

    print_json(&report)
}

struct SummarizeArgs<'a> {
    snapshot: &'a Path,
    results: &'a Path,
    ratings: Option<&'a Path>,
    seed: Option<u64>,
    seeding_skill: Option<SeedingSkillArg>,
    calculate_seasonal_stats: bool,
}

fn summarize(config: &AppConfig, args: SummarizeArgs<'_>) -> Result<()> {
    let snapshot: TournamentSnapshot = read_json(args.snapshot)?;
    let results: Vec<FinishedMatch> = read_json(args.results)?;
    let ratings: RatingSnapshot = match args.ratings {
        Some(path) => read_json(path)?,
        None => RatingSnapshot::default(),
    };

    let tournament =
        TournamentEngine::new(config.tournament.clone()).build(&snapshot, current_timestamp())?;
    let final_standings = tournament.standings();

    let storage = Arc::new(InMemoryRatingStorage::from_snapshot(ratings));
    let mut updater = match args.seed {
        Some(seed) => {
            RatingUpdater::with_rng(config.rating.clone(), storage, StdRng::seed_from_u64(seed))?
        }
        None => RatingUpdater::new(config.rating.clone(), storage)?,
    };

    let summary = updater.summarize(&SummaryInput {
        results: &results,
        teams: &tournament.teams,
        final_standings: &final_standings,
        seeding_skill_counts_for: args.seeding_skill.map(SeedingSkillType::from),
        calculate_seasonal_stats: args.calculate_seasonal_stats,
    })?;

    print_json(&summary)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    debug!("{} v{}", config.service.name, bracket_progression::VERSION);

    match &args.command {
        Command::Validate { file } => {
            if !validate(file)? {
                std::process::exit(1);
            }
        }
        Command::Standings { snapshot, now } => standings(&config, snapshot, *now)?,
        Command::Summarize {
            snapshot,
            results,
            ratings,
            seed,
            seeding_skill,
            no_seasonal_stats,
        } => summarize(
            &config,
            SummarizeArgs {
                snapshot,
                results,
                ratings: ratings.as_deref(),
                seed: *seed,
                seeding_skill: *seeding_skill,
                calculate_seasonal_stats: !no_seasonal_stats,
            },
        )?,
    }

    Ok(())
}
