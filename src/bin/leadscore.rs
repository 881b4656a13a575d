//! leadscore CLI - command-line interface for Lead Score
//!
//! Commands:
//! - score: Rank identities by engagement score
//! - group: Summarize event types per identity and email
//! - validate: Report events each pipeline would drop
//! - weights: Print the effective scoring configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use lead_score::encoder::{ErrorEnvelope, ResultEncoder};
use lead_score::normalizer::parse_timestamp;
use lead_score::projection::{project, FieldSelection};
use lead_score::{
    BatchSummary, EventPayload, LeadScorer, PayloadAdapter, ScoringConfig, ScoringError,
    LEAD_SCORE_VERSION,
};

/// leadscore - Engagement scoring for identity-keyed interaction events
#[derive(Parser)]
#[command(name = "leadscore")]
#[command(author = "Synheart AI Inc")]
#[command(version = LEAD_SCORE_VERSION)]
#[command(about = "Score and group interaction events by identity", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank identities by engagement score
    Score(PipelineArgs),

    /// Summarize event types per identity and email
    Group(PipelineArgs),

    /// Report events each pipeline would drop
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Scoring configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective scoring configuration
    Weights {
        /// Scoring configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output the full configuration as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct PipelineArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Input format
    #[arg(long, default_value = "json")]
    input_format: InputFormat,

    /// Output format
    #[arg(long, default_value = "json")]
    output_format: OutputFormat,

    /// Comma-separated output fields to keep (default: all)
    #[arg(long)]
    fields: Option<String>,

    /// Scoring configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// A batch object or a JSON array of batches
    Json,
    /// Newline-delimited JSON (one batch per line)
    Ndjson,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Result envelope as compact JSON
    Json,
    /// Result envelope as pretty-printed JSON
    JsonPretty,
    /// One result record per line, no envelope
    Ndjson,
}

#[derive(Clone, Copy)]
enum Pipeline {
    Score,
    Group,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), LeadCliError> {
    match cli.command {
        Commands::Score(args) => cmd_pipeline(Pipeline::Score, &args),
        Commands::Group(args) => cmd_pipeline(Pipeline::Group, &args),
        Commands::Validate {
            input,
            input_format,
            config,
            json,
        } => cmd_validate(&input, input_format, config.as_deref(), json),
        Commands::Weights { config, json } => cmd_weights(config.as_deref(), json),
    }
}

fn cmd_pipeline(pipeline: Pipeline, args: &PipelineArgs) -> Result<(), LeadCliError> {
    let scorer = LeadScorer::with_config(load_config(args.config.as_deref())?)?;
    let input_data = read_input(&args.input)?;

    let payload = match parse_payload(&input_data, args.input_format) {
        Ok(payload) => payload,
        Err(e) => {
            // Mirror the response body callers expect on a bad request.
            let report = serde_json::to_string(&ErrorEnvelope::from_error(&e))?;
            write_output(&args.output, &(report + "\n"))?;
            return Err(e.into());
        }
    };
    debug!(
        batches = payload.batches().len(),
        events = payload.event_count(),
        "decoded payload"
    );

    let selection = args
        .fields
        .as_deref()
        .map(FieldSelection::parse)
        .unwrap_or_default();

    let records = match pipeline {
        Pipeline::Score => project(&scorer.score(&payload), &selection)?,
        Pipeline::Group => project(&scorer.group(&payload), &selection)?,
    };
    info!(results = records.len(), "pipeline complete");

    let output_data = format_output(records, args.output_format)?;
    write_output(&args.output, &output_data)
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    config: Option<&Path>,
    json: bool,
) -> Result<(), LeadCliError> {
    let scorer = LeadScorer::with_config(load_config(config)?)?;
    let input_data = read_input(input)?;
    let payload = parse_payload(&input_data, input_format)?;

    let summary = scorer.summarize(&payload);
    let errors = collect_event_errors(&payload);

    let report = ValidationReport { summary, errors };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let s = &report.summary;
        println!("Validation Report");
        println!("=================");
        println!("Batches:               {}", s.batches);
        println!("Total events:          {}", s.normalization.total_events);
        println!("Groupable events:      {}", s.normalization.kept_events);
        println!("Scorable events:       {}", s.scorable_events);
        println!("Missing hem_sha256:    {}", s.normalization.missing_identity);
        println!("Missing event_type:    {}", s.normalization.missing_event_type);
        println!("Missing timestamp:     {}", s.normalization.missing_timestamp);
        println!("Unparseable timestamp: {}", s.normalization.unparseable_timestamp);
        println!("Scored identities:     {}", s.scored_identities);
        println!("Groups:                {}", s.groups);

        if !s.unknown_event_types.is_empty() {
            println!("\nUnweighted event types (score 0):");
            for event_type in &s.unknown_event_types {
                println!("  - {}", event_type);
            }
        }

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Event {} (batch {}, index {}): {}",
                    err.hem_sha256.as_deref().unwrap_or("unknown"),
                    err.batch,
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(LeadCliError::ValidationFailed(report.errors.len()))
    }
}

fn cmd_weights(config: Option<&Path>, json: bool) -> Result<(), LeadCliError> {
    let config = load_config(config)?;

    if json {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    println!("Event weights");
    println!("=============");
    for (event_type, weight) in config.weights.ranked() {
        println!("  {:<24} {:>3}", event_type, weight);
    }
    println!("  {:<24} {:>3}", "(unknown)", 0);

    println!("\nRecency multipliers");
    println!("===================");
    for tier in &config.recency_tiers {
        println!("  <= {:>3} days          x{}", tier.max_days, tier.multiplier);
    }
    println!("  older                 x{}", config.recency_floor);

    println!("\nBonuses");
    println!("=======");
    println!(
        "  burst: +{} when {} events fall within {}s",
        config.burst.bonus, config.burst.min_events, config.burst.window_secs
    );
    for tier in &config.velocity_tiers {
        println!("  velocity: +{} at >= {} events/min", tier.bonus, tier.min_rate);
    }

    Ok(())
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<ScoringConfig, LeadCliError> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            let config = ScoringConfig::from_json(&json)?;
            debug!(path = %path.display(), "loaded scoring configuration");
            Ok(config)
        }
        None => Ok(ScoringConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, LeadCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading payload from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_payload(input_data: &str, format: InputFormat) -> Result<EventPayload, ScoringError> {
    match format {
        InputFormat::Json => PayloadAdapter::parse(input_data),
        InputFormat::Ndjson => PayloadAdapter::parse_ndjson(input_data),
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), LeadCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_output(
    records: Vec<serde_json::Value>,
    format: OutputFormat,
) -> Result<String, LeadCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for record in &records {
                out.push_str(&serde_json::to_string(record)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let encoder = ResultEncoder::new();
            debug!(instance_id = encoder.instance_id(), "encoding result envelope");
            let json = match format {
                OutputFormat::JsonPretty => encoder.encode_to_json_pretty(records)?,
                _ => encoder.encode_to_json(records)?,
            };
            Ok(json + "\n")
        }
    }
}

fn collect_event_errors(payload: &EventPayload) -> Vec<ValidationErrorDetail> {
    let mut errors = Vec::new();
    for (batch, contents) in payload.batches().iter().enumerate() {
        for (index, event) in contents.events.iter().enumerate() {
            let error = match event.validate() {
                Err(e) => e.to_string(),
                Ok(()) => match event.event_timestamp.as_deref().map(parse_timestamp) {
                    Some(None) => "unparseable event_timestamp".to_string(),
                    _ => continue,
                },
            };
            errors.push(ValidationErrorDetail {
                batch,
                index,
                hem_sha256: event.hem_sha256.clone(),
                error,
            });
        }
    }
    errors
}

// Error types

#[derive(Debug)]
enum LeadCliError {
    Io(io::Error),
    Scoring(ScoringError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for LeadCliError {
    fn from(e: io::Error) -> Self {
        LeadCliError::Io(e)
    }
}

impl From<ScoringError> for LeadCliError {
    fn from(e: ScoringError) -> Self {
        LeadCliError::Scoring(e)
    }
}

impl From<serde_json::Error> for LeadCliError {
    fn from(e: serde_json::Error) -> Self {
        LeadCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<LeadCliError> for CliError {
    fn from(e: LeadCliError) -> Self {
        match e {
            LeadCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            LeadCliError::Scoring(e @ ScoringError::InvalidConfig(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'leadscore weights --json' for a valid template".to_string()),
            },
            LeadCliError::Scoring(e) => CliError {
                code: "DECODE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Input must be {\"events\": [...]} or an array of such batches".to_string(),
                ),
            },
            LeadCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            LeadCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events are missing fields or have bad timestamps", count),
                hint: Some(
                    "Such events are skipped by score (and by group when identity or type is missing)"
                        .to_string(),
                ),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    summary: BatchSummary,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    batch: usize,
    index: usize,
    hem_sha256: Option<String>,
    error: String,
}
