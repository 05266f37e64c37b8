mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use risk_extraction::ai::{OpenAIExtractor, RateLimitedExtractor};
use risk_extraction::sources::FileDocumentSource;
use risk_extraction::stores::{AggregateFile, FileRecordStore};
use risk_extraction::{
    BatchReport, DocumentRef, Pipeline, RecordStore, RiskRecord, Subject, SubjectContext,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{load_pipeline_config, load_subjects, Config};

type RiskPipeline = Pipeline<FileDocumentSource, RateLimitedExtractor<OpenAIExtractor>>;

#[derive(Parser)]
#[command(name = "risk", about = "Citation-verified risk scoring over document text")]
struct Cli {
    /// Directory document references are resolved against
    #[arg(long, global = true, default_value = ".")]
    docs: PathBuf,

    /// Pipeline config JSON (missing fields take defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extractor calls in flight per document
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Send the response schema in strict mode instead of JSON-object mode
    #[arg(long, global = true)]
    strict_schema: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one subject
    Analyze {
        /// Key the record is stored under (e.g. a ticker)
        #[arg(long)]
        id: String,

        /// Subject display name
        #[arg(long)]
        name: String,

        #[arg(long)]
        sector: Option<String>,

        #[arg(long)]
        industry: Option<String>,

        /// Legislative bill text file (repeatable)
        #[arg(long = "bill")]
        bills: Vec<String>,

        /// Regulatory filing text file (repeatable)
        #[arg(long = "filing")]
        filings: Vec<String>,

        /// Supplier profile text file (repeatable)
        #[arg(long = "supplier-profile")]
        supplier_profiles: Vec<String>,

        /// Directory to save the record in; printed to stdout if omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Analyze every subject in a JSON file
    Batch {
        /// JSON array of subjects
        subjects: PathBuf,

        /// Directory for per-subject records
        #[arg(long, default_value = "results")]
        output: PathBuf,

        /// Aggregate JSON file rewritten after each subject
        #[arg(long)]
        aggregate: Option<PathBuf>,

        /// Number of most-at-risk subjects to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,risk_extraction=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let env = Config::from_env().context("Failed to load configuration")?;
    let pipeline = build_pipeline(&cli, &env)?;

    match cli.command {
        Commands::Analyze {
            id,
            name,
            sector,
            industry,
            bills,
            filings,
            supplier_profiles,
            output,
        } => {
            let mut context = SubjectContext::new(name);
            context.sector = sector;
            context.industry = industry;

            let mut subject = Subject::new(id, context);
            subject.documents.extend(bills.into_iter().map(DocumentRef::bill));
            subject.documents.extend(filings.into_iter().map(DocumentRef::filing));
            subject.documents.extend(
                supplier_profiles
                    .into_iter()
                    .map(DocumentRef::supplier_profile),
            );

            analyze(&pipeline, &subject, output).await
        }
        Commands::Batch {
            subjects,
            output,
            aggregate,
            top,
        } => {
            let subjects = load_subjects(&subjects)?;
            batch(&pipeline, &subjects, output, aggregate, top).await
        }
    }
}

fn build_pipeline(cli: &Cli, env: &Config) -> Result<RiskPipeline> {
    let mut config = load_pipeline_config(cli.config.as_deref())?;
    if let Some(concurrency) = cli.concurrency {
        config = config.with_chunk_concurrency(concurrency);
    }

    let extractor = OpenAIExtractor::new(&env.credentials)?.with_strict_schema(cli.strict_schema);
    let extractor = RateLimitedExtractor::new(extractor, env.requests_per_second)?;

    tracing::info!(
        model = %env.credentials.model,
        requests_per_second = env.requests_per_second,
        chunk_concurrency = config.chunk_concurrency,
        "Pipeline ready"
    );

    Ok(Pipeline::new(
        FileDocumentSource::new(&cli.docs),
        extractor,
        config,
    )?)
}

async fn analyze(pipeline: &RiskPipeline, subject: &Subject, output: Option<PathBuf>) -> Result<()> {
    if subject.documents.is_empty() {
        anyhow::bail!("No documents given; pass --bill, --filing or --supplier-profile");
    }

    let record = pipeline
        .run(subject)
        .await
        .with_context(|| format!("Failed to analyze {}", subject.id))?;

    match output {
        Some(dir) => {
            let store = FileRecordStore::new(dir);
            store.save_record(&subject.id, &record).await?;
            println!(
                "{} {}",
                "Saved".bright_green(),
                store.path_for(&subject.id)?.display()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&record)?),
    }

    print_record(&record);
    Ok(())
}

async fn batch(
    pipeline: &RiskPipeline,
    subjects: &[Subject],
    output: PathBuf,
    aggregate: Option<PathBuf>,
    top: usize,
) -> Result<()> {
    let store = FileRecordStore::new(output);
    let aggregate = aggregate.map(AggregateFile::new);

    let report = pipeline
        .run_batch(subjects, &store, aggregate.as_ref())
        .await
        .context("Batch aborted")?;

    print_report(&report, top);
    Ok(())
}

fn risk_label(value: f64) -> colored::ColoredString {
    let text = format!("{:+.3}", value);
    if value < 0.0 {
        text.bright_red()
    } else if value > 0.0 {
        text.bright_green()
    } else {
        text.normal()
    }
}

fn print_record(record: &RiskRecord) {
    eprintln!();
    eprintln!("{}", record.subject_id.bright_cyan().bold());
    eprintln!("  direct risk   {}", risk_label(record.direct_risk));
    eprintln!("  indirect risk {}", risk_label(record.indirect_risk));
    eprintln!("  time factor   {:.2}", record.time_factor);
    eprintln!("  {}", record.summary);
    for keypoint in &record.keypoints {
        eprintln!("  - {}", keypoint);
    }
    eprintln!(
        "  {} claims accepted, {} rejected, {} chunk failures",
        record.stats.claims_accepted,
        record.stats.claims_rejected(),
        record.stats.chunk_failures()
    );
}

fn print_report(report: &BatchReport, top: usize) {
    eprintln!();
    eprintln!(
        "{} {} analyzed, {} skipped",
        "Batch complete:".bright_green().bold(),
        report.records.len(),
        report.skipped.len()
    );

    for skipped in &report.skipped {
        eprintln!("  {} {}: {}", "skipped".yellow(), skipped.id, skipped.reason);
    }

    let ranked = report.most_at_risk(top);
    if ranked.is_empty() {
        return;
    }

    eprintln!();
    eprintln!("{}", "Most at direct risk".bright_cyan().bold());
    for (rank, record) in ranked.iter().enumerate() {
        eprintln!(
            "  {:>2}. {:<12} {}  {}",
            rank + 1,
            record.subject_id,
            risk_label(record.direct_risk),
            record.summary
        );
    }
}
