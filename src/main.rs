//! Sumi-Search main entry point
//!
//! This is the command-line interface for the Sumi-Search engine.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use sumi_search::config::load_config_with_hash;
use sumi_search::{Field, JobSpec, ScheduleType, SearchEngine};
use tracing_subscriber::EnvFilter;

/// Sumi-Search: a polite crawl-index-rank search engine
///
/// Sumi-Search crawls websites on a schedule while respecting robots.txt and
/// per-host delays, indexes what it finds, and answers ranked full-text
/// queries.
#[derive(Parser, Debug)]
#[command(name = "sumi-search")]
#[command(version = "1.0.0")]
#[command(about = "A polite crawl-index-rank search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a crawl job
    AddJob {
        /// Job name
        name: String,

        /// Seed URLs
        #[arg(required = true)]
        seeds: Vec<String>,

        /// manual, hourly, daily or weekly
        #[arg(long, default_value = "daily")]
        schedule: ScheduleType,

        /// Time of day for daily and weekly jobs (HH:MM, UTC)
        #[arg(long, default_value = "02:00")]
        at: String,

        /// Maximum pages indexed per run
        #[arg(long, default_value_t = 100)]
        max_pages: u32,

        /// Maximum link depth from the seeds
        #[arg(long, default_value_t = 3)]
        max_depth: u32,

        /// Seconds between requests to one host
        #[arg(long)]
        delay: Option<f64>,

        /// Restrict the crawl to these domains (`*.example.com` allowed)
        #[arg(long = "domain")]
        domains: Vec<String>,
    },

    /// List registered jobs
    Jobs,

    /// Remove a job
    RemoveJob { id: i64 },

    /// Run a job now and wait for it to finish
    Run { id: i64 },

    /// Crawl seed URLs once, reusing a job with the same seeds and limits
    Crawl {
        #[arg(required = true)]
        seeds: Vec<String>,

        #[arg(long, default_value_t = 50)]
        max_pages: u32,

        #[arg(long, default_value_t = 2)]
        max_depth: u32,
    },

    /// Drop a page from the index
    RemoveDoc { url: String },

    /// Search the index
    Search {
        query: String,

        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Print each result's score breakdown
        #[arg(long)]
        explain: bool,

        /// Only match in this field (title, headings, meta_description, content, url)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<Field>,
    },

    /// Suggest completions for a prefix
    Suggest {
        prefix: String,

        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },

    /// Show index statistics and popular title terms
    Stats,

    /// Show or change ranking weights
    Weights {
        /// Weight to change, as name=value (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },

    /// Run scheduled jobs until interrupted
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let engine = SearchEngine::open(config)?;

    match cli.command {
        Command::AddJob {
            name,
            seeds,
            schedule,
            at,
            max_pages,
            max_depth,
            delay,
            domains,
        } => {
            let spec = JobSpec {
                name,
                seed_urls: seeds,
                schedule_type: schedule,
                schedule_time: at,
                max_pages,
                max_depth,
                delay_seconds: delay,
                allowed_domains: domains,
            };
            let id = engine.submit_crawl_job(spec)?;
            println!("Registered job {}", id);
        }
        Command::Jobs => print_jobs(&engine),
        Command::RemoveJob { id } => {
            let job = engine.remove_job(id)?;
            println!("Removed job {} ({})", job.id, job.name);
        }
        Command::Run { id } => print_report(&engine.run_job(id).await?),
        Command::Crawl {
            seeds,
            max_pages,
            max_depth,
        } => print_report(&engine.crawl_and_index(&seeds, max_pages, max_depth).await?),
        Command::RemoveDoc { url } => {
            if engine.remove_document(&url)? {
                println!("Removed {}", url);
            } else {
                println!("{} is not indexed", url);
            }
        }
        Command::Search {
            query,
            limit,
            explain,
            fields,
        } => handle_search(&engine, &query, limit, explain, &fields),
        Command::Suggest { prefix, limit } => {
            for suggestion in engine.suggest(&prefix, limit) {
                println!("{}", suggestion);
            }
        }
        Command::Stats => {
            let stats = engine.index_stats()?;
            println!("Documents: {}", stats.document_count);
            println!("Terms:     {}", stats.term_count);
            println!("Popular:   {}", engine.popular_terms(10).join(", "));
        }
        Command::Weights { set } => handle_weights(&engine, &set)?,
        Command::Daemon => run_daemon(&engine).await,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_search=info,warn"),
            1 => EnvFilter::new("sumi_search=debug,info"),
            2 => EnvFilter::new("sumi_search=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn parse_field(name: &str) -> Result<Field, String> {
    Field::ALL
        .into_iter()
        .find(|field| field.as_str() == name)
        .ok_or_else(|| format!("unknown field '{}'", name))
}

fn print_report(report: &sumi_search::crawler::RunReport) {
    println!(
        "Job {} {}: {} indexed, {} skipped, {} failed in {}s{}",
        report.job_id,
        report.status,
        report.pages_indexed,
        report.pages_skipped,
        report.pages_failed,
        (report.finished_at - report.started_at).num_seconds(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
}

fn print_jobs(engine: &SearchEngine) {
    let jobs = engine.jobs();
    if jobs.is_empty() {
        println!("No jobs registered");
        return;
    }

    for job in jobs {
        let next = job
            .next_due_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<20} {:<7} {:<9} next: {}  last run: {} pages",
            job.id, job.name, job.schedule_type, job.status, next, job.pages_crawled_in_run
        );
        for seed in &job.seed_urls {
            println!("        * {}", seed);
        }
    }
}

fn handle_search(engine: &SearchEngine, query: &str, limit: usize, explain: bool, fields: &[Field]) {
    let results = engine.search_fields(query, limit, fields);
    if results.is_empty() {
        println!("No results for '{}'", query);
        return;
    }

    for (rank, result) in results.iter().enumerate() {
        println!("{}. {} ({:.3})", rank + 1, result.title, result.score);
        println!("   {}", result.url);
        println!("   {}", result.snippet);
        if explain {
            let b = &result.breakdown;
            println!(
                "   title {:.3}  headings {:.3}  meta {:.3}  content {:.3}  url {:.3}",
                b.title, b.headings, b.meta_description, b.content, b.url
            );
            println!(
                "   freshness {:.3}  length {:.3}  depth {:.3}",
                b.freshness, b.content_length, b.depth
            );
        }
    }
}

fn handle_weights(engine: &SearchEngine, assignments: &[String]) -> anyhow::Result<()> {
    let mut weights = engine.ranking_weights();

    if !assignments.is_empty() {
        for assignment in assignments {
            let Some((name, value)) = assignment.split_once('=') else {
                bail!("expected NAME=VALUE, got '{}'", assignment);
            };
            let value: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("invalid value for {}", name))?;
            weights.set(name.trim(), value)?;
        }
        engine.set_ranking_weights(weights)?;
    }

    for (name, value) in weights.iter() {
        println!("{:<18} {}", name, value);
    }
    Ok(())
}

/// Ticks the scheduler on an interval until Ctrl-C
async fn run_daemon(engine: &SearchEngine) {
    let interval_secs = engine.config().scheduler.tick_interval_secs;
    tracing::info!(
        "Scheduler running with {} jobs, ticking every {}s",
        engine.jobs().len(),
        interval_secs
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let triggered = engine.tick(Utc::now());
                if !triggered.is_empty() {
                    tracing::info!("Triggered jobs {:?}", triggered);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down; cancelling running jobs");
                for job in engine.jobs() {
                    engine.cancel_job(job.id);
                }
                break;
            }
        }
    }
}
