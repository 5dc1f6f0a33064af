//! Binary entrypoint for the Magic Buddy CLI.
//!
//! Commands:
//! - `init` - write a starter config if none exists and seed the content store
//! - `status` - print the reader's level, buddy, streak and achievements
//! - `map [region]` - show the nodes of a region (defaults to the current one)
//! - `complete <node_id>` - complete a map node
//! - `read <story_id> [--minutes N]` - record a finished reading session
//! - `export` - print a sync payload for QR transfer
//! - `import <payload>` - adopt progress from a sync payload
//! - `reset --yes` - throw away all progress
//!
//! See the library crate docs for module-level details: `magic_buddy::`.
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use magic_buddy::buddy::{
    current_streak, earned_achievements, load_or_initialize, power_to_next_stage, BuddySession,
    BuddyStore, CompletionOutcome, ContentCatalog, LoadOutcome, ProgressReporter,
};
use magic_buddy::config::{Config, DEFAULT_CONFIG_PATH};
use magic_buddy::metrics;

#[derive(Parser)]
#[command(name = "magic-buddy")]
#[command(about = "Reading progression and buddy companion for young English learners")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a config file if needed and seed the content store
    Init,
    /// Show reader progress and buddy state
    Status,
    /// Show the nodes of a map region
    Map {
        /// Region id (defaults to the highest region the reader can enter)
        region: Option<String>,
    },
    /// Complete a map node
    Complete { node_id: String },
    /// Record a finished reading session
    Read {
        story_id: String,
        /// Minutes spent reading
        #[arg(short, long, default_value_t = 5)]
        minutes: u32,
    },
    /// Print a sync payload for this reader
    Export,
    /// Adopt progress from a sync payload
    Import { payload: String },
    /// Throw away all progress
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => {
            if !Path::new(&cli.config).exists() {
                Config::create_default(&cli.config).await?;
                println!("Configuration file created at {}", cli.config);
            }
            Config::load(&cli.config).await?
        }
        _ => load_config(&cli.config).await?,
    };
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing {}", config.app.name);
            let (store, catalog) = open_content(&config).await?;
            let (reporter, mut rx) = ProgressReporter::channel();
            let printer = tokio::spawn(async move {
                while let Some(step) = rx.recv().await {
                    println!("[{:>3}%] {}", step.percent, step.message);
                }
            });
            let outcome = load_or_initialize(&store, &catalog, &reporter).await;
            drop(reporter);
            let _ = printer.await;
            match outcome? {
                LoadOutcome::Loaded => println!("Content already up to date."),
                LoadOutcome::Initialized(summary) => println!(
                    "Seeded {} stories and {} dictionary words.",
                    summary.stories, summary.words
                ),
            }
            let session = BuddySession::open(
                store,
                Arc::new(catalog),
                &config.app.default_user_name,
                &config.app.default_buddy_name,
            )?;
            println!(
                "Welcome, {}! Your buddy {} is waiting.",
                session.user().name,
                session.user().buddy_name
            );
        }
        Commands::Status => {
            let session = open_session(&config).await?;
            print_status(&session);
        }
        Commands::Map { region } => {
            let session = open_session(&config).await?;
            let region_id = match region {
                Some(id) => id,
                None => session
                    .current_region()
                    .map(|r| r.id.clone())
                    .ok_or_else(|| anyhow!("no map regions are available"))?,
            };
            let view = session.map(&region_id)?;
            println!(
                "{} (level {}){}",
                view.region.name,
                view.region.level,
                if view.enterable { "" } else { " [locked]" }
            );
            for node in &view.nodes {
                let mark = if node.completed {
                    "x"
                } else if node.unlocked {
                    "o"
                } else {
                    " "
                };
                println!(
                    "  [{}] {:<16} {:<9} {}",
                    mark,
                    node.node_id,
                    node.node_type.as_str(),
                    node.story_id
                );
            }
            println!(
                "Rewards waiting: {} magic power, {} cards",
                view.pending.magic_power,
                view.pending.cards.len()
            );
        }
        Commands::Complete { node_id } => {
            let mut session = open_session(&config).await?;
            let result = session.complete_node(&node_id)?;
            print_outcome(&node_id, &result.outcome);
            for id in &result.achievements {
                println!("Achievement unlocked: {}", id);
            }
        }
        Commands::Read { story_id, minutes } => {
            let mut session = open_session(&config).await?;
            let today = Utc::now().date_naive();
            let result = session.record_reading(&story_id, minutes, today)?;
            println!(
                "Read {} for {} minutes. Streak: {} day(s).",
                story_id, minutes, result.streak_days
            );
            if let Some(outcome) = &result.completion {
                let node_id = match outcome {
                    CompletionOutcome::Completed(report) => report.node_id.as_str(),
                    _ => session
                        .catalog()
                        .node_for_story(&story_id)
                        .map_or(story_id.as_str(), |n| n.id.as_str()),
                };
                print_outcome(node_id, outcome);
            }
            for id in &result.achievements {
                println!("Achievement unlocked: {}", id);
            }
        }
        Commands::Export => {
            let session = open_session(&config).await?;
            println!("{}", session.export_sync(Utc::now())?);
        }
        Commands::Import { payload } => {
            let mut session = open_session(&config).await?;
            match session.import_sync(&payload) {
                Ok(data) => {
                    println!(
                        "Imported progress for {}: level {}, {} magic power.",
                        data.user.name, data.progress.level, data.progress.magic_power
                    );
                }
                Err(e) => {
                    println!("Sorry, {}.", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                println!("This erases all progress. Run again with --yes to confirm.");
                return Ok(());
            }
            let mut session = open_session(&config).await?;
            session.reset()?;
            println!("Progress reset. {} is an egg again.", session.user().buddy_name);
        }
    }

    debug!("metrics: {:?}", metrics::snapshot());
    Ok(())
}

/// Missing config file means defaults; a broken one is an error.
async fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::load(path).await
    } else {
        Ok(Config::default())
    }
}

async fn open_content(config: &Config) -> Result<(BuddyStore, ContentCatalog)> {
    tokio::fs::create_dir_all(&config.storage.data_dir)
        .await
        .map_err(|e| anyhow!("Failed to create data dir {}: {}", config.storage.data_dir, e))?;
    let store = BuddyStore::open(config.storage.db_path())?;
    let catalog = match &config.content.seed_dir {
        Some(dir) => {
            info!("Loading content from {}", dir);
            ContentCatalog::from_seed_dir(dir)?
        }
        None => ContentCatalog::canonical()?,
    };
    Ok((store, catalog))
}

async fn open_session(config: &Config) -> Result<BuddySession> {
    let (store, catalog) = open_content(config).await?;
    if let LoadOutcome::Initialized(summary) =
        load_or_initialize(&store, &catalog, &ProgressReporter::silent()).await?
    {
        warn!(
            "content store was not initialized; seeded {} stories",
            summary.stories
        );
    }
    let session = BuddySession::open(
        store,
        Arc::new(catalog),
        &config.app.default_user_name,
        &config.app.default_buddy_name,
    )?
    .with_max_payload_len(config.sync.max_payload_len);
    Ok(session)
}

fn print_status(session: &BuddySession) {
    let progress = session.progress();
    let user = session.user();
    let today = Utc::now().date_naive();
    println!("Reader:        {}", user.name);
    println!(
        "Buddy:         {} the {} ({})",
        user.buddy_name,
        progress.buddy_stage,
        progress.buddy_mood.as_str()
    );
    println!("Level:         {}", progress.level);
    match power_to_next_stage(progress.magic_power) {
        Some(more) => println!(
            "Magic power:   {} ({} more to evolve)",
            progress.magic_power, more
        ),
        None => println!("Magic power:   {} (fully evolved)", progress.magic_power),
    }
    println!("Streak:        {} day(s)", current_streak(progress, today));
    println!(
        "Stories read:  {} ({} minutes)",
        progress.total_stories_read, progress.total_reading_time
    );
    println!(
        "Map:           {}/{} nodes",
        progress.completed_nodes.len(),
        session.catalog().nodes().len()
    );
    if let Some(region) = session.current_region() {
        println!("Region:        {}", region.name);
    }
    let earned = earned_achievements(session.catalog(), progress);
    if !earned.is_empty() {
        println!("Achievements:");
        for a in earned {
            println!("  - {}: {}", a.name, a.description);
        }
    }
}

fn print_outcome(node_id: &str, outcome: &CompletionOutcome) {
    match outcome {
        CompletionOutcome::Completed(report) => {
            println!(
                "Completed {}: +{} magic power",
                report.node_id, report.reward.magic_power
            );
            for card in &report.reward.cards {
                println!("  New card: {}", card);
            }
            if report.evolved() {
                println!(
                    "  Your buddy evolved from {} to {}!",
                    report.stage_before, report.stage_after
                );
            }
            match &report.next_region {
                Some(Some(region_id)) => println!("  A new region opened: {}", region_id),
                Some(None) => println!("  You finished the whole map!"),
                None => {}
            }
            if !report.newly_unlocked.is_empty() {
                let ids: Vec<&str> = report.newly_unlocked.iter().map(String::as_str).collect();
                println!("  Now available: {}", ids.join(", "));
            }
        }
        CompletionOutcome::AlreadyCompleted => println!("{} is already completed.", node_id),
        CompletionOutcome::Locked { missing } => {
            println!("{} is locked. Finish first: {}", node_id, missing.join(", "))
        }
        CompletionOutcome::RegionLocked { region_id } => {
            println!("{} is in {}, which is not open yet.", node_id, region_id)
        }
    }
}

fn init_logging(config: &Config, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .logging
            .level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config.logging.file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Echo to the console only when attached to a terminal
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
