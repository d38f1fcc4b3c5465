//! # Birdcall — scheduled social posting daemon
//!
//! Persists scheduled posts with a cron recurrence rule and publishes them
//! unattended on a timer.
//!
//! Usage:
//!   birdcall schedule "Good morning" "0 9 * * *"   # recurring post
//!   birdcall schedule "Launch day!" "0 9 1 6 *" true  # one-shot
//!   birdcall list                                  # show all schedules
//!   birdcall remove <id>                           # delete a schedule
//!   birdcall start                                 # run the daemon

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use birdcall_core::BirdcallConfig;
use birdcall_platform::XApiClient;
use birdcall_scheduler::{JsonFileStore, ScheduledPost, SchedulerEngine};

#[derive(Parser)]
#[command(
    name = "birdcall",
    version,
    about = "🐦 Birdcall — scheduled social posting daemon"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Schedule a post: text, cron expression, optional one-time flag
    Schedule {
        /// Post body (≤ 280 characters)
        text: String,
        /// Five-field cron expression, e.g. "0 9 * * *"
        cron_expression: String,
        /// Remove the schedule after its first successful post
        #[arg(default_value_t = false)]
        one_time: bool,
    },
    /// Remove a scheduled post by id
    Remove { id: String },
    /// List all scheduled posts
    List,
    /// Run the posting daemon until a termination signal
    Start,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "birdcall=debug,birdcall_scheduler=debug,birdcall_platform=debug"
    } else {
        "birdcall=info,birdcall_scheduler=info,birdcall_platform=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = BirdcallConfig::load()?;
    let store = Arc::new(JsonFileStore::new(&expand_path(&config.scheduler.data_dir)));
    let engine = SchedulerEngine::new(store);

    match cli.command {
        Command::Schedule {
            text,
            cron_expression,
            one_time,
        } => match engine.add_schedule(&text, &cron_expression, one_time) {
            Ok(post) => {
                println!("✅ Scheduled post {}", post.id);
                println!("   schedule: {}", post.cron_expression);
                println!("   one-time: {}", post.one_time);
            }
            Err(e) => {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
        },

        Command::Remove { id } => {
            if engine.remove_schedule(&id) {
                println!("✅ Removed {id}");
            } else {
                println!("⚠️ No schedule found with id {id}");
            }
        }

        Command::List => {
            let posts = engine.list_schedules();
            if posts.is_empty() {
                println!("No scheduled posts.");
            } else {
                println!("📋 Scheduled posts ({}):\n", posts.len());
                for post in &posts {
                    print_schedule(post);
                }
            }
        }

        Command::Start => {
            let client = Arc::new(XApiClient::new(config.platform.clone()));
            engine.start(client);
            tracing::info!("🐦 Birdcall daemon running — Ctrl-C or SIGTERM to stop");
            shutdown_signal().await?;
            tracing::info!("Termination signal received; stopping timers");
            engine.shutdown().await;
        }
    }

    Ok(())
}

/// Block until a termination signal: Ctrl-C anywhere, SIGTERM on unix.
#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

fn print_schedule(post: &ScheduledPost) {
    println!("  {}  \"{}\"", post.id, truncate(&post.text, 50));
    println!(
        "      schedule: {}   one-time: {}",
        post.cron_expression, post.one_time
    );
    println!(
        "      created:  {}",
        post.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(last) = post.last_posted {
        println!(
            "      last posted: {} ({} posts)",
            last.format("%Y-%m-%d %H:%M UTC"),
            post.post_count
        );
    }
    println!();
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    }
}
