//! # Birdcall Scheduler
//!
//! Scheduled-post persistence and execution engine.
//! File-based state that survives restarts, tokio timers that don't.
//!
//! ## Design Principles
//! - Whole-document JSON persistence — human-readable, git-friendly
//! - One tokio timer per schedule — zero overhead when idle
//! - A failed submission never mutates state and never kills the daemon;
//!   the recurrence rule itself is the retry mechanism
//! - The timer registry is derived state — rebuilt from the file on every
//!   start, never persisted
//!
//! ## Architecture
//! ```text
//! SchedulerEngine
//!   ├── add/remove/list ── ScheduleStore (schedules.json)
//!   └── start()
//!         ├── "0 9 * * *"  → ticker task ─┐
//!         ├── "*/30 * * * *" → ticker task ─┤ JobRegistry (id → JoinHandle)
//!         └── ...                          ─┘
//!               each tick → spawn firing task
//!                             ├── PostClient::submit_post
//!                             └── on success → update history / drop one-shot
//! ```

pub mod cron;
pub mod engine;
pub mod post;
pub mod registry;
pub mod store;

pub use cron::CronSchedule;
pub use engine::SchedulerEngine;
pub use post::{MAX_POST_CHARS, ScheduledPost};
pub use registry::JobRegistry;
pub use store::{JsonFileStore, MemoryStore, ScheduleStore};
