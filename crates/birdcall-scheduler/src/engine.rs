//! Scheduler Engine — keeps the store and the live timer set consistent.
//!
//! The engine is a cheap-clone handle over shared state, so ticker tasks can
//! carry their own copy. All mutations go load → modify → save against the
//! store; the registry is only ever touched alongside a store mutation for
//! the same id.
//!
//! Submission failures are terminal for that tick only. There is no retry
//! and no backoff: the recurrence rule is the retry mechanism, a policy
//! choice inherited from the original deployment, not an oversight.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::task::JoinHandle;

use birdcall_core::{BirdcallError, PostClient, Result};

use crate::cron::{self, CronSchedule};
use crate::post::{MAX_POST_CHARS, ScheduledPost};
use crate::registry::JobRegistry;
use crate::store::ScheduleStore;

/// The scheduler engine — add/remove/list plus the timer-driven daemon.
#[derive(Clone)]
pub struct SchedulerEngine {
    store: Arc<dyn ScheduleStore>,
    registry: Arc<JobRegistry>,
    /// Present while the daemon runs; also the signal that new schedules
    /// should get a live timer immediately.
    client: Arc<Mutex<Option<Arc<dyn PostClient>>>>,
    /// Firing tasks that have started. Shutdown drains these so a firing
    /// past its tick is never cut off mid-submission.
    firings: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SchedulerEngine {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            registry: Arc::new(JobRegistry::new()),
            client: Arc::new(Mutex::new(None)),
            firings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Validate, persist, and return a new scheduled post.
    ///
    /// Never arms a timer unless the daemon is already running — timers are
    /// otherwise created only by `start()`.
    pub fn add_schedule(
        &self,
        text: &str,
        expression: &str,
        one_time: bool,
    ) -> Result<ScheduledPost> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(BirdcallError::validation("text", "must not be empty"));
        }
        let chars = trimmed.chars().count();
        if chars > MAX_POST_CHARS {
            return Err(BirdcallError::validation(
                "text",
                format!("{chars} characters exceeds the {MAX_POST_CHARS} limit"),
            ));
        }
        CronSchedule::parse(expression)
            .map_err(|e| BirdcallError::validation("cron expression", e))?;

        let post = ScheduledPost::new(trimmed, expression, one_time);
        let mut all = self.store.load();
        all.push(post.clone());
        if let Err(e) = self.store.save(&all) {
            tracing::warn!("⚠️ Failed to persist new schedule {}: {e}", post.id);
        }
        tracing::info!("📅 Schedule added: {} ('{}')", post.id, post.cron_expression);

        // Daemon already running: arm the timer now, no restart needed.
        let running = self.client.lock().expect("engine poisoned").clone();
        if let Some(client) = running {
            self.spawn_ticker(&post, client);
            tracing::info!("⏰ Live timer armed for {}", post.id);
        }
        Ok(post)
    }

    /// Remove a schedule and stop its timer. False when the id is unknown.
    pub fn remove_schedule(&self, id: &str) -> bool {
        let mut all = self.store.load();
        let before = all.len();
        all.retain(|p| p.id != id);
        if all.len() == before {
            tracing::warn!("No schedule with id {id}");
            return false;
        }
        if let Err(e) = self.store.save(&all) {
            tracing::warn!("⚠️ Failed to persist removal of {id}: {e}");
        }
        self.registry.unregister_and_stop(id);
        tracing::info!("🗑️ Schedule removed: {id}");
        true
    }

    /// Read-through to the store. No side effects.
    pub fn list_schedules(&self) -> Vec<ScheduledPost> {
        self.store.load()
    }

    /// Arm one ticker per persisted entry. The daemon entry point — the
    /// binary blocks on the termination signal and then calls `shutdown`.
    pub fn start(&self, client: Arc<dyn PostClient>) {
        *self.client.lock().expect("engine poisoned") = Some(client.clone());
        let posts = self.store.load();
        if posts.is_empty() {
            tracing::info!("No scheduled posts — daemon idle");
            return;
        }
        for post in &posts {
            self.spawn_ticker(post, client.clone());
        }
        tracing::info!("⏰ Scheduler started with {} timers", posts.len());
    }

    /// Stop every timer, then wait for firings already past their tick to
    /// finish. No new tick is scheduled once the tickers are gone.
    pub async fn shutdown(&self) {
        self.client.lock().expect("engine poisoned").take();
        self.registry.stop_all();
        let in_flight: Vec<JoinHandle<()>> = {
            let mut firings = self.firings.lock().expect("engine poisoned");
            firings.drain(..).collect()
        };
        for handle in in_flight {
            let _ = handle.await;
        }
    }

    pub fn timer_count(&self) -> usize {
        self.registry.len()
    }

    /// Spawn the per-entry ticker loop and register its handle.
    ///
    /// Each tick spawns the firing as an independent task, so aborting the
    /// ticker (remove, shutdown, one-shot cleanup) never cuts a submission
    /// off mid-flight.
    fn spawn_ticker(&self, post: &ScheduledPost, client: Arc<dyn PostClient>) {
        let engine = self.clone();
        let id = post.id.clone();
        let expression = post.cron_expression.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Some(next) = cron::next_run_after(&expression, Utc::now()) else {
                    tracing::warn!("No upcoming run for {id} ('{expression}'); timer exits");
                    break;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                engine.spawn_firing(&id, client.clone());
            }
        });
        self.registry.register(&post.id, handle);
    }

    /// Spawn one firing as an independent task and track its handle so
    /// `shutdown` can let started firings run to completion.
    pub(crate) fn spawn_firing(&self, id: &str, client: Arc<dyn PostClient>) {
        let engine = self.clone();
        let id = id.to_string();
        let handle = tokio::spawn(async move {
            engine.fire(&id, client).await;
        });
        let mut firings = self.firings.lock().expect("engine poisoned");
        firings.retain(|h| !h.is_finished());
        firings.push(handle);
    }

    /// One firing: re-read the entry, submit, and record the outcome.
    ///
    /// The entry is always re-read from the current persisted state rather
    /// than a captured copy, so an entry removed between schedule time and
    /// fire time is simply skipped. An entry removed while the submission
    /// was in flight keeps its post (already published) but gets no history
    /// update — accepted best-effort race.
    pub(crate) async fn fire(&self, id: &str, client: Arc<dyn PostClient>) {
        let Some(entry) = self.store.load().into_iter().find(|p| p.id == id) else {
            tracing::debug!("Schedule {id} gone before firing; skipping");
            return;
        };

        match client.submit_post(&entry.text).await {
            Ok(receipt) => {
                tracing::info!("📣 Posted {id} → {} ({})", receipt.id, receipt.url);
                let mut all = self.store.load();
                let Some(idx) = all.iter().position(|p| p.id == id) else {
                    tracing::debug!("Schedule {id} removed mid-flight; history not updated");
                    return;
                };
                if all[idx].one_time {
                    all.remove(idx);
                    tracing::info!("One-shot {id} complete; removing");
                    self.registry.unregister_and_stop(id);
                } else {
                    all[idx].last_posted = Some(Utc::now());
                    all[idx].post_count += 1;
                }
                if let Err(e) = self.store.save(&all) {
                    tracing::warn!("⚠️ Failed to persist firing of {id}: {e}");
                }
            }
            Err(e) => {
                // Logged and swallowed: the daemon keeps honoring future
                // ticks, and the next natural tick is the retry.
                tracing::warn!("❌ Post failed for {id}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use birdcall_core::PostReceipt;

    /// Records every submitted text; optionally slow, optionally rejecting.
    struct StubClient {
        posts: Mutex<Vec<String>>,
        fail: bool,
        delay: Option<std::time::Duration>,
    }

    impl StubClient {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                posts: Mutex::new(Vec::new()),
                fail: false,
                delay: None,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                posts: Mutex::new(Vec::new()),
                fail: true,
                delay: None,
            })
        }

        fn slow(delay: std::time::Duration) -> Arc<Self> {
            Arc::new(Self {
                posts: Mutex::new(Vec::new()),
                fail: false,
                delay: Some(delay),
            })
        }

        fn submitted(&self) -> Vec<String> {
            self.posts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PostClient for StubClient {
        async fn submit_post(&self, text: &str) -> Result<PostReceipt> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(BirdcallError::Execution("platform said no".into()));
            }
            self.posts.lock().unwrap().push(text.to_string());
            Ok(PostReceipt {
                id: "1".into(),
                url: "https://x.example/1".into(),
            })
        }
    }

    fn engine() -> SchedulerEngine {
        SchedulerEngine::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_add_round_trips_through_store() {
        let engine = engine();
        let post = engine
            .add_schedule("Good morning ☀️", "0 9 * * *", false)
            .unwrap();
        assert_eq!(post.post_count, 0);
        assert!(post.last_posted.is_none());

        let listed = engine.list_schedules();
        assert_eq!(listed, vec![post]);
    }

    #[test]
    fn test_add_rejects_empty_text() {
        let engine = engine();
        let err = engine.add_schedule("   ", "0 9 * * *", false).unwrap_err();
        assert!(matches!(
            err,
            BirdcallError::Validation { field: "text", .. }
        ));
        assert!(engine.list_schedules().is_empty());
    }

    #[test]
    fn test_add_rejects_overlong_text() {
        let engine = engine();
        let long = "x".repeat(281);
        let err = engine.add_schedule(&long, "0 9 * * *", false).unwrap_err();
        assert!(matches!(
            err,
            BirdcallError::Validation { field: "text", .. }
        ));
        assert!(engine.list_schedules().is_empty());

        // Exactly 280 is fine.
        assert!(engine.add_schedule(&"x".repeat(280), "0 9 * * *", false).is_ok());
    }

    #[test]
    fn test_add_rejects_bad_cron_and_leaves_store_unchanged() {
        let engine = engine();
        engine.add_schedule("keep me", "0 9 * * *", false).unwrap();
        let before = engine.list_schedules();

        for bad in ["* * *", "99 * * * *", "nope"] {
            let err = engine.add_schedule("hello", bad, false).unwrap_err();
            assert!(matches!(
                err,
                BirdcallError::Validation {
                    field: "cron expression",
                    ..
                }
            ));
        }
        assert_eq!(engine.list_schedules(), before);
    }

    #[test]
    fn test_list_is_idempotent() {
        let engine = engine();
        engine.add_schedule("a", "0 9 * * *", false).unwrap();
        engine.add_schedule("b", "0 10 * * *", true).unwrap();
        assert_eq!(engine.list_schedules(), engine.list_schedules());
    }

    #[test]
    fn test_remove_then_remove_again() {
        let engine = engine();
        let post = engine.add_schedule("bye", "0 9 * * *", false).unwrap();
        assert!(engine.remove_schedule(&post.id));
        assert!(engine.list_schedules().is_empty());
        assert!(!engine.remove_schedule(&post.id));
    }

    #[tokio::test]
    async fn test_one_shot_removed_after_successful_firing() {
        let engine = engine();
        let client = StubClient::ok();
        let post = engine.add_schedule("once only", "0 9 * * *", true).unwrap();

        engine.fire(&post.id, client.clone()).await;

        assert_eq!(client.submitted(), vec!["once only"]);
        assert!(engine.list_schedules().is_empty());
    }

    #[tokio::test]
    async fn test_recurring_counts_two_firings() {
        let engine = engine();
        let client = StubClient::ok();
        let post = engine.add_schedule("daily", "0 9 * * *", false).unwrap();

        engine.fire(&post.id, client.clone()).await;
        let after_first = engine.list_schedules()[0].clone();
        engine.fire(&post.id, client.clone()).await;

        let after_second = &engine.list_schedules()[0];
        assert_eq!(after_second.post_count, 2);
        assert!(after_second.last_posted >= after_first.last_posted);
        assert_eq!(client.submitted(), vec!["daily", "daily"]);
    }

    #[tokio::test]
    async fn test_failed_firing_mutates_nothing() {
        let engine = engine();
        let post = engine.add_schedule("flaky", "0 9 * * *", true).unwrap();
        let before = engine.list_schedules();

        engine.fire(&post.id, StubClient::failing()).await;

        // Entry still present, untouched — even the one-shot flag stays.
        assert_eq!(engine.list_schedules(), before);
    }

    #[tokio::test]
    async fn test_firing_after_concurrent_remove_is_skipped() {
        let engine = engine();
        let client = StubClient::ok();
        let post = engine.add_schedule("gone soon", "0 9 * * *", false).unwrap();
        engine.remove_schedule(&post.id);

        engine.fire(&post.id, client.clone()).await;

        assert!(client.submitted().is_empty());
        assert!(engine.list_schedules().is_empty());
    }

    #[tokio::test]
    async fn test_start_arms_one_timer_per_entry_and_shutdown_drains() {
        let engine = engine();
        engine.add_schedule("a", "0 9 * * *", false).unwrap();
        engine.add_schedule("b", "30 12 * * *", false).unwrap();

        engine.start(StubClient::ok());
        assert_eq!(engine.timer_count(), 2);

        engine.shutdown().await;
        assert_eq!(engine.timer_count(), 0);
    }

    #[tokio::test]
    async fn test_start_with_empty_store_is_idle() {
        let engine = engine();
        engine.start(StubClient::ok());
        assert_eq!(engine.timer_count(), 0);
    }

    #[tokio::test]
    async fn test_add_while_running_arms_timer_immediately() {
        let engine = engine();
        engine.start(StubClient::ok());
        let post = engine.add_schedule("late join", "0 9 * * *", false).unwrap();
        assert_eq!(engine.timer_count(), 1);

        // Remove tears the timer down again.
        assert!(engine.remove_schedule(&post.id));
        assert_eq!(engine.timer_count(), 0);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_started_firing() {
        let engine = engine();
        let client = StubClient::slow(std::time::Duration::from_millis(50));
        let post = engine.add_schedule("finish me", "0 9 * * *", false).unwrap();

        // Firing is suspended inside submit_post when shutdown arrives.
        engine.spawn_firing(&post.id, client.clone());
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        engine.shutdown().await;

        assert_eq!(client.submitted(), vec!["finish me"]);
        assert_eq!(engine.list_schedules()[0].post_count, 1);
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let engine = engine();
        let client = StubClient::ok();

        let post = engine
            .add_schedule("Good morning ☀️", "0 9 * * *", false)
            .unwrap();
        assert!(!post.one_time);
        assert_eq!(engine.list_schedules().len(), 1);

        engine.fire(&post.id, client.clone()).await;
        let fired = &engine.list_schedules()[0];
        assert_eq!(fired.post_count, 1);
        assert!(fired.last_posted.is_some());

        assert!(engine.remove_schedule(&post.id));
        assert!(engine.list_schedules().is_empty());
    }
}
