//! Scheduled post definitions — the unit of persisted state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform character limit, enforced once at creation time.
pub const MAX_POST_CHARS: usize = 280;

/// A post waiting to be published on its cron schedule.
///
/// Field names in the persisted JSON are camelCase for compatibility with
/// the schedule files written by earlier releases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPost {
    /// Unique id, generated at creation.
    pub id: String,
    /// The post body, trimmed. Never re-validated after creation.
    pub text: String,
    /// Five-field cron expression, stored verbatim.
    pub cron_expression: String,
    /// One-shot entries are deleted after their first successful firing.
    pub one_time: bool,
    /// Creation timestamp, immutable.
    pub created_at: DateTime<Utc>,
    /// Set after each successful firing.
    pub last_posted: Option<DateTime<Utc>>,
    /// How many times this post has been published.
    pub post_count: u32,
}

impl ScheduledPost {
    /// Build a fresh entry. Callers validate `text` and `expression` first;
    /// this constructor only assembles state.
    pub fn new(text: &str, expression: &str, one_time: bool) -> Self {
        Self {
            id: generate_id(),
            text: text.to_string(),
            cron_expression: expression.to_string(),
            one_time,
            created_at: Utc::now(),
            last_posted: None,
            post_count: 0,
        }
    }
}

/// Time-based id with a random suffix — collision-safe within one process.
fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    format!("post-{:x}-{:04x}", millis, rand::random::<u16>())
}
