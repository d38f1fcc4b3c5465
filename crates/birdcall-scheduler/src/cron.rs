//! Five-field cron expression parsing.
//! Supports: "MIN HOUR DOM MON DOW" (no seconds field)
//! Field syntax: *, N, a-b, comma lists, and /step on any of those.
//! Example: "0 9 * * 1-5" = weekdays at 9:00.
//!
//! No cron crate dependency — the subset above is the whole language.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

/// A parsed cron expression, expanded into the matching value sets.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    days_of_week: Vec<u32>,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSchedule {
    /// Parse an expression, with a descriptive error naming the bad field.
    pub fn parse(expression: &str) -> Result<Self, String> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(format!(
                "expected 5 fields (minute hour day-of-month month day-of-week), got {}",
                parts.len()
            ));
        }

        let minutes = parse_field(parts[0], 0, 59)
            .map_err(|e| format!("minute field '{}': {e}", parts[0]))?;
        let hours =
            parse_field(parts[1], 0, 23).map_err(|e| format!("hour field '{}': {e}", parts[1]))?;
        let days_of_month = parse_field(parts[2], 1, 31)
            .map_err(|e| format!("day-of-month field '{}': {e}", parts[2]))?;
        let months =
            parse_field(parts[3], 1, 12).map_err(|e| format!("month field '{}': {e}", parts[3]))?;
        // Day of week accepts 0-7, with 7 meaning Sunday like 0.
        let mut days_of_week = parse_field(parts[4], 0, 7)
            .map_err(|e| format!("day-of-week field '{}': {e}", parts[4]))?;
        for d in days_of_week.iter_mut() {
            if *d == 7 {
                *d = 0;
            }
        }
        days_of_week.sort_unstable();
        days_of_week.dedup();

        Ok(Self {
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted: parts[2] != "*",
            dow_restricted: parts[4] != "*",
        })
    }

    /// Whether a (whole-minute) instant satisfies this schedule.
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        if !self.minutes.contains(&at.minute())
            || !self.hours.contains(&at.hour())
            || !self.months.contains(&at.month())
        {
            return false;
        }
        let dom_ok = self.days_of_month.contains(&at.day());
        let dow_ok = self
            .days_of_week
            .contains(&at.weekday().num_days_from_sunday());
        // Vixie cron: when both day fields are restricted, either may match.
        if self.dom_restricted && self.dow_restricted {
            dom_ok || dow_ok
        } else {
            dom_ok && dow_ok
        }
    }

    /// Next matching instant strictly after `after`, scanning minute by
    /// minute up to a year ahead.
    pub fn next_run(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = after + Duration::minutes(1);
        candidate = candidate
            .with_second(0)
            .and_then(|c| c.with_nanosecond(0))
            .unwrap_or(candidate);

        for _ in 0..(366 * 24 * 60) {
            if self.matches(candidate) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

/// Validate an expression without keeping the parse.
pub fn is_valid(expression: &str) -> bool {
    CronSchedule::parse(expression).is_ok()
}

/// Parse-and-compute helper used by the timer loop.
pub fn next_run_after(expression: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match CronSchedule::parse(expression) {
        Ok(schedule) => schedule.next_run(after),
        Err(e) => {
            tracing::warn!("Invalid cron expression '{expression}': {e}");
            None
        }
    }
}

/// Expand one field into its matching values.
/// Steps attach per comma part, so "1-5/2,30" is {1, 3, 5, 30}.
fn parse_field(field: &str, min: u32, max: u32) -> Result<Vec<u32>, String> {
    let mut values = Vec::new();

    for part in field.split(',') {
        let (spec, step) = match part.split_once('/') {
            Some((spec, step_str)) => {
                let step: u32 = step_str
                    .parse()
                    .map_err(|_| format!("bad step '{step_str}'"))?;
                if step == 0 {
                    return Err("step must be nonzero".into());
                }
                (spec, step)
            }
            None => (part, 1),
        };

        let (lo, hi) = if spec == "*" {
            (min, max)
        } else if let Some((a, b)) = spec.split_once('-') {
            let lo: u32 = a.parse().map_err(|_| format!("not a number: '{a}'"))?;
            let hi: u32 = b.parse().map_err(|_| format!("not a number: '{b}'"))?;
            if lo > hi {
                return Err(format!("range {lo}-{hi} is backwards"));
            }
            (lo, hi)
        } else {
            let v: u32 = spec.parse().map_err(|_| format!("not a number: '{spec}'"))?;
            (v, v)
        };

        if lo < min || hi > max {
            return Err(format!("value out of range {min}-{max}"));
        }
        values.extend((lo..=hi).step_by(step as usize));
    }

    if values.is_empty() {
        return Err("empty field".into());
    }
    values.sort_unstable();
    values.dedup();
    Ok(values)
}
