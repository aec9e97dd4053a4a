//! Engagement arithmetic over send/open/click counters
//!
//! All windows are UTC. Click rate may exceed open rate when a mail client
//! blocks images but follows links; that is expected.

use crate::constants::SECONDS_PER_DAY;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use leadflow_types::{EngagementBucket, EngagementWindow, SentEmail, TrackingEvent, TrackingKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Whole-percent rate, `0` when the denominator is `0`
///
/// Rounds half away from zero: 1/3 -> 33, 2/3 -> 67.
pub fn rate(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    (numerator as f64 / denominator as f64 * 100.0).round() as u32
}

/// Mean of open and click rate, rounded
pub fn engagement_score(open_rate: u32, click_rate: u32) -> u32 {
    ((open_rate as f64 + click_rate as f64) / 2.0).round() as u32
}

/// `now - days * 86400s`, no timezone or DST adjustment
///
/// Saturates at the earliest representable instant instead of overflowing.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::seconds(days as i64 * SECONDS_PER_DAY))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Calendar day of [`window_start`]
pub fn window_start_date(now: DateTime<Utc>, days: u32) -> NaiveDate {
    window_start(now, days).date_naive()
}

/// Percentages derived from an [`EngagementWindow`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngagementRates {
    pub open_rate: u32,
    pub click_rate: u32,
    /// Share of sent emails with any open or click
    pub engagement_rate: u32,
    pub engagement_score: u32,
}

impl EngagementRates {
    pub fn from_counts(sent: u64, opened: u64, clicked: u64, engaged: u64) -> Self {
        let open_rate = rate(opened, sent);
        let click_rate = rate(clicked, sent);
        Self {
            open_rate,
            click_rate,
            engagement_rate: rate(engaged, sent),
            engagement_score: engagement_score(open_rate, click_rate),
        }
    }
}

impl From<&EngagementWindow> for EngagementRates {
    fn from(window: &EngagementWindow) -> Self {
        Self::from_counts(window.sent, window.opened, window.clicked, window.engaged)
    }
}

/// Counts for emails sent in `[start, end)` and the events that reference them
///
/// Each email counts at most once per category. Events outside the window or
/// pointing at an unknown email are ignored; the latter are logged.
pub fn aggregate_window(
    sent_emails: &[SentEmail],
    events: &[TrackingEvent],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> EngagementWindow {
    let known: HashSet<i64> = sent_emails.iter().map(|e| e.id).collect();
    let in_window: HashSet<i64> = sent_emails
        .iter()
        .filter(|e| e.sent_at >= start && e.sent_at < end)
        .map(|e| e.id)
        .collect();

    let mut opened = HashSet::new();
    let mut clicked = HashSet::new();

    for event in events {
        if !known.contains(&event.sent_email_id) {
            log::warn!(
                "Skipping {:?} event for unknown sent email {}",
                event.kind,
                event.sent_email_id
            );
            continue;
        }
        if !in_window.contains(&event.sent_email_id) || event.occurred_at >= end {
            continue;
        }
        match event.kind {
            TrackingKind::Open => opened.insert(event.sent_email_id),
            TrackingKind::Click => clicked.insert(event.sent_email_id),
        };
    }

    let engaged = opened.union(&clicked).count() as u64;

    EngagementWindow {
        start,
        end,
        sent: in_window.len() as u64,
        opened: opened.len() as u64,
        clicked: clicked.len() as u64,
        engaged,
    }
}

/// One bucket per UTC day from `start` to `end` inclusive
///
/// Sends are bucketed by send day, opens and clicks by event day, each email
/// counted once per day and category.
pub fn daily_trend(
    sent_emails: &[SentEmail],
    events: &[TrackingEvent],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<EngagementBucket> {
    let first = start.date_naive();
    let last = end.date_naive();
    if last < first {
        return Vec::new();
    }

    let known: HashSet<i64> = sent_emails.iter().map(|e| e.id).collect();

    let mut sent: HashMap<NaiveDate, u64> = HashMap::new();
    for email in sent_emails {
        let day = email.sent_at.date_naive();
        if day >= first && day <= last {
            *sent.entry(day).or_default() += 1;
        }
    }

    let mut opened: HashMap<NaiveDate, HashSet<i64>> = HashMap::new();
    let mut clicked: HashMap<NaiveDate, HashSet<i64>> = HashMap::new();
    for event in events.iter().filter(|e| known.contains(&e.sent_email_id)) {
        let day = event.occurred_at.date_naive();
        if day < first || day > last {
            continue;
        }
        let target = match event.kind {
            TrackingKind::Open => &mut opened,
            TrackingKind::Click => &mut clicked,
        };
        target.entry(day).or_default().insert(event.sent_email_id);
    }

    let mut buckets = Vec::new();
    let mut day = first;
    while day <= last {
        buckets.push(EngagementBucket {
            date: day,
            sent: sent.get(&day).copied().unwrap_or(0),
            opened: opened.get(&day).map(|s| s.len() as u64).unwrap_or(0),
            clicked: clicked.get(&day).map(|s| s.len() as u64).unwrap_or(0),
        });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    buckets
}
