//! Session history and derived aggregates.
//!
//! History is append-only. The per-day map is updated incrementally on every
//! append and rebuilt from scratch whenever history is trimmed, so the two
//! can never disagree.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{Mode, Phase};

/// One finished phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryItem {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: u64,
    pub mode: Mode,
    pub phase: Phase,
    pub task_name: String,
    pub completed_at: DateTime<Utc>,
}

/// Aggregate for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// `YYYY-MM-DD` in the local time zone
    pub date: String,
    /// Every finished phase, breaks included
    pub sessions: u32,
    /// Work phases only
    pub focus_time_seconds: u64,
    /// Finished work phases per task name
    #[serde(default)]
    pub per_task_session_counts: BTreeMap<String, u32>,
}

impl DailyStats {
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            sessions: 0,
            focus_time_seconds: 0,
            per_task_session_counts: BTreeMap::new(),
        }
    }

    fn absorb(&mut self, item: &SessionHistoryItem) {
        self.sessions += 1;
        if item.phase == Phase::Work {
            self.focus_time_seconds += item.duration_seconds;
            if !item.task_name.is_empty() {
                *self
                    .per_task_session_counts
                    .entry(item.task_name.clone())
                    .or_insert(0) += 1;
            }
        }
    }
}

/// Work-phase totals over some window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsTotals {
    pub sessions: u32,
    pub focus_time_seconds: u64,
}

impl StatsTotals {
    fn from_work_items<'a>(items: impl Iterator<Item = &'a SessionHistoryItem>) -> Self {
        items
            .filter(|item| item.phase == Phase::Work)
            .fold(Self::default(), |acc, item| Self {
                sessions: acc.sessions + 1,
                focus_time_seconds: acc.focus_time_seconds + item.duration_seconds,
            })
    }
}

/// Local calendar-date key for a timestamp.
pub fn date_key(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecorder {
    #[serde(default)]
    session_history: Vec<SessionHistoryItem>,
    #[serde(default)]
    daily_stats: BTreeMap<String, DailyStats>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[SessionHistoryItem] {
        &self.session_history
    }

    pub fn daily_stats(&self) -> &BTreeMap<String, DailyStats> {
        &self.daily_stats
    }

    /// Append a finished phase stamped with the current time.
    pub fn record_completion(
        &mut self,
        duration_seconds: u64,
        mode: Mode,
        phase: Phase,
        task_name: &str,
    ) -> &SessionHistoryItem {
        self.record_completion_at(duration_seconds, mode, phase, task_name, Utc::now())
    }

    pub fn record_completion_at(
        &mut self,
        duration_seconds: u64,
        mode: Mode,
        phase: Phase,
        task_name: &str,
        at: DateTime<Utc>,
    ) -> &SessionHistoryItem {
        let item = SessionHistoryItem {
            id: Uuid::new_v4().to_string(),
            timestamp: at,
            duration_seconds,
            mode,
            phase,
            task_name: task_name.to_string(),
            completed_at: at,
        };

        let key = date_key(at);
        self.daily_stats
            .entry(key.clone())
            .or_insert_with(|| DailyStats::empty(key))
            .absorb(&item);

        self.session_history.push(item);
        let last = self.session_history.len() - 1;
        &self.session_history[last]
    }

    pub fn stats_for_date(&self, date: &str) -> Option<&DailyStats> {
        self.daily_stats.get(date)
    }

    /// Work phases completed in the trailing 7×24h.
    pub fn weekly_stats(&self) -> StatsTotals {
        self.weekly_stats_at(Utc::now())
    }

    pub fn weekly_stats_at(&self, now: DateTime<Utc>) -> StatsTotals {
        let since = now - Duration::days(7);
        StatsTotals::from_work_items(
            self.session_history
                .iter()
                .filter(|item| item.timestamp >= since),
        )
    }

    /// Work phases across all retained history.
    pub fn total_stats(&self) -> StatsTotals {
        StatsTotals::from_work_items(self.session_history.iter())
    }

    pub fn today_stats(&self) -> DailyStats {
        self.today_stats_at(Utc::now())
    }

    pub fn today_stats_at(&self, now: DateTime<Utc>) -> DailyStats {
        let key = date_key(now);
        self.daily_stats
            .get(&key)
            .cloned()
            .unwrap_or_else(|| DailyStats::empty(key))
    }

    /// Drop history older than `max_age_days` and rebuild the daily map.
    /// Returns the number of removed items. A window reaching past the
    /// earliest representable date keeps everything.
    pub fn trim_history(&mut self, max_age_days: u32) -> usize {
        self.trim_history_at(max_age_days, Utc::now())
    }

    pub fn trim_history_at(&mut self, max_age_days: u32, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = Duration::try_days(i64::from(max_age_days))
            .and_then(|window| now.checked_sub_signed(window))
        else {
            return 0;
        };
        let before = self.session_history.len();
        self.session_history.retain(|item| item.timestamp >= cutoff);
        self.daily_stats = rebuild_daily_stats(&self.session_history);
        before - self.session_history.len()
    }
}

fn rebuild_daily_stats(history: &[SessionHistoryItem]) -> BTreeMap<String, DailyStats> {
    let mut daily: BTreeMap<String, DailyStats> = BTreeMap::new();
    for item in history {
        let key = date_key(item.timestamp);
        daily
            .entry(key.clone())
            .or_insert_with(|| DailyStats::empty(key))
            .absorb(item);
    }
    daily
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(hours_ago: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(hours_ago)
    }

    #[test]
    fn record_updates_history_and_today() {
        let mut recorder = SessionRecorder::new();
        let now = Utc::now();
        let item = recorder
            .record_completion_at(1500, Mode::Pomodoro, Phase::Work, "essay", now)
            .clone();
        recorder.record_completion_at(300, Mode::Pomodoro, Phase::Break, "essay", now);

        assert_eq!(recorder.history().len(), 2);
        assert_eq!(item.timestamp, item.completed_at);

        let today = recorder.today_stats_at(now);
        assert_eq!(today.date, date_key(now));
        assert_eq!(today.sessions, 2);
        assert_eq!(today.focus_time_seconds, 1500);
        assert_eq!(today.per_task_session_counts.get("essay"), Some(&1));
    }

    #[test]
    fn ids_are_unique() {
        let mut recorder = SessionRecorder::new();
        let a = recorder
            .record_completion(60, Mode::Custom, Phase::Work, "")
            .id
            .clone();
        let b = recorder
            .record_completion(60, Mode::Custom, Phase::Work, "")
            .id
            .clone();
        assert_ne!(a, b);
    }

    #[test]
    fn today_is_empty_without_history() {
        let recorder = SessionRecorder::new();
        let now = Utc::now();
        let today = recorder.today_stats_at(now);
        assert_eq!(today, DailyStats::empty(date_key(now)));
        assert!(recorder.stats_for_date(&date_key(now)).is_none());
    }

    #[test]
    fn weekly_counts_recent_work_only() {
        let mut recorder = SessionRecorder::new();
        let now = Utc::now();
        recorder.record_completion_at(1500, Mode::Pomodoro, Phase::Work, "", at(24, now));
        recorder.record_completion_at(300, Mode::Pomodoro, Phase::Break, "", at(24, now));
        recorder.record_completion_at(2400, Mode::Animedoro, Phase::Work, "", at(24 * 6, now));
        recorder.record_completion_at(1500, Mode::Pomodoro, Phase::Work, "", at(24 * 8, now));

        assert_eq!(
            recorder.weekly_stats_at(now),
            StatsTotals {
                sessions: 2,
                focus_time_seconds: 3900
            }
        );
        assert_eq!(
            recorder.total_stats(),
            StatsTotals {
                sessions: 3,
                focus_time_seconds: 5400
            }
        );
    }

    #[test]
    fn trim_rebuilds_daily_map() {
        let mut recorder = SessionRecorder::new();
        let now = Utc::now();
        let old = at(24 * 40, now);
        recorder.record_completion_at(1500, Mode::Pomodoro, Phase::Work, "old", old);
        recorder.record_completion_at(1500, Mode::Pomodoro, Phase::Work, "new", now);

        assert_eq!(recorder.trim_history_at(30, now), 1);
        assert_eq!(recorder.history().len(), 1);
        assert!(recorder.stats_for_date(&date_key(old)).is_none());
        assert_eq!(recorder.today_stats_at(now).sessions, 1);
    }

    #[test]
    fn trim_with_oversized_window_keeps_everything() {
        let now = Utc::now();
        let mut recorder = SessionRecorder::new();
        recorder.record_completion_at(1500, Mode::Pomodoro, Phase::Work, "a", at(24 * 900, now));
        recorder.record_completion_at(300, Mode::Pomodoro, Phase::Break, "a", at(1, now));

        assert_eq!(recorder.trim_history_at(u32::MAX, now), 0);
        assert_eq!(recorder.history().len(), 2);
        assert_eq!(recorder.trim_history(u32::MAX), 0);
        assert_eq!(recorder.daily_stats().len(), 2);
    }

    #[derive(Debug, Clone)]
    struct Entry {
        hours_ago: i64,
        work: bool,
        duration: u64,
    }

    fn entry() -> impl Strategy<Value = Entry> {
        (0_i64..24 * 60, any::<bool>(), 1_u64..4000).prop_map(|(hours_ago, work, duration)| {
            Entry {
                hours_ago,
                work,
                duration,
            }
        })
    }

    proptest! {
        #[test]
        fn trim_then_totals_matches_filtered_history(
            entries in prop::collection::vec(entry(), 0..60),
            keep_days in 0_u32..60,
        ) {
            let now = Utc::now();
            let mut recorder = SessionRecorder::new();
            for e in &entries {
                let phase = if e.work { Phase::Work } else { Phase::Break };
                recorder.record_completion_at(e.duration, Mode::Pomodoro, phase, "t", at(e.hours_ago, now));
            }
            let original = recorder.history().to_vec();

            recorder.trim_history_at(keep_days, now);

            let cutoff = now - Duration::days(i64::from(keep_days));
            let expected = StatsTotals::from_work_items(
                original.iter().filter(|item| item.timestamp >= cutoff),
            );
            prop_assert_eq!(recorder.total_stats(), expected);

            let daily_sessions: u32 = recorder.daily_stats().values().map(|d| d.sessions).sum();
            prop_assert_eq!(daily_sessions as usize, recorder.history().len());
            let daily_focus: u64 = recorder.daily_stats().values().map(|d| d.focus_time_seconds).sum();
            prop_assert_eq!(daily_focus, expected.focus_time_seconds);
        }
    }
}
