//! Analytics over the history archive: per-day completion, rank frequency,
//! totals, and milestone badges.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::history::HistoryEntry;
use crate::streak::StreakState;
use crate::task::{MAX_RANK, MIN_RANK};

/// Completion for one archived day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCompletion {
    pub date: NaiveDate,
    pub completed: usize,
    pub total: usize,
    pub perfect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    /// Streak of at least three perfect days
    Streak3,
    /// Streak of at least seven perfect days
    Streak7,
    /// One hundred completed tasks in the archive
    Tasks100,
}

impl Milestone {
    pub fn title(self) -> &'static str {
        match self {
            Milestone::Streak3 => "Three perfect days in a row",
            Milestone::Streak7 => "A perfect week",
            Milestone::Tasks100 => "100 tasks completed",
        }
    }

    fn reached(self, streak: u32, completed: usize) -> bool {
        match self {
            Milestone::Streak3 => streak >= 3,
            Milestone::Streak7 => streak >= 7,
            Milestone::Tasks100 => completed >= 100,
        }
    }
}

const MILESTONES: [Milestone; 3] = [Milestone::Streak3, Milestone::Streak7, Milestone::Tasks100];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Newest first, mirroring the archive order
    pub days: Vec<DayCompletion>,
    /// Archived tasks per rank, every rank 1..=6 present
    pub rank_frequency: BTreeMap<u8, usize>,
    pub days_archived: usize,
    pub perfect_days: usize,
    pub tasks_archived: usize,
    pub tasks_completed: usize,
    /// Current streak; a lapsed streak counts as zero
    pub streak: u32,
    pub milestones: Vec<Milestone>,
}

/// Summarize `entries` (as returned by `HistoryArchive::list_all`) as of
/// `today`
///
/// Streak milestones only count while the streak is live.
pub fn summarize(entries: &[HistoryEntry], streak: StreakState, today: NaiveDate) -> Stats {
    let mut rank_frequency: BTreeMap<u8, usize> =
        (MIN_RANK..=MAX_RANK).map(|rank| (rank, 0)).collect();

    let days: Vec<DayCompletion> = entries
        .iter()
        .map(|entry| {
            for task in &entry.tasks {
                if let Some(count) = rank_frequency.get_mut(&task.rank) {
                    *count += 1;
                }
            }
            DayCompletion {
                date: entry.date,
                completed: entry.completed_count(),
                total: entry.tasks.len(),
                perfect: entry.is_perfect(),
            }
        })
        .collect();

    let perfect_days = days.iter().filter(|day| day.perfect).count();
    let tasks_archived: usize = days.iter().map(|day| day.total).sum();
    let tasks_completed: usize = days.iter().map(|day| day.completed).sum();
    let current_streak = if streak.is_live(today) { streak.count } else { 0 };
    let milestones = MILESTONES
        .into_iter()
        .filter(|milestone| milestone.reached(current_streak, tasks_completed))
        .collect();

    Stats {
        days_archived: days.len(),
        days,
        rank_frequency,
        perfect_days,
        tasks_archived,
        tasks_completed,
        streak: current_streak,
        milestones,
    }
}
