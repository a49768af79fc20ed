//! Perfect-day streak.
//!
//! A day is perfect when it holds exactly six tasks and all are completed.
//! The streak grows by one when today's perfect day directly follows the last
//! perfect day, restarts at one after a gap, and drops to zero on any
//! non-perfect finalize.
//!
//! Stored as two keys, `streak` (stringified count) and `last_completed_day`,
//! always written together in one store batch.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::clock::{date_key, parse_date_key};
use crate::error::Result;
use crate::storage::{LocalStore, LAST_COMPLETED_KEY, STREAK_KEY};
use crate::task::{Task, MAX_TASKS};

/// Whether `tasks` make a perfect day
pub fn is_perfect(tasks: &[Task]) -> bool {
    tasks.len() == MAX_TASKS && tasks.iter().all(|task| task.completed)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakState {
    pub count: u32,
    pub last_completed_date: Option<NaiveDate>,
}

impl StreakState {
    /// State after finalizing `today`
    pub fn advance(self, today: NaiveDate, perfect: bool) -> StreakState {
        if !perfect {
            return StreakState {
                count: 0,
                last_completed_date: self.last_completed_date,
            };
        }

        let yesterday = today.pred_opt();
        let count = if yesterday.is_some() && self.last_completed_date == yesterday {
            self.count.saturating_add(1)
        } else {
            1
        };

        StreakState {
            count,
            last_completed_date: Some(today),
        }
    }

    /// True while the streak can still be extended by finalizing `today`
    /// (or already was)
    pub fn is_live(&self, today: NaiveDate) -> bool {
        if self.count == 0 {
            return false;
        }
        match self.last_completed_date {
            Some(last) => last == today || Some(last) == today.pred_opt(),
            None => false,
        }
    }
}

/// Result of recording one finalized day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakUpdate {
    pub perfect: bool,
    pub previous: StreakState,
    pub current: StreakState,
}

pub struct StreakEngine {
    store: Arc<dyn LocalStore>,
}

impl StreakEngine {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Read the persisted streak; unreadable fields fall back to empty
    pub fn load(&self) -> StreakState {
        let count = read_value(self.store.as_ref(), STREAK_KEY)
            .and_then(|value| parse_count(&value))
            .unwrap_or(0);
        let last_completed_date = read_value(self.store.as_ref(), LAST_COMPLETED_KEY)
            .and_then(|value| value.as_str().and_then(parse_date_key));

        StreakState {
            count,
            last_completed_date,
        }
    }

    /// Apply one finalized day and persist the new state
    ///
    /// Recomputes from whatever is stored right now, so recording the same
    /// date twice evaluates twice.
    pub fn record_day(&self, today: NaiveDate, tasks: &[Task]) -> Result<StreakUpdate> {
        let perfect = is_perfect(tasks);
        let previous = self.load();
        let current = previous.advance(today, perfect);
        self.persist(&current)?;

        tracing::debug!(
            date = %today,
            perfect,
            count = current.count,
            "streak updated"
        );

        Ok(StreakUpdate {
            perfect,
            previous,
            current,
        })
    }

    fn persist(&self, state: &StreakState) -> Result<()> {
        self.store.set_many(vec![
            (
                STREAK_KEY.to_string(),
                Some(Value::String(state.count.to_string())),
            ),
            (
                LAST_COMPLETED_KEY.to_string(),
                state
                    .last_completed_date
                    .map(|date| Value::String(date_key(date))),
            ),
        ])
    }
}

fn read_value(store: &dyn LocalStore, key: &str) -> Option<Value> {
    match store.get(key) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to read streak field");
            None
        }
    }
}

fn parse_count(value: &Value) -> Option<u32> {
    let parsed = match value {
        Value::String(raw) => raw.trim().parse::<u32>().ok(),
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    };
    if parsed.is_none() {
        tracing::warn!(%value, "ignoring malformed streak count");
    }
    parsed
}
