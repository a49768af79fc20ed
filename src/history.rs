//! Archive of finalized days, one `history_<YYYY-MM-DD>` key per date.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::clock::{date_key, parse_date_key};
use crate::error::Result;
use crate::storage::{LocalStore, StoreExt, HISTORY_PREFIX};
use crate::streak::is_perfect;
use crate::task::Task;

/// A finalized day as it was at finalize time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

impl HistoryEntry {
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }

    pub fn is_perfect(&self) -> bool {
        is_perfect(&self.tasks)
    }
}

pub fn history_key(date: NaiveDate) -> String {
    format!("{HISTORY_PREFIX}{}", date_key(date))
}

pub struct HistoryArchive {
    store: Arc<dyn LocalStore>,
}

impl HistoryArchive {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Write the entry for `date`, replacing any earlier one
    pub fn record(&self, date: NaiveDate, tasks: &[Task]) -> Result<()> {
        self.store.save(&history_key(date), tasks)?;
        tracing::debug!(date = %date, tasks = tasks.len(), "day archived");
        Ok(())
    }

    pub fn get(&self, date: NaiveDate) -> Option<HistoryEntry> {
        self.store
            .load::<Vec<Task>>(&history_key(date))
            .map(|tasks| HistoryEntry { date, tasks })
    }

    /// Every archived day, most recent first
    ///
    /// Keys whose date suffix does not parse, and values that are not task
    /// arrays, are skipped.
    pub fn list_all(&self) -> Result<Vec<HistoryEntry>> {
        let mut keys: Vec<String> = self
            .store
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(HISTORY_PREFIX))
            .collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(date) = parse_date_key(&key[HISTORY_PREFIX.len()..]) else {
                tracing::warn!(key = %key, "skipping history key with an invalid date");
                continue;
            };
            if let Some(tasks) = self.store.load::<Vec<Task>>(&key) {
                entries.push(HistoryEntry { date, tasks });
            }
        }

        Ok(entries)
    }
}
