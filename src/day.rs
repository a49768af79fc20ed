//! The planner ties the components together and runs the finalize protocol.
//!
//! Finalize, in order:
//! 1. take today's date from the clock
//! 2. archive a snapshot of the working set under that date (overwriting)
//! 3. update and persist the streak from the same snapshot
//! 4. try to upload the snapshot; failure is logged, nothing is rolled back
//! 5. clear the working set
//! 6. report whether the day was perfect

use std::sync::Arc;

use chrono::NaiveDate;

use crate::clock::Clock;
use crate::error::Result;
use crate::history::{HistoryArchive, HistoryEntry};
use crate::remote::RemoteSync;
use crate::stats::{self, Stats};
use crate::storage::LocalStore;
use crate::streak::{StreakEngine, StreakState};
use crate::task::{LoadSource, TaskSetManager};
use crate::tier::{Feature, TierGate};

/// Outcome of one finalize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizedDay {
    pub date: NaiveDate,
    pub perfect: bool,
    pub streak: StreakState,
}

pub struct Planner {
    tasks: TaskSetManager,
    streak: StreakEngine,
    archive: HistoryArchive,
    tier: TierGate,
    remote: Arc<dyn RemoteSync>,
    clock: Arc<dyn Clock>,
}

impl Planner {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteSync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks: TaskSetManager::new(store.clone(), clock.clone()),
            streak: StreakEngine::new(store.clone()),
            archive: HistoryArchive::new(store.clone()),
            tier: TierGate::new(store, remote.clone()),
            remote,
            clock,
        }
    }

    /// Load the working set (stored, else remote, else empty)
    pub async fn load(&mut self) -> Result<LoadSource> {
        self.tasks.load_working_set(self.remote.as_ref()).await
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn tasks(&self) -> &TaskSetManager {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskSetManager {
        &mut self.tasks
    }

    pub fn tier(&self) -> &TierGate {
        &self.tier
    }

    pub fn streak(&self) -> StreakState {
        self.streak.load()
    }

    /// Close out today: archive, score the streak, upload, clear
    ///
    /// Returns whether the day was perfect. Upload failures do not affect the
    /// result or the local record.
    ///
    /// Not idempotent: each call re-scores the streak from the stored state
    /// and re-archives whatever the working set holds, so finalize at most
    /// once per day. A second call on the same date archives the (now empty)
    /// set over the first snapshot and zeroes the streak.
    pub async fn finalize(&mut self) -> Result<bool> {
        Ok(self.finalize_day().await?.perfect)
    }

    /// `finalize`, reporting the date the day was archived under and the
    /// resulting streak
    pub async fn finalize_day(&mut self) -> Result<FinalizedDay> {
        let today = self.clock.today();
        let snapshot = self.tasks.snapshot();

        self.archive.record(today, &snapshot)?;
        let update = self.streak.record_day(today, &snapshot)?;

        match self.remote.upload_day(&snapshot).await {
            Ok(ack) => {
                tracing::debug!(status = %ack.status, count = ack.count, "day uploaded");
            }
            Err(err) => {
                tracing::warn!(date = %today, error = %err, "upload failed; local record kept");
            }
        }

        self.tasks.clear()?;

        tracing::info!(
            date = %today,
            perfect = update.perfect,
            streak = update.current.count,
            "day finalized"
        );
        Ok(FinalizedDay {
            date: today,
            perfect: update.perfect,
            streak: update.current,
        })
    }

    /// Archived days, newest first (plus tier and up)
    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.tier.require(Feature::History)?;
        self.archive.list_all()
    }

    /// One archived day, if any (plus tier and up)
    pub fn history_day(&self, date: NaiveDate) -> Result<Option<HistoryEntry>> {
        self.tier.require(Feature::History)?;
        Ok(self.archive.get(date))
    }

    /// Analytics over the archive (pro tier)
    pub fn stats(&self) -> Result<Stats> {
        self.tier.require(Feature::Analytics)?;
        let entries = self.archive.list_all()?;
        Ok(stats::summarize(
            &entries,
            self.streak.load(),
            self.clock.today(),
        ))
    }
}
