mod support;

use std::sync::Arc;

use async_trait::async_trait;
use power6::clock::FixedClock;
use power6::day::Planner;
use power6::error::{Error, Result};
use power6::remote::{RemoteSync, UploadAck};
use power6::history::HistoryArchive;
use power6::storage::{LocalStore, MemoryStore, StoreExt, STREAK_KEY, TASKS_KEY};
use power6::streak::StreakEngine;
use power6::task::{LoadSource, Task};
use power6::tier::{Feature, Tier};

use support::{date, FakeRemote, Rig};

#[tokio::test]
async fn five_of_six_is_archived_but_breaks_the_streak() {
    let mut rig = Rig::new(date("2024-05-01"), FakeRemote::unreachable());
    rig.store
        .set(STREAK_KEY, serde_json::json!("4"))
        .expect("seed streak");
    rig.planner.load().await.expect("load");
    let snapshot = rig.fill(6, 5);

    let perfect = rig.planner.finalize().await.expect("finalize");
    assert!(!perfect);

    let archive = HistoryArchive::new(rig.store.clone());
    let entry = archive.get(date("2024-05-01")).expect("archived");
    assert_eq!(entry.tasks, snapshot);
    assert_eq!(entry.completed_count(), 5);

    assert_eq!(rig.planner.streak().count, 0);
    assert!(rig.planner.tasks().is_empty());
    assert!(rig.store.get(TASKS_KEY).expect("get").is_none());
}

#[tokio::test]
async fn consecutive_perfect_days_extend_the_streak() {
    let mut rig = Rig::new(date("2024-05-01"), FakeRemote::unreachable());
    rig.planner.load().await.expect("load");

    rig.fill(6, 6);
    assert!(rig.planner.finalize().await.expect("day 1"));
    assert_eq!(rig.planner.streak().count, 1);

    rig.clock.advance_days(1);
    rig.fill(6, 6);
    assert!(rig.planner.finalize().await.expect("day 2"));
    let state = rig.planner.streak();
    assert_eq!(state.count, 2);
    assert_eq!(state.last_completed_date, Some(date("2024-05-02")));

    // Skip 2024-05-03.
    rig.clock.advance_days(2);
    rig.fill(6, 6);
    assert!(rig.planner.finalize().await.expect("day 4"));
    assert_eq!(rig.planner.streak().count, 1);

    // Stored as a string, the way the store has always held it.
    assert_eq!(
        rig.store.get(STREAK_KEY).expect("get"),
        Some(serde_json::json!("1"))
    );
}

#[tokio::test]
async fn fewer_than_six_tasks_is_never_perfect() {
    let mut rig = Rig::new(date("2024-05-01"), FakeRemote::unreachable());
    rig.planner.load().await.expect("load");
    rig.fill(3, 3);

    assert!(!rig.planner.finalize().await.expect("finalize"));
    assert_eq!(rig.planner.streak().count, 0);
}

#[tokio::test]
async fn upload_failure_keeps_local_record() {
    let remote = FakeRemote::unreachable();
    remote.accept_uploads(false);
    let mut rig = Rig::new(date("2024-05-01"), remote);
    rig.planner.load().await.expect("load");
    rig.fill(6, 6);

    let perfect = rig.planner.finalize().await.expect("finalize succeeds offline");
    assert!(perfect);
    assert!(rig.remote.uploads().is_empty());

    let archive = HistoryArchive::new(rig.store.clone());
    assert!(archive.get(date("2024-05-01")).is_some());
    assert_eq!(StreakEngine::new(rig.store.clone()).load().count, 1);
    assert!(rig.planner.tasks().is_empty());
}

#[tokio::test]
async fn upload_receives_the_finalized_snapshot() {
    let remote = FakeRemote::unreachable();
    remote.accept_uploads(true);
    let mut rig = Rig::new(date("2024-05-01"), remote);
    rig.planner.load().await.expect("load");
    let snapshot = rig.fill(4, 2);

    rig.planner.finalize().await.expect("finalize");
    assert_eq!(rig.remote.uploads(), vec![snapshot]);
}

#[tokio::test]
async fn finalizing_twice_overwrites_the_day() {
    let mut rig = Rig::new(date("2024-05-01"), FakeRemote::unreachable());
    rig.planner.load().await.expect("load");
    rig.fill(6, 6);
    assert!(rig.planner.finalize().await.expect("first"));

    assert!(!rig.planner.finalize().await.expect("second"));

    let entry = HistoryArchive::new(rig.store.clone())
        .get(date("2024-05-01"))
        .expect("archived");
    assert!(entry.tasks.is_empty());
    assert_eq!(rig.planner.streak().count, 0);
}

#[tokio::test]
async fn remote_tasks_seed_an_empty_day() {
    let remote_tasks: Vec<Task> = (1..=8)
        .map(|i| Task::new(i, format!("remote {i}"), u8::try_from((i - 1) % 6 + 1).unwrap()))
        .collect();
    let mut rig = Rig::new(date("2024-05-01"), FakeRemote::with_today(remote_tasks.clone()));

    let source = rig.planner.load().await.expect("load");
    assert_eq!(source, LoadSource::Remote);
    assert_eq!(rig.planner.tasks().tasks(), &remote_tasks[..6]);

    let persisted: Vec<Task> = rig.store.load(TASKS_KEY).expect("persisted");
    assert_eq!(persisted.len(), 6);
}

#[tokio::test]
async fn remote_tasks_are_sanitized_before_adoption() {
    let remote_tasks = vec![
        Task::new(1, "first", 1),
        Task::new(1, "duplicate id", 2),
        Task::new(2, "", 3),
        Task::new(3, "rank zero", 0),
        Task::new(4, "rank nine", 9),
        Task::new(5, "second", 2),
        Task::new(6, "third", 3),
        Task::new(7, "fourth", 4),
        Task::new(8, "fifth", 5),
        Task::new(9, "sixth", 6),
        Task::new(10, "seventh", 1),
    ];
    let mut rig = Rig::new(date("2024-05-01"), FakeRemote::with_today(remote_tasks));

    assert_eq!(rig.planner.load().await.expect("load"), LoadSource::Remote);
    let ids: Vec<u64> = rig.planner.tasks().tasks().iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![1, 5, 6, 7, 8, 9]);

    // Every adopted task is reachable by id, so the day can still be perfect.
    for id in ids {
        assert_eq!(
            rig.planner.tasks_mut().toggle_complete(id).expect("toggle"),
            Some(true)
        );
    }
    assert!(rig.planner.finalize().await.expect("finalize"));

    rig.planner.tier().set_tier(Tier::Pro).expect("set tier");
    let stats = rig.planner.stats().expect("stats");
    let ranks: Vec<u8> = stats.rank_frequency.keys().copied().collect();
    assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn stored_tasks_win_over_remote() {
    let remote = FakeRemote::with_today(vec![Task::new(1, "remote", 1)]);
    let mut rig = Rig::new(date("2024-05-01"), remote);
    rig.planner.load().await.expect("load");
    rig.fill(2, 0);

    let mut reopened = rig.reopen();
    assert_eq!(reopened.load().await.expect("reload"), LoadSource::Local);
    assert_eq!(reopened.tasks().len(), 2);
    assert!(reopened.tasks().tasks().iter().all(|task| task.text != "remote"));
}

#[tokio::test]
async fn unreachable_remote_starts_empty() {
    let mut rig = Rig::new(date("2024-05-01"), FakeRemote::unreachable());
    assert_eq!(rig.planner.load().await.expect("load"), LoadSource::Empty);
    assert!(rig.planner.tasks().is_empty());
}

#[tokio::test]
async fn history_and_stats_follow_the_tier() {
    let mut rig = Rig::new(date("2024-05-01"), FakeRemote::unreachable());
    rig.planner.load().await.expect("load");
    rig.fill(6, 6);
    rig.planner.finalize().await.expect("finalize");

    match rig.planner.history() {
        Err(Error::FeatureLocked {
            feature,
            required,
            current,
        }) => {
            assert_eq!(feature, Feature::History);
            assert_eq!(required, Tier::Plus);
            assert_eq!(current, Tier::Free);
        }
        other => panic!("expected history to be locked, got {other:?}"),
    }

    rig.planner.tier().set_tier(Tier::Plus).expect("set tier");
    let history = rig.planner.history().expect("history unlocked");
    assert_eq!(history.len(), 1);
    assert!(history[0].is_perfect());
    assert!(matches!(
        rig.planner.stats(),
        Err(Error::FeatureLocked {
            required: Tier::Pro,
            ..
        })
    ));

    rig.planner.tier().set_tier(Tier::Pro).expect("set tier");
    let stats = rig.planner.stats().expect("stats unlocked");
    assert_eq!(stats.days_archived, 1);
    assert_eq!(stats.perfect_days, 1);
    assert_eq!(stats.tasks_completed, 6);
    assert_eq!(stats.streak, 1);
}

#[tokio::test]
async fn remote_tier_unlocks_after_refresh() {
    let remote = FakeRemote::unreachable();
    remote.set_tier(Tier::Pro);
    let rig = Rig::new(date("2024-05-01"), remote);

    assert_eq!(rig.planner.tier().cached(), Tier::Free);
    assert_eq!(rig.planner.tier().refresh().await, Tier::Pro);
    assert!(rig.planner.tier().allows(Feature::Analytics));

    // The refreshed tier is cached for the next session.
    let reopened = rig.reopen();
    assert_eq!(reopened.tier().cached(), Tier::Pro);
}

#[tokio::test]
async fn history_is_newest_first_across_sessions() {
    let store = Arc::new(MemoryStore::new());
    for day in ["2024-05-01", "2024-05-03", "2024-05-02"] {
        let mut rig = Rig::with_store(store.clone(), date(day), FakeRemote::unreachable());
        rig.planner.load().await.expect("load");
        rig.fill(1, 1);
        rig.planner.finalize().await.expect("finalize");
    }

    let rig = Rig::with_store(store, date("2024-05-04"), FakeRemote::unreachable());
    rig.planner.tier().set_tier(Tier::Plus).expect("set tier");
    let dates: Vec<_> = rig
        .planner
        .history()
        .expect("history")
        .into_iter()
        .map(|entry| entry.date)
        .collect();
    assert_eq!(
        dates,
        vec![date("2024-05-03"), date("2024-05-02"), date("2024-05-01")]
    );
}

/// Remote whose upload takes long enough for the date to roll over
struct SlowUpload {
    clock: Arc<FixedClock>,
}

#[async_trait]
impl RemoteSync for SlowUpload {
    async fn fetch_today_tasks(&self) -> Result<Vec<Task>> {
        Ok(Vec::new())
    }

    async fn upload_day(&self, tasks: &[Task]) -> Result<UploadAck> {
        self.clock.advance_days(1);
        Ok(UploadAck {
            status: "ok".to_string(),
            count: tasks.len(),
        })
    }

    async fn fetch_user_tier(&self) -> Result<Tier> {
        Ok(Tier::Free)
    }
}

#[tokio::test]
async fn finalized_day_reports_the_archived_date() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::on(date("2024-05-01")));
    let remote = Arc::new(SlowUpload {
        clock: clock.clone(),
    });
    let mut planner = Planner::new(store.clone(), remote, clock.clone());
    planner.load().await.expect("load");
    planner.tasks_mut().add_task("only task", 1).expect("add");

    let finalized = planner.finalize_day().await.expect("finalize");
    assert_eq!(finalized.date, date("2024-05-01"));
    assert!(!finalized.perfect);
    assert_eq!(finalized.streak.count, 0);

    // The clock moved on during the upload; the archive did not.
    assert_eq!(planner.today(), date("2024-05-02"));
    let archive = HistoryArchive::new(store);
    assert!(archive.get(date("2024-05-01")).is_some());
    assert!(archive.get(date("2024-05-02")).is_none());
}
