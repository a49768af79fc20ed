#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use async_trait::async_trait;
use chrono::NaiveDate;
use power6::clock::FixedClock;
use power6::day::Planner;
use power6::error::{Error, Result};
use power6::remote::{RemoteSync, UploadAck};
use power6::storage::{LocalStore, MemoryStore};
use power6::task::Task;
use power6::tier::Tier;
use tempfile::TempDir;

/// A temporary power6 data directory plus a command builder pointed at it
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("store.json")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join("config.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// `power6 --data-dir <home>`, with the environment scrubbed
    pub fn power6(&self) -> Command {
        let mut cmd = Command::cargo_bin("power6").expect("binary");
        cmd.env_remove("POWER6_HOME")
            .env_remove("RUST_LOG")
            .arg("--data-dir")
            .arg(self.dir.path());
        cmd
    }

    /// Run `args` with `--json` and return the parsed envelope
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .power6()
            .arg("--json")
            .args(args)
            .output()
            .expect("run power6");
        serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
            panic!(
                "invalid json from {args:?}: {err}\nstdout: {}\nstderr: {}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
        })
    }

    /// Raw store contents as a JSON object
    pub fn read_store(&self) -> serde_json::Value {
        let contents = fs::read_to_string(self.store_path()).expect("read store");
        serde_json::from_str(&contents).expect("store json")
    }
}

/// Scriptable in-process remote that records uploads
#[derive(Default)]
pub struct FakeRemote {
    today: Mutex<Option<Vec<Task>>>,
    tier: Mutex<Option<Tier>>,
    upload_fails: Mutex<bool>,
    uploads: Mutex<Vec<Vec<Task>>>,
}

impl FakeRemote {
    /// Every call fails until scripted otherwise
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_today(tasks: Vec<Task>) -> Arc<Self> {
        let remote = Self::default();
        *remote.today.lock().expect("lock") = Some(tasks);
        Arc::new(remote)
    }

    pub fn set_tier(&self, tier: Tier) {
        *self.tier.lock().expect("lock") = Some(tier);
    }

    pub fn accept_uploads(&self, accept: bool) {
        *self.upload_fails.lock().expect("lock") = !accept;
    }

    pub fn uploads(&self) -> Vec<Vec<Task>> {
        self.uploads.lock().expect("lock").clone()
    }
}

#[async_trait]
impl RemoteSync for FakeRemote {
    async fn fetch_today_tasks(&self) -> Result<Vec<Task>> {
        self.today
            .lock()
            .expect("lock")
            .clone()
            .ok_or_else(|| Error::remote("connection refused"))
    }

    async fn upload_day(&self, tasks: &[Task]) -> Result<UploadAck> {
        if *self.upload_fails.lock().expect("lock") {
            return Err(Error::remote("HTTP 503"));
        }
        self.uploads.lock().expect("lock").push(tasks.to_vec());
        Ok(UploadAck {
            status: "ok".to_string(),
            count: tasks.len(),
        })
    }

    async fn fetch_user_tier(&self) -> Result<Tier> {
        self.tier
            .lock()
            .expect("lock")
            .ok_or_else(|| Error::remote("connection refused"))
    }
}

/// In-memory planner wiring for library-level tests
pub struct Rig {
    pub store: Arc<MemoryStore>,
    pub remote: Arc<FakeRemote>,
    pub clock: Arc<FixedClock>,
    pub planner: Planner,
}

impl Rig {
    pub fn new(date: NaiveDate, remote: Arc<FakeRemote>) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), date, remote)
    }

    pub fn with_store(store: Arc<MemoryStore>, date: NaiveDate, remote: Arc<FakeRemote>) -> Self {
        let clock = Arc::new(FixedClock::on(date));
        let planner = Planner::new(
            store.clone() as Arc<dyn LocalStore>,
            remote.clone() as Arc<dyn RemoteSync>,
            clock.clone(),
        );
        Self {
            store,
            remote,
            clock,
            planner,
        }
    }

    /// A fresh planner over the same store, remote, and clock
    pub fn reopen(&self) -> Planner {
        Planner::new(
            self.store.clone() as Arc<dyn LocalStore>,
            self.remote.clone() as Arc<dyn RemoteSync>,
            self.clock.clone(),
        )
    }

    /// Add `count` tasks (ranks 1..) and complete the first `done` of them
    pub fn fill(&mut self, count: usize, done: usize) -> Vec<Task> {
        let tasks = self.planner.tasks_mut();
        let mut added = Vec::new();
        for index in 0..count {
            let rank = u8::try_from(index % 6 + 1).expect("rank");
            let task = tasks
                .add_task(&format!("task {}", index + 1), rank)
                .expect("add")
                .expect("accepted");
            added.push(task);
        }
        for task in added.iter().take(done) {
            tasks.toggle_complete(task.id).expect("toggle");
        }
        tasks.snapshot()
    }
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
}
