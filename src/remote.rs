//! Remote sync client.
//!
//! The remote backend is the source of "today's tasks", the sink for
//! finalized days, and the authority on the user's tier. Every call may fail
//! with `Error::RemoteUnavailable`; callers decide the fallback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::task::Task;
use crate::tier::Tier;

/// Acknowledgement returned by the backend for an uploaded day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub count: usize,
}

#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Tasks the backend already holds for today
    async fn fetch_today_tasks(&self) -> Result<Vec<Task>>;

    /// Upload a finalized day
    async fn upload_day(&self, tasks: &[Task]) -> Result<UploadAck>;

    /// The user's subscription tier
    async fn fetch_user_tier(&self) -> Result<Tier>;
}

/// Remote that is never reachable; used when syncing is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRemote;

#[async_trait]
impl RemoteSync for OfflineRemote {
    async fn fetch_today_tasks(&self) -> Result<Vec<Task>> {
        Err(Error::remote("remote sync is disabled"))
    }

    async fn upload_day(&self, _tasks: &[Task]) -> Result<UploadAck> {
        Err(Error::remote("remote sync is disabled"))
    }

    async fn fetch_user_tier(&self) -> Result<Tier> {
        Err(Error::remote("remote sync is disabled"))
    }
}

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    tasks: &'a [Task],
}

#[derive(Debug, Deserialize)]
struct TierResponse {
    tier: String,
}

/// JSON-over-HTTP client for the power6 backend
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    /// Build a client whose every request is bounded by `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::remote)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::remote(format!("{what}: HTTP {status}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| Error::remote(format!("{what}: invalid response body: {err}")))
    }
}

#[async_trait]
impl RemoteSync for HttpRemote {
    async fn fetch_today_tasks(&self) -> Result<Vec<Task>> {
        let response = self
            .client
            .get(self.url("/tasks/today"))
            .send()
            .await
            .map_err(|err| Error::remote(format!("fetch today's tasks: {err}")))?;
        Self::decode(response, "fetch today's tasks").await
    }

    async fn upload_day(&self, tasks: &[Task]) -> Result<UploadAck> {
        let response = self
            .client
            .post(self.url("/tasks/upload"))
            .json(&UploadRequest { tasks })
            .send()
            .await
            .map_err(|err| Error::remote(format!("upload day: {err}")))?;
        Self::decode(response, "upload day").await
    }

    async fn fetch_user_tier(&self) -> Result<Tier> {
        let response = self
            .client
            .get(self.url("/users/tier"))
            .send()
            .await
            .map_err(|err| Error::remote(format!("fetch user tier: {err}")))?;
        let body: TierResponse = Self::decode(response, "fetch user tier").await?;
        body.tier
            .parse::<Tier>()
            .map_err(|_| Error::remote(format!("fetch user tier: unknown tier '{}'", body.tier)))
    }
}
