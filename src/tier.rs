//! Subscription tier and the gate in front of premium views.
//!
//! The tier is cached under `user_tier` and refreshed from the remote when
//! asked for. The cache is authoritative whenever the remote is unreachable.
//! Observers subscribe through a `watch` channel.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::remote::RemoteSync;
use crate::storage::{LocalStore, StoreExt, TIER_KEY};

/// Subscription level, ordered `Free < Plus < Pro`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Plus,
    Pro,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Plus, Tier::Pro];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Plus => "plus",
            Tier::Pro => "pro",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "plus" => Ok(Tier::Plus),
            "pro" => Ok(Tier::Pro),
            other => Err(Error::InvalidArgument(format!(
                "unknown tier '{other}' (expected free|plus|pro)"
            ))),
        }
    }
}

/// Read views that sit behind a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    History,
    Analytics,
}

impl Feature {
    pub fn required_tier(self) -> Tier {
        match self {
            Feature::History => Tier::Plus,
            Feature::Analytics => Tier::Pro,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::History => f.write_str("history"),
            Feature::Analytics => f.write_str("analytics"),
        }
    }
}

struct GateState {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteSync>,
    tier: watch::Sender<Tier>,
    // Bumped by every applied change; a refresh only lands if nothing else
    // changed the tier while it was in flight.
    generation: AtomicU64,
}

/// Holder of the user's tier. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TierGate {
    state: Arc<GateState>,
}

impl TierGate {
    /// Gate seeded from the cached tier (`Free` when absent or unreadable)
    pub fn new(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>) -> Self {
        let cached = store.load::<Tier>(TIER_KEY).unwrap_or_default();
        let (tier, _) = watch::channel(cached);
        Self {
            state: Arc::new(GateState {
                store,
                remote,
                tier,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Cached tier, without touching the remote
    pub fn cached(&self) -> Tier {
        *self.state.tier.borrow()
    }

    /// Cached tier; also starts a background refresh when a tokio runtime
    /// is available
    pub fn get_tier(&self) -> Tier {
        let tier = self.cached();
        self.spawn_refresh();
        tier
    }

    /// Start a refresh on the current runtime, if any
    pub fn spawn_refresh(&self) -> Option<JoinHandle<Tier>> {
        let handle = Handle::try_current().ok()?;
        let gate = self.clone();
        Some(handle.spawn(async move { gate.refresh().await }))
    }

    /// Fetch the tier from the remote and apply it
    ///
    /// On failure the cached tier stays. A result that arrives after a newer
    /// local change (`set_tier`, another refresh) is discarded. Returns the
    /// tier in effect afterwards.
    pub async fn refresh(&self) -> Tier {
        let started = self.state.generation.load(Ordering::SeqCst);

        let fetched = match self.state.remote.fetch_user_tier().await {
            Ok(tier) => tier,
            Err(err) => {
                tracing::warn!(error = %err, "tier refresh failed; keeping cached tier");
                return self.cached();
            }
        };

        if self
            .state
            .generation
            .compare_exchange(started, started + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(tier = %fetched, "discarding superseded tier refresh");
            return self.cached();
        }

        if let Err(err) = self.state.store.save(TIER_KEY, &fetched) {
            tracing::warn!(error = %err, "could not cache refreshed tier");
        }
        self.publish(fetched);
        fetched
    }

    /// Local override (mock upgrade flow): persist and notify immediately
    pub fn set_tier(&self, tier: Tier) -> Result<()> {
        self.state.generation.fetch_add(1, Ordering::SeqCst);
        self.state.store.save(TIER_KEY, &tier)?;
        self.publish(tier);
        tracing::debug!(%tier, "tier set locally");
        Ok(())
    }

    /// Receiver that observes every tier change
    pub fn subscribe(&self) -> watch::Receiver<Tier> {
        self.state.tier.subscribe()
    }

    pub fn is_at_least(&self, required: Tier) -> bool {
        self.cached() >= required
    }

    pub fn allows(&self, feature: Feature) -> bool {
        self.is_at_least(feature.required_tier())
    }

    /// `Err(FeatureLocked)` unless the cached tier unlocks `feature`
    pub fn require(&self, feature: Feature) -> Result<()> {
        let current = self.cached();
        let required = feature.required_tier();
        if current >= required {
            Ok(())
        } else {
            Err(Error::FeatureLocked {
                feature,
                required,
                current,
            })
        }
    }

    fn publish(&self, tier: Tier) {
        self.state.tier.send_if_modified(|current| {
            if *current == tier {
                false
            } else {
                *current = tier;
                true
            }
        });
    }
}
