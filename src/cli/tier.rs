//! power6 tier command implementations.

use crate::cli::Session;
use crate::error::Result;
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::tier::{Feature, Tier};

#[derive(serde::Serialize)]
struct TierReport {
    tier: Tier,
    refreshed: bool,
    history: bool,
    analytics: bool,
}

#[derive(serde::Serialize)]
struct TierSetReport {
    previous: Tier,
    tier: Tier,
}

pub async fn run_show(session: &mut Session, refresh: bool) -> Result<()> {
    let gate = session.planner.tier();
    let tier = if refresh {
        gate.refresh().await
    } else {
        gate.cached()
    };

    let report = TierReport {
        tier,
        refreshed: refresh,
        history: gate.allows(Feature::History),
        analytics: gate.allows(Feature::Analytics),
    };

    let mut human = HumanOutput::new(format!("Tier: {tier}"));
    human.push_summary("history", unlocked(report.history));
    human.push_summary("analytics", unlocked(report.analytics));
    if tier < Tier::Pro {
        human.push_next_step("power6 tier set pro");
    }

    emit_success(session.output, "tier show", &report, Some(&human))
}

pub fn run_set(session: &mut Session, tier: &str) -> Result<()> {
    let tier: Tier = tier.parse()?;
    let gate = session.planner.tier();
    let previous = gate.cached();
    gate.set_tier(tier)?;

    let report = TierSetReport { previous, tier };
    session.emit(EventKind::TierChanged, &report)?;

    let mut human = HumanOutput::new(format!("Tier set to {tier}"));
    human.push_summary("previous", previous.to_string());

    emit_success(session.output, "tier set", &report, Some(&human))
}

fn unlocked(allowed: bool) -> &'static str {
    if allowed {
        "unlocked"
    } else {
        "locked"
    }
}
