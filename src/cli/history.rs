//! power6 history/stats command implementations.
//!
//! Both views are tier gated. The tier is refreshed from the backend first;
//! when that fails the cached tier decides.

use crate::clock::{date_key, parse_date_key};
use crate::cli::Session;
use crate::error::{Error, Result};
use crate::history::HistoryEntry;
use crate::output::{emit_success, HumanOutput};
use crate::stats::Stats;
use crate::tier::Tier;

#[derive(serde::Serialize)]
struct HistoryReport {
    tier: Tier,
    days: Vec<HistoryEntry>,
    total_days: usize,
}

#[derive(serde::Serialize)]
struct HistoryDayReport {
    tier: Tier,
    date: String,
    entry: Option<HistoryEntry>,
}

#[derive(serde::Serialize)]
struct StatsReport {
    tier: Tier,
    #[serde(flatten)]
    stats: Stats,
}

pub async fn run_history(session: &mut Session, limit: Option<usize>) -> Result<()> {
    let tier = session.planner.tier().refresh().await;

    let mut days = session.planner.history()?;
    let total_days = days.len();
    if let Some(limit) = limit {
        days.truncate(limit);
    }

    let mut human = HumanOutput::new(format!("History: {total_days} archived day(s)"));
    for entry in &days {
        let mark = if entry.is_perfect() { " (perfect)" } else { "" };
        human.push_detail(format!(
            "{}: {}/{} done{mark}",
            date_key(entry.date),
            entry.completed_count(),
            entry.tasks.len()
        ));
    }
    if total_days == 0 {
        human.push_next_step("power6 finalize");
    }

    let report = HistoryReport {
        tier,
        days,
        total_days,
    };
    emit_success(session.output, "history", &report, Some(&human))
}

pub async fn run_history_day(session: &mut Session, raw_date: &str) -> Result<()> {
    let Some(date) = parse_date_key(raw_date.trim()) else {
        return Err(Error::InvalidArgument(format!(
            "invalid date '{raw_date}' (expected YYYY-MM-DD)"
        )));
    };
    let tier = session.planner.tier().refresh().await;

    let entry = session.planner.history_day(date)?;
    let date = date_key(date);

    let mut human = match &entry {
        Some(entry) => {
            let mut human = HumanOutput::new(format!(
                "{date}: {}/{} done",
                entry.completed_count(),
                entry.tasks.len()
            ));
            for task in &entry.tasks {
                let mark = if task.completed { "x" } else { " " };
                human.push_detail(format!("[{mark}] rank {}: {}", task.rank, task.text));
            }
            human
        }
        None => HumanOutput::new(format!("{date}: nothing archived")),
    };
    if entry.as_ref().is_some_and(HistoryEntry::is_perfect) {
        human.push_summary("perfect", "yes");
    }

    let report = HistoryDayReport { tier, date, entry };
    emit_success(session.output, "history", &report, Some(&human))
}

pub async fn run_stats(session: &mut Session) -> Result<()> {
    let tier = session.planner.tier().refresh().await;

    let stats = session.planner.stats()?;

    let mut human = HumanOutput::new("Stats");
    human.push_summary("days archived", stats.days_archived.to_string());
    human.push_summary("perfect days", stats.perfect_days.to_string());
    human.push_summary(
        "tasks completed",
        format!("{}/{}", stats.tasks_completed, stats.tasks_archived),
    );
    human.push_summary("streak", stats.streak.to_string());
    for (rank, count) in &stats.rank_frequency {
        human.push_detail(format!("rank {rank}: {count} task(s)"));
    }
    for milestone in &stats.milestones {
        human.push_detail(format!("milestone: {}", milestone.title()));
    }

    emit_success(
        session.output,
        "stats",
        &StatsReport { tier, stats },
        Some(&human),
    )
}
