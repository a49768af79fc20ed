//! power6 finalize/streak command implementations.

use crate::clock::date_key;
use crate::cli::Session;
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::task::MAX_TASKS;

#[derive(serde::Serialize)]
struct FinalizeReport {
    date: String,
    perfect: bool,
    archived: usize,
    completed: usize,
    streak: u32,
}

#[derive(serde::Serialize)]
struct StreakReport {
    count: u32,
    last_completed_date: Option<String>,
    live: bool,
}

pub async fn run_finalize(session: &mut Session) -> Result<()> {
    session.planner.load().await?;

    let tasks = session.planner.tasks();
    if tasks.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to finalize; add tasks first".to_string(),
        ));
    }
    let archived = tasks.len();
    let completed = tasks.completed_count();

    let finalized = session.planner.finalize_day().await?;
    let perfect = finalized.perfect;
    let streak = finalized.streak.count;

    let report = FinalizeReport {
        date: date_key(finalized.date),
        perfect,
        archived,
        completed,
        streak,
    };
    session.emit(EventKind::DayFinalized, &report)?;

    let header = if perfect {
        "Perfect day! Streak updated."
    } else {
        "Tasks stored. Incomplete day."
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("date", report.date.clone());
    human.push_summary("completed", format!("{completed}/{archived}"));
    human.push_summary("streak", streak.to_string());
    if !perfect && archived < MAX_TASKS {
        human.push_warning(format!(
            "a perfect day needs all {MAX_TASKS} slots filled and completed"
        ));
    }

    emit_success(session.output, "finalize", &report, Some(&human))
}

pub fn run_streak(session: &mut Session) -> Result<()> {
    let state = session.planner.streak();
    let live = state.is_live(session.planner.today());

    let report = StreakReport {
        count: state.count,
        last_completed_date: state.last_completed_date.map(date_key),
        live,
    };

    let mut human = HumanOutput::new(format!("Streak: {} day(s)", report.count));
    if let Some(last) = report.last_completed_date.as_deref() {
        human.push_summary("last perfect day", last);
    }
    if report.count > 0 && !live {
        human.push_warning("streak lapsed; the next perfect day starts over at 1");
    }

    emit_success(session.output, "streak", &report, Some(&human))
}
