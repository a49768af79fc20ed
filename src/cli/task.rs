//! power6 add/toggle/list/clear command implementations.

use crate::cli::Session;
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::task::{LoadSource, Task, TaskId, MAX_TASKS};

pub struct AddOptions {
    pub text: String,
    pub rank: u8,
}

#[derive(serde::Serialize)]
struct AddReport {
    task: Task,
    count: usize,
    capacity: usize,
}

#[derive(serde::Serialize)]
struct ToggleReport {
    id: TaskId,
    completed: bool,
    completed_count: usize,
    count: usize,
}

#[derive(serde::Serialize)]
struct ListReport {
    date: String,
    source: LoadSource,
    tasks: Vec<Task>,
    count: usize,
    completed_count: usize,
    capacity: usize,
}

#[derive(serde::Serialize)]
struct ClearReport {
    cleared: usize,
}

pub async fn run_add(session: &mut Session, options: AddOptions) -> Result<()> {
    session.planner.load().await?;

    let tasks = session.planner.tasks_mut();
    if tasks.is_full() {
        return Err(Error::InvalidArgument(format!(
            "today already holds {MAX_TASKS} tasks; finalize or clear first"
        )));
    }
    let Some(task) = tasks.add_task(&options.text, options.rank)? else {
        return Err(Error::InvalidArgument(
            "task text cannot be empty".to_string(),
        ));
    };
    let count = tasks.len();

    session.emit(EventKind::TaskAdded, &task)?;

    let mut human = HumanOutput::new(format!("Added #{} (rank {})", task.id, task.rank));
    human.push_summary("task", task.text.clone());
    human.push_summary("today", format!("{count}/{MAX_TASKS}"));
    if count == MAX_TASKS {
        human.push_next_step("power6 toggle <id>");
    }

    let report = AddReport {
        task,
        count,
        capacity: MAX_TASKS,
    };
    emit_success(session.output, "add", &report, Some(&human))
}

pub async fn run_toggle(session: &mut Session, id: TaskId) -> Result<()> {
    session.planner.load().await?;

    let tasks = session.planner.tasks_mut();
    let Some(completed) = tasks.toggle_complete(id)? else {
        return Err(Error::InvalidArgument(format!(
            "no task with id {id} in today's set"
        )));
    };
    let report = ToggleReport {
        id,
        completed,
        completed_count: tasks.completed_count(),
        count: tasks.len(),
    };

    session.emit(
        EventKind::TaskToggled,
        serde_json::json!({ "id": id, "completed": completed }),
    )?;

    let state = if completed { "done" } else { "open" };
    let mut human = HumanOutput::new(format!("#{id} is now {state}"));
    human.push_summary(
        "completed",
        format!("{}/{}", report.completed_count, report.count),
    );
    if report.count == MAX_TASKS && report.completed_count == MAX_TASKS {
        human.push_next_step("power6 finalize");
    }

    emit_success(session.output, "toggle", &report, Some(&human))
}

pub async fn run_list(session: &mut Session) -> Result<()> {
    let source = session.planner.load().await?;
    let date = session.planner.today();
    let tasks = session.planner.tasks();

    let mut ordered = tasks.snapshot();
    ordered.sort_by_key(|task| task.rank);

    let report = ListReport {
        date: crate::clock::date_key(date),
        source,
        count: tasks.len(),
        completed_count: tasks.completed_count(),
        capacity: MAX_TASKS,
        tasks: ordered,
    };

    let mut human = HumanOutput::new(format!(
        "Today ({}): {}/{} tasks, {} done",
        report.date, report.count, MAX_TASKS, report.completed_count
    ));
    for task in &report.tasks {
        let mark = if task.completed { "x" } else { " " };
        human.push_detail(format!(
            "[{mark}] rank {} #{}: {}",
            task.rank, task.id, task.text
        ));
    }
    if report.tasks.is_empty() {
        human.push_next_step("power6 add <text> --rank <1-6>");
    }

    emit_success(session.output, "list", &report, Some(&human))
}

pub async fn run_clear(session: &mut Session) -> Result<()> {
    session.planner.load().await?;

    let tasks = session.planner.tasks_mut();
    let cleared = tasks.len();
    tasks.clear()?;

    session.emit(
        EventKind::WorkingSetCleared,
        serde_json::json!({ "cleared": cleared }),
    )?;

    let human = HumanOutput::new(format!("Cleared {cleared} task(s) without archiving"));
    emit_success(session.output, "clear", &ClearReport { cleared }, Some(&human))
}
