//! Deterministic day summary text.
//!
//! Output depends only on the day view and the counters passed in.

use crate::model::date_key::DateKey;
use crate::model::day::HourBlockView;
use crate::model::score::ScoreInput;
use crate::model::todo::TodoStatus;
use std::fmt::Write as _;

/// Body line used when no hour carries any content.
pub const EMPTY_DAY_LINE: &str = "No activity recorded.";

/// Everything the summary is derived from.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    pub date: DateKey,
    pub blocks: &'a [HourBlockView],
    pub counters: ScoreInput,
    pub score: i64,
    pub deferred_count: usize,
}

/// Renders the summary text.
pub fn build_summary(input: &SummaryInput<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Summary for {}", input.date);
    let _ = writeln!(
        out,
        "Score: {}/100 ({} of {} estimated minutes, {} done, {} deferred)",
        input.score,
        input.counters.completed_estimated_minutes,
        input.counters.total_estimated_minutes,
        input.counters.completed_count,
        input.deferred_count
    );

    let mut wrote_any = false;
    for view in input.blocks {
        let plan = view.block.planned_text.trim();
        let reflection = view.block.reflection_text.trim();
        if plan.is_empty() && reflection.is_empty() && view.todos.is_empty() {
            continue;
        }

        wrote_any = true;
        let _ = writeln!(out);
        let _ = writeln!(out, "{:02}:00", view.block.hour);
        if !plan.is_empty() {
            let _ = writeln!(out, "  Plan: {}", single_line(plan));
        }
        if !reflection.is_empty() {
            let _ = writeln!(out, "  Reflection: {}", single_line(reflection));
        }
        for todo in &view.todos {
            let mark = match todo.status {
                TodoStatus::Done => "x",
                TodoStatus::Pending => " ",
            };
            match todo.actual_minutes {
                Some(actual) => {
                    let _ = writeln!(
                        out,
                        "  [{mark}] {} ({}m, actual {actual}m)",
                        todo.title, todo.estimated_minutes
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  [{mark}] {} ({}m)",
                        todo.title, todo.estimated_minutes
                    );
                }
            }
        }
    }

    if !wrote_any {
        let _ = writeln!(out);
        let _ = writeln!(out, "{EMPTY_DAY_LINE}");
    }

    out.trim_end().to_string()
}

fn single_line(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}
