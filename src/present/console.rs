// src/present/console.rs

use std::time::Duration;

use crate::present::{Presenter, ProgressEvent};
use crate::protocol::Aside;
use crate::runner::outcome::{CaseVerdict, PartOutcome, PartVerdict};
use crate::types::answer_text;

/// Plain line-oriented presenter writing to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsolePresenter;

impl ConsolePresenter {
    pub fn new() -> Self {
        Self
    }
}

impl Presenter for ConsolePresenter {
    fn present(&self, event: ProgressEvent) {
        for line in render(&event) {
            println!("{line}");
        }
    }
}

/// Render an event as zero or more output lines.
pub fn render(event: &ProgressEvent) -> Vec<String> {
    match event {
        ProgressEvent::RunStarted { target } => vec![format!("[solwatch] running {target}")],
        ProgressEvent::FileStarted { source } => vec![format!("== {}", source.display())],
        ProgressEvent::CaseStarted { label, .. } => vec![format!("-- {label}")],
        ProgressEvent::Status { text } => vec![format!("   ... {text}")],
        ProgressEvent::Output { line } => vec![format!("   | {line}")],
        ProgressEvent::PartFinished { outcome, .. } => render_part(outcome),
        ProgressEvent::CaseFinished { outcome, .. } => {
            vec![format!("   {} {}", outcome.label, verdict_tag(outcome.verdict()))]
        }
        ProgressEvent::Failure { source, failure } => {
            if failure.is_cancellation() {
                vec![format!("[cancelled] {}", source.display())]
            } else {
                vec![format!("[error] {}: {failure}", source.display())]
            }
        }
        ProgressEvent::FileFinished { outcome } => {
            let tag = if outcome.is_cancelled() {
                "cancelled"
            } else if outcome.is_success() {
                "ok"
            } else {
                "FAILED"
            };
            vec![format!("== {} {tag}", outcome.source.display())]
        }
        ProgressEvent::GroupProgress { group, tally } => vec![format!(
            "   [{group}] {} correct part(s) across {} file(s)",
            tally.correct_parts, tally.files
        )],
        ProgressEvent::DirectoryFinished { summary } => {
            let mut lines = vec![format!("== summary for {}", summary.root.display())];
            for (group, tally) in summary.groups.iter() {
                lines.push(format!(
                    "   {group}: {} correct part(s), {} file(s), {} failed",
                    tally.correct_parts, tally.files, tally.failed_files
                ));
            }
            if summary.cancelled {
                lines.push("   (cancelled before all files ran)".to_string());
            }
            lines
        }
        ProgressEvent::RunCancelled { target } => vec![format!("[solwatch] cancelled {target}")],
    }
}

fn render_part(outcome: &PartOutcome) -> Vec<String> {
    let mut line = format!(
        "   part {}: {} ({})",
        outcome.part,
        answer_text(&outcome.answer),
        format_duration(outcome.duration)
    );
    match (outcome.verdict, &outcome.expected) {
        (PartVerdict::Pass, _) => line.push_str(" ✓"),
        (PartVerdict::Fail, Some(expected)) => {
            line.push_str(&format!(" ✗ expected {}", answer_text(expected)))
        }
        (PartVerdict::Fail, None) => line.push_str(" ✗"),
        (PartVerdict::Informational, _) => line.push_str(" ?"),
    }

    let mut lines = vec![line];
    if let Some(aside) = &outcome.aside {
        lines.extend(render_aside(aside));
    }
    lines
}

fn render_aside(aside: &Aside) -> Vec<String> {
    let mut lines = Vec::with_capacity(aside.rows.len() + 1);
    if !aside.header.is_empty() {
        lines.push(format!("     {}", aside.header.join(" | ")));
    }
    for row in aside.rows.iter() {
        lines.push(format!("     {}", row.join(" | ")));
    }
    lines
}

fn verdict_tag(verdict: CaseVerdict) -> &'static str {
    match verdict {
        CaseVerdict::Pass => "pass",
        CaseVerdict::Fail => "FAIL",
        CaseVerdict::Informational => "done",
        CaseVerdict::Error => "ERROR",
        CaseVerdict::Cancelled => "cancelled",
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.1}ms", secs * 1000.0)
    } else {
        format!("{:.2}s", secs)
    }
}
