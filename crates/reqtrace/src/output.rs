//! Report rendering for classified transitions.

use owo_colors::OwoColorize;
use reqtrace_core::{Status, TransitionSpec};
use serde::Serialize;

/// Output format for the validation report.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
    Html,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            _ => None,
        }
    }
}

/// Aggregate counts over the classified list.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passing: usize,
    pub failing: usize,
    pub missing: usize,
    pub not_run: usize,
    pub safety_critical: usize,
    pub safety_critical_covered: usize,
}

impl Summary {
    pub fn compute(transitions: &[TransitionSpec]) -> Self {
        let count = |status: Status| {
            transitions
                .iter()
                .filter(|t| t.status == Some(status))
                .count()
        };
        Summary {
            total: transitions.len(),
            passing: count(Status::Pass),
            failing: count(Status::Fail),
            missing: count(Status::MissingTest),
            not_run: count(Status::NotRun),
            safety_critical: transitions.iter().filter(|t| t.safety_critical).count(),
            safety_critical_covered: transitions
                .iter()
                .filter(|t| t.safety_critical && t.status == Some(Status::Pass))
                .count(),
        }
    }
}

/// Entries worth flagging in the problems section.
pub fn problems(transitions: &[TransitionSpec]) -> Vec<&TransitionSpec> {
    transitions
        .iter()
        .filter(|t| matches!(t.status, Some(Status::Fail) | Some(Status::MissingTest)))
        .collect()
}

/// Render the report in the chosen format.
pub fn render_report(
    transitions: &[TransitionSpec],
    ran_tests: bool,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => render_text(transitions, ran_tests),
        OutputFormat::Json => render_json(transitions, ran_tests),
        OutputFormat::Markdown => render_markdown(transitions, ran_tests),
        OutputFormat::Html => render_html(transitions, ran_tests),
    }
}

fn colored_status(status: Option<Status>) -> String {
    match status {
        Some(Status::Pass) => Status::Pass.as_str().green().to_string(),
        Some(Status::Fail) => Status::Fail.as_str().red().bold().to_string(),
        Some(Status::MissingTest) => Status::MissingTest.as_str().yellow().to_string(),
        Some(Status::NotRun) => Status::NotRun.as_str().dimmed().to_string(),
        None => "?".to_string(),
    }
}

fn render_text(transitions: &[TransitionSpec], ran_tests: bool) -> String {
    let summary = Summary::compute(transitions);
    let sep = "=".repeat(72);
    let mut out = String::new();

    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&format!(
        "  {}\n",
        "State Transition Validation Report".bold()
    ));
    out.push_str(&sep);
    out.push_str("\n\n");

    out.push_str(&format!(
        "  Total transitions specified : {}\n",
        summary.total
    ));
    out.push_str(&format!(
        "  Transitions with tests      : {}\n",
        summary.passing.to_string().green()
    ));
    if ran_tests {
        out.push_str(&format!(
            "  Transitions FAILING         : {}\n",
            summary.failing.to_string().red()
        ));
        out.push_str(&format!(
            "  Transitions NOT RUN         : {}\n",
            summary.not_run
        ));
    }
    out.push_str(&format!(
        "  Transitions MISSING tests   : {}\n",
        summary.missing.to_string().yellow()
    ));
    out.push('\n');
    out.push_str(&format!(
        "  Safety-critical transitions : {}\n",
        summary.safety_critical
    ));
    out.push_str(&format!(
        "  Safety-critical covered     : {}\n",
        summary.safety_critical_covered
    ));
    out.push('\n');

    // Detail table
    let header = format!(
        "  {:<8} {:<22} {:<22} {:<14} Test Function",
        "ID", "From", "To", "Status"
    );
    out.push_str(&header);
    out.push('\n');
    out.push_str("  ");
    out.push_str(&"-".repeat(header.len() - 2));
    out.push('\n');

    for t in transitions {
        let marker = match t.status {
            Some(Status::Fail) => " << FAIL",
            Some(Status::MissingTest) => " << MISSING",
            Some(Status::NotRun) => " << NOT_RUN",
            _ => "",
        };
        let status = t.status.map(|s| s.as_str()).unwrap_or("?");
        out.push_str(&format!(
            "  {:<8} {:<22} {:<22} {:<14} {}{}\n",
            t.id,
            t.from_state,
            t.to_state,
            status,
            t.test_function,
            marker.red()
        ));
    }
    out.push('\n');

    let problem_entries = problems(transitions);
    if problem_entries.is_empty() {
        out.push_str(&format!(
            "  {}\n",
            format!("ALL {} TRANSITIONS VALIDATED SUCCESSFULLY", summary.total).green()
        ));
    } else {
        out.push_str(&sep);
        out.push('\n');
        out.push_str(&format!("  {}\n", "PROBLEMS:".red().bold()));
        out.push_str(&sep);
        out.push('\n');
        for t in &problem_entries {
            out.push_str(&format!(
                "  [{}] {} {} -> {}\n",
                colored_status(t.status),
                t.id,
                t.from_state,
                t.to_state
            ));
            out.push_str(&format!("           {}\n", t.status_detail));
        }
        out.push('\n');
        out.push_str(&format!(
            "  {}\n",
            format!("{} PROBLEM(S) FOUND", problem_entries.len()).red().bold()
        ));
    }
    out.push_str(&sep);
    out.push('\n');

    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    ran_tests: bool,
    summary: Summary,
    transitions: &'a [TransitionSpec],
}

fn render_json(transitions: &[TransitionSpec], ran_tests: bool) -> String {
    let report = JsonReport {
        ran_tests,
        summary: Summary::compute(transitions),
        transitions,
    };
    // TransitionSpec carries only plain data; serialization cannot fail
    serde_json::to_string_pretty(&report).expect("failed to serialize report to JSON")
}

fn render_markdown(transitions: &[TransitionSpec], ran_tests: bool) -> String {
    let summary = Summary::compute(transitions);
    let mut out = String::new();

    out.push_str("# State Transition Validation Report\n\n");
    out.push_str(&format!(
        "**{} transitions** | **{} with tests** | **{} missing**",
        summary.total, summary.passing, summary.missing
    ));
    if ran_tests {
        out.push_str(&format!(
            " | **{} failing** | **{} not run**",
            summary.failing, summary.not_run
        ));
    }
    out.push_str(&format!(
        " | **{}/{} safety-critical covered**\n\n",
        summary.safety_critical_covered, summary.safety_critical
    ));

    out.push_str("| ID | From | To | Trigger | Status | Safety | Test Function | Requirement |\n");
    out.push_str("|----|------|----|---------|--------|--------|---------------|-------------|\n");
    for t in transitions {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | `{}` | {} |\n",
            t.id,
            t.from_state,
            t.to_state,
            t.trigger,
            t.status.map(|s| s.as_str()).unwrap_or("?"),
            if t.safety_critical { "yes" } else { "no" },
            t.test_function,
            t.requirement
        ));
    }
    out.push('\n');

    let problem_entries = problems(transitions);
    if !problem_entries.is_empty() {
        out.push_str("## Problems\n\n");
        for t in &problem_entries {
            out.push_str(&format!(
                "- **{}** `{}` {} -> {}: {}\n",
                t.status.map(|s| s.as_str()).unwrap_or("?"),
                t.id,
                t.from_state,
                t.to_state,
                t.status_detail
            ));
        }
        out.push('\n');
    }

    out
}

fn status_color(status: Option<Status>) -> &'static str {
    match status {
        Some(Status::Pass) => "#2e7d32",
        Some(Status::Fail) => "#c62828",
        Some(Status::MissingTest) => "#e65100",
        Some(Status::NotRun) => "#9e9e9e",
        None => "#000",
    }
}

fn render_html(transitions: &[TransitionSpec], ran_tests: bool) -> String {
    let summary = Summary::compute(transitions);
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>State Transition Validation Report</title>\n");
    out.push_str("<style>\n");
    out.push_str(concat!(
        "body { font-family: system-ui, sans-serif; margin: 2rem; color: #212121; background: #fafafa; }\n",
        "h1 { border-bottom: 3px solid #1565c0; padding-bottom: 0.5rem; }\n",
        "table { border-collapse: collapse; width: 100%; margin: 1rem 0; }\n",
        "th, td { border: 1px solid #bdbdbd; padding: 0.4rem 0.6rem; text-align: left; vertical-align: top; font-size: 0.85rem; }\n",
        "th { background: #e3f2fd; }\n",
        "tr:nth-child(even) { background: #f5f5f5; }\n",
        ".summary td { border: none; padding: 0.2rem 1rem; }\n",
        ".cond { font-size: 0.8rem; color: #555; max-width: 260px; }\n",
        "code { background: #eceff1; padding: 0.1rem 0.3rem; border-radius: 3px; font-size: 0.82rem; }\n",
        ".ok { color: #2e7d32; font-weight: bold; }\n",
        ".err { color: #c62828; font-weight: bold; }\n",
    ));
    out.push_str("</style>\n</head>\n<body>\n");
    out.push_str("<h1>State Transition Validation Report</h1>\n");

    // Summary
    out.push_str("<h2>Summary</h2>\n<table class=\"summary\" style=\"width:auto\">\n");
    out.push_str(&format!(
        "<tr><td>Total transitions specified</td><td><strong>{}</strong></td></tr>\n",
        summary.total
    ));
    out.push_str(&format!(
        "<tr><td>Transitions with passing tests</td><td class=\"ok\">{}</td></tr>\n",
        summary.passing
    ));
    if ran_tests {
        out.push_str(&format!(
            "<tr><td>Failing tests</td><td><strong style=\"color:#c62828\">{}</strong></td></tr>\n",
            summary.failing
        ));
        out.push_str(&format!(
            "<tr><td>Not run</td><td>{}</td></tr>\n",
            summary.not_run
        ));
    }
    out.push_str(&format!(
        "<tr><td>Transitions with missing tests</td><td class=\"{}\">{}</td></tr>\n",
        if summary.missing > 0 { "err" } else { "ok" },
        summary.missing
    ));
    out.push_str(&format!(
        "<tr><td>Safety-critical covered</td><td class=\"{}\">{} / {}</td></tr>\n",
        if summary.safety_critical_covered == summary.safety_critical {
            "ok"
        } else {
            "err"
        },
        summary.safety_critical_covered,
        summary.safety_critical
    ));
    out.push_str("</table>\n");

    // Problems
    let problem_entries = problems(transitions);
    if !problem_entries.is_empty() {
        out.push_str(&format!(
            "<h2 style=\"color:#c62828\">Problems ({})</h2>\n<table>\n",
            problem_entries.len()
        ));
        out.push_str("<tr><th>Status</th><th>ID</th><th>Transition</th><th>Detail</th></tr>\n");
        for t in &problem_entries {
            out.push_str(&format!(
                "<tr><td style=\"color:{};font-weight:bold\">{}</td><td>{}</td><td>{} -&gt; {}</td><td>{}</td></tr>\n",
                status_color(t.status),
                t.status.map(|s| s.as_str()).unwrap_or("?"),
                html_escape(&t.id),
                html_escape(&t.from_state),
                html_escape(&t.to_state),
                html_escape(&t.status_detail)
            ));
        }
        out.push_str("</table>\n");
    }

    // Full table
    out.push_str("<h2>All Transitions</h2>\n<table>\n<tr>\n");
    out.push_str(
        "<th>ID</th><th>From</th><th>To</th><th>Trigger</th><th>Conditions</th>\
         <th>Status</th><th>Safety</th><th>Test Function</th><th>Test File</th>\
         <th>Requirement</th><th>Description</th>\n</tr>\n",
    );
    for t in transitions {
        let conditions = t
            .conditions
            .iter()
            .map(|c| html_escape(c))
            .collect::<Vec<_>>()
            .join("<br>");
        let safety_cell = if t.safety_critical {
            "<td style=\"color:#c62828;font-weight:bold\">Yes</td>".to_string()
        } else {
            "<td>No</td>".to_string()
        };
        out.push_str(&format!(
            "<tr>\n<td>{}</td>\n<td>{}</td>\n<td>{}</td>\n<td>{}</td>\n<td class=\"cond\">{}</td>\n\
             <td style=\"color:{};font-weight:bold\">{}</td>\n{}\n<td><code>{}</code></td>\n\
             <td><code>{}</code></td>\n<td>{}</td>\n<td>{}</td>\n</tr>\n",
            html_escape(&t.id),
            html_escape(&t.from_state),
            html_escape(&t.to_state),
            html_escape(&t.trigger),
            conditions,
            status_color(t.status),
            t.status.map(|s| s.as_str()).unwrap_or("?"),
            safety_cell,
            html_escape(&t.test_function),
            html_escape(&t.test_file),
            html_escape(&t.requirement),
            html_escape(&t.description)
        ));
    }
    out.push_str("</table>\n");

    out.push_str(
        "<p style=\"color:#757575;font-size:0.8rem;margin-top:2rem\">Generated by <code>reqtrace</code></p>\n",
    );
    out.push_str("</body>\n</html>\n");
    out
}

/// Minimal HTML escaping for text interpolated into reports.
pub(crate) fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
