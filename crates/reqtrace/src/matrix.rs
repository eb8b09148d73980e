//! Traceability matrix rendering: annotations grouped by feature.

use owo_colors::OwoColorize;
use reqtrace_core::TestAnnotation;

use crate::output::html_escape;

/// Group annotations by feature, preserving first-seen feature order.
/// Annotations without a feature land under "Uncategorized".
pub fn group_by_feature(annotations: &[TestAnnotation]) -> Vec<(String, Vec<&TestAnnotation>)> {
    let mut groups: Vec<(String, Vec<&TestAnnotation>)> = Vec::new();
    for annotation in annotations {
        let feature = if annotation.feature.is_empty() {
            "Uncategorized"
        } else {
            annotation.feature.as_str()
        };
        match groups.iter_mut().find(|(name, _)| name == feature) {
            Some((_, members)) => members.push(annotation),
            None => groups.push((feature.to_string(), vec![annotation])),
        }
    }
    groups
}

fn totals(groups: &[(String, Vec<&TestAnnotation>)]) -> (usize, usize) {
    let total = groups.iter().map(|(_, tests)| tests.len()).sum();
    let with_req = groups
        .iter()
        .flat_map(|(_, tests)| tests.iter())
        .filter(|t| !t.req.is_empty())
        .count();
    (total, with_req)
}

/// Render the stdout summary table.
pub fn render_summary(groups: &[(String, Vec<&TestAnnotation>)]) -> String {
    let (total, with_req) = totals(groups);
    let mut out = String::new();

    out.push('\n');
    out.push_str(&"=".repeat(60));
    out.push('\n');
    out.push_str(&format!("  {}\n", "Traceability Summary".bold()));
    out.push_str(&"=".repeat(60));
    out.push_str("\n\n");
    out.push_str(&format!(
        "  {:<40} {:>9} {:>9}\n",
        "Feature", "Scenarios", "With Req"
    ));
    out.push_str(&format!("  {} {} {}\n", "-".repeat(40), "-".repeat(9), "-".repeat(9)));

    for (feature, tests) in groups {
        let with_req = tests.iter().filter(|t| !t.req.is_empty()).count();
        out.push_str(&format!("  {:<40} {:>9} {:>9}\n", feature, tests.len(), with_req));
    }

    out.push_str(&format!("  {} {} {}\n", "-".repeat(40), "-".repeat(9), "-".repeat(9)));
    out.push_str(&format!("  {:<40} {:>9} {:>9}\n", "TOTAL", total, with_req));

    if total > 0 {
        let pct = with_req as f64 / total as f64 * 100.0;
        out.push_str(&format!("\n  Requirement traceability: {:.1}%\n", pct));
    }
    out.push('\n');
    out
}

/// Render the HTML traceability matrix.
pub fn render_html(groups: &[(String, Vec<&TestAnnotation>)]) -> String {
    let (total, with_req) = totals(groups);
    let coverage_pct = if total > 0 {
        with_req as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    out.push_str("<title>Traceability Report</title>\n<style>\n");
    out.push_str(concat!(
        "body { font-family: system-ui, sans-serif; max-width: 1200px; margin: 0 auto; padding: 20px; background: #f5f5f5; color: #333; }\n",
        "h1 { color: #1a5276; border-bottom: 3px solid #2980b9; padding-bottom: 10px; }\n",
        ".summary { background: #fff; border-radius: 8px; padding: 20px; margin: 20px 0; display: flex; gap: 30px; }\n",
        ".summary .stat { text-align: center; }\n",
        ".summary .stat .number { font-size: 2em; font-weight: bold; color: #2980b9; }\n",
        ".summary .stat .label { font-size: 0.9em; color: #666; }\n",
        ".feature-section { background: #fff; border-radius: 8px; padding: 20px; margin: 15px 0; }\n",
        ".feature-title { color: #2980b9; font-size: 1.3em; margin: 0 0 15px 0; border-bottom: 2px solid #eee; }\n",
        "table { width: 100%; border-collapse: collapse; font-size: 0.9em; }\n",
        "th { background: #2c3e50; color: white; padding: 10px 12px; text-align: left; }\n",
        "td { padding: 8px 12px; border-bottom: 1px solid #eee; vertical-align: top; }\n",
        ".req-tag { background: #e8f4fd; color: #1a5276; padding: 2px 8px; border-radius: 12px; font-size: 0.85em; white-space: nowrap; }\n",
        ".no-req { color: #999; font-style: italic; font-size: 0.85em; }\n",
        ".scenario-steps { margin: 4px 0 0 0; padding: 0; list-style: none; font-size: 0.85em; color: #555; }\n",
        ".step-given { color: #27ae60; }\n",
        ".step-when { color: #2980b9; }\n",
        ".step-then { color: #8e44ad; }\n",
        ".step-keyword { font-weight: bold; }\n",
        ".file-ref { font-family: monospace; font-size: 0.85em; color: #666; }\n",
    ));
    out.push_str("</style>\n</head>\n<body>\n");
    out.push_str("<h1>Traceability Report</h1>\n");

    out.push_str("<div class=\"summary\">\n");
    for (number, label) in [
        (groups.len().to_string(), "Features"),
        (total.to_string(), "Test Scenarios"),
        (with_req.to_string(), "With Requirements"),
        (format!("{:.0}%", coverage_pct), "Requirement Coverage"),
    ] {
        out.push_str(&format!(
            "<div class=\"stat\"><div class=\"number\">{}</div><div class=\"label\">{}</div></div>\n",
            number, label
        ));
    }
    out.push_str("</div>\n");

    for (feature, tests) in groups {
        out.push_str("<div class=\"feature-section\">\n");
        out.push_str(&format!(
            "<div class=\"feature-title\">{} ({} scenarios)</div>\n",
            html_escape(feature),
            tests.len()
        ));
        out.push_str("<table>\n<thead><tr>");
        out.push_str(
            "<th>Requirement</th><th>Scenario</th><th>Steps</th><th>Test Function</th><th>Source</th>",
        );
        out.push_str("</tr></thead>\n<tbody>\n");

        for t in tests {
            let req_cell = if t.req.is_empty() {
                "<span class=\"no-req\">-</span>".to_string()
            } else {
                format!("<span class=\"req-tag\">{}</span>", html_escape(&t.req))
            };

            let mut steps = String::from("<ul class=\"scenario-steps\">");
            for (class, keyword, values) in [
                ("step-given", "Given", &t.given),
                ("step-when", "When", &t.when),
                ("step-then", "Then", &t.then),
            ] {
                for value in values {
                    steps.push_str(&format!(
                        "<li class=\"{}\"><span class=\"step-keyword\">{}</span> {}</li>",
                        class,
                        keyword,
                        html_escape(value)
                    ));
                }
            }
            steps.push_str("</ul>");

            out.push_str(&format!(
                "<tr>\n<td>{}</td>\n<td>{}</td>\n<td>{}</td>\n<td><code>{}</code></td>\n\
                 <td><span class=\"file-ref\">{}:{}</span></td>\n</tr>\n",
                req_cell,
                html_escape(&t.scenario),
                steps,
                html_escape(&t.function_name),
                html_escape(&t.file_name),
                t.line_number
            ));
        }

        out.push_str("</tbody></table>\n</div>\n");
    }

    out.push_str("<footer>Generated by reqtrace</footer>\n</body>\n</html>\n");
    out
}

/// Render the Markdown specification document: per-feature sections with
/// scenario headings and Given/When/Then bullet lists.
pub fn render_markdown_spec(groups: &[(String, Vec<&TestAnnotation>)]) -> String {
    let (total, with_req) = totals(groups);
    let mut out = String::new();

    out.push_str("# Test Specification\n\n");
    out.push_str(&format!(
        "**{} features** | **{} scenarios** | **{} with requirement IDs**\n\n---\n\n",
        groups.len(),
        total,
        with_req
    ));

    out.push_str("## Table of Contents\n\n");
    for (i, (feature, _)) in groups.iter().enumerate() {
        let anchor = feature.to_lowercase().replace(' ', "-").replace('/', "");
        out.push_str(&format!("{}. [{}](#{})\n", i + 1, feature, anchor));
    }
    out.push('\n');

    for (feature, tests) in groups {
        out.push_str(&format!("## {}\n\n", feature));
        for t in tests {
            out.push_str(&format!("### {}\n\n", t.scenario));
            if !t.req.is_empty() {
                out.push_str(&format!("**Requirement:** `{}`\n\n", t.req));
            }
            for step in &t.given {
                out.push_str(&format!("- **Given** {}\n", step));
            }
            for step in &t.when {
                out.push_str(&format!("- **When** {}\n", step));
            }
            for step in &t.then {
                out.push_str(&format!("- **Then** {}\n", step));
            }
            out.push_str(&format!(
                "\n> Test: `{}` in `{}:{}`\n\n",
                t.function_name, t.file_name, t.line_number
            ));
        }
        out.push_str("---\n\n");
    }

    out
}

/// Render the Markdown traceability report (matrix format with collapsible
/// detailed steps).
pub fn render_markdown_report(groups: &[(String, Vec<&TestAnnotation>)]) -> String {
    let (total, with_req) = totals(groups);
    let coverage_pct = if total > 0 {
        with_req as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let mut out = String::new();
    out.push_str("# Traceability Report\n\n");
    out.push_str(&format!(
        "**{} features** | **{} scenarios** | **{} with requirement IDs** | **{:.0}% coverage**\n\n---\n\n",
        groups.len(),
        total,
        with_req,
        coverage_pct
    ));

    out.push_str("## Summary\n\n");
    out.push_str("| Feature | Scenarios | With Req ID | Coverage |\n");
    out.push_str("|---------|-----------|-------------|----------|\n");
    for (feature, tests) in groups {
        let n_req = tests.iter().filter(|t| !t.req.is_empty()).count();
        let pct = if tests.is_empty() {
            0.0
        } else {
            n_req as f64 / tests.len() as f64 * 100.0
        };
        out.push_str(&format!(
            "| {} | {} | {} | {:.0}% |\n",
            feature,
            tests.len(),
            n_req,
            pct
        ));
    }
    out.push_str(&format!(
        "| **TOTAL** | **{}** | **{}** | **{:.0}%** |\n\n",
        total, with_req, coverage_pct
    ));

    for (feature, tests) in groups {
        out.push_str(&format!("## {}\n\n", feature));
        out.push_str("| Requirement | Scenario | Test Function | Source |\n");
        out.push_str("|-------------|----------|---------------|--------|\n");
        for t in tests {
            let req = if t.req.is_empty() {
                "-".to_string()
            } else {
                format!("`{}`", t.req)
            };
            out.push_str(&format!(
                "| {} | {} | `{}` | `{}:{}` |\n",
                req, t.scenario, t.function_name, t.file_name, t.line_number
            ));
        }
        out.push('\n');

        out.push_str("<details>\n");
        out.push_str(&format!(
            "<summary>Detailed steps ({} scenarios)</summary>\n\n",
            tests.len()
        ));
        for t in tests {
            out.push_str(&format!("### {}\n", t.scenario));
            if !t.req.is_empty() {
                out.push_str(&format!("**Requirement:** `{}`\n", t.req));
            }
            out.push('\n');
            for step in &t.given {
                out.push_str(&format!("- **Given** {}\n", step));
            }
            for step in &t.when {
                out.push_str(&format!("- **When** {}\n", step));
            }
            for step in &t.then {
                out.push_str(&format!("- **Then** {}\n", step));
            }
            out.push('\n');
        }
        out.push_str("</details>\n\n---\n\n");
    }

    out.push_str("*Generated by reqtrace*\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(feature: &str, req: &str, function: &str) -> TestAnnotation {
        TestAnnotation {
            feature: feature.to_string(),
            req: req.to_string(),
            scenario: format!("{} scenario", function),
            given: vec!["a precondition".to_string()],
            when: vec!["something happens".to_string()],
            then: vec!["an outcome".to_string()],
            function_name: function.to_string(),
            file_name: "test_x.c".to_string(),
            line_number: 10,
        }
    }

    #[test]
    fn test_grouping_preserves_first_seen_order() {
        let annotations = vec![
            annotation("Charging", "REQ-1", "test_a"),
            annotation("Faults", "REQ-2", "test_b"),
            annotation("Charging", "", "test_c"),
        ];
        let groups = group_by_feature(&annotations);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "Charging");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "Faults");
    }

    #[test]
    fn test_empty_feature_is_uncategorized() {
        let annotations = vec![annotation("", "REQ-1", "test_a")];
        let groups = group_by_feature(&annotations);
        assert_eq!(groups[0].0, "Uncategorized");
    }

    #[test]
    fn test_summary_counts_requirements() {
        let annotations = vec![
            annotation("Charging", "REQ-1", "test_a"),
            annotation("Charging", "", "test_b"),
        ];
        let groups = group_by_feature(&annotations);
        let summary = render_summary(&groups);
        assert!(summary.contains("Charging"));
        assert!(summary.contains("Requirement traceability: 50.0%"));
    }

    #[test]
    fn test_markdown_report_structure() {
        let annotations = vec![annotation("Charging", "REQ-1", "test_a")];
        let groups = group_by_feature(&annotations);
        let md = render_markdown_report(&groups);
        assert!(md.contains("| `REQ-1` | test_a scenario | `test_a` | `test_x.c:10` |"));
        assert!(md.contains("<details>"));
        assert!(md.contains("- **Given** a precondition"));
    }

    #[test]
    fn test_html_matrix_escapes_and_groups() {
        let mut annotations = vec![annotation("Limits & Guards", "REQ-1", "test_a")];
        annotations[0].scenario = "current < 6A".to_string();
        let groups = group_by_feature(&annotations);
        let html = render_html(&groups);
        assert!(html.contains("Limits &amp; Guards"));
        assert!(html.contains("current &lt; 6A"));
        assert!(html.contains("test_x.c:10"));
    }

    #[test]
    fn test_markdown_spec_has_toc() {
        let annotations = vec![
            annotation("State transitions", "REQ-1", "test_a"),
            annotation("Faults", "", "test_b"),
        ];
        let groups = group_by_feature(&annotations);
        let md = render_markdown_spec(&groups);
        assert!(md.contains("1. [State transitions](#state-transitions)"));
        assert!(md.contains("2. [Faults](#faults)"));
        assert!(md.contains("> Test: `test_a` in `test_x.c:10`"));
    }
}
