use super::validation::{IssueDetail, IssueKind, ValidationReport};

const RULE: &str = "============================================================";
const EXAMPLE_ROWS: usize = 5;

/// Render a validation report, plus any cleaning and preparation logs, as
/// plain text for a terminal or a `.txt` file.
pub fn render_text(report: &ValidationReport, cleaning_log: &[String], prep_log: &[String]) -> String {
    let summary = &report.summary;
    let mut lines = vec![
        RULE.to_owned(),
        "DATA QUALITY REPORT".to_owned(),
        RULE.to_owned(),
        format!("Rows: {}", summary.total_rows),
        format!("Columns: {}", summary.total_columns),
        String::new(),
        "SUMMARY".to_owned(),
    ];
    for kind in IssueKind::ALL {
        lines.push(format!(
            "  {:<24} {:>6} affected in {} issues",
            kind.title(),
            summary.affected(kind),
            summary.issues(kind)
        ));
    }

    if report.is_clean() {
        lines.push(String::new());
        lines.push("No issues found.".to_owned());
    }

    for kind in IssueKind::ALL {
        let mut issues = report.of_kind(kind).peekable();
        if issues.peek().is_none() {
            continue;
        }
        lines.push(String::new());
        lines.push(kind.title().to_uppercase());
        for issue in issues {
            lines.push(format!("  [{:?}] {}", issue.severity, issue.description));
            if let IssueDetail::InvalidValues { values } = &issue.detail {
                for (row, value) in issue.rows.iter().zip(values).take(EXAMPLE_ROWS) {
                    lines.push(format!("      row {row}: {value:?}"));
                }
                if issue.rows.len() > EXAMPLE_ROWS {
                    lines.push(format!("      ... {} more", issue.rows.len() - EXAMPLE_ROWS));
                }
            }
        }
    }

    push_log(&mut lines, "CLEANING LOG", cleaning_log);
    push_log(&mut lines, "TABLEAU PREPARATION LOG", prep_log);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn push_log(lines: &mut Vec<String>, title: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(title.to_owned());
    lines.extend(entries.iter().map(|entry| format!("  - {entry}")));
}
