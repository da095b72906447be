use crate::application::orchestrator::SwitchSummary;
use crate::domain::model::FetchStatus;
use crate::presentation::theme::Theme;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Per-key counts, one line per status board key
pub fn format_status(statuses: &BTreeMap<String, FetchStatus>, theme: &Theme) -> String {
    let mut output = String::new();
    if statuses.is_empty() {
        writeln!(output, "  {}", (theme.dim)("nothing cached")).ok();
        return output;
    }

    for (key, status) in statuses {
        let (class, role_key) = key.split_once(':').unwrap_or(("", key.as_str()));
        let mut line = format!(
            "  {:<12} {:<6} {}",
            (theme.class)(class),
            (theme.key)(role_key),
            (theme.count)(&status.items.len().to_string())
        );
        if status.loading {
            line.push_str(&format!(" {}", (theme.dim)("(loading)")));
        }
        if let Some(error) = &status.error {
            line.push_str(&format!(" {}", (theme.error)(error)));
        }
        writeln!(output, "{}", line).ok();
    }
    output
}

pub fn format_summary(summary: &SwitchSummary, theme: &Theme) -> String {
    let mut output = String::new();
    let headline = format!(
        "{}/{} fetches started",
        summary.successful, summary.total
    );
    if summary.is_complete() {
        writeln!(output, "{}", (theme.ok)(&headline)).ok();
    } else {
        writeln!(output, "{}", (theme.error)(&headline)).ok();
        for failure in &summary.failures {
            writeln!(
                output,
                "  ✘ {} {}",
                (theme.key)(&failure.name),
                (theme.error)(&failure.error.to_string())
            )
            .ok();
        }
    }
    output
}
