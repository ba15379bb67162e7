//! Message formatting for summaries and alerts.

use std::fmt::Write;

use pulsewatch_core::Service;

const SUMMARY_TITLE: &str = "🌐 Service Monitor Status 🌐";
const ALERT_TITLE: &str = "🚨 Service Alert 🚨";
const NO_ERROR: &str = "No errors";
const UNKNOWN_ERROR: &str = "Unknown error";
const RULE_WIDTH: usize = 50;

/// Render the full status summary.
///
/// The service table sits in a fenced code block so the columns line up in
/// monospace. There is exactly one row per service, in the order given.
pub fn render_summary(services: &[Service]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{SUMMARY_TITLE}\n");
    out.push_str("```\n");
    out.push_str("Service\t\tStatus\t\tDetails\n");
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');
    for svc in services {
        let details = svc.last_error.as_deref().unwrap_or(NO_ERROR);
        let _ = writeln!(out, "{}\t\t{}\t\t{}", svc.name, svc.status.glyph(), details);
    }
    out.push_str("```");
    out
}

/// Render an alert for a single unhealthy service.
pub fn render_alert(service: &Service) -> String {
    format!(
        "{ALERT_TITLE}\nService: {}\nStatus: {}\nError: {}\nURL: {}",
        service.name,
        service.status.glyph(),
        service.last_error.as_deref().unwrap_or(UNKNOWN_ERROR),
        service.url,
    )
}
