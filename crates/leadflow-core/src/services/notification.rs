//! Workflow execution notification emails

use crate::config::NotificationConfig;
use crate::services::sanitize::sanitize_string;
use leadflow_types::{ExecutionStatus, StepStatus, WorkflowExecutionSummary};
use serde::Serialize;

/// Ready-to-send email parts
#[derive(Debug, Clone, Serialize)]
pub struct ComposedNotification {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub struct NotificationComposer {
    config: NotificationConfig,
}

fn status_label(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Succeeded => "completed successfully",
        ExecutionStatus::PartiallySucceeded => "completed with errors",
        ExecutionStatus::Failed => "failed",
    }
}

fn step_marker(status: StepStatus) -> (&'static str, &'static str) {
    match status {
        StepStatus::Succeeded => ("✅", "#16a34a"),
        StepStatus::Failed => ("❌", "#dc2626"),
        StepStatus::Skipped => ("⏭", "#6b7280"),
    }
}

fn format_duration(summary: &WorkflowExecutionSummary) -> Option<String> {
    let finished = summary.finished_at?;
    let secs = (finished - summary.started_at).num_seconds().max(0);
    Some(if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    })
}

impl NotificationComposer {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    pub fn compose(&self, summary: &WorkflowExecutionSummary) -> ComposedNotification {
        let subject = format!(
            "[{}] Workflow \"{}\" {}",
            self.config.app_name,
            summary.workflow_name,
            status_label(summary.status)
        );

        ComposedNotification {
            subject,
            text: self.compose_text(summary),
            html: self.compose_html(summary),
        }
    }

    fn compose_text(&self, summary: &WorkflowExecutionSummary) -> String {
        let mut lines = vec![
            format!("Workflow: {}", summary.workflow_name),
            format!("Status: {}", status_label(summary.status)),
            format!("Execution ID: {}", summary.execution_id),
            format!("Started: {}", summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ];
        if let Some(duration) = format_duration(summary) {
            lines.push(format!("Duration: {}", duration));
        }
        lines.push(format!("Leads found: {}", summary.leads_found));
        lines.push(format!("Emails sent: {}", summary.emails_sent));

        if !summary.steps.is_empty() {
            lines.push(String::new());
            lines.push("Steps:".to_string());
            for step in &summary.steps {
                let (marker, _) = step_marker(step.status);
                match &step.detail {
                    Some(detail) => lines.push(format!("  {} {}: {}", marker, step.name, detail)),
                    None => lines.push(format!("  {} {}", marker, step.name)),
                }
            }
        }

        if let Some(error) = &summary.error_message {
            lines.push(String::new());
            lines.push(format!("Error: {}", error));
        }

        if let Some(url) = &self.config.dashboard_url {
            lines.push(String::new());
            lines.push(format!("View details: {}", url));
        }

        lines.join("\n")
    }

    fn compose_html(&self, summary: &WorkflowExecutionSummary) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html><html><body style=\"font-family:Arial,sans-serif;color:#111827;\">");
        html.push_str(&format!(
            "<h2>{}</h2><p>Workflow <strong>{}</strong> {}.</p>",
            sanitize_string(&self.config.app_name),
            sanitize_string(&summary.workflow_name),
            status_label(summary.status)
        ));

        html.push_str("<table cellpadding=\"4\" style=\"border-collapse:collapse;\">");
        let mut row = |label: &str, value: String| {
            html.push_str(&format!("<tr><td><strong>{}</strong></td><td>{}</td></tr>", label, value));
        };
        row("Execution ID", sanitize_string(&summary.execution_id));
        row("Started", summary.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
        if let Some(duration) = format_duration(summary) {
            row("Duration", duration);
        }
        row("Leads found", summary.leads_found.to_string());
        row("Emails sent", summary.emails_sent.to_string());
        html.push_str("</table>");

        if !summary.steps.is_empty() {
            html.push_str("<h3>Steps</h3><ul>");
            for step in &summary.steps {
                let (marker, color) = step_marker(step.status);
                html.push_str(&format!(
                    "<li style=\"color:{};\">{} {}",
                    color,
                    marker,
                    sanitize_string(&step.name)
                ));
                if let Some(detail) = &step.detail {
                    html.push_str(&format!(": {}", sanitize_string(detail)));
                }
                html.push_str("</li>");
            }
            html.push_str("</ul>");
        }

        if let Some(error) = &summary.error_message {
            html.push_str(&format!(
                "<p style=\"color:#dc2626;\"><strong>Error:</strong> {}</p>",
                sanitize_string(error)
            ));
        }

        if let Some(url) = &self.config.dashboard_url {
            html.push_str(&format!(
                "<p><a href=\"{}\">View details</a></p>",
                sanitize_string(url)
            ));
        }

        html.push_str("</body></html>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn composer() -> NotificationComposer {
        NotificationComposer::new(NotificationConfig {
            app_name: "Leadflow".to_string(),
            dashboard_url: Some("https://app.leadflow.io/workflows".to_string()),
        })
    }

    fn summary() -> WorkflowExecutionSummary {
        let mut summary = WorkflowExecutionSummary::new("Weekly <SaaS> outreach");
        summary.finished_at = Some(summary.started_at + Duration::seconds(95));
        summary.leads_found = 12;
        summary.emails_sent = 10;
        summary.record_step("Search leads", StepStatus::Succeeded, Some("12 leads".to_string()));
        summary.record_step("Send emails", StepStatus::Failed, Some("2 bounced & retried".to_string()));
        summary
    }

    #[test]
    fn test_compose_subject() {
        let composed = composer().compose(&summary());
        assert_eq!(
            composed.subject,
            "[Leadflow] Workflow \"Weekly <SaaS> outreach\" completed with errors"
        );
    }

    #[test]
    fn test_compose_text() {
        let text = composer().compose(&summary()).text;
        assert!(text.contains("Duration: 1m 35s"));
        assert!(text.contains("Leads found: 12"));
        assert!(text.contains("❌ Send emails: 2 bounced & retried"));
        assert!(text.contains("View details: https://app.leadflow.io/workflows"));
    }

    #[test]
    fn test_compose_html_escapes_user_data() {
        let html = composer().compose(&summary()).html;
        assert!(html.contains("Weekly &lt;SaaS&gt; outreach"));
        assert!(!html.contains("<SaaS>"));
        assert!(html.contains("2 bounced &amp; retried"));
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn test_compose_failed_run_without_steps() {
        let mut summary = WorkflowExecutionSummary::new("Nightly sync");
        summary.status = ExecutionStatus::Failed;
        summary.error_message = Some("Apollo returned 401".to_string());

        let composed = NotificationComposer::new(NotificationConfig::default()).compose(&summary);
        assert!(composed.subject.ends_with("failed"));
        assert!(!composed.text.contains("Steps:"));
        assert!(!composed.text.contains("Duration"));
        assert!(composed.text.contains("Error: Apollo returned 401"));
        assert!(composed.html.contains("Apollo returned 401"));
    }
}
