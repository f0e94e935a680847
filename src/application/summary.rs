use colored::Colorize;
use supports_color::Stream;

use crate::application::RemediationOutcome;
use crate::migration::MigrationReport;

pub fn print_summary(outcome: &RemediationOutcome) {
    colored::control::set_override(supports_color::on(Stream::Stdout).is_some());
    print!("{}", render_summary(outcome));
}

fn render_summary(outcome: &RemediationOutcome) -> String {
    match outcome {
        RemediationOutcome::NotLeaking => format!("{}\n", "No leak detected, nothing migrated".green()),
        RemediationOutcome::Migrated { outbound, inbound } => {
            let mut out = String::new();
            render_report(&mut out, "outbound", outbound);
            render_report(&mut out, "return", inbound);
            out
        }
    }
}

fn render_report(out: &mut String, label: &str, report: &MigrationReport) {
    let status = if report.is_clean() {
        "ok".green().bold()
    } else {
        "incomplete".red().bold()
    };
    out.push_str(&format!("{} [{}] {}\n", label.bold(), status, report));
    for failure in &report.failures {
        out.push_str(&format!("  {}\n", failure.to_string().red()));
    }
    for path in report.left_behind() {
        out.push_str(&format!("  {} {}\n", "left behind:".yellow(), path.display()));
    }
}
