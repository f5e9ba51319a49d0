//! Consistent colored terminal output for the prism CLI.
//!
//! All user-facing output goes through these helpers so colors are uniform.
//! Colors are automatically disabled when stdout/stderr is not a TTY.

use std::time::Duration;

use colored::Colorize;

use crate::core::error::GatewayError;

// ---------- Prefixes / Labels ----------

/// Format a header line: "=== Title ==="
pub fn header(title: &str) -> String {
    format!("=== {} ===", title.bold())
}

/// Provider heading: "openai (gpt-3.5-turbo)"
pub fn provider_header(provider: &str, model: &str) -> String {
    format!("{} {}", provider.bold().cyan(), format!("({})", model).dimmed())
}

// ---------- Status indicators ----------

/// Yellow warning + message
pub fn warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg)
}

/// Red error + message
pub fn error(msg: &str) -> String {
    format!("{} {}", "✗".red().bold(), msg)
}

/// Dim info/hint message
pub fn hint(msg: &str) -> String {
    format!("{}", msg.dimmed())
}

/// Error line followed by what the caller can do about it.
pub fn gateway_error(err: &GatewayError) -> String {
    format!("{}\n  {}", error(&err.to_string()), hint(&format!("({})", err.remedy())))
}

// ---------- Generation output ----------

/// Generation footer: "    ✓ 123 tokens, 2.3s"
pub fn gen_result(tokens: &str, duration: Duration) -> String {
    format!(
        "    {} {}, {}",
        "✓".green().bold(),
        format!("{} tokens", tokens).dimmed(),
        format!("{:.1}s", duration.as_secs_f64()).dimmed(),
    )
}

// ---------- Summary formatting ----------

/// Format a key-value summary line with aligned values
pub fn summary_line(key: &str, value: &str) -> String {
    format!("  {:<20} {}", format!("{}:", key).dimmed(), value)
}

/// Available/unavailable badge
pub fn availability(available: bool) -> String {
    if available {
        format!("{}", "available".green())
    } else {
        format!("{}", "unavailable".red())
    }
}

/// Format a datetime string (dimmed)
pub fn datetime(dt: &str) -> String {
    format!("{}", dt.dimmed())
}

// ---------- Section headers ----------

/// Bold section label: "Strengths:", "By provider:", etc.
pub fn section(label: &str) -> String {
    format!("{}", label.bold())
}
