use anyhow::Result;
use colored::Colorize;

use crate::core::gateway::Gateway;
use crate::core::history::{HistoryQuery, format_tokens};
use crate::core::style;
use crate::providers::ProviderKind;

/// Prompt and response previews are cut to this many characters.
const PREVIEW_CHARS: usize = 60;

pub async fn run(
    gateway: &Gateway,
    limit: Option<usize>,
    provider: Option<ProviderKind>,
    json: bool,
) -> Result<()> {
    let query = HistoryQuery {
        provider,
        limit,
        ..Default::default()
    };
    let records = gateway.history(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        eprintln!("{}", "No generations yet.".dimmed());
        eprintln!("{}", style::hint("Hint: Run `prism generate \"...\"` first."));
        return Ok(());
    }

    for record in &records {
        eprintln!(
            "{} {} {} {}",
            style::datetime(&record.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            record.provider.as_str().cyan(),
            record.model.dimmed(),
            format!(
                "({} tokens, {:.1}s)",
                format_tokens(record.tokens_used),
                record.duration().as_secs_f64()
            )
            .dimmed()
        );
        eprintln!("  {} {}", ">".bold(), preview(&record.prompt));
        eprintln!("  {} {}", "<".bold(), preview(&record.response).dimmed());
    }

    if records.len() == query.effective_limit() {
        eprintln!();
        eprintln!(
            "{}",
            format!(
                "(showing {} of possibly more, use -n to increase)",
                records.len()
            )
            .dimmed()
        );
    }

    Ok(())
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > PREVIEW_CHARS || text.lines().nth(1).is_some() {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
