use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use crate::core::gateway::Gateway;
use crate::core::history::{HistoryQuery, format_tokens};
use crate::core::style;
use crate::providers::ProviderKind;

pub async fn run(
    gateway: &Gateway,
    provider: Option<ProviderKind>,
    days: Option<u32>,
    json: bool,
) -> Result<()> {
    let query = HistoryQuery {
        provider,
        since: days.map(|d| Utc::now() - chrono::Duration::days(i64::from(d))),
        ..Default::default()
    };
    let stats = gateway.stats(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    if stats.total_generations == 0 {
        eprintln!("{}", "No generations recorded.".dimmed());
        return Ok(());
    }

    eprintln!(
        "{}",
        style::header(&format!("Stats ({} generation(s))", stats.total_generations))
    );
    eprintln!(
        "{}",
        style::summary_line("Total tokens", &format_tokens(stats.total_tokens))
    );
    eprintln!(
        "{}",
        style::summary_line("Avg tokens", &format!("{:.0}", stats.avg_tokens))
    );
    eprintln!(
        "{}",
        style::summary_line("Avg duration", &format!("{:.1}s", stats.avg_duration_ms / 1000.0))
    );
    if let Some(most_used) = stats.most_used_provider {
        eprintln!("{}", style::summary_line("Most used", most_used.as_str()));
    }

    eprintln!();
    eprintln!("  {}", style::section("By provider:"));
    for (provider, p) in &stats.by_provider {
        eprintln!(
            "    {:<10} {} generation(s), {} tokens, {}",
            provider.as_str().cyan(),
            p.total_generations.to_string().bold(),
            format_tokens(p.total_tokens),
            format!("{:.1}s avg", p.avg_duration_ms / 1000.0).dimmed()
        );
    }

    Ok(())
}
