use anyhow::Result;
use colored::Colorize;

use crate::core::gateway::Gateway;
use crate::core::style;

pub async fn run(gateway: &Gateway, json: bool) -> Result<()> {
    let descriptors = gateway.providers();

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    eprintln!("{}", style::header("Providers"));

    for d in &descriptors {
        eprintln!();
        eprintln!(
            "{} {} {}",
            d.provider.as_str().bold().cyan(),
            d.name.dimmed(),
            style::availability(d.available)
        );
        eprintln!("{}", style::summary_line("Max tokens", &d.max_tokens.to_string()));
        eprintln!("{}", style::summary_line("Models", &d.models.join(", ")));
        eprintln!("{}", style::summary_line("Pricing", d.pricing));
        eprintln!("{}", style::summary_line("Strengths", &d.strengths.join("; ")));
        eprintln!("{}", style::summary_line("Weaknesses", &d.weaknesses.join("; ")));
        eprintln!("{}", style::summary_line("Best for", &d.best_for.join("; ")));
    }

    if !descriptors.iter().any(|d| d.available) {
        eprintln!();
        eprintln!(
            "{}",
            style::hint("Hint: set OPENAI_API_KEY or GEMINI_API_KEY, or add keys to prism.toml.")
        );
    }

    Ok(())
}
