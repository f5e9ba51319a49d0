use anyhow::Result;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::core::compare::ComparisonRequest;
use crate::core::gateway::Gateway;
use crate::core::history::format_tokens;
use crate::core::style;
use crate::providers::ProviderKind;

pub async fn run(
    gateway: &Gateway,
    cancel: &CancellationToken,
    prompt: String,
    providers: Vec<ProviderKind>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    json: bool,
) -> Result<()> {
    let requested = providers.len();
    let mut request = ComparisonRequest::new(prompt, providers);
    request.max_tokens = max_tokens;
    request.temperature = temperature;

    let result = match gateway.compare(cancel, &request).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}", style::gateway_error(&e));
            anyhow::bail!("Comparison failed");
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    eprintln!(
        "{}",
        style::header(&format!(
            "Comparison ({} of {} provider(s) succeeded)",
            result.results.len(),
            requested
        ))
    );

    for response in &result.results {
        eprintln!();
        eprintln!(
            "{}",
            style::provider_header(response.provider.as_str(), &response.model)
        );
        println!("{}", response.content);
        eprintln!(
            "{}",
            style::gen_result(&format_tokens(response.tokens_used), response.duration)
        );
    }

    if result.results.len() < requested {
        eprintln!();
        eprintln!(
            "{}",
            style::warning("Some providers failed; run with --verbose for details.")
        );
    }

    if let Some(fastest) = result.results.iter().min_by_key(|r| r.duration) {
        eprintln!();
        eprintln!(
            "{}",
            style::summary_line("Fastest", &fastest.provider.as_str().bold().to_string())
        );
    }

    Ok(())
}
