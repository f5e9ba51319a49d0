use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::core::gateway::Gateway;
use crate::core::history::format_tokens;
use crate::core::style;
use crate::providers::{GenerationRequest, ProviderKind};

pub struct Args {
    pub prompt: String,
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl From<Args> for GenerationRequest {
    fn from(args: Args) -> Self {
        GenerationRequest {
            provider: args.provider,
            model: args.model,
            prompt: args.prompt,
            system: args.system,
            max_tokens: args.max_tokens,
            temperature: args.temperature,
        }
    }
}

pub async fn run(gateway: &Gateway, cancel: &CancellationToken, args: Args, json: bool) -> Result<()> {
    let request = GenerationRequest::from(args);

    let response = match gateway.generate(cancel, &request).await {
        Ok(response) => response,
        Err(e) => {
            eprintln!("{}", style::gateway_error(&e));
            anyhow::bail!("Generation failed");
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    eprintln!(
        "{}",
        style::provider_header(response.provider.as_str(), &response.model)
    );
    println!("{}", response.content);
    eprintln!(
        "{}",
        style::gen_result(&format_tokens(response.tokens_used), response.duration)
    );

    Ok(())
}
