use std::fmt;

use crate::providers::ProviderKind;

/// A request that can never succeed as written. Detected before any network call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("prompt is required")]
    EmptyPrompt,

    #[error("max_tokens cannot exceed {limit} for {provider} models (got {requested})")]
    MaxTokensExceeded {
        provider: ProviderKind,
        limit: u32,
        requested: u32,
    },

    #[error("temperature must be between {min} and {max} for {provider} (got {value})")]
    TemperatureOutOfRange {
        provider: ProviderKind,
        min: f32,
        max: f32,
        value: f32,
    },
}

/// Failure of the provider call itself: network, HTTP status, or payload shape.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpstreamError {
    #[error("failed to make request: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("empty response: {0}")]
    Empty(&'static str),

    #[error("request cancelled")]
    Cancelled,

    #[error("{0} is not implemented yet")]
    NotImplemented(ProviderKind),
}

/// One failed branch of a comparison.
#[derive(Debug)]
pub struct BranchFailure {
    pub provider: ProviderKind,
    pub error: GatewayError,
}

impl fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider {} failed: {}", self.provider, self.error)
    }
}

/// Everything the dispatcher and comparison coordinator can return.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(
        "no AI providers configured. Please set at least one API key \
         (OPENAI_API_KEY, GEMINI_API_KEY, or ANTHROPIC_API_KEY)"
    )]
    NoProvidersConfigured,

    #[error("provider {requested} not found. Available providers: [{}]", join(.available))]
    ProviderNotConfigured {
        requested: ProviderKind,
        available: Vec<ProviderKind>,
    },

    #[error("provider {0} is not available")]
    ProviderUnavailable(ProviderKind),

    #[error("{provider} API error: {source}")]
    Upstream {
        provider: ProviderKind,
        #[source]
        source: UpstreamError,
    },

    #[error("all providers failed: [{}]", join(.0))]
    AllProvidersFailed(Vec<BranchFailure>),
}

/// Coarse classification of a [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    ProviderNotConfigured,
    ProviderUnavailable,
    Upstream,
    AggregateComparison,
}

/// What the caller should do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    FixRequest,
    TryAnotherProvider,
    ServiceProblem,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NoProvidersConfigured | Self::ProviderNotConfigured { .. } => {
                ErrorKind::ProviderNotConfigured
            }
            Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::AllProvidersFailed(_) => ErrorKind::AggregateComparison,
        }
    }

    pub fn remedy(&self) -> Remedy {
        self.kind().remedy()
    }
}

impl ErrorKind {
    pub fn remedy(self) -> Remedy {
        match self {
            Self::Validation => Remedy::FixRequest,
            Self::ProviderNotConfigured | Self::ProviderUnavailable => Remedy::TryAnotherProvider,
            Self::Upstream | Self::AggregateComparison => Remedy::ServiceProblem,
        }
    }
}

impl fmt::Display for Remedy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::FixRequest => "fix your request",
            Self::TryAnotherProvider => "try a different provider",
            Self::ServiceProblem => "upstream/service problem",
        };
        f.write_str(text)
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
