use serde::Deserialize;

/// Decides whether a configured API key is real or a leftover placeholder.
///
/// ```toml
/// [credentials]
/// placeholders = ["changeme"]
/// min_length = 20
/// markers = ["your_", "placeholder"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialPolicy {
    /// Exact values that mean "not configured".
    pub placeholders: Vec<String>,
    /// Keys shorter than this are rejected.
    pub min_length: usize,
    /// Substrings that mark a key as a placeholder.
    pub markers: Vec<String>,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            placeholders: [
                "your_openai_api_key_here",
                "your_gemini_api_key_here",
                "your_anthropic_api_key_here",
                "your-api-key-here",
                "your_api_key_here",
                "placeholder",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            min_length: 10,
            markers: vec!["your_".to_string(), "placeholder".to_string()],
        }
    }
}

impl CredentialPolicy {
    pub fn is_live(&self, key: &str) -> bool {
        let key = key.trim();
        !key.is_empty()
            && key.chars().count() >= self.min_length
            && !self.placeholders.iter().any(|p| p == key)
            && !self.markers.iter().any(|m| key.contains(m.as_str()))
    }
}
