use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::providers::{GenerationResponse, ProviderKind};

/// Limit applied by [`HistoryQuery`] when none is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One successful generation, kept for `prism history` and `prism stats`.
///
/// Stored as JSON in `<storage dir>/<timestamp>-<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: Uuid,
    pub provider: ProviderKind,
    pub model: String,
    pub prompt: String,
    pub response: String,
    pub tokens_used: u64,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl GenerationRecord {
    pub fn from_response(prompt: &str, response: &GenerationResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider: response.provider,
            model: response.model.clone(),
            prompt: prompt.to_string(),
            response: response.content.clone(),
            tokens_used: response.tokens_used,
            duration_ms: response.duration.as_millis() as u64,
            created_at: response.generated_at,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    fn file_name(&self) -> String {
        format!(
            "{}-{}.json",
            self.created_at.format("%Y%m%d-%H%M%S%.3f"),
            self.id.simple()
        )
    }
}

/// Filter for history and stats. Time bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub provider: Option<ProviderKind>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Maximum records returned by `query`; ignored by `stats`.
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn matches(&self, record: &GenerationRecord) -> bool {
        self.provider.is_none_or(|p| p == record.provider)
            && self.since.is_none_or(|t| record.created_at >= t)
            && self.until.is_none_or(|t| record.created_at <= t)
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderStats {
    pub total_generations: u64,
    pub total_tokens: u64,
    pub avg_duration_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationStats {
    pub total_generations: u64,
    pub total_tokens: u64,
    pub avg_tokens: f64,
    pub avg_duration_ms: f64,
    pub most_used_provider: Option<ProviderKind>,
    pub by_provider: BTreeMap<ProviderKind, ProviderStats>,
}

impl GenerationStats {
    /// Aggregate over records already filtered by the caller.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a GenerationRecord>) -> Self {
        let mut stats = Self::default();
        let mut total_duration = 0u64;
        let mut durations: BTreeMap<ProviderKind, u64> = BTreeMap::new();

        for record in records {
            stats.total_generations += 1;
            stats.total_tokens += record.tokens_used;
            total_duration += record.duration_ms;

            let entry = stats.by_provider.entry(record.provider).or_default();
            entry.total_generations += 1;
            entry.total_tokens += record.tokens_used;
            *durations.entry(record.provider).or_default() += record.duration_ms;
        }

        if stats.total_generations == 0 {
            return stats;
        }

        let total = stats.total_generations as f64;
        stats.avg_tokens = stats.total_tokens as f64 / total;
        stats.avg_duration_ms = total_duration as f64 / total;

        for (provider, entry) in stats.by_provider.iter_mut() {
            let duration = durations.get(provider).copied().unwrap_or(0);
            entry.avg_duration_ms = duration as f64 / entry.total_generations as f64;
        }

        // Ties go to the provider that sorts first.
        stats.most_used_provider = stats
            .by_provider
            .iter()
            .max_by(|(ka, a), (kb, b)| {
                a.total_generations
                    .cmp(&b.total_generations)
                    .then_with(|| kb.cmp(ka))
            })
            .map(|(kind, _)| *kind);

        stats
    }
}

/// Persistence for successful generations.
pub trait GenerationStore: Send + Sync {
    fn save(&self, record: &GenerationRecord) -> Result<()>;

    /// Matching records, newest first, capped at the query limit.
    fn query(&self, query: &HistoryQuery) -> Result<Vec<GenerationRecord>>;

    fn stats(&self, query: &HistoryQuery) -> Result<GenerationStats>;
}

/// One pretty-printed JSON file per record.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(path: &Path) -> Result<GenerationRecord> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read generation record: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse generation record: {}", path.display()))
    }

    /// Every readable record matching `query`, newest first. No limit applied.
    fn load(&self, query: &HistoryQuery) -> Result<Vec<GenerationRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();

        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read storage dir: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }

            match Self::read(&path) {
                Ok(record) if query.matches(&record) => records.push(record),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed generation record"),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

impl GenerationStore for JsonFileStore {
    fn save(&self, record: &GenerationRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create storage dir: {}", self.dir.display()))?;

        let path = self.dir.join(record.file_name());
        let json =
            serde_json::to_string_pretty(record).context("Failed to serialize generation record")?;

        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write generation record: {}", path.display()))
    }

    fn query(&self, query: &HistoryQuery) -> Result<Vec<GenerationRecord>> {
        let mut records = self.load(query)?;
        records.truncate(query.effective_limit());
        Ok(records)
    }

    fn stats(&self, query: &HistoryQuery) -> Result<GenerationStats> {
        Ok(GenerationStats::from_records(&self.load(query)?))
    }
}

/// Format a token count for display (e.g., 1234 → "1,234", 1234567 → "1.2M").
pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        return format!("{:.1}M", tokens as f64 / 1_000_000.0);
    }

    let digits = tokens.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
