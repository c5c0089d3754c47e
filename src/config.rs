use std::time::Duration;

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Engine tunables. The numeric thresholds are heuristics, not contracts;
/// every one of them can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Provider recent-message window size.
    pub window_size: usize,
    /// Two records from different sources within this window and with
    /// matching fingerprints are the same real-world message.
    pub dedup_tolerance_ms: i64,
    /// Fingerprint prefix length, in chars.
    pub fingerprint_len: usize,
    /// How long the assistant-fingerprint index may be served stale.
    pub attribution_ttl: Duration,
    /// Concurrent per-contact log backfill reads.
    pub backfill_batch: usize,
    /// Fallback classifier phrases, lowercase.
    pub assistant_phrases: Vec<String>,
}

const DEFAULT_ASSISTANT_PHRASES: &[&str] = &[
    "i am the clinic's virtual assistant",
    "thank you for contacting",
    "your appointment has been confirmed",
    "your appointment is scheduled for",
    "would you like to book an appointment",
    "is there anything else i can help",
];

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_size: 500,
            dedup_tolerance_ms: 60_000,
            fingerprint_len: 120,
            attribution_ttl: Duration::from_secs(180),
            backfill_batch: 8,
            assistant_phrases: DEFAULT_ASSISTANT_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let phrases = std::env::var("SANA_ASSISTANT_PHRASES")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.assistant_phrases);

        Self {
            window_size: env_parse("SANA_WINDOW_SIZE", defaults.window_size),
            dedup_tolerance_ms: env_parse("SANA_DEDUP_TOLERANCE_MS", defaults.dedup_tolerance_ms),
            fingerprint_len: env_parse("SANA_FINGERPRINT_LEN", defaults.fingerprint_len),
            attribution_ttl: Duration::from_secs(env_parse(
                "SANA_ATTRIBUTION_TTL_SECS",
                defaults.attribution_ttl.as_secs(),
            )),
            backfill_batch: env_parse("SANA_BACKFILL_BATCH", defaults.backfill_batch).max(1),
            assistant_phrases: phrases,
        }
    }
}

/// Connection settings for the hosted messaging gateway.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub instance: String,
    pub api_key: String,
}

impl ProviderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("SANA_PROVIDER_URL")
            .map_err(|_| anyhow::anyhow!("SANA_PROVIDER_URL not set"))?;
        let instance = std::env::var("SANA_PROVIDER_INSTANCE")
            .map_err(|_| anyhow::anyhow!("SANA_PROVIDER_INSTANCE not set"))?;
        let api_key = std::env::var("SANA_PROVIDER_API_KEY")
            .map_err(|_| anyhow::anyhow!("SANA_PROVIDER_API_KEY not set"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            instance,
            api_key,
        })
    }
}
