use std::env;
use std::path::PathBuf;
use std::time::Duration;

use prodigy_contracts::models::DEFAULT_SOLVER_MODEL;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u64 = 4096;
pub const DEFAULT_MAX_IMAGE_DIM: u32 = 2048;

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub api_base: String,
    pub model: String,
    /// `None` waits for the model as long as it takes.
    pub timeout: Option<Duration>,
    pub max_output_tokens: u64,
    pub max_image_dim: u32,
    /// Directory for the staged screenshot; the system temp dir when `None`.
    pub staging_dir: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_SOLVER_MODEL.to_string(),
            timeout: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            max_image_dim: DEFAULT_MAX_IMAGE_DIM,
            staging_dir: None,
        }
    }
}

impl SolverConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_base: first_non_empty(&lookup, &["OPENAI_API_BASE", "OPENAI_BASE_URL"])
                .map(|raw| normalize_api_base(&raw))
                .unwrap_or(defaults.api_base),
            model: first_non_empty(&lookup, &["PRODIGY_MODEL"]).unwrap_or(defaults.model),
            timeout: first_non_empty(&lookup, &["PRODIGY_TIMEOUT_SECS"])
                .and_then(|raw| parse_timeout(&raw)),
            max_output_tokens: first_non_empty(&lookup, &["PRODIGY_MAX_OUTPUT_TOKENS"])
                .and_then(|raw| parse_number("PRODIGY_MAX_OUTPUT_TOKENS", &raw))
                .unwrap_or(defaults.max_output_tokens),
            max_image_dim: first_non_empty(&lookup, &["PRODIGY_MAX_IMAGE_DIM"])
                .and_then(|raw| parse_number("PRODIGY_MAX_IMAGE_DIM", &raw))
                .unwrap_or(defaults.max_image_dim),
            staging_dir: first_non_empty(&lookup, &["PRODIGY_STAGING_DIR"]).map(PathBuf::from),
        }
    }
}

fn first_non_empty(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().copied().find_map(|key| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = raw, "ignoring invalid numeric setting");
            None
        }
    }
}

// Zero, negative and out-of-range values keep the default of no timeout.
fn parse_timeout(raw: &str) -> Option<Duration> {
    let secs = parse_number::<f64>("PRODIGY_TIMEOUT_SECS", raw)?;
    match Duration::try_from_secs_f64(secs) {
        Ok(timeout) if !timeout.is_zero() => Some(timeout),
        _ => {
            tracing::warn!(value = raw, "ignoring unusable PRODIGY_TIMEOUT_SECS");
            None
        }
    }
}

/// Trims trailing slashes and appends `/v1` to a bare host.
pub fn normalize_api_base(raw: &str) -> String {
    let mut base = raw.trim().trim_end_matches('/').to_string();
    if let Ok(parsed) = reqwest::Url::parse(&base) {
        if parsed.path().trim().is_empty() || parsed.path() == "/" {
            base = format!("{base}/v1");
        }
    }
    base.trim_end_matches('/').to_string()
}

/// First non-empty value among `OPENAI_API_KEY` and its backup.
pub fn api_key_from_env() -> Option<String> {
    first_non_empty(
        &|key: &str| env::var(key).ok(),
        &["OPENAI_API_KEY", "OPENAI_API_KEY_BACKUP"],
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = SolverConfig::from_lookup(lookup(&[]));
        assert_eq!(config, SolverConfig::default());
        assert_eq!(config.model, "o4-mini");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn environment_overrides_and_fallbacks() {
        let config = SolverConfig::from_lookup(lookup(&[
            ("OPENAI_API_BASE", "  "),
            ("OPENAI_BASE_URL", "http://localhost:8080/"),
            ("PRODIGY_MODEL", "gpt-4o"),
            ("PRODIGY_TIMEOUT_SECS", "90"),
            ("PRODIGY_MAX_OUTPUT_TOKENS", "many"),
            ("PRODIGY_MAX_IMAGE_DIM", "1024"),
            ("PRODIGY_STAGING_DIR", "/var/tmp/prodigy"),
        ]));
        assert_eq!(config.api_base, "http://localhost:8080/v1");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.max_output_tokens, DEFAULT_MAX_OUTPUT_TOKENS);
        assert_eq!(config.max_image_dim, 1024);
        assert_eq!(config.staging_dir, Some(PathBuf::from("/var/tmp/prodigy")));
    }

    #[test]
    fn unusable_timeouts_fall_back_to_none() {
        for raw in ["inf", "1e30", "-5", "0", "NaN", "soon"] {
            let config = SolverConfig::from_lookup(lookup(&[("PRODIGY_TIMEOUT_SECS", raw)]));
            assert_eq!(config.timeout, None, "timeout {raw:?}");
        }
        let config = SolverConfig::from_lookup(lookup(&[("PRODIGY_TIMEOUT_SECS", "2.5")]));
        assert_eq!(config.timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn api_base_keeps_explicit_paths() {
        assert_eq!(
            normalize_api_base("https://proxy.example.com/openai/v1/"),
            "https://proxy.example.com/openai/v1"
        );
        assert_eq!(
            normalize_api_base("https://api.openai.com"),
            "https://api.openai.com/v1"
        );
    }
}
