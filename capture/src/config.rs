use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

// ── Defaults ────────────────────────────────────────────────────────────

/// Persistent store file relative to home.
const DEFAULT_STORE_REL: &str = ".crossai/storage.json";

const DEFAULT_SUMMARIZER_URL: &str = "http://127.0.0.1:8000/generate_echo";

/// Summaries allowed per rolling week.
pub const DEFAULT_WEEKLY_QUOTA: u32 = 3;

/// More removed nodes than this in one mutation batch counts as navigation.
pub const DEFAULT_NAV_REMOVAL_THRESHOLD: usize = 5;

// ── Config struct ───────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub store_path: PathBuf,
    pub summarizer_url: String,
    pub weekly_quota: u32,
    pub nav_removal_threshold: usize,
}

impl CaptureConfig {
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir().context("could not resolve home directory")?;

        Ok(Self {
            store_path: env_path("CROSSAI_STORE_PATH").unwrap_or_else(|| home.join(DEFAULT_STORE_REL)),
            summarizer_url: env::var("CROSSAI_SUMMARIZER_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SUMMARIZER_URL.to_string()),
            weekly_quota: env_parse("CROSSAI_WEEKLY_QUOTA").unwrap_or(DEFAULT_WEEKLY_QUOTA),
            nav_removal_threshold: env_parse("CROSSAI_NAV_REMOVAL_THRESHOLD")
                .unwrap_or(DEFAULT_NAV_REMOVAL_THRESHOLD),
        })
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_REL),
            summarizer_url: DEFAULT_SUMMARIZER_URL.to_string(),
            weekly_quota: DEFAULT_WEEKLY_QUOTA,
            nav_removal_threshold: DEFAULT_NAV_REMOVAL_THRESHOLD,
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().as_deref().and_then(expand_path)
}

/// `None` for blank input; a leading `~` resolves to the home directory.
fn expand_path(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(PathBuf::from(shellexpand::tilde(raw).into_owned()))
}

/// Unset or unparsable values fall back to the caller's default.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_home_prefix_only() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path("~/stash.json"), Some(home.join("stash.json")));
        assert_eq!(
            expand_path(" /var/stash.json "),
            Some(PathBuf::from("/var/stash.json"))
        );
        assert_eq!(expand_path("   "), None);
    }

    #[test]
    fn unset_numbers_fall_back() {
        assert_eq!(env_parse::<u32>("CROSSAI_TEST_UNSET_QUOTA"), None);
    }

    #[test]
    fn defaults_match_reference_behavior() {
        let config = CaptureConfig::default();
        assert_eq!(config.weekly_quota, 3);
        assert_eq!(config.nav_removal_threshold, 5);
        assert!(config.summarizer_url.ends_with("/generate_echo"));
    }
}
