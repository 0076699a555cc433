//! Guard configuration
//!
//! The configuration is loaded once at startup and is read-only afterwards;
//! it is passed explicitly to every evaluation.
//!
//! ## Configuration Resolution
//!
//! 1. Explicit path (`--config`) if given and present
//! 2. Override in data dir (~/.local/share/nudge/config/guard.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! Environment variables `NIGHT_START`, `NIGHT_END`, `IMPULSE_THRESHOLD` and
//! `CONFIRMATION_DELAY_MINUTES` are applied on top of whichever file won.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/guard.toml");

pub const ENV_NIGHT_START: &str = "NIGHT_START";
pub const ENV_NIGHT_END: &str = "NIGHT_END";
pub const ENV_IMPULSE_THRESHOLD: &str = "IMPULSE_THRESHOLD";
pub const ENV_CONFIRMATION_DELAY: &str = "CONFIRMATION_DELAY_MINUTES";

/// Longest confirmation delay accepted (one week)
pub const MAX_CONFIRMATION_DELAY_MINUTES: i64 = 7 * 24 * 60;
/// Longest impulse lookback accepted (ten years)
pub const MAX_IMPULSE_LOOKBACK_DAYS: i64 = 3650;
/// Longest burst window accepted (one day)
pub const MAX_FREQUENCY_WINDOW_MINUTES: i64 = 24 * 60;

/// Validated, immutable guard configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GuardConfig {
    /// Start of the night window (inclusive)
    pub night_start: NaiveTime,
    /// End of the night window (exclusive); earlier than start means it wraps midnight
    pub night_end: NaiveTime,
    /// Amount at or above which a purchase is high risk
    pub impulse_threshold: f64,
    /// How long a high-risk purchase stays pending before it finalizes on its own
    pub confirmation_delay: Duration,
    /// How far back to look for an earlier purchase from the same payee/category
    pub impulse_lookback: Duration,
    /// Window used to count purchase bursts for the risk score
    pub frequency_window: Duration,
    /// Scores at or above this value count as high risk
    pub risk_score_threshold: u8,
    /// Lowercased categories that add to the risk score
    pub high_risk_categories: Vec<String>,
}

impl GuardConfig {
    /// Build a config from the four core settings, using defaults for the rest
    pub fn new(
        night_start: NaiveTime,
        night_end: NaiveTime,
        impulse_threshold: f64,
        confirmation_delay: Duration,
    ) -> Result<Self> {
        let config = Self {
            night_start,
            night_end,
            impulse_threshold,
            confirmation_delay,
            ..Self::defaults()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate the embedded default configuration
    pub fn embedded() -> Result<Self> {
        ConfigFile::parse(DEFAULT_CONFIG)?.into_config()
    }

    /// Reject settings that would make the guard flag everything (or nothing) silently
    pub fn validate(&self) -> Result<()> {
        if self.night_start == self.night_end {
            return Err(Error::Config(format!(
                "night window is empty: start and end are both {}",
                self.night_start.format("%H:%M")
            )));
        }
        if !self.impulse_threshold.is_finite() || self.impulse_threshold <= 0.0 {
            return Err(Error::Config(format!(
                "impulse threshold must be a positive amount, got {}",
                self.impulse_threshold
            )));
        }
        if self.confirmation_delay < Duration::zero() {
            return Err(Error::Config(
                "confirmation delay cannot be negative".to_string(),
            ));
        }
        if self.confirmation_delay.num_minutes() > MAX_CONFIRMATION_DELAY_MINUTES {
            return Err(Error::Config(format!(
                "confirmation delay cannot exceed {} minutes",
                MAX_CONFIRMATION_DELAY_MINUTES
            )));
        }
        if self.impulse_lookback <= Duration::zero() {
            return Err(Error::Config(
                "impulse lookback must be positive".to_string(),
            ));
        }
        if self.impulse_lookback.num_days() > MAX_IMPULSE_LOOKBACK_DAYS {
            return Err(Error::Config(format!(
                "impulse lookback cannot exceed {} days",
                MAX_IMPULSE_LOOKBACK_DAYS
            )));
        }
        if self.frequency_window <= Duration::zero() {
            return Err(Error::Config(
                "frequency window must be positive".to_string(),
            ));
        }
        if self.frequency_window.num_minutes() > MAX_FREQUENCY_WINDOW_MINUTES {
            return Err(Error::Config(format!(
                "frequency window cannot exceed {} minutes",
                MAX_FREQUENCY_WINDOW_MINUTES
            )));
        }
        if self.risk_score_threshold > 100 {
            return Err(Error::Config(format!(
                "risk score threshold must be within 0-100, got {}",
                self.risk_score_threshold
            )));
        }
        Ok(())
    }

    /// True when `time` falls inside `[night_start, night_end)`
    pub fn is_night(&self, time: NaiveTime) -> bool {
        if self.night_start < self.night_end {
            self.night_start <= time && time < self.night_end
        } else {
            // Window crosses midnight
            time >= self.night_start || time < self.night_end
        }
    }

    /// Whether the category is configured as high risk (case-insensitive)
    pub fn is_high_risk_category(&self, category: &str) -> bool {
        let category = category.trim().to_lowercase();
        self.high_risk_categories.iter().any(|c| *c == category)
    }

    /// Serializable view of this configuration
    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            night: NightSection {
                start: self.night_start.format("%H:%M").to_string(),
                end: self.night_end.format("%H:%M").to_string(),
            },
            impulse: ImpulseSection {
                threshold: self.impulse_threshold,
                lookback_days: self.impulse_lookback.num_days(),
                frequency_window_minutes: self.frequency_window.num_minutes(),
                risk_score_threshold: self.risk_score_threshold,
                high_risk_categories: self.high_risk_categories.clone(),
            },
            confirmation: ConfirmationSection {
                delay_minutes: self.confirmation_delay.num_minutes(),
            },
        }
    }

    fn defaults() -> Self {
        Self {
            night_start: NaiveTime::MIN,
            night_end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            impulse_threshold: 100.0,
            confirmation_delay: Duration::minutes(5),
            impulse_lookback: Duration::days(30),
            frequency_window: Duration::minutes(60),
            risk_score_threshold: 70,
            high_risk_categories: ["games", "delivery", "leisure", "shopping", "subscriptions"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// On-disk TOML layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub night: NightSection,
    pub impulse: ImpulseSection,
    pub confirmation: ConfirmationSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NightSection {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpulseSection {
    pub threshold: f64,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_frequency_window")]
    pub frequency_window_minutes: i64,
    #[serde(default = "default_risk_score_threshold")]
    pub risk_score_threshold: u8,
    #[serde(default)]
    pub high_risk_categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSection {
    pub delay_minutes: i64,
}

fn default_lookback_days() -> i64 {
    30
}

fn default_frequency_window() -> i64 {
    60
}

fn default_risk_score_threshold() -> u8 {
    70
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_NIGHT_START) {
            debug!(value = %v, "Overriding night start from environment");
            self.night.start = v;
        }
        if let Some(v) = lookup(ENV_NIGHT_END) {
            debug!(value = %v, "Overriding night end from environment");
            self.night.end = v;
        }
        if let Some(v) = lookup(ENV_IMPULSE_THRESHOLD) {
            self.impulse.threshold = v.trim().parse().map_err(|_| {
                Error::Config(format!("{} is not a number: {}", ENV_IMPULSE_THRESHOLD, v))
            })?;
        }
        if let Some(v) = lookup(ENV_CONFIRMATION_DELAY) {
            self.confirmation.delay_minutes = v.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} is not a whole number of minutes: {}",
                    ENV_CONFIRMATION_DELAY, v
                ))
            })?;
        }
        Ok(())
    }

    /// Convert to a validated [`GuardConfig`]
    pub fn into_config(self) -> Result<GuardConfig> {
        let config = GuardConfig {
            night_start: parse_time(&self.night.start)?,
            night_end: parse_time(&self.night.end)?,
            impulse_threshold: self.impulse.threshold,
            confirmation_delay: minutes(self.confirmation.delay_minutes, "confirmation delay")?,
            impulse_lookback: Duration::try_days(self.impulse.lookback_days).ok_or_else(|| {
                Error::Config(format!(
                    "impulse lookback out of range: {} days",
                    self.impulse.lookback_days
                ))
            })?,
            frequency_window: minutes(self.impulse.frequency_window_minutes, "frequency window")?,
            risk_score_threshold: self.impulse.risk_score_threshold,
            high_risk_categories: self
                .impulse
                .high_risk_categories
                .iter()
                .map(|c| c.trim().to_lowercase())
                .collect(),
        };
        config.validate()?;
        Ok(config)
    }
}

fn minutes(value: i64, name: &str) -> Result<Duration> {
    Duration::try_minutes(value)
        .ok_or_else(|| Error::Config(format!("{} out of range: {} minutes", name, value)))
}

/// Parse "HH:MM" or "HH:MM:SS"
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| Error::Config(format!("invalid time of day (expected HH:MM): {}", s)))
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("nudge").join("config").join("guard.toml"))
}

/// Load configuration (explicit path, then data-dir override, then embedded),
/// apply environment overrides, and validate
pub fn load_config(explicit: Option<&Path>) -> Result<GuardConfig> {
    load_config_with(explicit, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable override lookup
pub fn load_config_with<F>(explicit: Option<&Path>, lookup: F) -> Result<GuardConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let content = match resolve_path(explicit) {
        Some(path) => {
            info!(path = %path.display(), "Loading guard config");
            fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?
        }
        None => {
            debug!("Using embedded guard config");
            DEFAULT_CONFIG.to_string()
        }
    };

    let mut file = ConfigFile::parse(&content)?;
    file.apply_overrides(lookup)?;
    let config = file.into_config()?;

    info!(
        night_start = %config.night_start.format("%H:%M"),
        night_end = %config.night_end.format("%H:%M"),
        threshold = config.impulse_threshold,
        delay_minutes = config.confirmation_delay.num_minutes(),
        "Guard config loaded"
    );
    Ok(config)
}

fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(path = %path.display(), "Config file not found, falling back");
    }
    default_config_path().filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_embedded_config_is_valid() {
        let config = GuardConfig::embedded().unwrap();
        assert_eq!(config.night_start, t(0, 0));
        assert_eq!(config.night_end, t(6, 0));
        assert_eq!(config.impulse_threshold, 100.0);
        assert_eq!(config.confirmation_delay, Duration::minutes(5));
        assert_eq!(config.impulse_lookback, Duration::days(30));
        assert!(config.is_high_risk_category("Games"));
    }

    #[test]
    fn test_night_window_half_open() {
        let config = GuardConfig::new(t(0, 0), t(6, 0), 100.0, Duration::minutes(5)).unwrap();
        assert!(config.is_night(t(0, 0)));
        assert!(config.is_night(t(2, 0)));
        assert!(config.is_night(t(5, 59)));
        assert!(!config.is_night(t(6, 0)));
        assert!(!config.is_night(t(14, 0)));
    }

    #[test]
    fn test_night_window_wraps_midnight() {
        let config = GuardConfig::new(t(22, 0), t(5, 0), 100.0, Duration::minutes(5)).unwrap();
        assert!(config.is_night(t(22, 0)));
        assert!(config.is_night(t(23, 30)));
        assert!(config.is_night(t(0, 0)));
        assert!(config.is_night(t(4, 59)));
        assert!(!config.is_night(t(5, 0)));
        assert!(!config.is_night(t(21, 59)));
        assert!(!config.is_night(t(12, 0)));
    }

    #[test]
    fn test_rejects_empty_window() {
        let err = GuardConfig::new(t(3, 0), t(3, 0), 100.0, Duration::minutes(5)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_bad_threshold() {
        for bad in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            let result = GuardConfig::new(t(0, 0), t(6, 0), bad, Duration::minutes(5));
            assert!(result.is_err(), "threshold {} should be rejected", bad);
        }
    }

    #[test]
    fn test_rejects_negative_delay() {
        let result = GuardConfig::new(t(0, 0), t(6, 0), 100.0, Duration::minutes(-1));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_oversized_delay_from_env() {
        for value in ["1000000000000", &i64::MAX.to_string()] {
            let mut file = ConfigFile::parse(DEFAULT_CONFIG).unwrap();
            file.apply_overrides(|k| (k == ENV_CONFIRMATION_DELAY).then(|| value.to_string()))
                .unwrap();
            let err = file.into_config().unwrap_err();
            assert!(matches!(err, Error::Config(_)), "delay {} should be rejected", value);
        }
    }

    #[test]
    fn test_rejects_oversized_lookback() {
        for days in [MAX_IMPULSE_LOOKBACK_DAYS + 1, 1_000_000_000, i64::MAX] {
            let mut file = ConfigFile::parse(DEFAULT_CONFIG).unwrap();
            file.impulse.lookback_days = days;
            let err = file.into_config().unwrap_err();
            assert!(matches!(err, Error::Config(_)), "lookback {} should be rejected", days);
        }
    }

    #[test]
    fn test_rejects_oversized_frequency_window() {
        let mut file = ConfigFile::parse(DEFAULT_CONFIG).unwrap();
        file.impulse.frequency_window_minutes = i64::MAX;
        assert!(matches!(file.into_config(), Err(Error::Config(_))));
    }

    #[test]
    fn test_largest_delay_is_allowed() {
        let delay = Duration::minutes(MAX_CONFIRMATION_DELAY_MINUTES);
        assert!(GuardConfig::new(t(0, 0), t(6, 0), 100.0, delay).is_ok());
    }

    #[test]
    fn test_zero_delay_is_allowed() {
        assert!(GuardConfig::new(t(0, 0), t(6, 0), 100.0, Duration::zero()).is_ok());
    }

    #[test]
    fn test_env_overrides_applied() {
        let env: HashMap<&str, &str> = [
            (ENV_NIGHT_START, "23:00"),
            (ENV_NIGHT_END, "04:30"),
            (ENV_IMPULSE_THRESHOLD, "250.5"),
            (ENV_CONFIRMATION_DELAY, "15"),
        ]
        .into_iter()
        .collect();

        let mut file = ConfigFile::parse(DEFAULT_CONFIG).unwrap();
        file.apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        let config = file.into_config().unwrap();

        assert_eq!(config.night_start, t(23, 0));
        assert_eq!(config.night_end, t(4, 30));
        assert_eq!(config.impulse_threshold, 250.5);
        assert_eq!(config.confirmation_delay, Duration::minutes(15));
    }

    #[test]
    fn test_bad_env_threshold_fails_fast() {
        let mut file = ConfigFile::parse(DEFAULT_CONFIG).unwrap();
        let err = file
            .apply_overrides(|k| (k == ENV_IMPULSE_THRESHOLD).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_time_string() {
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("noon").is_err());
        assert_eq!(parse_time(" 07:15 ").unwrap(), t(7, 15));
        assert_eq!(parse_time("07:15:30").unwrap(), NaiveTime::from_hms_opt(7, 15, 30).unwrap());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[night]
start = "21:00"
end = "03:00"

[impulse]
threshold = 40.0

[confirmation]
delay_minutes = 10
"#
        )
        .unwrap();

        let config = load_config_with(Some(file.path()), no_env).unwrap();
        assert_eq!(config.night_start, t(21, 0));
        assert_eq!(config.impulse_threshold, 40.0);
        assert_eq!(config.confirmation_delay, Duration::minutes(10));
        // Omitted fields fall back to serde defaults
        assert_eq!(config.impulse_lookback, Duration::days(30));
        assert!(config.high_risk_categories.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[night]
start = "02:00"
end = "02:00"

[impulse]
threshold = 100.0

[confirmation]
delay_minutes = 5
"#
        )
        .unwrap();

        let err = load_config_with(Some(file.path()), no_env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_to_file_round_trips() {
        let config = GuardConfig::embedded().unwrap();
        let rendered = toml::to_string(&config.to_file()).unwrap();
        let reparsed = ConfigFile::parse(&rendered).unwrap().into_config().unwrap();
        assert_eq!(reparsed, config);
    }
}
