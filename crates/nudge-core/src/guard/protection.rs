//! Runtime protection switch
//!
//! Separate from [`GuardConfig`](crate::config::GuardConfig), which never
//! changes after startup: the user may turn protection off or bypass it for a
//! while during a session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GuardConfig;

/// Default length of a temporary bypass
pub const DEFAULT_BYPASS_MINUTES: i64 = 30;
/// Longest bypass accepted (one day)
pub const MAX_BYPASS_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionState {
    enabled: bool,
    bypass_until: Option<DateTime<Utc>>,
}

impl Default for ProtectionState {
    fn default() -> Self {
        Self {
            enabled: true,
            bypass_until: None,
        }
    }
}

impl ProtectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a previously saved state
    pub fn from_parts(enabled: bool, bypass_until: Option<DateTime<Utc>>) -> Self {
        Self {
            enabled,
            bypass_until,
        }
    }

    pub fn bypass_until(&self) -> Option<DateTime<Utc>> {
        self.bypass_until
    }

    /// Turn protection on and clear any bypass
    pub fn enable(&mut self) {
        self.enabled = true;
        self.bypass_until = None;
        info!("Impulse protection enabled");
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        warn!("Impulse protection disabled");
    }

    /// Suspend protection until `now + minutes`, capped at [`MAX_BYPASS_MINUTES`]
    pub fn temporary_bypass(&mut self, now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
        let until = now + Duration::minutes(minutes.clamp(0, MAX_BYPASS_MINUTES));
        self.bypass_until = Some(until);
        warn!(until = %until, "Temporary protection bypass active");
        until
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn bypass_active(&self, now: DateTime<Utc>) -> bool {
        self.bypass_until.map(|until| now < until).unwrap_or(false)
    }

    /// Protection is on and not bypassed
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.enabled && !self.bypass_active(now)
    }

    pub fn status(&self, now: DateTime<Utc>, config: &GuardConfig) -> ProtectionStatus {
        let local_now = now.with_timezone(&chrono::Local);
        ProtectionStatus {
            enabled: self.enabled,
            bypass_active: self.bypass_active(now),
            bypass_until: self.bypass_until.filter(|until| now < *until),
            is_night_period: config.is_night(local_now.time()),
            night_start: config.night_start.format("%H:%M").to_string(),
            night_end: config.night_end.format("%H:%M").to_string(),
            amount_threshold: config.impulse_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionStatus {
    pub enabled: bool,
    pub bypass_active: bool,
    pub bypass_until: Option<DateTime<Utc>>,
    pub is_night_period: bool,
    pub night_start: String,
    pub night_end: String,
    pub amount_threshold: f64,
}
