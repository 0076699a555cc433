//! Confirmation delay for high-risk purchases
//!
//! A pending confirmation finalizes either when the user confirms it or when
//! `release_at` has passed and it is polled. It never finalizes early on its
//! own. The user may cancel while it is still pending.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::GuardState;

/// How a pending confirmation left the pending state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// User confirmed explicitly
    Confirmed,
    /// Delay elapsed
    Released,
    /// User gave up the purchase
    Cancelled,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Released => "released",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "released" => Ok(Self::Released),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown resolution: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Zero until persisted
    pub id: i64,
    pub transaction_id: i64,
    pub created_at: DateTime<Utc>,
    pub release_at: DateTime<Utc>,
    pub state: GuardState,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<Resolution>,
}

impl PendingConfirmation {
    pub fn new(transaction_id: i64, created_at: DateTime<Utc>, release_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            transaction_id,
            created_at,
            release_at,
            state: GuardState::PendingConfirmation,
            resolved_at: None,
            resolution: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == GuardState::PendingConfirmation
    }

    /// Whether the purchase may go through
    pub fn can_proceed(&self) -> bool {
        self.state == GuardState::Finalized
    }

    /// Time left before the delay elapses; zero once elapsed or resolved
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        if !self.is_pending() || now >= self.release_at {
            return Duration::zero();
        }
        self.release_at - now
    }

    /// Finalize if the delay has elapsed; returns the resulting state
    pub fn poll(&mut self, now: DateTime<Utc>) -> GuardState {
        if self.is_pending() && now >= self.release_at {
            self.resolve(GuardState::Finalized, Resolution::Released, now);
        }
        self.state
    }

    /// Explicit user confirmation
    ///
    /// Confirming an already finalized confirmation is a no-op.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.state {
            GuardState::PendingConfirmation => {
                self.resolve(GuardState::Finalized, Resolution::Confirmed, now);
                Ok(())
            }
            GuardState::Finalized => Ok(()),
            other => Err(Error::InvalidTransition {
                action: "confirm",
                state: other.to_string(),
            }),
        }
    }

    /// Explicit user cancellation
    ///
    /// Only a pending confirmation can be cancelled. A purchase whose delay has
    /// elapsed but that was not polled yet is still pending.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.state {
            GuardState::PendingConfirmation => {
                self.resolve(GuardState::Cancelled, Resolution::Cancelled, now);
                Ok(())
            }
            GuardState::Cancelled => Ok(()),
            other => Err(Error::InvalidTransition {
                action: "cancel",
                state: other.to_string(),
            }),
        }
    }

    fn resolve(&mut self, state: GuardState, resolution: Resolution, now: DateTime<Utc>) {
        self.state = state;
        self.resolution = Some(resolution);
        self.resolved_at = Some(now);
        if resolution == Resolution::Released {
            debug!(transaction_id = self.transaction_id, "Confirmation delay elapsed");
        } else {
            info!(
                transaction_id = self.transaction_id,
                resolution = resolution.as_str(),
                "Confirmation resolved"
            );
        }
    }
}
