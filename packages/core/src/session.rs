//! Model session and availability types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a model session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Create a new unique session ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to a live model session.
///
/// Providers mint handles from `create_session` and key their own session
/// state by [`SessionHandle::id`]. Cloning a handle does not create a new
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            created_at: Utc::now(),
        }
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw readiness reported by a model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// The model is installed and can serve sessions.
    Ready,
    /// The model will be downloaded when a session is first created.
    Downloadable,
    /// The model cannot be used on this device.
    Unavailable,
}

impl ModelStatus {
    /// Map raw provider status onto the availability the pipeline acts on.
    pub fn availability(self) -> Availability {
        match self {
            ModelStatus::Ready | ModelStatus::Downloadable => Availability::Available,
            ModelStatus::Unavailable => Availability::Unavailable,
        }
    }
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelStatus::Ready => write!(f, "ready"),
            ModelStatus::Downloadable => write!(f, "downloadable"),
            ModelStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Whether the pipeline can create sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable,
    /// The availability probe itself failed.
    Error,
}

impl Availability {
    pub fn is_available(self) -> bool {
        matches!(self, Availability::Available)
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::Available => write!(f, "available"),
            Availability::Unavailable => write!(f, "unavailable"),
            Availability::Error => write!(f, "error"),
        }
    }
}

/// Memoised result of the last availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub availability: Availability,
    /// Raw provider status; absent when the probe itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ModelStatus>,
    pub checked_at: DateTime<Utc>,
}

impl AvailabilityReport {
    pub fn from_status(status: ModelStatus) -> Self {
        Self {
            availability: status.availability(),
            status: Some(status),
            checked_at: Utc::now(),
        }
    }

    pub fn probe_failed() -> Self {
        Self {
            availability: Availability::Error,
            status: None,
            checked_at: Utc::now(),
        }
    }
}
