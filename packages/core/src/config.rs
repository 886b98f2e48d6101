//! Configuration for the synthesis pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{SynthesisError, SynthesisResult};

/// Environment variable overriding [`SynthesisConfig::max_notes`].
pub const ENV_MAX_NOTES: &str = "SYNTHESIS_MAX_NOTES";
/// Environment variable overriding [`SynthesisConfig::job_timeout_secs`].
pub const ENV_JOB_TIMEOUT_SECS: &str = "SYNTHESIS_JOB_TIMEOUT_SECS";

/// System instruction every model session is created with.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a research assistant helping users synthesize connections between web content.

Your task is to:
1. Analyze the current page context
2. Identify meaningful connections with the user's related notes
3. Generate a concise, insightful summary explaining these connections
4. Use Markdown formatting for clarity

Guidelines:
- Be concise (2-4 sentences maximum)
- Focus on \"why\" these notes are relevant, not just \"what\" they are
- Use bullet points for multiple connections
- Avoid repeating obvious information from titles";

/// Configuration for queue, session, and prompt behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Maximum number of related notes rendered into a prompt.
    pub max_notes: usize,
    /// System instruction for new model sessions.
    pub system_prompt: String,
    /// Per-job deadline in seconds. `None` lets a job run until it settles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_timeout_secs: Option<u64>,
    /// Buffer size of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_notes: 5,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            job_timeout_secs: None,
            event_capacity: 1024,
        }
    }
}

impl SynthesisConfig {
    /// Defaults overlaid with any `SYNTHESIS_*` environment variables.
    pub fn from_env() -> SynthesisResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from a key lookup, e.g. the process environment.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> SynthesisResult<Self> {
        if let Some(raw) = lookup(ENV_MAX_NOTES) {
            self.max_notes = parse_var(ENV_MAX_NOTES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_JOB_TIMEOUT_SECS) {
            self.job_timeout_secs = Some(parse_var(ENV_JOB_TIMEOUT_SECS, &raw)?);
        }
        self.validate()?;
        Ok(self)
    }

    /// Set the maximum number of notes per prompt.
    pub fn with_max_notes(mut self, max_notes: usize) -> Self {
        self.max_notes = max_notes;
        self
    }

    /// Set the session system instruction.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Set the per-job deadline.
    pub fn with_job_timeout(mut self, timeout_secs: u64) -> Self {
        self.job_timeout_secs = Some(timeout_secs);
        self
    }

    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> SynthesisResult<()> {
        if self.max_notes == 0 {
            return Err(SynthesisError::Config("max_notes must be at least 1".into()));
        }
        if self.event_capacity == 0 {
            return Err(SynthesisError::Config(
                "event_capacity must be at least 1".into(),
            ));
        }
        if self.job_timeout_secs == Some(0) {
            return Err(SynthesisError::Config(
                "job_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> SynthesisResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| SynthesisError::Config(format!("{} has invalid value '{}'", key, raw)))
}
