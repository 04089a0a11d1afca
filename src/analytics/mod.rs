//! Call analytics and coaching insights.
//!
//! The generator probes for the remote coach (credential configured and the
//! call succeeds with non-empty text); everything else lands on the
//! deterministic rule-based analyzer. Analytics never fail a delivery.

pub mod remote;
pub mod rules;

pub use remote::RemoteCoach;

use tracing::warn;

use crate::config::AiConfig;
use crate::meeting::records::TranscriptBlock;

/// Where the analytics text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsReport {
    AiDerived(String),
    RuleBased(String),
}

impl AnalyticsReport {
    pub fn text(&self) -> &str {
        match self {
            Self::AiDerived(text) | Self::RuleBased(text) => text,
        }
    }

    pub fn is_ai_derived(&self) -> bool {
        matches!(self, Self::AiDerived(_))
    }
}

pub struct AnalyticsGenerator {
    coach: Option<RemoteCoach>,
}

impl AnalyticsGenerator {
    pub fn new(coach: Option<RemoteCoach>) -> Self {
        Self { coach }
    }

    /// Rule-based only; used when no credential is configured.
    pub fn rule_based_only() -> Self {
        Self { coach: None }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        let coach = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .map(|key| {
                RemoteCoach::new(
                    key.to_string(),
                    config.endpoint.clone(),
                    config.model.clone(),
                )
            });
        Self { coach }
    }

    pub async fn generate(&self, transcript: &[TranscriptBlock]) -> AnalyticsReport {
        if let Some(coach) = &self.coach {
            match coach.coach(transcript).await {
                Ok(text) => return AnalyticsReport::AiDerived(text),
                Err(err) => {
                    warn!("AI coaching unavailable, using rule-based analytics: {err:#}");
                }
            }
        }
        AnalyticsReport::RuleBased(rules::rule_based_analytics(transcript))
    }
}
