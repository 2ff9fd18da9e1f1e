use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::alert::RiskLevel;
use crate::db::models::task::{Difficulty, TaskCategory};
use crate::db::models::user::SkillMetrics;

pub mod client;

pub type AiResult<T> = core::result::Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("ai features are not enabled; configure the OPENAI_API_KEY environment variable")]
    Disabled,

    #[error("ai request timed out after {0}ms")]
    Timeout(u64),

    #[error("ai request failed with status {0}")]
    Status(http::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("malformed ai response: {0}")]
    Malformed(String),
}

/// One candidate task descriptor produced by the collaborator.
/// `estimated_duration` is advisory and not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub points: i64,
    pub category: TaskCategory,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_duration: Option<String>,
}

/// Athlete profile handed to the risk analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteRiskProfile {
    pub age: i64,
    pub sport: String,
    #[serde(default)]
    pub recent_metrics: Vec<SkillMetrics>,
    #[serde(default)]
    pub training_load: String,
    #[serde(default)]
    pub previous_injuries: Vec<String>,
}

fn default_confidence() -> f64 {
    0.5
}

/// Risk analysis result. Serde defaults mirror the collaborator's loose
/// output contract: absent fields degrade to the conservative baseline
/// instead of failing the parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjuryRiskAssessment {
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub body_parts: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// The external recommendation/analysis generator, behind a trait so the
/// task lifecycle and tests can substitute deterministic implementations.
#[async_trait]
pub trait AiCollaborator: Send + Sync {
    async fn generate_task_recommendations(
        &self,
        sport: &str,
        metrics: &SkillMetrics,
        skill_level: &str,
        history: &[String],
    ) -> AiResult<Vec<Recommendation>>;

    async fn analyze_injury_risk(
        &self,
        athlete: &AthleteRiskProfile,
    ) -> AiResult<InjuryRiskAssessment>;

    /// Whether the collaborator is configured at all. Disabled
    /// collaborators fail fast with [`AiError::Disabled`].
    fn enabled(&self) -> bool;
}
