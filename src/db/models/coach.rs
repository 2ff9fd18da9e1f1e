use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::user::{SkillMetrics, UserId};

/// Coach/athlete roster link. Append-only; the pair is unique.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachAthlete {
    pub id: String,
    pub coach_id: UserId,
    pub athlete_id: UserId,
    pub approved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CoachAthlete {
    pub fn create(input: NewCoachAthlete) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            coach_id: input.coach_id,
            athlete_id: input.athlete_id,
            approved_at: now,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoachAthlete {
    pub coach_id: UserId,
    pub athlete_id: UserId,
}

/// Point-in-time snapshot of a user's metrics, optionally annotated by the
/// recording coach. Append-only audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub id: String,
    pub user_id: UserId,
    pub sport: String,
    pub metrics: SkillMetrics,
    pub notes: Option<String>,
    pub recorded_by: Option<UserId>,
    pub recorded_at: DateTime<Utc>,
}

impl PerformanceRecord {
    pub fn create(input: NewPerformanceRecord) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            sport: input.sport,
            metrics: input.metrics.clamped(),
            notes: input.notes,
            recorded_by: input.recorded_by,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerformanceRecord {
    pub user_id: UserId,
    pub sport: String,
    pub metrics: SkillMetrics,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recorded_by: Option<UserId>,
}

impl NewPerformanceRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.sport.trim().is_empty() {
            return Err(String::from("sport must not be empty"));
        }

        Ok(())
    }
}

/// Roster summary for a coach dashboard, recomputed from stored state on
/// every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachMetricsSummary {
    pub athlete_count: usize,
    pub active_sessions: usize,
    pub avg_performance: f64,
    pub injury_alerts: usize,
    pub avg_improvement: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyProgress {
    pub week: String,
    pub average: f64,
    pub top_performer: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachAnalytics {
    pub team_progress: Vec<WeeklyProgress>,
}
