use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::user::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub String);

impl AlertId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<String> for AlertId {
    fn from(value: String) -> Self {
        AlertId(value)
    }
}

impl From<&str> for AlertId {
    fn from(value: &str) -> Self {
        AlertId(value.to_string())
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjuryAlert {
    pub id: AlertId,
    pub athlete_id: UserId,
    pub coach_id: Option<UserId>,
    pub risk_level: RiskLevel,
    pub body_part: String,
    pub description: String,
    pub recommendations: Option<String>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InjuryAlert {
    pub fn create(input: NewInjuryAlert) -> Self {
        Self {
            id: AlertId::generate(),
            athlete_id: input.athlete_id,
            coach_id: input.coach_id,
            risk_level: input.risk_level,
            body_part: input.body_part,
            description: input.description,
            recommendations: input.recommendations,
            resolved: false,
            resolved_at: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInjuryAlert {
    pub athlete_id: UserId,
    #[serde(default)]
    pub coach_id: Option<UserId>,
    pub risk_level: RiskLevel,
    pub body_part: String,
    pub description: String,
    #[serde(default)]
    pub recommendations: Option<String>,
}

impl NewInjuryAlert {
    pub fn validate(&self) -> Result<(), String> {
        if self.body_part.trim().is_empty() {
            return Err(String::from("bodyPart must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(String::from("description must not be empty"));
        }

        Ok(())
    }
}
