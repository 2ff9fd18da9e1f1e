use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::user::UserId;
use crate::scoring::award::TALENT_BASE_POINTS;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TalentId(pub String);

impl TalentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<String> for TalentId {
    fn from(value: String) -> Self {
        TalentId(value)
    }
}

impl From<&str> for TalentId {
    fn from(value: &str) -> Self {
        TalentId(value.to_string())
    }
}

impl fmt::Display for TalentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Talent {
    pub id: TalentId,
    pub name: String,
    pub sport: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub user_id: UserId,
    pub approved: bool,
    pub approved_by: Option<UserId>,
    /// Fixed at creation and never touched again; submission bonuses land
    /// on the user's running total, not here.
    pub points_awarded: i64,
    pub created_at: DateTime<Utc>,
}

impl Talent {
    pub fn create(input: NewTalent) -> Self {
        Self {
            id: TalentId::generate(),
            name: input.name,
            sport: input.sport,
            category: input.category,
            description: input.description,
            user_id: input.user_id,
            approved: false,
            approved_by: None,
            points_awarded: TALENT_BASE_POINTS,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTalent {
    pub name: String,
    pub sport: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub user_id: UserId,
}

impl NewTalent {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(String::from("name must not be empty"));
        }
        if self.sport.trim().is_empty() {
            return Err(String::from("sport must not be empty"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveTalent {
    pub approved_by: UserId,
}
