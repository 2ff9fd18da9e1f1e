use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::badge::Badge;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        UserId(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Athlete,
    Coach,
    Admin,
}

/// The four bounded skill scores carried on every user and snapshotted in
/// performance records. Each value lives in `0.0..=10.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillMetrics {
    pub speed: f64,
    pub strength: f64,
    pub stamina: f64,
    pub technique: f64,
}

impl SkillMetrics {
    pub const BASELINE: f64 = 5.0;

    pub fn baseline() -> Self {
        Self {
            speed: Self::BASELINE,
            strength: Self::BASELINE,
            stamina: Self::BASELINE,
            technique: Self::BASELINE,
        }
    }

    pub fn mean(&self) -> f64 {
        (self.speed + self.strength + self.stamina + self.technique) / 4.0
    }

    pub fn clamped(self) -> Self {
        Self {
            speed: self.speed.clamp(0.0, 10.0),
            strength: self.strength.clamp(0.0, 10.0),
            stamina: self.stamina.clamp(0.0, 10.0),
            technique: self.technique.clamp(0.0, 10.0),
        }
    }
}

impl Default for SkillMetrics {
    fn default() -> Self {
        Self::baseline()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub role: Role,
    pub sport: Option<String>,
    pub skill_level: Option<String>,
    pub location: Option<String>,
    pub age: Option<i64>,
    pub points: i64,
    pub badge: Badge,
    pub metrics: SkillMetrics,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Materialize a new user record. Points start at zero, which makes
    /// Bronze the resolved tier by construction.
    pub fn create(input: NewUser) -> Self {
        Self {
            id: UserId::generate(),
            external_id: input.external_id,
            email: input.email,
            display_name: input.display_name,
            photo_url: input.photo_url,
            role: input.role.unwrap_or(Role::Athlete),
            sport: input.sport,
            skill_level: input.skill_level,
            location: input.location,
            age: input.age,
            points: 0,
            badge: Badge::default(),
            metrics: SkillMetrics::baseline(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), String> {
        if self.external_id.trim().is_empty() {
            return Err(String::from("externalId must not be empty"));
        }
        if self.email.trim().is_empty() {
            return Err(String::from("email must not be empty"));
        }
        if self.display_name.trim().is_empty() {
            return Err(String::from("displayName must not be empty"));
        }

        Ok(())
    }
}

/// Profile fields a user may change about themselves. Points, badge and
/// metrics are deliberately absent: the first two only move through the
/// scoring path, the last through performance records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub sport: Option<String>,
    pub skill_level: Option<String>,
    pub location: Option<String>,
    pub age: Option<i64>,
}
