use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::user::UserId;
use crate::scoring::badge::Badge;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AchievementId(pub String);

impl AchievementId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<String> for AchievementId {
    fn from(value: String) -> Self {
        AchievementId(value)
    }
}

impl From<&str> for AchievementId {
    fn from(value: &str) -> Self {
        AchievementId(value.to_string())
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementKind {
    Milestone,
    Streak,
    Performance,
    Special,
}

/// Catalog entry. The catalog is seeded at store construction and only
/// ever appended to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub points_required: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub created_at: DateTime<Utc>,
}

impl Achievement {
    pub fn milestone(name: &str, description: &str, icon: &str, points_required: i64) -> Self {
        Self {
            id: AchievementId::generate(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            points_required,
            badge: None,
            kind: AchievementKind::Milestone,
            created_at: Utc::now(),
        }
    }

    pub fn with_badge(mut self, badge: Badge) -> Self {
        self.badge = Some(badge);
        self
    }
}

/// Append-only record of a user crossing an achievement threshold.
/// `points_earned` captures the running total at unlock time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub id: String,
    pub user_id: UserId,
    pub achievement_id: AchievementId,
    pub points_earned: i64,
    pub unlocked_at: DateTime<Utc>,
}

impl UserAchievement {
    pub fn unlock(user_id: UserId, achievement_id: AchievementId, points_earned: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            achievement_id,
            points_earned,
            unlocked_at: Utc::now(),
        }
    }
}

/// Join view returned to clients: the unlock row plus its catalog entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    #[serde(flatten)]
    pub link: UserAchievement,
    pub achievement: Achievement,
}
