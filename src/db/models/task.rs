use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::user::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        TaskId(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        TaskId(value.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Training,
    Nutrition,
    Recovery,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A daily task. `user_id = None` marks a global template visible to every
/// athlete. The only lifecycle transition is pending -> completed; there is
/// no expiry state, stale tasks simply age out of the current-day view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub points: i64,
    pub category: TaskCategory,
    pub difficulty: Difficulty,
    pub ai_recommended: bool,
    pub user_id: Option<UserId>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl DailyTask {
    pub fn create(input: NewDailyTask) -> Self {
        Self {
            id: TaskId::generate(),
            title: input.title,
            description: input.description,
            points: input.points,
            category: input.category,
            difficulty: input.difficulty,
            ai_recommended: input.ai_recommended,
            user_id: input.user_id,
            completed: false,
            completed_at: None,
            due_date: input.due_date,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDailyTask {
    pub title: String,
    pub description: String,
    pub points: i64,
    pub category: TaskCategory,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub ai_recommended: bool,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub due_date: DateTime<Utc>,
}

impl NewDailyTask {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err(String::from("title must not be empty"));
        }
        if self.points <= 0 {
            return Err(String::from("points must be positive"));
        }

        Ok(())
    }
}
