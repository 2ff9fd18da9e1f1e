use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::db::models::achievement::{Achievement, UserAchievement};
use crate::db::models::alert::{AlertId, InjuryAlert};
use crate::db::models::coach::{CoachAthlete, PerformanceRecord};
use crate::db::models::talent::{Talent, TalentId};
use crate::db::models::task::{DailyTask, TaskId};
use crate::db::models::user::{User, UserId};
use crate::scoring::badge::Badge;

pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: '{id}'")]
    NotFound { entity: &'static str, id: String },

    #[error("duplicate {entity} for '{key}'")]
    Conflict { entity: &'static str, key: String },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: &'static str, key: impl ToString) -> Self {
        Self::Conflict {
            entity,
            key: key.to_string(),
        }
    }
}

/// All tables behind a single lock. A write guard section is the unit of
/// atomicity: whatever mutates inside one section becomes visible to
/// readers as a whole, which is what keeps points, badge and unlocks from
/// ever being observed out of step.
#[derive(Default)]
pub(crate) struct Tables {
    pub users: HashMap<UserId, User>,
    /// Secondary unique index for the external-identity lookup.
    pub users_by_external: HashMap<String, UserId>,
    /// Creation order, the stable input order for ranking ties.
    pub user_order: Vec<UserId>,
    pub talents: HashMap<TalentId, Talent>,
    pub achievements: Vec<Achievement>,
    pub user_achievements: Vec<UserAchievement>,
    pub daily_tasks: HashMap<TaskId, DailyTask>,
    pub coach_athletes: Vec<CoachAthlete>,
    pub performance_records: Vec<PerformanceRecord>,
    pub injury_alerts: HashMap<AlertId, InjuryAlert>,
    /// One generated batch per user per calendar day.
    pub task_batches: HashSet<(UserId, NaiveDate)>,
}

/// Transactional in-process store.
///
/// Repositories own the entity-level operations; the store only hands out
/// guards and the per-user locks that serialize compound read-modify-write
/// sequences (point awards, daily batch generation).
pub struct Store {
    tables: RwLock<Tables>,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl Store {
    pub fn new() -> Arc<Self> {
        let tables = Tables {
            achievements: default_achievements(),
            ..Tables::default()
        };

        Arc::new(Self {
            tables: RwLock::new(tables),
            user_locks: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }

    /// Acquire the mutation lock for one user. Held across a compound
    /// sequence it guarantees no other point-mutating operation for the
    /// same user interleaves; operations on different users proceed in
    /// parallel.
    pub async fn user_lock(&self, id: &UserId) -> OwnedMutexGuard<()> {
        let cell = {
            let mut locks = self.user_locks.lock().await;
            locks.entry(id.clone()).or_default().clone()
        };

        cell.lock_owned().await
    }
}

fn default_achievements() -> Vec<Achievement> {
    vec![
        Achievement::milestone("First Steps", "Added your first talent", "trophy", 10),
        Achievement::milestone("Bronze Athlete", "Reached 50 points", "medal", 50)
            .with_badge(Badge::Bronze),
        Achievement::milestone("Silver Athlete", "Reached 100 points", "medal", 100)
            .with_badge(Badge::Silver),
        Achievement::milestone("Gold Athlete", "Reached 200 points", "medal", 200)
            .with_badge(Badge::Gold),
        Achievement::milestone("Platinum Athlete", "Reached 500 points", "crown", 500)
            .with_badge(Badge::Platinum),
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn catalog_is_seeded_in_threshold_order() {
        let store = Store::new();
        let tables = store.read().await;

        let thresholds: Vec<i64> = tables
            .achievements
            .iter()
            .map(|a| a.points_required)
            .collect();
        assert_eq!(thresholds, vec![10, 50, 100, 200, 500]);
    }

    #[tokio::test]
    async fn user_locks_are_per_user() {
        let store = Store::new();
        let a = UserId::from("user-a");
        let b = UserId::from("user-b");

        let guard_a = store.user_lock(&a).await;
        // a different user's lock must not block
        let _guard_b = store.user_lock(&b).await;

        // the same user's lock must
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), store.user_lock(&a))
                .await
                .is_err()
        );

        drop(guard_a);
        let _reacquired = store.user_lock(&a).await;
    }
}
