use tracing::instrument;

use crate::db::models::achievement::{Achievement, UnlockedAchievement};
use crate::db::models::user::UserId;
use crate::db::store::Store;

pub struct AchievementRepository<'a> {
    store: &'a Store,
}

impl<'a> AchievementRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Vec<Achievement> {
        self.store.read().await.achievements.clone()
    }

    /// A user's unlocks joined with their catalog entries, in unlock order.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: &UserId) -> Vec<UnlockedAchievement> {
        let tables = self.store.read().await;

        tables
            .user_achievements
            .iter()
            .filter(|link| link.user_id == *user_id)
            .filter_map(|link| {
                let achievement = tables
                    .achievements
                    .iter()
                    .find(|a| a.id == link.achievement_id)?;

                Some(UnlockedAchievement {
                    link: link.clone(),
                    achievement: achievement.clone(),
                })
            })
            .collect()
    }
}
