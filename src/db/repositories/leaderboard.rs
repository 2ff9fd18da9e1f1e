use serde::Serialize;
use tracing::instrument;

use crate::db::models::user::{Role, User, UserId};
use crate::db::store::Store;

/// Leaderboards return at most this many athletes; rank lookups consider
/// the full filtered set.
pub const LEADERBOARD_LIMIT: usize = 50;

/// Accepted filter intents. `sport` narrows the set (`"all"` and absence
/// are equivalent); `scope` and `timeframe` are carried through to the
/// response but ranking currently always uses current point totals.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardFilter {
    pub scope: String,
    pub sport: Option<String>,
    pub timeframe: Option<String>,
}

impl LeaderboardFilter {
    fn matches(&self, user: &User) -> bool {
        if user.role != Role::Athlete {
            return false;
        }

        match self.sport.as_deref() {
            None | Some("all") | Some("") => true,
            Some(sport) => user.sport.as_deref() == Some(sport),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAthlete {
    pub rank: i64,
    pub user: User,
}

pub struct LeaderboardRepository<'a> {
    store: &'a Store,
}

impl<'a> LeaderboardRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// The full filtered set, descending by points. The sort is stable over
    /// a creation-ordered snapshot, so ties keep creation order.
    async fn ranked(&self, filter: &LeaderboardFilter) -> Vec<User> {
        let tables = self.store.read().await;

        let mut athletes: Vec<User> = tables
            .user_order
            .iter()
            .filter_map(|id| tables.users.get(id))
            .filter(|user| filter.matches(user))
            .cloned()
            .collect();
        athletes.sort_by(|a, b| b.points.cmp(&a.points));

        athletes
    }

    #[instrument(skip(self))]
    pub async fn leaderboard(&self, filter: &LeaderboardFilter) -> Vec<User> {
        let mut athletes = self.ranked(filter).await;
        athletes.truncate(LEADERBOARD_LIMIT);

        athletes
    }

    /// 1-based position of `user_id` within the filtered set, or None when
    /// the user is absent from it (unknown, non-athlete, or filtered out).
    #[instrument(skip(self))]
    pub async fn user_rank(
        &self,
        user_id: &UserId,
        filter: &LeaderboardFilter,
    ) -> Option<RankedAthlete> {
        let athletes = self.ranked(filter).await;

        athletes
            .iter()
            .position(|user| user.id == *user_id)
            .map(|index| RankedAthlete {
                rank: (index + 1) as i64,
                user: athletes[index].clone(),
            })
    }
}
