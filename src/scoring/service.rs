use std::sync::Arc;

use tracing::instrument;

use crate::db::models::achievement::{AchievementId, UserAchievement};
use crate::db::models::talent::{NewTalent, Talent};
use crate::db::models::user::UserId;
use crate::db::store::{Store, StoreError, StoreResult, Tables};
use crate::scoring::award::{award_for, ScoreAction};
use crate::scoring::badge::{tier_for, Badge};

/// Everything a single award application changed.
#[derive(Debug, Clone)]
pub struct AwardOutcome {
    pub new_total: i64,
    pub delta: i64,
    pub base: i64,
    pub bonus: i64,
    pub badge: Badge,
    pub badge_changed: bool,
    pub unlocked: Vec<AchievementId>,
}

/// Apply one action's delta to a user inside an already-held write section.
///
/// Points, the re-resolved badge and any crossed achievement thresholds all
/// mutate under the same guard, so no reader can observe them out of step.
/// The caller is expected to hold the user's mutation lock when the
/// surrounding sequence spans more than this call.
pub(crate) fn apply_award(
    tables: &mut Tables,
    user_id: &UserId,
    action: ScoreAction,
) -> StoreResult<AwardOutcome> {
    let breakdown = award_for(&action);

    let Tables {
        users,
        achievements,
        user_achievements,
        ..
    } = tables;

    let user = users
        .get_mut(user_id)
        .ok_or_else(|| StoreError::not_found("user", user_id))?;

    let old_total = user.points;
    let new_total = old_total + breakdown.total();
    let badge = tier_for(new_total);
    let badge_changed = badge != user.badge;

    user.points = new_total;
    user.badge = badge;

    let mut unlocked = Vec::new();
    for achievement in achievements.iter() {
        let crossed =
            achievement.points_required > old_total && achievement.points_required <= new_total;
        if !crossed {
            continue;
        }

        let already_unlocked = user_achievements
            .iter()
            .any(|link| link.user_id == *user_id && link.achievement_id == achievement.id);
        if already_unlocked {
            continue;
        }

        user_achievements.push(UserAchievement::unlock(
            user_id.clone(),
            achievement.id.clone(),
            new_total,
        ));
        unlocked.push(achievement.id.clone());
    }

    Ok(AwardOutcome {
        new_total,
        delta: breakdown.total(),
        base: breakdown.base,
        bonus: breakdown.bonus,
        badge,
        badge_changed,
        unlocked,
    })
}

/// Drives point-mutating workflows against the store, serializing them per
/// user.
#[derive(Clone)]
pub struct ScoringService {
    store: Arc<Store>,
}

impl ScoringService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Persist a talent and score it in one serialized sequence.
    ///
    /// The stored record keeps its fixed base value; bonuses only move the
    /// user's running total. The returned outcome carries the combined
    /// delta for the response payload.
    #[instrument(skip(self, input), fields(user = %input.user_id))]
    pub async fn submit_talent(&self, input: NewTalent) -> StoreResult<(Talent, AwardOutcome)> {
        let user_id = input.user_id.clone();

        let _guard = self.store.user_lock(&user_id).await;
        let mut tables = self.store.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::not_found("user", &user_id));
        }

        let talent = Talent::create(input);
        tables.talents.insert(talent.id.clone(), talent.clone());

        let talent_count = tables
            .talents
            .values()
            .filter(|t| t.user_id == user_id)
            .count() as u64;

        let outcome = apply_award(&mut tables, &user_id, ScoreAction::TalentSubmitted {
            talent_count,
        })?;

        tracing::info!(
            talent = %talent.id,
            delta = outcome.delta,
            total = outcome.new_total,
            badge = %outcome.badge,
            "talent submission scored"
        );

        Ok((talent, outcome))
    }

    /// Serialized award application for callers that already did their own
    /// state transition bookkeeping within the same lock, or need none.
    #[instrument(skip(self))]
    pub async fn apply(&self, user_id: &UserId, action: ScoreAction) -> StoreResult<AwardOutcome> {
        let _guard = self.store.user_lock(user_id).await;
        let mut tables = self.store.write().await;

        apply_award(&mut tables, user_id, action)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::models::user::{NewUser, Role};
    use crate::db::repositories::users::UserRepository;

    async fn seeded_athlete(store: &Store) -> UserId {
        UserRepository::new(store)
            .create(NewUser {
                external_id: String::from("athlete-ext"),
                email: String::from("athlete@example.com"),
                display_name: String::from("Athlete"),
                photo_url: None,
                role: Some(Role::Athlete),
                sport: Some(String::from("sprint")),
                skill_level: None,
                location: None,
                age: None,
            })
            .await
            .unwrap()
            .id
    }

    fn talent(user_id: &UserId, name: &str) -> NewTalent {
        NewTalent {
            name: name.to_string(),
            sport: String::from("sprint"),
            category: None,
            description: None,
            user_id: user_id.clone(),
        }
    }

    #[tokio::test]
    async fn first_talent_awards_thirty_and_unlocks_first_steps() {
        let store = Store::new();
        let user_id = seeded_athlete(&store).await;
        let service = ScoringService::new(store.clone());

        let (stored, outcome) = service.submit_talent(talent(&user_id, "high jump")).await.unwrap();

        assert_eq!(stored.points_awarded, 10);
        assert_eq!(outcome.base, 10);
        assert_eq!(outcome.bonus, 20);
        assert_eq!(outcome.delta, 30);
        assert_eq!(outcome.new_total, 30);
        // only the 10-point milestone is crossed by the first submission
        assert_eq!(outcome.unlocked.len(), 1);
    }

    #[tokio::test]
    async fn talent_bonus_sequence_matches_the_rules() {
        let store = Store::new();
        let user_id = seeded_athlete(&store).await;
        let service = ScoringService::new(store.clone());

        let mut totals = Vec::new();
        for n in 0..5 {
            let (_, outcome) = service
                .submit_talent(talent(&user_id, &format!("talent {n}")))
                .await
                .unwrap();
            totals.push((outcome.delta, outcome.new_total));
        }

        assert_eq!(
            totals,
            vec![(30, 30), (10, 40), (10, 50), (10, 60), (60, 120)]
        );

        let user = UserRepository::new(&store).get(&user_id).await.unwrap();
        assert_eq!(user.points, 120);
        assert_eq!(user.badge, Badge::Gold);
    }

    #[tokio::test]
    async fn badge_always_tracks_the_persisted_total() {
        let store = Store::new();
        let user_id = seeded_athlete(&store).await;
        let service = ScoringService::new(store.clone());

        for points in [30, 30, 60, 90] {
            service
                .apply(&user_id, ScoreAction::TaskCompleted { points })
                .await
                .unwrap();

            let user = UserRepository::new(&store).get(&user_id).await.unwrap();
            assert_eq!(user.badge, tier_for(user.points));
        }
    }

    #[tokio::test]
    async fn threshold_crossings_unlock_achievements_once() {
        let store = Store::new();
        let user_id = seeded_athlete(&store).await;
        let service = ScoringService::new(store.clone());

        // 0 -> 120 crosses the 10, 50 and 100 thresholds at once
        let outcome = service
            .apply(&user_id, ScoreAction::TaskCompleted { points: 120 })
            .await
            .unwrap();
        assert_eq!(outcome.unlocked.len(), 3);

        // moving within already-crossed territory unlocks nothing new
        let outcome = service
            .apply(&user_id, ScoreAction::TaskCompleted { points: 10 })
            .await
            .unwrap();
        assert!(outcome.unlocked.is_empty());
    }

    #[tokio::test]
    async fn concurrent_submissions_never_lose_updates() {
        let store = Store::new();
        let user_id = seeded_athlete(&store).await;
        let service = ScoringService::new(store.clone());

        let mut handles = Vec::new();
        for n in 0..10 {
            let service = service.clone();
            let user_id = user_id.clone();
            handles.push(tokio::spawn(async move {
                service
                    .submit_talent(talent(&user_id, &format!("talent {n}")))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 10 base each, +20 once at the first, +50 at the fifth and tenth
        let user = UserRepository::new(&store).get(&user_id).await.unwrap();
        assert_eq!(user.points, 10 * 10 + 20 + 50 + 50);
    }

    #[tokio::test]
    async fn scoring_an_unknown_user_is_a_not_found() {
        let store = Store::new();
        let service = ScoringService::new(store.clone());

        let err = service
            .submit_talent(talent(&UserId::from("ghost"), "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
