use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::ai::AiCollaborator;
use crate::db::models::task::{DailyTask, Difficulty, NewDailyTask, TaskCategory, TaskId};
use crate::db::models::user::{User, UserId};
use crate::db::repositories::tasks::TaskRepository;
use crate::db::store::{Store, StoreError, StoreResult};
use crate::scoring::award::ScoreAction;
use crate::scoring::service::{apply_award, AwardOutcome};

/// Result of a completion call. `award` is None when the call was a
/// repeat (idempotent no-op) or the task is an unowned global template.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub task: DailyTask,
    pub award: Option<AwardOutcome>,
}

/// Governs the pending -> completed transition and the once-per-day batch
/// generation that backs the "my daily tasks" view.
#[derive(Clone)]
pub struct TaskLifecycle {
    store: Arc<Store>,
    ai: Arc<dyn AiCollaborator>,
}

impl TaskLifecycle {
    pub fn new(store: Arc<Store>, ai: Arc<dyn AiCollaborator>) -> Self {
        Self { store, ai }
    }

    /// Fetch the user's current tasks, generating today's batch first when
    /// none exists yet.
    ///
    /// The check-then-generate sequence runs under the user's mutation
    /// lock, and the committed batch is additionally keyed on user+day, so
    /// concurrent same-day fetches produce exactly one batch between them.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn daily_tasks(&self, user: &User) -> StoreResult<Vec<DailyTask>> {
        let horizon = start_of_today();
        let repo = TaskRepository::new(&self.store);

        let current = repo.current_for_user(&user.id, horizon).await;
        if !needs_batch(&current) {
            return Ok(current);
        }

        let _guard = self.store.user_lock(&user.id).await;

        // somebody may have generated while we waited on the lock
        let current = repo.current_for_user(&user.id, horizon).await;
        if !needs_batch(&current) {
            return Ok(current);
        }

        let today = horizon.date_naive();
        let due = Utc::now() + chrono::Duration::days(1);

        let committed = match self.recommended_batch(user, due).await {
            Some(batch) => repo.insert_batch(&user.id, today, batch).await,
            None if current.is_empty() => {
                repo.insert_batch(&user.id, today, fallback_batch(&user.id, due))
                    .await
            }
            // recommendations unavailable but still-due tasks remain;
            // serve those and let a later fetch retry generation
            None => return Ok(current),
        };

        match committed {
            Ok(_) => {}
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!(user = %user.id, "today's batch already exists");
            }
            Err(e) => return Err(e),
        }

        Ok(repo.current_for_user(&user.id, horizon).await)
    }

    /// Ask the collaborator for today's batch. Any failure, an empty
    /// answer, or a single invalid descriptor discards the whole response
    /// so a batch is only ever committed complete.
    async fn recommended_batch(
        &self,
        user: &User,
        due: DateTime<Utc>,
    ) -> Option<Vec<NewDailyTask>> {
        let sport = user.sport.as_deref().unwrap_or("General");
        let skill_level = user.skill_level.as_deref().unwrap_or("beginner");

        let recommendations = match self
            .ai
            .generate_task_recommendations(sport, &user.metrics, skill_level, &[])
            .await
        {
            Ok(recommendations) => recommendations,
            Err(e) => {
                tracing::warn!(error = %e, user = %user.id, "ai recommendation unavailable");
                return None;
            }
        };

        if recommendations.is_empty() {
            return None;
        }

        let batch: Vec<NewDailyTask> = recommendations
            .into_iter()
            .map(|rec| NewDailyTask {
                title: rec.title,
                description: rec.description,
                points: rec.points,
                category: rec.category,
                difficulty: rec.difficulty,
                ai_recommended: true,
                user_id: Some(user.id.clone()),
                due_date: due,
            })
            .collect();

        if let Some(invalid) = batch.iter().find_map(|t| t.validate().err()) {
            tracing::warn!(reason = %invalid, "discarding ai batch with invalid descriptor");
            return None;
        }

        Some(batch)
    }

    /// Complete a task exactly once. Repeat calls return the task
    /// unchanged and award nothing; the first transition applies the
    /// task's points, the re-resolved badge and any unlocks in one write
    /// section.
    #[instrument(skip(self))]
    pub async fn complete(&self, id: &TaskId) -> StoreResult<CompletionOutcome> {
        let owner = TaskRepository::new(&self.store).get(id).await?.user_id;

        let _guard = match &owner {
            Some(user_id) => Some(self.store.user_lock(user_id).await),
            None => None,
        };

        let mut tables = self.store.write().await;

        if let Some(user_id) = &owner {
            if !tables.users.contains_key(user_id) {
                return Err(StoreError::not_found("user", user_id));
            }
        }

        let task = tables
            .daily_tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("task", id))?;

        if task.completed {
            return Ok(CompletionOutcome {
                task: task.clone(),
                award: None,
            });
        }

        task.completed = true;
        task.completed_at = Some(Utc::now());
        let task = task.clone();

        let award = match &task.user_id {
            Some(user_id) => {
                let outcome = apply_award(&mut tables, user_id, ScoreAction::TaskCompleted {
                    points: task.points,
                })?;
                tracing::info!(
                    task = %task.id,
                    user = %user_id,
                    delta = outcome.delta,
                    total = outcome.new_total,
                    "task completion scored"
                );
                Some(outcome)
            }
            None => None,
        };

        Ok(CompletionOutcome { task, award })
    }
}

fn start_of_today() -> DateTime<Utc> {
    Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

/// A fresh batch is due when the user has no current tasks at all, or when
/// the most recent one was created on an earlier calendar day.
fn needs_batch(current: &[DailyTask]) -> bool {
    match current.iter().map(|task| task.created_at).max() {
        Some(latest) => latest.date_naive() != Utc::now().date_naive(),
        None => true,
    }
}

/// The deterministic pair served when no recommendations are available.
fn fallback_batch(user_id: &UserId, due: DateTime<Utc>) -> Vec<NewDailyTask> {
    vec![
        NewDailyTask {
            title: String::from("Complete 30-minute practice session"),
            description: String::from("Focus on fundamental skills and techniques"),
            points: 20,
            category: TaskCategory::Training,
            difficulty: Difficulty::Medium,
            ai_recommended: false,
            user_id: Some(user_id.clone()),
            due_date: due,
        },
        NewDailyTask {
            title: String::from("Log your nutrition intake"),
            description: String::from("Track meals and hydration for better performance"),
            points: 10,
            category: TaskCategory::Nutrition,
            difficulty: Difficulty::Easy,
            ai_recommended: false,
            user_id: Some(user_id.clone()),
            due_date: due,
        },
    ]
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;

    use super::*;
    use crate::ai::{
        AiError, AiResult, AthleteRiskProfile, InjuryRiskAssessment, Recommendation,
    };
    use crate::db::models::user::{NewUser, Role, SkillMetrics};
    use crate::db::repositories::users::UserRepository;

    struct StubAi {
        recommendations: Vec<Recommendation>,
    }

    #[async_trait]
    impl AiCollaborator for StubAi {
        async fn generate_task_recommendations(
            &self,
            _sport: &str,
            _metrics: &SkillMetrics,
            _skill_level: &str,
            _history: &[String],
        ) -> AiResult<Vec<Recommendation>> {
            Ok(self.recommendations.clone())
        }

        async fn analyze_injury_risk(
            &self,
            _athlete: &AthleteRiskProfile,
        ) -> AiResult<InjuryRiskAssessment> {
            Err(AiError::Disabled)
        }

        fn enabled(&self) -> bool {
            true
        }
    }

    struct FailingAi;

    #[async_trait]
    impl AiCollaborator for FailingAi {
        async fn generate_task_recommendations(
            &self,
            _sport: &str,
            _metrics: &SkillMetrics,
            _skill_level: &str,
            _history: &[String],
        ) -> AiResult<Vec<Recommendation>> {
            Err(AiError::Timeout(10))
        }

        async fn analyze_injury_risk(
            &self,
            _athlete: &AthleteRiskProfile,
        ) -> AiResult<InjuryRiskAssessment> {
            Err(AiError::Disabled)
        }

        fn enabled(&self) -> bool {
            false
        }
    }

    fn recommendation(title: &str, points: i64) -> Recommendation {
        Recommendation {
            title: title.to_string(),
            description: String::from("Two short sentences of detail."),
            points,
            category: TaskCategory::Training,
            difficulty: Difficulty::Medium,
            estimated_duration: None,
        }
    }

    async fn seeded_user(store: &Arc<Store>) -> User {
        UserRepository::new(store)
            .create(NewUser {
                external_id: String::from("task-user"),
                email: String::from("task@example.com"),
                display_name: String::from("Task User"),
                photo_url: None,
                role: Some(Role::Athlete),
                sport: Some(String::from("sprint")),
                skill_level: Some(String::from("intermediate")),
                location: None,
                age: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ai_recommendations_materialize_as_todays_batch() {
        let store = Store::new();
        let user = seeded_user(&store).await;
        let lifecycle = TaskLifecycle::new(
            store.clone(),
            Arc::new(StubAi {
                recommendations: vec![
                    recommendation("Interval sprints", 30),
                    recommendation("Form drills", 20),
                    recommendation("Video review", 15),
                ],
            }),
        );

        let tasks = lifecycle.daily_tasks(&user).await.unwrap();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.ai_recommended));
        assert!(tasks.iter().all(|t| !t.completed));
    }

    #[tokio::test]
    async fn ai_failure_serves_the_fallback_pair() {
        let store = Store::new();
        let user = seeded_user(&store).await;
        let lifecycle = TaskLifecycle::new(store.clone(), Arc::new(FailingAi));

        let tasks = lifecycle.daily_tasks(&user).await.unwrap();
        assert_eq!(tasks.len(), 2);

        let points: Vec<i64> = tasks.iter().map(|t| t.points).collect();
        assert!(points.contains(&20));
        assert!(points.contains(&10));
        assert!(tasks.iter().all(|t| !t.ai_recommended));
    }

    #[tokio::test]
    async fn invalid_descriptor_voids_the_whole_ai_batch() {
        let store = Store::new();
        let user = seeded_user(&store).await;
        let lifecycle = TaskLifecycle::new(
            store.clone(),
            Arc::new(StubAi {
                recommendations: vec![
                    recommendation("Interval sprints", 30),
                    recommendation("Broken descriptor", 0),
                ],
            }),
        );

        // the partially-invalid response must not leave a partial batch;
        // the fallback pair takes its place
        let tasks = lifecycle.daily_tasks(&user).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| !t.ai_recommended));
    }

    #[tokio::test]
    async fn repeated_fetches_reuse_the_existing_batch() {
        let store = Store::new();
        let user = seeded_user(&store).await;
        let lifecycle = TaskLifecycle::new(store.clone(), Arc::new(FailingAi));

        let first = lifecycle.daily_tasks(&user).await.unwrap();
        let second = lifecycle.daily_tasks(&user).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);

        let ids_first: Vec<&TaskId> = first.iter().map(|t| &t.id).collect();
        let ids_second: Vec<&TaskId> = second.iter().map(|t| &t.id).collect();
        assert_eq!(ids_first, ids_second);
    }

    #[tokio::test]
    async fn concurrent_fetches_generate_exactly_one_batch() {
        let store = Store::new();
        let user = seeded_user(&store).await;
        let lifecycle = TaskLifecycle::new(store.clone(), Arc::new(FailingAi));

        let (a, b) = tokio::join!(lifecycle.daily_tasks(&user), lifecycle.daily_tasks(&user));
        assert_eq!(a.unwrap().len(), 2);
        assert_eq!(b.unwrap().len(), 2);

        let tables = store.read().await;
        assert_eq!(tables.daily_tasks.len(), 2);
    }

    #[tokio::test]
    async fn completing_twice_awards_exactly_once() {
        let store = Store::new();
        let user = seeded_user(&store).await;
        let lifecycle = TaskLifecycle::new(store.clone(), Arc::new(FailingAi));

        let tasks = lifecycle.daily_tasks(&user).await.unwrap();
        let target = tasks.iter().find(|t| t.points == 20).unwrap();

        let first = lifecycle.complete(&target.id).await.unwrap();
        assert!(first.task.completed);
        let award = first.award.expect("first completion awards points");
        assert_eq!(award.delta, 20);
        assert_eq!(award.bonus, 0);

        let second = lifecycle.complete(&target.id).await.unwrap();
        assert!(second.task.completed);
        assert!(second.award.is_none());

        let points = UserRepository::new(&store).get(&user.id).await.unwrap().points;
        assert_eq!(points, 20);
    }

    #[tokio::test]
    async fn completing_an_unknown_task_is_a_not_found() {
        let store = Store::new();
        let lifecycle = TaskLifecycle::new(store.clone(), Arc::new(FailingAi));

        let err = lifecycle.complete(&TaskId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
