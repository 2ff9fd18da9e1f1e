use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;

use crate::db::models::task::{DailyTask, NewDailyTask, TaskId};
use crate::db::models::user::UserId;
use crate::db::store::{Store, StoreError, StoreResult};

pub struct TaskRepository<'a> {
    store: &'a Store,
}

impl<'a> TaskRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &TaskId) -> StoreResult<DailyTask> {
        self.store
            .read()
            .await
            .daily_tasks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("task", id))
    }

    /// The user's current task view: their own tasks plus global templates,
    /// due on or after `horizon`, ordered by ascending due date.
    #[instrument(skip(self, horizon))]
    pub async fn current_for_user(
        &self,
        user_id: &UserId,
        horizon: DateTime<Utc>,
    ) -> Vec<DailyTask> {
        let tables = self.store.read().await;

        let mut tasks: Vec<DailyTask> = tables
            .daily_tasks
            .values()
            .filter(|task| {
                let owned = match &task.user_id {
                    Some(owner) => owner == user_id,
                    None => true,
                };
                owned && task.due_date >= horizon
            })
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.due_date.cmp(&b.due_date));

        tasks
    }

    /// Commit a generated batch for `user_id` on `day`. The whole batch and
    /// its day marker land in one write section, so either every task of
    /// the batch becomes visible or none does, and a second batch for the
    /// same user and day is rejected as a conflict.
    #[instrument(skip(self, tasks), fields(batch_size = tasks.len()))]
    pub async fn insert_batch(
        &self,
        user_id: &UserId,
        day: NaiveDate,
        tasks: Vec<NewDailyTask>,
    ) -> StoreResult<Vec<DailyTask>> {
        let mut tables = self.store.write().await;

        let marker = (user_id.clone(), day);
        if tables.task_batches.contains(&marker) {
            return Err(StoreError::conflict(
                "task batch",
                format!("{user_id}@{day}"),
            ));
        }

        let created: Vec<DailyTask> = tasks.into_iter().map(DailyTask::create).collect();
        for task in &created {
            tables.daily_tasks.insert(task.id.clone(), task.clone());
        }
        tables.task_batches.insert(marker);

        tracing::info!(user = %user_id, count = created.len(), "daily batch committed");
        Ok(created)
    }
}
