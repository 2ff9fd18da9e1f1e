use std::collections::BTreeMap;

use chrono::{Datelike, Utc};
use tracing::instrument;

use crate::db::models::coach::{
    CoachAnalytics, CoachAthlete, CoachMetricsSummary, NewCoachAthlete, NewPerformanceRecord,
    PerformanceRecord, WeeklyProgress,
};
use crate::db::models::user::{User, UserId};
use crate::db::store::{Store, StoreError, StoreResult};

/// How many trailing weekly buckets the analytics view reports.
const PROGRESS_WEEKS: usize = 4;

pub struct CoachRepository<'a> {
    store: &'a Store,
}

impl<'a> CoachRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(coach = %input.coach_id, athlete = %input.athlete_id))]
    pub async fn add_athlete(&self, input: NewCoachAthlete) -> StoreResult<CoachAthlete> {
        let mut tables = self.store.write().await;

        if !tables.users.contains_key(&input.coach_id) {
            return Err(StoreError::not_found("user", &input.coach_id));
        }
        if !tables.users.contains_key(&input.athlete_id) {
            return Err(StoreError::not_found("user", &input.athlete_id));
        }

        let duplicate = tables
            .coach_athletes
            .iter()
            .any(|link| link.coach_id == input.coach_id && link.athlete_id == input.athlete_id);
        if duplicate {
            return Err(StoreError::conflict(
                "coach athlete link",
                format!("{}:{}", input.coach_id, input.athlete_id),
            ));
        }

        let link = CoachAthlete::create(input);
        tables.coach_athletes.push(link.clone());

        Ok(link)
    }

    /// The coach's roster, in link-creation order.
    #[instrument(skip(self))]
    pub async fn athletes(&self, coach_id: &UserId) -> Vec<User> {
        let tables = self.store.read().await;

        tables
            .coach_athletes
            .iter()
            .filter(|link| link.coach_id == *coach_id)
            .filter_map(|link| tables.users.get(&link.athlete_id))
            .cloned()
            .collect()
    }

    /// Roster summary, derived entirely from stored state: current metric
    /// snapshots, pending current tasks, unresolved alerts, and the
    /// earliest-vs-latest performance trend per athlete.
    #[instrument(skip(self))]
    pub async fn metrics_summary(&self, coach_id: &UserId) -> CoachMetricsSummary {
        let roster = self.athletes(coach_id).await;
        let tables = self.store.read().await;

        let athlete_count = roster.len();
        let avg_performance = if roster.is_empty() {
            0.0
        } else {
            roster.iter().map(|a| a.metrics.mean()).sum::<f64>() / athlete_count as f64
        };

        let today = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let active_sessions = tables
            .daily_tasks
            .values()
            .filter(|task| {
                task.user_id
                    .as_ref()
                    .is_some_and(|owner| roster.iter().any(|a| a.id == *owner))
                    && !task.completed
                    && task.due_date >= today
            })
            .count();

        let injury_alerts = tables
            .injury_alerts
            .values()
            .filter(|alert| alert.coach_id.as_ref() == Some(coach_id) && !alert.resolved)
            .count();

        let improvements: Vec<f64> = roster
            .iter()
            .filter_map(|athlete| improvement_percent(&tables.performance_records, &athlete.id))
            .collect();
        let avg_improvement = if improvements.is_empty() {
            0.0
        } else {
            improvements.iter().sum::<f64>() / improvements.len() as f64
        };

        CoachMetricsSummary {
            athlete_count,
            active_sessions,
            avg_performance,
            injury_alerts,
            avg_improvement,
        }
    }

    /// Weekly team-progress series over the roster's performance records:
    /// per ISO week, the mean of record means and the best single record.
    #[instrument(skip(self))]
    pub async fn analytics(&self, coach_id: &UserId) -> CoachAnalytics {
        let roster = self.athletes(coach_id).await;
        let tables = self.store.read().await;

        let mut weeks: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
        for record in tables
            .performance_records
            .iter()
            .filter(|r| roster.iter().any(|a| a.id == r.user_id))
        {
            let week = record.recorded_at.iso_week();
            weeks
                .entry((week.year(), week.week()))
                .or_default()
                .push(record.metrics.mean());
        }

        let team_progress = weeks
            .into_iter()
            .rev()
            .take(PROGRESS_WEEKS)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .enumerate()
            .map(|(index, (_, means))| WeeklyProgress {
                week: format!("Week {}", index + 1),
                average: means.iter().sum::<f64>() / means.len() as f64,
                top_performer: means.iter().cloned().fold(f64::MIN, f64::max),
            })
            .collect();

        CoachAnalytics { team_progress }
    }

    /// Append a performance snapshot and refresh the user's current
    /// metrics from it, both in one write section.
    #[instrument(skip(self, input), fields(user = %input.user_id))]
    pub async fn create_record(
        &self,
        input: NewPerformanceRecord,
    ) -> StoreResult<PerformanceRecord> {
        let mut tables = self.store.write().await;

        if !tables.users.contains_key(&input.user_id) {
            return Err(StoreError::not_found("user", &input.user_id));
        }

        let record = PerformanceRecord::create(input);
        if let Some(user) = tables.users.get_mut(&record.user_id) {
            user.metrics = record.metrics;
        }
        tables.performance_records.push(record.clone());

        Ok(record)
    }

    /// A user's snapshots, newest first.
    #[instrument(skip(self))]
    pub async fn records_for_user(&self, user_id: &UserId) -> Vec<PerformanceRecord> {
        let mut records: Vec<PerformanceRecord> = self
            .store
            .read()
            .await
            .performance_records
            .iter()
            .filter(|record| record.user_id == *user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

        records
    }
}

/// Percentage change between the athlete's earliest and latest snapshot
/// means. None with fewer than two records or a zero baseline.
fn improvement_percent(records: &[PerformanceRecord], athlete_id: &UserId) -> Option<f64> {
    let mut own: Vec<&PerformanceRecord> = records
        .iter()
        .filter(|r| r.user_id == *athlete_id)
        .collect();
    if own.len() < 2 {
        return None;
    }
    own.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));

    let first = own.first()?.metrics.mean();
    let last = own.last()?.metrics.mean();
    if first <= f64::EPSILON {
        return None;
    }

    Some((last - first) / first * 100.0)
}
