use chrono::Utc;
use tracing::instrument;

use crate::db::models::alert::{AlertId, InjuryAlert, NewInjuryAlert};
use crate::db::models::user::UserId;
use crate::db::store::{Store, StoreError, StoreResult};

pub struct AlertRepository<'a> {
    store: &'a Store,
}

impl<'a> AlertRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(athlete = %input.athlete_id, risk = ?input.risk_level))]
    pub async fn create(&self, input: NewInjuryAlert) -> StoreResult<InjuryAlert> {
        let mut tables = self.store.write().await;

        if !tables.users.contains_key(&input.athlete_id) {
            return Err(StoreError::not_found("user", &input.athlete_id));
        }

        let alert = InjuryAlert::create(input);
        tables.injury_alerts.insert(alert.id.clone(), alert.clone());

        tracing::info!(alert = %alert.id, "injury alert raised");
        Ok(alert)
    }

    /// Alerts assigned to a coach, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_coach(&self, coach_id: &UserId) -> Vec<InjuryAlert> {
        let mut alerts: Vec<InjuryAlert> = self
            .store
            .read()
            .await
            .injury_alerts
            .values()
            .filter(|alert| alert.coach_id.as_ref() == Some(coach_id))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        alerts
    }

    /// Mark an alert resolved. Resolving twice returns the alert unchanged.
    #[instrument(skip(self))]
    pub async fn resolve(&self, id: &AlertId) -> StoreResult<InjuryAlert> {
        let mut tables = self.store.write().await;

        let alert = tables
            .injury_alerts
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("injury alert", id))?;

        if !alert.resolved {
            alert.resolved = true;
            alert.resolved_at = Some(Utc::now());
        }

        Ok(alert.clone())
    }
}
