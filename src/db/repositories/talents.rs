use tracing::instrument;

use crate::db::models::talent::{Talent, TalentId};
use crate::db::models::user::UserId;
use crate::db::store::{Store, StoreError, StoreResult};

pub struct TalentRepository<'a> {
    store: &'a Store,
}

impl<'a> TalentRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &TalentId) -> StoreResult<Talent> {
        self.store
            .read()
            .await
            .talents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("talent", id))
    }

    /// A user's talents, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: &UserId) -> Vec<Talent> {
        let tables = self.store.read().await;

        let mut talents: Vec<Talent> = tables
            .talents
            .values()
            .filter(|talent| talent.user_id == *user_id)
            .cloned()
            .collect();
        talents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        talents
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Vec<Talent> {
        let mut talents: Vec<Talent> = self.store.read().await.talents.values().cloned().collect();
        talents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        talents
    }

    /// Flag a talent as reviewed. Approval is a review marker only and
    /// never touches points.
    #[instrument(skip(self), fields(approver = %approver.0))]
    pub async fn approve(&self, id: &TalentId, approver: &UserId) -> StoreResult<Talent> {
        let mut tables = self.store.write().await;

        if !tables.users.contains_key(approver) {
            return Err(StoreError::not_found("user", approver));
        }

        let talent = tables
            .talents
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("talent", id))?;
        talent.approved = true;
        talent.approved_by = Some(approver.clone());

        Ok(talent.clone())
    }
}
