use tracing::instrument;

use crate::db::models::user::{NewUser, ProfileUpdate, User, UserId};
use crate::db::store::{Store, StoreError, StoreResult};

pub struct UserRepository<'a> {
    store: &'a Store,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Create a user, idempotently on external identity: a second create
    /// with the same `external_id` returns the existing record unchanged.
    #[instrument(skip(self, input), fields(external_id = %input.external_id))]
    pub async fn create(&self, input: NewUser) -> StoreResult<User> {
        let mut tables = self.store.write().await;

        if let Some(existing) = tables.users_by_external.get(&input.external_id) {
            let user = tables.users[existing].clone();
            tracing::debug!(user = %user.id, "external identity already registered");
            return Ok(user);
        }

        let user = User::create(input);
        tables
            .users_by_external
            .insert(user.external_id.clone(), user.id.clone());
        tables.user_order.push(user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());

        tracing::info!(user = %user.id, "user created");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &UserId) -> StoreResult<User> {
        self.store
            .read()
            .await
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    #[instrument(skip(self, external_id))]
    pub async fn by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        let tables = self.store.read().await;

        Ok(tables
            .users_by_external
            .get(external_id)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, id: &UserId, update: ProfileUpdate) -> StoreResult<User> {
        let mut tables = self.store.write().await;
        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("user", id))?;

        if let Some(display_name) = update.display_name {
            user.display_name = display_name;
        }
        if let Some(photo_url) = update.photo_url {
            user.photo_url = Some(photo_url);
        }
        if let Some(sport) = update.sport {
            user.sport = Some(sport);
        }
        if let Some(skill_level) = update.skill_level {
            user.skill_level = Some(skill_level);
        }
        if let Some(location) = update.location {
            user.location = Some(location);
        }
        if let Some(age) = update.age {
            user.age = Some(age);
        }

        Ok(user.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::models::user::Role;

    fn new_user(external_id: &str, sport: &str) -> NewUser {
        NewUser {
            external_id: external_id.to_string(),
            email: format!("{external_id}@example.com"),
            display_name: external_id.to_string(),
            photo_url: None,
            role: Some(Role::Athlete),
            sport: Some(sport.to_string()),
            skill_level: Some(String::from("intermediate")),
            location: None,
            age: Some(21),
        }
    }

    #[tokio::test]
    async fn create_is_idempotent_on_external_identity() {
        let store = Store::new();
        let repo = UserRepository::new(&store);

        let first = repo.create(new_user("ext-1", "sprint")).await.unwrap();
        let second = repo.create(new_user("ext-1", "marathon")).await.unwrap();

        assert_eq!(first.id, second.id);
        // the original record wins, the second payload is discarded
        assert_eq!(second.sport.as_deref(), Some("sprint"));
    }

    #[tokio::test]
    async fn new_users_start_at_zero_points_bronze() {
        let store = Store::new();
        let repo = UserRepository::new(&store);

        let user = repo.create(new_user("ext-2", "judo")).await.unwrap();
        assert_eq!(user.points, 0);
        assert_eq!(user.badge, crate::scoring::badge::Badge::Bronze);
    }

    #[tokio::test]
    async fn profile_update_leaves_points_untouched() {
        let store = Store::new();
        let repo = UserRepository::new(&store);
        let user = repo.create(new_user("ext-3", "judo")).await.unwrap();

        let updated = repo
            .update_profile(
                &user.id,
                ProfileUpdate {
                    display_name: Some(String::from("Renamed")),
                    location: Some(String::from("Osaka")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name, "Renamed");
        assert_eq!(updated.location.as_deref(), Some("Osaka"));
        assert_eq!(updated.points, 0);
        assert_eq!(updated.sport.as_deref(), Some("judo"));
    }

    #[tokio::test]
    async fn missing_user_is_a_not_found() {
        let store = Store::new();
        let repo = UserRepository::new(&store);

        let err = repo.get(&UserId::from("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
