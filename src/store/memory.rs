//! In-process store used by the HTTP tests and local experiments.

use super::{
    credentials::hash_password, Donation, DonationStore, NewDonation, NewUser, StoreError, User,
    UserStore,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    donations: Vec<Donation>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users; lets tests assert that no duplicate was written.
    pub async fn user_count(&self) -> usize {
        self.inner.lock().await.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        // Hash before taking the lock; the uniqueness check below is what counts.
        let password_hash = hash_password(user.password).await?;

        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            contact: user.contact,
            email: user.email,
            password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(false);
        };
        user.refresh_token = Some(token.to_string());
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(false);
        };
        if user.refresh_token.as_deref() != Some(current) {
            return Ok(false);
        }
        user.refresh_token = Some(next.to_string());
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn clear_refresh_token(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.users.get_mut(&id) {
            if user.refresh_token.take().is_some() {
                user.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl DonationStore for MemoryStore {
    async fn create_donation(
        &self,
        donor: Uuid,
        donation: NewDonation,
    ) -> Result<Donation, StoreError> {
        let record = Donation {
            id: Uuid::new_v4(),
            donor,
            food: donation.food,
            quantity: donation.quantity,
            expiry_date: donation.expiry_date,
            location: donation.location,
            postal: donation.postal,
            contact: donation.contact,
            food_image: donation.food_image,
            created_at: Utc::now(),
        };
        self.inner.lock().await.donations.push(record.clone());
        Ok(record)
    }

    async fn list_donations(&self) -> Result<Vec<Donation>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.donations.iter().rev().cloned().collect())
    }

    async fn donations_by_postal(&self, postal: &str) -> Result<Vec<Donation>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .donations
            .iter()
            .rev()
            .filter(|d| d.postal == postal)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use secrecy::SecretString;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            contact: "9876543210".to_string(),
            email: email.to_string(),
            password: SecretString::from("cobol-forever"),
        }
    }

    fn new_donation(food: &str, postal: &str) -> anyhow::Result<NewDonation> {
        Ok(NewDonation {
            food: food.to_string(),
            quantity: 3,
            expiry_date: NaiveDate::from_ymd_opt(2030, 1, 31)
                .ok_or_else(|| anyhow::anyhow!("invalid date"))?,
            location: "Community hall".to_string(),
            postal: postal.to_string(),
            contact: "9876543210".to_string(),
            food_image: None,
        })
    }

    #[tokio::test]
    async fn create_user_hashes_password() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("grace@example.com")).await?;

        assert_ne!(user.password_hash, "cobol-forever");
        assert!(user.is_password_correct("cobol-forever").await?);
        assert!(user.refresh_token.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_duplicate_email_conflicts() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());

        let (first, second) = tokio::join!(
            store.create_user(new_user("dup@example.com")),
            store.create_user(new_user("dup@example.com"))
        );
        let outcomes = [first, second];
        let created = outcomes.iter().filter(|r| r.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|r| matches!(r, Err(StoreError::Conflict(_))))
            .count();

        assert_eq!(created, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(store.user_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_token_set_and_clear() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("rt@example.com")).await?;

        assert!(store.set_refresh_token(user.id, "token").await?);
        let stored = store.find_user_by_id(user.id).await?;
        assert_eq!(
            stored.and_then(|u| u.refresh_token),
            Some("token".to_string())
        );

        store.clear_refresh_token(user.id).await?;
        store.clear_refresh_token(user.id).await?;
        let stored = store.find_user_by_id(user.id).await?;
        assert_eq!(stored.and_then(|u| u.refresh_token), None);

        assert!(!store.set_refresh_token(Uuid::new_v4(), "token").await?);
        Ok(())
    }

    #[tokio::test]
    async fn rotate_refresh_token_rejects_stale_value() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("rotate@example.com")).await?;
        assert!(store.set_refresh_token(user.id, "first").await?);

        assert!(store.rotate_refresh_token(user.id, "first", "second").await?);
        assert!(!store.rotate_refresh_token(user.id, "first", "third").await?);

        let stored = store.find_user_by_id(user.id).await?;
        assert_eq!(
            stored.and_then(|u| u.refresh_token),
            Some("second".to_string())
        );

        store.clear_refresh_token(user.id).await?;
        assert!(!store.rotate_refresh_token(user.id, "second", "fourth").await?);
        assert!(
            !store
                .rotate_refresh_token(Uuid::new_v4(), "second", "fourth")
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_rotation_has_one_winner() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let user = store.create_user(new_user("race@example.com")).await?;
        store.set_refresh_token(user.id, "shared").await?;

        let (first, second) = tokio::join!(
            store.rotate_refresh_token(user.id, "shared", "next-a"),
            store.rotate_refresh_token(user.id, "shared", "next-b")
        );

        assert_eq!([first?, second?].iter().filter(|won| **won).count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn donations_filter_by_postal_newest_first()-> anyhow::Result<()> {
        let store = MemoryStore::new();
        let donor = Uuid::new_v4();
        store
            .create_donation(donor, new_donation("Rice", "M5V 2T6")?)
            .await?;
        store
            .create_donation(donor, new_donation("Bread", "K1A 0B1")?)
            .await?;
        store
            .create_donation(donor, new_donation("Soup", "M5V 2T6")?)
            .await?;

        let all = store.list_donations().await?;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].food, "Soup");

        let matching = store.donations_by_postal("M5V 2T6").await?;
        let foods: Vec<_> = matching.iter().map(|d| d.food.as_str()).collect();
        assert_eq!(foods, vec!["Soup", "Rice"]);

        assert!(store.donations_by_postal("H0H 0H0").await?.is_empty());
        Ok(())
    }
}
