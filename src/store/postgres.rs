//! Postgres-backed store (`sql/schema.sql`).

use super::{
    credentials::hash_password, Donation, DonationStore, NewDonation, NewUser, StoreError, User,
    UserStore,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, first_name, last_name, contact, email, password_hash, \
                            refresh_token, created_at, updated_at";

const DONATION_COLUMNS: &str = "id, donor_id, food, quantity, expiry_date, location, postal, \
                                contact, food_image, created_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool sized for a single API instance.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }
}

fn query_span(operation: &'static str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        contact: row.try_get("contact")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        refresh_token: row.try_get("refresh_token")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn donation_from_row(row: &PgRow) -> Result<Donation, sqlx::Error> {
    let quantity: i64 = row.try_get("quantity")?;
    Ok(Donation {
        id: row.try_get("id")?,
        donor: row.try_get("donor_id")?,
        food: row.try_get("food")?,
        quantity: u32::try_from(quantity).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        expiry_date: row.try_get("expiry_date")?,
        location: row.try_get("location")?,
        postal: row.try_get("postal")?,
        contact: row.try_get("contact")?,
        food_image: row.try_get("food_image")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let password_hash = hash_password(user.password).await?;

        let query = format!(
            "INSERT INTO users (first_name, last_name, contact, email, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.contact)
            .bind(&user.email)
            .bind(&password_hash)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await?;

        Ok(user_from_row(&row)?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError> {
        let query = "UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, StoreError> {
        let query = "UPDATE users SET refresh_token = $3, updated_at = NOW() \
                     WHERE id = $1 AND refresh_token = $2";
        let result = sqlx::query(query)
            .bind(id)
            .bind(current)
            .bind(next)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, id: Uuid) -> Result<(), StoreError> {
        let query = "UPDATE users SET refresh_token = NULL, updated_at = NOW() \
                     WHERE id = $1 AND refresh_token IS NOT NULL";
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await?;
        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await?;

        Ok(())
    }
}

#[async_trait]
impl DonationStore for PgStore {
    async fn create_donation(
        &self,
        donor: Uuid,
        donation: NewDonation,
    ) -> Result<Donation, StoreError> {
        let query = format!(
            "INSERT INTO donations \
             (donor_id, food, quantity, expiry_date, location, postal, contact, food_image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {DONATION_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(donor)
            .bind(&donation.food)
            .bind(i64::from(donation.quantity))
            .bind(donation.expiry_date)
            .bind(&donation.location)
            .bind(&donation.postal)
            .bind(&donation.contact)
            .bind(&donation.food_image)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await?;

        Ok(donation_from_row(&row)?)
    }

    async fn list_donations(&self) -> Result<Vec<Donation>, StoreError> {
        let query = format!("SELECT {DONATION_COLUMNS} FROM donations ORDER BY created_at DESC");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(rows
            .iter()
            .map(donation_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn donations_by_postal(&self, postal: &str) -> Result<Vec<Donation>, StoreError> {
        let query = format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE postal = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&query)
            .bind(postal)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(rows
            .iter()
            .map(donation_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
