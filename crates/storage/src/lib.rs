pub mod blob;

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use onboard_core::store::{RecordStore, StoreError};
use onboard_core::types::{OnboardingRecord, StoredRecord, User, UserRole};

pub use blob::FsBlobStore;

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for interacting with user accounts.
    pub fn users(&self) -> UserRepository {
        UserRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle to operate on onboarding records.
    pub fn records(&self) -> RecordRepository {
        RecordRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository managing admin and user accounts.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Inserts a new account.
    pub async fn insert(&self, account: &NewUser<'_>) -> Result<(), UserError> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, name, role, password_hash, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(account.id)
        .bind(account.email)
        .bind(account.name)
        .bind(account.role.as_str())
        .bind(account.password_hash)
        .bind(to_rfc3339(account.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.code() == Some(Cow::Borrowed("2067")) {
                    return Err(UserError::EmailTaken);
                }
                Err(UserError::Database(sqlx::Error::Database(db_err)))
            }
            Err(err) => Err(UserError::Database(err)),
        }
    }

    /// Loads an account by email address.
    pub async fn fetch_by_email(&self, email: &str) -> Result<Option<UserRow>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, role, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Loads an account by identifier.
    pub async fn fetch_by_id(&self, id: &str) -> Result<Option<UserRow>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, role, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Data required to create a new account row.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub role: UserRole,
    pub password_hash: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Account row as stored in the `users` table.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Converts the row into a session user. Unknown roles downgrade to the
    /// non-admin role rather than failing the load.
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            role: UserRole::parse(&self.role).unwrap_or(UserRole::User),
            name: self.name.clone(),
        }
    }
}

/// Errors that can occur while operating on accounts.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

/// Repository for onboarding records.
#[derive(Clone)]
pub struct RecordRepository {
    pool: SqlitePool,
}

impl RecordRepository {
    /// Inserts a record and returns the generated identifier.
    pub async fn insert(&self, record: &OnboardingRecord) -> Result<String, RecordError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO onboarding_records \
             (id, name, sl_no, address, mobile_number, email_id, signature, fingerprint, photo, created_at, created_by, owner_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&record.name)
        .bind(&record.sl_no)
        .bind(&record.address)
        .bind(&record.mobile_number)
        .bind(&record.email_id)
        .bind(&record.signature)
        .bind(&record.fingerprint)
        .bind(&record.photo)
        .bind(to_rfc3339(record.created_at))
        .bind(&record.created_by)
        .bind(&record.owner_id)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Lists all records ordered by creation time, newest first.
    pub async fn list_all(&self) -> Result<Vec<RecordRow>, RecordError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT id, name, sl_no, address, mobile_number, email_id, signature, fingerprint, photo, created_at, created_by, owner_id \
             FROM onboarding_records ORDER BY created_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Onboarding record row as stored in the database.
#[derive(Debug, sqlx::FromRow)]
pub struct RecordRow {
    pub id: String,
    pub name: String,
    pub sl_no: String,
    pub address: String,
    pub mobile_number: String,
    pub email_id: String,
    pub signature: String,
    pub fingerprint: String,
    pub photo: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub owner_id: String,
}

impl RecordRow {
    /// Converts the database row into the domain record shape.
    pub fn into_domain(self) -> StoredRecord {
        StoredRecord {
            id: self.id,
            record: OnboardingRecord {
                name: self.name,
                sl_no: self.sl_no,
                address: self.address,
                mobile_number: self.mobile_number,
                email_id: self.email_id,
                signature: self.signature,
                fingerprint: self.fingerprint,
                photo: self.photo,
                created_at: self.created_at,
                created_by: self.created_by,
                owner_id: self.owner_id,
            },
        }
    }
}

/// Errors that can occur while mutating onboarding records.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
impl RecordStore for RecordRepository {
    async fn create(&self, record: &OnboardingRecord) -> Result<String, StoreError> {
        self.insert(record)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    async fn list_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let rows = RecordRepository::list_all(self)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(rows.into_iter().map(RecordRow::into_domain).collect())
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
