use async_trait::async_trait;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Row, Sqlite, SqlitePool};
use tracing::info;

use super::{StoreError, SubmissionStore};
use crate::approval::{Submission, SubmissionId};

/// SQLite-backed record store. Each row keeps the full JSON record plus the
/// columns needed for lookups and the revision check.
pub struct SqliteSubmissionStore {
    pool: SqlitePool,
}

impl SqliteSubmissionStore {
    /// Open (and create if needed) the database, running migrations on request
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        auto_migrate: bool,
    ) -> Result<Self, StoreError> {
        if !Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(sqlx::Error::from)?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }

    fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Submission, StoreError> {
        let body: String = row.get("body");
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SubmissionStore for SqliteSubmissionStore {
    async fn list_all(&self) -> Result<Vec<Submission>, StoreError> {
        let rows = sqlx::query("SELECT body FROM submissions ORDER BY created_seq DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::decode).collect()
    }

    async fn get_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        let row = sqlx::query("SELECT body FROM submissions WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::decode).transpose()
    }

    async fn upsert(&self, submission: Submission) -> Result<(), StoreError> {
        let body = serde_json::to_string(&submission)?;
        sqlx::query(
            r#"
            INSERT INTO submissions (id, username, revision, body, created_seq, updated_at)
            VALUES (?1, ?2, ?3, ?4,
                    (SELECT COALESCE(MAX(created_seq), 0) + 1 FROM submissions),
                    datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                revision = excluded.revision,
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(submission.id.as_str())
        .bind(&submission.username)
        .bind(submission.revision as i64)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_all(&self, submissions: Vec<Submission>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM submissions")
            .execute(&mut *tx)
            .await?;

        // Stored lists read newest first; keep that order on reload
        let total = submissions.len() as i64;
        for (index, submission) in submissions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO submissions (id, username, revision, body, created_seq, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                "#,
            )
            .bind(submission.id.as_str())
            .bind(&submission.username)
            .bind(submission.revision as i64)
            .bind(serde_json::to_string(submission)?)
            .bind(total - index as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, id: &SubmissionId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM submissions WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_if_revision(
        &self,
        expected_revision: u64,
        submission: Submission,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_string(&submission)?;
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET revision = ?1, body = ?2, updated_at = datetime('now')
            WHERE id = ?3 AND revision = ?4
            "#,
        )
        .bind(submission.revision as i64)
        .bind(body)
        .bind(submission.id.as_str())
        .bind(expected_revision as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let row = sqlx::query("SELECT revision FROM submissions WHERE id = ?1")
            .bind(submission.id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let found: i64 = row.get("revision");
                Err(StoreError::RevisionConflict {
                    id: submission.id,
                    expected: expected_revision,
                    found: found as u64,
                })
            }
            None => Err(StoreError::NotFound(submission.id)),
        }
    }
}
