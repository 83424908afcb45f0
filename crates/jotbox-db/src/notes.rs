//! PostgreSQL note metadata store.
//!
//! Rows live in the `note` table (`id`, `bucketname`, `filename`,
//! `created_at_utc`). Every method runs a single statement on a pooled
//! connection and commits on its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jotbox_core::{Error, NoteId, NoteMetadataStore, NoteRecord, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL implementation of [`NoteMetadataStore`].
#[derive(Clone)]
pub struct PgNoteMetadataStore {
    pool: PgPool,
}

impl PgNoteMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::from(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}

fn record_from_row(row: &PgRow) -> Result<NoteRecord> {
    Ok(NoteRecord {
        id: row.try_get("id")?,
        owner: row.try_get("bucketname")?,
        filename: row.try_get("filename")?,
        created_at_utc: row.try_get("created_at_utc")?,
    })
}

/// Map a unique-index violation to `DuplicateName`, everything else through
/// the standard classification.
fn map_insert_error(e: sqlx::Error, owner: &str, filename: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return Error::DuplicateName {
                owner: owner.to_string(),
                filename: filename.to_string(),
            };
        }
    }
    Error::from(e)
}

#[async_trait]
impl NoteMetadataStore for PgNoteMetadataStore {
    async fn create_record(&self, owner: &str, filename: &str) -> Result<NoteId> {
        let id = Uuid::now_v7();
        // The NOT EXISTS guard keeps the check even where the unique index is absent
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"INSERT INTO note (id, bucketname, filename, created_at_utc)
               SELECT $1, $2, $3, NOW()
               WHERE NOT EXISTS (
                   SELECT 1 FROM note WHERE bucketname = $2 AND filename = $3
               )
               RETURNING id"#,
        )
        .bind(id)
        .bind(owner)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, owner, filename))?;

        let id = inserted.ok_or_else(|| Error::DuplicateName {
            owner: owner.to_string(),
            filename: filename.to_string(),
        })?;

        debug!(
            subsystem = "db",
            component = "pg_metadata",
            op = "create_record",
            note_id = %id,
            owner,
            "Inserted note record"
        );
        Ok(id)
    }

    async fn get_by_owner_and_filename(&self, owner: &str, filename: &str) -> Result<NoteRecord> {
        let row = sqlx::query(
            r#"SELECT id, bucketname, filename, created_at_utc
               FROM note WHERE bucketname = $1 AND filename = $2"#,
        )
        .bind(owner)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Note {:?} not found for owner {:?}", filename, owner)))?;

        record_from_row(&row)
    }

    async fn get_by_id(&self, id: NoteId) -> Result<NoteRecord> {
        let row = sqlx::query(
            r#"SELECT id, bucketname, filename, created_at_utc
               FROM note WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Note {} not found", id)))?;

        record_from_row(&row)
    }

    async fn rename_record(&self, id: NoteId, new_filename: &str) -> Result<()> {
        let result = match sqlx::query("UPDATE note SET filename = $1 WHERE id = $2")
            .bind(new_filename)
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(result) => result,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let record = self.get_by_id(id).await?;
                return Err(Error::DuplicateName {
                    owner: record.owner,
                    filename: new_filename.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Note {} not found", id)));
        }
        debug!(
            subsystem = "db",
            component = "pg_metadata",
            op = "rename_record",
            note_id = %id,
            "Renamed note record"
        );
        Ok(())
    }

    async fn delete_record(&self, id: NoteId) -> Result<()> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Note {} not found", id)));
        }
        debug!(
            subsystem = "db",
            component = "pg_metadata",
            op = "delete_record",
            note_id = %id,
            "Deleted note record"
        );
        Ok(())
    }

    async fn reinsert_record(
        &self,
        id: NoteId,
        owner: &str,
        filename: &str,
        created_at_utc: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO note (id, bucketname, filename, created_at_utc)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(id)
        .bind(owner)
        .bind(filename)
        .bind(created_at_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, owner, filename))?;

        debug!(
            subsystem = "db",
            component = "pg_metadata",
            op = "reinsert_record",
            note_id = %id,
            owner,
            "Reinserted note record"
        );
        Ok(())
    }
}
