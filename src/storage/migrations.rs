//! # Database Migration Management
//!
//! Schema evolution using SQL migrations embedded in the binary and tracked
//! in a `schema_migrations` table. Migrations run automatically on startup
//! when `auto_migrate` is enabled, and are applied at most once each.

use crate::errors::{Result, VaultError};
use crate::storage::DbPool;
use sqlx::Row;
use tracing::info;

/// Embedded migrations, applied in version order.
const MIGRATIONS: &[(i64, &str, &str)] =
    &[(1, "initial_schema", include_str!("../../migrations/0001_initial_schema.sql"))];

/// Run all pending migrations against the given pool.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
             version INTEGER PRIMARY KEY,
             description TEXT NOT NULL,
             applied_at TEXT NOT NULL
         )",
    )
    .execute(pool)
    .await
    .map_err(|e| VaultError::Database {
        source: e,
        context: "Failed to create schema_migrations table".to_string(),
    })?;

    for (version, description, sql) in MIGRATIONS {
        let applied = sqlx::query("SELECT version FROM schema_migrations WHERE version = $1")
            .bind(version)
            .fetch_optional(pool)
            .await
            .map_err(|e| VaultError::Database {
                source: e,
                context: format!("Failed to check migration {} status", version),
            })?;

        if applied.is_some() {
            continue;
        }

        let mut tx = pool.begin().await.map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to begin transaction for migration {}", version),
        })?;

        // SQLite executes one statement per call; split on the statement
        // terminator at line end.
        for statement in sql.split(";\n").map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| VaultError::Database {
                source: e,
                context: format!("Migration {} ({}) failed", version, description),
            })?;
        }

        sqlx::query(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES ($1, $2, $3)",
        )
        .bind(version)
        .bind(description)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to record migration {}", version),
        })?;

        tx.commit().await.map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to commit migration {}", version),
        })?;

        info!(version, description, "Applied database migration");
    }

    Ok(())
}

/// Get the highest applied migration version, if any.
pub async fn get_migration_version(pool: &DbPool) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT MAX(version) as version FROM schema_migrations")
        .fetch_one(pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: "Failed to read migration version".to_string(),
        })?;

    Ok(row.try_get::<Option<i64>, _>("version").unwrap_or(None))
}
