//! Schema migrations for the user tables.
//!
//! Applied migrations are tracked in `schema_migrations`, so running the
//! runner against an up-to-date database is a no-op.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};

use crate::{DataError, DataResult, DieselPool};

/// Ordered list of `(version, sql)` pairs. New migrations go at the end.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_create_users",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'CLIENT'
            CHECK (role IN ('ADMIN', 'MODERATOR', 'CLIENT')),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email_lower ON users (LOWER(email));
    "#,
)];

pub struct MigrationRunner {
    db_pool: DieselPool,
}

impl std::fmt::Debug for MigrationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRunner").finish_non_exhaustive()
    }
}

impl MigrationRunner {
    pub fn new(db_pool: DieselPool) -> Self {
        Self { db_pool }
    }

    /// Applies every migration that has not been recorded yet.
    ///
    /// Returns the number of migrations applied by this call.
    pub fn run_migrations(&self) -> DataResult<usize> {
        tracing::info!("running database migrations");
        let mut conn = self.db_pool.get()?;

        create_migrations_table(&mut conn)?;

        let mut applied = 0;
        for (version, sql) in MIGRATIONS {
            if is_migration_applied(&mut conn, version)? {
                tracing::debug!(version, "migration already applied");
                continue;
            }
            conn.transaction::<_, DataError, _>(|conn| {
                conn.batch_execute(sql)
                    .map_err(|e| DataError::Migration(format!("{version}: {e}")))?;
                record_migration(conn, version)
            })?;
            tracing::info!(version, "migration applied");
            applied += 1;
        }
        Ok(applied)
    }
}

fn create_migrations_table(conn: &mut PgConnection) -> DataResult<()> {
    conn.batch_execute(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .map_err(|e| DataError::Migration(format!("failed to create schema_migrations table: {e}")))
}

fn is_migration_applied(conn: &mut PgConnection, version: &str) -> DataResult<bool> {
    #[derive(QueryableByName)]
    struct CountResult {
        #[diesel(sql_type = BigInt)]
        count: i64,
    }

    let result = sql_query("SELECT COUNT(*) AS count FROM schema_migrations WHERE version = $1")
        .bind::<Text, _>(version)
        .get_result::<CountResult>(conn)?;
    Ok(result.count > 0)
}

fn record_migration(conn: &mut PgConnection, version: &str) -> DataResult<()> {
    sql_query("INSERT INTO schema_migrations (version, applied_at) VALUES ($1, NOW())")
        .bind::<Text, _>(version)
        .execute(conn)
        .map_err(|e| DataError::Migration(format!("failed to record {version}: {e}")))?;
    Ok(())
}
