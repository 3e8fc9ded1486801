//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial appointment ledger",
        sql: r#"
            -- One record per booking attempt that succeeded; cancellations
            -- flip status but never remove the row.
            CREATE TABLE IF NOT EXISTS appointments (
                id TEXT PRIMARY KEY,
                code TEXT NOT NULL,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                email TEXT,
                preferred_date TEXT NOT NULL,
                preferred_time TEXT NOT NULL,
                message TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                cancelled_at TEXT,
                CHECK (status IN ('active', 'cancelled')),
                CHECK ((status = 'cancelled') = (cancelled_at IS NOT NULL))
            );

            -- Codes are unique across the whole ledger, cancelled included
            CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_code
                ON appointments(code);
        "#,
    },
    Migration {
        version: 2,
        description: "Enforce one active booking per slot",
        sql: r#"
            -- The write-time backstop for the booking race: at most one
            -- active row per (date, time). Cancelled rows stay out of the
            -- index, so a freed slot can be rebooked.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_active_slot
                ON appointments(preferred_date, preferred_time)
                WHERE status = 'active';
        "#,
    },
    Migration {
        version: 3,
        description: "Add indexes for availability and statistics queries",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_appointments_date_status
                ON appointments(preferred_date, status);
            CREATE INDEX IF NOT EXISTS idx_appointments_created
                ON appointments(created_at);
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}
