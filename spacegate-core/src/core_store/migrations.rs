//! Database migrations for the portal store
//!
//! Provides versioned migrations for the portal schema.
//! Each migration is applied atomically and tracked in the schema_version table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::errors::StoreResult;
use crate::core_space::Timestamp;

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Spaces, members and access tokens",
            up_sql: r#"
                -- Spaces with their external access configuration
                CREATE TABLE IF NOT EXISTS spaces (
                    id TEXT PRIMARY KEY,                    -- SpaceId (uuid)
                    name TEXT NOT NULL,
                    access_mode TEXT NOT NULL CHECK(access_mode IN ('public', 'restricted')),
                    password_hash TEXT,                     -- Argon2 PHC string
                    require_email_for_analytics INTEGER NOT NULL DEFAULT 0,
                    status TEXT NOT NULL CHECK(status IN ('draft', 'active', 'completed', 'archived')),
                    logo_path TEXT,
                    brand_color TEXT,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_spaces_status ON spaces(status);

                -- Space allowlist
                CREATE TABLE IF NOT EXISTS space_members (
                    space_id TEXT NOT NULL,
                    email TEXT NOT NULL COLLATE NOCASE,
                    role TEXT NOT NULL CHECK(role IN ('staff', 'stakeholder')),
                    invited_at INTEGER NOT NULL,
                    joined_at INTEGER,                      -- set once on first entry
                    PRIMARY KEY (space_id, email),
                    FOREIGN KEY (space_id) REFERENCES spaces(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_space_members_role ON space_members(space_id, role);

                -- Magic-link tokens, kept as an audit trail
                CREATE TABLE IF NOT EXISTS access_tokens (
                    id TEXT PRIMARY KEY,
                    space_id TEXT NOT NULL,
                    email TEXT NOT NULL COLLATE NOCASE,
                    token_hash TEXT NOT NULL UNIQUE,        -- sha256(token), hex
                    created_at INTEGER NOT NULL,
                    expires_at INTEGER NOT NULL,
                    used_at INTEGER,
                    FOREIGN KEY (space_id) REFERENCES spaces(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_access_tokens_lookup ON access_tokens(space_id, token_hash);
                CREATE INDEX IF NOT EXISTS idx_access_tokens_email ON access_tokens(space_id, email);
            "#,
        },
        Migration {
            version: 2,
            description: "Notifications, email log and integrations",
            up_sql: r#"
                CREATE TABLE IF NOT EXISTS notifications (
                    id TEXT PRIMARY KEY,
                    space_id TEXT NOT NULL,
                    recipient TEXT NOT NULL COLLATE NOCASE,
                    kind TEXT NOT NULL CHECK(kind IN ('mention', 'chat_message')),
                    actor TEXT NOT NULL,
                    payload TEXT NOT NULL,                  -- JSON
                    created_at INTEGER NOT NULL,
                    emailed INTEGER NOT NULL DEFAULT 0,
                    FOREIGN KEY (space_id) REFERENCES spaces(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_notifications_recipient
                    ON notifications(space_id, recipient, created_at);

                -- One row per outbound notification email, consulted for rate limiting
                CREATE TABLE IF NOT EXISTS notification_email_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    space_id TEXT NOT NULL,
                    recipient TEXT NOT NULL COLLATE NOCASE,
                    sent_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_notification_email_log_recent
                    ON notification_email_log(recipient, space_id, sent_at);

                CREATE TABLE IF NOT EXISTS space_integrations (
                    space_id TEXT NOT NULL,
                    provider TEXT NOT NULL CHECK(provider IN ('slack', 'teams', 'webhook')),
                    webhook_url TEXT NOT NULL,
                    sealed_token TEXT NOT NULL,             -- iv:tag:ciphertext
                    enabled_events TEXT NOT NULL,           -- JSON array of event names
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (space_id, provider),
                    FOREIGN KEY (space_id) REFERENCES spaces(id) ON DELETE CASCADE
                );
            "#,
        },
    ]
}

fn ensure_version_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get current schema version from database
pub fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> StoreResult<i32> {
    let conn = pool.get()?;
    ensure_version_table(&conn)?;

    let version: Option<i32> = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> StoreResult<()> {
    let current_version = get_current_version(pool)?;

    let pending_migrations: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending_migrations.is_empty() {
        return Ok(());
    }

    let conn = pool.get()?;

    for migration in pending_migrations {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, Timestamp::now().as_sql()],
        )?;

        tx.commit()?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );
    }

    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations().iter().map(|m| m.version).max().unwrap_or(0)
}
