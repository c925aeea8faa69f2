//! SQLite-backed implementation of the portal storage traits

use super::errors::{StoreError, StoreResult};
use super::migrations;
use super::{IntegrationStore, MemberStore, NotificationStore, SpaceStore, TokenStore};
use crate::config::StoreConfig;
use crate::core_access::token::AccessToken;
use crate::core_integrations::vault::IntegrationRecord;
use crate::core_integrations::IntegrationProvider;
use crate::core_notify::notification::{InAppNotification, NotificationKind};
use crate::core_space::{
    AccessMode, Branding, EmailAddress, MemberRole, SpaceAccessConfig, SpaceId, SpaceMember,
    SpaceStatus, Timestamp,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use std::time::Duration;
use uuid::Uuid;

/// SQL-based storage for the portal
pub struct SqlPortalStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqlPortalStore {
    /// Create a new SQL store with the given connection pool
    pub fn new(pool: Pool<SqliteConnectionManager>) -> StoreResult<Self> {
        migrations::migrate(&pool)?;

        Ok(Self { pool })
    }

    /// Open (and migrate) the database file named in the configuration
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(&config.database_path)
            .with_init(move |conn| init_connection(conn, busy_timeout));
        let pool = Pool::builder().max_size(config.pool_size).build(manager)?;

        Self::new(pool)
    }

    /// Create a new in-memory store.
    ///
    /// Every SQLite in-memory connection is a separate database, so the pool
    /// is limited to a single connection.
    pub fn memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| init_connection(conn, Duration::from_secs(5)));
        let pool = Pool::builder().max_size(1).build(manager)?;

        Self::new(pool)
    }
}

fn init_connection(conn: &mut rusqlite::Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

fn corrupt(what: &str, value: impl std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(StoreError::Corrupt(format!("{}: {}", what, value))),
    )
}

fn parse_space_id(raw: String) -> rusqlite::Result<SpaceId> {
    raw.parse().map_err(|_| corrupt("space id", raw))
}

fn parse_email(raw: String) -> rusqlite::Result<EmailAddress> {
    EmailAddress::parse(&raw).ok_or_else(|| corrupt("email", "empty"))
}

fn parse_uuid(raw: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&raw).map_err(|_| corrupt("uuid", raw))
}

const SPACE_COLUMNS: &str = "id, name, access_mode, password_hash, require_email_for_analytics,
     status, logo_path, brand_color, created_at, updated_at";

fn space_from_row(row: &Row<'_>) -> rusqlite::Result<SpaceAccessConfig> {
    let access_mode: String = row.get(2)?;
    let status: String = row.get(5)?;

    Ok(SpaceAccessConfig {
        id: parse_space_id(row.get(0)?)?,
        name: row.get(1)?,
        access_mode: access_mode
            .parse::<AccessMode>()
            .map_err(|_| corrupt("access mode", &access_mode))?,
        password_hash: row.get(3)?,
        require_email_for_analytics: row.get(4)?,
        status: status
            .parse::<SpaceStatus>()
            .map_err(|_| corrupt("status", &status))?,
        branding: Branding {
            logo_path: row.get(6)?,
            brand_color: row.get(7)?,
        },
        created_at: Timestamp::from_sql(row.get(8)?),
        updated_at: Timestamp::from_sql(row.get(9)?),
    })
}

const MEMBER_COLUMNS: &str = "space_id, email, role, invited_at, joined_at";

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<SpaceMember> {
    let role: String = row.get(2)?;

    Ok(SpaceMember {
        space_id: parse_space_id(row.get(0)?)?,
        email: parse_email(row.get(1)?)?,
        role: role.parse::<MemberRole>().map_err(|_| corrupt("role", &role))?,
        invited_at: Timestamp::from_sql(row.get(3)?),
        joined_at: row.get::<_, Option<i64>>(4)?.map(Timestamp::from_sql),
    })
}

const TOKEN_COLUMNS: &str = "id, space_id, email, token_hash, created_at, expires_at, used_at";

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<AccessToken> {
    Ok(AccessToken {
        id: parse_uuid(row.get(0)?)?,
        space_id: parse_space_id(row.get(1)?)?,
        email: parse_email(row.get(2)?)?,
        token_hash: row.get(3)?,
        created_at: Timestamp::from_sql(row.get(4)?),
        expires_at: Timestamp::from_sql(row.get(5)?),
        used_at: row.get::<_, Option<i64>>(6)?.map(Timestamp::from_sql),
    })
}

const NOTIFICATION_COLUMNS: &str = "id, space_id, recipient, kind, actor, payload, created_at, emailed";

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<InAppNotification> {
    let kind: String = row.get(3)?;
    let payload: String = row.get(5)?;

    Ok(InAppNotification {
        id: parse_uuid(row.get(0)?)?,
        space_id: parse_space_id(row.get(1)?)?,
        recipient: parse_email(row.get(2)?)?,
        kind: kind
            .parse::<NotificationKind>()
            .map_err(|_| corrupt("notification kind", &kind))?,
        actor: row.get(4)?,
        payload: serde_json::from_str(&payload).map_err(|e| corrupt("payload", e))?,
        created_at: Timestamp::from_sql(row.get(6)?),
        emailed: row.get(7)?,
    })
}

impl SpaceStore for SqlPortalStore {
    fn insert_space(&self, space: &SpaceAccessConfig) -> StoreResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO spaces (id, name, access_mode, password_hash, require_email_for_analytics,
                                 status, logo_path, brand_color, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                space.id.to_string(),
                &space.name,
                space.access_mode.as_str(),
                &space.password_hash,
                space.require_email_for_analytics,
                space.status.as_str(),
                &space.branding.logo_path,
                &space.branding.brand_color,
                space.created_at.as_sql(),
                space.updated_at.as_sql(),
            ],
        )?;

        Ok(())
    }

    fn get_space(&self, space_id: &SpaceId) -> StoreResult<Option<SpaceAccessConfig>> {
        let conn = self.pool.get()?;

        let space = conn
            .query_row(
                &format!("SELECT {} FROM spaces WHERE id = ?", SPACE_COLUMNS),
                params![space_id.to_string()],
                space_from_row,
            )
            .optional()?;

        Ok(space)
    }

    fn update_access_settings(&self, space: &SpaceAccessConfig) -> StoreResult<bool> {
        let conn = self.pool.get()?;

        let changed = conn.execute(
            "UPDATE spaces
             SET name = ?, access_mode = ?, password_hash = ?, require_email_for_analytics = ?,
                 logo_path = ?, brand_color = ?, updated_at = ?
             WHERE id = ?",
            params![
                &space.name,
                space.access_mode.as_str(),
                &space.password_hash,
                space.require_email_for_analytics,
                &space.branding.logo_path,
                &space.branding.brand_color,
                space.updated_at.as_sql(),
                space.id.to_string(),
            ],
        )?;

        Ok(changed == 1)
    }

    fn compare_and_set_status(
        &self,
        space_id: &SpaceId,
        expected: SpaceStatus,
        to: SpaceStatus,
        now: Timestamp,
    ) -> StoreResult<bool> {
        let conn = self.pool.get()?;

        let changed = conn.execute(
            "UPDATE spaces SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
            params![to.as_str(), now.as_sql(), space_id.to_string(), expected.as_str()],
        )?;

        Ok(changed == 1)
    }
}

impl MemberStore for SqlPortalStore {
    fn upsert_member(&self, member: &SpaceMember) -> StoreResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO space_members (space_id, email, role, invited_at, joined_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(space_id, email) DO UPDATE SET role = excluded.role",
            params![
                member.space_id.to_string(),
                member.email.as_str(),
                member.role.as_str(),
                member.invited_at.as_sql(),
                member.joined_at.map(|t| t.as_sql()),
            ],
        )?;

        Ok(())
    }

    fn remove_member(&self, space_id: &SpaceId, email: &EmailAddress) -> StoreResult<bool> {
        let conn = self.pool.get()?;

        let removed = conn.execute(
            "DELETE FROM space_members WHERE space_id = ? AND email = ?",
            params![space_id.to_string(), email.as_str()],
        )?;

        Ok(removed == 1)
    }

    fn find_member(&self, space_id: &SpaceId, email: &EmailAddress) -> StoreResult<Option<SpaceMember>> {
        let conn = self.pool.get()?;

        let member = conn
            .query_row(
                &format!(
                    "SELECT {} FROM space_members WHERE space_id = ? AND email = ?",
                    MEMBER_COLUMNS
                ),
                params![space_id.to_string(), email.as_str()],
                member_from_row,
            )
            .optional()?;

        Ok(member)
    }

    fn list_members(&self, space_id: &SpaceId) -> StoreResult<Vec<SpaceMember>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM space_members WHERE space_id = ? ORDER BY invited_at, email",
            MEMBER_COLUMNS
        ))?;

        let members = stmt
            .query_map(params![space_id.to_string()], member_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(members)
    }

    fn mark_joined(&self, space_id: &SpaceId, email: &EmailAddress, now: Timestamp) -> StoreResult<bool> {
        let conn = self.pool.get()?;

        let changed = conn.execute(
            "UPDATE space_members SET joined_at = ?
             WHERE space_id = ? AND email = ? AND joined_at IS NULL",
            params![now.as_sql(), space_id.to_string(), email.as_str()],
        )?;

        Ok(changed == 1)
    }
}

impl TokenStore for SqlPortalStore {
    fn insert_token(&self, token: &AccessToken) -> StoreResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO access_tokens (id, space_id, email, token_hash, created_at, expires_at, used_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                token.id.to_string(),
                token.space_id.to_string(),
                token.email.as_str(),
                &token.token_hash,
                token.created_at.as_sql(),
                token.expires_at.as_sql(),
                token.used_at.map(|t| t.as_sql()),
            ],
        )?;

        Ok(())
    }

    fn find_redeemable_token(
        &self,
        space_id: &SpaceId,
        token_hash: &str,
        now: Timestamp,
    ) -> StoreResult<Option<AccessToken>> {
        let conn = self.pool.get()?;

        let token = conn
            .query_row(
                &format!(
                    "SELECT {} FROM access_tokens
                     WHERE space_id = ? AND token_hash = ? AND used_at IS NULL AND expires_at > ?",
                    TOKEN_COLUMNS
                ),
                params![space_id.to_string(), token_hash, now.as_sql()],
                token_from_row,
            )
            .optional()?;

        Ok(token)
    }

    fn redeem_token(
        &self,
        space_id: &SpaceId,
        token_hash: &str,
        now: Timestamp,
    ) -> StoreResult<Option<AccessToken>> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // The guard makes this the single check-and-set: a second redemption
        // of the same token matches zero rows.
        let claimed = tx.execute(
            "UPDATE access_tokens SET used_at = ?
             WHERE space_id = ? AND token_hash = ? AND used_at IS NULL AND expires_at > ?",
            params![now.as_sql(), space_id.to_string(), token_hash, now.as_sql()],
        )?;

        if claimed != 1 {
            return Ok(None);
        }

        let token = tx.query_row(
            &format!(
                "SELECT {} FROM access_tokens WHERE space_id = ? AND token_hash = ?",
                TOKEN_COLUMNS
            ),
            params![space_id.to_string(), token_hash],
            token_from_row,
        )?;

        tx.execute(
            "UPDATE space_members SET joined_at = ?
             WHERE space_id = ? AND email = ? AND joined_at IS NULL",
            params![now.as_sql(), space_id.to_string(), token.email.as_str()],
        )?;

        tx.commit()?;

        Ok(Some(token))
    }

    fn list_tokens(&self, space_id: &SpaceId, email: &EmailAddress) -> StoreResult<Vec<AccessToken>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM access_tokens WHERE space_id = ? AND email = ?
             ORDER BY created_at DESC",
            TOKEN_COLUMNS
        ))?;

        let tokens = stmt
            .query_map(params![space_id.to_string(), email.as_str()], token_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tokens)
    }
}

impl NotificationStore for SqlPortalStore {
    fn claim_email_slot(
        &self,
        space_id: &SpaceId,
        recipient: &EmailAddress,
        window_start: Timestamp,
        now: Timestamp,
    ) -> StoreResult<bool> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Rows at or before the window start can no longer suppress anything
        tx.execute(
            "DELETE FROM notification_email_log WHERE sent_at <= ?",
            params![window_start.as_sql()],
        )?;

        let inserted = tx.execute(
            "INSERT INTO notification_email_log (space_id, recipient, sent_at)
             SELECT ?1, ?2, ?3
             WHERE NOT EXISTS (
                 SELECT 1 FROM notification_email_log
                 WHERE space_id = ?1 AND recipient = ?2 AND sent_at > ?4
             )",
            params![
                space_id.to_string(),
                recipient.as_str(),
                now.as_sql(),
                window_start.as_sql()
            ],
        )?;

        tx.commit()?;

        Ok(inserted == 1)
    }

    fn release_email_slot(
        &self,
        space_id: &SpaceId,
        recipient: &EmailAddress,
        sent_at: Timestamp,
    ) -> StoreResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "DELETE FROM notification_email_log
             WHERE id = (
                 SELECT id FROM notification_email_log
                 WHERE space_id = ?1 AND recipient = ?2 AND sent_at = ?3
                 ORDER BY id DESC LIMIT 1
             )",
            params![space_id.to_string(), recipient.as_str(), sent_at.as_sql()],
        )?;

        Ok(())
    }

    fn insert_notification(&self, notification: &InAppNotification) -> StoreResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO notifications (id, space_id, recipient, kind, actor, payload, created_at, emailed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                notification.id.to_string(),
                notification.space_id.to_string(),
                notification.recipient.as_str(),
                notification.kind.as_str(),
                &notification.actor,
                serde_json::to_string(&notification.payload)?,
                notification.created_at.as_sql(),
                notification.emailed,
            ],
        )?;

        Ok(())
    }

    fn mark_notification_emailed(&self, id: &Uuid) -> StoreResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "UPDATE notifications SET emailed = 1 WHERE id = ?",
            params![id.to_string()],
        )?;

        Ok(())
    }

    fn list_notifications(
        &self,
        space_id: &SpaceId,
        recipient: &EmailAddress,
    ) -> StoreResult<Vec<InAppNotification>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notifications WHERE space_id = ? AND recipient = ?
             ORDER BY created_at",
            NOTIFICATION_COLUMNS
        ))?;

        let notifications = stmt
            .query_map(
                params![space_id.to_string(), recipient.as_str()],
                notification_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notifications)
    }
}

impl IntegrationStore for SqlPortalStore {
    fn upsert_integration(&self, record: &IntegrationRecord) -> StoreResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO space_integrations (space_id, provider, webhook_url, sealed_token, enabled_events, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(space_id, provider) DO UPDATE SET
                 webhook_url = excluded.webhook_url,
                 sealed_token = excluded.sealed_token,
                 enabled_events = excluded.enabled_events,
                 updated_at = excluded.updated_at",
            params![
                record.space_id.to_string(),
                record.provider.as_str(),
                &record.webhook_url,
                &record.sealed_token,
                serde_json::to_string(&record.enabled_events)?,
                record.updated_at.as_sql(),
            ],
        )?;

        Ok(())
    }

    fn get_integration(
        &self,
        space_id: &SpaceId,
        provider: IntegrationProvider,
    ) -> StoreResult<Option<IntegrationRecord>> {
        let conn = self.pool.get()?;

        let row = conn
            .query_row(
                "SELECT webhook_url, sealed_token, enabled_events, updated_at
                 FROM space_integrations WHERE space_id = ? AND provider = ?",
                params![space_id.to_string(), provider.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((webhook_url, sealed_token, events, updated_at)) => Ok(Some(IntegrationRecord {
                space_id: *space_id,
                provider,
                webhook_url,
                sealed_token,
                enabled_events: serde_json::from_str(&events)?,
                updated_at: Timestamp::from_sql(updated_at),
            })),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_notify::notification::NotificationKind;

    fn store_with_space() -> (SqlPortalStore, SpaceAccessConfig) {
        let store = SqlPortalStore::memory().unwrap();
        let mut space = SpaceAccessConfig::new("Rollout".to_string(), Timestamp::from_millis(1_000));
        space.status = SpaceStatus::Active;
        store.insert_space(&space).unwrap();
        (store, space)
    }

    fn stakeholder(space: &SpaceAccessConfig, email: &str) -> SpaceMember {
        SpaceMember {
            space_id: space.id,
            email: EmailAddress::parse(email).unwrap(),
            role: MemberRole::Stakeholder,
            invited_at: Timestamp::from_millis(1_000),
            joined_at: None,
        }
    }

    fn token(space: &SpaceAccessConfig, email: &str, hash: &str, expires_at: u64) -> AccessToken {
        AccessToken {
            id: Uuid::new_v4(),
            space_id: space.id,
            email: EmailAddress::parse(email).unwrap(),
            token_hash: hash.to_string(),
            created_at: Timestamp::from_millis(1_000),
            expires_at: Timestamp::from_millis(expires_at),
            used_at: None,
        }
    }

    #[test]
    fn test_space_round_trip() {
        let (store, mut space) = store_with_space();
        let loaded = store.get_space(&space.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Rollout");
        assert_eq!(loaded.status, SpaceStatus::Active);

        space.access_mode = AccessMode::Restricted;
        space.branding.brand_color = Some("#112233".to_string());
        assert!(store.update_access_settings(&space).unwrap());

        let loaded = store.get_space(&space.id).unwrap().unwrap();
        assert_eq!(loaded.access_mode, AccessMode::Restricted);
        assert_eq!(loaded.branding.brand_color.as_deref(), Some("#112233"));
    }

    #[test]
    fn test_missing_space() {
        let store = SqlPortalStore::memory().unwrap();
        assert!(store.get_space(&SpaceId::generate()).unwrap().is_none());
    }

    #[test]
    fn test_compare_and_set_status() {
        let (store, space) = store_with_space();
        let now = Timestamp::from_millis(2_000);

        assert!(!store
            .compare_and_set_status(&space.id, SpaceStatus::Draft, SpaceStatus::Archived, now)
            .unwrap());
        assert!(store
            .compare_and_set_status(&space.id, SpaceStatus::Active, SpaceStatus::Completed, now)
            .unwrap());

        let loaded = store.get_space(&space.id).unwrap().unwrap();
        assert_eq!(loaded.status, SpaceStatus::Completed);
    }

    #[test]
    fn test_member_lookup_is_case_insensitive() {
        let (store, space) = store_with_space();
        store.upsert_member(&stakeholder(&space, "a@x.com")).unwrap();

        let upper = EmailAddress::parse("A@X.COM").unwrap();
        assert!(store.find_stakeholder(&space.id, &upper).unwrap().is_some());
    }

    #[test]
    fn test_staff_are_not_stakeholders() {
        let (store, space) = store_with_space();
        let mut member = stakeholder(&space, "staff@vendor.com");
        member.role = MemberRole::Staff;
        store.upsert_member(&member).unwrap();

        assert!(store.find_member(&space.id, &member.email).unwrap().is_some());
        assert!(store.find_stakeholder(&space.id, &member.email).unwrap().is_none());
    }

    #[test]
    fn test_mark_joined_only_once() {
        let (store, space) = store_with_space();
        let member = stakeholder(&space, "a@x.com");
        store.upsert_member(&member).unwrap();

        assert!(store
            .mark_joined(&space.id, &member.email, Timestamp::from_millis(5_000))
            .unwrap());
        assert!(!store
            .mark_joined(&space.id, &member.email, Timestamp::from_millis(9_000))
            .unwrap());

        // Re-inviting keeps the original stamp
        store.upsert_member(&member).unwrap();
        let loaded = store.find_member(&space.id, &member.email).unwrap().unwrap();
        assert_eq!(loaded.joined_at, Some(Timestamp::from_millis(5_000)));
    }

    #[test]
    fn test_redeem_token_once() {
        let (store, space) = store_with_space();
        store.upsert_member(&stakeholder(&space, "a@x.com")).unwrap();
        store.insert_token(&token(&space, "a@x.com", "h1", 100_000)).unwrap();

        let now = Timestamp::from_millis(2_000);
        assert!(store.find_redeemable_token(&space.id, "h1", now).unwrap().is_some());

        let redeemed = store.redeem_token(&space.id, "h1", now).unwrap().unwrap();
        assert_eq!(redeemed.used_at, Some(now));
        assert!(store.redeem_token(&space.id, "h1", now).unwrap().is_none());
        assert!(store.find_redeemable_token(&space.id, "h1", now).unwrap().is_none());

        let member = store
            .find_member(&space.id, &EmailAddress::parse("a@x.com").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(member.joined_at, Some(now));
    }

    #[test]
    fn test_expired_token_not_redeemed() {
        let (store, space) = store_with_space();
        store.insert_token(&token(&space, "a@x.com", "h2", 3_000)).unwrap();

        assert!(store
            .redeem_token(&space.id, "h2", Timestamp::from_millis(3_000))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_token_scoped_to_space() {
        let (store, space) = store_with_space();
        store.insert_token(&token(&space, "a@x.com", "h3", 100_000)).unwrap();

        let other = SpaceId::generate();
        assert!(store
            .redeem_token(&other, "h3", Timestamp::from_millis(2_000))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_tokens_are_kept_after_use() {
        let (store, space) = store_with_space();
        store.insert_token(&token(&space, "a@x.com", "h4", 100_000)).unwrap();
        store
            .redeem_token(&space.id, "h4", Timestamp::from_millis(2_000))
            .unwrap();

        let email = EmailAddress::parse("a@x.com").unwrap();
        let tokens = store.list_tokens(&space.id, &email).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].used_at.is_some());
    }

    #[test]
    fn test_claim_email_slot_window() {
        let (store, space) = store_with_space();
        let recipient = EmailAddress::parse("a@x.com").unwrap();
        let window = Duration::from_secs(300);

        let t0 = Timestamp::from_millis(1_000_000);
        assert!(store.claim_email_slot(&space.id, &recipient, t0.minus(window), t0).unwrap());

        let t1 = t0.plus(Duration::from_secs(60));
        assert!(!store.claim_email_slot(&space.id, &recipient, t1.minus(window), t1).unwrap());

        let t2 = t0.plus(window);
        assert!(store.claim_email_slot(&space.id, &recipient, t2.minus(window), t2).unwrap());
    }

    #[test]
    fn test_released_slot_can_be_claimed_again() {
        let (store, space) = store_with_space();
        let recipient = EmailAddress::parse("a@x.com").unwrap();
        let window = Duration::from_secs(300);

        let t0 = Timestamp::from_millis(1_000_000);
        assert!(store.claim_email_slot(&space.id, &recipient, t0.minus(window), t0).unwrap());
        store.release_email_slot(&space.id, &recipient, t0).unwrap();

        let t1 = t0.plus(Duration::from_secs(10));
        assert!(store.claim_email_slot(&space.id, &recipient, t1.minus(window), t1).unwrap());
    }

    #[test]
    fn test_email_log_is_pruned_past_the_window() {
        let (store, space) = store_with_space();
        let window = Duration::from_secs(300);
        let t0 = Timestamp::from_millis(1_000_000);

        for name in ["a@x.com", "b@x.com", "c@x.com"] {
            let recipient = EmailAddress::parse(name).unwrap();
            assert!(store.claim_email_slot(&space.id, &recipient, t0.minus(window), t0).unwrap());
        }

        let later = t0.plus(window).plus(Duration::from_secs(1));
        let recipient = EmailAddress::parse("a@x.com").unwrap();
        assert!(store
            .claim_email_slot(&space.id, &recipient, later.minus(window), later)
            .unwrap());

        let conn = store.pool.get().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM notification_email_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_notification_round_trip() {
        let (store, space) = store_with_space();
        let recipient = EmailAddress::parse("a@x.com").unwrap();
        let notification = InAppNotification {
            id: Uuid::new_v4(),
            space_id: space.id,
            recipient: recipient.clone(),
            kind: NotificationKind::Mention,
            actor: "Dana".to_string(),
            payload: serde_json::json!({ "excerpt": "see @a" }),
            created_at: Timestamp::from_millis(3_000),
            emailed: false,
        };
        store.insert_notification(&notification).unwrap();
        store.mark_notification_emailed(&notification.id).unwrap();

        let loaded = store.list_notifications(&space.id, &recipient).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].emailed);
        assert_eq!(loaded[0].payload["excerpt"], "see @a");
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            database_path: dir.path().join("nested").join("portal.db"),
            ..StoreConfig::default()
        };

        let space = SpaceAccessConfig::new("Persisted".to_string(), Timestamp::from_millis(1));
        {
            let store = SqlPortalStore::open(&config).unwrap();
            store.insert_space(&space).unwrap();
        }

        let reopened = SqlPortalStore::open(&config).unwrap();
        assert!(reopened.get_space(&space.id).unwrap().is_some());
    }
}
