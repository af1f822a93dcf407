//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! - `users`: full JSON blob plus the unique `email` column for lookups.
//! - `sites`: full JSON blob plus indexed `user_id` and unique `sub_domain`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use siteframe::SiteConfig;
use siteframe_api::User;

use super::{SiteUpdate, Storage, StorageError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    email   TEXT NOT NULL UNIQUE,
    data    TEXT NOT NULL
);

-- sub_domain is nullable; SQLite allows any number of NULLs under UNIQUE.
CREATE TABLE IF NOT EXISTS sites (
    site_id    TEXT PRIMARY KEY,
    user_id    TEXT,
    sub_domain TEXT UNIQUE,
    data       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sites_user ON sites(user_id);
";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(|p| p.into_inner());
            f(&mut *conn)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Error conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::Conflict(e.to_string())
        }
        _ => StorageError::Internal(e.to_string()),
    }
}

fn map_json_err(e: serde_json::Error) -> StorageError {
    StorageError::Internal(format!("JSON error: {e}"))
}

fn decode<T: serde::de::DeserializeOwned>(data: Option<String>) -> Result<Option<T>, StorageError> {
    data.map(|d| serde_json::from_str(&d).map_err(map_json_err))
        .transpose()
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    // --- Users ---------------------------------------------------------------

    async fn put_user(&self, user: &User) -> Result<(), StorageError> {
        let user = user.clone();
        self.blocking(move |conn| {
            let data = serde_json::to_string(&user).map_err(map_json_err)?;
            conn.execute(
                "INSERT INTO users (user_id, email, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET email = excluded.email, data = excluded.data",
                params![user.user_id, user.email, data],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        let user_id = user_id.to_string();
        self.blocking(move |conn| {
            let data = conn
                .query_row(
                    "SELECT data FROM users WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(map_err)?;
            decode(data)
        })
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let email = email.to_string();
        self.blocking(move |conn| {
            let data = conn
                .query_row(
                    "SELECT data FROM users WHERE email = ?1",
                    params![email],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(map_err)?;
            decode(data)
        })
        .await
    }

    // --- Sites ---------------------------------------------------------------

    async fn insert_site(&self, site: &SiteConfig) -> Result<(), StorageError> {
        let site = site.clone();
        self.blocking(move |conn| {
            let site_id = site
                .site_id
                .as_deref()
                .ok_or_else(|| StorageError::Internal("site has no siteId".into()))?;
            let data = serde_json::to_string(&site).map_err(map_json_err)?;
            conn.execute(
                "INSERT INTO sites (site_id, user_id, sub_domain, data) VALUES (?1, ?2, ?3, ?4)",
                params![site_id, site.user_id, site.sub_domain, data],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn get_site(&self, site_id: &str) -> Result<Option<SiteConfig>, StorageError> {
        let site_id = site_id.to_string();
        self.blocking(move |conn| {
            let data = conn
                .query_row(
                    "SELECT data FROM sites WHERE site_id = ?1",
                    params![site_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(map_err)?;
            decode(data)
        })
        .await
    }

    async fn get_site_by_sub_domain(
        &self,
        sub_domain: &str,
    ) -> Result<Option<SiteConfig>, StorageError> {
        let sub_domain = sub_domain.to_string();
        self.blocking(move |conn| {
            let data = conn
                .query_row(
                    "SELECT data FROM sites WHERE sub_domain = ?1",
                    params![sub_domain],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(map_err)?;
            decode(data)
        })
        .await
    }

    async fn update_site(
        &self,
        site_id: &str,
        update: &SiteUpdate,
    ) -> Result<SiteConfig, StorageError> {
        let site_id = site_id.to_string();
        let update = update.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;

            let data = tx
                .query_row(
                    "SELECT data FROM sites WHERE site_id = ?1",
                    params![site_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(map_err)?;
            let mut stored: SiteConfig = decode(data)?.ok_or(StorageError::NotFound)?;

            update.apply(&mut stored)?;

            let data = serde_json::to_string(&stored).map_err(map_json_err)?;
            tx.execute(
                "UPDATE sites SET sub_domain = ?2, data = ?3 WHERE site_id = ?1",
                params![site_id, stored.sub_domain, data],
            )
            .map_err(map_err)?;
            tx.commit().map_err(map_err)?;

            Ok(stored)
        })
        .await
    }

    async fn delete_site(&self, site_id: &str) -> Result<(), StorageError> {
        let site_id = site_id.to_string();
        self.blocking(move |conn| {
            let n = conn
                .execute("DELETE FROM sites WHERE site_id = ?1", params![site_id])
                .map_err(map_err)?;
            if n == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn list_sites(&self, user_id: &str) -> Result<Vec<SiteConfig>, StorageError> {
        let user_id = user_id.to_string();
        self.blocking(move |conn| {
            let mut stmt = conn
                .prepare("SELECT data FROM sites WHERE user_id = ?1 ORDER BY site_id")
                .map_err(map_err)?;
            let rows = stmt
                .query_map(params![user_id], |row| row.get::<_, String>(0))
                .map_err(map_err)?;

            let mut sites = Vec::new();
            for data in rows {
                let data = data.map_err(map_err)?;
                sites.push(serde_json::from_str(&data).map_err(map_json_err)?);
            }
            Ok(sites)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use siteframe_api::UserRole;

    fn store() -> SqliteStorage {
        SqliteStorage::open_in_memory().unwrap()
    }

    fn site(id: &str, sub_domain: Option<&str>) -> SiteConfig {
        SiteConfig {
            site_id: Some(id.into()),
            user_id: Some("u1".into()),
            title: Some("Acme".into()),
            sub_domain: sub_domain.map(str::to_string),
            change_id: Some("c1".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn user_roundtrip() {
        let s = store();
        let user = User {
            user_id: "u1".into(),
            email: "ada@example.com".into(),
            full_name: Some("Ada".into()),
            role: UserRole::Admin,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        s.put_user(&user).await.unwrap();
        assert_eq!(s.get_user("u1").await.unwrap(), Some(user.clone()));
        assert_eq!(s.get_user_by_email("ada@example.com").await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn sites_without_sub_domain_do_not_collide() {
        let s = store();
        s.insert_site(&site("s1", None)).await.unwrap();
        s.insert_site(&site("s2", None)).await.unwrap();
        s.insert_site(&site("s3", Some("acme"))).await.unwrap();

        let err = s.insert_site(&site("s4", Some("acme"))).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let found = s.get_site_by_sub_domain("acme").await.unwrap().unwrap();
        assert_eq!(found.site_id.as_deref(), Some("s3"));
        assert_eq!(s.list_sites("u1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_checks_change_id() {
        let s = store();
        s.insert_site(&site("s1", Some("acme"))).await.unwrap();

        let update = SiteUpdate {
            fields: SiteConfig {
                sub_domain: Some("acme-co".into()),
                ..Default::default()
            },
            expected_change_id: Some("c1".into()),
            change_id: "c2".into(),
            updated_at: "2026-01-02T00:00:00Z".into(),
        };
        let stored = s.update_site("s1", &update).await.unwrap();
        assert_eq!(stored.sub_domain.as_deref(), Some("acme-co"));
        assert!(s.get_site_by_sub_domain("acme-co").await.unwrap().is_some());
        assert!(s.get_site_by_sub_domain("acme").await.unwrap().is_none());

        let err = s.update_site("s1", &update).await.unwrap_err();
        assert!(matches!(err, StorageError::Stale(_)));

        let err = s.update_site("missing", &update).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let s = store();
        s.insert_site(&site("s1", None)).await.unwrap();
        s.delete_site("s1").await.unwrap();
        assert!(s.get_site("s1").await.unwrap().is_none());
        assert!(matches!(
            s.delete_site("s1").await.unwrap_err(),
            StorageError::NotFound
        ));
    }
}
