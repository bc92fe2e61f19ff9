//! Operations over the set of named caches.

use super::connection::CacheDb;
use super::entries::Cache;
use crate::Error;
use tokio_rusqlite::{OptionalExtension, params};
use url::Url;

/// The version that last completed activation, as recorded in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVersion {
    pub name: String,
    pub precache: Vec<Url>,
}

impl CacheDb {
    /// Open the cache with the given name, creating it if absent.
    pub async fn open_cache(&self, name: &str) -> Result<Cache, Error> {
        let cache_name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO caches (name, created_at) VALUES (?1, ?2)
                    ON CONFLICT(name) DO NOTHING",
                    params![cache_name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Cache::new(self.clone(), name))
    }

    /// Check whether a cache with this name exists.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Handle to an existing cache, without creating it.
    pub async fn existing_cache(&self, name: &str) -> Result<Option<Cache>, Error> {
        if self.has_cache(name).await? { Ok(Some(Cache::new(self.clone(), name))) } else { Ok(None) }
    }

    /// Delete a cache and every entry in it.
    ///
    /// Returns false if no cache had that name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all caches, in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Record `name` as the active version, replacing any earlier record.
    pub async fn record_active(&self, name: &str, precache: &[Url]) -> Result<(), Error> {
        let name = name.to_string();
        let precache_json = serde_json::to_string(&precache).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let activated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO active_version (id, name, precache_json, activated_at) VALUES (1, ?1, ?2, ?3)
                    ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        precache_json = excluded.precache_json,
                        activated_at = excluded.activated_at",
                    params![name, precache_json, activated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The version recorded by the last successful activation, if any.
    pub async fn active_version(&self) -> Result<Option<ActiveVersion>, Error> {
        let row = self
            .conn
            .call(|conn| -> Result<Option<(String, String)>, Error> {
                let row = conn
                    .query_row("SELECT name, precache_json FROM active_version WHERE id = 1", [], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(|(name, precache_json)| {
            let precache = serde_json::from_str(&precache_json)
                .map_err(|e| Error::CorruptEntry(format!("active version {name}: {e}")))?;
            Ok(ActiveVersion { name, precache })
        })
        .transpose()
    }
}
