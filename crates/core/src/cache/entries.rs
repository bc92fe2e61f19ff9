//! Entry operations within one named cache.
//!
//! Entries are keyed by [`Request::cache_key`]. Request headers are not part
//! of the key, so two requests for the same method and URL share an entry.

use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};
use url::Url;

use super::connection::CacheDb;
use crate::message::{Request, Response};
use crate::Error;

/// Handle to a single named cache.
///
/// Obtained from [`CacheDb::open_cache`]. Holds no state besides the name, so
/// it stays valid (but empty) if the cache is deleted underneath it; writes
/// to a deleted cache fail with a foreign key error.
#[derive(Clone, Debug)]
pub struct Cache {
    db: CacheDb,
    name: String,
}

/// Column values for one entry, prepared outside the database thread.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    response_url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self {
            key_hash: request.cache_key(),
            method: request.method().to_string(),
            url: request.url().to_string(),
            response_url: response.url.to_string(),
            status: i64::from(response.status),
            headers_json,
            body: response.body.to_vec(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, cache_name: &str, stored_at: &str) -> Result<(), Error> {
        conn.execute(
            "INSERT INTO entries (
                cache_name, key_hash, method, url, response_url, status, headers_json, body, stored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                method = excluded.method,
                url = excluded.url,
                response_url = excluded.response_url,
                status = excluded.status,
                headers_json = excluded.headers_json,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                cache_name,
                &self.key_hash,
                &self.method,
                &self.url,
                &self.response_url,
                self.status,
                &self.headers_json,
                &self.body,
                stored_at,
            ],
        )?;
        Ok(())
    }
}

fn decode_response(response_url: String, status: i64, headers_json: String, body: Vec<u8>) -> Result<Response, Error> {
    let url = Url::parse(&response_url).map_err(|e| Error::CorruptEntry(format!("{response_url}: {e}")))?;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?;
    let headers: Vec<(String, String)> =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    Ok(Response { url, status, headers, body: Bytes::from(body) })
}

impl Cache {
    pub(crate) fn new(db: CacheDb, name: &str) -> Self {
        Self { db, name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response under the request's key, replacing any prior entry.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let row = EntryRow::new(request, response)?;
        let cache_name = self.name.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| row.insert(conn, &cache_name, &stored_at))
            .await
            .map_err(Error::from)
    }

    /// Store several responses in one transaction: either all land or none do.
    pub async fn put_all(&self, entries: &[(Request, Response)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let cache_name = self.name.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    row.insert(&tx, &cache_name, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for a request.
    ///
    /// Returns None if nothing is stored under the request's key.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = request.cache_key();
        let cache_name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status, headers_json, body
                    FROM entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![cache_name, key_hash], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?, row.get::<_, Vec<u8>>(3)?))
                });

                match result {
                    Ok((response_url, status, headers_json, body)) => {
                        decode_response(response_url, status, headers_json, body).map(Some)
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for a request. Returns false if there was none.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let key_hash = request.cache_key();
        let cache_name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![cache_name, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Requests with a stored entry, oldest first.
    pub async fn keys(&self) -> Result<Vec<Request>, Error> {
        let cache_name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<Request>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url FROM entries WHERE cache_name = ?1 ORDER BY stored_at ASC, rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![cache_name], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(method, url)| -> Result<Request, Error> {
                        let url = Url::parse(&url).map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
                        Ok(Request::new(&method, url))
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored entries.
    pub async fn len(&self) -> Result<u64, Error> {
        let cache_name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE cache_name = ?1", params![cache_name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str) -> Request {
        Request::get(Url::parse("http://localhost:8100").unwrap().join(path).unwrap())
    }

    fn response(path: &str, body: &'static str) -> Response {
        Response {
            url: Url::parse("http://localhost:8100").unwrap().join(path).unwrap(),
            status: 200,
            headers: vec![("content-type".into(), "text/html; charset=utf-8".into())],
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("mta-wall-v1").await.unwrap();

        cache.put(&request("/"), &response("/", "<html>arrivals</html>")).await.unwrap();

        let stored = cache.match_request(&request("/")).await.unwrap().unwrap();
        assert_eq!(stored.status, 200);
        assert_eq!(stored.body, Bytes::from_static(b"<html>arrivals</html>"));
        assert_eq!(stored.content_type(), Some("text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("mta-wall-v1").await.unwrap();
        assert!(cache.match_request(&request("/unknown-path")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_ignores_method_mismatch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("mta-wall-v1").await.unwrap();
        cache.put(&request("/"), &response("/", "get")).await.unwrap();

        let post = Request::new("POST", request("/").url().clone());
        assert!(cache.match_request(&post).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("mta-wall-v1").await.unwrap();

        cache.put(&request("/"), &response("/", "old")).await.unwrap();
        cache.put(&request("/"), &response("/", "new")).await.unwrap();

        let stored = cache.match_request(&request("/")).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"new"));
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_caches_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = db.open_cache("mta-wall-v1").await.unwrap();
        let v2 = db.open_cache("mta-wall-v2").await.unwrap();

        v1.put(&request("/"), &response("/", "v1")).await.unwrap();

        assert!(v2.match_request(&request("/")).await.unwrap().is_none());
        assert!(v2.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_put_all_and_keys() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("mta-wall-v1").await.unwrap();

        let entries: Vec<_> = ["/", "/mobile", "/icon.svg"]
            .iter()
            .map(|p| (request(p), response(p, "asset")))
            .collect();
        cache.put_all(&entries).await.unwrap();

        let keys: Vec<String> = cache.keys().await.unwrap().iter().map(|r| r.url().path().to_string()).collect();
        assert_eq!(keys, vec!["/", "/mobile", "/icon.svg"]);
        assert_eq!(cache.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_cache_drops_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("mta-wall-v1").await.unwrap();
        cache.put(&request("/"), &response("/", "x")).await.unwrap();

        db.delete_cache("mta-wall-v1").await.unwrap();

        assert!(cache.match_request(&request("/")).await.unwrap().is_none());
        assert!(cache.put(&request("/"), &response("/", "x")).await.is_err());
    }

    #[tokio::test]
    async fn test_put_all_into_deleted_cache_stores_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("mta-wall-v1").await.unwrap();
        db.delete_cache("mta-wall-v1").await.unwrap();

        let entries = vec![(request("/"), response("/", "x"))];
        assert!(cache.put_all(&entries).await.is_err());

        let reopened = db.open_cache("mta-wall-v1").await.unwrap();
        assert!(reopened.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("mta-wall-v1").await.unwrap();
        cache.put(&request("/mobile"), &response("/mobile", "x")).await.unwrap();

        assert!(cache.delete(&request("/mobile")).await.unwrap());
        assert!(!cache.delete(&request("/mobile")).await.unwrap());
    }
}
