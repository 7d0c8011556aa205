//! `CacheStore` implementation for the SQLite database.

use std::collections::BTreeMap;

use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::hash::{VaryValues, compute_cache_key, vary_matches, vary_values};
use super::{CacheStore, MatchScope};
use crate::Error;
use crate::http::{CacheRequest, CachedResponse};

/// An entry prepared for insertion, with its key and JSON columns computed.
struct EncodedEntry {
    key_hash: String,
    method: String,
    url: String,
    request_headers_json: String,
    vary_json: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    response_url: String,
}

fn encode_entry(request: &CacheRequest, response: &CachedResponse) -> Result<EncodedEntry, Error> {
    if !request.is_get() {
        return Err(Error::InvalidInput(format!("cannot cache {} request for {}", request.method, request.url)));
    }
    if response.status == 206 {
        return Err(Error::InvalidInput(format!("cannot cache partial response for {}", request.url)));
    }

    let vary = vary_values(request, &response.vary());
    Ok(EncodedEntry {
        key_hash: compute_cache_key(&request.method, &request.url, &vary),
        method: request.method.clone(),
        url: request.url.clone(),
        request_headers_json: serde_json::to_string(&request.headers)?,
        vary_json: serde_json::to_string(&vary)?,
        status: response.status,
        status_text: response.status_text.clone(),
        headers_json: serde_json::to_string(&response.headers)?,
        body: response.body.to_vec(),
        response_url: response.url.clone(),
    })
}

fn ensure_bucket(conn: &rusqlite::Connection, name: &str) -> Result<i64, Error> {
    conn.execute(
        "INSERT INTO buckets (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    let id = conn.query_row("SELECT id FROM buckets WHERE name = ?1", params![name], |row| row.get(0))?;
    Ok(id)
}

fn insert_entry(conn: &rusqlite::Connection, bucket_id: i64, entry: &EncodedEntry, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO entries (
            bucket_id, key_hash, method, url, request_headers_json, vary_json,
            status, status_text, headers_json, body, response_url, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(bucket_id, key_hash) DO UPDATE SET
            request_headers_json = excluded.request_headers_json,
            vary_json = excluded.vary_json,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            response_url = excluded.response_url,
            stored_at = excluded.stored_at",
        params![
            bucket_id,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            &entry.request_headers_json,
            &entry.vary_json,
            entry.status,
            &entry.status_text,
            &entry.headers_json,
            &entry.body,
            &entry.response_url,
            now,
        ],
    )?;
    Ok(())
}

#[async_trait::async_trait]
impl CacheStore for CacheDb {
    async fn open_bucket(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_bucket(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn has_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn put_entry(&self, bucket: &str, request: &CacheRequest, response: &CachedResponse) -> Result<(), Error> {
        let entry = encode_entry(request, response)?;
        let bucket = bucket.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                let bucket_id = ensure_bucket(&tx, &bucket)?;
                insert_entry(&tx, bucket_id, &entry, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn replace_entries(&self, bucket: &str, entries: Vec<(CacheRequest, CachedResponse)>) -> Result<(), Error> {
        let encoded = entries
            .iter()
            .map(|(req, resp)| encode_entry(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let bucket = bucket.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                let bucket_id = ensure_bucket(&tx, &bucket)?;
                tx.execute("DELETE FROM entries WHERE bucket_id = ?1", params![bucket_id])?;
                for entry in &encoded {
                    insert_entry(&tx, bucket_id, entry, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_entry(
        &self, scope: MatchScope<'_>, request: &CacheRequest,
    ) -> Result<Option<CachedResponse>, Error> {
        let request = request.clone();
        let bucket = match scope {
            MatchScope::AllBuckets => None,
            MatchScope::Bucket(name) => Some(name.to_string()),
        };
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.vary_json, e.status, e.status_text, e.headers_json, e.body, e.response_url
                    FROM entries e JOIN buckets b ON b.id = e.bucket_id
                    WHERE e.method = ?1 AND e.url = ?2 AND (?3 IS NULL OR b.name = ?3)
                    ORDER BY b.id ASC, e.rowid ASC",
                )?;
                let mut rows = stmt.query(params![&request.method, &request.url, &bucket])?;

                while let Some(row) = rows.next()? {
                    let vary: VaryValues = serde_json::from_str(&row.get::<_, String>(0)?)?;
                    if !vary_matches(&vary, &request) {
                        continue;
                    }
                    let headers: BTreeMap<String, String> = serde_json::from_str(&row.get::<_, String>(3)?)?;
                    return Ok(Some(CachedResponse {
                        status: row.get(1)?,
                        status_text: row.get(2)?,
                        headers,
                        body: Bytes::from(row.get::<_, Vec<u8>>(4)?),
                        url: row.get(5)?,
                    }));
                }

                Ok(None)
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_keys(&self, bucket: &str) -> Result<Vec<CacheRequest>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheRequest>, Error> {
                let bucket_id: Option<i64> = match conn.query_row(
                    "SELECT id FROM buckets WHERE name = ?1",
                    params![&bucket],
                    |row| row.get(0),
                ) {
                    Ok(id) => Some(id),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                };
                let bucket_id = bucket_id.ok_or_else(|| Error::CacheMiss(bucket.clone()))?;

                let mut stmt = conn.prepare(
                    "SELECT method, url, request_headers_json FROM entries WHERE bucket_id = ?1 ORDER BY rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![bucket_id], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(method, url, headers_json)| -> Result<CacheRequest, Error> {
                        Ok(CacheRequest { method, url, headers: serde_json::from_str(&headers_json)? })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }
}
