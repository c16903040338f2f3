// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL-tagged archive of admitted content, keyed by SHA-256.

use chrono::{DateTime, SecondsFormat, Utc};
use mneme_core::MnemeError;
use mneme_storage::{Database, map_tr_err};
use rusqlite::{OptionalExtension, params};

/// One archived piece of admitted content.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub content_hash: String,
    pub content: String,
    pub tag: String,
    pub source_kind: String,
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Timestamps are stored as fixed-width RFC 3339 so text comparison orders them.
fn to_sql_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_sql_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Content archive backed by the `content_archive` table.
#[derive(Clone)]
pub struct ContentArchive {
    db: Database,
}

impl ContentArchive {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Whether `hash` is archived and has not expired at `now`.
    ///
    /// An entry expires strictly after its `expires_at` instant.
    pub async fn contains_unexpired(
        &self,
        hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, MnemeError> {
        let hash = hash.to_string();
        let now = to_sql_time(now);
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let found: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM content_archive WHERE content_hash = ?1 AND expires_at >= ?2",
                        params![hash, now],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(found.is_some())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Insert an entry, replacing any expired entry with the same hash.
    pub async fn insert(&self, entry: &ArchiveEntry) -> Result<(), MnemeError> {
        let entry = entry.clone();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO content_archive \
                     (content_hash, content, tag, source_kind, origin, created_at, expires_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        entry.content_hash,
                        entry.content,
                        entry.tag,
                        entry.source_kind,
                        entry.origin,
                        to_sql_time(entry.created_at),
                        to_sql_time(entry.expires_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn get(&self, hash: &str) -> Result<Option<ArchiveEntry>, MnemeError> {
        let hash = hash.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<ArchiveEntry>, rusqlite::Error> {
                conn.query_row(
                    "SELECT content_hash, content, tag, source_kind, origin, created_at, expires_at \
                     FROM content_archive WHERE content_hash = ?1",
                    params![hash],
                    |row| {
                        let created: String = row.get(5)?;
                        let expires: String = row.get(6)?;
                        Ok(ArchiveEntry {
                            content_hash: row.get(0)?,
                            content: row.get(1)?,
                            tag: row.get(2)?,
                            source_kind: row.get(3)?,
                            origin: row.get(4)?,
                            created_at: from_sql_time(&created),
                            expires_at: from_sql_time(&expires),
                        })
                    },
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Remove one entry. Returns whether it existed.
    pub async fn remove(&self, hash: &str) -> Result<bool, MnemeError> {
        let hash = hash.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let n = conn.execute(
                    "DELETE FROM content_archive WHERE content_hash = ?1",
                    params![hash],
                )?;
                Ok(n > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Delete every entry expired at `now`, returning how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, MnemeError> {
        let now = to_sql_time(now);
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM content_archive WHERE expires_at < ?1",
                    params![now],
                )
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn count(&self) -> Result<usize, MnemeError> {
        self.db
            .connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                let n: i64 =
                    conn.query_row("SELECT COUNT(*) FROM content_archive", [], |row| row.get(0))?;
                Ok(n as usize)
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap()
    }

    fn entry(hash: &str, expires_in_days: i64) -> ArchiveEntry {
        ArchiveEntry {
            content_hash: hash.to_string(),
            content: format!("content for {hash}"),
            tag: "websearch".to_string(),
            source_kind: "web".to_string(),
            origin: Some("https://example.org/tea".to_string()),
            created_at: t0(),
            expires_at: t0() + Duration::days(expires_in_days),
        }
    }

    async fn archive() -> ContentArchive {
        ContentArchive::new(Database::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn insert_then_get_roundtrip() {
        let archive = archive().await;
        let e = entry("abc", 14);
        archive.insert(&e).await.unwrap();
        assert_eq!(archive.get("abc").await.unwrap(), Some(e));
        assert_eq!(archive.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_not_live() {
        let archive = archive().await;
        archive.insert(&entry("abc", 14)).await.unwrap();

        assert!(archive.contains_unexpired("abc", t0()).await.unwrap());
        assert!(
            archive
                .contains_unexpired("abc", t0() + Duration::days(14))
                .await
                .unwrap()
        );
        assert!(
            !archive
                .contains_unexpired("abc", t0() + Duration::days(14) + Duration::seconds(1))
                .await
                .unwrap()
        );
        assert!(!archive.contains_unexpired("other", t0()).await.unwrap());
    }

    #[tokio::test]
    async fn insert_replaces_expired_entry() {
        let archive = archive().await;
        archive.insert(&entry("abc", 1)).await.unwrap();
        let mut renewed = entry("abc", 30);
        renewed.tag = "docs".to_string();
        archive.insert(&renewed).await.unwrap();

        assert_eq!(archive.count().await.unwrap(), 1);
        assert_eq!(archive.get("abc").await.unwrap().unwrap().tag, "docs");
    }

    #[tokio::test]
    async fn purge_removes_only_expired() {
        let archive = archive().await;
        archive.insert(&entry("short", 1)).await.unwrap();
        archive.insert(&entry("long", 30)).await.unwrap();

        let purged = archive
            .purge_expired(t0() + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(archive.get("short").await.unwrap().is_none());
        assert!(archive.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remove_reports_existence() {
        let archive = archive().await;
        archive.insert(&entry("abc", 14)).await.unwrap();
        assert!(archive.remove("abc").await.unwrap());
        assert!(!archive.remove("abc").await.unwrap());
    }
}
