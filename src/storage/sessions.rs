use anyhow::ensure;
use sqlx::SqlitePool;

use super::now_rfc3339;

/// A persisted automation session: the cookie blob for one
/// (base URL, username) pair.
#[derive(Debug, Clone)]
pub struct SavedSession {
    pub key: String,
    pub cookies_json: String,
    pub created_at: String,
    pub last_used_at: String,
}

pub struct Sessions {
    pool: SqlitePool,
}

impl Sessions {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Sessions { pool }
    }

    pub async fn upsert(&self, key: &str, cookies_json: &str) -> anyhow::Result<()> {
        ensure!(!key.trim().is_empty(), "storage: session key is required");
        ensure!(
            !cookies_json.trim().is_empty(),
            "storage: session cookies are required"
        );

        let now = now_rfc3339();
        sqlx::query(
            "INSERT INTO sessions (key, cookies_json, created_at, last_used_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                 cookies_json = excluded.cookies_json,
                 last_used_at = excluded.last_used_at",
        )
        .bind(key)
        .bind(cookies_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<SavedSession>> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT key, cookies_json, created_at, last_used_at FROM sessions WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(key, cookies_json, created_at, last_used_at)| SavedSession {
                key,
                cookies_json,
                created_at,
                last_used_at,
            },
        ))
    }

    pub async fn touch(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE sessions SET last_used_at = ? WHERE key = ?")
            .bind(now_rfc3339())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
