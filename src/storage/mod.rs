mod runs;
mod sessions;

pub use runs::Runs;
pub use sessions::{SavedSession, Sessions};

use std::path::Path;

use anyhow::Context;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use time::format_description::well_known::Rfc3339;

pub struct Repositories {
    pub sessions: Sessions,
    pub runs: Runs,
}

impl Repositories {
    pub fn new(pool: SqlitePool) -> Self {
        Repositories {
            sessions: Sessions::new(pool.clone()),
            runs: Runs::new(pool),
        }
    }
}

pub async fn open(path: &str) -> anyhow::Result<SqlitePool> {
    let path = path.trim();
    if path.is_empty() {
        anyhow::bail!("storage: sqlite path is required");
    }

    // A missing parent directory surfaces as a confusing CANTOPEN otherwise.
    if let Some(dir) = Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("storage: create sqlite dir {}", dir.display()))?;
        }
    }

    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(opts)
        .await
        .context("storage: open sqlite")?;
    migrate(&pool).await?;
    Ok(pool)
}

/// In-memory database, single connection so every query sees the same db.
pub async fn open_in_memory() -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::new().in_memory(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .context("storage: open in-memory sqlite")?;
    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sessions (
            key TEXT PRIMARY KEY,
            cookies_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_used_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS runs (
            run_id TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            outcome TEXT NOT NULL,
            counters_json TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS actions (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            target TEXT NOT NULL,
            detail_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_upsert_get_touch_delete() {
        let repos = Repositories::new(open_in_memory().await.unwrap());

        assert!(repos.sessions.get("k1").await.unwrap().is_none());

        repos.sessions.upsert("k1", "  ").await.unwrap_err();
        repos.sessions.upsert("", "[]").await.unwrap_err();
        repos.sessions.upsert("k1", r#"[{"name":"a","value":"1"}]"#).await.unwrap();

        let s = repos.sessions.get("k1").await.unwrap().unwrap();
        assert_eq!(s.key, "k1");
        assert!(s.cookies_json.contains(r#""value":"1""#));
        assert_eq!(s.created_at, s.last_used_at);

        // upsert keeps the row, replaces the blob
        repos.sessions.upsert("k1", r#"[{"name":"a","value":"2"}]"#).await.unwrap();
        let s = repos.sessions.get("k1").await.unwrap().unwrap();
        assert!(s.cookies_json.contains(r#""value":"2""#));

        repos.sessions.touch("k1").await.unwrap();
        repos.sessions.delete("k1").await.unwrap();
        assert!(repos.sessions.get("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn runs_and_actions_are_recorded() {
        let repos = Repositories::new(open_in_memory().await.unwrap());

        let run_id = repos.runs.start().await.unwrap();
        repos
            .runs
            .record_action(&run_id, "login", "demo", &serde_json::json!({}))
            .await
            .unwrap();
        repos
            .runs
            .record_action(&run_id, "connect", "p1", &serde_json::json!({"outcome": "sent"}))
            .await
            .unwrap();
        repos
            .runs
            .finish(&run_id, "ok", &serde_json::json!({"requests": 1}))
            .await
            .unwrap();

        let (outcome, counters) = repos.runs.outcome(&run_id).await.unwrap().unwrap();
        assert_eq!(outcome, "ok");
        assert!(counters.contains("requests"));

        let actions = repos.runs.actions_for(&run_id).await.unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], ("login".to_owned(), "demo".to_owned()));
        assert_eq!(actions[1], ("connect".to_owned(), "p1".to_owned()));
    }
}
