use sqlx::SqlitePool;
use uuid::Uuid;

use super::now_rfc3339;

/// Action ledger: one row per run, one row per action taken during it.
pub struct Runs {
    pool: SqlitePool,
}

impl Runs {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Runs { pool }
    }

    pub async fn start(&self) -> anyhow::Result<String> {
        let run_id = Uuid::now_v7().to_string();
        sqlx::query(
            "INSERT INTO runs (run_id, started_at, ended_at, outcome, counters_json)
             VALUES (?, ?, NULL, 'running', '{}')",
        )
        .bind(&run_id)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(run_id)
    }

    pub async fn finish(
        &self,
        run_id: &str,
        outcome: &str,
        counters: &serde_json::Value,
    ) -> anyhow::Result<()> {
        let outcome = if outcome.trim().is_empty() {
            "unknown"
        } else {
            outcome
        };
        sqlx::query("UPDATE runs SET ended_at = ?, outcome = ?, counters_json = ? WHERE run_id = ?")
            .bind(now_rfc3339())
            .bind(outcome)
            .bind(counters.to_string())
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn record_action(
        &self,
        run_id: &str,
        kind: &str,
        target: &str,
        detail: &serde_json::Value,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO actions (id, run_id, kind, target, detail_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(run_id)
        .bind(kind)
        .bind(target)
        .bind(detail.to_string())
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn outcome(&self, run_id: &str) -> anyhow::Result<Option<(String, String)>> {
        Ok(
            sqlx::query_as("SELECT outcome, counters_json FROM runs WHERE run_id = ?")
                .bind(run_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn actions_for(&self, run_id: &str) -> anyhow::Result<Vec<(String, String)>> {
        Ok(sqlx::query_as(
            "SELECT kind, target FROM actions WHERE run_id = ? ORDER BY created_at, id",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
