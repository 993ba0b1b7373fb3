//! IDs of the current audit's results
//!
//! Only identifiers are durable; result payloads live in memory.

use crate::Result;
use sqlx::SqlitePool;

/// Replace the stored list with `ids`, keeping their order
pub async fn replace_result_ids(pool: &SqlitePool, ids: &[String]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM audit_result_ids")
        .execute(&mut *tx)
        .await?;

    for (position, id) in ids.iter().enumerate() {
        sqlx::query("INSERT OR IGNORE INTO audit_result_ids (result_id, position) VALUES (?, ?)")
            .bind(id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn load_result_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let ids: Vec<(String,)> =
        sqlx::query_as("SELECT result_id FROM audit_result_ids ORDER BY position")
            .fetch_all(pool)
            .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

pub async fn clear_result_ids(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM audit_result_ids")
        .execute(pool)
        .await?;
    Ok(())
}
