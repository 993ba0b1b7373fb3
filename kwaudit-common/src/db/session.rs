//! Persisted signed-in identity

use crate::session::Session;
use crate::Result;
use sqlx::SqlitePool;

pub async fn save_session(pool: &SqlitePool, session: &Session) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO session (id, name, email, token_expiry, token) VALUES (1, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            email = excluded.email,
            token_expiry = excluded.token_expiry,
            token = excluded.token,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&session.name)
    .bind(&session.email)
    .bind(session.token_expiry)
    .bind(&session.token)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_session(pool: &SqlitePool) -> Result<Option<Session>> {
    let row: Option<(String, String, i64, String)> =
        sqlx::query_as("SELECT name, email, token_expiry, token FROM session WHERE id = 1")
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(name, email, token_expiry, token)| Session {
        name,
        email,
        token_expiry,
        token,
    }))
}

/// Forget name, email, expiry and token together
pub async fn clear_session(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM session").execute(pool).await?;
    Ok(())
}
