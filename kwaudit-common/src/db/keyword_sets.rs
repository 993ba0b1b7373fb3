//! Saved keyword presets

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

/// Named keyword list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSet {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Trimmed, non-empty keywords in their original order
pub fn clean_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn list_keyword_sets(pool: &SqlitePool) -> Result<Vec<KeywordSet>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT name, keywords FROM keyword_sets ORDER BY name")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(name, keywords)| -> Result<KeywordSet> {
            Ok(KeywordSet {
                name,
                keywords: serde_json::from_str(&keywords)?,
            })
        })
        .collect()
}

pub async fn get_keyword_set(pool: &SqlitePool, name: &str) -> Result<Option<KeywordSet>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT name, keywords FROM keyword_sets WHERE name = ?")
            .bind(name.trim())
            .fetch_optional(pool)
            .await?;

    row.map(|(name, keywords)| -> Result<KeywordSet> {
        Ok(KeywordSet {
            name,
            keywords: serde_json::from_str(&keywords)?,
        })
    })
    .transpose()
}

/// Create or overwrite the set with this (trimmed) name
pub async fn save_keyword_set(
    pool: &SqlitePool,
    name: &str,
    keywords: &[String],
) -> Result<KeywordSet> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Keyword set name is required".to_string()));
    }

    let keywords = clean_keywords(keywords);
    sqlx::query(
        r#"
        INSERT INTO keyword_sets (name, keywords) VALUES (?, ?)
        ON CONFLICT(name) DO UPDATE SET
            keywords = excluded.keywords,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(name)
    .bind(serde_json::to_string(&keywords)?)
    .execute(pool)
    .await?;

    info!("Saved keyword set '{}' ({} keywords)", name, keywords.len());
    Ok(KeywordSet {
        name: name.to_string(),
        keywords,
    })
}

/// Returns whether a set was removed
pub async fn delete_keyword_set(pool: &SqlitePool, name: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM keyword_sets WHERE name = ?")
        .bind(name.trim())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
