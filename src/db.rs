//! SQLite persistence for scraped posts.
use crate::model::PostRecord;
use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/`, ask SQLite to
/// create the file and make sure its parent directory exists. In-memory URLs
/// pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let query = match query_part {
        Some(q) if q.contains("mode=") => q.to_string(),
        Some(q) => format!("{q}&mode=rwc"),
        None => "mode=rwc".to_string(),
    };
    format!("sqlite://{expanded_path}?{query}")
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Insert or overwrite posts keyed by `post_id`, in one transaction.
#[instrument(skip_all, fields(count = posts.len()))]
pub async fn upsert_posts(pool: &Pool, posts: &[PostRecord]) -> Result<()> {
    if posts.is_empty() {
        return Ok(());
    }
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    for post in posts {
        sqlx::query(
            "INSERT INTO posts (post_id, text_content, is_repost, first_seen_at, updated_at) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(post_id) DO UPDATE SET text_content = excluded.text_content, is_repost = excluded.is_repost, updated_at = excluded.updated_at",
        )
        .bind(&post.post_id)
        .bind(&post.text_content)
        .bind(post.is_repost)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Every stored post, in insertion order.
#[instrument(skip_all)]
pub async fn list_posts(pool: &Pool) -> Result<Vec<PostRecord>> {
    let rows = sqlx::query("SELECT post_id, text_content, is_repost FROM posts ORDER BY rowid ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| PostRecord {
            post_id: row.get("post_id"),
            text_content: row.get("text_content"),
            is_repost: row.get("is_repost"),
        })
        .collect())
}

#[instrument(skip_all)]
pub async fn count_posts(pool: &Pool) -> Result<i64> {
    let cnt: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    Ok(cnt)
}
