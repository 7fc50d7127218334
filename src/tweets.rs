use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::Tweet;
use crate::error::AppResult;

/// Upper bound on tweet content, in characters.
pub const MAX_CONTENT_CHARS: usize = 2500;

pub fn insert_tweet(conn: &Connection, author_id: i64, content: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO tweets (author_id, content) VALUES (?1, ?2)",
        params![author_id, content],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn tweet_exists(conn: &Connection, tweet_id: i64) -> AppResult<bool> {
    let exists = conn.query_row(
        "SELECT COUNT(*) > 0 FROM tweets WHERE id = ?1",
        params![tweet_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Load a tweet only if `author_id` wrote it.
pub fn find_owned_tweet(
    conn: &Connection,
    tweet_id: i64,
    author_id: i64,
) -> AppResult<Option<Tweet>> {
    let tweet = conn
        .query_row(
            "SELECT id, author_id, content, created_at, updated_at FROM tweets
             WHERE id = ?1 AND author_id = ?2",
            params![tweet_id, author_id],
            |row| {
                Ok(Tweet {
                    id: row.get(0)?,
                    author_id: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(tweet)
}

/// Delete a tweet row; likes and media rows go with it via `ON DELETE CASCADE`.
pub fn delete_tweet_row(conn: &Connection, tweet_id: i64) -> AppResult<bool> {
    let removed = conn.execute("DELETE FROM tweets WHERE id = ?1", params![tweet_id])?;
    Ok(removed > 0)
}
