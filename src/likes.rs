use rusqlite::{params, Connection};

use crate::db::models::Like;
use crate::error::{AppError, AppResult};

pub fn like_exists(conn: &Connection, user_id: i64, tweet_id: i64) -> AppResult<bool> {
    let exists = conn.query_row(
        "SELECT COUNT(*) > 0 FROM likes WHERE user_id = ?1 AND tweet_id = ?2",
        params![user_id, tweet_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert a like. A concurrent duplicate caught by the UNIQUE index surfaces
/// as `Conflict`, same as the application-level check.
pub fn insert_like(conn: &Connection, user_id: i64, tweet_id: i64) -> AppResult<i64> {
    match conn.execute(
        "INSERT INTO likes (user_id, tweet_id) VALUES (?1, ?2)",
        params![user_id, tweet_id],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if AppError::is_constraint_violation(&e) => {
            Err(AppError::Conflict("Tweet already liked".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Returns whether a like was removed.
pub fn delete_like(conn: &Connection, user_id: i64, tweet_id: i64) -> AppResult<bool> {
    let removed = conn.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND tweet_id = ?2",
        params![user_id, tweet_id],
    )?;
    Ok(removed > 0)
}

pub fn likes_of(conn: &Connection, tweet_id: i64) -> AppResult<Vec<Like>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, tweet_id, created_at FROM likes
         WHERE tweet_id = ?1 ORDER BY id",
    )?;
    let likes = stmt
        .query_map(params![tweet_id], |row| {
            Ok(Like {
                id: row.get(0)?,
                user_id: row.get(1)?,
                tweet_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(likes)
}
