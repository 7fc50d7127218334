//! Directed follow graph over users.
//!
//! One edge table keyed by `(follower_id, following_id)`; each direction is
//! read with its own indexed query.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{FollowEdge, UserRef};
use crate::error::{AppError, AppResult};
use crate::identity;

pub fn find_edge(
    conn: &Connection,
    follower_id: i64,
    following_id: i64,
) -> AppResult<Option<FollowEdge>> {
    let edge = conn
        .query_row(
            "SELECT follower_id, following_id, created_at FROM follows
             WHERE follower_id = ?1 AND following_id = ?2",
            params![follower_id, following_id],
            |row| {
                Ok(FollowEdge {
                    follower_id: row.get(0)?,
                    following_id: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(edge)
}

/// Whether `follower_id` follows `following_id`. Asking about a self-edge is
/// an invalid operation.
pub fn is_following(conn: &Connection, follower_id: i64, following_id: i64) -> AppResult<bool> {
    if follower_id == following_id {
        return Err(AppError::BadRequest("Cannot follow yourself".into()));
    }
    Ok(find_edge(conn, follower_id, following_id)?.is_some())
}

pub fn follow(conn: &Connection, follower_id: i64, following_id: i64) -> AppResult<()> {
    if identity::find_by_id(conn, following_id)?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }
    if is_following(conn, follower_id, following_id)? {
        return Err(AppError::Conflict("Already following this user".into()));
    }
    insert_edge(conn, follower_id, following_id)
}

/// Insert the edge. A concurrent duplicate caught by the primary key surfaces
/// as `Conflict`, same as the check in [`follow`].
pub fn insert_edge(conn: &Connection, follower_id: i64, following_id: i64) -> AppResult<()> {
    match conn.execute(
        "INSERT INTO follows (follower_id, following_id) VALUES (?1, ?2)",
        params![follower_id, following_id],
    ) {
        Ok(_) => Ok(()),
        Err(e) if AppError::is_constraint_violation(&e) => {
            Err(AppError::Conflict("Already following this user".into()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn unfollow(conn: &Connection, follower_id: i64, following_id: i64) -> AppResult<()> {
    if !is_following(conn, follower_id, following_id)? {
        return Err(AppError::NotFound("Not following this user".into()));
    }

    let removed = conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
        params![follower_id, following_id],
    )?;
    if removed == 0 {
        return Err(AppError::NotFound("Not following this user".into()));
    }
    Ok(())
}

/// Users that `user_id` follows.
pub fn following_of(conn: &Connection, user_id: i64) -> AppResult<Vec<UserRef>> {
    query_refs(
        conn,
        "SELECT u.id, u.name FROM follows f
         JOIN users u ON u.id = f.following_id
         WHERE f.follower_id = ?1
         ORDER BY u.id",
        user_id,
    )
}

/// Users following `user_id`.
pub fn followers_of(conn: &Connection, user_id: i64) -> AppResult<Vec<UserRef>> {
    query_refs(
        conn,
        "SELECT u.id, u.name FROM follows f
         JOIN users u ON u.id = f.follower_id
         WHERE f.following_id = ?1
         ORDER BY u.id",
        user_id,
    )
}

fn query_refs(conn: &Connection, sql: &str, user_id: i64) -> AppResult<Vec<UserRef>> {
    let mut stmt = conn.prepare(sql)?;
    let refs = stmt
        .query_map(params![user_id], |row| {
            Ok(UserRef {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(refs)
}
