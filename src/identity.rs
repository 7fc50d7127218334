//! Identity resolution: API key or user id to a user with both follow
//! directions loaded.

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::config::SeedUser;
use crate::db::models::{User, UserRef};
use crate::error::{AppError, AppResult};
use crate::graph;

/// A user together with its follow edges, resolved in explicit queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub followers: Vec<UserRef>,
    pub following: Vec<UserRef>,
}

impl Profile {
    /// The user's own id followed by every followee id.
    pub fn visible_author_ids(&self) -> Vec<i64> {
        std::iter::once(self.id)
            .chain(self.following.iter().map(|u| u.id))
            .collect()
    }
}

/// Resolve the user owning `api_key`.
pub fn resolve(conn: &Connection, api_key: &str) -> AppResult<Profile> {
    let user = find_by_api_key(conn, api_key)?.ok_or(AppError::Unauthorized)?;
    with_graph(conn, user)
}

/// Resolve an arbitrary user for profile viewing.
pub fn resolve_by_id(conn: &Connection, user_id: i64) -> AppResult<Profile> {
    let user = find_by_id(conn, user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    with_graph(conn, user)
}

fn with_graph(conn: &Connection, user: User) -> AppResult<Profile> {
    Ok(Profile {
        followers: graph::followers_of(conn, user.id)?,
        following: graph::following_of(conn, user.id)?,
        id: user.id,
        name: user.name,
    })
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        api_key: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub fn find_by_api_key(conn: &Connection, api_key: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, api_key, created_at, updated_at FROM users WHERE api_key = ?1",
            params![api_key],
            map_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_id(conn: &Connection, user_id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, api_key, created_at, updated_at FROM users WHERE id = ?1",
            params![user_id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// Insert a user and return its id. Fails with `Conflict` if the key is taken.
pub fn create_user(conn: &Connection, name: &str, api_key: &str) -> AppResult<i64> {
    match conn.execute(
        "INSERT INTO users (name, api_key) VALUES (?1, ?2)",
        params![name, api_key],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if AppError::is_constraint_violation(&e) => {
            Err(AppError::Conflict("API key already in use".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Create configured users whose API key is not registered yet.
/// Returns the number of users created.
pub fn seed_users(conn: &Connection, users: &[SeedUser]) -> AppResult<usize> {
    let mut created = 0;
    for seed in users {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (name, api_key) VALUES (?1, ?2)",
            params![seed.name, seed.api_key],
        )?;
        if inserted > 0 {
            tracing::info!(name = %seed.name, "Seeded user");
            created += 1;
        }
    }
    Ok(created)
}

/// Generate a random 32-byte hex API key.
pub fn generate_api_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
