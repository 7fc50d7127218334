//! Media rows. The bytes themselves live in the [`crate::storage`] blob store
//! under `link`.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::db::models::Media;
use crate::error::AppResult;

fn map_media(row: &rusqlite::Row<'_>) -> rusqlite::Result<Media> {
    Ok(Media {
        id: row.get(0)?,
        link: row.get(1)?,
        tweet_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn insert_media(conn: &Connection, link: &str) -> AppResult<i64> {
    conn.execute("INSERT INTO media (link) VALUES (?1)", params![link])?;
    Ok(conn.last_insert_rowid())
}

/// Media rows among `ids` that no tweet has claimed yet.
pub fn find_unattached(conn: &Connection, ids: &[i64]) -> AppResult<Vec<Media>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT id, link, tweet_id, created_at FROM media
         WHERE tweet_id IS NULL AND id IN ({placeholders})
         ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let media = stmt
        .query_map(params_from_iter(ids.iter()), map_media)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(media)
}

pub fn attach_to_tweet(conn: &Connection, media_id: i64, tweet_id: i64) -> AppResult<()> {
    conn.execute(
        "UPDATE media SET tweet_id = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![tweet_id, media_id],
    )?;
    Ok(())
}

pub fn attachments_of(conn: &Connection, tweet_id: i64) -> AppResult<Vec<Media>> {
    let mut stmt = conn.prepare(
        "SELECT id, link, tweet_id, created_at FROM media WHERE tweet_id = ?1 ORDER BY id",
    )?;
    let media = stmt
        .query_map(params![tweet_id], map_media)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(media)
}

pub fn find_by_link(conn: &Connection, link: &str) -> AppResult<Option<Media>> {
    let media = conn
        .query_row(
            "SELECT id, link, tweet_id, created_at FROM media WHERE link = ?1",
            params![link],
            map_media,
        )
        .optional()?;
    Ok(media)
}
