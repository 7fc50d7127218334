//! Write paths. Each operation checks ownership and follow-graph rules against
//! the connection it is given, which callers hold inside a single
//! [`crate::db::transaction`]. [`upload_media`] opens its own, since blob
//! cleanup depends on whether it commits.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{self, Profile};
use crate::state::DbPool;
use crate::storage::{generate_blob_name, BlobError, BlobStore};
use crate::{db, graph, likes, media, tweets};

/// What to do when an attachment blob cannot be removed during a tweet delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobCleanup {
    /// Log and keep going; the row delete still commits.
    BestEffort,
    /// Fail the delete so the transaction rolls back.
    Strict,
}

impl BlobCleanup {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            BlobCleanup::Strict
        } else {
            BlobCleanup::BestEffort
        }
    }
}

fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Tweet content cannot be empty".into()));
    }
    if content.chars().count() > tweets::MAX_CONTENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Tweet content must be {} characters or less",
            tweets::MAX_CONTENT_CHARS
        )));
    }
    Ok(())
}

/// Create a tweet and claim the referenced media. Returns the tweet id.
pub fn post_tweet(
    conn: &Connection,
    user: &Profile,
    content: &str,
    media_ids: &[i64],
) -> AppResult<i64> {
    validate_content(content)?;
    let tweet_id = tweets::insert_tweet(conn, user.id, content)?;

    if !media_ids.is_empty() {
        let found = media::find_unattached(conn, media_ids)?;
        if found.len() != media_ids.len() {
            debug!(
                requested = media_ids.len(),
                found = found.len(),
                "Rejected tweet with unknown media"
            );
            return Err(AppError::BadRequest("Some media not found".into()));
        }
        for item in &found {
            media::attach_to_tweet(conn, item.id, tweet_id)?;
        }
    }

    info!(user_id = user.id, tweet_id, media = media_ids.len(), "Tweet posted");
    Ok(tweet_id)
}

/// Delete a tweet written by `user`, removing its attachment blobs first.
///
/// A tweet that does not exist and a tweet owned by someone else are both
/// reported as `Forbidden`.
pub fn delete_tweet(
    conn: &Connection,
    blobs: &dyn BlobStore,
    cleanup: BlobCleanup,
    user: &Profile,
    tweet_id: i64,
) -> AppResult<()> {
    let tweet = tweets::find_owned_tweet(conn, tweet_id, user.id)?.ok_or_else(|| {
        AppError::Forbidden("You do not have permission to perform this operation".into())
    })?;

    for attachment in media::attachments_of(conn, tweet.id)? {
        match blobs.delete(&attachment.link) {
            Ok(()) => {}
            Err(BlobError::NotFound(_)) => {
                debug!(link = %attachment.link, "Attachment blob already gone");
            }
            Err(e) if cleanup == BlobCleanup::Strict => return Err(e.into()),
            Err(e) => {
                warn!(link = %attachment.link, error = %e, "Failed to remove attachment blob");
            }
        }
    }

    tweets::delete_tweet_row(conn, tweet.id)?;
    info!(user_id = user.id, tweet_id, "Tweet deleted");
    Ok(())
}

pub fn set_like(conn: &Connection, user: &Profile, tweet_id: i64) -> AppResult<()> {
    if !tweets::tweet_exists(conn, tweet_id)? {
        return Err(AppError::NotFound("Tweet not found".into()));
    }
    if likes::like_exists(conn, user.id, tweet_id)? {
        return Err(AppError::Conflict("Tweet already liked".into()));
    }
    likes::insert_like(conn, user.id, tweet_id)?;
    info!(user_id = user.id, tweet_id, "Tweet liked");
    Ok(())
}

pub fn unset_like(conn: &Connection, user: &Profile, tweet_id: i64) -> AppResult<()> {
    if !likes::delete_like(conn, user.id, tweet_id)? {
        return Err(AppError::NotFound("Like not found".into()));
    }
    info!(user_id = user.id, tweet_id, "Tweet unliked");
    Ok(())
}

pub fn follow(conn: &Connection, user: &Profile, target_id: i64) -> AppResult<()> {
    graph::follow(conn, user.id, target_id)?;
    info!(follower_id = user.id, following_id = target_id, "Followed user");
    Ok(())
}

pub fn unfollow(conn: &Connection, user: &Profile, target_id: i64) -> AppResult<()> {
    graph::unfollow(conn, user.id, target_id)?;
    info!(follower_id = user.id, following_id = target_id, "Unfollowed user");
    Ok(())
}

/// Write a blob under `link` and register its Media row. Returns the media id.
/// Leaves the blob in place on failure; see [`upload_media`].
pub fn store_media(
    conn: &Connection,
    blobs: &dyn BlobStore,
    link: &str,
    data: &[u8],
) -> AppResult<i64> {
    blobs.put(link, data)?;
    media::insert_media(conn, link)
}

/// Upload path for one file: resolve the caller, store the blob and insert
/// the Media row in a single write transaction. If the transaction does not
/// commit, the blob is removed again.
pub fn upload_media(
    pool: &DbPool,
    blobs: &dyn BlobStore,
    api_key: &str,
    original_name: Option<&str>,
    data: &[u8],
) -> AppResult<i64> {
    let link = generate_blob_name(original_name);
    let result = db::transaction(pool, |tx| {
        let user = identity::resolve(tx, api_key)?;
        let media_id = store_media(tx, blobs, &link, data)?;
        Ok((user.id, media_id))
    });

    match result {
        Ok((user_id, media_id)) => {
            info!(user_id, media_id, link = %link, size = data.len(), "Media uploaded");
            Ok(media_id)
        }
        Err(e) => {
            match blobs.delete(&link) {
                Ok(()) | Err(BlobError::NotFound(_)) => {}
                Err(cleanup) => {
                    warn!(link = %link, error = %cleanup, "Failed to remove orphaned blob")
                }
            }
            Err(e)
        }
    }
}
