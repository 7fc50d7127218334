//! Feed assembly: every tweet by the user or by someone they follow, with
//! author, attachments and likes folded into one record per tweet.
//!
//! The feed query left-joins two independent child collections (media and
//! likes), so each tweet arrives as a cross product of rows. [`fold_rows`]
//! collapses that back to distinct media rows and distinct likers.

use std::collections::{HashMap, HashSet};

use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::db::models::UserRef;
use crate::error::AppResult;
use crate::identity::Profile;

/// Ranking policy for the feed. Exactly one applies per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedOrder {
    /// Newest first; equal timestamps fall back to the higher tweet id.
    #[default]
    Recent,
    /// Most likes first; ties keep the `Recent` order.
    MostLiked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeView {
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedTweet {
    pub id: i64,
    pub content: String,
    pub author: UserRef,
    pub attachments: Vec<String>,
    pub likes: Vec<LikeView>,
}

/// One row of the joined feed query.
#[derive(Debug, Clone)]
pub struct FeedRow {
    pub tweet_id: i64,
    pub content: String,
    pub author_id: i64,
    pub author_name: String,
    pub media_id: Option<i64>,
    pub media_link: Option<String>,
    pub liker_id: Option<i64>,
    pub liker_name: Option<String>,
}

pub fn assemble_feed(
    conn: &Connection,
    user: &Profile,
    order: FeedOrder,
) -> AppResult<Vec<FeedTweet>> {
    let authors = user.visible_author_ids();
    let rows = query_feed_rows(conn, &authors)?;
    let mut feed = fold_rows(rows);
    rank(&mut feed, order);
    tracing::debug!(user_id = user.id, tweets = feed.len(), "Assembled feed");
    Ok(feed)
}

fn query_feed_rows(conn: &Connection, author_ids: &[i64]) -> AppResult<Vec<FeedRow>> {
    let placeholders = vec!["?"; author_ids.len()].join(", ");
    let sql = format!(
        "SELECT t.id, t.content, a.id, a.name, m.id, m.link, lu.id, lu.name
         FROM tweets t
         JOIN users a ON a.id = t.author_id
         LEFT JOIN media m ON m.tweet_id = t.id
         LEFT JOIN likes l ON l.tweet_id = t.id
         LEFT JOIN users lu ON lu.id = l.user_id
         WHERE t.author_id IN ({placeholders})
         ORDER BY t.created_at DESC, t.id DESC, m.id ASC, l.id ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(author_ids.iter()), |row| {
            Ok(FeedRow {
                tweet_id: row.get(0)?,
                content: row.get(1)?,
                author_id: row.get(2)?,
                author_name: row.get(3)?,
                media_id: row.get(4)?,
                media_link: row.get(5)?,
                liker_id: row.get(6)?,
                liker_name: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Collapse joined rows into one [`FeedTweet`] per tweet, keeping the order in
/// which tweets first appear.
pub fn fold_rows(rows: impl IntoIterator<Item = FeedRow>) -> Vec<FeedTweet> {
    struct Acc {
        tweet: FeedTweet,
        media_seen: HashSet<i64>,
        likers_seen: HashSet<i64>,
    }

    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut folded: Vec<Acc> = Vec::new();

    for row in rows {
        let slot = *index.entry(row.tweet_id).or_insert_with(|| {
            folded.push(Acc {
                tweet: FeedTweet {
                    id: row.tweet_id,
                    content: row.content.clone(),
                    author: UserRef {
                        id: row.author_id,
                        name: row.author_name.clone(),
                    },
                    attachments: Vec::new(),
                    likes: Vec::new(),
                },
                media_seen: HashSet::new(),
                likers_seen: HashSet::new(),
            });
            folded.len() - 1
        });
        let acc = &mut folded[slot];

        if let (Some(media_id), Some(link)) = (row.media_id, row.media_link) {
            if acc.media_seen.insert(media_id) {
                acc.tweet.attachments.push(link);
            }
        }
        if let (Some(user_id), Some(name)) = (row.liker_id, row.liker_name) {
            if acc.likers_seen.insert(user_id) {
                acc.tweet.likes.push(LikeView { user_id, name });
            }
        }
    }

    folded.into_iter().map(|acc| acc.tweet).collect()
}

fn rank(feed: &mut [FeedTweet], order: FeedOrder) {
    match order {
        // Rows already arrive newest first.
        FeedOrder::Recent => {}
        // Stable, so equal counts keep recency order.
        FeedOrder::MostLiked => feed.sort_by(|a, b| b.likes.len().cmp(&a.likes.len())),
    }
}
