use serde::{Deserialize, Serialize};

use crate::feed::FeedTweet;
use crate::identity::Profile;

#[derive(Debug, Serialize)]
pub struct GetUserResponse {
    pub result: bool,
    pub user: Profile,
}

#[derive(Debug, Serialize)]
pub struct GetTweetsResponse {
    pub result: bool,
    pub tweets: Vec<FeedTweet>,
}

#[derive(Debug, Serialize)]
pub struct PostTweetResponse {
    pub result: bool,
    pub tweet_id: i64,
}

#[derive(Debug, Serialize)]
pub struct PostMediaResponse {
    pub result: bool,
    pub media_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SimpleResult {
    pub result: bool,
}

impl SimpleResult {
    pub fn ok() -> Self {
        Self { result: true }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostTweetRequest {
    pub tweet_data: String,
    #[serde(default)]
    pub tweet_media_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
