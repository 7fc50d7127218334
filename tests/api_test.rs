//! End-to-end tests for the REST API.
//!
//! Each test builds the full router over a fresh SQLite file and blob
//! directory in a temp dir, then drives it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use warble::config::{Config, SeedUser};
use warble::state::{AppState, DbPool};
use warble::storage::FsBlobStore;
use warble::{db, identity, routes};

const TEST_KEY: &str = "test";

struct TestApp {
    app: Router,
    pool: DbPool,
    dir: TempDir,
}

// Users: 1 = "Test" (key "test"), 2..=6 = fake_user1..5 (key fake_api_keyN)
fn setup() -> TestApp {
    setup_with(|_| {})
}

fn setup_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.resolve_paths(dir.path());
    config.users.push(SeedUser {
        name: "Test".into(),
        api_key: TEST_KEY.into(),
    });
    for i in 1..=5 {
        config.users.push(SeedUser {
            name: format!("fake_user{i}"),
            api_key: format!("fake_api_key{i}"),
        });
    }
    tweak(&mut config);

    let pool = db::create_pool(&config.db_path(), 4).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    db::transaction(&pool, |tx| identity::seed_users(tx, &config.users)).unwrap();

    let blobs = FsBlobStore::new(config.media_path()).unwrap();
    let state = AppState {
        db: pool.clone(),
        config,
        blobs: Arc::new(blobs),
    };

    TestApp {
        app: routes::router(state),
        pool,
        dir,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("api-key", key);
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = self.send(req).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn post_tweet(&self, key: &str, text: &str, media: &[i64]) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/tweets",
                Some(key),
                Some(json!({ "tweet_data": text, "tweet_media_ids": media })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "post tweet failed: {body}");
        body["tweet_id"].as_i64().unwrap()
    }

    async fn upload(&self, key: &str, filename: &str, data: &[u8]) -> (StatusCode, Value) {
        let boundary = "warble-test-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/medias")
            .header("api-key", key)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, bytes) = self.send(req).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn feed(&self, key: &str) -> Vec<Value> {
        let (status, body) = self.call(Method::GET, "/api/tweets", Some(key), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], true);
        body["tweets"].as_array().unwrap().clone()
    }
}

fn assert_error(body: &Value, error_type: &str) {
    assert_eq!(body["result"], false);
    assert_eq!(body["error_type"], error_type);
    assert!(body["error_message"].is_string());
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

#[tokio::test]
async fn missing_api_key_is_unauthorized() {
    let t = setup();
    let (status, body) = t.call(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "Unauthorized");
}

#[tokio::test]
async fn unknown_api_key_is_unauthorized() {
    let t = setup();
    for (method, uri) in [
        (Method::GET, "/api/users/me"),
        (Method::GET, "/api/tweets"),
        (Method::POST, "/api/users/2/follow"),
        (Method::DELETE, "/api/tweets/1"),
    ] {
        let (status, body) = t.call(method, uri, Some("unauthorized"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_error(&body, "Unauthorized");
    }
}

#[tokio::test]
async fn custom_header_name_is_honoured() {
    let t = setup_with(|c| c.auth.header = "x-api-key".into());
    let req = Request::builder()
        .uri("/api/users/me")
        .header("x-api-key", TEST_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, _) = t.send(req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t
        .call(Method::GET, "/api/users/me", Some(TEST_KEY), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// USERS AND FOLLOW GRAPH
// ============================================================================

#[tokio::test]
async fn me_returns_own_profile() {
    let t = setup();
    let (status, body) = t
        .call(Method::GET, "/api/users/me", Some(TEST_KEY), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "result": true,
            "user": { "id": 1, "name": "Test", "followers": [], "following": [] }
        })
    );
}

#[tokio::test]
async fn profile_by_id() {
    let t = setup();
    let (status, body) = t
        .call(Method::GET, "/api/users/2", Some(TEST_KEY), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "fake_user1");

    let (status, body) = t
        .call(Method::GET, "/api/users/999", Some(TEST_KEY), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&body, "Not Found");

    let (status, body) = t
        .call(Method::GET, "/api/users/abc", Some(TEST_KEY), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "Bad Request");
}

#[tokio::test]
async fn follow_unfollow_round_trip() {
    let t = setup();
    let url = "/api/users/2/follow";

    let (status, body) = t.call(Method::POST, url, Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": true }));

    let (status, body) = t.call(Method::POST, url, Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error(&body, "Conflict");

    let (_, me) = t
        .call(Method::GET, "/api/users/me", Some(TEST_KEY), None)
        .await;
    assert_eq!(me["user"]["following"], json!([{ "id": 2, "name": "fake_user1" }]));
    let (_, target) = t
        .call(Method::GET, "/api/users/2", Some(TEST_KEY), None)
        .await;
    assert_eq!(target["user"]["followers"], json!([{ "id": 1, "name": "Test" }]));

    let (status, body) = t.call(Method::DELETE, url, Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": true }));

    let (status, body) = t.call(Method::DELETE, url, Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&body, "Not Found");
    assert!(body["error_message"]
        .as_str()
        .unwrap()
        .to_lowercase()
        .contains("not following"));
}

#[tokio::test]
async fn self_follow_is_bad_request() {
    let t = setup();
    for method in [Method::POST, Method::DELETE] {
        let (status, body) = t
            .call(method, "/api/users/1/follow", Some(TEST_KEY), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, "Bad Request");
    }
}

#[tokio::test]
async fn follow_unknown_user_is_not_found() {
    let t = setup();
    let (status, body) = t
        .call(Method::POST, "/api/users/999/follow", Some(TEST_KEY), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&body, "Not Found");
}

// ============================================================================
// FEED
// ============================================================================

#[tokio::test]
async fn feed_shows_own_and_followed_tweets_only() {
    let t = setup();
    let own = t.post_tweet(TEST_KEY, "my tweet", &[]).await;
    let followed = t.post_tweet("fake_api_key1", "followed tweet", &[]).await;
    t.post_tweet("fake_api_key2", "stranger tweet", &[]).await;

    let ids: Vec<i64> = t
        .feed(TEST_KEY)
        .await
        .iter()
        .map(|tw| tw["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![own]);

    t.call(Method::POST, "/api/users/2/follow", Some(TEST_KEY), None)
        .await;
    let feed = t.feed(TEST_KEY).await;
    let ids: Vec<i64> = feed.iter().map(|tw| tw["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![followed, own]);
    assert_eq!(
        feed[0],
        json!({
            "id": followed,
            "content": "followed tweet",
            "author": { "id": 2, "name": "fake_user1" },
            "attachments": [],
            "likes": []
        })
    );
}

#[tokio::test]
async fn empty_feed_is_ok() {
    let t = setup();
    assert!(t.feed(TEST_KEY).await.is_empty());
}

#[tokio::test]
async fn feed_does_not_duplicate_children() {
    let t = setup();
    let (_, m1) = t.upload(TEST_KEY, "a.png", b"aaa").await;
    let (_, m2) = t.upload(TEST_KEY, "b.png", b"bbb").await;
    let media = [m1["media_id"].as_i64().unwrap(), m2["media_id"].as_i64().unwrap()];
    let tweet = t.post_tweet(TEST_KEY, "two pics", &media).await;

    for key in [TEST_KEY, "fake_api_key1", "fake_api_key2"] {
        let (status, _) = t
            .call(
                Method::POST,
                &format!("/api/tweets/{tweet}/likes"),
                Some(key),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let feed = t.feed(TEST_KEY).await;
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["attachments"].as_array().unwrap().len(), 2);
    let likers: Vec<i64> = feed[0]["likes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["user_id"].as_i64().unwrap())
        .collect();
    assert_eq!(likers, vec![1, 2, 3]);
    assert_eq!(feed[0]["likes"][1]["name"], "fake_user1");
}

#[tokio::test]
async fn most_liked_ordering_when_configured() {
    let t = setup_with(|c| c.feed.order = warble::feed::FeedOrder::MostLiked);
    let older = t.post_tweet(TEST_KEY, "older", &[]).await;
    let newer = t.post_tweet(TEST_KEY, "newer", &[]).await;
    t.call(
        Method::POST,
        &format!("/api/tweets/{older}/likes"),
        Some("fake_api_key1"),
        None,
    )
    .await;

    let ids: Vec<i64> = t
        .feed(TEST_KEY)
        .await
        .iter()
        .map(|tw| tw["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![older, newer]);
}

// ============================================================================
// TWEETS
// ============================================================================

#[tokio::test]
async fn create_tweet_returns_id() {
    let t = setup();
    let (status, body) = t
        .call(
            Method::POST,
            "/api/tweets",
            Some(TEST_KEY),
            Some(json!({ "tweet_data": "random tweet text" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], true);
    assert!(body["tweet_id"].is_i64());
}

#[tokio::test]
async fn create_tweet_rejects_bad_input() {
    let t = setup();
    let (status, body) = t
        .call(
            Method::POST,
            "/api/tweets",
            Some(TEST_KEY),
            Some(json!({ "content": "wrong field" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "Bad Request");

    let (status, body) = t
        .call(
            Method::POST,
            "/api/tweets",
            Some(TEST_KEY),
            Some(json!({ "tweet_data": "x".repeat(2501) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "Bad Request");

    let (status, body) = t
        .call(
            Method::POST,
            "/api/tweets",
            Some(TEST_KEY),
            Some(json!({ "tweet_data": "pics", "tweet_media_ids": [12345] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_message"], "Some media not found");
    assert!(t.feed(TEST_KEY).await.is_empty());
}

#[tokio::test]
async fn delete_tweet_requires_ownership() {
    let t = setup();
    let mine = t.post_tweet(TEST_KEY, "mine", &[]).await;
    let theirs = t.post_tweet("fake_api_key1", "theirs", &[]).await;

    let (status, foreign) = t
        .call(
            Method::DELETE,
            &format!("/api/tweets/{theirs}"),
            Some(TEST_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_error(&foreign, "Forbidden");

    let (status, missing) = t
        .call(Method::DELETE, "/api/tweets/20000", Some(TEST_KEY), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // Indistinguishable from the foreign-tweet case.
    assert_eq!(foreign, missing);

    let (status, body) = t
        .call(
            Method::DELETE,
            &format!("/api/tweets/{mine}"),
            Some(TEST_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": true }));
    assert!(t.feed(TEST_KEY).await.is_empty());
}

// ============================================================================
// LIKES
// ============================================================================

#[tokio::test]
async fn like_uniqueness_round_trip() {
    let t = setup();
    let tweet = t.post_tweet("fake_api_key1", "like me", &[]).await;
    let url = format!("/api/tweets/{tweet}/likes");

    let (status, body) = t.call(Method::POST, &url, Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": true }));

    let (status, body) = t.call(Method::POST, &url, Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error(&body, "Conflict");

    let (status, _) = t.call(Method::DELETE, &url, Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t.call(Method::DELETE, &url, Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_message"], "Like not found");
}

#[tokio::test]
async fn like_missing_tweet_is_not_found() {
    let t = setup();
    let (status, body) = t
        .call(Method::POST, "/api/tweets/777/likes", Some(TEST_KEY), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_message"], "Tweet not found");
}

// ============================================================================
// MEDIA
// ============================================================================

#[tokio::test]
async fn media_gated_tweet_lifecycle() {
    let t = setup();
    let (status, body) = t.upload(TEST_KEY, "photo.png", b"png-bytes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], true);
    let media_id = body["media_id"].as_i64().unwrap();

    let tweet = t.post_tweet(TEST_KEY, "with photo", &[media_id]).await;
    let feed = t.feed(TEST_KEY).await;
    let attachments = feed[0]["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 1);
    let link = attachments[0].as_str().unwrap().to_string();
    assert!(link.ends_with(".png"));

    let req = Request::builder()
        .uri(format!("/media/{link}"))
        .body(Body::empty())
        .unwrap();
    let (status, bytes) = t.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"png-bytes");

    let (status, _) = t
        .call(
            Method::DELETE,
            &format!("/api/tweets/{tweet}"),
            Some(TEST_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let req = Request::builder()
        .uri(format!("/media/{link}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = t.send(req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let conn = t.pool.get().unwrap();
    let rows: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM media WHERE tweet_id = ?1)
                  + (SELECT COUNT(*) FROM likes WHERE tweet_id = ?1)",
            [tweet],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn upload_requires_auth_and_a_file() {
    let t = setup();
    let (status, _) = t.upload("unauthorized", "a.png", b"data").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let stored = std::fs::read_dir(t.dir.path().join("media")).unwrap().count();
    assert_eq!(stored, 0, "rejected upload must not leave a blob behind");

    let (status, body) = t.upload(TEST_KEY, "a.png", b"").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "Bad Request");
}

#[tokio::test]
async fn health_reports_ok() {
    let t = setup();
    let (status, body) = t.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
