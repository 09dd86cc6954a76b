//! Drives the ingest service end-to-end against an in-memory durable store,
//! covering the publish → bind → comment → like contract, startup replay,
//! and the store's typed failure outcomes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use vampa::application::ingest::{IngestService, PublishOutcome};
use vampa::application::repos::{
    CommentsRepo, ItemsRepo, RepoError, TokensRepo, UsersRepo,
};
use vampa::domain::entities::{
    BestCommentRow, CommentRecord, ItemRecord, NewCommentRecord, NewItemRecord, UserRecord,
};
use vampa::feed::{FeedClock, FeedConfig, FeedManager, ManualClock};

#[derive(Default)]
struct MemoryStore {
    next_item_id: AtomicI64,
    next_comment_id: AtomicI64,
    items: RwLock<HashMap<i64, ItemRecord>>,
    comments: RwLock<HashMap<i64, CommentRecord>>,
    likes: RwLock<HashSet<(String, i64)>>,
    users: RwLock<HashMap<String, UserRecord>>,
    temp_tokens: RwLock<HashMap<String, (UserRecord, OffsetDateTime)>>,
    access_tokens: RwLock<HashMap<String, (String, OffsetDateTime)>>,
}

impl MemoryStore {
    fn seed_item(&self, url: &str, title: &str) -> i64 {
        let id = self.next_item_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.items.write().expect("items lock").insert(
            id,
            ItemRecord {
                id,
                url: url.to_string(),
                title: title.to_string(),
                source: "seed".to_string(),
                link: format!("{url}/article"),
            },
        );
        id
    }

    fn seed_comment(&self, item_id: i64, text: &str, likes: u32) -> i64 {
        let id = self.next_comment_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.comments.write().expect("comments lock").insert(
            id,
            CommentRecord {
                id,
                item_id,
                created_at: OffsetDateTime::now_utc(),
                text: text.to_string(),
                author: "seed".to_string(),
                likes,
            },
        );
        id
    }
}

#[async_trait]
impl ItemsRepo for MemoryStore {
    async fn insert_item(&self, item: &NewItemRecord) -> Result<i64, RepoError> {
        let mut items = self.items.write().expect("items lock");
        if items.values().any(|existing| existing.url == item.url) {
            return Err(RepoError::duplicate("items.url"));
        }
        let id = self.next_item_id.fetch_add(1, Ordering::SeqCst) + 1;
        items.insert(
            id,
            ItemRecord {
                id,
                url: item.url.clone(),
                title: item.title.clone(),
                source: item.source.clone(),
                link: item.link.clone(),
            },
        );
        Ok(id)
    }

    async fn delete_item(&self, id: i64) -> Result<(), RepoError> {
        self.items.write().expect("items lock").remove(&id);
        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<ItemRecord>, RepoError> {
        Ok(self
            .items
            .read()
            .expect("items lock")
            .values()
            .find(|item| item.url == url)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ItemRecord>, RepoError> {
        Ok(self.items.read().expect("items lock").get(&id).cloned())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn insert_comment(&self, comment: &NewCommentRecord) -> Result<i64, RepoError> {
        let id = self.next_comment_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.comments.write().expect("comments lock").insert(
            id,
            CommentRecord {
                id,
                item_id: comment.item_id,
                created_at: comment.created_at,
                text: comment.text.clone(),
                author: comment.author.clone(),
                likes: 0,
            },
        );
        Ok(id)
    }

    async fn delete_comment(&self, id: i64) -> Result<(), RepoError> {
        self.comments.write().expect("comments lock").remove(&id);
        self.likes
            .write()
            .expect("likes lock")
            .retain(|(_, comment_id)| *comment_id != id);
        Ok(())
    }

    async fn insert_like(
        &self,
        username: &str,
        comment_id: i64,
    ) -> Result<CommentRecord, RepoError> {
        let mut comments = self.comments.write().expect("comments lock");
        let comment = comments.get_mut(&comment_id).ok_or(RepoError::NotFound)?;

        let mut likes = self.likes.write().expect("likes lock");
        if !likes.insert((username.to_string(), comment_id)) {
            return Err(RepoError::duplicate("likes.user_comment"));
        }
        comment.likes += 1;
        Ok(comment.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self.comments.read().expect("comments lock").get(&id).cloned())
    }

    async fn list_for_item(
        &self,
        item_id: i64,
        pinned: Option<i64>,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let comments = self.comments.read().expect("comments lock");
        let mut result: Vec<CommentRecord> = comments
            .values()
            .filter(|comment| comment.item_id == item_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.likes.cmp(&a.likes).then(a.id.cmp(&b.id)));
        if let Some(pinned_id) = pinned {
            if let Some(position) = result.iter().position(|comment| comment.id == pinned_id) {
                let pinned_comment = result.remove(position);
                result.insert(0, pinned_comment);
            }
        }
        Ok(result)
    }

    async fn list_best(&self) -> Result<Vec<BestCommentRow>, RepoError> {
        let comments = self.comments.read().expect("comments lock");
        let items = self.items.read().expect("items lock");
        let mut ranked: Vec<&CommentRecord> = comments.values().collect();
        ranked.sort_by(|a, b| b.likes.cmp(&a.likes).then(a.id.cmp(&b.id)));
        Ok(ranked
            .into_iter()
            .take(100)
            .filter_map(|comment| {
                items.get(&comment.item_id).map(|item| BestCommentRow {
                    item: item.clone(),
                    comment: comment.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn insert_user(&self, user: &UserRecord) -> Result<(), RepoError> {
        let mut users = self.users.write().expect("users lock");
        if users.contains_key(&user.name) {
            return Err(RepoError::duplicate("users.name"));
        }
        users.insert(user.name.clone(), user.clone());
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.read().expect("users lock").get(name).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .read()
            .expect("users lock")
            .values()
            .find(|user| user.email == email)
            .cloned())
    }
}

#[async_trait]
impl TokensRepo for MemoryStore {
    async fn insert_temp_token(
        &self,
        user: &UserRecord,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        self.temp_tokens
            .write()
            .expect("temp tokens lock")
            .insert(token.to_string(), (user.clone(), expires_at));
        Ok(())
    }

    async fn consume_temp_token(&self, token: &str) -> Result<UserRecord, RepoError> {
        let (user, expires_at) = self
            .temp_tokens
            .write()
            .expect("temp tokens lock")
            .remove(token)
            .ok_or(RepoError::NotFound)?;
        if OffsetDateTime::now_utc() > expires_at {
            return Err(RepoError::Expired);
        }
        Ok(user)
    }

    async fn insert_access_token(
        &self,
        token: &str,
        username: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        self.access_tokens
            .write()
            .expect("access tokens lock")
            .insert(token.to_string(), (username.to_string(), expires_at));
        Ok(())
    }

    async fn username_for_access_token(&self, token: &str) -> Result<String, RepoError> {
        let mut tokens = self.access_tokens.write().expect("access tokens lock");
        let (username, expires_at) = tokens.get(token).cloned().ok_or(RepoError::NotFound)?;
        if OffsetDateTime::now_utc() > expires_at {
            tokens.remove(token);
            return Err(RepoError::Expired);
        }
        Ok(username)
    }

    async fn delete_temp_token(&self, token: &str) -> Result<(), RepoError> {
        self.temp_tokens
            .write()
            .expect("temp tokens lock")
            .remove(token);
        Ok(())
    }

    async fn delete_access_token(&self, token: &str) -> Result<(), RepoError> {
        self.access_tokens
            .write()
            .expect("access tokens lock")
            .remove(token);
        Ok(())
    }
}

fn service(capacity: usize) -> (IngestService, Arc<FeedManager>, Arc<MemoryStore>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let config = FeedConfig {
        capacity,
        jitter_ceiling_ms: 0,
    };
    let feed = Arc::new(FeedManager::with_clock(
        config,
        clock as Arc<dyn FeedClock>,
    ));
    let store = Arc::new(MemoryStore::default());
    let ingest = IngestService::new(
        Arc::clone(&feed),
        Arc::clone(&store) as Arc<dyn ItemsRepo>,
        Arc::clone(&store) as Arc<dyn CommentsRepo>,
    );
    (ingest, feed, store)
}

fn new_item(url: &str) -> NewItemRecord {
    NewItemRecord {
        url: url.to_string(),
        title: format!("title for {url}"),
        source: "ingest-test".to_string(),
        link: format!("{url}/article"),
    }
}

fn new_comment(item_id: i64, text: &str) -> NewCommentRecord {
    NewCommentRecord {
        item_id,
        created_at: OffsetDateTime::now_utc(),
        text: text.to_string(),
        author: "ada".to_string(),
    }
}

#[tokio::test]
async fn publish_persists_and_binds_the_assigned_id() {
    let (ingest, feed, store) = service(10);

    let outcome = ingest
        .publish_item(new_item("https://feeds.example/1"))
        .await
        .expect("publish");
    let PublishOutcome::Published { id } = outcome else {
        panic!("expected a published outcome, got {outcome:?}");
    };

    assert!(feed.is_resident("https://feeds.example/1"));
    assert!(feed.is_resident_id(id));
    let stored = store
        .find_by_url("https://feeds.example/1")
        .await
        .expect("find")
        .expect("persisted item");
    assert_eq!(stored.id, id);
}

#[tokio::test]
async fn publishing_a_resident_key_writes_nothing() {
    let (ingest, _feed, store) = service(10);

    ingest
        .publish_item(new_item("https://feeds.example/1"))
        .await
        .expect("publish");
    let outcome = ingest
        .publish_item(new_item("https://feeds.example/1"))
        .await
        .expect("republish");

    assert_eq!(outcome, PublishOutcome::Duplicate);
    assert_eq!(store.items.read().expect("items lock").len(), 1);
}

#[tokio::test]
async fn comments_and_likes_flow_into_the_resident_item() {
    let (ingest, feed, _store) = service(10);

    let outcome = ingest
        .publish_item(new_item("https://feeds.example/1"))
        .await
        .expect("publish");
    let PublishOutcome::Published { id } = outcome else {
        panic!("expected a published outcome");
    };

    let comment = ingest
        .add_comment(new_comment(id, "first"))
        .await
        .expect("add comment");
    let resident = feed.lookup("https://feeds.example/1").expect("resident");
    assert_eq!(resident.comment_count(), 1);
    assert_eq!(resident.best_comment().map(|c| c.likes), Some(0));

    let liked = ingest
        .like_comment("ada", comment.id)
        .await
        .expect("like comment");
    assert_eq!(liked.likes, 1);

    // the like notification counts as activity and refreshes the summary
    let resident = feed.lookup("https://feeds.example/1").expect("resident");
    assert_eq!(resident.comment_count(), 2);
    assert_eq!(resident.best_comment().map(|c| c.likes), Some(1));
}

#[tokio::test]
async fn store_failures_surface_as_typed_outcomes() {
    let (ingest, _feed, store) = service(10);

    let outcome = ingest
        .publish_item(new_item("https://feeds.example/1"))
        .await
        .expect("publish");
    let PublishOutcome::Published { id } = outcome else {
        panic!("expected a published outcome");
    };
    let comment = ingest
        .add_comment(new_comment(id, "first"))
        .await
        .expect("add comment");

    let missing = ingest.like_comment("ada", 9_999).await;
    assert!(matches!(
        missing,
        Err(vampa::application::ingest::IngestError::Repo(RepoError::NotFound))
    ));

    ingest
        .like_comment("ada", comment.id)
        .await
        .expect("first like");
    let repeat = ingest.like_comment("ada", comment.id).await;
    assert!(matches!(
        repeat,
        Err(vampa::application::ingest::IngestError::Repo(RepoError::Duplicate { .. }))
    ));

    let record = CommentsRepo::find_by_id(&*store, comment.id)
        .await
        .expect("find")
        .expect("stored comment");
    assert_eq!(record.likes, 1);
}

#[tokio::test]
async fn replay_rebuilds_the_hot_set_from_best_comments() {
    let (ingest, feed, store) = service(10);

    let first = store.seed_item("https://feeds.example/1", "one");
    let second = store.seed_item("https://feeds.example/2", "two");
    store.seed_comment(first, "great", 5);
    store.seed_comment(first, "meh", 0);
    let quiet_comment = store.seed_comment(second, "quiet", 0);

    let restored = ingest.replay().await.expect("replay");
    assert_eq!(restored, 2);
    assert_eq!(feed.len(), 2);

    // each item came back bound, carrying its top comment
    let resident = feed.lookup("https://feeds.example/1").expect("resident");
    assert_eq!(resident.store_id(), Some(first));
    assert_eq!(resident.best_comment().map(|c| c.likes), Some(5));

    // the liked item outranks the quiet one in the rebuilt snapshot
    let parsed: serde_json::Value =
        serde_json::from_slice(&ingest.feed_json()).expect("valid snapshot json");
    assert_eq!(parsed[0]["url"], "https://feeds.example/1");
    assert_eq!(parsed[1]["url"], "https://feeds.example/2");

    // bindings are live: new activity moves the rebuilt items
    assert!(feed.is_resident_id(second));
    ingest
        .like_comment("ada", quiet_comment)
        .await
        .expect("like after replay");
    let resident = feed.lookup("https://feeds.example/2").expect("resident");
    assert_eq!(resident.comment_count(), 1);
    assert_eq!(resident.best_comment().map(|c| c.likes), Some(1));
}

#[tokio::test]
async fn snapshot_payloads_are_served_in_both_forms() {
    let (ingest, _feed, _store) = service(10);

    ingest
        .publish_item(new_item("https://feeds.example/1"))
        .await
        .expect("publish");

    let plain = ingest.feed_json();
    let compressed = ingest.feed_gzip();

    use flate2::read::GzDecoder;
    use std::io::Read;
    let mut decoder = GzDecoder::new(compressed.as_ref());
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).expect("valid gzip stream");
    assert_eq!(decoded, plain.as_ref());
}

#[tokio::test]
async fn expired_tokens_are_reported_and_consumed() {
    let store = MemoryStore::default();
    let user = UserRecord {
        name: "ada".to_string(),
        email: "ada@example.com".to_string(),
        pass_hash: "hashed".to_string(),
    };
    store.insert_user(&user).await.expect("insert user");

    let past = OffsetDateTime::now_utc() - Duration::hours(1);
    let future = OffsetDateTime::now_utc() + Duration::hours(1);

    store
        .insert_temp_token(&user, "stale-temp", past)
        .await
        .expect("insert temp token");
    assert!(matches!(
        store.consume_temp_token("stale-temp").await,
        Err(RepoError::Expired)
    ));
    // consumed either way
    assert!(matches!(
        store.consume_temp_token("stale-temp").await,
        Err(RepoError::NotFound)
    ));

    store
        .insert_access_token("stale-access", &user.name, past)
        .await
        .expect("insert access token");
    assert!(matches!(
        store.username_for_access_token("stale-access").await,
        Err(RepoError::Expired)
    ));
    assert!(matches!(
        store.username_for_access_token("stale-access").await,
        Err(RepoError::NotFound)
    ));

    store
        .insert_access_token("fresh-access", &user.name, future)
        .await
        .expect("insert access token");
    let username = store
        .username_for_access_token("fresh-access")
        .await
        .expect("fresh token resolves");
    assert_eq!(username, "ada");

    let found = store
        .find_by_email("ada@example.com")
        .await
        .expect("find by email")
        .expect("registered user");
    assert_eq!(found.name, "ada");
}
