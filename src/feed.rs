use std::collections::HashMap;

use spin_sdk::http::{Request, Response};

use crate::auth::{identify, TokenService};
use crate::core::db::{self, KeyStore};
use crate::core::errors::ApiError;
use crate::models::models::{FeedPost, Post, User};

/// Merges the user's own posts with the posts of everyone they follow,
/// newest first, each joined with its author's display fields.
///
/// No de-duplication: a user who follows themselves sees their own posts
/// twice. Followed authors whose record is gone are skipped along with
/// their posts.
pub fn build_feed(store: &dyn KeyStore, user_id: &str) -> Result<Vec<FeedPost>, ApiError> {
    let user = db::load_user(store, user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let following = db::load_following(store, user_id)?;

    let mut authors: HashMap<String, User> = HashMap::new();
    let mut posts: Vec<Post> = Vec::new();

    for followed_id in &following {
        if let Some(author) = db::load_user(store, followed_id)? {
            posts.extend(db::posts_by_owner(store, followed_id)?);
            authors.insert(author.id.clone(), author);
        }
    }

    posts.extend(db::posts_by_owner(store, user_id)?);
    authors.insert(user.id.clone(), user);

    // Newest first; the sort is stable, so store order decides ties.
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut feed = Vec::with_capacity(posts.len());
    for post in posts {
        if let Some(owner) = authors.get(&post.user_id) {
            feed.push(FeedPost::decorated(post, owner));
        }
    }
    Ok(feed)
}

// === HTTP handler ===

pub fn handle_feed(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let user_id = path.trim_start_matches("/feed/");
    if user_id.is_empty() {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let identity = identify(tokens, &req);
    if let Err(e) = identity.require_owner(user_id) {
        return Ok(e.into());
    }

    match build_feed(store, user_id) {
        Ok(feed) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&feed)?)
            .build()),
        Err(e) => Ok(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::MemoryStore;
    use crate::core::helpers::now_utc;
    use chrono::Duration;

    fn seed_user(store: &MemoryStore, id: &str, first: &str, last: &str) -> User {
        let user = User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            password: "hash".to_string(),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            user_name: Some(first.to_lowercase()),
            bio: None,
        };
        db::insert_user(store, &user).unwrap();
        user
    }

    fn seed_post(store: &MemoryStore, id: &str, owner: &str, body: &str, age_secs: i64) {
        let post = Post {
            id: id.to_string(),
            user_id: owner.to_string(),
            body: body.to_string(),
            image_url: None,
            created_at: now_utc() - Duration::seconds(age_secs),
        };
        db::save_post(store, &post).unwrap();
        db::append_post_id(store, owner, id).unwrap();
    }

    #[test]
    fn followed_post_appears_once_with_author_display_data() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "Alice", "Anders");
        let b = seed_user(&store, "b", "Bob", "Bauer");

        db::toggle_following(&store, &a.id, &b.id).unwrap();
        seed_post(&store, "p1", &b.id, "hello", 0);

        let feed = build_feed(&store, &a.id).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].body, "hello");
        assert_eq!(feed[0].full_name, "Bob Bauer");
        assert_eq!(feed[0].user_name, Some("bob".to_string()));
        assert_eq!(feed[0].user_id, b.id);
    }

    #[test]
    fn feed_is_exactly_own_plus_followed_newest_first() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "Alice", "Anders");
        let b = seed_user(&store, "b", "Bob", "Bauer");
        let c = seed_user(&store, "c", "Cara", "Cruz");

        db::toggle_following(&store, &a.id, &b.id).unwrap();

        seed_post(&store, "own-old", &a.id, "own old", 300);
        seed_post(&store, "followed-mid", &b.id, "followed mid", 200);
        seed_post(&store, "own-new", &a.id, "own new", 100);
        seed_post(&store, "outsider", &c.id, "not followed", 50);

        let feed = build_feed(&store, &a.id).unwrap();
        let ids: Vec<&str> = feed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["own-new", "followed-mid", "own-old"]);
    }

    #[test]
    fn self_follow_duplicates_own_posts() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "Alice", "Anders");

        db::toggle_following(&store, &a.id, &a.id).unwrap();
        seed_post(&store, "p1", &a.id, "echo", 0);

        let feed = build_feed(&store, &a.id).unwrap();
        assert_eq!(feed.len(), 2);
        assert!(feed.iter().all(|p| p.body == "echo"));
    }

    #[test]
    fn missing_user_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            build_feed(&store, "ghost").unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[test]
    fn posts_of_deleted_followed_user_are_skipped() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "Alice", "Anders");

        db::toggle_following(&store, &a.id, "gone").unwrap();

        let feed = build_feed(&store, &a.id).unwrap();
        assert!(feed.is_empty());
    }
}
