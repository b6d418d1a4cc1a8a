use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::auth::{identify, TokenService};
use crate::config::MAX_POST_LENGTH;
use crate::core::db::{self, KeyStore};
use crate::core::errors::ApiError;
use crate::core::helpers::now_utc;
use crate::models::models::{FeedPost, Post};

fn validate_body(body: &str) -> Result<(), ApiError> {
    if body.is_empty() || body.len() > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest("Invalid post body".to_string()));
    }
    Ok(())
}

fn decorate(store: &dyn KeyStore, post: Post) -> Result<FeedPost, ApiError> {
    let owner = db::load_user(store, &post.user_id)?
        .ok_or_else(|| ApiError::NotFound("Post author not found".to_string()))?;
    Ok(FeedPost::decorated(post, &owner))
}

pub fn publish_post(
    store: &dyn KeyStore,
    owner_id: &str,
    body: &str,
    image_url: Option<String>,
) -> Result<FeedPost, ApiError> {
    validate_body(body)?;

    let owner = db::load_user(store, owner_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let post = Post {
        id: Uuid::new_v4().to_string(),
        user_id: owner.id.clone(),
        body: body.to_string(),
        image_url,
        created_at: now_utc(),
    };

    db::save_post(store, &post)?;
    db::append_post_id(store, &owner.id, &post.id)?;

    tracing::info!(user_id = %owner.id, post_id = %post.id, "post published");
    Ok(FeedPost::decorated(post, &owner))
}

pub fn find_post(store: &dyn KeyStore, post_id: &str) -> Result<Post, ApiError> {
    db::load_post(store, post_id)?.ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// Replaces the body of an existing post. The creation timestamp is never
/// touched.
pub fn revise_post(store: &dyn KeyStore, post_id: &str, body: &str) -> Result<FeedPost, ApiError> {
    validate_body(body)?;

    let mut post = find_post(store, post_id)?;
    post.body = body.to_string();
    db::save_post(store, &post)?;

    decorate(store, post)
}

/// Deletes the record and drops its id from the owner's post list, so the
/// list never points at a dead post.
pub fn remove_post(store: &dyn KeyStore, post_id: &str) -> Result<Post, ApiError> {
    let post = find_post(store, post_id)?;

    db::delete_post_record(store, post_id)?;
    db::remove_post_id(store, &post.user_id, post_id)?;

    tracing::info!(user_id = %post.user_id, post_id = %post_id, "post deleted");
    Ok(post)
}

// === HTTP handlers ===

fn json_response(status: u16, body: &impl serde::Serialize) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(body)?)
        .build())
}

pub fn create_post(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let owner_id = value["user_id"].as_str().unwrap_or_default();
    let body = value["body"].as_str().unwrap_or_default();
    let image_url = value["image_url"].as_str().map(str::to_string);

    // The posting identity must own the account the post is filed under.
    let identity = identify(tokens, &req);
    if let Err(e) = identity.require_owner(owner_id) {
        return Ok(e.into());
    }

    match publish_post(store, owner_id, body, image_url) {
        Ok(post) => json_response(201, &post),
        Err(e) => Ok(e.into()),
    }
}

pub fn get_post(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let identity = identify(tokens, &req);
    if let Err(e) = identity.require() {
        return Ok(e.into());
    }

    let path = req.path().to_string();
    let post_id = path.trim_start_matches("/posts/");
    if post_id.is_empty() {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    match find_post(store, post_id) {
        Ok(post) => json_response(200, &post),
        Err(e) => Ok(e.into()),
    }
}

/// Any authenticated identity may edit any post; the requester is not
/// checked against the post's owner.
pub fn edit_post(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let identity = identify(tokens, &req);
    if let Err(e) = identity.require() {
        return Ok(e.into());
    }

    let path = req.path().to_string();
    let post_id = path.trim_start_matches("/posts/");
    if post_id.is_empty() {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let body = value["body"].as_str().unwrap_or_default();

    match revise_post(store, post_id, body) {
        Ok(post) => json_response(200, &post),
        Err(e) => Ok(e.into()),
    }
}

/// Same authorization gap as `edit_post`: authentication only.
pub fn delete_post(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let identity = identify(tokens, &req);
    if let Err(e) = identity.require() {
        return Ok(e.into());
    }

    let path = req.path().to_string();
    let post_id = path.trim_start_matches("/posts/");
    if post_id.is_empty() {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    match remove_post(store, post_id) {
        Ok(post) => json_response(200, &post),
        Err(e) => Ok(e.into()),
    }
}
