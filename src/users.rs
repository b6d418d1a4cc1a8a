use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::auth::{identify, TokenService};
use crate::config::{MAX_BIO_LENGTH, MIN_PASSWORD_LENGTH};
use crate::core::db::{self, KeyStore};
use crate::core::errors::ApiError;
use crate::core::helpers::hash_password;
use crate::models::models::{FollowedUser, User};

pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
}

/// Profile mutation is a full replace: a field omitted from the request
/// ends up unset on the record.
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

pub fn register_user(store: &dyn KeyStore, new_user: NewUser) -> Result<User, ApiError> {
    if new_user.email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }
    if new_user.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest("Password must be at least 3 characters".to_string()));
    }

    if db::user_id_by_email(store, &new_user.email)?.is_some() {
        return Err(ApiError::AlreadyExists("A user with this email already exists".to_string()));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: new_user.email,
        password: hash_password(&new_user.password)?,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        user_name: new_user.user_name,
        bio: None,
    };

    db::insert_user(store, &user)?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

pub fn current_user(store: &dyn KeyStore, user_id: &str) -> Result<User, ApiError> {
    db::load_user(store, user_id)?.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub fn update_profile(
    store: &dyn KeyStore,
    user_id: &str,
    update: ProfileUpdate,
) -> Result<User, ApiError> {
    if update.bio.as_deref().map(str::len).unwrap_or(0) > MAX_BIO_LENGTH {
        return Err(ApiError::BadRequest("Bio too long (max 500 chars)".to_string()));
    }

    let mut user = current_user(store, user_id)?;
    user.first_name = update.first_name;
    user.last_name = update.last_name;
    user.bio = update.bio;

    db::save_user(store, &user)?;
    Ok(user)
}

/// Removal is keyed by the email index, looked up from the record the id
/// points at. Absent user is not an error.
pub fn remove_user(store: &dyn KeyStore, user_id: &str) -> Result<Option<User>, ApiError> {
    let user = match db::load_user(store, user_id)? {
        Some(u) => u,
        None => return Ok(None),
    };

    let deleted = db::delete_user_via_email(store, &user.email)?;
    if deleted.is_some() {
        tracing::info!(user_id = %user_id, "user deleted");
    }
    Ok(deleted)
}

/// Every user except the requester, each flagged with whether the requester
/// currently follows them.
pub fn other_users(store: &dyn KeyStore, requester_id: &str) -> Result<Vec<FollowedUser>, ApiError> {
    let following = db::load_following(store, requester_id)?;

    let mut users = Vec::new();
    for id in db::all_user_ids(store)? {
        if id == requester_id {
            continue;
        }
        if let Some(user) = db::load_user(store, &id)? {
            let being_followed = following.contains(&user.id);
            users.push(FollowedUser::annotated(&user, being_followed));
        }
    }
    Ok(users)
}

// === HTTP handlers ===

fn json_response(status: u16, body: &impl serde::Serialize) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(body)?)
        .build())
}

pub fn create_user(store: &dyn KeyStore, req: Request) -> anyhow::Result<Response> {
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let new_user = NewUser {
        email: value["email"].as_str().unwrap_or_default().to_string(),
        password: value["password"].as_str().unwrap_or_default().to_string(),
        first_name: value["first_name"].as_str().map(str::to_string),
        last_name: value["last_name"].as_str().map(str::to_string),
        user_name: value["user_name"].as_str().map(str::to_string),
    };

    match register_user(store, new_user) {
        Ok(user) => json_response(201, &user.public()),
        Err(e) => Ok(e.into()),
    }
}

pub fn get_profile(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let identity = identify(tokens, &req);
    let user_id = match identity.require() {
        Ok(id) => id.to_string(),
        Err(e) => return Ok(e.into()),
    };

    match current_user(store, &user_id) {
        Ok(user) => json_response(200, &user.public()),
        Err(e) => Ok(e.into()),
    }
}

pub fn list_users(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let identity = identify(tokens, &req);
    let user_id = match identity.require() {
        Ok(id) => id.to_string(),
        Err(e) => return Ok(e.into()),
    };

    match other_users(store, &user_id) {
        Ok(users) => json_response(200, &users),
        Err(e) => Ok(e.into()),
    }
}

pub fn update_user(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let user_id = path.trim_start_matches("/users/");
    if user_id.is_empty() {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let identity = identify(tokens, &req);
    if let Err(e) = identity.require_owner(user_id) {
        return Ok(e.into());
    }

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let update = ProfileUpdate {
        first_name: value["first_name"].as_str().map(str::to_string),
        last_name: value["last_name"].as_str().map(str::to_string),
        bio: value["bio"].as_str().map(str::to_string),
    };

    match update_profile(store, user_id, update) {
        Ok(user) => json_response(200, &user.public()),
        Err(e) => Ok(e.into()),
    }
}

pub fn delete_user(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let user_id = path.trim_start_matches("/users/");
    if user_id.is_empty() {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let identity = identify(tokens, &req);
    if let Err(e) = identity.require_owner(user_id) {
        return Ok(e.into());
    }

    match remove_user(store, user_id) {
        Ok(Some(user)) => json_response(200, &user.public()),
        Ok(None) => json_response(200, &serde_json::Value::Null),
        Err(e) => Ok(e.into()),
    }
}
