use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Argon2 hash, never the plaintext.
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    pub bio: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            user_name: self.user_name.clone(),
            bio: self.bio.clone(),
        }
    }
}

/// Profile view with the password hash stripped.
#[derive(Serialize, Deserialize, Clone)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    pub bio: Option<String>,
}

/// Listing entry: another user's profile plus whether the requester
/// currently follows them.
#[derive(Serialize, Deserialize, Clone)]
pub struct FollowedUser {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    pub bio: Option<String>,
    pub being_followed: bool,
}

impl FollowedUser {
    pub fn annotated(user: &User, being_followed: bool) -> Self {
        FollowedUser {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_name: user.user_name.clone(),
            bio: user.bio.clone(),
            being_followed,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Set once at creation, never mutated.
    pub created_at: DateTime<Utc>,
}

/// A post joined with its author's display fields for presentation.
#[derive(Serialize, Deserialize, Clone)]
pub struct FeedPost {
    pub id: String,
    pub user_id: String,
    pub body: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub full_name: String,
}

impl FeedPost {
    pub fn decorated(post: Post, owner: &User) -> Self {
        FeedPost {
            id: post.id,
            user_id: owner.id.clone(),
            body: post.body,
            image_url: post.image_url,
            created_at: post.created_at,
            user_name: owner.user_name.clone(),
            full_name: owner.full_name(),
        }
    }
}
