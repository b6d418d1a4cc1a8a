use std::env;

pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_POST_LENGTH: usize = 5000;

pub const USERS_LIST_KEY: &str = "users_list";

pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn email_key(email: &str) -> String {
    format!("email:{}", email)
}

pub fn post_key(post_id: &str) -> String {
    format!("post:{}", post_id)
}

pub fn posts_key(user_id: &str) -> String {
    format!("posts:{}", user_id)
}

pub fn following_key(user_id: &str) -> String {
    format!("following:{}", user_id)
}

/// Runtime settings, read from the environment once per dispatch.
/// The token secret and TTL are handed to `TokenService` at construction;
/// nothing reads them ambiently after that point.
#[derive(Clone)]
pub struct Config {
    pub token_secret: String,
    pub session_ttl_secs: i64,
    pub host: String,
    pub port: u16,
    pub store_name: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            token_secret: env::var("CHIRP_TOKEN_SECRET")
                .unwrap_or_else(|_| "chirp-dev-secret".to_string()),
            session_ttl_secs: env::var("CHIRP_SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(3600),
            host: env::var("CHIRP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("CHIRP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8000),
            store_name: env::var("CHIRP_STORE").unwrap_or_else(|_| "default".to_string()),
        }
    }
}
