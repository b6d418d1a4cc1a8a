use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use spin_sdk::http::{Request, Response};

use crate::config::Config;
use crate::core::db::{self, KeyStore};
use crate::core::errors::ApiError;
use crate::core::helpers::verify_password;
use crate::models::models::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Signs and verifies session tokens. The secret and TTL come in at
/// construction; the service never touches the environment itself.
pub struct TokenService {
    secret: String,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, ttl_secs: i64) -> Self {
        TokenService {
            secret: secret.into(),
            ttl_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        TokenService::new(config.token_secret.clone(), config.session_ttl_secs)
    }

    pub fn issue(&self, user_id: &str) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now().timestamp() + self.ttl_secs) as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| ApiError::Internal("Failed to sign session token".to_string()))
    }

    /// Fails closed: an unverifiable signature or a past expiry never
    /// yields claims. No leeway, so a token is dead the instant it expires.
    pub fn decode(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::InvalidToken)
    }
}

/// Per-request identity, derived from the bearer credential and dropped at
/// the end of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(String),
}

impl Identity {
    pub fn require(&self) -> Result<&str, ApiError> {
        match self {
            Identity::User(id) => Ok(id),
            Identity::Anonymous => Err(ApiError::AuthRequired),
        }
    }

    /// Owner check: the requester must be the user the operation acts on.
    pub fn require_owner(&self, owner_id: &str) -> Result<&str, ApiError> {
        let id = self.require()?;
        if id != owner_id {
            return Err(ApiError::Forbidden);
        }
        Ok(id)
    }
}

/// Derives the identity context from the `Authorization` header.
///
/// Downgrade policy: a missing header, a non-bearer scheme, or a token that
/// is malformed, tampered with or expired all resolve to `Anonymous` rather
/// than an error. The transport allows unauthenticated requests; each
/// operation enforces its own requirement through `Identity::require`.
pub fn identify(tokens: &TokenService, req: &Request) -> Identity {
    let auth_header = match req.header("Authorization").and_then(|h| h.as_str()) {
        Some(value) => value,
        None => return Identity::Anonymous,
    };

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return Identity::Anonymous,
    };

    match tokens.decode(token) {
        Ok(claims) => Identity::User(claims.sub),
        Err(_) => Identity::Anonymous,
    }
}

pub fn authenticate(
    store: &dyn KeyStore,
    tokens: &TokenService,
    email: &str,
    password: &str,
) -> Result<(String, User), ApiError> {
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::InvalidCredential);
    }

    // Absent account and wrong password are indistinguishable to the caller.
    let user_id = db::user_id_by_email(store, email)?.ok_or(ApiError::InvalidCredential)?;
    let user = db::load_user(store, &user_id)?.ok_or(ApiError::InvalidCredential)?;

    if !verify_password(password, &user.password) {
        return Err(ApiError::InvalidCredential);
    }

    let token = tokens.issue(&user.id)?;
    tracing::info!(user_id = %user.id, "session issued");
    Ok((token, user))
}

// === HTTP handler ===

pub fn login(store: &dyn KeyStore, tokens: &TokenService, req: Request) -> anyhow::Result<Response> {
    let creds: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let email = creds["email"].as_str().unwrap_or_default();
    let password = creds["password"].as_str().unwrap_or_default();

    match authenticate(store, tokens, email, password) {
        Ok((token, user)) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({
                "token": token,
                "user": user.public(),
            }))?)
            .build()),
        Err(e) => Ok(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::MemoryStore;
    use crate::core::helpers::hash_password;
    use spin_sdk::http::Method;

    fn service() -> TokenService {
        TokenService::new("test-secret", 3600)
    }

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = Request::builder();
        builder.method(Method::Get).uri("/user");
        if let Some(v) = value {
            builder.header("Authorization", v);
        }
        builder.body(Vec::<u8>::new()).build()
    }

    fn seed_user(store: &MemoryStore, id: &str, email: &str, password: &str) -> User {
        let user = User {
            id: id.to_string(),
            email: email.to_string(),
            password: hash_password(password).unwrap(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            user_name: Some("ada".to_string()),
            bio: None,
        };
        db::insert_user(store, &user).unwrap();
        user
    }

    #[test]
    fn issued_token_decodes_to_same_identity() {
        let tokens = service();
        let token = tokens.issue("u1").unwrap();
        let claims = tokens.decode(&token).unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let tokens = service();
        let other = TokenService::new("other-secret", 3600);
        let token = other.issue("u1").unwrap();
        assert_eq!(tokens.decode(&token).unwrap_err(), ApiError::InvalidToken);
    }

    #[test]
    fn expired_token_is_rejected_even_with_valid_signature() {
        let tokens = service();
        let stale = TokenService::new("test-secret", -60);
        let token = stale.issue("u1").unwrap();
        assert_eq!(tokens.decode(&token).unwrap_err(), ApiError::InvalidToken);
    }

    #[test]
    fn missing_or_malformed_bearer_is_anonymous() {
        let tokens = service();
        assert_eq!(identify(&tokens, &request_with_auth(None)), Identity::Anonymous);
        assert_eq!(
            identify(&tokens, &request_with_auth(Some("Basic abc"))),
            Identity::Anonymous
        );
        assert_eq!(
            identify(&tokens, &request_with_auth(Some("Bearer not-a-token"))),
            Identity::Anonymous
        );
    }

    #[test]
    fn expired_bearer_degrades_to_anonymous() {
        let tokens = service();
        let stale = TokenService::new("test-secret", -60);
        let token = stale.issue("u1").unwrap();
        let req = request_with_auth(Some(&format!("Bearer {}", token)));
        assert_eq!(identify(&tokens, &req), Identity::Anonymous);
    }

    #[test]
    fn valid_bearer_yields_authenticated_identity() {
        let tokens = service();
        let token = tokens.issue("u1").unwrap();
        let req = request_with_auth(Some(&format!("Bearer {}", token)));
        assert_eq!(identify(&tokens, &req), Identity::User("u1".to_string()));
    }

    #[test]
    fn guard_rejects_anonymous_and_non_owner() {
        assert_eq!(Identity::Anonymous.require(), Err(ApiError::AuthRequired));
        assert_eq!(
            Identity::Anonymous.require_owner("u1"),
            Err(ApiError::AuthRequired)
        );
        assert_eq!(
            Identity::User("u2".to_string()).require_owner("u1"),
            Err(ApiError::Forbidden)
        );
        assert_eq!(Identity::User("u1".to_string()).require_owner("u1"), Ok("u1"));
    }

    #[test]
    fn login_issues_token_for_correct_password_only() {
        let store = MemoryStore::new();
        let tokens = service();
        let user = seed_user(&store, "u1", "ada@example.com", "correct");

        assert_eq!(
            authenticate(&store, &tokens, "ada@example.com", "wrong").unwrap_err(),
            ApiError::InvalidCredential
        );
        assert_eq!(
            authenticate(&store, &tokens, "nobody@example.com", "correct").unwrap_err(),
            ApiError::InvalidCredential
        );

        let (token, logged_in) = authenticate(&store, &tokens, "ada@example.com", "correct").unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(tokens.decode(&token).unwrap().sub, user.id);
    }
}
