use spin_sdk::http::Response;
use std::fmt;

/// The single failure channel for every domain operation. Handlers convert
/// these into HTTP responses via the `From` impl below; nothing signals a
/// domain failure any other way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    AuthRequired,
    Forbidden,
    NotFound(String),
    AlreadyExists(String),
    InvalidCredential,
    InvalidToken,
    BadRequest(String),
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::AuthRequired => write!(f, "Authentication required"),
            ApiError::Forbidden => write!(f, "Not authorized for this operation"),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            ApiError::InvalidCredential => write!(f, "Invalid email or password"),
            ApiError::InvalidToken => write!(f, "Invalid session token"),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

fn json_error(status: u16, message: &str) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "error": message })).unwrap())
        .build()
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let message = err.to_string();
        match err {
            ApiError::AuthRequired | ApiError::InvalidCredential | ApiError::InvalidToken => {
                json_error(401, &message)
            }
            ApiError::Forbidden => json_error(403, &message),
            ApiError::NotFound(_) => json_error(404, &message),
            ApiError::AlreadyExists(_) => json_error(409, &message),
            ApiError::BadRequest(_) => json_error(400, &message),
            ApiError::Internal(_) => json_error(500, &message),
        }
    }
}
