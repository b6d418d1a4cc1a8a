use spin_sdk::http::{Request, Response};

use crate::auth::{identify, TokenService};
use crate::core::db::{self, KeyStore};
use crate::core::errors::ApiError;

/// Flips the follow edge from `requester_id` to `target_id` and returns the
/// resulting following set. The target is not checked for existence and
/// self-follow is not rejected; the edge is whatever the caller asked for.
pub fn toggle_following(
    store: &dyn KeyStore,
    requester_id: &str,
    target_id: &str,
) -> Result<Vec<String>, ApiError> {
    if target_id.is_empty() {
        return Err(ApiError::BadRequest("Target user ID required".to_string()));
    }

    let following = db::toggle_following(store, requester_id, target_id)?;
    tracing::info!(
        user_id = %requester_id,
        target_id = %target_id,
        now_following = following.contains(&target_id.to_string()),
        "follow toggled"
    );
    Ok(following)
}

// === HTTP handler ===

pub fn handle_toggle(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let identity = identify(tokens, &req);
    let user_id = match identity.require() {
        Ok(id) => id.to_string(),
        Err(e) => return Ok(e.into()),
    };

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let target_id = value["other_user_id"].as_str().unwrap_or_default();

    match toggle_following(store, &user_id, target_id) {
        Ok(following) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&following)?)
            .build()),
        Err(e) => Ok(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::MemoryStore;

    #[test]
    fn single_toggle_flips_membership() {
        let store = MemoryStore::new();

        let following = toggle_following(&store, "a", "b").unwrap();
        assert_eq!(following, vec!["b".to_string()]);
    }

    #[test]
    fn double_toggle_restores_the_original_set() {
        let store = MemoryStore::new();
        toggle_following(&store, "a", "c").unwrap();
        let before = db::load_following(&store, "a").unwrap();

        toggle_following(&store, "a", "b").unwrap();
        let after = toggle_following(&store, "a", "b").unwrap();

        assert_eq!(after, before);
    }

    #[test]
    fn nonexistent_target_still_toggles() {
        let store = MemoryStore::new();
        let following = toggle_following(&store, "a", "no-such-user").unwrap();
        assert_eq!(following, vec!["no-such-user".to_string()]);
    }

    #[test]
    fn empty_target_is_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            toggle_following(&store, "a", "").unwrap_err(),
            ApiError::BadRequest(_)
        ));
    }

    #[test]
    fn self_follow_is_permitted() {
        let store = MemoryStore::new();
        let following = toggle_following(&store, "a", "a").unwrap();
        assert_eq!(following, vec!["a".to_string()]);
    }
}
