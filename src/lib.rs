use spin_sdk::http::{IntoResponse, Request, Response};
use spin_sdk::http_component;

pub mod auth;
pub mod config;
pub mod core;
pub mod feed;
pub mod follow;
pub mod models;
pub mod posts;
pub mod users;

use crate::auth::TokenService;
use crate::config::Config;
use crate::core::db::{KeyStore, SpinStore};

// === Component entrypoint ===

#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let config = Config::from_env();
    let store = SpinStore::open(&config.store_name)?;
    let tokens = TokenService::from_config(&config);
    route_with(&store, &tokens, req)
}

/// Dispatches one request against the operation surface. The transport
/// layer stays thin: the session, authorization and validation rules all
/// live in the handlers this table points at.
pub fn route_with(
    store: &dyn KeyStore,
    tokens: &TokenService,
    req: Request,
) -> anyhow::Result<Response> {
    let method = req.method().to_string();
    let path = req.path().to_string();

    match (method.as_str(), path.as_str()) {
        ("POST", "/users") => users::create_user(store, req),
        ("POST", "/login") => auth::login(store, tokens, req),
        ("GET", "/user") => users::get_profile(store, tokens, req),
        ("GET", "/users") => users::list_users(store, tokens, req),
        ("PUT", p) if p.starts_with("/users/") => users::update_user(store, tokens, req),
        ("DELETE", p) if p.starts_with("/users/") => users::delete_user(store, tokens, req),
        ("POST", "/following") => follow::handle_toggle(store, tokens, req),
        ("GET", p) if p.starts_with("/feed/") => feed::handle_feed(store, tokens, req),
        ("POST", "/posts") => posts::create_post(store, tokens, req),
        ("GET", p) if p.starts_with("/posts/") => posts::get_post(store, tokens, req),
        ("PUT", p) if p.starts_with("/posts/") => posts::edit_post(store, tokens, req),
        ("DELETE", p) if p.starts_with("/posts/") => posts::delete_post(store, tokens, req),
        _ => Ok(Response::builder().status(404).body("Not found").build()),
    }
}
