use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use spin_sdk::key_value::Store;

use crate::config::{email_key, following_key, post_key, posts_key, user_key, USERS_LIST_KEY};
use crate::models::models::{Post, User};

/// Key-addressed persistence boundary. The domain layer only ever talks to
/// this trait; the Spin key-value store backs it in production and
/// `MemoryStore` backs it in tests and the native adapter binary.
pub trait KeyStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

pub struct SpinStore {
    inner: Store,
}

impl SpinStore {
    pub fn open(name: &str) -> anyhow::Result<Self> {
        Ok(SpinStore {
            inner: Store::open(name)?,
        })
    }
}

impl KeyStore for SpinStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.inner.get(key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.inner.set(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.inner.delete(key)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

pub fn get_json<T: DeserializeOwned>(store: &dyn KeyStore, key: &str) -> anyhow::Result<Option<T>> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn set_json<T: Serialize>(store: &dyn KeyStore, key: &str, value: &T) -> anyhow::Result<()> {
    store.set(key, &serde_json::to_vec(value)?)
}

// === Users ===

pub fn load_user(store: &dyn KeyStore, user_id: &str) -> anyhow::Result<Option<User>> {
    get_json(store, &user_key(user_id))
}

pub fn save_user(store: &dyn KeyStore, user: &User) -> anyhow::Result<()> {
    set_json(store, &user_key(&user.id), user)
}

pub fn user_id_by_email(store: &dyn KeyStore, email: &str) -> anyhow::Result<Option<String>> {
    get_json(store, &email_key(email))
}

pub fn all_user_ids(store: &dyn KeyStore) -> anyhow::Result<Vec<String>> {
    Ok(get_json(store, USERS_LIST_KEY)?.unwrap_or_default())
}

/// Persists a new user: the record, the email index and the id roster.
pub fn insert_user(store: &dyn KeyStore, user: &User) -> anyhow::Result<()> {
    save_user(store, user)?;
    set_json(store, &email_key(&user.email), &user.id)?;

    let mut ids = all_user_ids(store)?;
    ids.push(user.id.clone());
    set_json(store, USERS_LIST_KEY, &ids)
}

/// Deletes whichever record the email index points at, along with the index
/// entry, the user's list keys and their roster slot. Post records stay;
/// they become unreachable through feeds once the posts list is gone.
pub fn delete_user_via_email(store: &dyn KeyStore, email: &str) -> anyhow::Result<Option<User>> {
    let user_id = match user_id_by_email(store, email)? {
        Some(id) => id,
        None => return Ok(None),
    };
    let user = load_user(store, &user_id)?;

    store.delete(&user_key(&user_id))?;
    store.delete(&email_key(email))?;
    store.delete(&posts_key(&user_id))?;
    store.delete(&following_key(&user_id))?;

    let mut ids = all_user_ids(store)?;
    ids.retain(|id| id != &user_id);
    set_json(store, USERS_LIST_KEY, &ids)?;

    Ok(user)
}

// === Follow edges ===
//
// Follow edges and post refs live under their own keys, one per user, so a
// follow toggle and a post append never rewrite the same record.

pub fn load_following(store: &dyn KeyStore, user_id: &str) -> anyhow::Result<Vec<String>> {
    Ok(get_json(store, &following_key(user_id))?.unwrap_or_default())
}

/// Strict toggle: present gets removed, absent gets added, exactly one of
/// the two per call. Membership stays unique.
pub fn toggle_following(
    store: &dyn KeyStore,
    user_id: &str,
    target_id: &str,
) -> anyhow::Result<Vec<String>> {
    let key = following_key(user_id);
    let mut following: Vec<String> = get_json(store, &key)?.unwrap_or_default();

    match following.iter().position(|id| id == target_id) {
        Some(idx) => {
            following.remove(idx);
        }
        None => following.push(target_id.to_string()),
    }

    set_json(store, &key, &following)?;
    Ok(following)
}

// === Posts ===

pub fn load_post(store: &dyn KeyStore, post_id: &str) -> anyhow::Result<Option<Post>> {
    get_json(store, &post_key(post_id))
}

pub fn save_post(store: &dyn KeyStore, post: &Post) -> anyhow::Result<()> {
    set_json(store, &post_key(&post.id), post)
}

pub fn delete_post_record(store: &dyn KeyStore, post_id: &str) -> anyhow::Result<()> {
    store.delete(&post_key(post_id))
}

pub fn load_post_ids(store: &dyn KeyStore, user_id: &str) -> anyhow::Result<Vec<String>> {
    Ok(get_json(store, &posts_key(user_id))?.unwrap_or_default())
}

pub fn append_post_id(store: &dyn KeyStore, user_id: &str, post_id: &str) -> anyhow::Result<()> {
    let key = posts_key(user_id);
    let mut ids: Vec<String> = get_json(store, &key)?.unwrap_or_default();
    ids.push(post_id.to_string());
    set_json(store, &key, &ids)
}

pub fn remove_post_id(store: &dyn KeyStore, user_id: &str, post_id: &str) -> anyhow::Result<()> {
    let key = posts_key(user_id);
    let mut ids: Vec<String> = get_json(store, &key)?.unwrap_or_default();
    ids.retain(|id| id != post_id);
    set_json(store, &key, &ids)
}

/// Every live post owned by `user_id`, in list order. Ids whose record is
/// gone are skipped.
pub fn posts_by_owner(store: &dyn KeyStore, user_id: &str) -> anyhow::Result<Vec<Post>> {
    let mut posts = Vec::new();
    for id in load_post_ids(store, user_id)? {
        if let Some(post) = load_post(store, &id)? {
            posts.push(post);
        }
    }
    Ok(posts)
}
