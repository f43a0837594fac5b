//! In-memory browser sessions keyed by a random cookie.
//!
//! A session only holds the user's access token and the pending OAuth
//! `state`. Sessions are lost on restart, which just means logging in again.
//! Sessions older than the store's TTL are dropped whenever a new one starts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const COOKIE_NAME: &str = "squasher_session";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    /// Expected `state` parameter of the OAuth callback
    pub oauth_state: Option<String>,
}

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry {
    session: Session,
    created: Instant,
}

impl Entry {
    fn new() -> Self {
        Entry {
            session: Session::default(),
            created: Instant::now(),
        }
    }

    fn expired(&self, ttl: Duration) -> bool {
        self.created.elapsed() > ttl
    }
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        SessionStore {
            inner: Arc::default(),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // Updates are single assignments, so a poisoned map is still consistent
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start an empty session and return its id, evicting expired ones.
    pub fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.lock();
        sessions.retain(|_, entry| !entry.expired(self.ttl));
        sessions.insert(id.clone(), Entry::new());
        id
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.lock()
            .get(id)
            .filter(|entry| !entry.expired(self.ttl))
            .map(|entry| entry.session.clone())
    }

    /// Apply `f` to the session, creating it if the id is unknown.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut Session)) {
        f(&mut self.lock().entry(id.to_string()).or_insert_with(Entry::new).session);
    }

    pub fn remove(&self, id: &str) {
        self.lock().remove(id);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Session id from the request's cookies, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value binding the browser to session `id`.
pub fn session_cookie(id: &str) -> String {
    format!("{COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value that removes the session cookie.
pub fn expired_cookie() -> String {
    format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_create_get_update_remove() {
        let store = SessionStore::default();
        let id = store.create();
        assert_eq!(store.get(&id), Some(Session::default()));

        store.update(&id, |s| s.access_token = Some("gho_abc".to_string()));
        assert_eq!(store.get(&id).unwrap().access_token.as_deref(), Some("gho_abc"));

        store.remove(&id);
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = SessionStore::default();
        let a = store.create();
        let b = store.create();
        assert_ne!(a, b);
        store.update(&a, |s| s.access_token = Some("token-a".to_string()));
        assert!(store.get(&b).unwrap().access_token.is_none());
    }

    #[test]
    fn test_create_evicts_expired_sessions() {
        let store = SessionStore::with_ttl(Duration::from_millis(1));
        let old = store.create();
        store.update(&old, |s| s.oauth_state = Some("abandoned".to_string()));
        std::thread::sleep(Duration::from_millis(20));

        assert!(store.get(&old).is_none());
        let fresh = store.create();
        assert_eq!(store.len(), 1);
        assert!(store.get(&fresh).is_some());
    }

    #[test]
    fn test_live_sessions_survive_create() {
        let store = SessionStore::default();
        let a = store.create();
        let b = store.create();
        assert_eq!(store.len(), 2);
        assert!(store.get(&a).is_some());
        assert!(store.get(&b).is_some());
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; squasher_session=abc-123; other=1"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_session_id_absent_or_empty() {
        let mut headers = HeaderMap::new();
        assert!(session_id(&headers).is_none());
        headers.insert(COOKIE, HeaderValue::from_static("squasher_session="));
        assert!(session_id(&headers).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc");
        assert!(cookie.starts_with("squasher_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(expired_cookie().contains("Max-Age=0"));
    }
}
