//! Cookie-keyed session state and the authentication guard

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::model::Credential;

/// Cookie name for the session token
pub const SESSION_COOKIE_NAME: &str = "spotify_library_session";

pub const SESSION_EXPIRED: &str = "Session expired. Please sign in again.";

/// How long a session without a credential survives without being written
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// One-shot message shown by the next rendered page
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flash {
    Notice(String),
    Alert(String),
}

/// Everything the server remembers about one browser
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub credential: Option<Credential>,
    /// `state` of an authorization request that has not come back yet
    pub oauth_state: Option<String>,
    pub flash: Option<Flash>,
    /// Playlist id -> owner id, as last rendered by the library view
    pub playlist_owners: HashMap<String, String>,
}

impl Session {
    pub fn authenticated(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
            ..Default::default()
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.credential.as_ref().map(|c| c.user_id.as_str())
    }

    pub fn take_flash(&mut self) -> Option<Flash> {
        self.flash.take()
    }

    /// Forget the signed-in user but keep the browser's session.
    pub fn sign_out(&mut self) {
        self.credential = None;
        self.playlist_owners.clear();
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated(Credential),
    Unauthenticated,
}

/// Check that the session holds a credential that is still valid at `now`.
pub fn ensure_authenticated(session: &Session, now: DateTime<Utc>) -> AuthResult {
    match &session.credential {
        Some(credential) if !credential.is_expired(now) => AuthResult::Authenticated(credential.clone()),
        Some(credential) => {
            tracing::info!(user_id = %credential.user_id, "Credential expired");
            AuthResult::Unauthenticated
        }
        None => AuthResult::Unauthenticated,
    }
}

/// A session bound to the current request
#[derive(Clone, Debug)]
pub struct SessionHandle {
    pub token: String,
    pub session: Session,
    /// The browser did not present a known token, so a cookie must be set
    pub is_new: bool,
}

impl SessionHandle {
    /// Bind `session` to a brand-new token, replacing whatever the browser had.
    pub fn fresh(session: Session) -> Self {
        Self {
            token: uuid::Uuid::new_v4().to_string(),
            session,
            is_new: true,
        }
    }
}

#[derive(Clone, Debug)]
struct StoredSession {
    session: Session,
    touched_at: Instant,
}

impl StoredSession {
    fn new(session: Session) -> Self {
        Self {
            session,
            touched_at: Instant::now(),
        }
    }

    /// Signed-in sessions live as long as their credential, anonymous ones
    /// until they sit idle for `idle_timeout`.
    fn is_live(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        match &self.session.credential {
            Some(credential) => !credential.is_expired(now),
            None => self.touched_at.elapsed() < idle_timeout,
        }
    }
}

/// In-memory session storage shared by all requests
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Load the session named by the request cookie, or start a fresh one.
    pub async fn resolve(&self, headers: &HeaderMap) -> SessionHandle {
        if let Some(token) = get_token_from_cookie(headers) {
            let sessions = self.sessions.read().await;
            if let Some(stored) = sessions.get(&token) {
                return SessionHandle {
                    token,
                    session: stored.session.clone(),
                    is_new: false,
                };
            }
        }

        SessionHandle::fresh(Session::default())
    }

    /// Store a session under a token that was not handed out before.
    /// Sessions that are no longer live are dropped on the way.
    pub async fn create(&self, token: &str, session: Session) {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, stored| stored.is_live(now, self.idle_timeout));
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = sessions.len(), "Dropped stale sessions");
        }

        sessions.insert(token.to_string(), StoredSession::new(session));
    }

    /// Write back a session loaded at the start of a request. Returns false
    /// without storing anything when the token was destroyed meanwhile.
    pub async fn update(&self, token: &str, session: Session) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(token) {
            Some(stored) => {
                *stored = StoredSession::new(session);
                true
            }
            None => false,
        }
    }

    pub async fn destroy(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    #[cfg(test)]
    pub async fn get(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).map(|stored| stored.session.clone())
    }

    /// Store a session under a new random token and return the token.
    #[cfg(test)]
    pub async fn insert(&self, session: Session) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.create(&token, session).await;
        token
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract session token from cookie header
fn get_token_from_cookie(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(&format!("{}=", SESSION_COOKIE_NAME)) {
            return Some(value.to_string());
        }
    }
    None
}

/// Create a Set-Cookie header value for the session token
pub fn create_session_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE_NAME, token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Duration;

    fn credential(expires_at: DateTime<Utc>) -> Credential {
        Credential {
            access_token: "valid_token".to_string(),
            expires_at,
            user_id: "spotify-uid-123".to_string(),
        }
    }

    #[test]
    fn test_guard_accepts_live_credential() {
        let now = Utc::now();
        let session = Session::authenticated(credential(now + Duration::hours(1)));

        assert_eq!(
            ensure_authenticated(&session, now),
            AuthResult::Authenticated(credential(now + Duration::hours(1)))
        );
    }

    #[test]
    fn test_guard_rejects_missing_or_expired_credential() {
        let now = Utc::now();
        assert_eq!(ensure_authenticated(&Session::default(), now), AuthResult::Unauthenticated);

        let expired = Session::authenticated(credential(now - Duration::seconds(1)));
        assert_eq!(ensure_authenticated(&expired, now), AuthResult::Unauthenticated);
    }

    #[test]
    fn test_cookie_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; spotify_library_session=abc123; other=1"),
        );
        assert_eq!(get_token_from_cookie(&headers), Some("abc123".to_string()));
        assert_eq!(get_token_from_cookie(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_resolve_known_and_unknown_tokens() {
        let store = SessionStore::new();
        let token = store
            .insert(Session::authenticated(credential(Utc::now() + Duration::hours(1))))
            .await;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&create_session_cookie(&token)).unwrap(),
        );
        let handle = store.resolve(&headers).await;
        assert!(!handle.is_new);
        assert_eq!(handle.token, token);
        assert_eq!(handle.session.user_id(), Some("spotify-uid-123"));

        let fresh = store.resolve(&HeaderMap::new()).await;
        assert!(fresh.is_new);
        assert!(fresh.session.credential.is_none());

        store.destroy(&token).await;
        assert!(store.get(&token).await.is_none());
    }

    #[test]
    fn test_sign_out_keeps_flash() {
        let mut session = Session::authenticated(credential(Utc::now()));
        session.playlist_owners.insert("pl1".to_string(), "spotify-uid-123".to_string());
        session.flash = Some(Flash::Alert(SESSION_EXPIRED.to_string()));

        session.sign_out();
        assert!(session.credential.is_none());
        assert!(session.playlist_owners.is_empty());
        assert_eq!(session.take_flash(), Some(Flash::Alert(SESSION_EXPIRED.to_string())));
        assert_eq!(session.take_flash(), None);
    }

    #[tokio::test]
    async fn test_update_never_recreates_destroyed_session() {
        let store = SessionStore::new();
        let token = store
            .insert(Session::authenticated(credential(Utc::now() + Duration::hours(1))))
            .await;

        let mut session = store.get(&token).await.unwrap();
        session.flash = Some(Flash::Notice("Saved".to_string()));
        assert!(store.update(&token, session.clone()).await);
        assert_eq!(store.get(&token).await, Some(session.clone()));

        store.destroy(&token).await;
        assert!(!store.update(&token, session).await);
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_create_drops_stale_sessions() {
        let store = SessionStore::with_idle_timeout(std::time::Duration::ZERO);
        for _ in 0..1000 {
            store.insert(Session::default()).await;
        }
        assert_eq!(store.len().await, 1);

        let live = store
            .insert(Session::authenticated(credential(Utc::now() + Duration::hours(1))))
            .await;
        store
            .insert(Session::authenticated(credential(Utc::now() - Duration::seconds(1))))
            .await;
        store.insert(Session::default()).await;

        assert!(store.get(&live).await.is_some());
        assert_eq!(store.len().await, 2);
    }
}
