//! Session store for browser visitors.
//!
//! Sessions live in memory behind a tokio `RwLock`. A session is keyed by a
//! random hex token carried in an `HttpOnly` cookie, and holds the signed-in
//! user (if any), pending flash messages, and the path to return to after
//! login. Anonymous visitors get a session the first time one is needed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use salvo::http::cookie::{Cookie, SameSite};
use serde::Serialize;
use tokio::sync::RwLock;
use userdesk_data::UserId;

use crate::config::SessionConfig;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid session token")]
    InvalidSessionToken,

    #[error("Session expired")]
    SessionExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// One-shot status message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct SessionData {
    user_id: Option<UserId>,
    flashes: Vec<Flash>,
    return_to: Option<String>,
    expires_at: DateTime<Utc>,
}

impl SessionData {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    ttl: Duration,
    cookie_name: String,
    secure_cookie: bool,
}

impl SessionManager {
    /// 32 bytes, 64 hex characters.
    const TOKEN_LENGTH: usize = 32;

    pub fn new(conf: &SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::hours(conf.ttl_hours.max(1)),
            cookie_name: conf.cookie_name.clone(),
            secure_cookie: conf.secure_cookie,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Session cookie carrying `token`.
    pub fn cookie(&self, token: &SessionToken) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token.token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .build()
    }

    /// Starts an anonymous session.
    pub async fn create_session(&self) -> SessionToken {
        self.insert(None, Vec::new()).await
    }

    async fn insert(&self, user_id: Option<UserId>, flashes: Vec<Flash>) -> SessionToken {
        let token = Self::generate_token();
        let expires_at = Utc::now() + self.ttl;
        self.sessions.write().await.insert(
            token.clone(),
            SessionData {
                user_id,
                flashes,
                return_to: None,
                expires_at,
            },
        );
        SessionToken { token, expires_at }
    }

    /// Checks the token and returns the signed-in user, if any.
    ///
    /// Expired sessions are dropped on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<UserId>, SessionError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(token) {
            Some(session) if session.is_live(Utc::now()) => Ok(session.user_id),
            Some(_) => {
                sessions.remove(token);
                Err(SessionError::SessionExpired)
            }
            None => Err(SessionError::InvalidSessionToken),
        }
    }

    /// Signs `user_id` in under a fresh token.
    ///
    /// The previous session, if any, is destroyed; its pending flash
    /// messages carry over. Returns the new token and the stored
    /// `return_to` path.
    pub async fn login(
        &self,
        previous: Option<&str>,
        user_id: UserId,
    ) -> (SessionToken, Option<String>) {
        let old = match previous {
            Some(token) => self.sessions.write().await.remove(token),
            None => None,
        };
        let (flashes, return_to) = old
            .map(|data| (data.flashes, data.return_to))
            .unwrap_or_default();
        (self.insert(Some(user_id), flashes).await, return_to)
    }

    /// Signs the user out but keeps the session for flash messages.
    pub async fn logout(&self, token: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(token) {
            session.user_id = None;
        }
    }

    pub async fn push_flash(&self, token: &str, flash: Flash) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(token)
            .ok_or(SessionError::InvalidSessionToken)?;
        session.flashes.push(flash);
        Ok(())
    }

    /// Drains pending flash messages.
    pub async fn take_flashes(&self, token: &str) -> Vec<Flash> {
        self.sessions
            .write()
            .await
            .get_mut(token)
            .map(|session| std::mem::take(&mut session.flashes))
            .unwrap_or_default()
    }

    pub async fn set_return_to(&self, token: &str, path: String) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(token)
            .ok_or(SessionError::InvalidSessionToken)?;
        session.return_to = Some(path);
        Ok(())
    }

    /// Removes the session entirely. Idempotent.
    pub async fn invalidate_session(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Drops every expired session and returns how many were removed.
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Utc::now();
        sessions.retain(|_, session| session.is_live(now));
        before - sessions.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn generate_token() -> String {
        let mut bytes = [0u8; Self::TOKEN_LENGTH];
        rand::thread_rng().fill(&mut bytes);
        hex::encode(bytes)
    }
}
