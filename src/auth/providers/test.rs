//! In-memory adapter for end-to-end testing.
//!
//! User and session tables are process-wide maps shared between the gate and
//! sibling test API routes. The factory refuses to build this adapter in
//! production.

use async_trait::async_trait;
use axum::http::HeaderMap;
use dashmap::DashMap;
use uuid::Uuid;

use crate::auth::adapter::{AuthAdapter, AuthError, SessionInfo, UserSummary};
use crate::http::cookies::request_cookie;

pub const TEST_SESSION_COOKIE: &str = "test_session";

/// Shared in-memory user/session store doubling as an adapter.
#[derive(Default)]
pub struct TestAdapter {
    users: DashMap<String, UserSummary>,
    sessions: DashMap<String, String>,
}

impl TestAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a user; returns the stored summary.
    pub fn create_user(&self, email: &str, role: Option<&str>) -> UserSummary {
        let user = UserSummary {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            role: role.map(str::to_string),
        };
        self.users.insert(user.id.clone(), user.clone());
        user
    }

    /// Open a session for an existing user; `None` for unknown users.
    pub fn create_session(&self, user_id: &str) -> Option<String> {
        if !self.users.contains_key(user_id) {
            return None;
        }
        let session_id = Uuid::new_v4().to_string();
        self.sessions.insert(session_id.clone(), user_id.to_string());
        Some(session_id)
    }

    pub fn destroy_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Look a user up by email, for the sign-in test route.
    pub fn find_user_by_email(&self, email: &str) -> Option<UserSummary> {
        self.users
            .iter()
            .find(|entry| entry.value().email.as_deref() == Some(email))
            .map(|entry| entry.value().clone())
    }

    fn session_from_headers(&self, headers: &HeaderMap) -> Option<(String, String)> {
        let session_id = request_cookie(headers, TEST_SESSION_COOKIE)?;
        let user_id = self.sessions.get(&session_id)?.value().clone();
        Some((session_id, user_id))
    }
}

#[async_trait]
impl AuthAdapter for TestAdapter {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<UserSummary>, AuthError> {
        Ok(self
            .session_from_headers(headers)
            .and_then(|(_, user_id)| self.users.get(&user_id).map(|u| u.value().clone())))
    }

    async fn session(&self, headers: &HeaderMap) -> Result<Option<SessionInfo>, AuthError> {
        Ok(self
            .session_from_headers(headers)
            .map(|(id, user_id)| SessionInfo { id, user_id }))
    }

    fn session_cookie(&self) -> Option<&'static str> {
        Some(TEST_SESSION_COOKIE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use axum::http::HeaderValue;

    fn headers_with_session(session_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{TEST_SESSION_COOKIE}={session_id}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn session_cookie_resolves_user() {
        let adapter = TestAdapter::new();
        let user = adapter.create_user("user@example.com", Some("admin"));
        let session_id = adapter.create_session(&user.id).unwrap();

        let headers = headers_with_session(&session_id);
        let current = adapter.current_user(&headers).await.unwrap().unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.role.as_deref(), Some("admin"));

        let session = adapter.session(&headers).await.unwrap().unwrap();
        assert_eq!(session.user_id, user.id);
    }

    #[tokio::test]
    async fn destroyed_session_is_unauthenticated() {
        let adapter = TestAdapter::new();
        let user = adapter.create_user("user@example.com", None);
        let session_id = adapter.create_session(&user.id).unwrap();
        adapter.destroy_session(&session_id);

        let headers = headers_with_session(&session_id);
        assert!(adapter.current_user(&headers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_user_cannot_open_session() {
        let adapter = TestAdapter::new();
        assert!(adapter.create_session("ghost").is_none());
    }

    #[tokio::test]
    async fn no_cookie_is_unauthenticated() {
        let adapter = TestAdapter::new();
        assert!(adapter
            .current_user(&HeaderMap::new())
            .await
            .unwrap()
            .is_none());
    }
}
