use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use propdb_core::{Role, User};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The authenticated caller, stored as a request extension by
/// [`require_user`].
#[derive(Debug, Clone)]
pub struct Caller(pub User);

#[derive(Debug)]
struct ApiKey {
    token: Vec<u8>,
    user: User,
}

/// Bearer tokens and the identities they resolve to.
#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Arc<Vec<ApiKey>>,
}

impl AuthState {
    /// Builds auth config from `PROPDB_API_KEYS`.
    ///
    /// In development, empty/missing keys leave every authenticated route
    /// answering 401. In non-development envs, empty/missing keys fail startup.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("PROPDB_API_KEYS").unwrap_or_default();
        Self::from_raw(&raw, is_development)
    }

    /// Parses comma-separated `user_id:role:token` entries.
    pub fn from_raw(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let keys = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(i, entry)| {
                parse_key(entry).with_context(|| format!("PROPDB_API_KEYS entry {i}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if keys.is_empty() {
            if !is_development {
                anyhow::bail!(
                    "PROPDB_API_KEYS is required outside development; provide comma-separated user_id:role:token entries"
                );
            }
            tracing::warn!("PROPDB_API_KEYS not set; authenticated routes will reject every request");
        }

        Ok(Self {
            keys: Arc::new(keys),
        })
    }

    /// Compares against every key so timing does not reveal which one matched.
    fn resolve(&self, token: &str) -> Option<&User> {
        let mut found = None;
        for key in self.keys.iter() {
            let matches: bool = key.token.as_slice().ct_eq(token.as_bytes()).into();
            if matches && found.is_none() {
                found = Some(&key.user);
            }
        }
        found
    }
}

fn parse_key(entry: &str) -> anyhow::Result<ApiKey> {
    let mut parts = entry.splitn(3, ':').map(str::trim);
    let (Some(user_id), Some(role), Some(token)) = (parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("expected user_id:role:token");
    };
    if user_id.is_empty() || token.is_empty() {
        anyhow::bail!("user_id and token must not be empty");
    }
    let role: Role = role.parse()?;

    Ok(ApiKey {
        token: token.as_bytes().to_vec(),
        user: User {
            id: user_id.to_owned(),
            email: None,
            role,
        },
    })
}

#[derive(Debug)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every API route.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }

    #[must_use]
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Resolves the bearer token to a [`Caller`] or answers 401.
pub async fn require_user(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    let user = extract_bearer_token(req.headers().get(AUTHORIZATION))
        .and_then(|token| auth.resolve(token))
        .cloned();

    match user {
        Some(user) => {
            req.extensions_mut().insert(Caller(user));
            next.run(req).await
        }
        None => ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid bearer token",
        )
        .into_response(),
    }
}

/// Lets admins through. Anyone else gets the same 404 an unknown route gives.
///
/// Must run after [`require_user`].
pub async fn require_admin(req: Request, next: Next) -> Response {
    let is_admin = req
        .extensions()
        .get::<Caller>()
        .is_some_and(|caller| caller.0.is_admin());

    if is_admin {
        next.run(req).await
    } else {
        if let Some(caller) = req.extensions().get::<Caller>() {
            tracing::debug!(user_id = %caller.0.id, path = %req.uri().path(), "non-admin on admin route");
        }
        ApiError::new(request_id_of(&req), "not_found", "not found").into_response()
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        drop(window);
        tracing::warn!(path = %req.uri().path(), "rate limit exceeded");
        return ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn api_keys_resolve_to_user_and_role() {
        let auth = AuthState::from_raw("u-1:admin:secret-a, u-2:user:secret-b", false).unwrap();

        let admin = auth.resolve("secret-a").expect("admin key");
        assert_eq!(admin.id, "u-1");
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(auth.resolve("secret-b").map(|u| u.role), Some(Role::User));
        assert!(auth.resolve("secret").is_none());
        assert!(auth.resolve("").is_none());
    }

    #[test]
    fn token_may_contain_colons() {
        let auth = AuthState::from_raw("u-1:user:abc:def", false).unwrap();
        assert_eq!(auth.resolve("abc:def").map(|u| u.id.as_str()), Some("u-1"));
    }

    #[test]
    fn malformed_entries_fail_startup() {
        assert!(AuthState::from_raw("u-1:user", true).is_err());
        assert!(AuthState::from_raw("u-1:owner:tok", true).is_err());
        assert!(AuthState::from_raw(":user:tok", true).is_err());
    }

    #[test]
    fn empty_keys_only_allowed_in_development() {
        assert!(AuthState::from_raw("", true).is_ok());
        assert!(AuthState::from_raw(" , ", false).is_err());
    }
}
