use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use utoipa::ToSchema;

use crate::errors::{
    self, f, Error, ErrorResponse, RequestInfo, ResultExt, INVALID_ARGUMENT, NOT_FOUND,
};
use crate::fields;
use crate::logging::LogOptions;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub users: UserDirectory,
    pub log_options: LogOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Avatar {
    pub url: String,
}

/// In-memory user store backed by a simulated avatar service
pub struct UserDirectory {
    users: HashMap<u64, User>,
    avatar_latency: Duration,
    avatar_timeout: Duration,
}

impl UserDirectory {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users.into_iter().map(|user| (user.id, user)).collect(),
            avatar_latency: Duration::ZERO,
            avatar_timeout: Duration::from_secs(2),
        }
    }

    /// Latency of the avatar backend and how long a lookup may wait for it
    pub fn with_avatar_backend(mut self, latency: Duration, timeout: Duration) -> Self {
        self.avatar_latency = latency;
        self.avatar_timeout = timeout;
        self
    }

    pub fn get(&self, id: u64) -> Result<&User, Error> {
        self.users.get(&id).ok_or_else(|| {
            f().message(format!("user {id} not found"))
                .user_message("user not found")
                .logs(fields!["user_id" => id])
                .mark(&NOT_FOUND)
                .domain("users")
                .err()
        })
    }

    pub async fn avatar(&self, id: u64) -> Result<Avatar, Error> {
        let user = self.get(id)?;

        tokio::time::timeout(self.avatar_timeout, tokio::time::sleep(self.avatar_latency))
            .await
            .wrap_err(format!("fetching avatar for user {}", user.id))?;

        Ok(Avatar {
            url: format!("/avatars/{}.png", user.id),
        })
    }
}

fn parse_user_id(raw: &str) -> Result<u64, Error> {
    raw.parse::<u64>().map_err(|source| {
        f().caused_by(format!("invalid user id {raw:?}"), source)
            .user_message("user id must be a positive integer")
            .mark(&INVALID_ARGUMENT)
            .domain("users")
            .err()
    })
}

fn reject(state: &AppState, request: &RequestInfo, err: &Error) -> Response {
    errors::into_response(err, request, &state.log_options)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = serde_json::Value)
    )
)]
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "errs",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = String, Path, description = "Numeric user ID")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 400, description = "Malformed user ID", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    request: RequestInfo,
    Path(id): Path<String>,
) -> Result<Json<User>, Response> {
    debug!("Get user request: id={}", id);

    let user = parse_user_id(&id)
        .and_then(|id| state.users.get(id).cloned())
        .map_err(|err| reject(&state, &request, &err))?;

    Ok(Json(user))
}

/// Get a user's avatar
#[utoipa::path(
    get,
    path = "/users/{id}/avatar",
    tag = "users",
    params(
        ("id" = String, Path, description = "Numeric user ID")
    ),
    responses(
        (status = 200, description = "Avatar location", body = Avatar),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 504, description = "Avatar backend timed out", body = ErrorResponse)
    )
)]
pub async fn get_avatar(
    State(state): State<AppState>,
    request: RequestInfo,
    Path(id): Path<String>,
) -> Result<Json<Avatar>, Response> {
    debug!("Get avatar request: id={}", id);

    let id = parse_user_id(&id).map_err(|err| reject(&state, &request, &err))?;
    let avatar = state
        .users
        .avatar(id)
        .await
        .map_err(|err| reject(&state, &request, &err))?;

    Ok(Json(avatar))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::get_http_code;
    use axum::http::StatusCode;

    fn directory() -> UserDirectory {
        UserDirectory::new([User {
            id: 1,
            name: "Ada".to_string(),
        }])
    }

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("17").unwrap(), 17);

        let err = parse_user_id("abc").unwrap_err();
        assert_eq!(err.to_string(), "invalid user id \"abc\"");
        assert_eq!(err.safe_message(), Some("user id must be a positive integer"));
        assert!(err.find::<std::num::ParseIntError>().is_some());
        assert_eq!(get_http_code(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_user_is_not_found() {
        let err = directory().get(2).unwrap_err();

        assert_eq!(err.to_string(), "user 2 not found");
        assert_eq!(err.domain(), Some("users"));
        assert_eq!(get_http_code(&err), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_avatar_timeout_is_gateway_timeout() {
        let users = directory()
            .with_avatar_backend(Duration::from_millis(200), Duration::from_millis(10));

        let err = users.avatar(1).await.unwrap_err();

        assert_eq!(err.to_string(), "fetching avatar for user 1: deadline has elapsed");
        assert_eq!(get_http_code(&err), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_avatar_found() {
        let avatar = directory().avatar(1).await.unwrap();
        assert_eq!(avatar.url, "/avatars/1.png");
    }
}
