//! Authentication Middleware
//!
//! Resolves the calling user for protected routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::shared::error::AppError;
use crate::startup::AppState;

/// Header carrying a user id asserted by a trusted gateway. Honoured only when
/// `auth.allow_query_id` is set.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user extension
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Authentication middleware: bearer token first, then the trusted id header.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();

    let token = match headers.get(AUTHORIZATION) {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid authorization header".into()))?;
            Some(
                value
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| {
                        AppError::Unauthorized("Invalid authorization header format".into())
                    })?
                    .to_owned(),
            )
        }
        None => None,
    };

    let trusted_id = match headers.get(USER_ID_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .ok_or_else(|| AppError::Unauthorized("Invalid user id header".into()))?,
        ),
        None => None,
    };

    let user_id = state
        .authenticate(token.as_deref(), trusted_id)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}
