use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::convert::Infallible;

use super::error::ApiError;
use super::AppState;

/// Who is calling. A bearer token from the admin set makes the caller privileged;
/// anything else, including no token, is an ordinary caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    privileged: bool,
}

impl Caller {
    pub fn require_privileged(&self) -> Result<(), ApiError> {
        if self.privileged {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let privileged = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| state.is_admin_token(token.trim()))
            .unwrap_or(false);

        Ok(Caller { privileged })
    }
}
