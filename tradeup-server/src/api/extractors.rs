//! Custom Axum extractors for request identity.
//!
//! Authentication happens upstream: the gateway in front of this server
//! verifies the session and forwards the user id in the
//! `Tradeup-User-Id` header.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tradeup_sdk::objects::UserId;

use crate::state::AppState;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "Tradeup-User-Id";

/// The user on whose behalf the request is made.
pub struct CallerId(pub UserId);

/// Errors that can occur while extracting [`CallerId`].
#[derive(Debug, thiserror::Error)]
pub enum CallerIdError {
    #[error("missing Tradeup-User-Id header")]
    MissingHeader,
    #[error("invalid Tradeup-User-Id header")]
    InvalidHeader,
}

impl IntoResponse for CallerIdError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            CallerIdError::MissingHeader => {
                (StatusCode::UNAUTHORIZED, "missing Tradeup-User-Id header")
            }
            CallerIdError::InvalidHeader => {
                (StatusCode::BAD_REQUEST, "invalid Tradeup-User-Id header")
            }
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for CallerId {
    type Rejection = CallerIdError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(CallerIdError::MissingHeader)?
            .to_str()
            .map_err(|_| CallerIdError::InvalidHeader)?
            .trim();
        if value.is_empty() {
            return Err(CallerIdError::InvalidHeader);
        }
        Ok(CallerId(UserId::from(value)))
    }
}
