//! Who is calling.
//!
//! Authentication happens in front of this service; the auth layer forwards
//! the signed-in user's id in `X-User-Id`. No header means anonymous.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller {
    user_id: Option<i64>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Caller::anonymous());
        };

        raw.to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(Caller::user)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid {} header", USER_ID_HEADER)))
    }
}
