#![forbid(unsafe_code)]

//! Principal attachment. The `user-id` header names a stored user; anything
//! that does not resolve leaves the request anonymous and lets the gate
//! decide.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use qc_core::{Principal, Role, authorize};
use std::convert::Infallible;

pub const USER_HEADER: &str = "user-id";

#[derive(Clone, Debug, Default)]
pub struct CurrentUser(pub Option<Principal>);

impl CurrentUser {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }

    pub fn require(&self, role: Role) -> Result<&Principal, ApiError> {
        Ok(authorize(self.principal(), role)?)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(user_id) = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
        else {
            return Ok(Self(None));
        };

        let lookup = state
            .blocking({
                let user_id = user_id.clone();
                move |services| services.users.principal(&user_id)
            })
            .await;
        match lookup {
            Ok(Ok(Some(principal))) => {
                tracing::debug!(user_id = %principal.user_id, role = %principal.role, "user attached");
                Ok(Self(Some(principal)))
            }
            Ok(Ok(None)) => Ok(Self(None)),
            Ok(Err(err)) => {
                tracing::warn!(user_id = %user_id, error = %err, "user lookup failed");
                Ok(Self(None))
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err.message(), "user lookup failed");
                Ok(Self(None))
            }
        }
    }
}
