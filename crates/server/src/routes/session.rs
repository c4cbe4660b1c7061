#![forbid(unsafe_code)]

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use qc_core::Role;
use qc_storage::CustomerSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    success: bool,
    user_id: String,
    name: String,
    role: Role,
    department: Option<String>,
    customer_id: Option<String>,
    email: Option<String>,
}

pub(crate) async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = body.map_err(ApiError::json_body)?;
    let user_id = request.user_id.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    tracing::info!(user_id = %user_id, "login attempt");

    let found = state
        .blocking({
            let user_id = user_id.clone();
            move |services| services.users.authenticate(&user_id, &password)
        })
        .await?
        .map_err(|err| ApiError::storage("Server error", err))?;

    let Some(user) = found else {
        tracing::info!(user_id = %user_id, "login rejected");
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    };
    tracing::info!(user_id = %user.user_id, role = %user.role, "login accepted");
    Ok(Json(LoginResponse {
        success: true,
        user_id: user.user_id,
        name: user.name,
        role: user.role,
        department: user.department,
        customer_id: user.customer_id,
        email: user.email,
    }))
}

pub(crate) async fn customers(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<CustomerSummary>>, ApiError> {
    user.require(Role::Production)?;
    let customers = state
        .blocking(|services| services.users.customers())
        .await?
        .map_err(|err| ApiError::storage("Error loading customers", err))?;
    Ok(Json(customers))
}
