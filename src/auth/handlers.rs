use actix_web::{HttpResponse, http::StatusCode, web};
use tracing::{debug, info, instrument};

use crate::{
    api::response::{self, LoginData, LoginResponse},
    auth::{auth::AuthUser, credentials, jwt::TokenCodec},
    error::ApiError,
    model::account::PublicAccount,
    models::{ChangePasswordDto, LoginReqDto, ProfileUpdateDto},
    store::AccountStore,
};

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Malformed input", body = response::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = response::ErrorResponse),
        (status = 429, description = "Too many login attempts")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(accounts, codec, payload),
    fields(username = %payload.username.trim())
)]
pub async fn login(
    payload: web::Json<LoginReqDto>,
    accounts: web::Data<dyn AccountStore>,
    codec: web::Data<TokenCodec>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let outcome =
        credentials::login(accounts.get_ref(), &codec, &payload.username, &payload.password)
            .await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        data: LoginData {
            token: outcome.token,
            user: PublicAccount::from(&outcome.account),
        },
    }))
}

/// Current account
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Public account projection", body = response::ProfileResponse),
        (status = 401, description = "Not authenticated", body = response::ErrorResponse)
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
#[instrument(name = "auth_profile", skip(auth, accounts), fields(user_id = %auth.user_id))]
pub async fn get_profile(
    auth: AuthUser,
    accounts: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, ApiError> {
    let account = credentials::load_profile(accounts.get_ref(), auth.user_id).await?;
    Ok(response::profile(None, PublicAccount::from(&account)))
}

/// Update username and/or email
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = ProfileUpdateDto,
    responses(
        (status = 200, description = "Profile updated", body = response::ProfileResponse),
        (status = 400, description = "Validation failed", body = response::ErrorResponse),
        (status = 409, description = "Username or email in use", body = response::ErrorResponse)
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
#[instrument(
    name = "auth_update_profile",
    skip(auth, accounts, payload),
    fields(user_id = %auth.user_id)
)]
pub async fn update_profile(
    auth: AuthUser,
    accounts: web::Data<dyn AccountStore>,
    payload: web::Json<ProfileUpdateDto>,
) -> Result<HttpResponse, ApiError> {
    let account = credentials::update_profile(
        accounts.get_ref(),
        auth.user_id,
        payload.username.as_deref(),
        payload.email.as_deref(),
    )
    .await?;

    Ok(response::profile(
        Some("Profile updated successfully"),
        PublicAccount::from(&account),
    ))
}

/// Change the caller's password
#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    request_body = ChangePasswordDto,
    responses(
        (status = 200, description = "Password changed", body = response::MessageResponse),
        (status = 400, description = "Validation failed or wrong current password", body = response::ErrorResponse)
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
#[instrument(
    name = "auth_change_password",
    skip(auth, accounts, payload),
    fields(user_id = %auth.user_id)
)]
pub async fn change_password(
    auth: AuthUser,
    accounts: web::Data<dyn AccountStore>,
    payload: web::Json<ChangePasswordDto>,
) -> Result<HttpResponse, ApiError> {
    credentials::change_password(
        accounts.get_ref(),
        auth.user_id,
        &payload.current_password,
        &payload.new_password,
    )
    .await?;

    Ok(response::message(StatusCode::OK, "Password changed successfully"))
}

/// Tokens are stateless, so logging out only tells the client to drop its
/// copy. The token stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = response::MessageResponse)
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(auth: AuthUser) -> HttpResponse {
    debug!(user_id = %auth.user_id, "Logout");
    response::message(StatusCode::OK, "Logged out successfully")
}
