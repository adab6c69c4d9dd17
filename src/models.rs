use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[serde(default)]
    #[schema(example = "admin")]
    pub username: String,
    #[serde(default)]
    #[schema(example = "Admin123")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ProfileUpdateDto {
    #[schema(example = "admin")]
    pub username: Option<String>,
    #[schema(example = "admin@company.com", format = "email")]
    pub email: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordDto {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    #[schema(example = "NewPass123")]
    pub new_password: String,
}

/// Session token payload. `sub` is the account id; the role is advisory,
/// the gate always re-reads the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub jti: String,
}
