use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::{debug, error};

use crate::auth::auth::AuthUser;
use crate::auth::jwt::TokenCodec;
use crate::error::ApiError;
use crate::store::AccountStore;

fn reject(req: ServiceRequest, err: ApiError) -> ServiceResponse<BoxBody> {
    let resp = err.error_response();
    req.into_response(resp)
}

/// Resolves the bearer token into an [`AuthUser`]. Every failure, whatever
/// its cause, produces the same 401.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let (Some(codec), Some(accounts)) = (
        req.app_data::<Data<TokenCodec>>().cloned(),
        req.app_data::<Data<dyn AccountStore>>().cloned(),
    ) else {
        error!("Auth middleware is missing app data");
        return Ok(reject(req, ApiError::Internal(anyhow::anyhow!("app data missing"))));
    };

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        debug!("Missing bearer token");
        return Ok(reject(req, ApiError::Unauthenticated));
    };

    let account_id = match codec.verify_account(&token) {
        Ok(id) => id,
        Err(_) => return Ok(reject(req, ApiError::Unauthenticated)),
    };

    let account = match accounts.find_account(account_id).await {
        Ok(Some(account)) if account.is_active => account,
        Ok(_) => {
            debug!(%account_id, "Token for unknown or inactive account");
            return Ok(reject(req, ApiError::Unauthenticated));
        }
        Err(e) => return Ok(reject(req, ApiError::from(e))),
    };

    req.extensions_mut().insert(AuthUser {
        user_id: account.id,
        username: account.username,
        role: account.role,
    });

    next.call(req).await
}
