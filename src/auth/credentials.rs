//! Login, profile maintenance and password changes for staff accounts.

use std::fmt;

use once_cell::sync::Lazy;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::jwt::TokenCodec;
use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;
use crate::model::account::Account;
use crate::store::AccountStore;
use crate::validation::{Validator, check_email, check_password_policy, check_username, normalize_email};

/// Verified against when the username is unknown, so both failure paths
/// spend the same time hashing.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("timing-equalizer").ok());

pub struct LoginOutcome {
    pub token: String,
    pub account: Account,
}

impl fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginOutcome")
            .field("token", &"<redacted>")
            .field("account_id", &self.account.id)
            .field("username", &self.account.username)
            .finish()
    }
}

fn check_login_input(username: &str, password: &str) -> Result<(), ApiError> {
    let mut v = Validator::new();
    if username.is_empty() {
        v.push("username", "Username is required");
    } else {
        check_username(&mut v, username);
    }
    if password.is_empty() {
        v.push("password", "Password is required");
    } else if password.chars().count() < 6 {
        v.push("password", "Password must be at least 6 characters");
    }
    v.finish()
}

/// Unknown user, wrong password and inactive account all yield the same
/// `InvalidCredentials`.
pub async fn login(
    accounts: &dyn AccountStore,
    codec: &TokenCodec,
    username: &str,
    password: &str,
) -> Result<LoginOutcome, ApiError> {
    let username = username.trim();
    check_login_input(username, password)?;

    let Some(account) = accounts.find_by_username(username).await? else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            verify_password(password, dummy);
        }
        info!("Invalid credentials");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(password, &account.password_hash) || !account.is_active {
        info!(user_id = %account.id, "Invalid credentials");
        return Err(ApiError::InvalidCredentials);
    }

    let token = codec
        .issue(account.id, account.role)
        .map_err(|e| ApiError::Internal(e.into()))?;

    if let Err(e) = accounts.record_login(account.id).await {
        // intentionally not failing login
        warn!(error = %e, "Failed to record last login");
    }

    info!(user_id = %account.id, "Login successful");
    Ok(LoginOutcome { token, account })
}

pub async fn load_profile(accounts: &dyn AccountStore, user_id: Uuid) -> Result<Account, ApiError> {
    accounts
        .find_account(user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))
}

pub async fn update_profile(
    accounts: &dyn AccountStore,
    user_id: Uuid,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Account, ApiError> {
    let username = username.map(str::trim).map(str::to_string);
    let email = email.map(normalize_email);

    let mut v = Validator::new();
    if let Some(u) = &username {
        check_username(&mut v, u);
    }
    if let Some(e) = &email {
        check_email(&mut v, "email", e);
    }
    v.finish()?;

    if let Some(u) = &username
        && accounts.username_taken(u, Some(user_id)).await?
    {
        return Err(ApiError::UniquenessConflict {
            entity: "User",
            field: "username".into(),
        });
    }
    if let Some(e) = &email
        && accounts.account_email_taken(e, Some(user_id)).await?
    {
        return Err(ApiError::UniquenessConflict {
            entity: "User",
            field: "email".into(),
        });
    }

    let updated = accounts
        .update_profile(user_id, username, email)
        .await
        .map_err(|e| ApiError::from(e).for_entity("User"))?
        .ok_or(ApiError::NotFound("User"))?;

    debug!(user_id = %user_id, "Profile updated");
    Ok(updated)
}

pub async fn change_password(
    accounts: &dyn AccountStore,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    let mut v = Validator::new();
    if current_password.is_empty() {
        v.push("currentPassword", "Current password is required");
    }
    check_password_policy(&mut v, "newPassword", new_password);
    if !current_password.is_empty() && current_password == new_password {
        v.push("newPassword", "New password must be different from current password");
    }
    v.finish()?;

    let account = load_profile(accounts, user_id).await?;
    if !verify_password(current_password, &account.password_hash) {
        return Err(ApiError::validation("currentPassword", "Current password is incorrect"));
    }

    let hash = hash_password(new_password)?;
    if !accounts.set_password_hash(user_id, &hash).await? {
        return Err(ApiError::NotFound("User"));
    }

    info!(user_id = %user_id, "Password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::account::NewAccount;
    use crate::model::role::Role;
    use crate::store::MemoryStore;

    fn codec() -> TokenCodec {
        TokenCodec::new("unit-test-secret-unit-test-secret-0000", "iss", "aud", 3600)
    }

    async fn store_with(username: &str, password: &str, role: Role) -> (MemoryStore, Account) {
        let store = MemoryStore::new();
        let account = store
            .create_account(NewAccount {
                username: username.into(),
                password_hash: hash_password(password).unwrap(),
                email: Some(format!("{username}@corp.com")),
                role,
            })
            .await
            .unwrap();
        (store, account)
    }

    #[actix_web::test]
    async fn login_issues_token_for_the_account() {
        let (store, account) = store_with("admin", "Admin123", Role::Admin).await;
        let outcome = login(&store, &codec(), "admin", "Admin123").await.unwrap();

        let claims = codec().verify(&outcome.token).unwrap();
        assert_eq!(claims.sub, account.id.to_string());
        assert_eq!(claims.role, Role::Admin);

        let reloaded = store.find_account(account.id).await.unwrap().unwrap();
        assert!(reloaded.last_login_at.is_some());
    }

    #[actix_web::test]
    async fn debug_output_hides_secrets() {
        let (store, _) = store_with("admin", "Admin123", Role::Admin).await;
        let outcome = login(&store, &codec(), "admin", "Admin123").await.unwrap();

        let shown = format!("{outcome:?}");
        assert!(shown.contains("admin"));
        assert!(!shown.contains(&outcome.token));
        assert!(!shown.contains(&outcome.account.password_hash));
    }

    #[actix_web::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let (store, _) = store_with("admin", "Admin123", Role::Admin).await;

        let wrong_pw = login(&store, &codec(), "admin", "Wrong123").await.unwrap_err();
        let unknown = login(&store, &codec(), "nobody", "Admin123").await.unwrap_err();

        assert!(matches!(wrong_pw, ApiError::InvalidCredentials));
        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
    }

    #[actix_web::test]
    async fn username_lookup_is_case_sensitive() {
        let (store, _) = store_with("admin", "Admin123", Role::Admin).await;
        let err = login(&store, &codec(), "ADMIN", "Admin123").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[actix_web::test]
    async fn inactive_account_cannot_log_in() {
        let (store, account) = store_with("hruser", "Hruser123", Role::Hr).await;
        store.set_active(account.id, false).await.unwrap();

        let err = login(&store, &codec(), "hruser", "Hruser123").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[actix_web::test]
    async fn short_input_is_a_validation_failure() {
        let store = MemoryStore::new();
        let err = login(&store, &codec(), "ab", "123").await.unwrap_err();
        match err {
            ApiError::ValidationFailed(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[actix_web::test]
    async fn same_new_password_is_rejected_and_hash_kept() {
        let (store, account) = store_with("admin", "Admin123", Role::Admin).await;

        let err = change_password(&store, account.id, "Admin123", "Admin123")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)));

        let reloaded = store.find_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, account.password_hash);
    }

    #[actix_web::test]
    async fn wrong_current_password_is_rejected() {
        let (store, account) = store_with("admin", "Admin123", Role::Admin).await;
        let err = change_password(&store, account.id, "Nope1234", "Fresh123")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)));
    }

    #[actix_web::test]
    async fn changed_password_is_used_for_login() {
        let (store, account) = store_with("admin", "Admin123", Role::Admin).await;
        change_password(&store, account.id, "Admin123", "Fresh123").await.unwrap();

        assert!(login(&store, &codec(), "admin", "Admin123").await.is_err());
        assert!(login(&store, &codec(), "admin", "Fresh123").await.is_ok());
    }

    #[actix_web::test]
    async fn profile_email_collision_is_case_insensitive() {
        let (store, admin) = store_with("admin", "Admin123", Role::Admin).await;
        store
            .create_account(NewAccount {
                username: "hruser".into(),
                password_hash: "x".into(),
                email: Some("hr@corp.com".into()),
                role: Role::Hr,
            })
            .await
            .unwrap();

        let err = update_profile(&store, admin.id, None, Some("HR@Corp.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UniquenessConflict { ref field, .. } if field == "email"));

        // keeping one's own address is fine
        let same = update_profile(&store, admin.id, None, Some("ADMIN@corp.com"))
            .await
            .unwrap();
        assert_eq!(same.email.as_deref(), Some("admin@corp.com"));
    }

    #[actix_web::test]
    async fn profile_username_must_be_unique_and_long_enough() {
        let (store, admin) = store_with("admin", "Admin123", Role::Admin).await;
        store
            .create_account(NewAccount {
                username: "taken".into(),
                password_hash: "x".into(),
                email: None,
                role: Role::Hr,
            })
            .await
            .unwrap();

        let err = update_profile(&store, admin.id, Some("taken"), None).await.unwrap_err();
        assert!(matches!(err, ApiError::UniquenessConflict { ref field, .. } if field == "username"));

        let err = update_profile(&store, admin.id, Some("ab"), None).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)));

        let too_long = "u".repeat(65);
        let err = update_profile(&store, admin.id, Some(&too_long), None).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(ref e) if e[0].field == "username"));

        let renamed = update_profile(&store, admin.id, Some("  chief "), None).await.unwrap();
        assert_eq!(renamed.username, "chief");
    }
}
