//! Out-of-band account provisioning. There is no signup route; staff
//! accounts are created from the command line (and the default admin is
//! seeded when running on the in-memory store).

use anyhow::{Context, bail};
use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::model::account::{Account, NewAccount};
use crate::model::role::Role;
use crate::store::AccountStore;
use crate::validation::{Validator, check_email, check_username, normalize_email};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@company.com";
const FALLBACK_ADMIN_PASSWORD: &str = "admin123";

fn ensure_valid(v: Validator) -> anyhow::Result<()> {
    if v.is_empty() {
        return Ok(());
    }
    let problems: Vec<String> = v
        .into_errors()
        .into_iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect();
    bail!(problems.join("; "))
}

pub async fn create_user(
    accounts: &dyn AccountStore,
    username: &str,
    password: &str,
    role: Role,
    email: Option<&str>,
) -> anyhow::Result<Account> {
    let username = username.trim();
    let email = email.map(normalize_email);

    let mut v = Validator::new();
    check_username(&mut v, username);
    if password.chars().count() < 6 {
        v.push("password", "Password must be at least 6 characters");
    }
    if let Some(e) = &email {
        check_email(&mut v, "email", e);
    }
    ensure_valid(v)?;

    if accounts.username_taken(username, None).await? {
        bail!("username {username:?} is already taken");
    }
    if let Some(e) = &email
        && accounts.account_email_taken(e, None).await?
    {
        bail!("email {e:?} is already in use");
    }

    let account = accounts
        .create_account(NewAccount {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            email,
            role,
        })
        .await
        .context("Failed to create account")?;

    info!(user_id = %account.id, username = %account.username, role = %account.role, "Account created");
    Ok(account)
}

/// Creates the `admin` account unless it already exists. Returns `None`
/// when nothing was created.
pub async fn seed_admin(
    accounts: &dyn AccountStore,
    password: Option<&str>,
) -> anyhow::Result<Option<Account>> {
    if accounts.find_by_username(DEFAULT_ADMIN_USERNAME).await?.is_some() {
        info!("Admin account already exists");
        return Ok(None);
    }

    let password = match password {
        Some(p) => p,
        None => {
            warn!("DEFAULT_ADMIN_PASSWORD not set, seeding admin with the fallback password; change it after first login");
            FALLBACK_ADMIN_PASSWORD
        }
    };

    let account = create_user(
        accounts,
        DEFAULT_ADMIN_USERNAME,
        password,
        Role::Admin,
        Some(DEFAULT_ADMIN_EMAIL),
    )
    .await?;
    Ok(Some(account))
}

pub async fn set_active(
    accounts: &dyn AccountStore,
    username: &str,
    active: bool,
) -> anyhow::Result<()> {
    let account = accounts
        .find_by_username(username.trim())
        .await?
        .with_context(|| format!("no account named {username:?}"))?;

    accounts.set_active(account.id, active).await?;
    info!(user_id = %account.id, active, "Account activation changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::store::MemoryStore;

    #[actix_web::test]
    async fn seed_admin_is_idempotent() {
        let store = MemoryStore::new();

        let first = seed_admin(&store, Some("Admin123")).await.unwrap();
        let account = first.expect("admin created");
        assert_eq!(account.role, Role::Admin);
        assert!(verify_password("Admin123", &account.password_hash));

        assert!(seed_admin(&store, Some("Other123")).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn create_user_rejects_taken_username_and_short_input() {
        let store = MemoryStore::new();
        create_user(&store, "hruser", "Hruser123", Role::Hr, None).await.unwrap();

        assert!(create_user(&store, "hruser", "Hruser123", Role::Hr, None).await.is_err());
        assert!(create_user(&store, "ab", "Hruser123", Role::Hr, None).await.is_err());
        assert!(create_user(&store, "another", "123", Role::Hr, None).await.is_err());

        let err = create_user(&store, &"u".repeat(65), "Hruser123", Role::Hr, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot exceed 64"));
    }

    #[actix_web::test]
    async fn create_user_rejects_taken_email_case_insensitively() {
        let store = MemoryStore::new();
        create_user(&store, "first", "Passw0rd", Role::Hr, Some("hr@corp.com")).await.unwrap();

        let err = create_user(&store, "second", "Passw0rd", Role::Hr, Some("HR@corp.com"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already in use"));
    }

    #[actix_web::test]
    async fn set_active_toggles_and_reports_unknown_names() {
        let store = MemoryStore::new();
        let account = create_user(&store, "hruser", "Hruser123", Role::Hr, None).await.unwrap();

        set_active(&store, "hruser", false).await.unwrap();
        let reloaded = store.find_account(account.id).await.unwrap().unwrap();
        assert!(!reloaded.is_active);

        assert!(set_active(&store, "ghost", true).await.is_err());
    }
}
