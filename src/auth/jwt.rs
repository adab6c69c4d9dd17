use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::model::role::Role;
use crate::models::Claims;

#[derive(Error, Debug)]
pub enum TokenError {
    /// Bad signature, expired, wrong issuer/audience or not a JWT at all.
    /// Callers never learn which.
    #[error("invalid token")]
    Invalid,

    #[error("token generation failed: {0}")]
    Generation(String),
}

/// Issues and verifies stateless HS256 session tokens. There is no
/// revocation list; a token stays valid until `exp`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, issuer: &str, audience: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            &config.jwt_audience,
            config.token_ttl_secs,
        )
    }

    pub fn issue(&self, account_id: Uuid, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iss", "aud"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(kind = ?e.kind(), "Token rejected");
                TokenError::Invalid
            })
    }

    /// Verifies and extracts the account id.
    pub fn verify_account(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = self.verify(token)?;
        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, "employee-directory", "employee-directory-admin", 604_800)
    }

    #[test]
    fn issued_token_verifies_to_same_account() {
        let id = Uuid::new_v4();
        let token = codec().issue(id, Role::Admin).unwrap();

        let claims = codec().verify(&token).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 604_800);
        assert_eq!(codec().verify_account(&token).unwrap(), id);
    }

    #[test]
    fn tampered_token_is_invalid() {
        let token = codec().issue(Uuid::new_v4(), Role::Hr).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let sig = parts[2].clone();
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        parts[2] = format!("{flipped}{}", &sig[1..]);

        assert!(matches!(codec().verify(&parts.join(".")), Err(TokenError::Invalid)));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let other = TokenCodec::new(
            "another-secret-that-is-also-long-enough",
            "employee-directory",
            "employee-directory-admin",
            60,
        );
        let token = other.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert!(codec().verify(&token).is_err());
    }

    #[test]
    fn issuer_and_audience_must_match() {
        let wrong_iss = TokenCodec::new(SECRET, "someone-else", "employee-directory-admin", 60);
        let wrong_aud = TokenCodec::new(SECRET, "employee-directory", "someone-else", 60);

        let t1 = wrong_iss.issue(Uuid::new_v4(), Role::Admin).unwrap();
        let t2 = wrong_aud.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert!(codec().verify(&t1).is_err());
        assert!(codec().verify(&t2).is_err());
    }

    #[test]
    fn expired_token_is_invalid() {
        // well past the default leeway
        let expired = TokenCodec::new(SECRET, "employee-directory", "employee-directory-admin", -3600);
        let token = expired.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert!(matches!(codec().verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(codec().verify("not.a.token").is_err());
        assert!(codec().verify("").is_err());
    }
}
