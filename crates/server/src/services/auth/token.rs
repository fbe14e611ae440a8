//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying the account id as `sub`, the account role,
//! and `iat`/`exp` in unix seconds. The three read operations answer
//! different questions so the HTTP layer can pick a status for each failure:
//!
//! - [`TokenAuthority::extract_id`] - is this a token we signed?
//! - [`TokenAuthority::is_expired`] - has its validity window passed?
//! - [`TokenAuthority::verify`] - is it a live token for this account?

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use device_warranty_core::UserRole;

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::User;

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id, stringified.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity_secs: i64,
}

/// Mints and checks bearer tokens.
///
/// Cheap to clone; the signing material is shared read-only.
#[derive(Clone)]
pub struct TokenAuthority {
    keys: Arc<Keys>,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("validity_secs", &self.keys.validity_secs)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    #[must_use]
    pub fn new(secret: &SecretString, validity: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(bytes),
                decoding: DecodingKey::from_secret(bytes),
                validity_secs: i64::try_from(validity.as_secs()).unwrap_or(i64::MAX),
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, config.validity)
    }

    /// Issue a token for `user`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a token for `user` as if minted at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            role: Some(user.role),
            iat,
            exp: iat.saturating_add(self.keys.validity_secs),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys.encoding,
        )?)
    }

    /// Decode and verify the signature, ignoring expiration.
    fn signed_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::MalformedToken)
    }

    /// Return the subject of a token we signed. Expiration is not checked.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if the token cannot be parsed or
    /// its signature does not verify.
    pub fn extract_id(&self, token: &str) -> Result<String, AuthError> {
        self.signed_claims(token).map(|claims| claims.sub)
    }

    /// Whether the token's expiration instant has been reached.
    ///
    /// The signature is not checked, so only call this on a token that
    /// [`extract_id`](Self::extract_id) accepted. Unreadable tokens count
    /// as expired.
    #[must_use]
    pub fn is_expired(&self, token: &str) -> bool {
        self.is_expired_at(token, Utc::now())
    }

    fn is_expired_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map_or(true, |data| now.timestamp() >= data.claims.exp)
    }

    /// True iff the token is signed by us, unexpired, and bound to `user`.
    #[must_use]
    pub fn verify(&self, token: &str, user: &User) -> bool {
        let now = Utc::now();
        self.signed_claims(token)
            .is_ok_and(|claims| now.timestamp() < claims.exp && claims.sub == user.id.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use device_warranty_core::{Email, Phone, UserId};

    use super::*;

    const SECRET: &str = "kX9#mP2$vL7@nQ4&wR8*jT3^bY6!cF1%";

    fn authority() -> TokenAuthority {
        TokenAuthority::new(
            &SecretString::from(SECRET.to_owned()),
            Duration::from_secs(24 * 60 * 60),
        )
    }

    fn user(id: i64) -> User {
        User {
            id: UserId::new(id),
            full_name: "Test User".to_owned(),
            email: Email::parse("a@x.com").unwrap(),
            phone: Phone::parse("111").unwrap(),
            address: "Somewhere 1".to_owned(),
            role: UserRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_extract_and_verify() {
        let tokens = authority();
        let alice = user(7);
        let token = tokens.issue(&alice).unwrap();

        assert_eq!(tokens.extract_id(&token).unwrap(), "7");
        assert!(!tokens.is_expired(&token));
        assert!(tokens.verify(&token, &alice));
        assert!(!tokens.verify(&token, &user(8)));
    }

    #[test]
    fn test_expired_token_still_extracts() {
        let tokens = authority();
        let alice = user(7);
        let token = tokens
            .issue_at(&alice, Utc::now() - TimeDelta::hours(25))
            .unwrap();

        assert!(tokens.is_expired(&token));
        assert!(!tokens.verify(&token, &alice));
        assert_eq!(tokens.extract_id(&token).unwrap(), "7");
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let tokens = TokenAuthority::new(&SecretString::from(SECRET.to_owned()), Duration::ZERO);
        let alice = user(1);
        let issued = Utc::now();
        let token = tokens.issue_at(&alice, issued).unwrap();

        assert!(tokens.is_expired_at(&token, issued));
        assert!(!tokens.is_expired_at(&token, issued - TimeDelta::seconds(1)));
    }

    #[test]
    fn test_non_token_is_malformed() {
        let tokens = authority();
        assert!(matches!(
            tokens.extract_id("not-a-token"),
            Err(AuthError::MalformedToken)
        ));
        assert!(matches!(tokens.extract_id(""), Err(AuthError::MalformedToken)));
        assert!(tokens.is_expired("not-a-token"));
        assert!(!tokens.verify("not-a-token", &user(1)));
    }

    #[test]
    fn test_foreign_signature_is_malformed() {
        let other = TokenAuthority::new(
            &SecretString::from("Zq8!rT5@yU2#iO9$pA4%sD7^fG1&hJ6*".to_owned()),
            Duration::from_secs(3600),
        );
        let token = other.issue(&user(7)).unwrap();

        let tokens = authority();
        assert!(matches!(
            tokens.extract_id(&token),
            Err(AuthError::MalformedToken)
        ));
        assert!(!tokens.verify(&token, &user(7)));
    }

    #[test]
    fn test_claims_carry_role() {
        let tokens = authority();
        let mut admin = user(3);
        admin.role = UserRole::Admin;
        let token = tokens.issue(&admin).unwrap();

        let claims = tokens.signed_claims(&token).unwrap();
        assert_eq!(claims.role, Some(UserRole::Admin));
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }
}
