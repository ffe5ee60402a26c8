//! Bearer-token verification.
//!
//! The service never issues tokens; it only checks the ones presented in the
//! `token` cookie against a shared HS256 secret.

use super::error::{FileManagerError, FileManagerResult};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decoded identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// `None` for any token that does not verify.
    async fn verify(&self, token: &str) -> Option<Identity>;
}

/// JWT claims accepted from the identity provider.
///
/// Providers differ on whether the user id is carried as `user_id` or only as
/// `sub`; `user_id` wins when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: u64,
}

pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Option<Identity> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| debug!("token validation failed: {}", e))
            .ok()?;
        let claims = data.claims;
        let user_id = claims
            .user_id
            .or(claims.sub)
            .filter(|id| !id.is_empty())?;
        Some(Identity {
            user_id,
            name: claims.name,
            email: claims.email,
        })
    }
}

/// Resolve an optional raw token into an identity or `AuthRequired`.
pub async fn identify(
    verifier: &dyn IdentityVerifier,
    token: Option<&str>,
) -> FileManagerResult<Identity> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(FileManagerError::AuthRequired)?;
    verifier
        .verify(token)
        .await
        .ok_or(FileManagerError::AuthRequired)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    pub(crate) const SECRET: &str = "test-secret-key-for-testing-only";

    pub(crate) fn token_for(user_id: &str, secret: &str, ttl_secs: i64) -> String {
        let claims = TokenClaims {
            sub: Some(user_id.to_string()),
            user_id: None,
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            exp: (Utc::now().timestamp() + ttl_secs) as u64,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let verifier = JwtIdentityVerifier::new(SECRET, None);
        let identity = verifier.verify(&token_for("u1", SECRET, 3600)).await.unwrap();
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn wrong_secret_expired_or_missing_token_is_rejected() {
        let verifier = JwtIdentityVerifier::new(SECRET, None);
        assert!(verifier.verify(&token_for("u1", "other", 3600)).await.is_none());
        assert!(verifier.verify(&token_for("u1", SECRET, -3600)).await.is_none());
        assert!(verifier.verify("not-a-jwt").await.is_none());

        assert!(matches!(
            identify(&verifier, None).await,
            Err(FileManagerError::AuthRequired)
        ));
        assert!(matches!(
            identify(&verifier, Some("")).await,
            Err(FileManagerError::AuthRequired)
        ));
    }
}
