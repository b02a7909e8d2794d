use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::model::Claims;
use crate::core::config::AuthConfig;
use crate::core::error::{AppError, Result};

/// A signed access token and the instant it stops being valid
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
}

/// Issues and verifies HMAC-signed access tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    ttl: ChronoDuration,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            algorithm: config.algorithm,
            ttl: ChronoDuration::from_std(config.access_token_ttl)
                .unwrap_or_else(|_| ChronoDuration::minutes(60)),
        }
    }

    pub fn issue(
        &self,
        user_id: i64,
        username: &str,
        role: &str,
        session_id: Uuid,
    ) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: username.to_string(),
            uid: user_id,
            sid: session_id,
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in: self.ttl.num_seconds(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                AppError::Unauthorized("Invalid credentials".to_string())
            })
    }
}

/// Hex-encoded SHA-256 of a token, as stored on the session row
pub fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service(secret: &str) -> JwtService {
        JwtService::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            algorithm: Algorithm::HS256,
            access_token_ttl: Duration::from_secs(3600),
        })
    }

    #[test]
    fn test_issue_then_verify() {
        let jwt = service("test-secret");
        let sid = Uuid::new_v4();
        let issued = jwt.issue(42, "ada", "user", sid).unwrap();

        assert_eq!(issued.expires_in, 3600);

        let claims = jwt.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "ada");
        assert_eq!(claims.uid, 42);
        assert_eq!(claims.sid, sid);
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn test_rejects_token_signed_with_other_secret() {
        let issued = service("secret-a")
            .issue(1, "ada", "user", Uuid::new_v4())
            .unwrap();

        let err = service("secret-b").verify(&issued.token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_rejects_expired_token() {
        let jwt = service("test-secret");
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "ada".to_string(),
            uid: 1,
            sid: Uuid::new_v4(),
            role: "user".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &jwt.encoding_key).unwrap();

        assert!(jwt.verify(&token).is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(service("test-secret").verify("not.a.token").is_err());
    }

    #[test]
    fn test_token_fingerprint_is_stable_hex() {
        let a = token_fingerprint("abc");
        assert_eq!(a, token_fingerprint("abc"));
        assert_ne!(a, token_fingerprint("abd"));
        assert_eq!(a.len(), 64);
    }
}
