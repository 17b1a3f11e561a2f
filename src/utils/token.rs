// utils/token.rs
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorMessage, HttpError};

/// Claims of an access token issued by the managed auth service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<Value>,
}

impl TokenClaims {
    /// Role chosen at signup, stored in `user_metadata.role`.
    pub fn metadata_role(&self) -> Option<String> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.get("role"))
            .and_then(|r| r.as_str())
            .map(str::to_string)
    }
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<TokenClaims, HttpError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<TokenClaims>(&token.into(), &DecodingKey::from_secret(secret), &validation)
        .map(|token| token.claims)
        .map_err(|err| {
            if matches!(err.kind(), ErrorKind::ExpiredSignature) {
                tracing::debug!("Rejected expired access token");
            }
            HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())
        })
}

#[cfg(test)]
pub fn create_test_token(
    user_id: &str,
    metadata_role: Option<&str>,
    secret: &[u8],
) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: now,
        email: Some("agente@example.com".to_string()),
        user_metadata: metadata_role.map(|r| serde_json::json!({ "role": r })),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .expect("test token must encode")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_token_and_reads_signup_role() {
        let token = create_test_token("6f0c1e84-7b1c-4a57-9d1b-0c0c5c1c2f11", Some("agent"), b"secret");
        let claims = decode_token(token, b"secret").unwrap();
        assert_eq!(claims.sub, "6f0c1e84-7b1c-4a57-9d1b-0c0c5c1c2f11");
        assert_eq!(claims.metadata_role().as_deref(), Some("agent"));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = create_test_token("6f0c1e84-7b1c-4a57-9d1b-0c0c5c1c2f11", None, b"secret");
        let err = decode_token(token, b"other").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn missing_metadata_has_no_role() {
        let token = create_test_token("6f0c1e84-7b1c-4a57-9d1b-0c0c5c1c2f11", None, b"secret");
        let claims = decode_token(token, b"secret").unwrap();
        assert!(claims.metadata_role().is_none());
    }
}
