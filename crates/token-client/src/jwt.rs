//! Reading token expiry on the client.
//!
//! WARNING: the payload is decoded WITHOUT verifying the signature. The client
//! does not hold the signing secret and only needs `exp` to time proactive
//! refreshes. Nothing decoded here may be used to make an authorization or
//! trust decision; the server validates every token it receives.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use domain::TokenKind;

use crate::error::{ClientError, ClientResult};

/// Claims read from an unverified token. Timing hints only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnverifiedClaims {
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub token_type: Option<TokenKind>,
}

/// Decode the payload of `token` without checking its signature or expiry.
pub fn decode_unverified(token: &str) -> ClientResult<UnverifiedClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| ClientError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    #[test]
    fn test_reads_expiry_from_any_signature() {
        let exp = Utc::now().timestamp() + 600;
        let token = encode(
            &Header::new(Algorithm::HS512),
            &json!({"exp": exp, "iat": exp - 900, "sub": "42", "token_type": "access"}),
            &EncodingKey::from_secret(b"a secret the client never sees"),
        )
        .unwrap();

        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.iat, Some(exp - 900));
        assert_eq!(claims.token_type, Some(TokenKind::Access));
    }

    #[test]
    fn test_expired_tokens_still_decode() {
        let exp = Utc::now().timestamp() - 3600;
        let token = encode(
            &Header::default(),
            &json!({"exp": exp}),
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();

        assert_eq!(decode_unverified(&token).unwrap().exp, exp);
    }

    #[test]
    fn test_garbage_has_no_expiry() {
        assert!(decode_unverified("definitely.not.ajwt").is_err());
        assert!(matches!(
            decode_unverified(""),
            Err(ClientError::InvalidToken(_))
        ));
    }
}
