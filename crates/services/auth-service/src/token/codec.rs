//! HS256 encoding and verification of claim sets.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use domain::ClaimSet;

use super::TokenError;

/// Signs and verifies [`ClaimSet`]s with a shared secret.
///
/// Only HS256 is accepted. Issuer and audience must match, with no leeway.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("keys", &"[REDACTED]")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `claims` into a compact JWT.
    pub fn encode(&self, claims: &ClaimSet) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify `token` and return its claims.
    ///
    /// The signature is checked before any claim is read. Expiry is checked
    /// again against the current time after the library's own check.
    pub fn decode(&self, token: &str) -> Result<ClaimSet, TokenError> {
        let data = decode::<ClaimSet>(token, &self.decoding_key, &self.validation)
            .map_err(map_jwt_error)?;

        if data.claims.is_expired_at(Utc::now()) {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::invalid("signature mismatch"),
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::invalid("unexpected signing algorithm")
        }
        ErrorKind::InvalidIssuer => TokenError::invalid("unexpected issuer"),
        ErrorKind::InvalidAudience => TokenError::invalid("unexpected audience"),
        ErrorKind::MissingRequiredClaim(claim) => {
            TokenError::invalid(format!("missing claim: {}", claim))
        }
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::invalid("malformed token")
        }
        _ => TokenError::invalid(err.to_string()),
    }
}
