use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, Identity, IdTokenClaims, TokenVerifier};

/// HS256 tokens signed with a shared secret, same claim shape as Firebase
/// ID tokens. Used for local tooling and tests where no provider is reachable.
#[derive(Clone)]
pub struct SharedSecretVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SharedSecretVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for `identity` that expires after `ttl`
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = IdTokenClaims {
            sub: identity.uid.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Provider(format!("token generation failed: {}", e)))
    }
}

#[async_trait]
impl TokenVerifier for SharedSecretVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        let data = decode::<IdTokenClaims>(token, &self.decoding_key, &validation)?;
        let identity = Identity::from_claims(data.claims)?;
        tracing::info!("User {} authenticated successfully", identity.uid);
        Ok(identity)
    }
}
