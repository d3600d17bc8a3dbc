use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use tracing::{info, warn};

use super::{AuthError, Identity, IdTokenClaims, TokenVerifier};

/// Public keys that sign Firebase ID tokens, in JWK form
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Verifies Firebase ID tokens against the provider's published keys.
///
/// Keys are fetched on every verification; nothing is cached between requests.
#[derive(Clone)]
pub struct FirebaseVerifier {
    http: Client,
    project_id: String,
    jwks_url: String,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> Result<Self, AuthError> {
        let http = Client::builder()
            .build()
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        Ok(Self {
            http,
            project_id: project_id.into(),
            jwks_url: FIREBASE_JWKS_URL.to_string(),
        })
    }

    /// Point at a different key endpoint (emulators, tests)
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    pub fn issuer(&self) -> String {
        format!("{}{}", ISSUER_PREFIX, self.project_id)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation
    }

    async fn signing_keys(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Provider(format!("failed to fetch signing keys: {}", e)))?;
        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Provider(format!("malformed signing keys: {}", e)))
    }
}

#[async_trait]
impl TokenVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::Invalid(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Invalid("token header has no key id".into()))?;

        let keys = self.signing_keys().await?;
        let jwk = keys.find(&kid).ok_or_else(|| {
            warn!("Token signed with unknown key id {}", kid);
            AuthError::Invalid("token signed with an unknown key".into())
        })?;
        let key = DecodingKey::from_jwk(jwk)?;

        let data = decode::<IdTokenClaims>(token, &key, &self.validation())?;
        let identity = Identity::from_claims(data.claims)?;
        info!("User {} authenticated successfully", identity.uid);
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    const TEST_KEY: &str = include_str!("../../tests/fixtures/test_rsa_key.pem");
    const TEST_JWKS: &str = include_str!("../../tests/fixtures/test_jwks.json");
    const TEST_KID: &str = "test-key-1";
    const PROJECT: &str = "notes-prod";

    fn verifier() -> FirebaseVerifier {
        FirebaseVerifier::new(PROJECT)
            .unwrap()
            .with_jwks_url("http://127.0.0.1:9/unreachable")
    }

    /// Serve the test key set on a free local port and return its URL
    async fn serve_keys() -> String {
        let keys: Value = serde_json::from_str(TEST_JWKS).unwrap();
        let app = Router::new().route(
            "/keys",
            get(move || {
                let keys = keys.clone();
                async move { Json(keys) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}/keys", addr)
    }

    fn claims(aud: &str, iss: &str) -> Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "sub": "alice",
            "email": "alice@example.com",
            "name": "Alice",
            "aud": aud,
            "iss": iss,
            "iat": now,
            "exp": now + 3600,
        })
    }

    fn sign(kid: Option<&str>, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(str::to_string);
        let key = EncodingKey::from_rsa_pem(TEST_KEY.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    fn valid_claims() -> Value {
        claims(PROJECT, &format!("https://securetoken.google.com/{}", PROJECT))
    }

    #[test]
    fn issuer_is_project_scoped() {
        assert_eq!(verifier().issuer(), "https://securetoken.google.com/notes-prod");
    }

    #[tokio::test]
    async fn garbage_token_is_invalid_before_any_key_fetch() {
        let err = verifier().verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)), "{err:?}");
    }

    #[tokio::test]
    async fn hs256_token_is_rejected() {
        let issuer = crate::auth::SharedSecretVerifier::new("secret");
        let token = issuer
            .issue(&Identity::new("u1"), chrono::Duration::minutes(5))
            .unwrap();
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)), "{err:?}");
    }

    #[tokio::test]
    async fn signed_token_yields_identity() {
        let verifier = verifier().with_jwks_url(serve_keys().await);
        let identity = verifier
            .verify(&sign(Some(TEST_KID), &valid_claims()))
            .await
            .unwrap();
        assert_eq!(identity.uid, "alice");
        assert_eq!(identity.email.as_deref(), Some("alice@example.com"));
        assert_eq!(identity.name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn audience_and_issuer_must_match_project() {
        let verifier = verifier().with_jwks_url(serve_keys().await);

        let wrong_aud = claims("someone-else", &verifier.issuer());
        let err = verifier.verify(&sign(Some(TEST_KID), &wrong_aud)).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)), "{err:?}");

        let wrong_iss = claims(PROJECT, "https://securetoken.google.com/someone-else");
        let err = verifier.verify(&sign(Some(TEST_KID), &wrong_iss)).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)), "{err:?}");
    }

    #[tokio::test]
    async fn key_id_must_be_present_and_published() {
        let verifier = verifier().with_jwks_url(serve_keys().await);

        let err = verifier.verify(&sign(Some("rotated-away"), &valid_claims())).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)), "{err:?}");

        let err = verifier.verify(&sign(None, &valid_claims())).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)), "{err:?}");
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let verifier = verifier().with_jwks_url(serve_keys().await);
        let mut expired = valid_claims();
        let past = chrono::Utc::now().timestamp() - 7200;
        expired["iat"] = json!(past - 3600);
        expired["exp"] = json!(past);

        let err = verifier.verify(&sign(Some(TEST_KID), &expired)).await.unwrap_err();
        assert!(matches!(err, AuthError::Expired), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_key_endpoint_is_a_provider_error() {
        let err = verifier()
            .verify(&sign(Some(TEST_KID), &valid_claims()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Provider(_)), "{err:?}");
    }
}
