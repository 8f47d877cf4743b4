use crate::core::credentials::ServiceAccountKey;
use crate::utils::error::{Result, UploaderError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Refresh when the token expires within 5 minutes
const REFRESH_MARGIN_SECS: i64 = 300;

#[derive(Debug, Serialize)]
struct JwtHeader<'a> {
    alg: &'a str,
    typ: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct JwtClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: i64,
}

impl AccessToken {
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at - now >= REFRESH_MARGIN_SECS
    }
}

/// Obtains Drive access tokens for a service account via the JWT-bearer grant.
pub struct AuthManager {
    key: ServiceAccountKey,
    key_pair: RsaKeyPair,
    rng: SystemRandom,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl AuthManager {
    pub fn from_key_file(path: &Path, client: reqwest::Client) -> Result<Self> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::new(key, client)
    }

    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Result<Self> {
        let der = key.private_key_der()?;
        let key_pair = RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| UploaderError::AuthenticationFailed(format!("Rejected private key: {}", e)))?;

        tracing::info!("Using service account {}", key.client_email);

        Ok(Self {
            key,
            key_pair,
            rng: SystemRandom::new(),
            client,
            token: Mutex::new(None),
        })
    }

    /// Return a cached token, fetching a new one when it is missing or about to expire.
    pub async fn get_valid_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        let now = chrono::Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.secret.clone());
            }
            tracing::info!("Access token expired or expiring soon, refreshing...");
        }

        let token = self.request_token(now).await?;
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }

    async fn request_token(&self, now: i64) -> Result<AccessToken> {
        let assertion = self.sign_assertion(&build_claims(&self.key, now))?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(UploaderError::AuthenticationFailed(format!(
                "Token request failed: {} - {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        let expires_at = now + token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        tracing::debug!("Obtained access token valid until {}", expires_at);

        Ok(AccessToken {
            secret: token.access_token,
            expires_at,
        })
    }

    fn sign_assertion(&self, claims: &JwtClaims) -> Result<String> {
        let signing_input = signing_input(claims)?;

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &self.rng, signing_input.as_bytes(), &mut signature)
            .map_err(|_| UploaderError::AuthenticationFailed("Signing the assertion failed".to_string()))?;

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }
}

pub fn build_claims(key: &ServiceAccountKey, now: i64) -> JwtClaims {
    JwtClaims {
        iss: key.client_email.clone(),
        scope: DRIVE_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    }
}

/// `base64url(header).base64url(claims)`, the part of a JWT that gets signed.
pub fn signing_input(claims: &JwtClaims) -> Result<String> {
    let header = serde_json::to_vec(&JwtHeader { alg: "RS256", typ: "JWT" })?;
    let payload = serde_json::to_vec(claims)?;
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    ))
}
