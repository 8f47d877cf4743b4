use crate::utils::error::{Result, UploaderError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The fields of a Google service-account JSON key that the uploader uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let credentials_error = |reason: String| UploaderError::Credentials {
            path: path.display().to_string(),
            reason,
        };

        if !path.is_file() {
            return Err(credentials_error("Secret file does not exist".to_string()));
        }

        let json = std::fs::read_to_string(path).map_err(|e| credentials_error(e.to_string()))?;
        Self::from_json(&json).map_err(|e| credentials_error(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)?;
        if key.client_email.is_empty() {
            return Err(UploaderError::AuthenticationFailed(
                "Service account key has no client_email".to_string(),
            ));
        }
        Ok(key)
    }

    /// DER bytes of the PKCS#8 private key.
    pub fn private_key_der(&self) -> Result<Vec<u8>> {
        decode_pem(&self.private_key, "PRIVATE KEY")
    }
}

/// Decode the first PEM block labelled `label`.
pub fn decode_pem(pem: &str, label: &str) -> Result<Vec<u8>> {
    let begin = format!("-----BEGIN {}-----", label);
    let end = format!("-----END {}-----", label);

    let start = pem
        .find(&begin)
        .ok_or_else(|| UploaderError::AuthenticationFailed(format!("Missing '{}' marker", begin)))?
        + begin.len();
    let stop = pem[start..]
        .find(&end)
        .ok_or_else(|| UploaderError::AuthenticationFailed(format!("Missing '{}' marker", end)))?
        + start;

    // Keys copied out of JSON sometimes keep literal "\n" sequences
    let body: String = pem[start..stop]
        .replace("\\n", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    STANDARD
        .decode(body)
        .map_err(|e| UploaderError::AuthenticationFailed(format!("Invalid private key encoding: {}", e)))
}
