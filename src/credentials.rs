// Service account credentials shared by the document store client and the
// token verifier (which needs the project id for audience checks).

use serde::Deserialize;
use thiserror::Error;

use crate::config::AppConfig;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Failed to read service account key {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed service account key: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No project id configured and none found in the service account key")]
    MissingProjectId,
}

/// The subset of a Google service account key file this service uses
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    #[serde(default)]
    pub project_id: Option<String>,
    pub client_email: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// Keep the private key out of logs
impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> Result<Self, CredentialsError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load from the inline blob if configured, otherwise from the key file
    pub fn from_config(config: &AppConfig) -> Result<Self, CredentialsError> {
        if let Some(inline) = &config.firebase.credentials_json {
            return Self::from_json(inline);
        }

        let path = config.credentials_path();
        let raw = std::fs::read_to_string(&path).map_err(|source| CredentialsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Configured project id, falling back to the one in the key
    pub fn resolve_project_id(&self, config: &AppConfig) -> Result<String, CredentialsError> {
        config
            .firebase
            .project_id
            .clone()
            .or_else(|| self.project_id.clone())
            .filter(|p| !p.trim().is_empty())
            .ok_or(CredentialsError::MissingProjectId)
    }
}
