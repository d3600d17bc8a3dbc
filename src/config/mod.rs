use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub app_name: String,
    pub debug: bool,
    pub log_level: String,
    pub firebase: FirebaseConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Path to the service account key file
    pub credentials_path: PathBuf,
    /// Inline service account JSON; takes precedence over `credentials_path`
    pub credentials_json: Option<String>,
    /// Project identifier; falls back to the credential's `project_id` when empty
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub notes_layout: NotesLayout,
}

/// Where note documents live in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotesLayout {
    /// `userNotes/{uid}/notes/{id}`: ownership is the path itself
    Namespaced,
    /// `notes/{id}` with an `owner_uid` field compared on every access
    Flat,
}

impl NotesLayout {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "namespaced" | "nested" => Some(Self::Namespaced),
            "flat" => Some(Self::Flat),
            _ => None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("APP_NAME") {
            self.app_name = v;
        }
        if let Ok(v) = env::var("DEBUG") {
            self.debug = v.trim().eq_ignore_ascii_case("true");
        }
        if let Ok(v) = env::var("LOG_LEVEL") {
            self.log_level = v;
        }

        // Firebase overrides
        if let Ok(v) = env::var("FIREBASE_SERVICE_ACCOUNT_KEY_PATH") {
            self.firebase.credentials_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("FIREBASE_SERVICE_ACCOUNT_JSON") {
            if !v.trim().is_empty() {
                self.firebase.credentials_json = Some(v);
            }
        }
        if let Ok(v) = env::var("FIREBASE_PROJECT_ID") {
            self.firebase.project_id = Some(v).filter(|p| !p.trim().is_empty());
        }

        // Storage overrides
        if let Ok(v) = env::var("NOTES_STORAGE_LAYOUT") {
            match NotesLayout::parse(&v) {
                Some(layout) => self.storage.notes_layout = layout,
                None => tracing::warn!("Ignoring unknown NOTES_STORAGE_LAYOUT '{}'", v),
            }
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            app_name: "Notes API".to_string(),
            debug: false,
            log_level: "INFO".to_string(),
            firebase: FirebaseConfig {
                credentials_path: PathBuf::from("./serviceAccountKey.json"),
                credentials_json: None,
                project_id: None,
            },
            storage: StorageConfig {
                notes_layout: NotesLayout::Namespaced,
            },
        }
    }

    fn development() -> Self {
        Self {
            debug: true,
            log_level: "DEBUG".to_string(),
            ..Self::base(Environment::Development)
        }
    }

    fn staging() -> Self {
        Self::base(Environment::Staging)
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.log_level = "WARNING".to_string();
        config
    }

    /// Resolved path of the service account key file
    pub fn credentials_path(&self) -> PathBuf {
        std::fs::canonicalize(&self.firebase.credentials_path)
            .unwrap_or_else(|_| self.firebase.credentials_path.clone())
    }

    /// Translate `LOG_LEVEL` into a tracing filter directive.
    ///
    /// Accepts both tracing level names and the Python-style names
    /// (WARNING, CRITICAL) older deployments were configured with.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARN" | "WARNING" => "warn",
            "ERROR" | "CRITICAL" | "FATAL" => "error",
            _ => "info",
        }
    }
}
