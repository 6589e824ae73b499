//! Configuration loading for mail services
//!
//! Credentials come from (in order of priority):
//! 1. JSON files in the triage config directory
//! 2. Runtime environment variables

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Google OAuth credentials filename in the triage config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Classifier settings filename in the triage config directory
const CLASSIFIER_FILE: &str = "classifier.json";

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials from the config file, falling back to the
    /// GMAIL_CLIENT_ID / GMAIL_CLIENT_SECRET environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    /// Parse credentials from JSON text (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path (~/.config/triage/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// Settings for the OpenAI-compatible classifier endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// API key for the endpoint
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name to classify with
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-5-mini".to_string()
}

impl ClassifierConfig {
    /// Load classifier settings from the config file, falling back to
    /// OPENAI_API_KEY / OPENAI_BASE_URL / OPENAI_MODEL environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(CLASSIFIER_FILE) {
            return config::load_json(CLASSIFIER_FILE);
        }

        Self::from_env()
    }

    /// Load classifier settings from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;

        Ok(Self {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| default_base_url()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| default_model()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_credentials() {
        let json = r#"{
            "installed": {
                "client_id": "test-client-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-client-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn test_parse_web_credentials() {
        let json = r#"{
            "web": {
                "client_id": "web-client-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-client-id.apps.googleusercontent.com");
    }

    #[test]
    fn test_invalid_credentials_json() {
        let json = r#"{ "other": {} }"#;
        assert!(GmailCredentials::from_json(json).is_err());
    }

    #[test]
    fn test_classifier_config_defaults() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{ "api_key": "sk-test" }"#).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-5-mini");
    }

    #[test]
    fn test_classifier_config_overrides() {
        let config: ClassifierConfig = serde_json::from_str(
            r#"{ "api_key": "sk-test", "base_url": "http://localhost:8000/v1", "model": "local" }"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.model, "local");
    }
}
