//! Gmail OAuth2 authentication
//!
//! Implements the installed-app authorization code flow: a local HTTP
//! listener receives the OAuth callback, tokens persist under the config
//! directory and are silently refreshed until the refresh token dies.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;

/// Token filename in the triage config directory
const TOKEN_FILE: &str = "gmail-token.json";

/// Seconds before expiry at which a token is considered stale
const EXPIRY_BUFFER_SECS: i64 = 300;

/// OAuth2 configuration and token management for Gmail
pub struct GmailAuth {
    client_id: String,
    client_secret: String,
    token_path: PathBuf,
}

/// Token data persisted between runs
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
}

impl StoredToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .is_some_and(|at| at > chrono::Utc::now().timestamp() + EXPIRY_BUFFER_SECS)
    }
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

impl GmailAuth {
    /// Gmail API OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Required scope for Gmail access (modify allows read + label changes)
    const GMAIL_MODIFY_SCOPE: &'static str = "https://www.googleapis.com/auth/gmail.modify";

    /// Port range to try for the local OAuth callback server
    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8080..=8090;

    /// Create a new GmailAuth instance
    ///
    /// # Arguments
    /// * `client_id` - OAuth2 client ID from Google Cloud Console
    /// * `client_secret` - OAuth2 client secret from Google Cloud Console
    pub fn new(client_id: String, client_secret: String) -> Result<Self> {
        let token_path =
            config::config_path(TOKEN_FILE).context("Could not determine config directory")?;

        Ok(Self {
            client_id,
            client_secret,
            token_path,
        })
    }

    /// Get a valid access token, refreshing or re-authenticating as needed
    pub fn get_access_token(&self) -> Result<String> {
        if let Ok(token) = self.load_token() {
            if token.is_fresh() {
                return Ok(token.access_token);
            }

            if let Some(refresh_token) = token.refresh_token
                && let Ok(refreshed) = self.refresh_access_token(&refresh_token)
            {
                self.save_token(&refreshed)?;
                return Ok(refreshed.access_token);
            }
        }

        // No usable token; run the interactive flow
        let token = self.authorization_code_flow()?;
        self.save_token(&token)?;
        Ok(token.access_token)
    }

    /// Check if the user is already authenticated without prompting
    pub fn is_authenticated(&self) -> bool {
        match self.load_token() {
            Ok(token) if token.is_fresh() => true,
            Ok(token) => token
                .refresh_token
                .is_some_and(|rt| self.refresh_access_token(&rt).is_ok()),
            Err(_) => false,
        }
    }

    /// Clear stored tokens (logout)
    pub fn logout(&self) -> Result<()> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path)?;
        }
        Ok(())
    }

    /// Run the browser-based authorization code flow
    fn authorization_code_flow(&self) -> Result<TokenResponse> {
        let (listener, port) = self.bind_callback_listener()?;
        let redirect_uri = format!("http://localhost:{}", port);

        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(Self::GMAIL_MODIFY_SCOPE),
        );

        println!("\n=== Gmail Authentication Required ===");
        println!("Opening browser for authentication...");
        println!("If the browser doesn't open, visit: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Failed to open browser: {}. Please open the URL manually.", e);
        }

        println!("Waiting for authorization...");
        let code = self.wait_for_callback(listener)?;

        println!("Exchanging authorization code for tokens...");
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        println!("Authentication successful!\n");
        Ok(token)
    }

    /// Bind a local TCP listener on the first available callback port
    fn bind_callback_listener(&self) -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE {
            if let Ok(listener) = TcpListener::bind(format!("127.0.0.1:{}", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE.start(),
            Self::PORT_RANGE.end()
        )
    }

    /// Wait for the OAuth callback and extract the authorization code
    fn wait_for_callback(&self, listener: TcpListener) -> Result<String> {
        let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .context("Failed to read request")?;

        // Request line format: GET /?code=AUTH_CODE&scope=... HTTP/1.1
        let code = query_param(&request_line, "code");
        let error = query_param(&request_line, "error");

        let (status, body) = if code.is_some() {
            ("200 OK", "Authentication successful! You can close this window.")
        } else {
            ("400 Bad Request", "Authentication failed. Please try again.")
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        if let Some(err) = error {
            anyhow::bail!("OAuth error: {}", err);
        }

        code.context("No authorization code received")
    }

    /// Refresh an access token using a refresh token
    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let mut token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        // Google omits the refresh token on refresh responses; keep ours
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token)
    }

    fn load_token(&self) -> Result<StoredToken> {
        let content = fs::read_to_string(&self.token_path)?;
        let token: StoredToken = serde_json::from_str(&content)?;
        Ok(token)
    }

    fn save_token(&self, token: &TokenResponse) -> Result<()> {
        if let Some(parent) = self.token_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredToken {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token
                .expires_in
                .map(|d| chrono::Utc::now().timestamp() + d as i64),
        };

        let content = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.token_path, content)?;
        Ok(())
    }
}

/// Extract a query parameter value from an HTTP request line
fn query_param(request_line: &str, name: &str) -> Option<String> {
    let path = request_line.split_whitespace().nth(1)?;
    let query = path.split('?').nth(1)?;
    query.split('&').find_map(|param| {
        let mut parts = param.split('=');
        if parts.next() == Some(name) {
            parts.next().map(|s| s.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_present() {
        let line = "GET /?code=abc123&scope=email HTTP/1.1";
        assert_eq!(query_param(line, "code"), Some("abc123".to_string()));
        assert_eq!(query_param(line, "scope"), Some("email".to_string()));
    }

    #[test]
    fn test_query_param_absent() {
        let line = "GET /?error=access_denied HTTP/1.1";
        assert_eq!(query_param(line, "code"), None);
        assert_eq!(
            query_param(line, "error"),
            Some("access_denied".to_string())
        );
    }

    #[test]
    fn test_query_param_no_query_string() {
        assert_eq!(query_param("GET / HTTP/1.1", "code"), None);
    }

    #[test]
    fn test_stored_token_freshness() {
        let fresh = StoredToken {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: Some(chrono::Utc::now().timestamp() + 3600),
        };
        assert!(fresh.is_fresh());

        let stale = StoredToken {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: Some(chrono::Utc::now().timestamp() + 60),
        };
        assert!(!stale.is_fresh());

        let unknown = StoredToken {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: None,
        };
        assert!(!unknown.is_fresh());
    }
}
