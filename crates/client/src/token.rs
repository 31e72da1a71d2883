// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer tokens.
//!
//! A [`TokenProvider`] talks to the identity server; the [`TokenManager`]
//! caches the current token, refreshes it after a 401 and renews it ahead
//! of expiry in the background.

use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::AuthConfig;
use crate::error::{Error, Result};

/// Wait used by the renewal loop when no expiry is known.
const RENEWAL_IDLE: Duration = Duration::from_secs(60);

/// Floor for renewal waits, for tokens shorter-lived than the margin.
const RENEWAL_MIN: Duration = Duration::from_secs(1);

/// Response of a token request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds; zero means no known expiry.
    pub expires_in: u64,
    pub is_error: bool,
    pub error: Option<String>,
}

impl Token {
    pub fn error(message: impl Into<String>) -> Self {
        Token {
            is_error: true,
            error: Some(message.into()),
            ..Token::default()
        }
    }
}

/// Source of bearer tokens.
pub trait TokenProvider: Send + Sync {
    fn request_client_credentials_token(&self) -> Pin<Box<dyn Future<Output = Token> + Send + '_>>;

    fn request_refresh_token(
        &self,
        refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = Token> + Send + '_>>;
}

#[derive(Debug, Deserialize)]
struct OAuthResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth2 provider posting form-encoded grants to a token endpoint.
pub struct OAuthTokenProvider {
    http: reqwest::Client,
    config: AuthConfig,
}

impl OAuthTokenProvider {
    pub fn new(config: AuthConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(OAuthTokenProvider { http, config })
    }

    async fn grant(&self, mut form: Vec<(&'static str, String)>) -> Token {
        form.push(("client_id", self.config.client_id.clone()));
        form.push(("client_secret", self.config.client_secret.clone()));
        if let Some(scope) = &self.config.scope {
            form.push(("scope", scope.clone()));
        }

        let response = match self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Token::error(e.to_string()),
        };
        let status = response.status();
        let body: OAuthResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => return Token::error(format!("{status}: {e}")),
        };

        if let Some(error) = body.error {
            let detail = body.error_description.unwrap_or_default();
            return Token::error(format!("{error} {detail}").trim().to_string());
        }
        if !status.is_success() || body.access_token.is_empty() {
            return Token::error(format!("token endpoint returned {status}"));
        }
        Token {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
            is_error: false,
            error: None,
        }
    }
}

impl TokenProvider for OAuthTokenProvider {
    fn request_client_credentials_token(&self) -> Pin<Box<dyn Future<Output = Token> + Send + '_>> {
        Box::pin(self.grant(vec![("grant_type", "client_credentials".to_string())]))
    }

    fn request_refresh_token(
        &self,
        refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = Token> + Send + '_>> {
        Box::pin(self.grant(vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token),
        ]))
    }
}

#[derive(Default)]
struct TokenState {
    access: Option<String>,
    refresh: Option<String>,
    expires_at: Option<Instant>,
}

/// Caches and renews the bearer token of one client.
pub struct TokenManager {
    provider: Option<Arc<dyn TokenProvider>>,
    state: tokio::sync::Mutex<TokenState>,
    renew_margin: Duration,
}

impl TokenManager {
    pub fn new(provider: Option<Arc<dyn TokenProvider>>, renew_margin: Duration) -> Self {
        TokenManager {
            provider,
            state: tokio::sync::Mutex::new(TokenState::default()),
            renew_margin,
        }
    }

    /// A manager that never sends credentials.
    pub fn disabled() -> Self {
        Self::new(None, Duration::ZERO)
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// The current access token, acquiring one if none is held or the
    /// held one has expired.
    pub async fn bearer(&self) -> Option<String> {
        let provider = self.provider.as_ref()?;
        let mut state = self.state.lock().await;
        let expired = state.expires_at.is_some_and(|at| Instant::now() >= at);
        if state.access.is_none() || expired {
            let token = provider.request_client_credentials_token().await;
            apply(&mut state, token);
        }
        state.access.clone()
    }

    /// Replaces the current token, preferring the refresh grant.
    ///
    /// Returns true if a usable token is now held.
    pub async fn refresh(&self) -> bool {
        let Some(provider) = self.provider.as_ref() else {
            return false;
        };
        let mut state = self.state.lock().await;
        let token = match state.refresh.clone() {
            Some(refresh) => {
                let token = provider.request_refresh_token(refresh).await;
                if token.is_error {
                    tracing::debug!(error = ?token.error, "refresh grant failed; using client credentials");
                    provider.request_client_credentials_token().await
                } else {
                    token
                }
            }
            None => provider.request_client_credentials_token().await,
        };
        apply(&mut state, token)
    }

    /// How long until the held token should be renewed.
    async fn renewal_wait(&self) -> Duration {
        let state = self.state.lock().await;
        match state.expires_at {
            Some(at) => at
                .checked_sub(self.renew_margin)
                .map(|renew_at| renew_at.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::ZERO)
                .max(RENEWAL_MIN),
            None => RENEWAL_IDLE,
        }
    }

    /// Renews the token ahead of expiry until cancelled.
    pub fn spawn_renewal(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if !self.has_provider() {
            return None;
        }
        let manager = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                let wait = manager.renewal_wait().await;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(wait) => {}
                }
                let has_expiry = manager.state.lock().await.expires_at.is_some();
                if has_expiry && !manager.refresh().await {
                    // back off rather than spin on a failing identity server
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(RENEWAL_IDLE) => {}
                    }
                }
            }
        }))
    }
}

fn apply(state: &mut TokenState, token: Token) -> bool {
    if token.is_error {
        tracing::warn!(error = ?token.error, "token request failed");
        return false;
    }
    state.access = Some(token.access_token);
    if token.refresh_token.is_some() {
        state.refresh = token.refresh_token;
    }
    state.expires_at = if token.expires_in > 0 {
        Some(Instant::now() + Duration::from_secs(token.expires_in))
    } else {
        None
    };
    tracing::debug!(expires_in = token.expires_in, "token acquired");
    true
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
