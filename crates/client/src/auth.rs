//! Session token management
//!
//! ```text
//! Missing | ExpiringSoon | Expired --refresh--> Valid
//!                                  \-sign-in-/
//! ```
//!
//! A cached token is reused until it is within [`TOKEN_REFRESH_WINDOW_MS`]
//! of expiry. A refresh is tried first when a refresh token is stored; if it
//! fails for any reason it is logged and sign-in is attempted instead. A
//! sign-in failure propagates to the caller.
//!
//! Nothing here serialises concurrent callers. Two requests seeing an
//! expiring token will both refresh (or sign in) and the last write to the
//! store wins.

use std::sync::Arc;

use common::store::{CredentialStore, TOKENS};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::installation::InstallationIdentity;
use crate::registration::ClientRegistrar;
use crate::signing::{now_ms, SignedRequestHeaders};

pub const SIGNIN_PATH: &str = "/auth/signin";
pub const REFRESH_PATH: &str = "/auth/refreshtoken";

/// Lifetime assumed for a freshly issued access token
pub const TOKEN_TTL_MS: i64 = 60 * 60 * 1000;
/// Tokens closer than this to expiry are renewed before use
pub const TOKEN_REFRESH_WINDOW_MS: i64 = 10 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Epoch milliseconds
    #[serde(rename = "expiresAt")]
    pub expires_at_ms: i64,
}

impl SessionToken {
    fn issued(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at_ms: now_ms() + TOKEN_TTL_MS,
        }
    }

    /// Still usable without renewal at `now_ms`
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.expires_at_ms - TOKEN_REFRESH_WINDOW_MS > now_ms
    }

    fn refreshable(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    username: &'a str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum TokenGrant {
    SignIn,
    Refresh,
}

impl TokenGrant {
    fn path(self) -> &'static str {
        match self {
            TokenGrant::SignIn => SIGNIN_PATH,
            TokenGrant::Refresh => REFRESH_PATH,
        }
    }

    fn failed(self) -> &'static str {
        match self {
            TokenGrant::SignIn => "Sign-in failed",
            TokenGrant::Refresh => "Refresh token failed",
        }
    }

    fn response(self) -> &'static str {
        match self {
            TokenGrant::SignIn => "Sign-in response",
            TokenGrant::Refresh => "Refresh response",
        }
    }
}

/// Caches the session token and renews it on demand
#[derive(Debug, Clone)]
pub struct TokenManager<S> {
    store: S,
    http: Client,
    config: Arc<Config>,
    registrar: ClientRegistrar<S>,
}

impl<S: CredentialStore> TokenManager<S> {
    pub fn new(store: S, http: Client, config: Arc<Config>) -> Self {
        let registrar = ClientRegistrar::new(store.clone(), http.clone(), config.clone());
        Self {
            store,
            http,
            config,
            registrar,
        }
    }

    pub fn registrar(&self) -> &ClientRegistrar<S> {
        &self.registrar
    }

    /// The persisted token, if any
    pub async fn cached_token(&self) -> Result<Option<SessionToken>> {
        match self.store.get(TOKENS).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn get_access_token(&self, identity: &InstallationIdentity) -> Result<String> {
        self.registrar.ensure_registered(identity).await?;

        let existing = self.cached_token().await?;
        if let Some(token) = &existing {
            if token.is_fresh(now_ms()) {
                tracing::debug!("using cached access token");
                return Ok(token.access_token.clone());
            }
        }

        if let Some(refresh_token) = existing.as_ref().and_then(SessionToken::refreshable) {
            let refreshed = match self.refresh(identity, refresh_token).await {
                Ok(token) => self.persist(&token).await.map(|()| token),
                Err(e) => Err(e),
            };
            match refreshed {
                Ok(token) => {
                    tracing::debug!("refreshed access token");
                    return Ok(token.access_token);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Refresh token failed, falling back to sign-in");
                }
            }
        }

        let token = self.sign_in(identity).await?;
        self.persist(&token).await?;
        tracing::info!("signed in");
        Ok(token.access_token)
    }

    /// Forget the cached token so the next call refreshes or signs in
    pub async fn clear_token_cache(&self) -> Result<()> {
        self.store.delete(TOKENS).await?;
        Ok(())
    }

    async fn persist(&self, token: &SessionToken) -> Result<()> {
        self.store
            .put(TOKENS, &serde_json::to_string(token)?)
            .await?;
        Ok(())
    }

    async fn sign_in(&self, identity: &InstallationIdentity) -> Result<SessionToken> {
        let body = SignInRequest {
            username: &self.config.email,
            password: &self.config.password,
        };
        self.request_token(identity, TokenGrant::SignIn, &body).await
    }

    async fn refresh(
        &self,
        identity: &InstallationIdentity,
        refresh_token: &str,
    ) -> Result<SessionToken> {
        let body = RefreshRequest {
            username: &self.config.email,
            refresh_token,
        };
        self.request_token(identity, TokenGrant::Refresh, &body).await
    }

    async fn request_token<B: Serialize>(
        &self,
        identity: &InstallationIdentity,
        grant: TokenGrant,
        body: &B,
    ) -> Result<SessionToken> {
        let headers = SignedRequestHeaders::generate(identity)?;
        let request = self.http.post(self.config.endpoint(grant.path())).json(body);
        let response = headers.apply(request).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Auth(format!(
                "{} ({}): {}",
                grant.failed(),
                status.as_u16(),
                text
            )));
        }

        let data: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            Error::Auth(format!("{} was not valid JSON: {}", grant.response(), e))
        })?;

        match (data.access_token, data.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Ok(SessionToken::issued(access, refresh))
            }
            _ => Err(Error::Auth(format!(
                "{} missing accessToken or refreshToken.",
                grant.response()
            ))),
        }
    }
}
