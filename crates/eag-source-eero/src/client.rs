//! Eero cloud API client
//!
//! ## Login
//!
//! Logging in is a two-step flow:
//!
//! 1. `POST login {"login": "<email or phone>"}` returns a `user_token`
//! 2. `POST login/verify {"code": "<code>"}` with cookie `s=<user_token>`
//!    activates it
//!
//! The activated token is the session cookie for every later call. It is kept
//! in a [`SessionStore`] under [`SESSION_KEY`] so the next run can skip the
//! login. A 401 from a data call triggers one `POST login/refresh`, and the
//! refreshed token replaces the stored one.

use eag_core::traits::SessionStore;
use eag_core::{Error, Result};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::model::{Account, EeroClientDevice, EeroNetworkDevice, Envelope, Network, UserToken};

/// Eero API base URL
pub const EERO_API_BASE: &str = "https://api-user.e2ro.com/2.2";

/// Session store key for the Eero session cookie
pub const SESSION_KEY: &str = "eero";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry name used in logs and errors
pub(crate) const REGISTRY: &str = "eero";

/// Eero cloud API client
pub struct EeroClient {
    base_url: String,
    client: reqwest::Client,
    sessions: Arc<dyn SessionStore>,
}

// The session cookie lives in the store; never print it
impl std::fmt::Debug for EeroClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EeroClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// One failed call, before it is turned into an [`Error`]
enum CallError {
    /// The session is missing or expired
    Unauthorized,
    Other(Error),
}

impl From<Error> for CallError {
    fn from(e: Error) -> Self {
        CallError::Other(e)
    }
}

impl EeroClient {
    /// Create a client against the public Eero API
    pub fn new(sessions: Arc<dyn SessionStore>) -> Result<Self> {
        Self::with_base_url(EERO_API_BASE, sessions)
    }

    /// Create a client against another base URL
    pub fn with_base_url(base_url: &str, sessions: Arc<dyn SessionStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            sessions,
        })
    }

    /// Whether an interactive login is needed (no cached session)
    pub async fn needs_login(&self) -> Result<bool> {
        Ok(self.sessions.get(SESSION_KEY).await?.is_none())
    }

    /// Use `cookie` as the session, replacing any cached one
    pub async fn set_session(&self, cookie: &str) -> Result<()> {
        if cookie.trim().is_empty() {
            return Err(Error::invalid_input("Eero session cookie cannot be empty"));
        }
        self.sessions.set(SESSION_KEY, cookie.trim()).await
    }

    /// Drop the cached session
    pub async fn clear_session(&self) -> Result<()> {
        self.sessions.remove(SESSION_KEY).await
    }

    /// Start a login; a verification code is sent by email or SMS
    ///
    /// # Returns
    ///
    /// The unverified user token, to pass to [`EeroClient::login_verify`].
    pub async fn login(&self, identifier: &str) -> Result<String> {
        tracing::debug!("Requesting Eero verification code");
        let token: UserToken = self
            .call(reqwest::Method::POST, "login", Some(&json!({ "login": identifier })), None)
            .await
            .map_err(|e| match e {
                CallError::Unauthorized => Error::auth("Eero rejected the login identifier"),
                CallError::Other(e) => e,
            })?;
        Ok(token.user_token)
    }

    /// Finish a login with the code from email or SMS
    ///
    /// On success the token becomes the cached session.
    pub async fn login_verify(&self, code: &str, user_token: &str) -> Result<()> {
        self.call_optional::<serde_json::Value, _>(
            reqwest::Method::POST,
            "login/verify",
            Some(&json!({ "code": code.trim() })),
            Some(user_token),
        )
        .await
        .map_err(|e| match e {
            CallError::Unauthorized => Error::auth("Eero verification code was not accepted"),
            CallError::Other(e) => e,
        })?;

        self.sessions.set(SESSION_KEY, user_token).await?;
        tracing::info!("Eero session verified");
        Ok(())
    }

    /// Exchange the cached session for a fresh one
    pub async fn refresh(&self) -> Result<()> {
        let cookie = self.session().await?;
        let token: std::result::Result<UserToken, CallError> = self
            .call(reqwest::Method::POST, "login/refresh", None::<&()>, Some(&cookie))
            .await;

        let token = match token {
            Ok(token) => token,
            Err(CallError::Unauthorized) => {
                // A dead session is useless; the next run logs in again
                self.clear_session().await?;
                return Err(Error::auth("Eero session expired; log in again"));
            }
            Err(CallError::Other(e)) => return Err(e),
        };

        self.sessions.set(SESSION_KEY, &token.user_token).await?;
        tracing::debug!("Eero session refreshed");
        Ok(())
    }

    /// Account details, including its networks
    pub async fn account(&self) -> Result<Account> {
        self.get("account").await
    }

    /// Networks on the account
    pub async fn networks(&self) -> Result<Vec<Network>> {
        Ok(self.account().await?.networks.data)
    }

    /// Client devices on a network
    pub async fn devices(&self, network_id: &str) -> Result<Vec<EeroClientDevice>> {
        self.get(&format!("networks/{}/devices", network_id)).await
    }

    /// Eero nodes on a network
    pub async fn eeros(&self, network_id: &str) -> Result<Vec<EeroNetworkDevice>> {
        self.get(&format!("networks/{}/eeros", network_id)).await
    }

    async fn session(&self) -> Result<String> {
        self.sessions
            .get(SESSION_KEY)
            .await?
            .ok_or_else(|| Error::auth("Not logged in to Eero"))
    }

    /// Authenticated GET, refreshing the session once on 401
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let cookie = self.session().await?;
        match self
            .call(reqwest::Method::GET, path, None::<&()>, Some(&cookie))
            .await
        {
            Ok(data) => Ok(data),
            Err(CallError::Other(e)) => Err(e),
            Err(CallError::Unauthorized) => {
                tracing::info!("Eero session expired, refreshing");
                self.refresh().await?;
                let cookie = self.session().await?;
                self.call(reqwest::Method::GET, path, None::<&()>, Some(&cookie))
                    .await
                    .map_err(|e| match e {
                        CallError::Unauthorized => {
                            Error::auth(format!("Eero refused {} after refreshing the session", path))
                        }
                        CallError::Other(e) => e,
                    })
            }
        }
    }

    async fn call<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
        cookie: Option<&str>,
    ) -> std::result::Result<T, CallError> {
        self.call_optional(method, path, body, cookie)
            .await?
            .ok_or_else(|| Error::unexpected(REGISTRY, format!("{} response has no data", path)).into())
    }

    async fn call_optional<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
        cookie: Option<&str>,
    ) -> std::result::Result<Option<T>, CallError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(cookie) = cookie {
            request = request.header(reqwest::header::COOKIE, format!("s={}", cookie));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                Error::transient(format!("Eero request to {} failed: {}", path, e))
            } else {
                Error::unexpected(REGISTRY, format!("HTTP request to {} failed: {}", path, e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CallError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(match status.as_u16() {
                403 => Error::auth(format!("Eero refused {}. Status: {}", path, status)),
                429 => Error::transient(format!("Eero rate limited {}. Status: {}", path, status)),
                500..=599 => Error::transient(format!(
                    "Eero server error on {}: {} - {}",
                    path,
                    status,
                    body.trim()
                )),
                _ => Error::unexpected(
                    REGISTRY,
                    format!("{} failed: {} - {}", path, status, body.trim()),
                ),
            }
            .into());
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::unexpected(REGISTRY, format!("Failed to parse {} response: {}", path, e))
        })?;

        // Some errors come back as 200 with the real code in meta
        if envelope.meta.code == Some(401) {
            return Err(CallError::Unauthorized);
        }
        if let Some(code) = envelope.meta.code.filter(|c| *c >= 400) {
            return Err(Error::unexpected(
                REGISTRY,
                format!(
                    "{} failed with code {}: {}",
                    path,
                    code,
                    envelope.meta.error.unwrap_or_default()
                ),
            )
            .into());
        }

        Ok(envelope.data)
    }
}
