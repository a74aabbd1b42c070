// # AdGuard Home Target Registry
//
// This crate provides the AdGuard Home client list as a `TargetRegistry`.
//
// ## Implementation Status
//
// - ✅ One HTTP request per engine call (clear_all lists, then deletes one by one)
// - ✅ Session cookie from `/control/login`, kept in the HTTP client's cookie jar
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Failure classification (duplicate name, 401/403, 429, 5xx)
// - ❌ NO retry logic (re-running the sync is the recovery path)
// - ❌ NO dry-run handling (owned by SyncEngine)
//
// ### Trust Level: Untrusted (Target Registry)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the configured host only
// - ✅ Parse AdGuard-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Decide what to create, update or delete (owned by SyncEngine)
//
// ## Security Requirements
//
// - The admin password NEVER appears in logs or Debug output
//
// ## API Reference
//
// - Login: POST `/control/login` `{name, password}`
// - List clients: GET `/control/clients`
// - Add client: POST `/control/clients/add` `<client>`
// - Update client: POST `/control/clients/update` `{name, data: <client>}`
// - Delete client: POST `/control/clients/delete` `{name}`

pub mod model;

pub use model::{AdGuardClient, ClientSettings};

use async_trait::async_trait;
use eag_core::config::TargetConfig;
use eag_core::device::{DeviceCandidate, DeviceMapping, DeviceRecord};
use eag_core::traits::TargetRegistry;
use eag_core::{Error, Result};
use model::{ClientList, DeleteRequest, LoginRequest, UpdateRequest};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry name used in logs and errors
const REGISTRY: &str = "adguard";

/// Response fragments AdGuard Home uses when a create collides with an
/// existing client
const DUPLICATE_MARKERS: [&str; 2] = ["client already exists", "another client uses the same id"];

/// AdGuard Home client list
///
/// # Security
///
/// The Debug implementation only shows the base URL.
pub struct AdGuardTarget {
    /// Base URL, without trailing slash
    base_url: String,

    /// HTTP client with cookie store (holds the session after login)
    client: reqwest::Client,
}

impl std::fmt::Debug for AdGuardTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdGuardTarget")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Turn `192.168.1.2`, `adguard.lan:3000/` or `https://dns.example` into a base URL
fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

impl AdGuardTarget {
    /// Create an unauthenticated client for `host`
    ///
    /// `host` may be a bare address (`192.168.1.2`, `adguard.lan:3000`) or a
    /// full HTTP(S) URL.
    pub fn new(host: &str) -> Result<Self> {
        if host.trim().is_empty() {
            return Err(Error::config("AdGuard host cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .cookie_store(true)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url(host),
            client,
        })
    }

    /// Create a client from configuration and log in
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        config.validate()?;
        match config {
            TargetConfig::Adguard {
                host,
                username,
                password,
            } => {
                let target = Self::new(host)?;
                target.authenticate(username, password).await?;
                Ok(target)
            }
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Log in; the session cookie is kept for later calls
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        tracing::debug!("Logging in to AdGuard Home at {} as {}", self.base_url, username);

        let response = self
            .post("/control/login", &LoginRequest {
                name: username,
                password,
            })
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response_text(response).await;
            // AdGuard answers a wrong password with 400 or 403
            return Err(match status.as_u16() {
                400 | 401 | 403 => Error::auth(format!(
                    "AdGuard Home rejected the credentials for '{}': {}",
                    username,
                    body.trim()
                )),
                _ => classify(status, &body, "login"),
            });
        }

        tracing::info!("Authenticated with AdGuard Home");
        Ok(())
    }

    /// List persistent clients in AdGuard's native form
    pub async fn clients(&self) -> Result<Vec<AdGuardClient>> {
        let url = format!("{}/control/clients", self.base_url);
        let response = self.client.get(&url).send().await.map_err(send_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response_text(response).await;
            return Err(classify(status, &body, "list clients"));
        }

        let list: ClientList = response.json().await.map_err(|e| {
            Error::unexpected(REGISTRY, format!("Failed to parse client list: {}", e))
        })?;
        Ok(list.into_clients())
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(send_error)
    }

    async fn mutate<T: Serialize + ?Sized>(&self, path: &str, body: &T, what: &str) -> Result<()> {
        let response = self.post(path, body).await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response_text(response).await;
        Err(classify(status, &body, what))
    }
}

async fn response_text(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string())
}

/// Map a failed send (no HTTP status) to an error
fn send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::transient(format!("AdGuard Home request failed: {}", e))
    } else {
        Error::unexpected(REGISTRY, format!("HTTP request failed: {}", e))
    }
}

/// Map a non-success HTTP status to an error
fn classify(status: StatusCode, body: &str, what: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "AdGuard Home refused {} (session missing or expired). Status: {}",
            what, status
        )),
        429 => Error::transient(format!("AdGuard Home rate limited {}. Status: {}", what, status)),
        500..=599 => Error::transient(format!(
            "AdGuard Home server error during {}: {} - {}",
            what,
            status,
            body.trim()
        )),
        _ => Error::unexpected(REGISTRY, format!("{} failed: {} - {}", what, status, body.trim())),
    }
}

fn is_duplicate(status: StatusCode, body: &str) -> bool {
    if status != StatusCode::BAD_REQUEST {
        return false;
    }
    let body = body.to_lowercase();
    DUPLICATE_MARKERS.iter().any(|marker| body.contains(marker))
}

#[async_trait]
impl TargetRegistry for AdGuardTarget {
    async fn list_devices(&self) -> Result<Vec<DeviceCandidate>> {
        let clients = self.clients().await?;
        tracing::debug!("AdGuard Home lists {} client(s)", clients.len());
        Ok(clients.iter().map(AdGuardClient::to_candidate).collect())
    }

    async fn create_device(&self, record: &DeviceRecord) -> Result<()> {
        let client = AdGuardClient::from_record(record);
        let response = self.post("/control/clients/add", &client).await?;
        if response.status().is_success() {
            tracing::info!("Added AdGuard client '{}' ({})", record.name, record.identity);
            return Ok(());
        }

        let status = response.status();
        let body = response_text(response).await;
        if is_duplicate(status, &body) {
            return Err(Error::duplicate_name(&record.name, body.trim()));
        }
        Err(classify(status, &body, "add client"))
    }

    async fn update_device(&self, name: &str, record: &DeviceRecord) -> Result<()> {
        let client = AdGuardClient::from_record(record);
        self.mutate(
            "/control/clients/update",
            &UpdateRequest { name, data: &client },
            "update client",
        )
        .await?;
        tracing::info!("Updated AdGuard client '{}' -> '{}'", name, record.name);
        Ok(())
    }

    async fn delete_device(&self, name: &str) -> Result<()> {
        self.mutate("/control/clients/delete", &DeleteRequest { name }, "delete client")
            .await?;
        tracing::info!("Deleted AdGuard client '{}'", name);
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let clients = self.clients().await?;
        tracing::info!("Deleting all {} AdGuard client(s)", clients.len());
        for client in &clients {
            self.delete_device(&client.name).await?;
        }
        Ok(())
    }

    fn registry_name(&self) -> &'static str {
        REGISTRY
    }
}
