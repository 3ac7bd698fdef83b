// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Session lifecycle for the MT5 bridge.
//!
//! [`SessionManager`] is the only owner of the session token. Every other
//! component reaches the bridge through [`SessionManager::request`], which
//! attaches the token and invalidates the session on the first sign of an
//! expired login.

use std::{collections::HashMap, fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};

use crate::{
    common::{
        consts::SESSION_TOKEN_KEY,
        credential::Mt5Credential,
        enums::{ConnectionStatus, OrderMethod},
    },
    config::Mt5Config,
    error::Mt5Error,
    http::{
        client::{BridgeResponse, Mt5HttpClient},
        parse::{classify, map_connect_error, parse_connect_reply},
        query::{encode_query, ConnectParams},
    },
};

/// A live bridge session.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub base_url: String,
    /// Account hint, when the session was opened in this process.
    pub account: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("account", &self.account.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Caller-supplied key-value store used to persist the session token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Mt5Error>;

    async fn set(&self, key: &str, value: &str) -> Result<(), Mt5Error>;

    async fn remove(&self, key: &str) -> Result<(), Mt5Error>;
}

/// In-process store. Tokens do not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Mt5Error> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Mt5Error> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Mt5Error> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object on disk.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>, Mt5Error> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                Mt5Error::Store(format!("{} is not a valid session file: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(Mt5Error::Store(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn save(&self, entries: &HashMap<String, String>) -> Result<(), Mt5Error> {
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| Mt5Error::Store(e.to_string()))?;
        tokio::fs::write(&self.path, text).await.map_err(|e| {
            Mt5Error::Store(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Mt5Error> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Mt5Error> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), Mt5Error> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct SessionState {
    session: Option<Session>,
    status: ConnectionStatus,
}

/// Owns the bridge session and the transport used by every other component.
pub struct SessionManager {
    http: Mt5HttpClient,
    store: Arc<dyn SessionStore>,
    state: RwLock<SessionState>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.http.url().base_url())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Validates `config`, builds the transport and restores any persisted token.
    ///
    /// # Errors
    ///
    /// Returns [`Mt5Error::Config`] before any network call when the
    /// configuration is unusable.
    pub async fn new(config: Mt5Config, store: Arc<dyn SessionStore>) -> Result<Self, Mt5Error> {
        config.validate()?;
        let http = Mt5HttpClient::new(config)?;

        let restored = match store.get(SESSION_TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session token");
                None
            }
        };

        let state = match restored {
            Some(token) => {
                tracing::info!("Restored persisted MT5 session");
                SessionState {
                    session: Some(Session {
                        token,
                        base_url: http.url().base_url().to_string(),
                        account: None,
                    }),
                    status: ConnectionStatus::Connected,
                }
            }
            None => SessionState {
                session: None,
                status: ConnectionStatus::Disconnected,
            },
        };

        Ok(Self {
            http,
            store,
            state: RwLock::new(state),
        })
    }

    pub fn http(&self) -> &Mt5HttpClient {
        &self.http
    }

    pub fn config(&self) -> &Mt5Config {
        self.http.config()
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.state.read().await.status
    }

    pub async fn is_connected(&self) -> bool {
        let state = self.state.read().await;
        state.status == ConnectionStatus::Connected && state.session.is_some()
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.token.clone())
    }

    /// Reads the token from the persistent store.
    pub async fn stored_token(&self) -> Option<String> {
        self.store.get(SESSION_TOKEN_KEY).await.ok().flatten()
    }

    /// Opens a session with the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`Mt5Error::Transport`] when the bridge is unreachable (not
    /// retried) and a connect-time rejection otherwise.
    pub async fn connect(&self, credential: &Mt5Credential) -> Result<(), Mt5Error> {
        self.state.write().await.status = ConnectionStatus::Connecting;
        tracing::info!(bridge = %self.http.url(), "Connecting to MT5 bridge");

        match self.open_session(credential).await {
            Ok(token) => {
                {
                    let mut state = self.state.write().await;
                    state.session = Some(Session {
                        token: token.clone(),
                        base_url: self.http.url().base_url().to_string(),
                        account: Some(credential.login.clone()),
                    });
                    state.status = ConnectionStatus::Connected;
                }
                if let Err(e) = self.store.set(SESSION_TOKEN_KEY, &token).await {
                    tracing::warn!(error = %e, "Failed to persist session token");
                }
                tracing::info!("Connected to MT5 bridge");
                Ok(())
            }
            Err(e) => {
                let e = scrub_credentials(e, credential);
                self.state.write().await.status = ConnectionStatus::Disconnected;
                tracing::warn!(error = %e, "MT5 bridge connect failed");
                Err(e)
            }
        }
    }

    async fn open_session(&self, credential: &Mt5Credential) -> Result<String, Mt5Error> {
        let params = ConnectParams {
            user: credential.login.clone(),
            password: credential.password.clone(),
            server: credential.server.clone(),
        };
        let value = serde_json::to_value(&params).map_err(|e| Mt5Error::Config(e.to_string()))?;

        let response = self
            .http
            .get(&self.http.url().connect_url(), &encode_query(&value))
            .await
            .map_err(|e| Mt5Error::Transport(e.to_string()))?;

        if response.is_success() {
            parse_connect_reply(&response.body)
        } else if response.text.trim().is_empty() {
            Err(Mt5Error::BridgeRejected(format!(
                "bridge returned HTTP {}",
                response.status
            )))
        } else {
            Err(map_connect_error(&response.text))
        }
    }

    /// Ends the session. Server-side invalidation is best-effort; local state
    /// is always cleared and the transport rebuilt.
    pub async fn disconnect(&self) {
        if let Some(token) = self.token().await {
            let query = [("id".to_string(), token)];
            match self.http.get(&self.http.url().disconnect_url(), &query).await {
                Ok(response) => tracing::debug!(status = response.status, "Bridge disconnect"),
                Err(e) => tracing::debug!(error = %e, "Bridge disconnect failed, ignoring"),
            }
        }

        {
            let mut state = self.state.write().await;
            state.session = None;
            state.status = ConnectionStatus::Disconnected;
        }
        if let Err(e) = self.store.remove(SESSION_TOKEN_KEY).await {
            tracing::warn!(error = %e, "Failed to clear persisted session token");
        }
        if let Err(e) = self.http.reset().await {
            tracing::warn!(error = %e, "Failed to rebuild HTTP client");
        }
        tracing::info!("Disconnected from MT5 bridge");
    }

    /// Lightweight liveness probe. Never fails; an expired login clears the session.
    pub async fn check_connection(&self) -> bool {
        match self
            .request(OrderMethod::Get, &self.http.url().check_connect_url(), Value::Null)
            .await
        {
            Ok(response) => {
                response.is_success() && classify(&response.body, "CheckConnect").is_success()
            }
            Err(e) => {
                tracing::debug!(error = %e, "Connection check failed");
                false
            }
        }
    }

    /// Sends an authenticated request, adding the session id to `params`.
    ///
    /// Non-2xx replies are returned as-is unless they signal an expired
    /// login, in which case the session is cleared first.
    ///
    /// # Errors
    ///
    /// Returns [`Mt5Error::NotConnected`], [`Mt5Error::Transport`] or
    /// [`Mt5Error::AuthenticationExpired`].
    pub async fn request(
        &self,
        method: OrderMethod,
        url: &str,
        params: Value,
    ) -> Result<BridgeResponse, Mt5Error> {
        let token = self.token().await.ok_or(Mt5Error::NotConnected)?;

        let mut map = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert("id".to_string(), Value::String(token.clone()));
        let params = Value::Object(map);

        let response = match method {
            OrderMethod::Get => self.http.get(url, &encode_query(&params)).await,
            OrderMethod::Post => self.http.post_json(url, &params).await,
        }
        .map_err(Mt5Error::from)?;

        if response.indicates_auth_failure() {
            let reason = if response.status == 401 {
                "bridge returned HTTP 401".to_string()
            } else {
                response.text.trim().chars().take(200).collect()
            };
            self.invalidate(&token, &reason).await;
            return Err(Mt5Error::AuthenticationExpired(reason));
        }

        Ok(response)
    }

    /// Clears the session that issued `token`. A newer session opened while
    /// the failed request was in flight is left alone.
    async fn invalidate(&self, token: &str, reason: &str) {
        {
            let mut state = self.state.write().await;
            if state.session.as_ref().map(|s| s.token.as_str()) != Some(token) {
                tracing::debug!(reason, "Stale MT5 session rejected, keeping current session");
                return;
            }
            tracing::warn!(reason, "MT5 session expired, clearing session");
            state.session = None;
            state.status = ConnectionStatus::AuthExpired;
        }
        if let Err(e) = self.store.remove(SESSION_TOKEN_KEY).await {
            tracing::warn!(error = %e, "Failed to clear persisted session token");
        }
    }
}

/// Replaces any error whose text echoes a credential value.
fn scrub_credentials(err: Mt5Error, credential: &Mt5Credential) -> Mt5Error {
    let text = err.to_string();
    let leaks = (!credential.password.is_empty() && text.contains(&credential.password))
        || (credential.login.len() >= 4 && text.contains(&credential.login));
    if leaks {
        Mt5Error::BridgeRejected("connect rejected by the bridge".to_string())
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn credential() -> Mt5Credential {
        Mt5Credential::builder()
            .login("5551234")
            .password("hunter2!")
            .server("Broker-Demo")
            .build()
            .unwrap()
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        tokio_test::block_on(async {
            assert_eq!(store.get("k").await.unwrap(), None);

            store.set("k", "v").await.unwrap();
            assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

            store.remove("k").await.unwrap();
            assert_eq!(store.get("k").await.unwrap(), None);
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn test_connect_failure_never_logs_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ConnectEx"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Invalid password hunter2!"))
            .mount(&server)
            .await;

        let manager = SessionManager::new(
            Mt5Config::new(server.uri(), "key"),
            Arc::new(MemorySessionStore::new()),
        )
        .await
        .unwrap();
        let err = manager.connect(&credential()).await.unwrap_err();

        assert!(!err.to_string().contains("hunter2!"));
        assert_eq!(manager.status().await, ConnectionStatus::Disconnected);
        assert!(logs_contain("MT5 bridge connect failed"));
        assert!(!logs_contain("hunter2!"));
        assert!(!logs_contain("5551234"));
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let path = std::env::temp_dir().join(format!("mt5_session_{}.json", uuid::Uuid::new_v4()));

        let store = FileSessionStore::new(&path);
        assert_eq!(store.get(SESSION_TOKEN_KEY).await.unwrap(), None);
        store.set(SESSION_TOKEN_KEY, "token-abc-123").await.unwrap();
        store.set("other", "x").await.unwrap();

        let reopened = FileSessionStore::new(&path);
        assert_eq!(
            reopened.get(SESSION_TOKEN_KEY).await.unwrap().as_deref(),
            Some("token-abc-123")
        );

        reopened.remove(SESSION_TOKEN_KEY).await.unwrap();
        assert_eq!(store.get(SESSION_TOKEN_KEY).await.unwrap(), None);
        assert_eq!(store.get("other").await.unwrap().as_deref(), Some("x"));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let path = std::env::temp_dir().join(format!("mt5_session_{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "not json").await.unwrap();

        let store = FileSessionStore::new(&path);
        assert!(matches!(store.get("k").await, Err(Mt5Error::Store(_))));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_new_restores_persisted_token() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(SESSION_TOKEN_KEY, "persisted-token-1").await.unwrap();

        let manager = SessionManager::new(Mt5Config::new("http://127.0.0.1:9", "key"), store)
            .await
            .unwrap();

        assert!(manager.is_connected().await);
        assert_eq!(manager.token().await.as_deref(), Some("persisted-token-1"));
    }

    #[tokio::test]
    async fn test_invalidate_ignores_superseded_token() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(SESSION_TOKEN_KEY, "current-token-22").await.unwrap();
        let manager = SessionManager::new(Mt5Config::new("http://127.0.0.1:9", "key"), store.clone())
            .await
            .unwrap();

        manager.invalidate("earlier-token-11", "bridge returned HTTP 401").await;
        assert!(manager.is_connected().await);
        assert_eq!(manager.token().await.as_deref(), Some("current-token-22"));
        assert_eq!(
            store.get(SESSION_TOKEN_KEY).await.unwrap().as_deref(),
            Some("current-token-22")
        );

        manager.invalidate("current-token-22", "bridge returned HTTP 401").await;
        assert_eq!(manager.status().await, ConnectionStatus::AuthExpired);
        assert_eq!(manager.token().await, None);
        assert_eq!(store.get(SESSION_TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let store = Arc::new(MemorySessionStore::new());
        let result = SessionManager::new(Mt5Config::new("", "key"), store).await;
        assert!(matches!(result, Err(Mt5Error::Config(_))));
    }

    #[tokio::test]
    async fn test_request_without_session_is_not_connected() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(Mt5Config::new("http://127.0.0.1:9", "key"), store)
            .await
            .unwrap();

        let result = manager
            .request(OrderMethod::Get, "http://127.0.0.1:9/Positions", Value::Null)
            .await;
        assert_eq!(result, Err(Mt5Error::NotConnected));
        assert!(!manager.check_connection().await);
    }

    #[test]
    fn test_scrub_credentials() {
        let cred = credential();
        let leaked = Mt5Error::BridgeRejected("bad password hunter2! for user".to_string());
        assert_eq!(
            scrub_credentials(leaked, &cred),
            Mt5Error::BridgeRejected("connect rejected by the bridge".to_string())
        );

        let clean = Mt5Error::InvalidServer("check the trading server name".to_string());
        assert_eq!(scrub_credentials(clean.clone(), &cred), clean);
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session {
            token: "secret-token".to_string(),
            base_url: "http://bridge.local".to_string(),
            account: Some("5551234".to_string()),
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("5551234"));
    }
}
