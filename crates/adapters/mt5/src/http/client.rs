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

//! HTTP transport for the MT5 bridge.
//!
//! - [`Mt5HttpInnerClient`]: owns the `reqwest` client and speaks raw decoded bodies.
//! - [`Mt5HttpClient`]: clonable wrapper shared by the session, data and execution layers.
//!
//! Non-2xx statuses are returned as data, not errors. The bridge reports
//! business failures with arbitrary statuses and callers need the body either way.
//! Request URLs are never logged because they carry the session id and, for
//! `/ConnectEx`, the credentials.

use std::{sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT},
    Client, Method, StatusCode,
};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    common::{consts, parse::decode_body, urls::Mt5Url},
    config::Mt5Config,
    http::{error::Mt5HttpError, parse::is_auth_failure_text},
};

/// A decoded bridge reply.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeResponse {
    pub status: u16,
    pub text: String,
    pub body: Value,
}

impl BridgeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for a 401 or a body carrying one of the session-invalid phrases.
    pub fn indicates_auth_failure(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED.as_u16() || is_auth_failure_text(&self.text)
    }
}

// Low-level MT5 HTTP client (inner)
pub struct Mt5HttpInnerClient {
    url: Mt5Url,
    config: Mt5Config,
    client: RwLock<Client>,
}

#[derive(Clone)]
pub struct Mt5HttpClient {
    inner: Arc<Mt5HttpInnerClient>,
}

fn build_client(config: &Mt5Config) -> Result<Client, Mt5HttpError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(consts::USER_AGENT));

    let key_header = HeaderName::from_bytes(config.api_key_header.as_bytes())
        .map_err(|e| Mt5HttpError::BuildError(format!("invalid API key header name: {e}")))?;
    let mut key_value = HeaderValue::from_str(&config.api_key)
        .map_err(|_| Mt5HttpError::BuildError("API key contains invalid characters".to_string()))?;
    key_value.set_sensitive(true);
    headers.insert(key_header, key_value);

    let mut builder = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.http_timeout))
        .pool_max_idle_per_host(10);

    if let Some(proxy) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy).map_err(Mt5HttpError::from_reqwest)?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(Mt5HttpError::from_reqwest)
}

impl Mt5HttpInnerClient {
    pub fn new(config: Mt5Config) -> Result<Self, Mt5HttpError> {
        let client = build_client(&config)?;
        Ok(Self {
            url: Mt5Url::new(config.base_url.clone()),
            config,
            client: RwLock::new(client),
        })
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<BridgeResponse, Mt5HttpError> {
        let client = self.client.read().await.clone();
        let mut request = client.request(method.clone(), url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(Mt5HttpError::from_reqwest)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(Mt5HttpError::from_reqwest)?;

        tracing::trace!(%method, status, bytes = text.len(), "Bridge response");

        Ok(BridgeResponse {
            status,
            body: decode_body(&text),
            text,
        })
    }

    async fn reset(&self) -> Result<(), Mt5HttpError> {
        let fresh = build_client(&self.config)?;
        *self.client.write().await = fresh;
        Ok(())
    }
}

impl Mt5HttpClient {
    /// Creates a new client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key header or proxy cannot be configured.
    pub fn new(config: Mt5Config) -> Result<Self, Mt5HttpError> {
        Ok(Self {
            inner: Arc::new(Mt5HttpInnerClient::new(config)?),
        })
    }

    pub fn url(&self) -> &Mt5Url {
        &self.inner.url
    }

    pub fn config(&self) -> &Mt5Config {
        &self.inner.config
    }

    /// Issues a GET with the given query pairs.
    pub async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<BridgeResponse, Mt5HttpError> {
        self.inner.execute(Method::GET, url, query, None).await
    }

    /// Issues a POST with a JSON body.
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<BridgeResponse, Mt5HttpError> {
        self.inner.execute(Method::POST, url, &[], Some(body)).await
    }

    /// Discards the pooled connections and default headers by rebuilding the
    /// underlying client.
    pub async fn reset(&self) -> Result<(), Mt5HttpError> {
        self.inner.reset().await
    }
}
