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

//! Configuration for the MT5 bridge gateway.
//!
//! The bridge URL and API key are required. Everything else selects one of
//! the known bridge contracts and is resolved once at startup.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    common::{
        consts::{
            DEFAULT_API_KEY_HEADER, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_SLIPPAGE,
            DEFAULT_SYMBOL_CACHE_TTL_SECS,
        },
        enums::{CloseVolumeField, OrderMethod, PositionsEndpoint},
    },
    error::Mt5Error,
};

pub const ENV_BRIDGE_URL: &str = "MT5_BRIDGE_URL";
pub const ENV_BRIDGE_API_KEY: &str = "MT5_BRIDGE_API_KEY";
pub const ENV_HTTP_TIMEOUT: &str = "MT5_HTTP_TIMEOUT_SECS";
pub const ENV_PROXY: &str = "MT5_PROXY";
pub const ENV_POSITIONS_ENDPOINT: &str = "MT5_POSITIONS_ENDPOINT";
pub const ENV_ORDER_METHOD: &str = "MT5_ORDER_METHOD";
pub const ENV_CLOSE_VOLUME_FIELD: &str = "MT5_CLOSE_VOLUME_FIELD";
pub const ENV_SLIPPAGE: &str = "MT5_SLIPPAGE";

const PLACEHOLDER_MARKERS: [&str; 7] = [
    "your-",
    "your_",
    "placeholder",
    "changeme",
    "<",
    "example.com",
    "xxx",
];

/// Main configuration for the MT5 bridge gateway.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Mt5Config {
    /// The bridge base URL.
    pub base_url: String,
    /// The bridge API key, sent on every request.
    pub api_key: String,
    /// Header carrying the API key.
    pub api_key_header: String,
    /// HTTP timeout in seconds.
    pub http_timeout: u64,
    /// Optional proxy URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    pub positions_endpoint: PositionsEndpoint,
    pub order_method: OrderMethod,
    pub close_volume_field: CloseVolumeField,
    /// Maximum price deviation in points sent with new orders.
    pub slippage: u32,
    /// How long a fetched symbol list is reused, in seconds.
    pub symbol_cache_ttl: u64,
}

impl Default for Mt5Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            proxy: None,
            positions_endpoint: PositionsEndpoint::default(),
            order_method: OrderMethod::default(),
            close_volume_field: CloseVolumeField::default(),
            slippage: DEFAULT_SLIPPAGE,
            symbol_cache_ttl: DEFAULT_SYMBOL_CACHE_TTL_SECS,
        }
    }
}

impl fmt::Debug for Mt5Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mt5Config")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("api_key_header", &self.api_key_header)
            .field("http_timeout", &self.http_timeout)
            .field("proxy", &self.proxy)
            .field("positions_endpoint", &self.positions_endpoint)
            .field("order_method", &self.order_method)
            .field("close_volume_field", &self.close_volume_field)
            .field("slippage", &self.slippage)
            .field("symbol_cache_ttl", &self.symbol_cache_ttl)
            .finish()
    }
}

impl Mt5Config {
    /// Creates a configuration with default contract settings.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Loads and validates configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Mt5Error::Config`] when a required variable is missing, still
    /// holds a placeholder, or an optional variable cannot be parsed.
    pub fn from_env() -> Result<Self, Mt5Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Mt5Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Mt5Error::Config(format!("{key} must be set")))
        };

        let mut config = Self::new(required(ENV_BRIDGE_URL)?, required(ENV_BRIDGE_API_KEY)?);

        if let Some(timeout) = parse_optional(&lookup, ENV_HTTP_TIMEOUT)? {
            config.http_timeout = timeout;
        }
        if let Some(slippage) = parse_optional(&lookup, ENV_SLIPPAGE)? {
            config.slippage = slippage;
        }
        if let Some(endpoint) = parse_optional(&lookup, ENV_POSITIONS_ENDPOINT)? {
            config.positions_endpoint = endpoint;
        }
        if let Some(method) = parse_optional(&lookup, ENV_ORDER_METHOD)? {
            config.order_method = method;
        }
        if let Some(field) = parse_optional(&lookup, ENV_CLOSE_VOLUME_FIELD)? {
            config.close_volume_field = field;
        }
        config.proxy = lookup(ENV_PROXY).filter(|v| !v.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can be used before any network call.
    ///
    /// # Errors
    ///
    /// Returns [`Mt5Error::Config`] with an actionable message.
    pub fn validate(&self) -> Result<(), Mt5Error> {
        if is_placeholder(&self.base_url) {
            return Err(Mt5Error::Config(format!(
                "{ENV_BRIDGE_URL} is missing or still a placeholder, set it to the bridge base URL"
            )));
        }
        let url = Url::parse(&self.base_url).map_err(|e| {
            Mt5Error::Config(format!("{ENV_BRIDGE_URL} is not a valid URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Mt5Error::Config(format!(
                "{ENV_BRIDGE_URL} must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if is_placeholder(&self.api_key) {
            return Err(Mt5Error::Config(format!(
                "{ENV_BRIDGE_API_KEY} is missing or still a placeholder, set it to the key issued for the bridge"
            )));
        }
        if self.http_timeout == 0 {
            return Err(Mt5Error::Config("HTTP timeout must be positive".to_string()));
        }
        if let Some(proxy) = &self.proxy {
            Url::parse(proxy)
                .map_err(|e| Mt5Error::Config(format!("{ENV_PROXY} is not a valid URL: {e}")))?;
        }
        Ok(())
    }
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>, Mt5Error>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Mt5Error::Config(format!("{key}: {e}"))),
    }
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    lower.is_empty() || PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}
