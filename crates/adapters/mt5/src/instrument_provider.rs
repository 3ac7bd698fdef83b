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

//! Broker symbol discovery and resolution.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;

use crate::{
    common::{
        enums::OrderMethod,
        parse::parse_symbol_list,
        symbol::{resolve_symbol, SymbolMatch},
    },
    error::Mt5Error,
    http::query::SymbolParams,
    session::SessionManager,
};

#[derive(Debug)]
struct SymbolCache {
    token: String,
    fetched_at: Instant,
    symbols: Arc<Vec<String>>,
}

/// Resolves logical symbols against the broker's published list.
///
/// The list is cached per session token for the configured TTL.
#[derive(Debug)]
pub struct Mt5InstrumentProvider {
    session: Arc<SessionManager>,
    cache: RwLock<Option<SymbolCache>>,
}

impl Mt5InstrumentProvider {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            session,
            cache: RwLock::new(None),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.session.config().symbol_cache_ttl)
    }

    /// Returns the broker symbol list, fetching it when the cache is cold.
    ///
    /// # Errors
    ///
    /// Returns an error when not connected, when the session expired, or when
    /// the bridge cannot be reached.
    pub async fn symbols(&self) -> Result<Arc<Vec<String>>, Mt5Error> {
        let token = self.session.token().await.ok_or(Mt5Error::NotConnected)?;

        if let Some(cache) = self.cache.read().await.as_ref() {
            if cache.token == token && cache.fetched_at.elapsed() < self.ttl() {
                return Ok(Arc::clone(&cache.symbols));
            }
        }

        let url = self.session.http().url().symbol_list_url();
        let response = self
            .session
            .request(OrderMethod::Get, &url, serde_json::Value::Null)
            .await?;
        if !response.is_success() {
            return Err(Mt5Error::BridgeRejected(format!(
                "SymbolList returned HTTP {}",
                response.status
            )));
        }

        let symbols = Arc::new(parse_symbol_list(&response.body));
        tracing::debug!(count = symbols.len(), "Loaded broker symbol list");

        if !symbols.is_empty() {
            *self.cache.write().await = Some(SymbolCache {
                token,
                fetched_at: Instant::now(),
                symbols: Arc::clone(&symbols),
            });
        }
        Ok(symbols)
    }

    pub async fn invalidate_cache(&self) {
        self.cache.write().await.take();
    }

    /// Resolves `logical` to a broker symbol.
    ///
    /// # Errors
    ///
    /// Returns [`Mt5Error::UnresolvedSymbol`] when nothing matches, or the
    /// error raised while fetching the list.
    pub async fn resolve(&self, logical: &str) -> Result<SymbolMatch, Mt5Error> {
        let symbols = self.symbols().await?;
        resolve_symbol(logical, &symbols)
            .ok_or_else(|| Mt5Error::UnresolvedSymbol(logical.to_string()))
    }

    /// Resolves `logical`, falling back to the raw symbol when resolution
    /// fails for any reason other than the session itself.
    pub async fn resolve_or_raw(&self, logical: &str) -> Result<String, Mt5Error> {
        match self.resolve(logical).await {
            Ok(found) => {
                if found.symbol != logical {
                    tracing::debug!(logical, resolved = %found.symbol, kind = %found.kind, "Resolved symbol");
                }
                Ok(found.symbol)
            }
            Err(e @ (Mt5Error::AuthenticationExpired(_) | Mt5Error::NotConnected)) => Err(e),
            Err(e) => {
                tracing::warn!(logical, error = %e, "Symbol resolution failed, using raw symbol");
                Ok(logical.to_string())
            }
        }
    }

    /// Subscribes `symbol` for quotes. Failure is logged and ignored unless
    /// the session expired.
    pub async fn subscribe(&self, symbol: &str) -> Result<(), Mt5Error> {
        let url = self.session.http().url().subscribe_url();
        let params = serde_json::to_value(SymbolParams {
            symbol: symbol.to_string(),
        })
        .map_err(|e| Mt5Error::Transport(e.to_string()))?;

        match self.session.request(OrderMethod::Get, &url, params).await {
            Ok(response) if response.is_success() => {
                tracing::debug!(symbol, "Subscribed symbol");
                Ok(())
            }
            Ok(response) => {
                tracing::warn!(symbol, status = response.status, "Symbol subscribe rejected");
                Ok(())
            }
            Err(e @ Mt5Error::AuthenticationExpired(_)) => Err(e),
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Symbol subscribe failed");
                Ok(())
            }
        }
    }

    /// Resolves and subscribes `logical`, returning the symbol to trade or quote.
    pub async fn prepare(&self, logical: &str) -> Result<String, Mt5Error> {
        let symbol = self.resolve_or_raw(logical).await?;
        self.subscribe(&symbol).await?;
        Ok(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Mt5Config, session::MemorySessionStore};

    #[tokio::test]
    async fn test_symbols_requires_session() {
        let session = SessionManager::new(
            Mt5Config::new("http://127.0.0.1:9", "key"),
            Arc::new(MemorySessionStore::new()),
        )
        .await
        .unwrap();
        let provider = Mt5InstrumentProvider::new(Arc::new(session));

        assert_eq!(provider.symbols().await, Err(Mt5Error::NotConnected));
        assert_eq!(provider.prepare("EURUSD").await, Err(Mt5Error::NotConnected));
    }
}
