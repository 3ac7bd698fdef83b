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

//! Single entry point wiring the session, resolver, read and write clients
//! around one bridge session.

use std::sync::Arc;

use crate::{
    common::{
        credential::Mt5Credential,
        enums::ConnectionStatus,
        models::{AccountInfo, OrderOutcome, OrderRequest, Position, Quote},
        symbol::SymbolMatch,
    },
    config::Mt5Config,
    data_client::Mt5DataClient,
    error::Mt5Error,
    execution_client::Mt5ExecutionClient,
    instrument_provider::Mt5InstrumentProvider,
    session::{SessionManager, SessionStore},
};

#[derive(Debug, Clone)]
pub struct Mt5Gateway {
    session: Arc<SessionManager>,
    instruments: Arc<Mt5InstrumentProvider>,
    data: Arc<Mt5DataClient>,
    execution: Arc<Mt5ExecutionClient>,
}

impl Mt5Gateway {
    /// Builds the gateway, restoring any token held by `store`.
    ///
    /// # Errors
    ///
    /// Returns [`Mt5Error::Config`] when the configuration is unusable.
    pub async fn new(config: Mt5Config, store: Arc<dyn SessionStore>) -> Result<Self, Mt5Error> {
        let session = Arc::new(SessionManager::new(config, store).await?);
        let instruments = Arc::new(Mt5InstrumentProvider::new(Arc::clone(&session)));
        let data = Arc::new(Mt5DataClient::new(
            Arc::clone(&session),
            Arc::clone(&instruments),
        ));
        let execution = Arc::new(Mt5ExecutionClient::new(
            Arc::clone(&session),
            Arc::clone(&instruments),
            Arc::clone(&data),
        ));

        Ok(Self {
            session,
            instruments,
            data,
            execution,
        })
    }

    /// Builds the gateway from `MT5_BRIDGE_URL`, `MT5_BRIDGE_API_KEY` and the
    /// optional contract variables.
    pub async fn from_env(store: Arc<dyn SessionStore>) -> Result<Self, Mt5Error> {
        Self::new(Mt5Config::from_env()?, store).await
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn instruments(&self) -> &Arc<Mt5InstrumentProvider> {
        &self.instruments
    }

    pub fn data(&self) -> &Arc<Mt5DataClient> {
        &self.data
    }

    pub fn execution(&self) -> &Arc<Mt5ExecutionClient> {
        &self.execution
    }

    pub async fn connect(&self, credential: &Mt5Credential) -> Result<(), Mt5Error> {
        self.instruments.invalidate_cache().await;
        self.session.connect(credential).await
    }

    pub async fn disconnect(&self) {
        self.session.disconnect().await;
        self.instruments.invalidate_cache().await;
    }

    pub async fn check_connection(&self) -> bool {
        self.session.check_connection().await
    }

    pub async fn is_connected(&self) -> bool {
        self.session.is_connected().await
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.session.status().await
    }

    pub async fn stored_token(&self) -> Option<String> {
        self.session.stored_token().await
    }

    pub async fn get_positions(&self) -> Result<Vec<Position>, Mt5Error> {
        self.data.get_positions().await
    }

    pub async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, Mt5Error> {
        self.data.get_quote(symbol).await
    }

    pub async fn get_quotes<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<Quote>, Mt5Error> {
        self.data.get_quotes(symbols).await
    }

    pub async fn get_account_info(&self) -> Result<Option<AccountInfo>, Mt5Error> {
        self.data.get_account_info().await
    }

    pub async fn get_symbol_list(&self) -> Result<Vec<String>, Mt5Error> {
        self.data.get_symbol_list().await
    }

    pub async fn resolve_symbol(&self, logical: &str) -> Result<SymbolMatch, Mt5Error> {
        self.instruments.resolve(logical).await
    }

    pub async fn send_order(&self, request: &OrderRequest) -> OrderOutcome {
        self.execution.send_order(request).await
    }

    pub async fn close_position(
        &self,
        ticket: u64,
        requested_volume: Option<f64>,
    ) -> Result<OrderOutcome, Mt5Error> {
        self.execution.close_position(ticket, requested_volume).await
    }
}
