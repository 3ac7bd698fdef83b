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

//! Read operations against the MT5 bridge: positions, quotes, account info
//! and the symbol list.
//!
//! Reads degrade to an empty result on failure. The exceptions are an expired
//! login and a missing session, which are returned so the caller can log in again.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    common::{
        enums::OrderMethod,
        models::{AccountInfo, Position, Quote},
        parse::{parse_position, unwrap_list},
    },
    error::Mt5Error,
    http::{
        models::{unwrap_object, AccountDetailsWire, AccountSummaryWire, QuoteWire},
        parse::classify,
        query::SymbolParams,
    },
    instrument_provider::Mt5InstrumentProvider,
    session::SessionManager,
};

/// Swallows recoverable read failures, keeping session errors.
fn degrade<T>(result: Result<T, Mt5Error>, fallback: T, operation: &str) -> Result<T, Mt5Error> {
    match result {
        Ok(value) => Ok(value),
        Err(e @ (Mt5Error::AuthenticationExpired(_) | Mt5Error::NotConnected)) => Err(e),
        Err(e) => {
            tracing::warn!(operation, error = %e, "MT5 read failed");
            Ok(fallback)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mt5DataClient {
    session: Arc<SessionManager>,
    instruments: Arc<Mt5InstrumentProvider>,
}

impl Mt5DataClient {
    pub fn new(session: Arc<SessionManager>, instruments: Arc<Mt5InstrumentProvider>) -> Self {
        Self {
            session,
            instruments,
        }
    }

    /// Fetches the raw open-position records, returning every failure.
    ///
    /// Only `null` or a (possibly wrapped) list counts as an answer; any other
    /// shape is an error, so an empty result always means "no open positions".
    pub async fn fetch_position_records(&self) -> Result<Vec<Value>, Mt5Error> {
        let endpoint = self.session.config().positions_endpoint;
        let url = self.session.http().url().positions_url(endpoint);
        let response = self
            .session
            .request(OrderMethod::Get, &url, Value::Null)
            .await?;

        if !response.is_success() {
            return Err(Mt5Error::BridgeRejected(format!(
                "{endpoint:?} returned HTTP {}",
                response.status
            )));
        }

        match &response.body {
            Value::Null => Ok(Vec::new()),
            body => unwrap_list(body).cloned().ok_or_else(|| {
                Mt5Error::BridgeRejected(classify(body, "Positions").message().to_string())
            }),
        }
    }

    /// Fetches open positions, returning every failure.
    pub async fn fetch_positions(&self) -> Result<Vec<Position>, Mt5Error> {
        let records = self.fetch_position_records().await?;
        let positions: Vec<Position> = records.iter().filter_map(parse_position).collect();
        if positions.len() < records.len() {
            tracing::debug!(
                skipped = records.len() - positions.len(),
                "Skipped non-position records"
            );
        }
        Ok(positions)
    }

    /// Open positions, or an empty list when the bridge cannot answer.
    pub async fn get_positions(&self) -> Result<Vec<Position>, Mt5Error> {
        degrade(self.fetch_positions().await, Vec::new(), "positions")
    }

    /// Latest quote for `symbol`, resolved and subscribed first.
    pub async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, Mt5Error> {
        let resolved = self.instruments.prepare(symbol).await?;
        degrade(self.fetch_quote(&resolved).await.map(Some), None, "quote")
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, Mt5Error> {
        let url = self.session.http().url().quote_url();
        let params = serde_json::to_value(SymbolParams {
            symbol: symbol.to_string(),
        })
        .map_err(|e| Mt5Error::Transport(e.to_string()))?;

        let response = self.session.request(OrderMethod::Get, &url, params).await?;
        if !response.is_success() {
            return Err(Mt5Error::BridgeRejected(format!(
                "GetQuote returned HTTP {}",
                response.status
            )));
        }

        let body = unwrap_object(&response.body);
        serde_json::from_value::<QuoteWire>(body.clone())
            .map(|wire| wire.into_quote(symbol))
            .map_err(|_| Mt5Error::BridgeRejected(classify(body, "GetQuote").message().to_string()))
    }

    /// Quotes for each symbol that has one, in request order.
    pub async fn get_quotes<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<Quote>, Mt5Error> {
        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if let Some(quote) = self.get_quote(symbol.as_ref()).await? {
                quotes.push(quote);
            }
        }
        Ok(quotes)
    }

    /// Account balances. `/AccountDetails` is optional and only enriches the result.
    pub async fn get_account_info(&self) -> Result<Option<AccountInfo>, Mt5Error> {
        let summary = degrade(self.fetch_account_summary().await.map(Some), None, "account summary")?;
        let Some(summary) = summary else {
            return Ok(None);
        };
        let details = degrade(self.fetch_account_details().await.map(Some), None, "account details")?;
        Ok(Some(summary.into_account_info(details)))
    }

    async fn fetch_account_summary(&self) -> Result<AccountSummaryWire, Mt5Error> {
        let url = self.session.http().url().account_summary_url();
        let body = self.fetch_object(&url, "AccountSummary").await?;
        serde_json::from_value(body)
            .map_err(|e| Mt5Error::BridgeRejected(format!("malformed AccountSummary: {e}")))
    }

    async fn fetch_account_details(&self) -> Result<AccountDetailsWire, Mt5Error> {
        let url = self.session.http().url().account_details_url();
        let body = self.fetch_object(&url, "AccountDetails").await?;
        serde_json::from_value(body)
            .map_err(|e| Mt5Error::BridgeRejected(format!("malformed AccountDetails: {e}")))
    }

    async fn fetch_object(&self, url: &str, operation: &str) -> Result<Value, Mt5Error> {
        let response = self.session.request(OrderMethod::Get, url, Value::Null).await?;
        if !response.is_success() {
            return Err(Mt5Error::BridgeRejected(format!(
                "{operation} returned HTTP {}",
                response.status
            )));
        }
        let body = unwrap_object(&response.body);
        let has_error = body
            .get("error")
            .or_else(|| body.get("Error"))
            .is_some_and(|e| !e.is_null() && e.as_str().map_or(true, |s| !s.trim().is_empty()));
        if !body.is_object() || has_error {
            return Err(Mt5Error::BridgeRejected(
                classify(body, operation).message().to_string(),
            ));
        }
        Ok(body.clone())
    }

    /// The broker's published symbols, or an empty list when unavailable.
    pub async fn get_symbol_list(&self) -> Result<Vec<String>, Mt5Error> {
        let symbols = self.instruments.symbols().await.map(|s| s.as_ref().clone());
        degrade(symbols, Vec::new(), "symbol list")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Mt5Error::AuthenticationExpired("Session expired".into()), true)]
    #[case(Mt5Error::NotConnected, true)]
    #[case(Mt5Error::Transport("timeout".into()), false)]
    #[case(Mt5Error::BridgeRejected("HTTP 500".into()), false)]
    fn test_degrade(#[case] err: Mt5Error, #[case] propagated: bool) {
        let result = degrade::<Vec<Position>>(Err(err.clone()), Vec::new(), "positions");
        if propagated {
            assert_eq!(result, Err(err));
        } else {
            assert_eq!(result, Ok(Vec::new()));
        }
    }
}
