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

//! Wire models for MT5 bridge responses.
//!
//! Numbers may arrive as JSON numbers or numeric strings and field casing
//! varies between deployments, so every field accepts both.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};

use crate::common::{
    models::{AccountInfo, Quote},
    parse::parse_timestamp,
};

/// `/GetQuote` payload.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteWire {
    #[serde(alias = "Bid")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub bid: f64,
    #[serde(alias = "Ask")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub ask: f64,
    #[serde(default, alias = "Time")]
    pub time: Option<Value>,
    #[serde(default, alias = "Symbol")]
    pub symbol: Option<String>,
}

impl QuoteWire {
    pub fn into_quote(self, requested_symbol: &str) -> Quote {
        Quote {
            symbol: self
                .symbol
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| requested_symbol.to_string()),
            bid: self.bid,
            ask: self.ask,
            time: self.time.as_ref().and_then(parse_timestamp),
        }
    }
}

/// `/AccountSummary` payload. Missing or `null` balances read as zero.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSummaryWire {
    #[serde(alias = "Balance")]
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub balance: f64,
    #[serde(alias = "Equity")]
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub equity: f64,
    #[serde(alias = "Margin")]
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub margin: f64,
    #[serde(alias = "FreeMargin", alias = "freeMargin", alias = "margin_free")]
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub free_margin: f64,
    #[serde(alias = "MarginLevel", alias = "marginLevel")]
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub margin_level: f64,
    #[serde(alias = "Profit")]
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub profit: f64,
    #[serde(alias = "Currency")]
    pub currency: Option<String>,
    #[serde(alias = "Leverage")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub leverage: Option<u32>,
}

/// `/AccountDetails` payload. Every field is optional.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountDetailsWire {
    #[serde(alias = "Name", alias = "userName", alias = "UserName")]
    pub name: Option<String>,
    #[serde(alias = "Login", alias = "user", alias = "User")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub login: Option<u64>,
    #[serde(alias = "Server", alias = "serverName", alias = "ServerName")]
    pub server: Option<String>,
    #[serde(alias = "Leverage")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub leverage: Option<u32>,
    #[serde(alias = "Currency")]
    pub currency: Option<String>,
}

impl AccountSummaryWire {
    pub fn into_account_info(self, details: Option<AccountDetailsWire>) -> AccountInfo {
        let details = details.unwrap_or_default();
        AccountInfo {
            balance: self.balance,
            equity: self.equity,
            margin: self.margin,
            free_margin: self.free_margin,
            margin_level: self.margin_level,
            profit: self.profit,
            currency: self.currency.or(details.currency),
            leverage: self.leverage.or(details.leverage),
            name: details.name,
            login: details.login,
            server: details.server,
        }
    }
}

/// Strips a `result`/`data` envelope around a single object.
pub fn unwrap_object(body: &Value) -> &Value {
    ["result", "data"]
        .iter()
        .find_map(|key| body.get(key).filter(|inner| inner.is_object()))
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_quote_accepts_strings_and_casing() {
        let wire: QuoteWire =
            serde_json::from_value(json!({"Bid": "1.1000", "Ask": 1.1002, "time": 1_700_000_000}))
                .unwrap();
        let quote = wire.into_quote("EURUSD");

        assert_eq!(quote.symbol, "EURUSD");
        assert_eq!(quote.bid, 1.1);
        assert_eq!(quote.ask, 1.1002);
        assert_eq!(quote.time.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_quote_requires_prices() {
        let result: Result<QuoteWire, _> = serde_json::from_value(json!({"bid": 1.0}));
        assert!(result.is_err());
    }

    #[test]
    fn test_account_merge() {
        let summary: AccountSummaryWire = serde_json::from_value(json!({
            "Balance": 1000.0,
            "Equity": "1010.5",
            "freeMargin": 900,
            "Currency": "USD"
        }))
        .unwrap();
        let details: AccountDetailsWire = serde_json::from_value(json!({
            "UserName": "Demo",
            "Login": "5551234",
            "Leverage": 500
        }))
        .unwrap();

        let info = summary.into_account_info(Some(details));
        assert_eq!(info.balance, 1000.0);
        assert_eq!(info.equity, 1010.5);
        assert_eq!(info.free_margin, 900.0);
        assert_eq!(info.currency.as_deref(), Some("USD"));
        assert_eq!(info.leverage, Some(500));
        assert_eq!(info.login, Some(5_551_234));
        assert_eq!(info.name.as_deref(), Some("Demo"));
    }

    #[test]
    fn test_account_summary_null_fields_default_to_zero() {
        let summary: AccountSummaryWire = serde_json::from_value(json!({
            "balance": 1000.0,
            "equity": 1000.0,
            "margin": 0.0,
            "marginLevel": null,
            "Profit": null
        }))
        .unwrap();

        let info = summary.into_account_info(None);
        assert_eq!(info.balance, 1000.0);
        assert_eq!(info.margin_level, 0.0);
        assert_eq!(info.profit, 0.0);
    }

    #[test]
    fn test_unwrap_object() {
        let wrapped = json!({"result": {"bid": 1.0}});
        assert_eq!(unwrap_object(&wrapped), &json!({"bid": 1.0}));
        let bare = json!({"bid": 1.0});
        assert_eq!(unwrap_object(&bare), &bare);
    }
}
