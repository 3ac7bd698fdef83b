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

//! Normalized data records produced by the gateway.
//!
//! These are plain values: every positions query materializes a fresh set and
//! nothing here is mutated in place afterwards.

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::common::{
    enums::{OrderSide, ReturnCode},
    volume::VolumeCandidate,
};

/// An open position as reported by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Unique open-trade identifier.
    pub ticket: u64,
    pub symbol: String,
    pub side: OrderSide,
    /// Volume in lots, as shown to the user.
    pub display_volume: f64,
    /// Volume in whatever unit the bridge reports; may differ from `display_volume`.
    pub native_volume: f64,
    pub open_price: f64,
    pub current_price: f64,
    pub profit: f64,
    pub swap: f64,
    pub commission: f64,
    pub open_time: Option<DateTime<Utc>>,
    pub comment: String,
    /// Robot token extracted from the comment, if any.
    pub bot_token: Option<String>,
}

impl Position {
    /// Floating result including swap and commission.
    pub fn net_profit(&self) -> f64 {
        self.profit + self.swap + self.commission
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub time: Option<DateTime<Utc>>,
}

impl Quote {
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Account balances merged from `AccountSummary` and, when available, `AccountDetails`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: f64,
    pub margin_level: f64,
    pub profit: f64,
    pub currency: Option<String>,
    pub leverage: Option<u32>,
    pub name: Option<String>,
    pub login: Option<u64>,
    pub server: Option<String>,
}

/// A new market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct OrderRequest {
    /// Logical symbol; resolved to the broker-native name before sending.
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    #[builder(setter(strip_option), default)]
    pub price: Option<f64>,
    #[builder(setter(strip_option), default)]
    pub stop_loss: Option<f64>,
    #[builder(setter(strip_option), default)]
    pub take_profit: Option<f64>,
    #[builder(setter(strip_option), default)]
    pub comment: Option<String>,
}

impl OrderRequest {
    pub fn builder() -> OrderRequestBuilder {
        OrderRequestBuilder::default()
    }
}

/// Structured result of a write operation. Write operations always produce
/// one of these instead of an error, so the bridge message is never lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOutcome {
    pub return_code: ReturnCode,
    pub ticket: Option<u64>,
    pub message: String,
    pub realized_profit: Option<f64>,
    /// The close volume the bridge accepted.
    pub accepted_candidate: Option<VolumeCandidate>,
}

impl OrderOutcome {
    pub fn success(ticket: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            return_code: ReturnCode::Done,
            ticket,
            message: message.into(),
            realized_profit: None,
            accepted_candidate: None,
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            return_code: ReturnCode::Failed(code),
            ticket: None,
            message: message.into(),
            realized_profit: None,
            accepted_candidate: None,
        }
    }

    pub fn with_realized_profit(mut self, profit: Option<f64>) -> Self {
        self.realized_profit = profit;
        self
    }

    pub fn with_candidate(mut self, candidate: VolumeCandidate) -> Self {
        self.accepted_candidate = Some(candidate);
        self
    }

    pub fn is_success(&self) -> bool {
        self.return_code.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_request_builder_defaults() {
        let request = OrderRequest::builder()
            .symbol("EURUSD")
            .side(OrderSide::Buy)
            .volume(0.01)
            .build()
            .unwrap();

        assert_eq!(request.symbol, "EURUSD");
        assert_eq!(request.price, None);
        assert_eq!(request.comment, None);
    }

    #[test]
    fn test_order_request_optional_fields() {
        let request = OrderRequest::builder()
            .symbol("GBPUSD")
            .side(OrderSide::Sell)
            .volume(0.5)
            .stop_loss(1.25)
            .comment("bot:abc".to_string())
            .build()
            .unwrap();

        assert_eq!(request.stop_loss, Some(1.25));
        assert_eq!(request.comment.as_deref(), Some("bot:abc"));
    }

    #[test]
    fn test_outcome_success_and_failure() {
        let ok = OrderOutcome::success(Some(7), "done").with_realized_profit(Some(12.5));
        assert!(ok.is_success());
        assert_eq!(ok.return_code.code(), 10009);
        assert_eq!(ok.realized_profit, Some(12.5));

        let failed = OrderOutcome::failure(10004, "rejected");
        assert!(!failed.is_success());
        assert_eq!(failed.ticket, None);
    }

    #[test]
    fn test_quote_spread() {
        let quote = Quote {
            symbol: "EURUSD".to_string(),
            bid: 1.1000,
            ask: 1.1002,
            time: None,
        };
        assert!((quote.spread() - 0.0002).abs() < 1e-9);
    }
}
