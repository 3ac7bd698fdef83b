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

//! Shared fixtures for unit tests.

use serde_json::{json, Value};

use crate::common::{enums::OrderSide, models::Position};

/// A raw open-position record as the bridge reports it.
pub fn position_record(ticket: u64, symbol: &str, lots: f64) -> Value {
    json!({
        "ticket": ticket,
        "symbol": symbol,
        "type": "Buy",
        "lots": lots,
        "volume": lots * 100.0,
        "openPrice": 1.1000,
        "currentPrice": 1.1050,
        "profit": 12.5,
        "swap": -0.3,
        "commission": -0.7,
        "openTime": "2024.05.01 10:15:00",
        "comment": "bot:alpha-7"
    })
}

pub fn sample_position(ticket: u64, display_volume: f64, native_volume: f64) -> Position {
    Position {
        ticket,
        symbol: "EURUSD".to_string(),
        side: OrderSide::Buy,
        display_volume,
        native_volume,
        open_price: 1.1,
        current_price: 1.105,
        profit: 12.5,
        swap: 0.0,
        commission: 0.0,
        open_time: None,
        comment: String::new(),
        bot_token: None,
    }
}
