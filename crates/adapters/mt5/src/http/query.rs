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

//! Structs for the MT5 bridge query parameters.

use derive_builder::Builder;
use serde::Serialize;
use serde_json::Value;

use crate::common::volume::format_decimal;

/// Parameters for `/ConnectEx`. Never logged.
#[derive(Clone, Serialize)]
pub struct ConnectParams {
    pub user: String,
    pub password: String,
    pub server: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SymbolParams {
    pub symbol: String,
}

#[derive(Clone, Debug, Serialize, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct OrderSendParams {
    pub symbol: String,
    pub operation: String,
    pub volume: f64,
    pub slippage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stoploss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub takeprofit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Default for OrderSendParams {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            operation: String::new(),
            volume: 0.0,
            slippage: 0,
            price: None,
            stoploss: None,
            takeprofit: None,
            comment: None,
        }
    }
}

impl OrderSendParams {
    pub fn builder() -> OrderSendParamsBuilder {
        OrderSendParamsBuilder::default()
    }
}

/// Close request. Exactly one of `lots`/`volume` is set depending on the
/// bridge contract.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OrderCloseParams {
    pub ticket: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lots: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// Flattens a serialized parameter object into query pairs.
///
/// Floats are written in plain decimal so `0.01` never becomes `1e-2`.
pub fn encode_query(params: &Value) -> Vec<(String, String)> {
    let Some(map) = params.as_object() else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Number(n) if n.is_f64() => format_decimal(n.as_f64().unwrap_or_default()),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_order_send_skips_unset_fields() {
        let params = OrderSendParams::builder()
            .symbol("EURUSD")
            .operation("Buy")
            .volume(0.1)
            .slippage(10_u32)
            .stoploss(1.05)
            .build()
            .unwrap();
        let value = serde_json::to_value(&params).unwrap();

        assert_eq!(
            value,
            json!({
                "symbol": "EURUSD",
                "operation": "Buy",
                "volume": 0.1,
                "slippage": 10,
                "stoploss": 1.05
            })
        );
    }

    #[test]
    fn test_encode_query_formats_plain_decimals() {
        let pairs = encode_query(&json!({"ticket": 42, "lots": 0.00001, "id": "abc", "x": null}));

        assert_eq!(
            pairs,
            vec![
                ("id".to_string(), "abc".to_string()),
                ("lots".to_string(), "0.00001".to_string()),
                ("ticket".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn test_close_params_single_field() {
        let params = OrderCloseParams {
            ticket: 7,
            volume: Some(100.0),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"ticket": 7, "volume": 100.0})
        );
    }
}
