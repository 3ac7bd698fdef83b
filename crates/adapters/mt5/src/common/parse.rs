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

//! Parsing utilities for MT5 bridge payloads.
//!
//! Bridge deployments disagree on field names (`ticket` vs `Ticket`, `lots`
//! vs `volume`), on number encodings (numbers vs numeric strings) and on
//! whether lists come bare or wrapped. Everything here is lenient: a record
//! that cannot be understood is skipped, never an error.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::common::{enums::OrderSide, models::Position};

const TICKET_FIELDS: &[&str] = &["ticket", "Ticket", "position", "Position", "order", "Order", "id"];
const SYMBOL_FIELDS: &[&str] = &["symbol", "Symbol"];
const SIDE_FIELDS: &[&str] = &["type", "Type", "orderType", "OrderType", "side", "Side", "cmd"];
const DISPLAY_VOLUME_FIELDS: &[&str] = &["lots", "Lots", "volumeLots"];
const NATIVE_VOLUME_FIELDS: &[&str] = &["volume", "Volume"];
const OPEN_PRICE_FIELDS: &[&str] = &["openPrice", "OpenPrice", "price_open", "priceOpen"];
const CURRENT_PRICE_FIELDS: &[&str] = &[
    "closePrice",
    "ClosePrice",
    "currentPrice",
    "CurrentPrice",
    "price_current",
    "priceCurrent",
];
const OPEN_TIME_FIELDS: &[&str] = &["openTime", "OpenTime", "time", "Time", "time_setup", "timeSetup"];
const LIST_WRAPPERS: &[&str] = &["positions", "Positions", "orders", "Orders", "result", "data", "symbols"];
const SYMBOL_NAME_FIELDS: &[&str] = &["symbol", "Symbol", "name", "Name"];
const BOT_TOKEN_MARKERS: [&str; 3] = ["bot:", "bot_", "bot="];

/// Decodes a raw response body.
///
/// Empty bodies and the literals `null`/`undefined` become `Value::Null`;
/// anything that is not JSON is kept as a string.
pub fn decode_body(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" || trimmed == "undefined" {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

/// Returns the first alias present on `obj` with a non-null value.
pub fn field<'a>(obj: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|key| obj.get(key).filter(|value| !value.is_null()))
}

/// Reads a number that may be encoded as a JSON number or a numeric string.
pub fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Reads an integer that may be encoded as a number, an integral float or a string.
pub fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn number_field(obj: &Value, aliases: &[&str]) -> Option<f64> {
    field(obj, aliases).and_then(number_value)
}

pub fn string_field(obj: &Value, aliases: &[&str]) -> Option<String> {
    match field(obj, aliases)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the list carried by `body`, unwrapping one level of envelope.
pub fn unwrap_list(body: &Value) -> Option<&Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(_) => LIST_WRAPPERS
            .iter()
            .find_map(|key| body.get(key).and_then(Value::as_array)),
        _ => None,
    }
}

/// Parses epoch seconds or milliseconds, RFC 3339, ISO without zone, or MT5 `YYYY.MM.DD HH:MM:SS`.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::Number(_) => number_value(value).and_then(from_epoch),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<f64>() {
                from_epoch(n)
            } else if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                Some(dt.with_timezone(&Utc))
            } else {
                ["%Y-%m-%dT%H:%M:%S%.f", "%Y.%m.%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"]
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }
        }
        _ => None,
    };
    // Bridges send 0001-01-01 or 0 for "unknown"
    parsed.filter(|dt| dt.timestamp() > 0)
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if value <= 0.0 {
        return None;
    }
    let millis = if value > 1e12 { value } else { value * 1000.0 };
    DateTime::from_timestamp_millis(millis as i64)
}

/// Extracts a robot token from a position comment (`bot:<token>`, `bot_<token>`, `bot=<token>`).
pub fn extract_bot_token(comment: &str) -> Option<String> {
    let lower = comment.to_ascii_lowercase();
    BOT_TOKEN_MARKERS.iter().find_map(|marker| {
        let start = lower.find(marker)? + marker.len();
        let token: String = comment[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        (!token.is_empty()).then_some(token)
    })
}

/// Positive ticket of a raw position or order record.
pub fn record_ticket(record: &Value) -> Option<u64> {
    field(record, TICKET_FIELDS)
        .and_then(integer_value)
        .filter(|t| *t > 0)
        .map(|t| t as u64)
}

/// Parses one raw position record. Pending orders, records without a
/// positive ticket and records without a symbol yield `None`.
pub fn parse_position(record: &Value) -> Option<Position> {
    if !record.is_object() {
        return None;
    }

    let ticket = record_ticket(record)?;
    let symbol = string_field(record, SYMBOL_FIELDS)?;
    let side = match field(record, SIDE_FIELDS)? {
        Value::String(s) => OrderSide::from_bridge(s),
        Value::Number(n) => OrderSide::from_bridge(&n.to_string()),
        _ => None,
    }?;

    let display = number_field(record, DISPLAY_VOLUME_FIELDS);
    let native = number_field(record, NATIVE_VOLUME_FIELDS);
    let (display_volume, native_volume) = match (display, native) {
        (Some(d), Some(n)) => (d, n),
        (Some(d), None) => (d, d),
        (None, Some(n)) => (n, n),
        (None, None) => (0.0, 0.0),
    };

    let comment = string_field(record, &["comment", "Comment"]).unwrap_or_default();
    let bot_token = extract_bot_token(&comment);

    Some(Position {
        ticket,
        symbol,
        side,
        display_volume,
        native_volume,
        open_price: number_field(record, OPEN_PRICE_FIELDS).unwrap_or_default(),
        current_price: number_field(record, CURRENT_PRICE_FIELDS).unwrap_or_default(),
        profit: number_field(record, &["profit", "Profit"]).unwrap_or_default(),
        swap: number_field(record, &["swap", "Swap"]).unwrap_or_default(),
        commission: number_field(record, &["commission", "Commission"]).unwrap_or_default(),
        open_time: field(record, OPEN_TIME_FIELDS).and_then(parse_timestamp),
        comment,
        bot_token,
    })
}

/// Parses a symbol list given as an array of strings or objects, a wrapped
/// array, or a delimited string. Order is preserved and duplicates dropped.
pub fn parse_symbol_list(body: &Value) -> Vec<String> {
    let raw: Vec<String> = match body {
        Value::String(s) => s
            .split([',', ';', '|', '\n', '\r'])
            .map(|part| part.trim().trim_matches('"').to_string())
            .collect(),
        _ => unwrap_list(body)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Object(_) => string_field(item, SYMBOL_NAME_FIELDS),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default(),
    };

    let mut symbols: Vec<String> = Vec::with_capacity(raw.len());
    for symbol in raw {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}
