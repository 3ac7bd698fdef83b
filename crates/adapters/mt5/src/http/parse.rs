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

//! Response normalization for the MT5 bridge.
//!
//! [`classify`] reduces an arbitrary decoded body to a [`BridgeReply`]. It is
//! total and pure. Rules are applied in a fixed precedence:
//!
//! 1. `null` body: accepted (the bridge answers some writes with an empty body).
//! 2. Object with a positive `ticket`/`order`: accepted with that ticket.
//! 3. Object with `retcode`: 10009 accepted, anything else rejected.
//! 4. Object with `success`: `true` accepted (token or ticket from common aliases), `false` rejected.
//! 5. Object with `error`/`Error`: rejected.
//! 6. Object with a `message` string: keyword scan.
//! 7. Any other object: assumed success. Silence is treated optimistically
//!    because the bridge omits fields on the happy path far more often than it
//!    signals a clean failure.
//! 8. String: integer ticket, then keyword scan, then informational success.
//! 9. Number: positive ticket, zero accepted, negative rejected with `abs` as code.
//! 10. Boolean.
//! 11. Anything else: rejected.

use serde_json::{Map, Value};

use crate::{
    common::{
        consts::{
            AUTH_FAILURE_PHRASES, ERROR_KEYWORDS, MIN_TOKEN_LEN, SUCCESS_KEYWORDS,
            TRADE_RETCODE_DONE, TRADE_RETCODE_ERROR, TRADE_RETCODE_INVALID_VOLUME,
            TRADE_RETCODE_POSITION_CLOSED,
        },
        parse::{field, integer_value, string_field},
    },
    error::Mt5Error,
};

const TICKET_FIELDS: &[&str] = &["ticket", "order", "Ticket", "Order"];
const RETCODE_FIELDS: &[&str] = &["retcode", "retCode", "Retcode", "RetCode"];
const TOKEN_FIELDS: &[&str] = &["id", "sessionId", "connectionId", "accessToken", "token"];
const MESSAGE_FIELDS: &[&str] = &["message", "Message", "comment", "Comment", "description"];

const ALREADY_CLOSED_PATTERNS: [&str; 7] = [
    "already closed",
    "position not found",
    "position does not exist",
    "position doesn't exist",
    "no such position",
    "ticket not found",
    "position closed already",
];
const INVALID_VOLUME_PATTERNS: [&str; 5] = [
    "invalid volume",
    "invalid lots",
    "invalid lot",
    "wrong volume",
    "incorrect volume",
];

/// Normalized outcome of a bridge call.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeReply {
    /// Success carrying a session token or other opaque id.
    Token { token: String, message: String },
    /// Success, with the order/position ticket when the bridge sent one.
    Accepted { ticket: Option<u64>, message: String },
    /// Explicit failure.
    Rejected { code: Option<i64>, message: String },
    /// Unrecognized shape with no error signal.
    AssumedSuccess { message: String },
}

impl BridgeReply {
    pub fn is_success(&self) -> bool {
        !matches!(self, BridgeReply::Rejected { .. })
    }

    pub fn ticket(&self) -> Option<u64> {
        match self {
            BridgeReply::Accepted { ticket, .. } => *ticket,
            _ => None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            BridgeReply::Rejected { code, .. } => *code,
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BridgeReply::Token { message, .. }
            | BridgeReply::Accepted { message, .. }
            | BridgeReply::Rejected { message, .. }
            | BridgeReply::AssumedSuccess { message } => message,
        }
    }

    fn accepted(ticket: Option<u64>, message: impl Into<String>) -> Self {
        BridgeReply::Accepted {
            ticket,
            message: message.into(),
        }
    }

    fn rejected(code: Option<i64>, message: impl Into<String>) -> Self {
        BridgeReply::Rejected {
            code,
            message: message.into(),
        }
    }
}

/// Classifies a decoded response body for `operation`.
pub fn classify(body: &Value, operation: &str) -> BridgeReply {
    match body {
        Value::Null => BridgeReply::accepted(None, format!("{operation} accepted")),
        Value::Object(map) => classify_object(body, map, operation),
        Value::String(text) => classify_text(text, operation),
        Value::Number(_) => classify_number(body, operation),
        Value::Bool(true) => BridgeReply::accepted(None, format!("{operation} succeeded")),
        Value::Bool(false) => BridgeReply::rejected(None, format!("{operation} failed")),
        Value::Array(_) => {
            BridgeReply::rejected(None, format!("{operation}: unexpected response format"))
        }
    }
}

fn positive_ticket(value: &Value) -> Option<u64> {
    integer_value(value).filter(|t| *t > 0).map(|t| t as u64)
}

fn classify_object(body: &Value, map: &Map<String, Value>, operation: &str) -> BridgeReply {
    let message = string_field(body, MESSAGE_FIELDS);

    if let Some(ticket) = field(body, TICKET_FIELDS).and_then(positive_ticket) {
        return BridgeReply::accepted(
            Some(ticket),
            message.unwrap_or_else(|| format!("{operation} accepted, ticket {ticket}")),
        );
    }

    if let Some(retcode) = field(body, RETCODE_FIELDS) {
        let code = integer_value(retcode);
        return if code == Some(TRADE_RETCODE_DONE) {
            let ticket = field(body, &["deal", "Deal", "position"]).and_then(positive_ticket);
            BridgeReply::accepted(
                ticket,
                message.unwrap_or_else(|| format!("{operation} done")),
            )
        } else {
            let code_text = code.map_or_else(|| retcode.to_string(), |c| c.to_string());
            let detail = message.map(|m| format!(": {m}")).unwrap_or_default();
            BridgeReply::rejected(code, format!("{operation} rejected with retcode {code_text}{detail}"))
        };
    }

    if let Some(success) = map.get("success").and_then(Value::as_bool) {
        return if success {
            if let Some(token) = string_field(body, TOKEN_FIELDS) {
                BridgeReply::Token {
                    token,
                    message: message.unwrap_or_else(|| format!("{operation} succeeded")),
                }
            } else {
                BridgeReply::accepted(
                    None,
                    message.unwrap_or_else(|| format!("{operation} succeeded")),
                )
            }
        } else {
            let reason = error_text(body)
                .or(message)
                .unwrap_or_else(|| format!("{operation} failed"));
            BridgeReply::rejected(None, reason)
        };
    }

    if let Some(error) = error_text(body) {
        return BridgeReply::rejected(None, error);
    }

    if let Some(text) = map.get("message").and_then(Value::as_str) {
        if let Some(reply) = classify_keywords(text) {
            return reply;
        }
    }

    BridgeReply::AssumedSuccess {
        message: message
            .unwrap_or_else(|| format!("unrecognized {operation} response, assuming success")),
    }
}

fn error_text(body: &Value) -> Option<String> {
    match field(body, &["error", "Error"])? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(false) => None,
        Value::Object(inner) => inner
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(Value::Object(inner.clone()).to_string())),
        other => Some(other.to_string()),
    }
}

/// Error keywords are checked first so "invalid order, not placed" is a failure.
fn classify_keywords(text: &str) -> Option<BridgeReply> {
    let lower = text.to_ascii_lowercase();
    if ERROR_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(BridgeReply::rejected(None, text.trim()))
    } else if SUCCESS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(BridgeReply::accepted(None, text.trim()))
    } else {
        None
    }
}

fn classify_text(text: &str, operation: &str) -> BridgeReply {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return classify(&Value::Null, operation);
    }
    if let Ok(number) = trimmed.parse::<i64>() {
        return classify_number(&Value::from(number), operation);
    }
    classify_keywords(trimmed).unwrap_or_else(|| BridgeReply::accepted(None, trimmed))
}

fn classify_number(body: &Value, operation: &str) -> BridgeReply {
    let value = body.as_f64().unwrap_or_default();
    if value > 0.0 {
        BridgeReply::accepted(
            Some(value as u64),
            format!("{operation} accepted, ticket {}", value as u64),
        )
    } else if value == 0.0 {
        BridgeReply::accepted(None, format!("{operation} accepted"))
    } else {
        // A failure never carries the success code.
        let code = match value.abs() as i64 {
            0 | TRADE_RETCODE_DONE => TRADE_RETCODE_ERROR,
            code => code,
        };
        BridgeReply::rejected(Some(code), format!("{operation} failed with code {code}"))
    }
}

/// True when `text` carries one of the bridge's session-invalid phrases.
pub fn is_auth_failure_text(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    AUTH_FAILURE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// True when a close reply says the position no longer exists.
pub fn is_already_closed(reply: &BridgeReply, raw: &str) -> bool {
    if reply.code() == Some(TRADE_RETCODE_POSITION_CLOSED) {
        return true;
    }
    let text = format!("{} {}", reply.message(), raw).to_ascii_lowercase();
    ALREADY_CLOSED_PATTERNS.iter().any(|p| text.contains(p))
}

/// True when a close reply rejects the volume encoding.
pub fn is_invalid_volume(reply: &BridgeReply, raw: &str) -> bool {
    if reply.code() == Some(TRADE_RETCODE_INVALID_VOLUME) {
        return true;
    }
    let text = format!("{} {}", reply.message(), raw).to_ascii_lowercase();
    INVALID_VOLUME_PATTERNS.iter().any(|p| text.contains(p))
}

/// Parses the reply to `/ConnectEx` into a session token.
///
/// Failures are mapped onto the connect-time error taxonomy with
/// user-facing wording.
pub fn parse_connect_reply(body: &Value) -> Result<String, Mt5Error> {
    match body {
        Value::String(text) => {
            let token = text.trim().trim_matches('"');
            if looks_like_token(token) {
                Ok(token.to_string())
            } else {
                Err(map_connect_error(token))
            }
        }
        Value::Number(n) => match integer_value(body) {
            Some(id) if id > 0 => Ok(id.to_string()),
            _ => Err(map_connect_error(&format!("connect failed with code {n}"))),
        },
        Value::Object(_) => {
            if let Some(error) = error_text(body) {
                return Err(map_connect_error(&error));
            }
            if body.get("success").and_then(Value::as_bool) == Some(false) {
                let reason = string_field(body, MESSAGE_FIELDS)
                    .unwrap_or_else(|| "connect failed".to_string());
                return Err(map_connect_error(&reason));
            }
            let token_fields = ["token", "id", "sessionId", "connectionId", "accessToken", "result"];
            match string_field(body, &token_fields) {
                Some(token) if looks_like_token(&token) => Ok(token),
                _ => {
                    let reason = string_field(body, MESSAGE_FIELDS)
                        .unwrap_or_else(|| "no session token in connect response".to_string());
                    Err(map_connect_error(&reason))
                }
            }
        }
        Value::Null => Err(Mt5Error::BridgeRejected(
            "empty response to connect request".to_string(),
        )),
        _ => Err(Mt5Error::BridgeRejected(
            "unexpected connect response format".to_string(),
        )),
    }
}

fn looks_like_token(text: &str) -> bool {
    text.len() >= MIN_TOKEN_LEN
        && !text.chars().any(char::is_whitespace)
        && !is_auth_failure_text(text)
        && !ERROR_KEYWORDS.iter().any(|k| text.to_ascii_lowercase().contains(k))
}

/// Maps bridge connect failure text onto user-facing errors. The bridge text
/// is kept only when no specific condition is recognized.
pub fn map_connect_error(text: &str) -> Mt5Error {
    let lower = text.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["disabled", "blocked", "inactive", "suspended"]) {
        Mt5Error::AccountDisabled("contact your broker to re-enable the account".to_string())
    } else if has(&["maintenance"]) {
        Mt5Error::BridgeRejected(
            "the broker server is under maintenance, try again later".to_string(),
        )
    } else if has(&["password", "account", "login", "user", "authorization", "credentials"]) {
        Mt5Error::InvalidCredentials("check the account number and password".to_string())
    } else if has(&["server", "host", "no connection", "network"]) {
        Mt5Error::InvalidServer("check the trading server name".to_string())
    } else {
        let detail: String = text.trim().chars().take(200).collect();
        Mt5Error::BridgeRejected(if detail.is_empty() {
            "connect failed".to_string()
        } else {
            detail
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::null(Value::Null, true, None)]
    #[case::ticket(json!({"ticket": 555}), true, Some(555))]
    #[case::order_string(json!({"order": "777"}), true, Some(777))]
    #[case::zero_ticket_falls_through(json!({"ticket": 0}), true, None)]
    #[case::retcode_done(json!({"retcode": 10009, "deal": 12}), true, Some(12))]
    #[case::retcode_fail(json!({"retcode": 10019, "comment": "No money"}), false, None)]
    #[case::success_true(json!({"success": true}), true, None)]
    #[case::success_false(json!({"success": false}), false, None)]
    #[case::error(json!({"error": "Market closed"}), false, None)]
    #[case::error_upper(json!({"Error": "Trade disabled"}), false, None)]
    #[case::message_success(json!({"message": "Order executed"}), true, None)]
    #[case::message_error(json!({"message": "Request failed"}), false, None)]
    #[case::unknown_object(json!({"foo": 1}), true, None)]
    #[case::string_ticket(json!("123456"), true, Some(123456))]
    #[case::string_success(json!("Order placed"), true, None)]
    #[case::string_error(json!("ERROR: invalid stops"), false, None)]
    #[case::string_info(json!("queued"), true, None)]
    #[case::number_positive(json!(42), true, Some(42))]
    #[case::number_zero(json!(0), true, None)]
    #[case::number_negative(json!(-10014), false, None)]
    #[case::bool_true(json!(true), true, None)]
    #[case::bool_false(json!(false), false, None)]
    #[case::array(json!([1, 2]), false, None)]
    fn test_classify_shapes(
        #[case] body: Value,
        #[case] success: bool,
        #[case] ticket: Option<u64>,
    ) {
        let reply = classify(&body, "OrderSend");
        assert_eq!(reply.is_success(), success, "{reply:?}");
        assert_eq!(reply.ticket(), ticket, "{reply:?}");
    }

    #[test]
    fn test_retcode_beats_error() {
        let reply = classify(&json!({"retcode": 10009, "error": "x"}), "OrderSend");
        assert!(reply.is_success());
    }

    #[test]
    fn test_ticket_beats_retcode() {
        let reply = classify(&json!({"ticket": 9, "retcode": 10004}), "OrderSend");
        assert_eq!(reply.ticket(), Some(9));
    }

    #[test]
    fn test_retcode_failure_carries_code() {
        let reply = classify(&json!({"retcode": "10014", "comment": "Invalid volume"}), "OrderClose");
        assert_eq!(reply.code(), Some(10014));
        assert_eq!(
            reply.message(),
            "OrderClose rejected with retcode 10014: Invalid volume"
        );
    }

    #[rstest]
    #[case(json!(-3), 3)]
    #[case(json!(-10014), 10014)]
    #[case(json!(-10009), 10004)]
    #[case(json!(-0.5), 10004)]
    fn test_negative_number_code(#[case] body: Value, #[case] code: i64) {
        let reply = classify(&body, "OrderClose");
        assert!(!reply.is_success());
        assert_eq!(reply.code(), Some(code));
    }

    #[test]
    fn test_success_true_with_token_alias() {
        let reply = classify(&json!({"success": true, "sessionId": "abc-def-ghi"}), "ConnectEx");
        assert_eq!(
            reply,
            BridgeReply::Token {
                token: "abc-def-ghi".to_string(),
                message: "ConnectEx succeeded".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_object_is_assumed_success() {
        let reply = classify(&json!({"status": "ok"}), "OrderSend");
        assert!(matches!(reply, BridgeReply::AssumedSuccess { .. }));
    }

    #[test]
    fn test_error_keyword_wins_over_success_keyword() {
        let reply = classify(&json!("Invalid order, not placed"), "OrderSend");
        assert!(!reply.is_success());
    }

    #[test]
    fn test_empty_error_string_is_ignored() {
        let reply = classify(&json!({"error": "", "message": "Order executed"}), "OrderSend");
        assert!(reply.is_success());
    }

    #[rstest]
    #[case("Authentication failed", true)]
    #[case("{\"error\":\"Session expired\"}", true)]
    #[case("invalid TOKEN supplied", true)]
    #[case("Invalid volume", false)]
    fn test_auth_failure_text(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_auth_failure_text(text), expected);
    }

    #[test]
    fn test_close_patterns() {
        let reply = classify(&json!({"error": "Position not found"}), "OrderClose");
        assert!(is_already_closed(&reply, ""));
        assert!(!is_invalid_volume(&reply, ""));

        let reply = classify(&json!({"retcode": 10014}), "OrderClose");
        assert!(is_invalid_volume(&reply, ""));

        let reply = classify(&json!({"retcode": 10036}), "OrderClose");
        assert!(is_already_closed(&reply, ""));

        let reply = classify(&json!("Invalid lots value"), "OrderClose");
        assert!(is_invalid_volume(&reply, "Invalid lots value"));
    }

    #[rstest]
    #[case(json!("a1b2c3d4-e5f6-7890-abcd-ef1234567890"), "a1b2c3d4-e5f6-7890-abcd-ef1234567890")]
    #[case(json!({"token": "0123456789abcdef"}), "0123456789abcdef")]
    #[case(json!({"success": true, "id": "session-token-1"}), "session-token-1")]
    #[case(json!(123456789012_i64), "123456789012")]
    fn test_connect_token(#[case] body: Value, #[case] expected: &str) {
        assert_eq!(parse_connect_reply(&body).unwrap(), expected);
    }

    #[rstest]
    #[case(json!("Invalid account or password"), "InvalidCredentials")]
    #[case(json!({"error": "Server not found"}), "InvalidServer")]
    #[case(json!({"message": "Account disabled"}), "AccountDisabled")]
    #[case(json!({"success": false, "message": "Server maintenance"}), "BridgeRejected")]
    #[case(json!("short"), "BridgeRejected")]
    #[case(Value::Null, "BridgeRejected")]
    fn test_connect_errors(#[case] body: Value, #[case] expected: &str) {
        let err = parse_connect_reply(&body).unwrap_err();
        let variant = format!("{err:?}");
        assert!(variant.starts_with(expected), "{variant}");
    }
}
