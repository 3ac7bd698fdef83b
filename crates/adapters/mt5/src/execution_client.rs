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

//! Write operations against the MT5 bridge: sending orders and closing positions.
//!
//! Neither operation fails with an error for bridge or transport problems;
//! both return an [`OrderOutcome`] carrying the bridge message. Closing a
//! position additionally returns [`Mt5Error::AuthenticationExpired`] so the
//! caller can log in again before retrying.

use std::sync::Arc;

use crate::{
    common::{
        consts::TRADE_RETCODE_ERROR,
        enums::CloseVolumeField,
        models::{OrderOutcome, OrderRequest, Position},
        parse::{parse_position, record_ticket},
        volume::{build_close_candidates, format_decimal, CloseAttempt, CloseProbe, ProbeStep},
    },
    data_client::Mt5DataClient,
    error::Mt5Error,
    http::{
        client::BridgeResponse,
        parse::{classify, is_already_closed, is_invalid_volume, BridgeReply},
        query::{OrderCloseParams, OrderSendParams},
    },
    instrument_provider::Mt5InstrumentProvider,
    session::SessionManager,
};

fn failure(message: impl Into<String>) -> OrderOutcome {
    OrderOutcome::failure(TRADE_RETCODE_ERROR, message)
}

/// Drops unset, zero and non-finite optional prices. A broker may read an
/// explicit zero as an invalid price rather than "market".
fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

/// Maps an `/OrderSend` reply onto an outcome.
fn order_outcome(response: &BridgeResponse) -> OrderOutcome {
    let reply = classify(&response.body, "OrderSend");
    match &reply {
        BridgeReply::Rejected { code, message } => {
            OrderOutcome::failure(code.unwrap_or(TRADE_RETCODE_ERROR), message.clone())
        }
        _ if !response.is_success() => failure(format!(
            "OrderSend returned HTTP {}: {}",
            response.status,
            reply.message()
        )),
        _ => OrderOutcome::success(reply.ticket(), reply.message()),
    }
}

/// Interprets a single `/OrderClose` reply for the volume probe.
fn close_attempt(response: &BridgeResponse) -> CloseAttempt {
    let reply = classify(&response.body, "OrderClose");
    let message = reply.message().to_string();

    if is_already_closed(&reply, &response.text) {
        CloseAttempt::AlreadyClosed(message)
    } else if is_invalid_volume(&reply, &response.text) {
        CloseAttempt::InvalidVolume(message)
    } else if !reply.is_success() {
        CloseAttempt::Rejected(message)
    } else if !response.is_success() {
        CloseAttempt::Rejected(format!(
            "OrderClose returned HTTP {}: {message}",
            response.status
        ))
    } else {
        CloseAttempt::Accepted
    }
}

fn exhausted(ticket: u64, attempts: usize, last_message: &str) -> OrderOutcome {
    let reason = Mt5Error::VolumeFormatExhausted { ticket, attempts };
    if last_message.is_empty() {
        failure(reason.to_string())
    } else {
        failure(format!("{reason}: {last_message}"))
    }
}

#[derive(Debug, Clone)]
pub struct Mt5ExecutionClient {
    session: Arc<SessionManager>,
    instruments: Arc<Mt5InstrumentProvider>,
    data: Arc<Mt5DataClient>,
}

impl Mt5ExecutionClient {
    pub fn new(
        session: Arc<SessionManager>,
        instruments: Arc<Mt5InstrumentProvider>,
        data: Arc<Mt5DataClient>,
    ) -> Self {
        Self {
            session,
            instruments,
            data,
        }
    }

    /// Sends a market order. The symbol is resolved and subscribed first.
    ///
    /// Transport failures and rejections come back as a failed outcome with
    /// code 10004 or the bridge's own code.
    pub async fn send_order(&self, request: &OrderRequest) -> OrderOutcome {
        if !self.session.is_connected().await {
            return failure(Mt5Error::NotConnected.to_string());
        }
        if request.symbol.trim().is_empty() {
            return failure("Order symbol is required");
        }
        if !(request.volume.is_finite() && request.volume > 0.0) {
            return failure(format!(
                "Invalid order volume {}",
                format_decimal(request.volume)
            ));
        }

        let symbol = match self.instruments.prepare(request.symbol.trim()).await {
            Ok(symbol) => symbol,
            Err(e) => return failure(e.to_string()),
        };

        let mut builder = OrderSendParams::builder();
        builder
            .symbol(symbol.clone())
            .operation(request.side.as_bridge_str())
            .volume(request.volume)
            .slippage(self.session.config().slippage);
        if let Some(price) = nonzero(request.price) {
            builder.price(price);
        }
        if let Some(stop_loss) = nonzero(request.stop_loss) {
            builder.stoploss(stop_loss);
        }
        if let Some(take_profit) = nonzero(request.take_profit) {
            builder.takeprofit(take_profit);
        }
        if let Some(comment) = request.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            builder.comment(comment);
        }

        let params = match builder
            .build()
            .map_err(|e| e.to_string())
            .and_then(|p| serde_json::to_value(p).map_err(|e| e.to_string()))
        {
            Ok(params) => params,
            Err(e) => return failure(format!("Failed to build order request: {e}")),
        };

        let url = self.session.http().url().order_send_url();
        let outcome = match self
            .session
            .request(self.session.config().order_method, &url, params)
            .await
        {
            Ok(response) => order_outcome(&response),
            Err(e) => failure(e.to_string()),
        };

        if outcome.is_success() {
            tracing::info!(
                symbol = %symbol,
                side = %request.side,
                volume = request.volume,
                ticket = ?outcome.ticket,
                "Order accepted"
            );
        } else {
            tracing::warn!(
                symbol = %symbol,
                side = %request.side,
                volume = request.volume,
                code = outcome.return_code.code(),
                message = %outcome.message,
                "Order rejected"
            );
        }
        outcome
    }

    /// Closes position `ticket`, probing volume encodings until the bridge
    /// accepts one.
    ///
    /// A ticket missing from a fresh positions query counts as already closed
    /// and no close request is sent. The realized profit is the floating
    /// profit captured before the first attempt.
    ///
    /// # Errors
    ///
    /// Returns [`Mt5Error::AuthenticationExpired`] if the session expires
    /// during the probe. Every other failure is a failed outcome.
    pub async fn close_position(
        &self,
        ticket: u64,
        requested_volume: Option<f64>,
    ) -> Result<OrderOutcome, Mt5Error> {
        if !self.session.is_connected().await {
            return Ok(failure(Mt5Error::NotConnected.to_string()));
        }

        let position = match self.locate(ticket).await? {
            Located::Open(position) => Some(position),
            Located::Closed => {
                tracing::info!(ticket, "Position not open, treating as already closed");
                return Ok(OrderOutcome::success(
                    Some(ticket),
                    format!("Position {ticket} already closed"),
                ));
            }
            Located::Unknown => None,
        };
        let floating_profit = position.as_ref().map(|p| p.profit);

        let mut probe = CloseProbe::new(build_close_candidates(requested_volume, position.as_ref()));
        tracing::debug!(
            ticket,
            candidates = probe.candidates().len(),
            has_position = position.is_some(),
            "Starting close probe"
        );

        while let Some(candidate) = probe.current().cloned() {
            let attempt = match self.send_close(ticket, candidate.value).await {
                Ok(response) => close_attempt(&response),
                Err(e @ Mt5Error::AuthenticationExpired(_)) => {
                    tracing::warn!(ticket, attempts = probe.attempts(), "Session expired during close probe");
                    return Err(e);
                }
                Err(e) => CloseAttempt::Rejected(e.to_string()),
            };

            tracing::debug!(
                ticket,
                attempt = probe.attempts() + 1,
                volume = candidate.value,
                rationale = %candidate.rationale,
                outcome = ?attempt,
                "Close attempt"
            );

            match probe.record(attempt) {
                ProbeStep::Continue => {}
                ProbeStep::Closed(accepted) => {
                    tracing::info!(
                        ticket,
                        volume = accepted.value,
                        rationale = %accepted.rationale,
                        attempts = probe.attempts(),
                        "Position closed"
                    );
                    return Ok(OrderOutcome::success(
                        Some(ticket),
                        format!("Position {ticket} closed with volume {}", format_decimal(accepted.value)),
                    )
                    .with_realized_profit(floating_profit)
                    .with_candidate(accepted));
                }
                ProbeStep::AlreadyClosed(message) => {
                    tracing::info!(ticket, "Bridge reports position already closed");
                    return Ok(OrderOutcome::success(
                        Some(ticket),
                        format!("Position {ticket} already closed: {message}"),
                    ));
                }
                ProbeStep::Exhausted {
                    attempts,
                    last_message,
                } => {
                    tracing::warn!(ticket, attempts, last_message = %last_message, "Close probe exhausted");
                    return Ok(exhausted(ticket, attempts, &last_message));
                }
            }
        }

        Ok(exhausted(ticket, probe.attempts(), "no volume candidates"))
    }

    async fn locate(&self, ticket: u64) -> Result<Located, Mt5Error> {
        let records = match self.data.fetch_position_records().await {
            Ok(records) => records,
            Err(e @ Mt5Error::AuthenticationExpired(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(ticket, error = %e, "Positions unavailable, probing without position detail");
                return Ok(Located::Unknown);
            }
        };

        let Some(record) = records.iter().find(|r| record_ticket(r) == Some(ticket)) else {
            return Ok(Located::Closed);
        };
        match parse_position(record) {
            Some(position) => Ok(Located::Open(position)),
            None => {
                tracing::warn!(ticket, "Position record not understood, probing without position detail");
                Ok(Located::Unknown)
            }
        }
    }

    async fn send_close(&self, ticket: u64, volume: f64) -> Result<BridgeResponse, Mt5Error> {
        let config = self.session.config();
        let params = match config.close_volume_field {
            CloseVolumeField::Lots => OrderCloseParams {
                ticket,
                lots: Some(volume),
                volume: None,
            },
            CloseVolumeField::Volume => OrderCloseParams {
                ticket,
                lots: None,
                volume: Some(volume),
            },
        };
        let params = serde_json::to_value(params).map_err(|e| Mt5Error::Transport(e.to_string()))?;
        let url = self.session.http().url().order_close_url();
        self.session.request(config.order_method, &url, params).await
    }
}

#[derive(Debug)]
enum Located {
    Open(Position),
    Closed,
    Unknown,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::common::{enums::ReturnCode, parse::decode_body};

    fn response(status: u16, text: &str) -> BridgeResponse {
        BridgeResponse {
            status,
            text: text.to_string(),
            body: decode_body(text),
        }
    }

    #[rstest]
    #[case(Some(1.2345), Some(1.2345))]
    #[case(Some(0.0), None)]
    #[case(Some(f64::NAN), None)]
    #[case(None, None)]
    fn test_nonzero(#[case] value: Option<f64>, #[case] expected: Option<f64>) {
        assert_eq!(nonzero(value), expected);
    }

    #[test]
    fn test_order_outcome_success_with_ticket() {
        let outcome = order_outcome(&response(200, "{\"retcode\":10009,\"order\":0,\"deal\":77,\"comment\":\"Request executed\"}"));
        assert!(outcome.is_success());
        assert_eq!(outcome.ticket, Some(77));
        assert_eq!(outcome.message, "Request executed");
    }

    #[test]
    fn test_order_outcome_keeps_bridge_code() {
        let outcome = order_outcome(&response(200, "{\"retcode\":10019,\"comment\":\"No money\"}"));
        assert_eq!(outcome.return_code, ReturnCode::Failed(10019));
        assert!(outcome.message.contains("No money"));
    }

    #[test]
    fn test_order_outcome_http_error_overrides_optimistic_body() {
        let outcome = order_outcome(&response(502, "{\"status\":\"bad gateway\"}"));
        assert_eq!(outcome.return_code, ReturnCode::Failed(10004));
        assert!(outcome.message.starts_with("OrderSend returned HTTP 502"));
    }

    #[rstest]
    #[case(200, "{\"retcode\":10009}", CloseAttempt::Accepted)]
    #[case(200, "", CloseAttempt::Accepted)]
    #[case(200, "{\"error\":\"Invalid volume\"}", CloseAttempt::InvalidVolume("Invalid volume".into()))]
    #[case(200, "{\"error\":\"Position not found\"}", CloseAttempt::AlreadyClosed("Position not found".into()))]
    #[case(200, "{\"error\":\"Market closed\"}", CloseAttempt::Rejected("Market closed".into()))]
    #[case(500, "", CloseAttempt::Rejected("OrderClose returned HTTP 500: OrderClose accepted".into()))]
    fn test_close_attempt(#[case] status: u16, #[case] text: &str, #[case] expected: CloseAttempt) {
        assert_eq!(close_attempt(&response(status, text)), expected);
    }

    #[test]
    fn test_exhausted_message_names_attempts() {
        let outcome = exhausted(12345, 24, "Invalid volume");
        assert!(!outcome.is_success());
        assert_eq!(
            outcome.message,
            "Could not close position 12345 after trying 24 volume formats: Invalid volume"
        );
    }
}
