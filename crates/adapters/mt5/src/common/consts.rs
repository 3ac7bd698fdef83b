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

//! Constants shared across the MT5 bridge gateway.

/// Retcode reported by the bridge when a trade request completed.
pub const TRADE_RETCODE_DONE: i64 = 10009;
/// Generic failure retcode, also used for locally produced failures.
pub const TRADE_RETCODE_ERROR: i64 = 10004;
/// Retcode for a rejected volume.
pub const TRADE_RETCODE_INVALID_VOLUME: i64 = 10014;
/// Retcode for a position that no longer exists.
pub const TRADE_RETCODE_POSITION_CLOSED: i64 = 10036;

/// Key under which the session token is persisted.
pub const SESSION_TOKEN_KEY: &str = "mt5_session_token";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SLIPPAGE: u32 = 10;
pub const DEFAULT_SYMBOL_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";
pub const USER_AGENT: &str = concat!("mt5-bridge-gateway/", env!("CARGO_PKG_VERSION"));

/// Connect replies shorter than this are not accepted as session tokens.
pub const MIN_TOKEN_LEN: usize = 11;

/// Two close volumes closer than this are the same candidate.
pub const VOLUME_TOLERANCE: f64 = 1e-6;
/// Scaled close volumes must fall strictly inside `(0, MAX_CANDIDATE_VOLUME)`.
pub const MAX_CANDIDATE_VOLUME: f64 = 1_000_000.0;
/// Unit hypotheses tried against the display and native volume, most likely first.
pub const VOLUME_SCALE_FACTORS: [f64; 10] = [
    1000.0, 10000.0, 100000.0, 0.001, 0.0001, 0.00001, 10.0, 100.0, 0.1, 0.01,
];
/// Absolute volumes tried when the position detail could not be read.
pub const FALLBACK_CLOSE_VOLUMES: [f64; 8] =
    [0.01, 0.1, 1.0, 10.0, 100.0, 1000.0, 10000.0, 100000.0];

/// Broker suffixes stripped before symbol matching.
pub const BROKER_SYMBOL_SUFFIXES: [&str; 6] = [".raw", ".m", ".c", ".pro", ".ecn", ".stp"];
/// Shortest string allowed on the contained side of a substring symbol match.
pub const MIN_SUBSTRING_MATCH_LEN: usize = 3;

pub const SUCCESS_KEYWORDS: [&str; 3] = ["success", "executed", "placed"];
pub const ERROR_KEYWORDS: [&str; 3] = ["error", "failed", "invalid"];
pub const AUTH_FAILURE_PHRASES: [&str; 3] = ["authentication failed", "session expired", "invalid token"];
