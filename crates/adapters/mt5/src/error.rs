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

//! Error types for the MT5 bridge gateway.

use std::fmt::Debug;

use thiserror::Error;

/// Failures surfaced by the gateway.
///
/// Every variant renders as a short human-readable reason. Credential values
/// are never part of the rendered text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Mt5Error {
    #[error("Not connected to the MT5 bridge")]
    NotConnected,

    #[error("Unable to reach the MT5 bridge: {0}")]
    Transport(String),

    #[error("Session expired, please reconnect: {0}")]
    AuthenticationExpired(String),

    #[error("Invalid account number or password: {0}")]
    InvalidCredentials(String),

    #[error("Trading server not available: {0}")]
    InvalidServer(String),

    #[error("Trading account disabled: {0}")]
    AccountDisabled(String),

    #[error("Bridge rejected the request: {0}")]
    BridgeRejected(String),

    #[error("Symbol not found on broker: {0}")]
    UnresolvedSymbol(String),

    #[error("Could not close position {ticket} after trying {attempts} volume formats")]
    VolumeFormatExhausted { ticket: u64, attempts: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Session store error: {0}")]
    Store(String),
}

impl Mt5Error {
    /// Returns true when the caller must log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Mt5Error::AuthenticationExpired(_))
    }

    /// Returns true for failures raised while establishing a session.
    pub fn is_connect_rejection(&self) -> bool {
        matches!(
            self,
            Mt5Error::InvalidCredentials(_) | Mt5Error::InvalidServer(_) | Mt5Error::AccountDisabled(_)
        )
    }
}

pub type Mt5Result<T> = Result<T, Mt5Error>;
