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

//! Enumerations for the MT5 bridge gateway.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::common::consts::{TRADE_RETCODE_DONE, TRADE_RETCODE_ERROR};

/// Lifecycle of the single bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    AuthExpired,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "DISCONNECTED"),
            ConnectionStatus::Connecting => write!(f, "CONNECTING"),
            ConnectionStatus::Connected => write!(f, "CONNECTED"),
            ConnectionStatus::AuthExpired => write!(f, "AUTH_EXPIRED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The `operation` value the bridge expects on `/OrderSend`.
    pub fn as_bridge_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        }
    }

    /// Parses the side encodings seen in position records.
    ///
    /// Pending order types (`BuyLimit`, `SellStop`, ...) are not positions and
    /// yield `None`.
    pub fn from_bridge(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .to_ascii_lowercase()
            .replace("position_type_", "")
            .replace("order_type_", "");
        match normalized.as_str() {
            "buy" | "long" | "0" | "op_buy" => Some(OrderSide::Buy),
            "sell" | "short" | "1" | "op_sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_bridge_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderSide::from_bridge(s).ok_or_else(|| format!("unknown order side '{s}'"))
    }
}

/// Result code of a trade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnCode {
    Done,
    Failed(i64),
}

impl ReturnCode {
    pub fn is_success(&self) -> bool {
        matches!(self, ReturnCode::Done)
    }

    pub fn code(&self) -> i64 {
        match self {
            ReturnCode::Done => TRADE_RETCODE_DONE,
            ReturnCode::Failed(code) => *code,
        }
    }

    pub fn generic_failure() -> Self {
        ReturnCode::Failed(TRADE_RETCODE_ERROR)
    }
}

/// Which route lists open positions on this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionsEndpoint {
    #[default]
    Positions,
    OpenedOrders,
}

impl FromStr for PositionsEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positions" => Ok(PositionsEndpoint::Positions),
            "openedorders" | "opened_orders" => Ok(PositionsEndpoint::OpenedOrders),
            other => Err(format!("expected Positions or OpenedOrders, got '{other}'")),
        }
    }
}

/// HTTP method used for `/OrderSend` and `/OrderClose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderMethod {
    #[default]
    Get,
    Post,
}

impl FromStr for OrderMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(OrderMethod::Get),
            "POST" => Ok(OrderMethod::Post),
            other => Err(format!("expected GET or POST, got '{other}'")),
        }
    }
}

/// Parameter name carrying the volume on `/OrderClose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CloseVolumeField {
    #[default]
    Lots,
    Volume,
}

impl FromStr for CloseVolumeField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lots" => Ok(CloseVolumeField::Lots),
            "volume" => Ok(CloseVolumeField::Volume),
            other => Err(format!("expected lots or volume, got '{other}'")),
        }
    }
}
