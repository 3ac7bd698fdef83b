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

//! URL management for MT5 bridge endpoints.
//!
//! Route names are fixed by the bridge and must not be renamed.

use std::fmt;

use crate::common::enums::PositionsEndpoint;

#[derive(Debug, Clone)]
pub struct Mt5Url {
    base_url: String,
}

impl Mt5Url {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn connect_url(&self) -> String {
        format!("{}/ConnectEx", self.base_url)
    }

    pub fn disconnect_url(&self) -> String {
        format!("{}/Disconnect", self.base_url)
    }

    pub fn check_connect_url(&self) -> String {
        format!("{}/CheckConnect", self.base_url)
    }

    pub fn account_summary_url(&self) -> String {
        format!("{}/AccountSummary", self.base_url)
    }

    pub fn account_details_url(&self) -> String {
        format!("{}/AccountDetails", self.base_url)
    }

    pub fn positions_url(&self, endpoint: PositionsEndpoint) -> String {
        match endpoint {
            PositionsEndpoint::Positions => format!("{}/Positions", self.base_url),
            PositionsEndpoint::OpenedOrders => format!("{}/OpenedOrders", self.base_url),
        }
    }

    pub fn symbol_list_url(&self) -> String {
        format!("{}/SymbolList", self.base_url)
    }

    pub fn subscribe_url(&self) -> String {
        format!("{}/Subscribe", self.base_url)
    }

    pub fn quote_url(&self) -> String {
        format!("{}/GetQuote", self.base_url)
    }

    pub fn order_send_url(&self) -> String {
        format!("{}/OrderSend", self.base_url)
    }

    pub fn order_close_url(&self) -> String {
        format!("{}/OrderClose", self.base_url)
    }
}

impl fmt::Display for Mt5Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}
