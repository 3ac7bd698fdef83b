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

//! HTTP error types for the MT5 bridge client.

use thiserror::Error;

use crate::error::Mt5Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Mt5HttpError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Client build error: {0}")]
    BuildError(String),
}

impl Mt5HttpError {
    /// Converts a transport failure, dropping the request URL so query
    /// parameters (session ids, credentials) never reach error text.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Mt5HttpError::TimeoutError(err.to_string())
        } else if err.is_connect() {
            Mt5HttpError::ConnectionError(err.to_string())
        } else if err.is_builder() {
            Mt5HttpError::BuildError(err.to_string())
        } else {
            Mt5HttpError::NetworkError(err.to_string())
        }
    }
}

impl From<Mt5HttpError> for Mt5Error {
    fn from(err: Mt5HttpError) -> Self {
        match err {
            Mt5HttpError::BuildError(msg) => Mt5Error::Config(msg),
            other => Mt5Error::Transport(other.to_string()),
        }
    }
}
