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

//! Domain types and pure helpers shared by the gateway components.

pub mod consts;
pub mod credential;
pub mod enums;
pub mod models;
pub mod parse;
pub mod symbol;
pub mod urls;
pub mod volume;

#[cfg(test)]
pub mod testing;

pub use credential::Mt5Credential;
pub use enums::*;
pub use models::*;
pub use symbol::{resolve_symbol, MatchKind, SymbolMatch};
pub use urls::Mt5Url;
pub use volume::{CloseProbe, VolumeCandidate};
