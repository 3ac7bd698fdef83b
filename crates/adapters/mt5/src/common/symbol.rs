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

//! Broker symbol resolution.
//!
//! Brokers publish instruments under their own names (`EURUSD.raw`, `GOLD`,
//! `XAUUSDm`). [`resolve_symbol`] maps a logical symbol onto that list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::consts::{BROKER_SYMBOL_SUFFIXES, MIN_SUBSTRING_MATCH_LEN};

/// Alias groups for precious metals. A logical symbol mentioning any member
/// matches the first broker symbol mentioning any member.
const METAL_ALIASES: [&[&str]; 2] = [&["XAU", "GOLD"], &["XAG", "SILVER"]];

/// How a broker symbol was found. Variants are ordered by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchKind {
    Exact,
    Normalized,
    Alias,
    Substring,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "exact"),
            MatchKind::Normalized => write!(f, "normalized"),
            MatchKind::Alias => write!(f, "alias"),
            MatchKind::Substring => write!(f, "substring"),
        }
    }
}

/// A resolved broker-native symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub kind: MatchKind,
}

/// Strips known broker suffixes (case-insensitive) and upper-cases the rest.
pub fn normalize_symbol(raw: &str) -> String {
    let mut symbol = raw.trim().to_ascii_uppercase();
    loop {
        let stripped = BROKER_SYMBOL_SUFFIXES.iter().find_map(|suffix| {
            let suffix = suffix.to_ascii_uppercase();
            symbol
                .strip_suffix(suffix.as_str())
                .filter(|rest| !rest.is_empty())
                .map(str::to_string)
        });
        match stripped {
            Some(rest) => symbol = rest,
            None => return symbol,
        }
    }
}

/// Finds the best broker-native match for `logical`.
///
/// Precedence: exact match, exact match of the normalized symbol, metal
/// aliases, then substring containment in either direction. Within a step the
/// first symbol in broker order wins.
pub fn resolve_symbol(logical: &str, broker_symbols: &[String]) -> Option<SymbolMatch> {
    let logical = logical.trim();
    if logical.is_empty() {
        return None;
    }

    let found = |symbol: &String, kind| {
        Some(SymbolMatch {
            symbol: symbol.clone(),
            kind,
        })
    };

    if let Some(symbol) = broker_symbols.iter().find(|s| s.as_str() == logical) {
        return found(symbol, MatchKind::Exact);
    }

    let normalized = normalize_symbol(logical);
    if let Some(symbol) = broker_symbols
        .iter()
        .find(|s| s.trim().eq_ignore_ascii_case(&normalized))
    {
        return found(symbol, MatchKind::Normalized);
    }

    for aliases in METAL_ALIASES {
        if aliases.iter().any(|alias| normalized.contains(alias)) {
            if let Some(symbol) = broker_symbols.iter().find(|s| {
                let upper = s.to_ascii_uppercase();
                aliases.iter().any(|alias| upper.contains(alias))
            }) {
                return found(symbol, MatchKind::Alias);
            }
        }
    }

    broker_symbols
        .iter()
        .find(|s| {
            let upper = s.trim().to_ascii_uppercase();
            (normalized.len() >= MIN_SUBSTRING_MATCH_LEN && upper.contains(&normalized))
                || (upper.len() >= MIN_SUBSTRING_MATCH_LEN && normalized.contains(&upper))
        })
        .and_then(|symbol| found(symbol, MatchKind::Substring))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn list(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case("EURUSD.raw", "EURUSD")]
    #[case("eurusd.M", "EURUSD")]
    #[case("GBPUSD.ecn", "GBPUSD")]
    #[case("USDJPY.pro.raw", "USDJPY")]
    #[case("US30", "US30")]
    #[case(".m", ".M")]
    fn test_normalize_symbol(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_symbol(raw), expected);
    }

    #[test]
    fn test_exact_beats_normalized() {
        let symbols = list(&["EURUSD", "EURUSD.raw"]);
        let resolved = resolve_symbol("EURUSD.raw", &symbols).unwrap();

        assert_eq!(resolved.symbol, "EURUSD.raw");
        assert_eq!(resolved.kind, MatchKind::Exact);
    }

    #[test]
    fn test_normalized_match() {
        let symbols = list(&["GBPUSD", "EURUSD"]);
        let resolved = resolve_symbol("EURUSD.m", &symbols).unwrap();

        assert_eq!(resolved.symbol, "EURUSD");
        assert_eq!(resolved.kind, MatchKind::Normalized);
    }

    #[test]
    fn test_gold_alias() {
        let symbols = list(&["EURUSD", "GOLD", "SILVER"]);
        let resolved = resolve_symbol("XAUUSD", &symbols).unwrap();

        assert_eq!(resolved.symbol, "GOLD");
        assert_eq!(resolved.kind, MatchKind::Alias);
    }

    #[test]
    fn test_silver_alias_takes_first_in_broker_order() {
        let symbols = list(&["XAGEUR", "SILVER"]);
        let resolved = resolve_symbol("XAGUSD", &symbols).unwrap();

        assert_eq!(resolved.symbol, "XAGEUR");
    }

    #[test]
    fn test_alias_beats_substring() {
        let symbols = list(&["GOLDmicro", "XAUUSD.pro"]);
        let resolved = resolve_symbol("XAUUSD", &symbols).unwrap();

        assert_eq!(resolved.symbol, "GOLDmicro");
        assert_eq!(resolved.kind, MatchKind::Alias);
    }

    #[test]
    fn test_normalized_beats_alias() {
        let symbols = list(&["XAUUSDm", "GOLD"]);
        let resolved = resolve_symbol("GOLD.raw", &symbols).unwrap();

        assert_eq!(resolved.symbol, "GOLD");
        assert_eq!(resolved.kind, MatchKind::Normalized);
    }

    #[test]
    fn test_substring_both_directions() {
        let symbols = list(&["EURUSDm"]);
        let resolved = resolve_symbol("EURUSD", &symbols).unwrap();
        assert_eq!(resolved.symbol, "EURUSDm");
        assert_eq!(resolved.kind, MatchKind::Substring);

        let symbols = list(&["US30"]);
        let resolved = resolve_symbol("US30Cash", &symbols).unwrap();
        assert_eq!(resolved.symbol, "US30");
    }

    #[test]
    fn test_short_symbols_do_not_substring_match() {
        let symbols = list(&["US", "EU"]);
        assert_eq!(resolve_symbol("EURUSD", &symbols), None);
    }

    #[test]
    fn test_no_match() {
        let symbols = list(&["EURUSD", "GBPUSD"]);
        assert_eq!(resolve_symbol("BTCUSD", &symbols), None);
        assert_eq!(resolve_symbol("", &symbols), None);
        assert_eq!(resolve_symbol("EURUSD", &[]), None);
    }
}
