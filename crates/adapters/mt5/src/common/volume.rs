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

//! Close-volume candidates and the probe that walks them.
//!
//! The bridge does not document which unit it expects for the volume of a
//! close request. The probe tries an ordered, de-duplicated list of unit
//! hypotheses one at a time and stops at the first one the bridge accepts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{
    consts::{FALLBACK_CLOSE_VOLUMES, MAX_CANDIDATE_VOLUME, VOLUME_SCALE_FACTORS, VOLUME_TOLERANCE},
    models::Position,
};

/// A hypothesis about the volume encoding the bridge expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeCandidate {
    pub value: f64,
    pub rationale: String,
}

impl fmt::Display for VolumeCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", format_decimal(self.value), self.rationale)
    }
}

/// Formats a volume or price without exponent notation or trailing zeros.
pub fn format_decimal(value: f64) -> String {
    let formatted = format!("{value:.8}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn round_volume(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}

#[derive(Debug, Default)]
struct CandidateList {
    items: Vec<VolumeCandidate>,
}

impl CandidateList {
    fn push(&mut self, value: f64, rationale: impl Into<String>) {
        if !value.is_finite() || value <= 0.0 {
            return;
        }
        if self
            .items
            .iter()
            .any(|c| (c.value - value).abs() < VOLUME_TOLERANCE)
        {
            return;
        }
        self.items.push(VolumeCandidate {
            value,
            rationale: rationale.into(),
        });
    }

    fn push_scaled(&mut self, base: f64, label: &str) {
        for factor in VOLUME_SCALE_FACTORS {
            let value = round_volume(base * factor);
            if value > 0.0 && value < MAX_CANDIDATE_VOLUME {
                self.push(value, format!("{label} x{}", format_decimal(factor)));
            }
        }
    }
}

/// Builds the ordered candidate list for closing a position.
///
/// Order: caller-supplied volume, display volume, native volume, scaled display
/// volume, scaled native volume. Without position detail a fixed list of
/// plausible absolute volumes follows the caller-supplied one.
pub fn build_close_candidates(
    requested: Option<f64>,
    position: Option<&Position>,
) -> Vec<VolumeCandidate> {
    let mut list = CandidateList::default();

    if let Some(volume) = requested {
        list.push(volume, "requested volume");
    }

    match position {
        Some(position) => {
            list.push(position.display_volume, "position display volume");
            if (position.native_volume - position.display_volume).abs() >= VOLUME_TOLERANCE {
                list.push(position.native_volume, "position native volume");
            }
            if position.display_volume > 0.0 {
                list.push_scaled(position.display_volume, "display volume");
            }
            if position.native_volume > 0.0 {
                list.push_scaled(position.native_volume, "native volume");
            }
        }
        None => {
            for volume in FALLBACK_CLOSE_VOLUMES {
                list.push(volume, "fallback absolute volume");
            }
        }
    }

    list.items
}

/// What a single close attempt told us.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseAttempt {
    /// The bridge accepted the close.
    Accepted,
    /// The position is already gone.
    AlreadyClosed(String),
    /// The bridge rejected the volume encoding.
    InvalidVolume(String),
    /// Any other rejection, including transport failures.
    Rejected(String),
}

/// Next step of the probe after recording an attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStep {
    Closed(VolumeCandidate),
    AlreadyClosed(String),
    Continue,
    Exhausted { attempts: usize, last_message: String },
}

/// Candidate list plus cursor. Each attempt is recorded before the next
/// candidate is handed out, so the sequence can be logged and tested step by step.
#[derive(Debug)]
pub struct CloseProbe {
    candidates: Vec<VolumeCandidate>,
    cursor: usize,
    last_message: String,
}

impl CloseProbe {
    pub fn new(candidates: Vec<VolumeCandidate>) -> Self {
        Self {
            candidates,
            cursor: 0,
            last_message: String::new(),
        }
    }

    pub fn candidates(&self) -> &[VolumeCandidate] {
        &self.candidates
    }

    /// Number of attempts recorded so far.
    pub fn attempts(&self) -> usize {
        self.cursor
    }

    /// The candidate to try next, if any remain.
    pub fn current(&self) -> Option<&VolumeCandidate> {
        self.candidates.get(self.cursor)
    }

    /// Records the outcome of trying [`Self::current`] and advances the cursor.
    pub fn record(&mut self, attempt: CloseAttempt) -> ProbeStep {
        let Some(candidate) = self.candidates.get(self.cursor).cloned() else {
            return self.exhausted();
        };
        self.cursor += 1;

        match attempt {
            CloseAttempt::Accepted => ProbeStep::Closed(candidate),
            CloseAttempt::AlreadyClosed(message) => ProbeStep::AlreadyClosed(message),
            CloseAttempt::InvalidVolume(message) | CloseAttempt::Rejected(message) => {
                self.last_message = message;
                if self.cursor < self.candidates.len() {
                    ProbeStep::Continue
                } else {
                    self.exhausted()
                }
            }
        }
    }

    fn exhausted(&self) -> ProbeStep {
        ProbeStep::Exhausted {
            attempts: self.cursor,
            last_message: self.last_message.clone(),
        }
    }
}
