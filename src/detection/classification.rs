// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! Light level classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical light label derived from a luminosity value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    LowLight,
    HighLight,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::LowLight => "LOW_LIGHT",
            Classification::HighLight => "HIGH_LIGHT",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Low light iff `luminosity <= threshold`. Total over all integers.
pub fn classify(luminosity: i64, threshold: i64) -> Classification {
    if luminosity <= threshold {
        Classification::LowLight
    } else {
        Classification::HighLight
    }
}
