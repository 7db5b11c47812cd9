//! Order bands
//!
//! Plug-ins run in ascending `order`. Each band is anchored at an integer and owns
//! the half-open range `[anchor - 0.5, anchor + 0.5)`, leaving fractional room for
//! ordering within a band.

use serde::{Deserialize, Serialize};

pub const COLLECTION: f64 = 0.0;
pub const VALIDATION: f64 = 1.0;
pub const EXTRACTION: f64 = 2.0;
pub const INTEGRATION: f64 = 3.0;

/// Distance from an anchor to either edge of its band
pub const BAND_HALF_WIDTH: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Collection,
    Validation,
    Extraction,
    Integration,
}

impl Band {
    pub const ALL: [Band; 4] = [
        Band::Collection,
        Band::Validation,
        Band::Extraction,
        Band::Integration,
    ];

    pub fn anchor(self) -> f64 {
        match self {
            Band::Collection => COLLECTION,
            Band::Validation => VALIDATION,
            Band::Extraction => EXTRACTION,
            Band::Integration => INTEGRATION,
        }
    }

    /// First order that no longer belongs to this band.
    pub fn upper_bound(self) -> f64 {
        self.anchor() + BAND_HALF_WIDTH
    }

    /// Band an order falls into. Orders below the collection band count as
    /// collection, orders past integration count as integration.
    pub fn of(order: f64) -> Band {
        if order < Band::Collection.upper_bound() {
            Band::Collection
        } else if order < Band::Validation.upper_bound() {
            Band::Validation
        } else if order < Band::Extraction.upper_bound() {
            Band::Extraction
        } else {
            Band::Integration
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Band::Collection => "collection",
            Band::Validation => "validation",
            Band::Extraction => "extraction",
            Band::Integration => "integration",
        }
    }
}
