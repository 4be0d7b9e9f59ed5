//! SAME (Specific Area Message Encoding) protocol definition.
//!
//! This module defines the canonical on-air grammar and the physical-layer
//! constants shared by the FSK codec (`crate::fsk`), the offline and
//! streaming decoders, and the broadcast generator.
//!
//! # Physical layer
//!
//! - Baud: 3125/6 ≈ 520.8333 bps
//! - Mark (bit 1): 6250/3 ≈ 2083.333 Hz
//! - Space (bit 0): 3125/2 = 1562.5 Hz
//! - Preamble: byte `0xAB` repeated 16 times, each byte framed like data
//!
//! # Header grammar
//!
//! ```text
//! ZCZC-ORG-EEE-PSSCCC(-PSSCCC){0,30}+TTTT-JJJHHMM-LLLLLLLL-
//! ```

use crate::errors::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical-layer constants. Not configurable — they define the SAME
/// standard itself.
pub struct PhysicalLayer;

impl PhysicalLayer {
    /// Baud rate: 3125/6 ≈ 520.8333 bps
    pub const BAUD: f64 = 3125.0 / 6.0;

    /// Mark tone (bit 1): 6250/3 ≈ 2083.333 Hz
    pub const MARK_FREQ_HZ: f64 = 6250.0 / 3.0;

    /// Space tone (bit 0): 3125/2 = 1562.5 Hz
    pub const SPACE_FREQ_HZ: f64 = 3125.0 / 2.0;

    /// Preamble byte, sent 16 times before each burst
    pub const PREAMBLE_BYTE: u8 = 0xAB;

    /// Number of preamble byte repetitions
    pub const PREAMBLE_REPETITIONS: usize = 16;

    /// Number of bursts per message (header or EOM)
    pub const BURST_COUNT: usize = 3;

    /// Silence between bursts, in seconds
    pub const INTER_BURST_SILENCE_SECS: f64 = 1.0;

    /// End-of-message marker text
    pub const EOM_TEXT: &'static str = "NNNN";

    /// Maximum header length in characters (268 char cap per spec)
    pub const MAX_HEADER_CHARS: usize = 268;

    /// Maximum number of location codes in a single header
    pub const MAX_LOCATIONS: usize = 31;
}

/// Bit framing mode for a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramingMode {
    /// start(0) + 7 data bits (LSB-first) + even parity + stop(1)
    SevenE1,
    /// start(0) + 8 data bits (LSB-first) + stop(1)
    EightN1,
}

/// A single SAME location code, `PSSCCC`, with an optional human-readable
/// description from the built-in FIPS lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCode {
    pub code: String,
    pub description: Option<String>,
}

impl LocationCode {
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        let description = fips_lookup(&code).map(|s| s.to_string());
        Self { code, description }
    }

    /// The state digits (positions 1..2, zero-indexed) of the six-digit code.
    pub fn state(&self) -> &str {
        if self.code.len() == 6 {
            &self.code[1..3]
        } else {
            ""
        }
    }
}

/// A decoded (or about-to-be-encoded) SAME header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SameHeader {
    pub raw_text: String,
    pub originator: String,
    pub event_code: String,
    pub locations: Vec<LocationCode>,
    pub purge_offset: String,
    pub issue_time: String,
    pub station_callsign: String,
    pub confidence: f64,
}

impl SameHeader {
    /// Is this header text an end-of-message marker rather than a header?
    pub fn is_eom_text(text: &str) -> bool {
        text.trim_start_matches('\r')
            .trim_start_matches('\n')
            .starts_with(PhysicalLayer::EOM_TEXT)
    }

    /// Parse a raw SAME header string (e.g. `ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-`)
    /// into its structured fields. Confidence is not known from the text alone and
    /// must be attached separately (see `with_confidence`).
    pub fn parse(raw_text: &str) -> Result<Self, DecodeError> {
        let trimmed = raw_text.trim_end_matches(['\r', '\n']);

        if Self::is_eom_text(trimmed) {
            return Err(DecodeError::InvalidHeader {
                reason: "text is an EOM marker, not a header".to_string(),
            });
        }

        if !trimmed.starts_with("ZCZC-") {
            return Err(DecodeError::InvalidHeader {
                reason: "missing ZCZC- prefix".to_string(),
            });
        }

        let plus_count = trimmed.matches('+').count();
        if plus_count != 1 {
            return Err(DecodeError::InvalidHeader {
                reason: format!("expected exactly one '+', found {plus_count}"),
            });
        }
        let dash_count = trimmed.matches('-').count();
        if dash_count < 6 {
            return Err(DecodeError::InvalidHeader {
                reason: format!("expected at least 6 '-' separators, found {dash_count}"),
            });
        }

        let body = &trimmed[5..]; // after "ZCZC-"
        let plus_pos = body.find('+').ok_or_else(|| DecodeError::InvalidHeader {
            reason: "missing '+' purge-offset marker".to_string(),
        })?;
        let (fields_part, after_plus) = body.split_at(plus_pos);
        let after_plus = &after_plus[1..]; // drop '+'

        let mut fields: Vec<&str> = fields_part.split('-').collect();
        if fields.len() < 3 {
            return Err(DecodeError::InvalidHeader {
                reason: "missing originator/event/location fields".to_string(),
            });
        }
        let originator = fields.remove(0).to_string();
        let event_code = fields.remove(0).to_string();
        let location_fields = fields; // remainder are location codes

        if location_fields.is_empty() {
            return Err(DecodeError::InvalidHeader {
                reason: "no location codes present".to_string(),
            });
        }
        if location_fields.len() > PhysicalLayer::MAX_LOCATIONS {
            return Err(DecodeError::InvalidHeader {
                reason: format!(
                    "too many location codes: {} (max {})",
                    location_fields.len(),
                    PhysicalLayer::MAX_LOCATIONS
                ),
            });
        }

        let mut locations = Vec::with_capacity(location_fields.len());
        for loc in &location_fields {
            if loc.len() != 6 || !loc.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DecodeError::InvalidHeader {
                    reason: format!("invalid location code '{loc}': must be six ASCII digits"),
                });
            }
            locations.push(LocationCode::new(*loc));
        }

        // after_plus: "TTTT-JJJHHMM-LLLLLLLL-"
        let mut rest: Vec<&str> = after_plus.split('-').collect();
        if rest.len() < 3 {
            return Err(DecodeError::InvalidHeader {
                reason: "missing purge/issue-time/callsign fields".to_string(),
            });
        }
        let purge_offset = rest.remove(0).to_string();
        if purge_offset.len() != 4 || !purge_offset.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecodeError::InvalidHeader {
                reason: format!("invalid purge offset '{purge_offset}'"),
            });
        }
        let issue_time = rest.remove(0).to_string();
        if issue_time.len() != 7 || !issue_time.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecodeError::InvalidHeader {
                reason: format!("invalid issue time '{issue_time}'"),
            });
        }
        // Station callsign is whatever remains, joined back with '-' in case
        // the callsign itself contained a dash (rare but seen on some
        // certified encoders), then trimmed of a single trailing separator.
        let station_callsign = rest.join("-").trim_end_matches('-').to_string();

        Ok(SameHeader {
            raw_text: trimmed.to_string(),
            originator,
            event_code,
            locations,
            purge_offset,
            issue_time,
            station_callsign,
            confidence: 0.0,
        })
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Normalized text used for deduplication: uppercase, whitespace trimmed.
    pub fn normalized_text(&self) -> String {
        self.raw_text.trim().to_uppercase()
    }
}

impl fmt::Display for SameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.raw_text, self.event_code)
    }
}

/// A tiny built-in FIPS code -> descriptive name table. Unknown codes are
/// preserved as strings with no description, per `spec.md` §4.2 step 6.
fn fips_lookup(code: &str) -> Option<&'static str> {
    match code {
        "000000" => Some("United States (nationwide)"),
        "039137" => Some("Richland County, OH"),
        "039003" => Some("Allen County, OH"),
        "039051" => Some("Crawford County, OH"),
        "039069" => Some("Franklin County, OH"),
        "018001" => Some("Adams County, IN"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_header() {
        let text = "ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-";
        let header = SameHeader::parse(text).unwrap();
        assert_eq!(header.originator, "EAS");
        assert_eq!(header.event_code, "RWT");
        assert_eq!(header.locations.len(), 1);
        assert_eq!(header.locations[0].code, "039137");
        assert_eq!(header.purge_offset, "0015");
        assert_eq!(header.issue_time, "1181800");
        assert_eq!(header.station_callsign, "KRAJ/FM");
    }

    #[test]
    fn parses_multiple_location_codes() {
        let text = "ZCZC-WXR-TOR-039003-039051-039069+0030-1181800-KRAJ/FM-";
        let header = SameHeader::parse(text).unwrap();
        assert_eq!(header.locations.len(), 3);
        assert_eq!(header.locations[1].code, "039051");
    }

    #[test]
    fn rejects_missing_plus() {
        let text = "ZCZC-EAS-RWT-039137-1181800-KRAJ/FM-";
        assert!(SameHeader::parse(text).is_err());
    }

    #[test]
    fn rejects_non_digit_location_code() {
        let text = "ZCZC-EAS-RWT-03913X+0015-1181800-KRAJ/FM-";
        assert!(SameHeader::parse(text).is_err());
    }

    #[test]
    fn recognizes_eom_text() {
        assert!(SameHeader::is_eom_text("NNNN"));
        assert!(!SameHeader::is_eom_text("ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-"));
    }

    #[test]
    fn state_extracts_middle_two_digits() {
        let loc = LocationCode::new("039137");
        assert_eq!(loc.state(), "39");
    }
}
