//! Jurisdiction matching: decide whether a decoded header's location codes
//! cover this station, ported faithfully from the reference
//! `determine_fips_matches` algorithm in
//! `original_source/app_core/audio/fips_utils.py` (normalize-then-compare,
//! nationwide and statewide wildcards honored before exact comparison).

use crate::config::JurisdictionConfig;
use crate::protocol::SameHeader;
use std::collections::{BTreeSet, HashMap};

/// Normalize a SAME location code to its canonical six-digit form, matching
/// the reference implementation: strip every non-digit character, keep
/// only the trailing six digits, then left-pad with zeros. Returns `None`
/// for a code with no digits at all.
fn normalize_fips_code(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let tail = if digits.len() > 6 {
        &digits[digits.len() - 6..]
    } else {
        &digits[..]
    };
    Some(format!("{:0>6}", tail))
}

/// Determine which of `configured_codes` are covered by `alert_codes`,
/// honoring the nationwide wildcard (`000000` matches every configured
/// code) and the statewide wildcard (any code ending in `000`, other than
/// `000000` itself, matches every configured code in the same state).
/// Returns the sorted set of *configured* codes that matched, exactly as
/// the reference `determine_fips_matches` does with `sorted(matches)`.
pub fn determine_fips_matches_raw(
    alert_codes: &[String],
    configured_codes: &[String],
    honor_nationwide_wildcard: bool,
    honor_statewide_wildcard: bool,
) -> Vec<String> {
    let mut configured_map: HashMap<String, String> = HashMap::new();
    let mut configured_states: HashMap<String, BTreeSet<String>> = HashMap::new();

    for code in configured_codes {
        let Some(normalized) = normalize_fips_code(code) else {
            continue;
        };
        let state = normalized[1..3].to_string();
        configured_states.entry(state).or_default().insert(code.clone());
        configured_map.insert(normalized, code.clone());
    }

    let mut alert_normalized: BTreeSet<String> = BTreeSet::new();
    let mut statewide_alerts: BTreeSet<String> = BTreeSet::new();

    for code in alert_codes {
        let Some(normalized) = normalize_fips_code(code) else {
            continue;
        };
        if normalized.ends_with("000") && normalized != "000000" {
            statewide_alerts.insert(normalized[1..3].to_string());
        }
        alert_normalized.insert(normalized);
    }

    let mut matches: BTreeSet<String> = BTreeSet::new();

    for code in &alert_normalized {
        if let Some(configured_value) = configured_map.get(code) {
            matches.insert(configured_value.clone());
        }
    }

    if honor_nationwide_wildcard && alert_normalized.contains("000000") {
        matches.extend(configured_map.values().cloned());
    }

    if honor_statewide_wildcard {
        for state in &statewide_alerts {
            if let Some(set) = configured_states.get(state) {
                matches.extend(set.iter().cloned());
            }
        }
    }

    matches.into_iter().collect()
}

/// Convenience wrapper over `determine_fips_matches_raw` taking a decoded
/// header and the station's jurisdiction configuration directly.
pub fn determine_fips_matches(header: &SameHeader, config: &JurisdictionConfig) -> Vec<String> {
    let alert_codes: Vec<String> = header.locations.iter().map(|l| l.code.clone()).collect();
    determine_fips_matches_raw(
        &alert_codes,
        &config.local_codes,
        config.honor_nationwide_wildcard,
        config.honor_statewide_wildcard,
    )
}

/// Does this header match any configured local code?
pub fn is_relevant(header: &SameHeader, config: &JurisdictionConfig) -> bool {
    !determine_fips_matches(header, config).is_empty()
}
