//! End-to-end scenarios spanning decode, dedup and jurisdiction matching,
//! run against synthetic audio generated by the same FSK renderer the
//! broadcaster uses — there is no certified hardware encoder output in
//! this environment, so "real" audio is standing in for bench-generated
//! SAME bursts, which is how a station would bring up a new antenna path
//! before trusting it against live air checks.

use chrono::{TimeZone, Utc};
use same_core::config::{DedupConfig, JurisdictionConfig, PrefilterConfig};
use same_core::dedup::DedupCache;
use same_core::fsk::BurstRenderer;
use same_core::jurisdiction;
use same_core::protocol::SameHeader;
use same_core::{decoder, errors::DecodeError};

const SAMPLE_RATE: u32 = 22050;

fn burst_wav(text: &str) -> Vec<f32> {
    let mut samples = vec![0.0_f32; 300];
    samples.extend(BurstRenderer::new(SAMPLE_RATE).render_burst(text));
    samples.extend(vec![0.0_f32; 300]);
    samples
}

#[test]
fn rwt_header_decodes_and_matches_local_jurisdiction() {
    let text = "ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-";
    let samples = burst_wav(text);

    let outcome = decoder::decode(&samples, SAMPLE_RATE, &PrefilterConfig::default()).unwrap();
    assert_eq!(outcome.headers.len(), 1);

    let jurisdiction_config = JurisdictionConfig {
        local_codes: vec!["039137".to_string()],
        ..JurisdictionConfig::default()
    };
    assert!(jurisdiction::is_relevant(&outcome.headers[0], &jurisdiction_config));
}

#[test]
fn multi_county_header_with_no_local_match_is_not_relevant() {
    let text = "ZCZC-WXR-TOR-006037-006059+0030-1181800-KRAJ/FM-";
    let samples = burst_wav(text);

    let outcome = decoder::decode(&samples, SAMPLE_RATE, &PrefilterConfig::default()).unwrap();
    let jurisdiction_config = JurisdictionConfig {
        local_codes: vec!["039137".to_string()],
        ..JurisdictionConfig::default()
    };
    assert!(!jurisdiction::is_relevant(&outcome.headers[0], &jurisdiction_config));
}

#[test]
fn statewide_wildcard_matches_a_county_in_the_same_state() {
    let text = "ZCZC-WXR-SVR-039000+0030-1181800-KRAJ/FM-";
    let samples = burst_wav(text);

    let outcome = decoder::decode(&samples, SAMPLE_RATE, &PrefilterConfig::default()).unwrap();
    let jurisdiction_config = JurisdictionConfig {
        local_codes: vec!["039137".to_string()],
        ..JurisdictionConfig::default()
    };
    assert!(jurisdiction::is_relevant(&outcome.headers[0], &jurisdiction_config));
}

#[test]
fn nationwide_wildcard_matches_regardless_of_local_codes() {
    let text = "ZCZC-PEP-EAN-000000+0060-1181800-KRAJ/FM-";
    let samples = burst_wav(text);

    let outcome = decoder::decode(&samples, SAMPLE_RATE, &PrefilterConfig::default()).unwrap();
    let jurisdiction_config = JurisdictionConfig {
        local_codes: vec!["018001".to_string()],
        ..JurisdictionConfig::default()
    };
    assert!(jurisdiction::is_relevant(&outcome.headers[0], &jurisdiction_config));
}

#[test]
fn duplicate_suppression_rejects_repeat_within_cooldown() {
    let text = "ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-";
    let header = SameHeader::parse(text).unwrap();

    let mut cache = DedupCache::new(&DedupConfig { cooldown_secs: 30 });
    let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    assert!(cache.accept(&header, t0));
    assert!(!cache.accept(&header, t0 + chrono::Duration::seconds(5)));
    assert!(cache.accept(&header, t0 + chrono::Duration::seconds(45)));
}

#[test]
fn three_burst_repeats_vote_to_high_confidence_and_overlap_does_not_corrupt_decode() {
    let text = "ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-";
    let renderer = BurstRenderer::new(SAMPLE_RATE);
    let mut samples = Vec::new();
    for _ in 0..3 {
        samples.extend(vec![0.0_f32; 200]);
        samples.extend(renderer.render_burst(text));
    }
    samples.extend(vec![0.0_f32; 300]);

    let outcome = decoder::decode(&samples, SAMPLE_RATE, &PrefilterConfig::default()).unwrap();
    assert_eq!(outcome.headers.len(), 1);
    assert!(outcome.headers[0].confidence > 0.9);
}

#[test]
fn silent_audio_yields_no_signal_error() {
    let samples = vec![0.0_f32; SAMPLE_RATE as usize];
    let result = decoder::decode(&samples, SAMPLE_RATE, &PrefilterConfig::default());
    assert!(matches!(result, Err(DecodeError::NoSignal)));
}

#[test]
fn eom_burst_is_counted_without_being_treated_as_a_header() {
    let samples = burst_wav("NNNN");
    let outcome = decoder::decode(&samples, SAMPLE_RATE, &PrefilterConfig::default()).unwrap();
    assert_eq!(outcome.eom_count, 1);
    assert!(outcome.headers.is_empty());
}

#[test]
fn header_and_eom_bursts_in_one_recording_are_both_recognized() {
    let renderer = BurstRenderer::new(SAMPLE_RATE);
    let mut samples = vec![0.0_f32; 200];
    samples.extend(renderer.render_burst("ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-"));
    samples.extend(vec![0.0_f32; SAMPLE_RATE as usize]); // narration gap
    samples.extend(renderer.render_burst("NNNN"));
    samples.extend(vec![0.0_f32; 200]);

    let outcome = decoder::decode(&samples, SAMPLE_RATE, &PrefilterConfig::default()).unwrap();
    assert_eq!(outcome.headers.len(), 1);
    assert_eq!(outcome.eom_count, 1);
}
