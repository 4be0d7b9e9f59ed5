//! Core library for a SAME/EAS monitoring and activation station: decode
//! (offline and streaming), jurisdiction filtering, broadcast generation,
//! GPIO activation, and the continuous monitor tying them together.
//!
//! Consumers embedding this crate typically only need three entry points:
//! `decoder::decode` for one-shot decode of a recording, `monitor::spawn`
//! for a 24/7 listening station, and `broadcaster::assemble_broadcast` for
//! generating an outbound SAME message.

pub mod audio_source;
pub mod audit;
pub mod broadcaster;
pub mod config;
pub mod dedup;
pub mod decoder;
pub mod dsp;
pub mod errors;
pub mod external_audio;
pub mod fsk;
pub mod gpio;
pub mod jurisdiction;
pub mod led_sign;
pub mod logging;
pub mod monitor;
pub mod protocol;
pub mod selftest;
pub mod streaming;
pub mod utils;

pub use errors::{Result, SameError};
pub use protocol::SameHeader;
