//! Continuous monitor: a ring buffer fed by an `AudioSource`, a
//! self-tuning scan scheduler that decodes snapshots of that buffer on a
//! bounded worker pool, and a watchdog that detects a stalled audio
//! thread. Alerts that pass dedup and jurisdiction filtering are handed
//! to an `AlertSink`.
//!
//! Deliberately built on `std::thread` + `crossbeam::channel` rather than
//! an async runtime: a 24/7 life-safety monitor has exactly a handful of
//! long-lived threads, and the predictability of OS thread scheduling
//! outweighs anything an async executor would buy here.

use crate::audio_source::AudioSource;
use crate::audit::{AuditRecord, AuditSink};
use crate::config::MonitorConfig;
use crate::dedup::DedupCache;
use crate::decoder;
use crate::errors::MonitorError;
use crate::jurisdiction;
use crate::logging::SignalLogger;
use crate::protocol::SameHeader;
use atomic_float::AtomicF64;
use chrono::Utc;
use crossbeam::channel::{bounded, select, Receiver, Sender};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Receives decoded headers that passed dedup and jurisdiction filtering.
pub trait AlertSink: Send + Sync {
    fn on_alert(&self, header: &SameHeader);
}

/// A ring buffer of the most recent `capacity` samples. One audio thread
/// writes; any number of scan workers may take a consistent snapshot
/// without disturbing the writer or each other.
pub struct RingBuffer {
    inner: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, samples: &[f32]) {
        let mut buf = self.inner.lock().expect("ring buffer mutex poisoned");
        buf.extend(samples.iter().copied());
        let overflow = buf.len().saturating_sub(self.capacity);
        if overflow > 0 {
            buf.drain(0..overflow);
        }
    }

    pub fn snapshot(&self) -> Vec<f32> {
        let buf = self.inner.lock().expect("ring buffer mutex poisoned");
        buf.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("ring buffer mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counters surfaced by the monitor's status report.
#[derive(Debug, Default, Clone)]
pub struct MonitorStats {
    pub scans_attempted: u64,
    pub scans_skipped: u64,
    pub headers_found: u64,
    pub headers_alerted: u64,
    pub watchdog_trips: u64,
}

fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Self-tuning scan interval: grows when too many scan attempts are being
/// skipped (the worker pool is saturated), shrinks back down otherwise,
/// bounded below by `min_interval`.
struct ScanScheduler {
    interval: f64,
    min_interval: f64,
    buffer_factor: f64,
    high_skip_rate: f64,
    cooldown: Duration,
    last_adjustment: Instant,
    attempted_since_adjustment: u64,
    skipped_since_adjustment: u64,
}

impl ScanScheduler {
    fn new(config: &crate::config::ScanSchedulerConfig) -> Self {
        Self {
            interval: config.min_scan_interval_secs,
            min_interval: config.min_scan_interval_secs,
            buffer_factor: config.scan_buffer_factor,
            high_skip_rate: config.high_skip_rate,
            cooldown: Duration::from_secs_f64(config.adjustment_cooldown_secs),
            last_adjustment: Instant::now(),
            attempted_since_adjustment: 0,
            skipped_since_adjustment: 0,
        }
    }

    fn record_attempt(&mut self) {
        self.attempted_since_adjustment += 1;
        self.maybe_adjust();
    }

    fn record_skip(&mut self) {
        self.skipped_since_adjustment += 1;
        self.maybe_adjust();
    }

    fn maybe_adjust(&mut self) {
        if self.last_adjustment.elapsed() < self.cooldown {
            return;
        }
        let total = self.attempted_since_adjustment + self.skipped_since_adjustment;
        if total == 0 {
            return;
        }
        let skip_rate = self.skipped_since_adjustment as f64 / total as f64;
        if skip_rate > self.high_skip_rate {
            self.interval *= self.buffer_factor;
        } else {
            self.interval = (self.interval / self.buffer_factor).max(self.min_interval);
        }
        self.attempted_since_adjustment = 0;
        self.skipped_since_adjustment = 0;
        self.last_adjustment = Instant::now();
    }

    fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }
}

/// A running monitor instance. Dropping this does not stop the threads —
/// call `stop()` explicitly so shutdown is always an intentional act.
pub struct MonitorHandle {
    stop_tx: Sender<()>,
    audio_thread: Option<std::thread::JoinHandle<()>>,
    scan_thread: Option<std::thread::JoinHandle<()>>,
    watchdog_thread: Option<std::thread::JoinHandle<()>>,
    stats: Arc<Mutex<MonitorStats>>,
}

impl MonitorHandle {
    pub fn stats(&self) -> MonitorStats {
        self.stats.lock().expect("stats mutex poisoned").clone()
    }

    /// Signal all three threads to stop and wait for them to exit.
    pub fn stop(mut self) {
        let _ = self.stop_tx.send(());
        let _ = self.stop_tx.send(());
        let _ = self.stop_tx.send(());
        if let Some(t) = self.audio_thread.take() {
            let _ = t.join();
        }
        if let Some(t) = self.scan_thread.take() {
            let _ = t.join();
        }
        if let Some(t) = self.watchdog_thread.take() {
            let _ = t.join();
        }
    }
}

/// Launches the audio, scan and watchdog threads and returns a handle for
/// observing stats and stopping the run.
pub fn spawn(
    config: MonitorConfig,
    mut source: Box<dyn AudioSource + Send>,
    alert_sink: Arc<dyn AlertSink>,
    audit: Arc<dyn AuditSink>,
) -> MonitorHandle {
    let sample_rate_hz = source.sample_rate_hz();
    let capacity = (config.ring_buffer_seconds * sample_rate_hz as f64).round() as usize;
    let ring = Arc::new(RingBuffer::new(capacity.max(1)));
    let heartbeat = Arc::new(AtomicF64::new(now_epoch_secs()));
    let stats = Arc::new(Mutex::new(MonitorStats::default()));
    let active_scans = Arc::new(AtomicUsize::new(0));

    let (stop_tx, stop_rx) = bounded::<()>(3);

    let audio_thread = {
        let ring = Arc::clone(&ring);
        let heartbeat = Arc::clone(&heartbeat);
        let stop_rx: Receiver<()> = stop_rx.clone();
        std::thread::spawn(move || {
            let mut buf = vec![0.0_f32; 4096];
            loop {
                if stop_rx.try_recv().is_ok() {
                    return;
                }
                match source.read_chunk(&mut buf) {
                    Ok(0) => return, // end of stream
                    Ok(n) => {
                        ring.push(&buf[..n]);
                        heartbeat.store(now_epoch_secs(), Ordering::Relaxed);
                    }
                    Err(_) => return,
                }
            }
        })
    };

    let scan_thread = {
        let ring = Arc::clone(&ring);
        let stats = Arc::clone(&stats);
        let active_scans = Arc::clone(&active_scans);
        let audit = Arc::clone(&audit);
        let stop_rx: Receiver<()> = stop_rx.clone();
        let config = config.clone();
        std::thread::spawn(move || {
            let mut scheduler = ScanScheduler::new(&config.scheduler);
            let mut dedup = DedupCache::new(&config.dedup);
            let mut logger = SignalLogger::default();
            let mut last_prune = Instant::now();

            loop {
                let tick = crossbeam::channel::after(scheduler.interval());
                select! {
                    recv(stop_rx) -> _ => return,
                    recv(tick) -> _ => {}
                }

                if active_scans.load(Ordering::SeqCst) >= config.scheduler.max_dynamic_scans {
                    scheduler.record_skip();
                    let mut s = stats.lock().expect("stats mutex poisoned");
                    s.scans_skipped += 1;
                    continue;
                }

                active_scans.fetch_add(1, Ordering::SeqCst);
                scheduler.record_attempt();
                {
                    let mut s = stats.lock().expect("stats mutex poisoned");
                    s.scans_attempted += 1;
                }

                let snapshot = ring.snapshot();
                let outcome = decoder::decode(&snapshot, sample_rate_hz, &config.prefilter);
                active_scans.fetch_sub(1, Ordering::SeqCst);

                if let Ok(outcome) = outcome {
                    let now = Utc::now();
                    for header in &outcome.headers {
                        let mut s = stats.lock().expect("stats mutex poisoned");
                        s.headers_found += 1;
                        drop(s);

                        if !dedup.accept(header, now) {
                            logger.debug("MONITOR", format!("suppressed duplicate: {}", header.raw_text));
                            continue;
                        }

                        let relevant = jurisdiction::is_relevant(header, &config.jurisdiction);
                        audit.record(AuditRecord {
                            timestamp: now,
                            category: "alert",
                            description: format!(
                                "{} (relevant={relevant})",
                                header.raw_text
                            ),
                        });

                        if relevant {
                            let mut s = stats.lock().expect("stats mutex poisoned");
                            s.headers_alerted += 1;
                            drop(s);
                            alert_sink.on_alert(header);
                        }
                    }
                }

                if last_prune.elapsed() > Duration::from_secs(60) {
                    dedup.prune(Utc::now());
                    last_prune = Instant::now();
                }
            }
        })
    };

    let watchdog_thread = {
        let heartbeat = Arc::clone(&heartbeat);
        let stats = Arc::clone(&stats);
        let audit = Arc::clone(&audit);
        let stop_rx: Receiver<()> = stop_rx.clone();
        let watchdog_stall = config.scheduler.watchdog_stall_secs;
        let watchdog_poll = Duration::from_secs_f64(config.scheduler.watchdog_poll_secs);
        std::thread::spawn(move || loop {
            let tick = crossbeam::channel::after(watchdog_poll);
            select! {
                recv(stop_rx) -> _ => return,
                recv(tick) -> _ => {}
            }

            let elapsed = now_epoch_secs() - heartbeat.load(Ordering::Relaxed);
            if elapsed > watchdog_stall {
                let mut s = stats.lock().expect("stats mutex poisoned");
                s.watchdog_trips += 1;
                drop(s);
                let err = MonitorError::WatchdogTimeout { elapsed_secs: elapsed };
                audit.record(AuditRecord {
                    timestamp: Utc::now(),
                    category: "watchdog",
                    description: err.to_string(),
                });
            }
        })
    };

    MonitorHandle {
        stop_tx,
        audio_thread: Some(audio_thread),
        scan_thread: Some(scan_thread),
        watchdog_thread: Some(watchdog_thread),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_source::MemorySource;
    use crate::audit::VecAuditSink;
    use crate::fsk::BurstRenderer;
    use std::sync::Mutex as StdMutex;

    struct CollectingSink {
        headers: StdMutex<Vec<String>>,
    }

    impl AlertSink for CollectingSink {
        fn on_alert(&self, header: &SameHeader) {
            self.headers.lock().unwrap().push(header.raw_text.clone());
        }
    }

    #[test]
    fn ring_buffer_bounds_to_capacity() {
        let ring = RingBuffer::new(10);
        ring.push(&[1.0; 15]);
        assert_eq!(ring.len(), 10);
    }

    #[test]
    fn ring_buffer_snapshot_is_consistent() {
        let ring = RingBuffer::new(100);
        ring.push(&[1.0, 2.0, 3.0]);
        assert_eq!(ring.snapshot(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn monitor_detects_a_burst_and_alerts() {
        let sample_rate = 22050;
        let text = "ZCZC-EAS-RWT-039137+0015-1181800-KRAJ/FM-";
        let mut samples = vec![0.0_f32; 400];
        samples.extend(BurstRenderer::new(sample_rate).render_burst(text));
        samples.extend(vec![0.0_f32; sample_rate as usize * 2]);

        let mut config = MonitorConfig::default();
        config.jurisdiction.local_codes = vec!["039137".to_string()];
        config.scheduler.min_scan_interval_secs = 0.05;
        config.ring_buffer_seconds = 30.0;

        let source = Box::new(MemorySource::new(samples, sample_rate));
        let sink = Arc::new(CollectingSink {
            headers: StdMutex::new(Vec::new()),
        });
        let audit = Arc::new(VecAuditSink::new());

        let handle = spawn(config, source, sink.clone(), audit);
        std::thread::sleep(Duration::from_millis(500));
        let stats = handle.stats();
        handle.stop();

        assert!(stats.scans_attempted > 0);
        assert!(!sink.headers.lock().unwrap().is_empty());
    }

    #[test]
    fn watchdog_trips_when_source_never_produces_samples() {
        struct DeadSource;
        impl AudioSource for DeadSource {
            fn read_chunk(&mut self, _buf: &mut [f32]) -> Result<usize, crate::errors::AudioError> {
                std::thread::sleep(Duration::from_secs(3600));
                Ok(0)
            }
            fn sample_rate_hz(&self) -> u32 {
                22050
            }
        }

        let mut config = MonitorConfig::default();
        config.scheduler.watchdog_stall_secs = 0.05;
        config.scheduler.watchdog_poll_secs = 0.02;

        let sink = Arc::new(CollectingSink {
            headers: StdMutex::new(Vec::new()),
        });
        let audit = Arc::new(VecAuditSink::new());
        let handle = spawn(config, Box::new(DeadSource), sink, Arc::clone(&audit) as Arc<dyn AuditSink>);
        std::thread::sleep(Duration::from_millis(300));
        let stats = handle.stats();
        assert!(stats.watchdog_trips > 0);
        // the audio thread is blocked in sleep(3600); do not join it.
        std::mem::forget(handle);
    }
}
