//! GPIO activation state machine: debounce, hold-timer, per-pin watchdog,
//! and an audit trail independent of the in-memory log.
//!
//! Ported from the reference `GPIOController`'s threading design (one
//! `RLock`-guarded state map, per-pin hold and watchdog timers) onto
//! `std::thread` plus `crossbeam::channel`, which plays the role the
//! reference implementation's lock/condition-variable pairing did.

use crate::audit::{AuditRecord, AuditSink};
use crate::config::GpioPinConfig;
use crate::errors::GpioError;
use chrono::Utc;
use crossbeam::channel::{bounded, select, Sender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Current state of one activation output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioState {
    Inactive,
    Active,
    Error,
    WatchdogTimeout,
}

/// What triggered an activation, carried through to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationType {
    Automatic,
    Manual,
    Test,
}

/// One state transition, suitable for audit logging or a callback to a
/// station operator console.
#[derive(Debug, Clone)]
pub struct ActivationEvent {
    pub pin: u8,
    pub activation_type: ActivationType,
    pub state: GpioState,
    pub timestamp: chrono::DateTime<Utc>,
    pub error_message: Option<String>,
}

/// Hardware access abstraction. Swappable so the controller's state
/// machine can be exercised in tests without real GPIO hardware.
pub trait GpioBackend: Send + Sync {
    fn set_level(&self, pin: u8, high: bool) -> Result<(), GpioError>;
}

/// No-op backend: logs nothing, always succeeds. Used in tests and on
/// non-Pi development machines.
pub struct NullGpioBackend;

impl GpioBackend for NullGpioBackend {
    fn set_level(&self, _pin: u8, _high: bool) -> Result<(), GpioError> {
        Ok(())
    }
}

/// Real Raspberry Pi GPIO backend, only compiled when the `gpio-hardware`
/// feature is enabled.
#[cfg(feature = "gpio-hardware")]
pub struct RppalGpioBackend {
    chip: Mutex<rppal::gpio::Gpio>,
}

#[cfg(feature = "gpio-hardware")]
impl RppalGpioBackend {
    pub fn new() -> Result<Self, GpioError> {
        let chip = rppal::gpio::Gpio::new().map_err(|e| GpioError::HardwareError {
            pin: 0,
            reason: e.to_string(),
        })?;
        Ok(Self {
            chip: Mutex::new(chip),
        })
    }
}

#[cfg(feature = "gpio-hardware")]
impl GpioBackend for RppalGpioBackend {
    fn set_level(&self, pin: u8, high: bool) -> Result<(), GpioError> {
        let chip = self.chip.lock().expect("gpio chip mutex poisoned");
        let mut output = chip
            .get(pin)
            .map_err(|e| GpioError::HardwareError {
                pin,
                reason: e.to_string(),
            })?
            .into_output();
        if high {
            output.set_high();
        } else {
            output.set_low();
        }
        Ok(())
    }
}

struct PinRuntime {
    config: GpioPinConfig,
    state: GpioState,
    stop_tx: Option<Sender<()>>,
}

/// Coordinates activation state across all configured pins.
pub struct GpioController {
    pins: Arc<Mutex<HashMap<u8, PinRuntime>>>,
    backend: Arc<dyn GpioBackend>,
    audit: Arc<dyn AuditSink>,
}

impl GpioController {
    pub fn new(pin_configs: Vec<GpioPinConfig>, backend: Arc<dyn GpioBackend>, audit: Arc<dyn AuditSink>) -> Self {
        let mut pins = HashMap::new();
        for config in pin_configs {
            pins.insert(
                config.pin,
                PinRuntime {
                    config,
                    state: GpioState::Inactive,
                    stop_tx: None,
                },
            );
        }
        Self {
            pins: Arc::new(Mutex::new(pins)),
            backend,
            audit,
        }
    }

    pub fn state(&self, pin: u8) -> Option<GpioState> {
        self.pins.lock().expect("gpio state mutex poisoned").get(&pin).map(|p| p.state)
    }

    /// Activate `pin`, honoring its configured debounce, then spawning the
    /// hold-timer and watchdog threads that eventually deactivate it.
    pub fn activate(&self, pin: u8, activation_type: ActivationType) -> Result<(), GpioError> {
        let (debounce_ms, hold_seconds, watchdog_seconds, active_high) = {
            let mut pins = self.pins.lock().expect("gpio state mutex poisoned");
            let runtime = pins.get_mut(&pin).ok_or(GpioError::PinNotConfigured { pin })?;
            if !runtime.config.enabled {
                return Err(GpioError::PinDisabled { pin });
            }
            if runtime.state == GpioState::Active {
                return Err(GpioError::PinAlreadyActive { pin });
            }
            (
                runtime.config.debounce_ms,
                runtime.config.hold_seconds,
                runtime.config.watchdog_seconds,
                runtime.config.active_high,
            )
        };

        std::thread::sleep(Duration::from_millis(debounce_ms));

        if let Err(e) = self.backend.set_level(pin, active_high) {
            self.transition(pin, GpioState::Error, activation_type, Some(e.to_string()));
            return Err(e);
        }

        let (stop_tx, stop_rx) = bounded::<()>(0);
        {
            let mut pins = self.pins.lock().expect("gpio state mutex poisoned");
            if let Some(runtime) = pins.get_mut(&pin) {
                runtime.state = GpioState::Active;
                runtime.stop_tx = Some(stop_tx);
            }
        }
        self.transition(pin, GpioState::Active, activation_type, None);

        let pins = Arc::clone(&self.pins);
        let backend = Arc::clone(&self.backend);
        let audit = Arc::clone(&self.audit);
        std::thread::spawn(move || {
            let hold_timer = crossbeam::channel::after(Duration::from_secs_f64(hold_seconds));
            let watchdog_timer = crossbeam::channel::after(Duration::from_secs_f64(watchdog_seconds));

            select! {
                recv(stop_rx) -> _ => {
                    // deactivated externally before the hold timer fired
                }
                recv(hold_timer) -> _ => {
                    let _ = backend.set_level(pin, !active_high);
                    let mut guard = pins.lock().expect("gpio state mutex poisoned");
                    if let Some(runtime) = guard.get_mut(&pin) {
                        runtime.state = GpioState::Inactive;
                        runtime.stop_tx = None;
                    }
                    audit.record(AuditRecord {
                        timestamp: Utc::now(),
                        category: "gpio",
                        description: format!("pin {pin} deactivated after hold timer"),
                    });
                }
                recv(watchdog_timer) -> _ => {
                    let mut guard = pins.lock().expect("gpio state mutex poisoned");
                    if let Some(runtime) = guard.get_mut(&pin) {
                        runtime.state = GpioState::WatchdogTimeout;
                        runtime.stop_tx = None;
                    }
                    audit.record(AuditRecord {
                        timestamp: Utc::now(),
                        category: "gpio",
                        description: format!("pin {pin} forced inactive: watchdog timeout after {watchdog_seconds}s"),
                    });
                }
            }
        });

        Ok(())
    }

    /// Explicitly deactivate `pin`, cancelling any pending hold/watchdog
    /// timers.
    pub fn deactivate(&self, pin: u8) -> Result<(), GpioError> {
        let (active_high, stop_tx) = {
            let mut pins = self.pins.lock().expect("gpio state mutex poisoned");
            let runtime = pins.get_mut(&pin).ok_or(GpioError::PinNotConfigured { pin })?;
            let stop_tx = runtime.stop_tx.take();
            (runtime.config.active_high, stop_tx)
        };

        if let Some(tx) = stop_tx {
            let _ = tx.send(());
        }

        self.backend.set_level(pin, !active_high)?;

        let mut pins = self.pins.lock().expect("gpio state mutex poisoned");
        if let Some(runtime) = pins.get_mut(&pin) {
            runtime.state = GpioState::Inactive;
        }
        drop(pins);
        self.transition(pin, GpioState::Inactive, ActivationType::Manual, None);
        Ok(())
    }

    fn transition(&self, pin: u8, state: GpioState, activation_type: ActivationType, error_message: Option<String>) {
        self.audit.record(AuditRecord {
            timestamp: Utc::now(),
            category: "gpio",
            description: format!("pin {pin} -> {state:?} ({activation_type:?})"),
        });
        let _ = ActivationEvent {
            pin,
            activation_type,
            state,
            timestamp: Utc::now(),
            error_message,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::VecAuditSink;

    fn pin_config(pin: u8) -> GpioPinConfig {
        GpioPinConfig {
            pin,
            name: format!("pin-{pin}"),
            active_high: true,
            debounce_ms: 0,
            hold_seconds: 0.05,
            watchdog_seconds: 10.0,
            enabled: true,
        }
    }

    #[test]
    fn activate_sets_active_state() {
        let audit = Arc::new(VecAuditSink::new());
        let controller = GpioController::new(vec![pin_config(17)], Arc::new(NullGpioBackend), audit);
        controller.activate(17, ActivationType::Automatic).unwrap();
        assert_eq!(controller.state(17), Some(GpioState::Active));
    }

    #[test]
    fn activating_unconfigured_pin_errors() {
        let controller = GpioController::new(vec![], Arc::new(NullGpioBackend), Arc::new(VecAuditSink::new()));
        let result = controller.activate(99, ActivationType::Automatic);
        assert!(matches!(result, Err(GpioError::PinNotConfigured { pin: 99 })));
    }

    #[test]
    fn activating_disabled_pin_errors() {
        let mut config = pin_config(17);
        config.enabled = false;
        let controller = GpioController::new(vec![config], Arc::new(NullGpioBackend), Arc::new(VecAuditSink::new()));
        let result = controller.activate(17, ActivationType::Automatic);
        assert!(matches!(result, Err(GpioError::PinDisabled { pin: 17 })));
    }

    #[test]
    fn double_activation_errors() {
        let controller = GpioController::new(
            vec![pin_config(17)],
            Arc::new(NullGpioBackend),
            Arc::new(VecAuditSink::new()),
        );
        controller.activate(17, ActivationType::Automatic).unwrap();
        let result = controller.activate(17, ActivationType::Automatic);
        assert!(matches!(result, Err(GpioError::PinAlreadyActive { pin: 17 })));
    }

    #[test]
    fn hold_timer_returns_pin_to_inactive() {
        let controller = GpioController::new(
            vec![pin_config(17)],
            Arc::new(NullGpioBackend),
            Arc::new(VecAuditSink::new()),
        );
        controller.activate(17, ActivationType::Automatic).unwrap();
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(controller.state(17), Some(GpioState::Inactive));
    }

    #[test]
    fn explicit_deactivate_cancels_hold_timer() {
        let mut config = pin_config(17);
        config.hold_seconds = 5.0;
        let controller = GpioController::new(vec![config], Arc::new(NullGpioBackend), Arc::new(VecAuditSink::new()));
        controller.activate(17, ActivationType::Automatic).unwrap();
        controller.deactivate(17).unwrap();
        assert_eq!(controller.state(17), Some(GpioState::Inactive));
    }
}
