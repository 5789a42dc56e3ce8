//! PIR motion debounce and the motion monitor task.
//!
//! ## Debounce
//!
//! The PIR line is polled every `poll_interval_ms`.  Motion qualifies as a
//! break-in candidate only when the line has been continuously high for
//! strictly longer than `sustain_threshold_ms` while the system is armed.
//!
//! | Raw  | Window before            | Result                                   |
//! |------|--------------------------|------------------------------------------|
//! | high | idle                     | start window at `now`, log rising edge   |
//! | high | open, ≤ threshold        | nothing                                  |
//! | high | open, > threshold, armed | **fire**, clear window, latch            |
//! | high | latched                  | nothing until the line drops             |
//! | low  | any                      | clear window and latch, log falling edge |
//!
//! A single low sample resets everything: the timer is continuous, not
//! cumulative.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::{info, warn};

use crate::alert::DispatchOutcome;
use crate::app::events::{AppEvent, BreakInSource};
use crate::app::ports::{BreakInHandler, EventSink, TimePort};
use crate::config::MotionConfig;
use crate::state::SharedSystemState;

/// Transient debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionWindow {
    /// When the current continuous high run started.
    pub sustained_since: Option<u64>,
    /// Raw level at the previous sample.
    pub last_state: bool,
    /// A break-in already fired during this high run.
    pub fired: bool,
}

/// Outcome of one debounce sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionVerdict {
    Quiet,
    /// Line went high on this sample.
    Rising,
    /// Line is high but the window has not qualified.
    Sustaining,
    /// Line went low on this sample.
    Falling,
    /// Qualifying break-in.
    BreakIn,
}

pub struct MotionDebouncer {
    threshold_ms: u64,
    window: MotionWindow,
}

impl MotionDebouncer {
    pub fn new(threshold_ms: u32) -> Self {
        Self {
            threshold_ms: u64::from(threshold_ms),
            window: MotionWindow::default(),
        }
    }

    pub fn window(&self) -> MotionWindow {
        self.window
    }

    /// Feed one sample taken at `now_ms`.
    pub fn update(&mut self, raw: bool, now_ms: u64, armed: bool) -> MotionVerdict {
        if !raw {
            let was_high = self.window.last_state;
            self.window = MotionWindow::default();
            return if was_high {
                MotionVerdict::Falling
            } else {
                MotionVerdict::Quiet
            };
        }

        let rising = !self.window.last_state;
        self.window.last_state = true;
        if self.window.fired {
            return MotionVerdict::Sustaining;
        }
        let since = *self.window.sustained_since.get_or_insert(now_ms);

        if armed && now_ms.saturating_sub(since) > self.threshold_ms {
            self.window.fired = true;
            self.window.sustained_since = None;
            return MotionVerdict::BreakIn;
        }

        if rising {
            MotionVerdict::Rising
        } else {
            MotionVerdict::Sustaining
        }
    }
}

/// Motion monitor task: polls the line, runs the debouncer, dispatches.
pub struct MotionMonitor<P, T, D, H, S> {
    pin: P,
    clock: T,
    delay: D,
    handler: H,
    sink: S,
    state: SharedSystemState,
    debouncer: MotionDebouncer,
    poll_interval_ms: u32,
}

impl<P, T, D, H, S> MotionMonitor<P, T, D, H, S>
where
    P: InputPin,
    T: TimePort,
    D: DelayNs,
    H: BreakInHandler,
    S: EventSink,
{
    pub fn new(
        pin: P,
        clock: T,
        delay: D,
        handler: H,
        sink: S,
        state: SharedSystemState,
        config: &MotionConfig,
    ) -> Self {
        Self {
            pin,
            clock,
            delay,
            handler,
            sink,
            state,
            debouncer: MotionDebouncer::new(config.sustain_threshold_ms),
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    pub fn window(&self) -> MotionWindow {
        self.debouncer.window()
    }

    /// Take one sample, act on it, then sleep one poll interval.
    pub fn step(&mut self) -> MotionVerdict {
        let verdict = self.sample();
        self.delay.delay_ms(self.poll_interval_ms);
        verdict
    }

    fn sample(&mut self) -> MotionVerdict {
        let raw = match self.pin.is_high() {
            Ok(level) => level,
            Err(e) => {
                warn!("MOTION: sensor read failed, skipping sample: {:?}", e);
                return MotionVerdict::Quiet;
            }
        };
        let now = self.clock.uptime_ms();
        let verdict = self.debouncer.update(raw, now, self.state.armed());

        match verdict {
            MotionVerdict::Rising => {
                info!("MOTION: detected");
                self.sink.emit(&AppEvent::MotionEdge { present: true });
            }
            MotionVerdict::Falling => {
                info!("MOTION: cleared");
                self.sink.emit(&AppEvent::MotionEdge { present: false });
            }
            MotionVerdict::BreakIn => {
                info!("MOTION: sustained while armed, raising break-in");
                self.state.set_motion_detected(true);
                self.sink.emit(&AppEvent::BreakIn(BreakInSource::Motion));
                match self.handler.on_break_in(BreakInSource::Motion) {
                    DispatchOutcome::Completed(report) => {
                        self.sink.emit(&AppEvent::AlertFinished(report));
                    }
                    DispatchOutcome::Skipped => {
                        self.sink
                            .emit(&AppEvent::AlertSkipped(BreakInSource::Motion));
                    }
                }
            }
            MotionVerdict::Quiet | MotionVerdict::Sustaining => {}
        }
        verdict
    }
}
