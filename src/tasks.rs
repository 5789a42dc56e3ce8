//! Long-running task threads.
//!
//! Each of the three coordinator loops runs on its own named OS thread
//! with an explicit stack size.  The thread calls [`Task::step`] forever;
//! a panic inside one step is caught, logged, and the loop continues, so a
//! fault in one task never takes the others down.

use core::any::Any;
use core::time::Duration;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::JoinHandle;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::{error, info};

use crate::app::ports::{AudioPlayer, BleCentral, BreakInHandler, EventSink, TimePort, Transcriber};
use crate::link::BleLinkSupervisor;
use crate::motion::MotionMonitor;
use crate::voice::VoiceTask;

/// Pause after a panicked step before the next one.
const PANIC_PAUSE: Duration = Duration::from_secs(1);

/// One iteration of a long-running loop.  Every step performs its own
/// bounded waits.
pub trait Task {
    fn step(&mut self);
}

impl<C, H, D, S> Task for BleLinkSupervisor<C, H, D, S>
where
    C: BleCentral,
    H: BreakInHandler,
    D: DelayNs,
    S: EventSink,
{
    fn step(&mut self) {
        BleLinkSupervisor::step(self);
    }
}

impl<P, T, D, H, S> Task for MotionMonitor<P, T, D, H, S>
where
    P: InputPin,
    T: TimePort,
    D: DelayNs,
    H: BreakInHandler,
    S: EventSink,
{
    fn step(&mut self) {
        MotionMonitor::step(self);
    }
}

impl<T, A, D, S> Task for VoiceTask<T, A, D, S>
where
    T: Transcriber,
    A: AudioPlayer,
    D: DelayNs,
    S: EventSink,
{
    fn step(&mut self) {
        VoiceTask::step(self);
    }
}

/// Run `task` on a dedicated thread until the process exits.
pub fn spawn_supervised<T>(
    name: &'static str,
    stack_kb: usize,
    mut task: T,
) -> std::io::Result<JoinHandle<()>>
where
    T: Task + Send + 'static,
{
    info!("Spawning '{}' (stack={}KB)", name, stack_kb);
    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(move || {
            loop {
                if !run_step(name, &mut task) {
                    std::thread::sleep(PANIC_PAUSE);
                }
            }
        })
}

/// Run one step, catching a panic.  Returns `false` if the step panicked.
pub fn run_step<T: Task>(name: &str, task: &mut T) -> bool {
    match catch_unwind(AssertUnwindSafe(|| task.step())) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                "TASK[{}]: step panicked: {}",
                name,
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}
