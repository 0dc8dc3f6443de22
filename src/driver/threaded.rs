//! Dedicated sampling thread
//!
//! Runs the accumulator on its own thread, which is then the only owner of the
//! accumulator state. Diagnostics leave the thread as immutable
//! [`DriftSample`] values on a one-way channel, plus a counters-only
//! [`DriverStats`] snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use super::{PulseSink, SamplingDriver};
use crate::deriver::{to_u64, ScaledConfig, Word};
use crate::observer::{DriftObserver, DriftSample};
use crate::SiderealError;

/// Sampling events delivered between stop-flag checks and stats updates
pub const DRIVER_BATCH_EVENTS: u64 = 4096;

/// How long the driver thread runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBudget {
    /// Stop after this many sampling events
    Events(u64),
    /// Run until [`DriverHandle::stop`] is called
    Unbounded,
}

/// Progress counters published by the driver thread
#[derive(Debug, Clone, Default)]
pub struct DriverStats {
    /// Sampling events delivered
    pub events: u64,
    /// Pulses emitted
    pub pulses: u64,
    /// Drift samples published
    pub reports: u64,
    /// Smallest and largest error term left right after a pulse
    pub pulse_remainder_range: Option<(u64, u64)>,
    /// Whether the driver thread is still running
    pub running: bool,
}

/// Handle to a running sampling thread
pub struct DriverHandle<S> {
    stop: Arc<AtomicBool>,
    stats: Arc<Mutex<DriverStats>>,
    reports: Receiver<DriftSample>,
    thread: Option<JoinHandle<crate::Result<(S, DriftObserver)>>>,
}

/// Start the accumulator on a dedicated thread
///
/// The thread owns the accumulator, the sink and the observer. Every drift
/// sample the observer produces is sent to [`DriverHandle::reports`]; samples
/// are dropped silently once the receiver is gone.
pub fn spawn<W, S>(
    config: ScaledConfig<W>,
    observer: DriftObserver,
    sink: S,
    budget: RunBudget,
) -> crate::Result<DriverHandle<S>>
where
    W: Word,
    S: PulseSink + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(Mutex::new(DriverStats {
        running: true,
        ..DriverStats::default()
    }));
    let (tx, reports) = mpsc::channel();

    let stop_clone = Arc::clone(&stop);
    let stats_clone = Arc::clone(&stats);
    let thread = std::thread::Builder::new()
        .name("sidereal-sampler".into())
        .spawn(move || {
            let mut driver = SamplingDriver::new(config);
            let mut observer = observer;
            let mut sink = sink;
            let mut published = 0u64;

            tracing::info!(
                increment = %config.increment(),
                limit = %config.limit(),
                ?budget,
                "sampling driver started"
            );

            let result = loop {
                if stop_clone.load(Ordering::Relaxed) {
                    break Ok(());
                }
                let batch = match budget {
                    RunBudget::Events(total) => {
                        let left = total.saturating_sub(driver.events());
                        if left == 0 {
                            break Ok(());
                        }
                        left.min(DRIVER_BATCH_EVENTS)
                    }
                    RunBudget::Unbounded => DRIVER_BATCH_EVENTS,
                };

                let outcome = driver.run_observed(batch, &mut sink, &mut observer, |sample| {
                    published += 1;
                    let _ = tx.send(sample);
                    Ok(())
                });

                {
                    let mut stats = stats_clone.lock();
                    stats.events = driver.events();
                    stats.pulses = observer.pulses();
                    stats.reports = published;
                    stats.pulse_remainder_range = driver
                        .pulse_remainder_range()
                        .map(|(lo, hi)| (to_u64(lo), to_u64(hi)));
                }
                if let Err(e) = outcome {
                    break Err(e);
                }
            };

            let result = result.and_then(|_| sink.finish());
            stats_clone.lock().running = false;
            match &result {
                Ok(()) => tracing::info!(
                    events = driver.events(),
                    pulses = observer.pulses(),
                    "sampling driver stopped"
                ),
                Err(e) => tracing::warn!(error = %e, "sampling driver aborted"),
            }
            result.map(|_| (sink, observer))
        })?;

    Ok(DriverHandle {
        stop,
        stats,
        reports,
        thread: Some(thread),
    })
}

impl<S> DriverHandle<S> {
    /// Drift samples published by the driver thread
    ///
    /// Iterating blocks until the next sample; iteration ends when the thread exits.
    pub fn reports(&self) -> &Receiver<DriftSample> {
        &self.reports
    }

    /// Get current driver statistics
    pub fn stats(&self) -> DriverStats {
        self.stats.lock().clone()
    }

    /// Ask the driver thread to stop after its current batch
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Whether the driver thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the driver thread and take back its sink and observer
    pub fn join(mut self) -> crate::Result<(DriverStats, S, DriftObserver)> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| SiderealError::Other("sampling driver already joined".into()))?;
        let (sink, observer) = thread
            .join()
            .map_err(|_| SiderealError::Other("sampling driver thread panicked".into()))??;
        Ok((self.stats(), sink, observer))
    }
}

impl<S> Drop for DriverHandle<S> {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
