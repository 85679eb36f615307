//! Background clock that ticks a [`WorldHistory`] at a fixed rate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::DriverConfig;
use crate::error::HistoryError;
use crate::history::WorldHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Paused,
    Running,
}

struct Shared {
    history: Arc<WorldHistory>,
    config: DriverConfig,
    running: AtomicBool,
    terminated: AtomicBool,
    real_tick_hz: AtomicU64,
    ticks_taken: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl Shared {
    fn last_error(&self) -> MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the simulation thread. Readers keep using the shared history directly.
pub struct Driver {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Driver {
    pub fn spawn(history: Arc<WorldHistory>, config: DriverConfig) -> Result<Self, HistoryError> {
        let shared = Arc::new(Shared {
            history,
            running: AtomicBool::new(config.start_running),
            terminated: AtomicBool::new(false),
            real_tick_hz: AtomicU64::new(0f64.to_bits()),
            ticks_taken: AtomicU64::new(0),
            last_error: Mutex::new(None),
            config,
        });
        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("sim-driver".to_string())
                .spawn(move || run_loop(&shared))?
        };
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    pub fn history(&self) -> &Arc<WorldHistory> {
        &self.shared.history
    }

    pub fn pause(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }

    pub fn run(&self) {
        self.shared.running.store(true, Ordering::SeqCst);
    }

    /// Flip between running and paused. Returns the new state.
    pub fn toggle(&self) -> DriverState {
        let was_running = self.shared.running.fetch_xor(true, Ordering::SeqCst);
        if was_running {
            DriverState::Paused
        } else {
            DriverState::Running
        }
    }

    /// Reset the history to its initial snapshot, then run.
    pub fn restart(&self) -> Result<(), HistoryError> {
        self.shared.history.restart()?;
        *self.shared.last_error() = None;
        self.run();
        Ok(())
    }

    pub fn state(&self) -> DriverState {
        if self.is_running() {
            DriverState::Running
        } else {
            DriverState::Paused
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Tick rate measured between the last two ticks, in Hz.
    pub fn real_tick_frequency(&self) -> f64 {
        f64::from_bits(self.shared.real_tick_hz.load(Ordering::Relaxed))
    }

    pub fn ticks_taken(&self) -> u64 {
        self.shared.ticks_taken.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error().clone()
    }

    /// Stop the thread and wait for it to finish.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.terminated.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("driver thread panicked");
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(shared: &Shared) {
    let period = shared.config.tick_period();
    let idle = shared.config.idle_sleep();
    let mut last_tick = Instant::now();

    while !shared.terminated.load(Ordering::SeqCst) {
        if !shared.running.load(Ordering::SeqCst) {
            thread::sleep(idle);
            last_tick = Instant::now();
            continue;
        }

        let elapsed = last_tick.elapsed();
        if elapsed < period {
            // Bounded so pause and shutdown are noticed promptly.
            thread::sleep((period - elapsed).min(idle));
            continue;
        }

        last_tick = Instant::now();
        match shared.history.tick() {
            Ok(_) => {
                shared.ticks_taken.fetch_add(1, Ordering::Relaxed);
                if elapsed > Duration::ZERO {
                    let hz = 1.0 / elapsed.as_secs_f64();
                    shared.real_tick_hz.store(hz.to_bits(), Ordering::Relaxed);
                }
            }
            Err(err) => {
                tracing::error!("tick failed, pausing driver: {err}");
                *shared.last_error() = Some(err.to_string());
                shared.running.store(false, Ordering::SeqCst);
            }
        }
    }
}
