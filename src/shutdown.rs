//! Cancellation for the poll loop. Both timed waits in the program (between
//! cycles and while the servo runs) go through here so an interrupt cuts them
//! short.

use crate::error::{PayloadError, Result};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (requested, condvar) = &*self.inner;
        *requested.lock().unwrap_or_else(PoisonError::into_inner) = true;
        condvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `timeout` unless triggered first. Returns true if triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (requested, condvar) = &*self.inner;
        let guard = requested.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = condvar
            .wait_timeout_while(guard, timeout, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Routes SIGINT/SIGTERM into this signal.
    pub fn install_interrupt_handler(&self) -> Result<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || signal.trigger()).map_err(|e| PayloadError::Initialization {
            message: format!("could not install interrupt handler: {e}"),
        })
    }
}
