//! Cancellable inter-iteration wait.

use std::cell::Cell;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};

/// Requests a stop. Cloneable and `Send`, so it can be moved into a signal
/// handler or another thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        // A full buffer already carries a pending stop.
        let _ = self.tx.try_send(());
    }
}

/// Waiting side of a stop pair, owned by the loop.
#[derive(Debug)]
pub struct StopSignal {
    rx: Receiver<()>,
    // Keeps the channel connected when every handle has been dropped.
    _keepalive: Sender<()>,
    stopped: Cell<bool>,
}

pub fn stop_pair() -> (StopHandle, StopSignal) {
    let (tx, rx) = bounded(1);
    let signal = StopSignal {
        rx,
        _keepalive: tx.clone(),
        stopped: Cell::new(false),
    };
    (StopHandle { tx }, signal)
}

impl StopSignal {
    /// A signal that only ever times out.
    pub fn never() -> Self {
        stop_pair().1
    }

    /// True once a stop has been observed (latched).
    pub fn is_stopped(&self) -> bool {
        if self.stopped.get() {
            return true;
        }
        if self.rx.try_recv().is_ok() {
            self.stopped.set(true);
        }
        self.stopped.get()
    }

    /// Sleep for `delay` unless a stop arrives first. Returns true if stopped.
    pub fn wait(&self, delay: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }
        match self.rx.recv_timeout(delay) {
            Ok(()) => {
                self.stopped.set(true);
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn never_times_out() {
        let signal = StopSignal::never();
        assert!(!signal.wait(Duration::from_millis(5)));
        assert!(!signal.is_stopped());
    }

    #[test]
    fn stop_before_wait_returns_immediately_and_latches() {
        let (handle, signal) = stop_pair();
        handle.stop();
        handle.stop();
        let started = Instant::now();
        assert!(signal.wait(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(signal.is_stopped());
        assert!(signal.wait(Duration::from_secs(30)));
    }

    #[test]
    fn stop_from_another_thread_interrupts_wait() {
        let (handle, signal) = stop_pair();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.stop();
        });
        let started = Instant::now();
        assert!(signal.wait(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(5));
        worker.join().expect("join");
    }

    #[test]
    fn dropped_handle_does_not_stop() {
        let (handle, signal) = stop_pair();
        drop(handle);
        assert!(!signal.wait(Duration::from_millis(5)));
    }
}
