use may::sync::{Condvar, Mutex};
use std::sync::{Arc, PoisonError};

/// Counts dispatched connection coroutines so shutdown can wait for them
#[derive(Clone)]
pub(crate) struct InFlight {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

/// Marks one connection as running until dropped
pub(crate) struct InFlightGuard {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(0), Condvar::new())),
        }
    }

    pub(crate) fn enter(&self) -> InFlightGuard {
        let (count, _) = &*self.inner;
        *count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub(crate) fn count(&self) -> usize {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until every guard handed out so far has been dropped
    pub(crate) fn wait(&self) {
        let (count, idle) = &*self.inner;
        let mut running = count.lock().unwrap_or_else(PoisonError::into_inner);
        while *running > 0 {
            running = idle.wait(running).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let (count, idle) = &*self.inner;
        let mut running = count.lock().unwrap_or_else(PoisonError::into_inner);
        *running = running.saturating_sub(1);
        if *running == 0 {
            idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_immediately_when_idle() {
        InFlight::new().wait();
    }

    #[test]
    fn test_wait_blocks_until_guards_drop() {
        let in_flight = InFlight::new();
        let a = in_flight.enter();
        let b = in_flight.enter();
        assert_eq!(in_flight.count(), 2);
        let worker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            drop(a);
            std::thread::sleep(Duration::from_millis(30));
            drop(b);
        });
        in_flight.wait();
        assert_eq!(in_flight.count(), 0);
        worker.join().unwrap();
    }
}
