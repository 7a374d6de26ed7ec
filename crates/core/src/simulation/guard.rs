//! Scoped pass bookkeeping: the busy flag, cancellation and timing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::error::{DispersionError, DispersionResult};

/// Holds a calculator's busy flag for the lifetime of one pass.
///
/// Dropping the guard clears the flag, so every exit path of a pass (success,
/// early stop, error, panic unwinding) releases it.
#[must_use = "the pass is only exclusive while the guard is alive"]
pub struct CalculationGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CalculationGuard<'a> {
    /// Set `flag`, or fail with [`DispersionError::Busy`] if it is already set
    pub fn acquire(flag: &'a AtomicBool) -> DispersionResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DispersionError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for CalculationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Cooperative cancellation shared between a caller and a running pass
///
/// Clones observe the same flag. The pass checks it between sources, so a
/// cancelled pass stops after the source in flight.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear a previous request so the token can be reused
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Logs the elapsed time of a named pass phase when dropped
pub struct PassTimer {
    start: Instant,
    name: &'static str,
}

impl PassTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Gets elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for PassTimer {
    fn drop(&mut self) {
        debug!("{} finished in {:.1} ms", self.name, self.elapsed_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = CalculationGuard::acquire(&flag).unwrap();
            assert!(flag.load(Ordering::Acquire));
            assert!(matches!(
                CalculationGuard::acquire(&flag),
                Err(DispersionError::Busy)
            ));
        }
        assert!(!flag.load(Ordering::Acquire));
        assert!(CalculationGuard::acquire(&flag).is_ok());
    }

    #[test]
    fn test_guard_released_when_pass_fails() {
        fn failing_pass(flag: &AtomicBool) -> DispersionResult<()> {
            let _guard = CalculationGuard::acquire(flag)?;
            Err(DispersionError::InvalidConfig("boom".into()))
        }
        let flag = AtomicBool::new(false);
        assert!(failing_pass(&flag).is_err());
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let worker_view = token.clone();
        assert!(!worker_view.is_cancelled());
        token.cancel();
        assert!(worker_view.is_cancelled());
        worker_view.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_timer_measures_time() {
        let timer = PassTimer::new("test");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_ms() >= 5.0);
    }
}
