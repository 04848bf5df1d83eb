use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Shared state guarded by a single mutex, with a condition variable to wait on changes.
///
/// Every read and write goes through [`Service::lock_while`], so callers can never hold
/// the guard across unrelated work.
#[derive(Debug)]
pub(crate) struct Service<T> {
    state: Mutex<T>,
    changed: Condvar,
}

impl<T> Service<T> {
    pub(crate) fn new(state: T) -> Self {
        Self {
            state: Mutex::new(state),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn lock_while<F, R>(&self, f: F) -> Result<R, super::Error>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.state.lock()?;

        // Execute the passed function for the duration of the lock
        Ok(f(&mut guard))
    }

    /// Blocks for at most `timeout` while `condition` holds.
    ///
    /// Returns `true` when the wait timed out with the condition still holding.
    pub(crate) fn wait_while<F>(&self, timeout: Duration, condition: F) -> Result<bool, super::Error>
    where
        F: FnMut(&mut T) -> bool,
    {
        let guard = self.state.lock()?;
        let (_guard, result) = self.changed.wait_timeout_while(guard, timeout, condition)?;

        Ok(result.timed_out())
    }

    /// Wakes every thread blocked in [`Service::wait_while`].
    pub(crate) fn notify_all(&self) {
        self.changed.notify_all();
    }

    /// Like [`Service::lock_while`], but reads through a poisoned lock.
    pub(crate) fn recover<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::lock::Error;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn it_runs_closures_under_the_lock() {
        let service = Service::new(0u32);

        service.lock_while(|n| *n += 2).unwrap();
        let value = service.lock_while(|n| *n).unwrap();

        assert_eq!(value, 2);
    }

    #[test]
    fn it_times_out_while_the_condition_holds() {
        let service = Service::new(false);

        let timed_out = service
            .wait_while(Duration::from_millis(5), |done| !*done)
            .unwrap();

        assert!(timed_out);
    }

    #[test]
    fn it_returns_immediately_when_the_condition_is_met() {
        let service = Service::new(true);

        let timed_out = service
            .wait_while(Duration::from_secs(60), |done| !*done)
            .unwrap();

        assert!(!timed_out);
    }

    #[test]
    fn it_wakes_waiters_on_notify() {
        let service = Arc::new(Service::new(false));

        let notifier = {
            let service = service.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                service.lock_while(|done| *done = true).unwrap();
                service.notify_all();
            })
        };

        let mut timed_out = true;
        for _ in 0..1_000 {
            timed_out = service
                .wait_while(Duration::from_millis(10), |done| !*done)
                .unwrap();
            if !timed_out {
                break;
            }
        }

        notifier.join().unwrap();
        assert!(!timed_out);
    }

    #[test]
    fn it_reports_poisoning_and_still_recovers_state() {
        let service = Arc::new(Service::new(7u32));

        let poisoner = {
            let service = service.clone();
            thread::spawn(move || {
                let _: Result<(), _> = service.lock_while(|n| {
                    *n = 9;
                    panic!("poison the lock");
                });
            })
        };
        assert!(poisoner.join().is_err());

        assert!(matches!(service.lock_while(|n| *n), Err(Error::Poisoned)));
        assert_eq!(service.recover(|n| *n), 9);
    }
}
