use std::sync::atomic::{AtomicUsize, Ordering};

use garmin_lib::errors::ConverterError as Error;

/// Counts failures over a whole run, erroring once the count exceeds
/// `max_count`.
#[derive(Debug)]
pub struct FailureCount {
    max_count: usize,
    counter: AtomicUsize,
}

impl FailureCount {
    pub fn new(max_count: usize) -> Self {
        Self {
            max_count,
            counter: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn increment(&self) -> Result<(), Error> {
        let count = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if count > self.max_count {
            Err(Error::ErrorBudgetExceeded {
                errors: count,
                max: self.max_count,
            })
        } else {
            Ok(())
        }
    }
}
