//! Microsecond timestamps for evidence items.
//!
//! Artifact file names embed the capture timestamp, so two captures within the
//! same microsecond must still get distinct values. [`MicroClock`] hands out
//! wall-clock microseconds, bumped forward whenever the wall clock has not
//! advanced past the last value issued.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

#[derive(Debug, Default)]
pub struct MicroClock {
    last: AtomicI64,
}

impl MicroClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a timestamp strictly greater than every value previously returned.
    pub fn now_micros(&self) -> i64 {
        let wall = Utc::now().timestamp_micros();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = if wall > prev { wall } else { prev + 1 };
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
