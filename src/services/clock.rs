use chrono::{NaiveDateTime, Utc};

/// Injected time source.
///
/// The scheduler and poller never call `Utc::now()` directly; they go
/// through this trait so ticks can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> NaiveDateTime;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Hand-advanced clock for tests.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<NaiveDateTime>,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_utc(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}
