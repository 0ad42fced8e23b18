use chrono::{Local, NaiveDateTime};

/// Source of local wall-clock time. Backup names, ages and the schedule
/// window are all evaluated in local time without a zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
