use chrono::{Duration, NaiveTime};

/// Daily time-of-day range in which new backups may start. `start > end`
/// means the window wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl ScheduleWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        ScheduleWindow { start, end }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Whether `now` lies inside the window. The start is moved one minute
    /// earlier to absorb timer jitter.
    pub fn is_active_at(&self, now: NaiveTime) -> bool {
        let (start, _) = self.start.overflowing_sub_signed(Duration::minutes(1));
        if start < self.end {
            now > start && now < self.end
        } else {
            now > start || now < self.end
        }
    }
}
