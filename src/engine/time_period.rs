use serde::Deserialize;

/// A periodically recurring window: `[start + n*interval, start + n*interval + duration)`
/// for the smallest `n >= 0` that makes the window relevant to the query.
///
/// `interval == 0` with a non-zero `duration` is a disallowed configuration: `contains` always
/// reports false rather than matching the single instant `start`. `duration == 0` degenerates
/// the window to a point in time rather than a span, and likewise never contains anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct TimePeriod {
    pub start: u64,
    pub interval: u64,
    pub duration: u64,
}

impl TimePeriod {
    pub fn new(start: u64, interval: u64, duration: u64) -> Self {
        Self {
            start,
            interval,
            duration,
        }
    }

    /// An absent period: never due, never contains anything.
    pub fn empty(&self) -> bool {
        self.start == 0
    }

    /// The smallest time strictly after `from` at which this period next fires.
    ///
    /// Mirrors the reference implementation's repeated-addition definition, but computed by
    /// division so a zero `interval` (a degenerate one-shot schedule) can't spin forever.
    pub fn next_time(&self, from: u64) -> u64 {
        if self.start > from {
            return self.start;
        }
        if self.interval == 0 {
            return from.saturating_add(1);
        }
        let elapsed = from - self.start;
        let n = elapsed / self.interval + 1;
        self.start + n * self.interval
    }

    /// Whether `t` falls inside the window currently open under this schedule.
    pub fn contains(&self, t: u64) -> bool {
        if self.empty() || t < self.start {
            return false;
        }
        if self.interval == 0 {
            // interval == 0 with a non-zero duration is a disallowed configuration; treat it as
            // never containing anything rather than matching the single instant `start`.
            return false;
        }
        let phase = (t - self.start) % self.interval;
        phase < self.duration
    }
}
