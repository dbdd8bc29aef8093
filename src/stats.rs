use std::time::Duration;

/// Summary statistics over the round-trip times of one payload size
///
/// Only successful exchanges contribute. An empty sample has no statistics at all, which is why
/// [`Statistics::from_samples`] returns an `Option`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Statistics {
    pub count: usize,
    pub min: Duration,
    pub mean: Duration,
    /// Population standard deviation
    pub std: Duration,
    pub max: Duration,
    /// 25th, 50th and 75th percentile
    pub quartiles: [Duration; 3],
}

impl Statistics {
    /// Summarize a set of round-trip times
    ///
    /// Returns `None` if `samples` is empty.
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let secs: Vec<f64> = sorted.iter().map(Duration::as_secs_f64).collect();
        let mean = secs.iter().sum::<f64>() / count as f64;

        // Mean squared deviation, no Bessel correction
        let variance = secs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;

        let quartile = |p| percentile(&sorted, p).unwrap_or_default();

        Some(Self {
            count,
            min: sorted[0],
            // Rounding must not push the mean outside the observed range
            mean: Duration::from_secs_f64(mean).max(sorted[0]).min(sorted[count - 1]),
            std: Duration::from_secs_f64(variance.sqrt()),
            max: sorted[count - 1],
            quartiles: [quartile(0.25), quartile(0.50), quartile(0.75)],
        })
    }

    pub fn median(&self) -> Duration {
        self.quartiles[1]
    }
}

/// Percentile of an ascending slice, interpolating linearly between the closest ranks
///
/// `p` is a fraction between 0 and 1 and is clamped into that range. Returns `None` for an empty
/// slice.
pub fn percentile(sorted: &[Duration], p: f64) -> Option<Duration> {
    let last = sorted.len().checked_sub(1)?;
    let rank = p.max(0.0).min(1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    let low = sorted[lower].as_secs_f64();
    let high = sorted[upper].as_secs_f64();
    Some(Duration::from_secs_f64(low + (high - low) * (rank - lower as f64)))
}

/// Express a duration in (fractional) milliseconds
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000f64
}
