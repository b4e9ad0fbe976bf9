// Rate engine: counter deltas to per-second rates and percentage distributions.
// Pure functions; history mutation belongs to the caller.

use crate::models::Metric;

/// Round to 6 decimal digits.
pub fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

/// Per-second rate between two readings of a monotonic counter.
///
/// Returns 0 when `delta_t <= 0`, when there is no baseline (`previous <= 0`),
/// and when the counter went backwards (reset). In the reset case the caller
/// still stores `current` as the new baseline.
pub fn rate(current: f64, previous: f64, delta_t: f64) -> f64 {
    if delta_t <= 0.0 || !delta_t.is_finite() {
        return 0.0;
    }
    if previous <= 0.0 {
        return 0.0;
    }
    let delta = current - previous;
    if delta < 0.0 {
        return 0.0;
    }
    round6(delta / delta_t)
}

/// Convenience for integer counters.
pub fn rate_u64(current: u64, previous: u64, delta_t: f64) -> f64 {
    rate(current as f64, previous as f64, delta_t)
}

/// Outcome of [`percentage_distribution`].
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub percentages: Vec<Metric>,
    pub valid: bool,
}

impl Distribution {
    fn undefined(len: usize) -> Self {
        Self {
            percentages: vec![Metric::Undefined; len],
            valid: false,
        }
    }
}

/// Percentage share of each state's delta over a closed set of mutually
/// exclusive counters (e.g. CPU states).
///
/// All-or-nothing: if any single state regressed, the slices differ in
/// length, or the deltas sum to zero, every slot is `Undefined`.
pub fn percentage_distribution(states: &[u64], previous: &[u64]) -> Distribution {
    if states.len() != previous.len() || states.is_empty() {
        return Distribution::undefined(states.len());
    }
    if states.iter().zip(previous).any(|(cur, prev)| cur < prev) {
        return Distribution::undefined(states.len());
    }
    let deltas: Vec<u64> = states
        .iter()
        .zip(previous)
        .map(|(cur, prev)| cur - prev)
        .collect();
    let total: u64 = deltas.iter().sum();
    if total == 0 {
        return Distribution::undefined(states.len());
    }
    let total = total as f64;
    Distribution {
        percentages: deltas
            .iter()
            .map(|d| Metric::from_f64(100.0 * *d as f64 / total))
            .collect(),
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round6_drops_float_noise() {
        assert_eq!(round6(0.1 + 0.2), 0.3);
        assert_eq!(round6(1.0 / 3.0), 0.333333);
    }

    #[test]
    fn distribution_sums_to_hundred() {
        let d = percentage_distribution(&[30, 10, 60], &[0, 0, 0]);
        assert!(d.valid);
        let sum: f64 = d.percentages.iter().filter_map(Metric::value).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn length_mismatch_is_undefined() {
        let d = percentage_distribution(&[1, 2, 3], &[0, 0]);
        assert!(!d.valid);
        assert_eq!(d.percentages.len(), 3);
        assert!(d.percentages.iter().all(Metric::is_undefined));
    }
}
